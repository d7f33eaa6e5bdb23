use geo_types::{Coord, Rect};
use serde_json::json;

use vt_imagemap::filter::{Filter, parse_filter};
use vt_imagemap::query::{build_query, style_filter};
use vt_imagemap::style::{FeatureTypeStyle, Rule};

fn area() -> Rect<f64> {
    Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 })
}

fn filtered(raw: serde_json::Value) -> Rule {
    Rule {
        filter: Some(parse_filter(&raw).expect("filter")),
        ..Rule::default()
    }
}

fn group(rules: Vec<Rule>) -> FeatureTypeStyle {
    FeatureTypeStyle {
        type_names: Vec::new(),
        rules,
    }
}

#[test]
fn bbox_only_without_style_or_definition() {
    let query = build_query(&[], area(), None);
    assert_eq!(query, Filter::Intersects(area()));
}

#[test]
fn rule_filters_are_pushed_down_as_disjunction() {
    let a = parse_filter(&json!(["==", "kind", "a"])).expect("a");
    let b = parse_filter(&json!(["==", "kind", "b"])).expect("b");
    let style = group(vec![
        filtered(json!(["==", "kind", "a"])),
        filtered(json!(["==", "kind", "b"])),
    ]);
    let definition = Filter::Has("name".to_string());

    let query = build_query(&[&style], area(), Some(&definition));
    assert_eq!(
        query,
        Filter::All(vec![
            Filter::Intersects(area()),
            definition,
            Filter::Any(vec![a, b]),
        ])
    );
}

#[test]
fn single_rule_filter_is_not_wrapped() {
    let style = group(vec![filtered(json!(["==", "kind", "a"]))]);
    let query = build_query(&[&style], area(), None);
    assert_eq!(
        query,
        Filter::All(vec![
            Filter::Intersects(area()),
            parse_filter(&json!(["==", "kind", "a"])).expect("a"),
        ])
    );
}

#[test]
fn pushdown_abandoned_for_unfiltered_rule() {
    let style = group(vec![filtered(json!(["==", "kind", "a"])), Rule::default()]);
    assert_eq!(style_filter(&[&style]), None);
    assert_eq!(build_query(&[&style], area(), None), Filter::Intersects(area()));
}

#[test]
fn pushdown_abandoned_for_otherwise_rule() {
    let fallback = Rule {
        otherwise: true,
        ..filtered(json!(["==", "kind", "b"]))
    };
    let style = group(vec![filtered(json!(["==", "kind", "a"])), fallback]);
    assert_eq!(style_filter(&[&style]), None);
}

#[test]
fn pushdown_spans_groups() {
    let first = group(vec![filtered(json!(["==", "kind", "a"]))]);
    let second = group(vec![filtered(json!(["==", "kind", "b"]))]);
    let third = group(vec![Rule::default()]);
    assert!(matches!(
        style_filter(&[&first, &second]),
        Some(Filter::Any(parts)) if parts.len() == 2
    ));
    assert_eq!(style_filter(&[&first, &third]), None);
    assert_eq!(style_filter(&[]), None);
}
