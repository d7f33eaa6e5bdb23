use geo_types::Point;
use serde_json::json;

use vt_imagemap::feature::{Feature, Value};
use vt_imagemap::filter::{Expr, parse_filter};
use vt_imagemap::style::{
    FeatureTypeStyle, Rule, Style, Symbolizer, match_rules, parse_style, read_style,
};

fn category(value: &str) -> Feature {
    Feature::new("poi.1", Point::new(0.5, 0.5))
        .with_property("category", Value::String(value.to_string()))
}

fn rule(name: &str, filter: serde_json::Value) -> Rule {
    Rule {
        name: Some(name.to_string()),
        filter: Some(parse_filter(&filter).expect("filter")),
        ..Rule::default()
    }
}

fn otherwise(name: &str) -> Rule {
    Rule {
        name: Some(name.to_string()),
        otherwise: true,
        ..Rule::default()
    }
}

fn names(rules: &[&Rule]) -> Vec<String> {
    rules
        .iter()
        .map(|rule| rule.name.clone().unwrap_or_default())
        .collect()
}

#[test]
fn scale_window_is_half_open() {
    let rule = Rule {
        min_scale: 1_000.0,
        max_scale: 5_000.0,
        ..Rule::default()
    };
    assert!(!rule.is_visible_at(999.0));
    assert!(rule.is_visible_at(1_000.0));
    assert!(rule.is_visible_at(4_999.0));
    assert!(!rule.is_visible_at(5_000.0));
    assert!(Rule::default().is_visible_at(1e12));
}

#[test]
fn otherwise_rule_applies_only_when_nothing_matched() {
    let group = FeatureTypeStyle {
        type_names: Vec::new(),
        rules: vec![rule("a", json!(["==", "category", "A"])), otherwise("fallback")],
    };
    let groups = vec![&group];

    let matched = match_rules(&groups, &category("A"), 1_000.0);
    assert_eq!(names(&matched), vec!["a"]);

    let matched = match_rules(&groups, &category("B"), 1_000.0);
    assert_eq!(names(&matched), vec!["fallback"]);
}

#[test]
fn otherwise_is_evaluated_per_group() {
    let first = FeatureTypeStyle {
        type_names: Vec::new(),
        rules: vec![rule("a", json!(["==", "category", "A"])), otherwise("first-else")],
    };
    let second = FeatureTypeStyle {
        type_names: Vec::new(),
        rules: vec![rule("b", json!(["==", "category", "B"])), otherwise("second-else")],
    };
    let groups = vec![&first, &second];
    let matched = match_rules(&groups, &category("A"), 1_000.0);
    assert_eq!(names(&matched), vec!["a", "second-else"]);
}

#[test]
fn rules_outside_scale_window_do_not_match() {
    let group = FeatureTypeStyle {
        type_names: Vec::new(),
        rules: vec![
            Rule {
                max_scale: 10_000.0,
                ..rule("near", json!(["==", "category", "A"]))
            },
            otherwise("fallback"),
        ],
    };
    let groups = vec![&group];
    assert_eq!(names(&match_rules(&groups, &category("A"), 5_000.0)), vec!["near"]);
    assert_eq!(names(&match_rules(&groups, &category("A"), 50_000.0)), vec!["fallback"]);
}

#[test]
fn unknown_filter_result_does_not_match() {
    let group = FeatureTypeStyle {
        type_names: Vec::new(),
        rules: vec![rule("tall", json!([">", "height", 10]))],
    };
    let groups = vec![&group];
    assert!(match_rules(&groups, &category("A"), 1_000.0).is_empty());
}

#[test]
fn groups_for_matches_type_and_ancestors() {
    let style = Style::new(vec![
        FeatureTypeStyle {
            type_names: vec!["roads".to_string()],
            rules: vec![rule("roads", json!(true))],
        },
        FeatureTypeStyle {
            type_names: vec!["transport".to_string()],
            rules: vec![rule("transport", json!(true))],
        },
        FeatureTypeStyle {
            type_names: Vec::new(),
            rules: vec![rule("any", json!(true))],
        },
        FeatureTypeStyle {
            type_names: vec!["buildings".to_string()],
            rules: vec![rule("buildings", json!(true))],
        },
    ]);

    let direct = style.groups_for("roads", &[]);
    assert_eq!(direct.len(), 2);

    let inherited = style.groups_for("roads", &["transport".to_string()]);
    assert_eq!(inherited.len(), 3);
    assert_eq!(inherited[1].type_names, vec!["transport".to_string()]);
}

#[test]
fn parse_style_reads_rules_and_symbolizers() {
    let style = parse_style(&json!({
        "feature_type_styles": [{
            "type_names": ["poi"],
            "rules": [
                {
                    "name": "shops",
                    "filter": ["==", "category", "shop"],
                    "min_scale": 100,
                    "max_scale": 50000,
                    "symbolizers": [
                        {"type": "point", "mark": "circle", "size": 4},
                        {"type": "text", "label": ["get", "name"]}
                    ]
                },
                {"else": true, "symbolizers": [{"type": "point"}, {"type": "line"}]}
            ]
        }]
    }))
    .expect("style");

    assert_eq!(style.feature_type_styles.len(), 1);
    let group = &style.feature_type_styles[0];
    assert_eq!(group.type_names, vec!["poi".to_string()]);

    let shops = &group.rules[0];
    assert_eq!(shops.name.as_deref(), Some("shops"));
    assert_eq!(shops.min_scale, 100.0);
    assert_eq!(shops.max_scale, 50_000.0);
    assert!(!shops.otherwise);
    assert_eq!(
        shops.symbolizers,
        vec![
            Symbolizer::Point {
                mark: "circle".to_string(),
                size: 4.0
            },
            Symbolizer::Text {
                label: Expr::Get("name".to_string())
            },
        ]
    );

    let fallback = &group.rules[1];
    assert!(fallback.otherwise);
    assert!(fallback.filter.is_none());
    assert_eq!(fallback.max_scale, f64::INFINITY);
    assert_eq!(
        fallback.symbolizers,
        vec![
            Symbolizer::Point {
                mark: "circle".to_string(),
                size: 6.0
            },
            Symbolizer::Line { width: 2.0 },
        ]
    );
}

#[test]
fn parse_style_rejects_unknown_symbolizer() {
    let err = parse_style(&json!({
        "feature_type_styles": [{"rules": [{"symbolizers": [{"type": "raster"}]}]}]
    }))
    .expect_err("raster symbolizer");
    assert!(format!("{err:#}").contains("unsupported symbolizer type: raster"));
}

#[test]
fn read_style_from_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("style.json");
    std::fs::write(
        &path,
        r#"{"feature_type_styles": [{"rules": [{"symbolizers": [{"type": "polygon"}]}]}]}"#,
    )
    .expect("write style");
    let style = read_style(&path).expect("read style");
    assert_eq!(style.feature_type_styles[0].rules[0].symbolizers, vec![Symbolizer::Polygon]);
}
