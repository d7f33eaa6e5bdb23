use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value as Json;

use crate::feature::Feature;
use crate::filter::{Expr, Filter, FilterResult, parse_expr, parse_filter};

pub const DEFAULT_MARK: &str = "circle";

#[derive(Debug, Clone, PartialEq)]
pub enum Symbolizer {
    Point { mark: String, size: f64 },
    Line { width: f64 },
    Polygon,
    Text { label: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: Option<String>,
    pub filter: Option<Filter>,
    pub min_scale: f64,
    pub max_scale: f64,
    /// Applies only when no ordinary rule of the same group matched.
    pub otherwise: bool,
    pub symbolizers: Vec<Symbolizer>,
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            name: None,
            filter: None,
            min_scale: 0.0,
            max_scale: f64::INFINITY,
            otherwise: false,
            symbolizers: Vec::new(),
        }
    }
}

impl Rule {
    /// Scale windows are half open: `[min_scale, max_scale)`.
    pub fn is_visible_at(&self, scale_denominator: f64) -> bool {
        scale_denominator >= self.min_scale && scale_denominator < self.max_scale
    }

    fn matches(&self, feature: &Feature) -> bool {
        match self.filter.as_ref() {
            None => true,
            Some(filter) => match filter.evaluate(feature) {
                FilterResult::True => true,
                FilterResult::False => false,
                FilterResult::Unknown => {
                    tracing::debug!(
                        feature = %feature.id,
                        filter = %filter,
                        "filter result unknown"
                    );
                    false
                }
            },
        }
    }
}

/// Group of rules scoped to feature type names. An empty `type_names` list
/// applies to every feature type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTypeStyle {
    pub type_names: Vec<String>,
    pub rules: Vec<Rule>,
}

impl FeatureTypeStyle {
    fn applies_to(&self, type_name: &str, super_types: &[String]) -> bool {
        self.type_names.is_empty()
            || self.type_names.iter().any(|name| {
                name == type_name || super_types.iter().any(|parent| parent == name)
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    pub feature_type_styles: Vec<FeatureTypeStyle>,
}

impl Style {
    pub fn new(feature_type_styles: Vec<FeatureTypeStyle>) -> Self {
        Self {
            feature_type_styles,
        }
    }

    /// Groups that apply to `type_name`, directly or through one of the
    /// type's ancestors, in style order.
    pub fn groups_for(&self, type_name: &str, super_types: &[String]) -> Vec<&FeatureTypeStyle> {
        self.feature_type_styles
            .iter()
            .filter(|group| group.applies_to(type_name, super_types))
            .collect()
    }
}

/// Rules of `groups` that apply to `feature` at `scale_denominator`.
///
/// Within each group the ordinary rules are tried first; when none of them
/// matched, every otherwise rule of that group is selected instead.
pub fn match_rules<'a>(
    groups: &[&'a FeatureTypeStyle],
    feature: &Feature,
    scale_denominator: f64,
) -> Vec<&'a Rule> {
    let mut matched = Vec::new();
    for group in groups {
        let before = matched.len();
        for rule in group.rules.iter().filter(|rule| !rule.otherwise) {
            if rule.is_visible_at(scale_denominator) && rule.matches(feature) {
                matched.push(rule);
            }
        }
        if matched.len() == before {
            matched.extend(group.rules.iter().filter(|rule| rule.otherwise));
        }
    }
    matched
}

pub fn parse_style(value: &Json) -> Result<Style> {
    let groups = value
        .get("feature_type_styles")
        .and_then(|groups| groups.as_array())
        .ok_or_else(|| anyhow::anyhow!("style json missing feature_type_styles array"))?;

    let mut feature_type_styles = Vec::new();
    for (idx, group) in groups.iter().enumerate() {
        let type_names = group
            .get("type_names")
            .and_then(|v| v.as_array())
            .map(|names| {
                names
                    .iter()
                    .filter_map(|name| name.as_str())
                    .map(|name| name.to_string())
                    .collect()
            })
            .unwrap_or_default();
        let rules = group
            .get("rules")
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow::anyhow!("feature type style {idx} missing rules array"))?
            .iter()
            .map(parse_rule)
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("parse feature type style {idx}"))?;
        feature_type_styles.push(FeatureTypeStyle { type_names, rules });
    }
    Ok(Style {
        feature_type_styles,
    })
}

fn parse_rule(value: &Json) -> Result<Rule> {
    let name = value
        .get("name")
        .and_then(|v| v.as_str())
        .map(|v| v.to_string());
    let filter = match value.get("filter") {
        None | Some(Json::Null) => None,
        Some(raw) => Some(parse_filter(raw).unwrap_or(Filter::Unknown)),
    };
    let otherwise = value.get("else").and_then(|v| v.as_bool()).unwrap_or(false);
    let min_scale = value.get("min_scale").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let max_scale = value
        .get("max_scale")
        .and_then(|v| v.as_f64())
        .unwrap_or(f64::INFINITY);
    let symbolizers = match value.get("symbolizers").and_then(|v| v.as_array()) {
        Some(items) => items
            .iter()
            .map(parse_symbolizer)
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    Ok(Rule {
        name,
        filter,
        min_scale,
        max_scale,
        otherwise,
        symbolizers,
    })
}

fn parse_symbolizer(value: &Json) -> Result<Symbolizer> {
    let kind = value
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("symbolizer missing type"))?;
    match kind {
        "point" => Ok(Symbolizer::Point {
            mark: value
                .get("mark")
                .and_then(|v| v.as_str())
                .unwrap_or(DEFAULT_MARK)
                .to_string(),
            size: value
                .get("size")
                .and_then(|v| v.as_f64())
                .unwrap_or(crate::encode::DEFAULT_RADIUS),
        }),
        "line" => Ok(Symbolizer::Line {
            width: value
                .get("width")
                .and_then(|v| v.as_f64())
                .unwrap_or(crate::encode::DEFAULT_LINE_WIDTH),
        }),
        "polygon" => Ok(Symbolizer::Polygon),
        "text" => {
            let raw = value
                .get("label")
                .ok_or_else(|| anyhow::anyhow!("text symbolizer missing label"))?;
            let label = parse_expr(raw)
                .ok_or_else(|| anyhow::anyhow!("unsupported label expression: {raw}"))?;
            Ok(Symbolizer::Text { label })
        }
        other => anyhow::bail!("unsupported symbolizer type: {other}"),
    }
}

pub fn read_style(path: &Path) -> Result<Style> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read style file: {}", path.display()))?;
    let value: Json = serde_json::from_str(&contents).context("parse style json")?;
    parse_style(&value)
}
