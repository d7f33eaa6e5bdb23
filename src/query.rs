use geo_types::Rect;

use crate::filter::Filter;
use crate::style::FeatureTypeStyle;

/// Predicate that selects every feature the rules of `groups` could render.
///
/// `None` when at least one rule has no filter or is an otherwise rule, since
/// the style can then match features no single predicate describes.
pub fn style_filter(groups: &[&FeatureTypeStyle]) -> Option<Filter> {
    let mut filters = Vec::new();
    for rule in groups.iter().flat_map(|group| group.rules.iter()) {
        if rule.otherwise {
            return None;
        }
        filters.push(rule.filter.clone()?);
    }
    if filters.is_empty() {
        return None;
    }
    Some(Filter::or(filters))
}

/// Build the fetch predicate for one layer:
/// `bbox AND definition AND (rule1 OR rule2 ...)`, omitting absent terms.
///
/// The result only narrows the fetch. Rules are evaluated again per feature,
/// including their scale windows.
pub fn build_query(
    groups: &[&FeatureTypeStyle],
    area: Rect<f64>,
    definition: Option<&Filter>,
) -> Filter {
    let mut parts = vec![Filter::Intersects(area)];
    if let Some(definition) = definition {
        parts.push(definition.clone());
    }
    if let Some(style) = style_filter(groups) {
        parts.push(style);
    }
    Filter::and(parts)
}
