use std::fmt;

use geo::Intersects;
use geo_types::{Coord, Rect};
use serde_json::Value as Json;

use crate::feature::{Feature, Value, geometry_type};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    True,
    False,
    Unknown,
}

impl FilterResult {
    fn from_bool(value: bool) -> Self {
        if value {
            FilterResult::True
        } else {
            FilterResult::False
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Neq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Get(String),
    GeometryType,
    Coalesce(Vec<Expr>),
    Concat(Vec<Expr>),
    Match {
        input: Box<Expr>,
        cases: Vec<(Value, Expr)>,
        fallback: Box<Expr>,
    },
    Case {
        branches: Vec<(Filter, Expr)>,
        fallback: Box<Expr>,
    },
}

impl Expr {
    pub fn evaluate(&self, feature: &Feature) -> Option<Value> {
        match self {
            Expr::Literal(value) => Some(value.clone()),
            Expr::Get(name) => feature.property(name).cloned(),
            Expr::GeometryType => Some(Value::String(geometry_type(&feature.geometry).to_string())),
            Expr::Coalesce(items) => items.iter().find_map(|item| item.evaluate(feature)),
            Expr::Concat(items) => {
                let mut text = String::new();
                for item in items {
                    if let Some(value) = item.evaluate(feature) {
                        text.push_str(&value.to_text());
                    }
                }
                Some(Value::String(text))
            }
            Expr::Match {
                input,
                cases,
                fallback,
            } => {
                let input_value = input.evaluate(feature)?;
                for (match_value, output) in cases {
                    if input_value.equals(match_value) {
                        return output.evaluate(feature);
                    }
                }
                fallback.evaluate(feature)
            }
            Expr::Case { branches, fallback } => {
                for (condition, output) in branches {
                    match condition.evaluate(feature) {
                        FilterResult::True => return output.evaluate(feature),
                        FilterResult::False => {}
                        FilterResult::Unknown => return None,
                    }
                }
                fallback.evaluate(feature)
            }
        }
    }

    /// Evaluate as label text. Missing values yield an empty string.
    pub fn evaluate_text(&self, feature: &Feature) -> String {
        self.evaluate(feature)
            .map(|value| value.to_text())
            .unwrap_or_default()
    }
}

/// Attribute and spatial predicate over a feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Include,
    Compare(CompareOp, Expr, Expr),
    In(Expr, Vec<Value>),
    NotIn(Expr, Vec<Value>),
    Has(String),
    NotHas(String),
    All(Vec<Filter>),
    Any(Vec<Filter>),
    None(Vec<Filter>),
    Not(Box<Filter>),
    Intersects(Rect<f64>),
    Unknown,
}

impl Filter {
    /// Conjunction of `parts`, dropping `Include` terms. An empty conjunction
    /// is `Include`; a single term is returned as is.
    pub fn and(parts: Vec<Filter>) -> Filter {
        let mut parts: Vec<Filter> = parts
            .into_iter()
            .filter(|part| *part != Filter::Include)
            .collect();
        match parts.len() {
            0 => Filter::Include,
            1 => parts.remove(0),
            _ => Filter::All(parts),
        }
    }

    /// Disjunction of `parts`. A single term is returned as is.
    pub fn or(mut parts: Vec<Filter>) -> Filter {
        match parts.len() {
            0 => Filter::Include,
            1 => parts.remove(0),
            _ => Filter::Any(parts),
        }
    }

    pub fn bbox(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Filter {
        Filter::Intersects(Rect::new(
            Coord { x: min_x, y: min_y },
            Coord { x: max_x, y: max_y },
        ))
    }

    pub fn evaluate(&self, feature: &Feature) -> FilterResult {
        match self {
            Filter::Include => FilterResult::True,
            Filter::Compare(op, left, right) => {
                match (left.evaluate(feature), right.evaluate(feature)) {
                    (Some(actual), Some(expected)) => compare(*op, &actual, &expected),
                    _ => FilterResult::Unknown,
                }
            }
            Filter::In(key, values) => match key.evaluate(feature) {
                Some(actual) => FilterResult::from_bool(values.iter().any(|v| actual.equals(v))),
                None => FilterResult::Unknown,
            },
            Filter::NotIn(key, values) => match key.evaluate(feature) {
                Some(actual) => FilterResult::from_bool(!values.iter().any(|v| actual.equals(v))),
                None => FilterResult::Unknown,
            },
            Filter::Has(key) => FilterResult::from_bool(feature.properties.contains_key(key)),
            Filter::NotHas(key) => FilterResult::from_bool(!feature.properties.contains_key(key)),
            Filter::All(filters) => {
                let mut saw_unknown = false;
                for filter in filters {
                    match filter.evaluate(feature) {
                        FilterResult::True => {}
                        FilterResult::False => return FilterResult::False,
                        FilterResult::Unknown => saw_unknown = true,
                    }
                }
                if saw_unknown {
                    FilterResult::Unknown
                } else {
                    FilterResult::True
                }
            }
            Filter::Any(filters) => {
                let mut saw_unknown = false;
                for filter in filters {
                    match filter.evaluate(feature) {
                        FilterResult::True => return FilterResult::True,
                        FilterResult::False => {}
                        FilterResult::Unknown => saw_unknown = true,
                    }
                }
                if saw_unknown {
                    FilterResult::Unknown
                } else {
                    FilterResult::False
                }
            }
            Filter::None(filters) => {
                let mut saw_unknown = false;
                for filter in filters {
                    match filter.evaluate(feature) {
                        FilterResult::True => return FilterResult::False,
                        FilterResult::False => {}
                        FilterResult::Unknown => saw_unknown = true,
                    }
                }
                if saw_unknown {
                    FilterResult::Unknown
                } else {
                    FilterResult::True
                }
            }
            Filter::Not(filter) => match filter.evaluate(feature) {
                FilterResult::True => FilterResult::False,
                FilterResult::False => FilterResult::True,
                FilterResult::Unknown => FilterResult::Unknown,
            },
            Filter::Intersects(rect) => FilterResult::from_bool(feature.geometry.intersects(rect)),
            Filter::Unknown => FilterResult::Unknown,
        }
    }
}

fn compare(op: CompareOp, actual: &Value, expected: &Value) -> FilterResult {
    use std::cmp::Ordering::*;
    match op {
        CompareOp::Eq => FilterResult::from_bool(actual.equals(expected)),
        CompareOp::Neq => FilterResult::from_bool(!actual.equals(expected)),
        _ => match actual.compare(expected) {
            None => FilterResult::Unknown,
            Some(ordering) => FilterResult::from_bool(match op {
                CompareOp::Lt => ordering == Less,
                CompareOp::Le => ordering != Greater,
                CompareOp::Gt => ordering == Greater,
                CompareOp::Ge => ordering != Less,
                CompareOp::Eq | CompareOp::Neq => unreachable!(),
            }),
        },
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(text) => write!(f, "{text:?}"),
            Value::Number(number) => write!(f, "{number}"),
            Value::Bool(flag) => write!(f, "{flag}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::Get(name) => write!(f, "[\"get\",{name:?}]"),
            Expr::GeometryType => write!(f, "[\"geometry-type\"]"),
            Expr::Coalesce(items) => write_list(f, "coalesce", items),
            Expr::Concat(items) => write_list(f, "concat", items),
            Expr::Match { input, cases, fallback } => {
                write!(f, "[\"match\",{input}")?;
                for (value, output) in cases {
                    write!(f, ",{value},{output}")?;
                }
                write!(f, ",{fallback}]")
            }
            Expr::Case { branches, fallback } => {
                write!(f, "[\"case\"")?;
                for (condition, output) in branches {
                    write!(f, ",{condition},{output}")?;
                }
                write!(f, ",{fallback}]")
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Include => write!(f, "true"),
            Filter::Compare(op, left, right) => write!(f, "[{:?},{left},{right}]", op.symbol()),
            Filter::In(key, values) => {
                write!(f, "[\"in\",{key}")?;
                for value in values {
                    write!(f, ",{value}")?;
                }
                write!(f, "]")
            }
            Filter::NotIn(key, values) => {
                write!(f, "[\"!in\",{key}")?;
                for value in values {
                    write!(f, ",{value}")?;
                }
                write!(f, "]")
            }
            Filter::Has(key) => write!(f, "[\"has\",{key:?}]"),
            Filter::NotHas(key) => write!(f, "[\"!has\",{key:?}]"),
            Filter::All(filters) => write_list(f, "all", filters),
            Filter::Any(filters) => write_list(f, "any", filters),
            Filter::None(filters) => write_list(f, "none", filters),
            Filter::Not(filter) => write!(f, "[\"!\",{filter}]"),
            Filter::Intersects(rect) => write!(
                f,
                "[\"bbox\",{},{},{},{}]",
                rect.min().x,
                rect.min().y,
                rect.max().x,
                rect.max().y
            ),
            Filter::Unknown => write!(f, "[\"unknown\"]"),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, op: &str, items: &[T]) -> fmt::Result {
    write!(f, "[{op:?}")?;
    for item in items {
        write!(f, ",{item}")?;
    }
    write!(f, "]")
}

/// Parse a filter expression. Unsupported operators become `Filter::Unknown`
/// so that evaluation can report them instead of failing the whole style.
pub fn parse_filter(value: &Json) -> Option<Filter> {
    if let Some(flag) = value.as_bool() {
        return Some(if flag {
            Filter::Include
        } else {
            Filter::Not(Box::new(Filter::Include))
        });
    }
    let array = value.as_array()?;
    if array.is_empty() {
        return None;
    }
    let op = array[0].as_str()?;
    match op {
        "!" => {
            if array.len() < 2 {
                return Some(Filter::Unknown);
            }
            let inner = parse_filter(&array[1]).unwrap_or(Filter::Unknown);
            Some(Filter::Not(Box::new(inner)))
        }
        "==" | "!=" | "<" | "<=" | ">" | ">=" => {
            if array.len() < 3 {
                return Some(Filter::Unknown);
            }
            let left = parse_filter_lhs(&array[1])?;
            let right = parse_expr(&array[2])?;
            let op = match op {
                "==" => CompareOp::Eq,
                "!=" => CompareOp::Neq,
                "<" => CompareOp::Lt,
                "<=" => CompareOp::Le,
                ">" => CompareOp::Gt,
                _ => CompareOp::Ge,
            };
            Some(Filter::Compare(op, left, right))
        }
        "in" | "!in" => {
            if array.len() < 3 {
                return Some(Filter::Unknown);
            }
            let key = parse_filter_lhs(&array[1])?;
            let items = match array[2].as_array() {
                Some(list) => list.as_slice(),
                None => &array[2..],
            };
            let mut values = Vec::new();
            for item in items {
                match Value::from_json(item) {
                    Some(value) => values.push(value),
                    None => return Some(Filter::Unknown),
                }
            }
            if op == "in" {
                Some(Filter::In(key, values))
            } else {
                Some(Filter::NotIn(key, values))
            }
        }
        "has" | "!has" => {
            let Some(key) = array.get(1).and_then(|v| v.as_str()) else {
                return Some(Filter::Unknown);
            };
            if op == "has" {
                Some(Filter::Has(key.to_string()))
            } else {
                Some(Filter::NotHas(key.to_string()))
            }
        }
        "all" | "any" | "none" => {
            let filters = array[1..]
                .iter()
                .map(|item| parse_filter(item).unwrap_or(Filter::Unknown))
                .collect();
            match op {
                "all" => Some(Filter::All(filters)),
                "any" => Some(Filter::Any(filters)),
                _ => Some(Filter::None(filters)),
            }
        }
        "bbox" => {
            let coords: Option<Vec<f64>> = array[1..].iter().map(|v| v.as_f64()).collect();
            match coords.as_deref() {
                Some([min_x, min_y, max_x, max_y]) => {
                    Some(Filter::bbox(*min_x, *min_y, *max_x, *max_y))
                }
                _ => Some(Filter::Unknown),
            }
        }
        _ => Some(Filter::Unknown),
    }
}

pub fn parse_expr(value: &Json) -> Option<Expr> {
    if let Some(literal) = Value::from_json(value) {
        return Some(Expr::Literal(literal));
    }
    let array = value.as_array()?;
    if array.is_empty() {
        return None;
    }
    let op = array[0].as_str()?;
    match op {
        "get" => {
            let key = array.get(1)?.as_str()?;
            Some(Expr::Get(key.to_string()))
        }
        "geometry-type" => Some(Expr::GeometryType),
        "coalesce" | "concat" => {
            let mut items = Vec::new();
            for item in array.iter().skip(1) {
                items.push(parse_expr(item)?);
            }
            if items.is_empty() {
                None
            } else if op == "coalesce" {
                Some(Expr::Coalesce(items))
            } else {
                Some(Expr::Concat(items))
            }
        }
        "match" => {
            if array.len() < 4 {
                return None;
            }
            let input = parse_expr(&array[1])?;
            let mut cases = Vec::new();
            let mut idx = 2;
            while idx + 1 < array.len() - 1 {
                let match_value = Value::from_json(&array[idx])?;
                let output = parse_expr(&array[idx + 1])?;
                cases.push((match_value, output));
                idx += 2;
            }
            let fallback = parse_expr(array.last()?)?;
            Some(Expr::Match {
                input: Box::new(input),
                cases,
                fallback: Box::new(fallback),
            })
        }
        "case" => {
            if array.len() < 4 {
                return None;
            }
            let mut branches = Vec::new();
            let mut idx = 1;
            while idx + 1 < array.len() - 1 {
                let condition = parse_filter(&array[idx]).unwrap_or(Filter::Unknown);
                let output = parse_expr(&array[idx + 1])?;
                branches.push((condition, output));
                idx += 2;
            }
            let fallback = parse_expr(array.last()?)?;
            Some(Expr::Case {
                branches,
                fallback: Box::new(fallback),
            })
        }
        _ => None,
    }
}

/// Left-hand side of a comparison: a bare string names a property.
fn parse_filter_lhs(value: &Json) -> Option<Expr> {
    if let Some(name) = value.as_str() {
        return Some(match name {
            "$type" | "geometry-type" => Expr::GeometryType,
            _ => Expr::Get(name.to_string()),
        });
    }
    parse_expr(value)
}
