//! Runtime schema trees.
//!
//! A [`SchemaNode`] describes validated data: its kind, its children and a small metadata
//! side table. The depicters walk these trees; the only runtime behaviour they rely on is
//! [`SchemaNode::parse`], which is used to probe transforms and to answer optionality and
//! nullability questions the same way validation would.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://\S+$").expect("valid url regex"));
static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("valid uuid regex")
});

/// Validation failure reported by [`SchemaNode::parse`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseIssue {
    pub message: String,
}

impl ParseIssue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn at(self, segment: impl fmt::Display) -> Self {
        Self::new(format!("{}: {}", segment, self.message))
    }
}

pub type TransformFn = Rc<dyn Fn(Value) -> std::result::Result<Value, String>>;

/// A named value transformation
#[derive(Clone)]
pub struct Transform {
    name: String,
    apply: TransformFn,
}

impl Transform {
    pub fn new(
        name: impl Into<String>,
        apply: impl Fn(Value) -> std::result::Result<Value, String> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            apply: Rc::new(apply),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, value: Value) -> std::result::Result<Value, String> {
        (self.apply)(value)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform").field("name", &self.name).finish()
    }
}

/// A named predicate over parsed values
#[derive(Clone)]
pub struct Refinement {
    name: String,
    check: Rc<dyn Fn(&Value) -> bool>,
}

impl Refinement {
    pub fn new(name: impl Into<String>, check: impl Fn(&Value) -> bool + 'static) -> Self {
        Self {
            name: name.into(),
            check: Rc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

impl fmt::Debug for Refinement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refinement").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone)]
pub enum Effect {
    Transform(Transform),
    Refine(Refinement),
}

/// Deferred reference to a schema, the building block for self-referential trees.
///
/// The getter builds the referenced node on demand, so a schema can mention itself
/// without the tree (or an `Rc` graph) ever becoming cyclic. The key names the referenced
/// schema: two lazy nodes with the same key must resolve to the same schema.
#[derive(Clone)]
pub struct LazySchema {
    key: String,
    getter: Rc<dyn Fn() -> SchemaNode>,
}

impl LazySchema {
    pub fn resolve(&self) -> SchemaNode {
        (self.getter)()
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for LazySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySchema").field("key", &self.key).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Email,
    Url,
    Uuid,
    DateTime,
}

impl StringFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StringFormat::Email => "email",
            StringFormat::Url => "url",
            StringFormat::Uuid => "uuid",
            StringFormat::DateTime => "date-time",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "email" => Some(StringFormat::Email),
            "url" => Some(StringFormat::Url),
            "uuid" => Some(StringFormat::Uuid),
            "date-time" | "datetime" => Some(StringFormat::DateTime),
            _ => None,
        }
    }

    fn matches(&self, text: &str) -> bool {
        match self {
            StringFormat::Email => EMAIL_RE.is_match(text),
            StringFormat::Url => URL_RE.is_match(text),
            StringFormat::Uuid => UUID_RE.is_match(text),
            StringFormat::DateTime => DateTime::parse_from_rfc3339(text).is_ok(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringChecks {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub format: Option<StringFormat>,
    pub pattern: Option<String>,
    pub coerce: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberChecks {
    pub int: bool,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub coerce: bool,
}

/// The closed set of schema kinds
#[derive(Debug, Clone)]
pub enum SchemaKind {
    String(StringChecks),
    Number(NumberChecks),
    BigInt { coerce: bool },
    Boolean { coerce: bool },
    Date { coerce: bool },
    Null,
    Any,
    Unknown,
    Void,
    Literal(Value),
    Enum(Vec<String>),
    Array {
        item: Box<SchemaNode>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    Tuple {
        items: Vec<SchemaNode>,
        rest: Option<Box<SchemaNode>>,
    },
    Object {
        shape: IndexMap<String, SchemaNode>,
    },
    Record {
        key: Box<SchemaNode>,
        value: Box<SchemaNode>,
    },
    Union(Vec<SchemaNode>),
    DiscriminatedUnion {
        discriminator: String,
        options: Vec<SchemaNode>,
    },
    Intersection(Box<SchemaNode>, Box<SchemaNode>),
    Optional(Box<SchemaNode>),
    Nullable(Box<SchemaNode>),
    Default {
        inner: Box<SchemaNode>,
        value: Value,
    },
    Catch {
        inner: Box<SchemaNode>,
        value: Value,
    },
    Branded {
        inner: Box<SchemaNode>,
        brand: String,
    },
    Readonly(Box<SchemaNode>),
    Effect {
        inner: Box<SchemaNode>,
        effect: Effect,
    },
    Preprocess {
        inner: Box<SchemaNode>,
        transform: Transform,
    },
    Pipeline {
        input: Box<SchemaNode>,
        output: Box<SchemaNode>,
    },
    Lazy(LazySchema),
    Function {
        args: Box<SchemaNode>,
        returns: Box<SchemaNode>,
    },
    /// A kind this crate has no rules for
    Custom(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub description: Option<String>,
    pub examples: Vec<Value>,
}

/// A node of a schema tree
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub meta: Metadata,
}

impl SchemaNode {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            meta: Metadata::default(),
        }
    }

    pub fn string() -> Self {
        Self::new(SchemaKind::String(StringChecks::default()))
    }

    pub fn string_with(checks: StringChecks) -> Self {
        Self::new(SchemaKind::String(checks))
    }

    pub fn number() -> Self {
        Self::new(SchemaKind::Number(NumberChecks::default()))
    }

    pub fn int() -> Self {
        Self::new(SchemaKind::Number(NumberChecks {
            int: true,
            ..NumberChecks::default()
        }))
    }

    pub fn number_with(checks: NumberChecks) -> Self {
        Self::new(SchemaKind::Number(checks))
    }

    pub fn bigint() -> Self {
        Self::new(SchemaKind::BigInt { coerce: false })
    }

    pub fn boolean() -> Self {
        Self::new(SchemaKind::Boolean { coerce: false })
    }

    pub fn date() -> Self {
        Self::new(SchemaKind::Date { coerce: false })
    }

    pub fn null() -> Self {
        Self::new(SchemaKind::Null)
    }

    pub fn any() -> Self {
        Self::new(SchemaKind::Any)
    }

    pub fn unknown() -> Self {
        Self::new(SchemaKind::Unknown)
    }

    pub fn void() -> Self {
        Self::new(SchemaKind::Void)
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::new(SchemaKind::Literal(value.into()))
    }

    pub fn enumeration<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::new(SchemaKind::Enum(values.into_iter().map(Into::into).collect()))
    }

    pub fn array(item: SchemaNode) -> Self {
        Self::new(SchemaKind::Array {
            item: Box::new(item),
            min_items: None,
            max_items: None,
        })
    }

    pub fn tuple(items: Vec<SchemaNode>) -> Self {
        Self::new(SchemaKind::Tuple { items, rest: None })
    }

    pub fn object<K: Into<String>>(shape: impl IntoIterator<Item = (K, SchemaNode)>) -> Self {
        Self::new(SchemaKind::Object {
            shape: shape.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        })
    }

    pub fn record(key: SchemaNode, value: SchemaNode) -> Self {
        Self::new(SchemaKind::Record {
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    pub fn union(options: Vec<SchemaNode>) -> Self {
        Self::new(SchemaKind::Union(options))
    }

    pub fn discriminated_union(discriminator: impl Into<String>, options: Vec<SchemaNode>) -> Self {
        Self::new(SchemaKind::DiscriminatedUnion {
            discriminator: discriminator.into(),
            options,
        })
    }

    pub fn intersection(left: SchemaNode, right: SchemaNode) -> Self {
        Self::new(SchemaKind::Intersection(Box::new(left), Box::new(right)))
    }

    /// Lazy reference keyed by the getter's type, which suits named functions.
    /// Closures shared by several references need [`SchemaNode::lazy_named`].
    pub fn lazy<F>(getter: F) -> Self
    where
        F: Fn() -> SchemaNode + 'static,
    {
        Self::lazy_named(std::any::type_name::<F>(), getter)
    }

    pub fn lazy_named(key: impl Into<String>, getter: impl Fn() -> SchemaNode + 'static) -> Self {
        Self::new(SchemaKind::Lazy(LazySchema {
            key: key.into(),
            getter: Rc::new(getter),
        }))
    }

    pub fn function(args: SchemaNode, returns: SchemaNode) -> Self {
        Self::new(SchemaKind::Function {
            args: Box::new(args),
            returns: Box::new(returns),
        })
    }

    pub fn preprocess(transform: Transform, inner: SchemaNode) -> Self {
        Self::new(SchemaKind::Preprocess {
            inner: Box::new(inner),
            transform,
        })
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Self::new(SchemaKind::Custom(name.into()))
    }

    pub fn optional(self) -> Self {
        Self::new(SchemaKind::Optional(Box::new(self)))
    }

    pub fn nullable(self) -> Self {
        Self::new(SchemaKind::Nullable(Box::new(self)))
    }

    pub fn default_value(self, value: impl Into<Value>) -> Self {
        Self::new(SchemaKind::Default {
            inner: Box::new(self),
            value: value.into(),
        })
    }

    pub fn catch_value(self, value: impl Into<Value>) -> Self {
        Self::new(SchemaKind::Catch {
            inner: Box::new(self),
            value: value.into(),
        })
    }

    pub fn brand(self, brand: impl Into<String>) -> Self {
        Self::new(SchemaKind::Branded {
            inner: Box::new(self),
            brand: brand.into(),
        })
    }

    pub fn readonly(self) -> Self {
        Self::new(SchemaKind::Readonly(Box::new(self)))
    }

    pub fn transform(self, transform: Transform) -> Self {
        Self::new(SchemaKind::Effect {
            inner: Box::new(self),
            effect: Effect::Transform(transform),
        })
    }

    pub fn refine(self, refinement: Refinement) -> Self {
        Self::new(SchemaKind::Effect {
            inner: Box::new(self),
            effect: Effect::Refine(refinement),
        })
    }

    pub fn pipe(self, output: SchemaNode) -> Self {
        Self::new(SchemaKind::Pipeline {
            input: Box::new(self),
            output: Box::new(output),
        })
    }

    /// Sets the variadic element of a tuple. Other kinds are returned unchanged.
    pub fn rest(mut self, rest: SchemaNode) -> Self {
        if let SchemaKind::Tuple { rest: slot, .. } = &mut self.kind {
            *slot = Some(Box::new(rest));
        }
        self
    }

    /// Turns on input coercion for primitive kinds
    pub fn coerce(mut self) -> Self {
        match &mut self.kind {
            SchemaKind::String(checks) => checks.coerce = true,
            SchemaKind::Number(checks) => checks.coerce = true,
            SchemaKind::BigInt { coerce }
            | SchemaKind::Boolean { coerce }
            | SchemaKind::Date { coerce } => *coerce = true,
            _ => {}
        }
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    pub fn example(mut self, example: impl Into<Value>) -> Self {
        self.meta.examples.push(example.into());
        self
    }

    pub fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    /// Kind tag used in diagnostics
    pub fn kind_name(&self) -> &str {
        match &self.kind {
            SchemaKind::String(_) => "string",
            SchemaKind::Number(_) => "number",
            SchemaKind::BigInt { .. } => "bigint",
            SchemaKind::Boolean { .. } => "boolean",
            SchemaKind::Date { .. } => "date",
            SchemaKind::Null => "null",
            SchemaKind::Any => "any",
            SchemaKind::Unknown => "unknown",
            SchemaKind::Void => "void",
            SchemaKind::Literal(_) => "literal",
            SchemaKind::Enum(_) => "enum",
            SchemaKind::Array { .. } => "array",
            SchemaKind::Tuple { .. } => "tuple",
            SchemaKind::Object { .. } => "object",
            SchemaKind::Record { .. } => "record",
            SchemaKind::Union(_) => "union",
            SchemaKind::DiscriminatedUnion { .. } => "discriminatedUnion",
            SchemaKind::Intersection(..) => "intersection",
            SchemaKind::Optional(_) => "optional",
            SchemaKind::Nullable(_) => "nullable",
            SchemaKind::Default { .. } => "default",
            SchemaKind::Catch { .. } => "catch",
            SchemaKind::Branded { .. } => "branded",
            SchemaKind::Readonly(_) => "readonly",
            SchemaKind::Effect { .. } => "effect",
            SchemaKind::Preprocess { .. } => "preprocess",
            SchemaKind::Pipeline { .. } => "pipeline",
            SchemaKind::Lazy(_) => "lazy",
            SchemaKind::Function { .. } => "function",
            SchemaKind::Custom(name) => name,
        }
    }

    /// Whether the node itself coerces its input. Wrappers are not looked through.
    pub fn has_coercion(&self) -> bool {
        match &self.kind {
            SchemaKind::String(checks) => checks.coerce,
            SchemaKind::Number(checks) => checks.coerce,
            SchemaKind::BigInt { coerce }
            | SchemaKind::Boolean { coerce }
            | SchemaKind::Date { coerce } => *coerce,
            _ => false,
        }
    }

    /// Whether an absent value passes validation
    pub fn is_optional(&self) -> bool {
        self.parse(None).is_ok()
    }

    /// Whether `null` passes validation
    pub fn is_nullable(&self) -> bool {
        self.parse(Some(&Value::Null)).is_ok()
    }

    /// Fixed items and rest element when the node is a tuple
    pub fn tuple_parts(&self) -> Option<(&[SchemaNode], Option<&SchemaNode>)> {
        match &self.kind {
            SchemaKind::Tuple { items, rest } => Some((items.as_slice(), rest.as_deref())),
            _ => None,
        }
    }

    /// Validates `input` (`None` meaning absent) and returns the parsed output.
    pub fn parse(&self, input: Option<&Value>) -> Result<Option<Value>, ParseIssue> {
        match &self.kind {
            SchemaKind::String(checks) => parse_string(checks, input).map(Some),
            SchemaKind::Number(checks) => parse_number(checks, input).map(Some),
            SchemaKind::BigInt { coerce } => match input {
                Some(Value::Number(n)) if n.is_i64() || n.is_u64() => {
                    Ok(Some(Value::Number(n.clone())))
                }
                Some(Value::String(s)) if *coerce => s
                    .trim()
                    .parse::<i64>()
                    .map(|n| Some(Value::from(n)))
                    .map_err(|_| ParseIssue::new("expected an integer string")),
                Some(Value::Bool(b)) if *coerce => Ok(Some(Value::from(*b as i64))),
                other => Err(expected("bigint", other)),
            },
            SchemaKind::Boolean { coerce } => match input {
                Some(Value::Bool(b)) => Ok(Some(Value::Bool(*b))),
                other if *coerce => Ok(Some(Value::Bool(truthy(other)))),
                other => Err(expected("boolean", other)),
            },
            SchemaKind::Date { coerce } => parse_date(*coerce, input).map(Some),
            SchemaKind::Null => match input {
                Some(Value::Null) => Ok(Some(Value::Null)),
                other => Err(expected("null", other)),
            },
            SchemaKind::Any | SchemaKind::Unknown => Ok(input.cloned()),
            SchemaKind::Void => match input {
                None => Ok(None),
                other => Err(expected("void", other)),
            },
            SchemaKind::Literal(literal) => match input {
                Some(value) if value == literal => Ok(Some(value.clone())),
                _ => Err(ParseIssue::new(format!("expected literal {}", literal))),
            },
            SchemaKind::Enum(values) => match input {
                Some(Value::String(s)) if values.contains(s) => Ok(Some(Value::String(s.clone()))),
                _ => Err(ParseIssue::new(format!("expected one of {:?}", values))),
            },
            SchemaKind::Array {
                item,
                min_items,
                max_items,
            } => {
                let values = match input {
                    Some(Value::Array(values)) => values,
                    other => return Err(expected("array", other)),
                };
                check_len("array", values.len(), *min_items, *max_items)?;
                let mut out = Vec::with_capacity(values.len());
                for (index, value) in values.iter().enumerate() {
                    let parsed = item.parse(Some(value)).map_err(|e| e.at(index))?;
                    out.push(parsed.unwrap_or(Value::Null));
                }
                Ok(Some(Value::Array(out)))
            }
            SchemaKind::Tuple { items, rest } => {
                let values = match input {
                    Some(Value::Array(values)) => values,
                    other => return Err(expected("tuple", other)),
                };
                if values.len() < items.len() || (rest.is_none() && values.len() > items.len()) {
                    return Err(ParseIssue::new(format!(
                        "expected {} tuple elements, received {}",
                        items.len(),
                        values.len()
                    )));
                }
                let mut out = Vec::with_capacity(values.len());
                for (index, value) in values.iter().enumerate() {
                    let schema = items
                        .get(index)
                        .or(rest.as_deref())
                        .ok_or_else(|| ParseIssue::new("too many tuple elements"))?;
                    let parsed = schema.parse(Some(value)).map_err(|e| e.at(index))?;
                    out.push(parsed.unwrap_or(Value::Null));
                }
                Ok(Some(Value::Array(out)))
            }
            SchemaKind::Object { shape } => {
                let map = match input {
                    Some(Value::Object(map)) => map,
                    other => return Err(expected("object", other)),
                };
                let mut out = Map::new();
                for (key, schema) in shape {
                    if let Some(value) = schema.parse(map.get(key)).map_err(|e| e.at(key))? {
                        out.insert(key.clone(), value);
                    }
                }
                Ok(Some(Value::Object(out)))
            }
            SchemaKind::Record { key, value } => {
                let map = match input {
                    Some(Value::Object(map)) => map,
                    other => return Err(expected("record", other)),
                };
                let mut out = Map::new();
                for (k, v) in map {
                    let parsed_key = key
                        .parse(Some(&Value::String(k.clone())))
                        .map_err(|e| e.at(k))?;
                    let name = match parsed_key {
                        Some(Value::String(s)) => s,
                        _ => k.clone(),
                    };
                    if let Some(parsed) = value.parse(Some(v)).map_err(|e| e.at(k))? {
                        out.insert(name, parsed);
                    }
                }
                Ok(Some(Value::Object(out)))
            }
            SchemaKind::Union(options) | SchemaKind::DiscriminatedUnion { options, .. } => options
                .iter()
                .find_map(|option| option.parse(input).ok())
                .ok_or_else(|| ParseIssue::new("no union member matched")),
            SchemaKind::Intersection(left, right) => {
                match (left.parse(input)?, right.parse(input)?) {
                    (Some(Value::Object(mut a)), Some(Value::Object(b))) => {
                        a.extend(b);
                        Ok(Some(Value::Object(a)))
                    }
                    (a, b) if a == b => Ok(a),
                    _ => Err(ParseIssue::new("intersection results could not be merged")),
                }
            }
            SchemaKind::Optional(inner) => match input {
                None => Ok(None),
                Some(_) => inner.parse(input),
            },
            SchemaKind::Nullable(inner) => match input {
                Some(Value::Null) => Ok(Some(Value::Null)),
                _ => inner.parse(input),
            },
            SchemaKind::Default { inner, value } => match input {
                None => inner.parse(Some(value)),
                Some(_) => inner.parse(input),
            },
            SchemaKind::Catch { inner, value } => {
                Ok(inner.parse(input).unwrap_or_else(|_| Some(value.clone())))
            }
            SchemaKind::Branded { inner, .. } | SchemaKind::Readonly(inner) => inner.parse(input),
            SchemaKind::Effect { inner, effect } => {
                let parsed = inner.parse(input)?;
                match effect {
                    Effect::Transform(transform) => transform
                        .apply(parsed.unwrap_or(Value::Null))
                        .map(Some)
                        .map_err(ParseIssue::new),
                    Effect::Refine(refinement) => {
                        let subject = parsed.clone().unwrap_or(Value::Null);
                        if refinement.check(&subject) {
                            Ok(parsed)
                        } else {
                            Err(ParseIssue::new(format!(
                                "refinement `{}` failed",
                                refinement.name()
                            )))
                        }
                    }
                }
            }
            SchemaKind::Preprocess { inner, transform } => {
                let prepared = transform
                    .apply(input.cloned().unwrap_or(Value::Null))
                    .map_err(ParseIssue::new)?;
                inner.parse(Some(&prepared))
            }
            SchemaKind::Pipeline { input: first, output } => {
                let intermediate = first.parse(input)?;
                output.parse(intermediate.as_ref())
            }
            SchemaKind::Lazy(lazy) => lazy.resolve().parse(input),
            SchemaKind::Function { .. } => {
                Err(ParseIssue::new("functions cannot be parsed from data"))
            }
            SchemaKind::Custom(name) => {
                Err(ParseIssue::new(format!("no validator for kind `{}`", name)))
            }
        }
    }
}

/// Name of the JSON type of a value, `undefined` for an absent one
pub(crate) fn value_type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

/// Converts a float into the most natural JSON number (integers stay integers)
pub(crate) fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn expected(what: &str, received: Option<&Value>) -> ParseIssue {
    ParseIssue::new(format!(
        "expected {}, received {}",
        what,
        value_type_name(received)
    ))
}

fn check_len(
    what: &str,
    len: usize,
    min: Option<usize>,
    max: Option<usize>,
) -> Result<(), ParseIssue> {
    if let Some(min) = min {
        if len < min {
            return Err(ParseIssue::new(format!("{} shorter than {}", what, min)));
        }
    }
    if let Some(max) = max {
        if len > max {
            return Err(ParseIssue::new(format!("{} longer than {}", what, max)));
        }
    }
    Ok(())
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |n| n != 0.0 && !n.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn parse_string(checks: &StringChecks, input: Option<&Value>) -> Result<Value, ParseIssue> {
    let text = match input {
        Some(Value::String(s)) => s.clone(),
        None if checks.coerce => "undefined".to_string(),
        Some(other) if checks.coerce => other.to_string(),
        other => return Err(expected("string", other)),
    };
    check_len("string", text.chars().count(), checks.min_length, checks.max_length)?;
    if let Some(format) = checks.format {
        if !format.matches(&text) {
            return Err(ParseIssue::new(format!("invalid {}", format.as_str())));
        }
    }
    if let Some(pattern) = &checks.pattern {
        let re = Regex::new(pattern)
            .map_err(|e| ParseIssue::new(format!("invalid pattern {}: {}", pattern, e)))?;
        if !re.is_match(&text) {
            return Err(ParseIssue::new(format!("does not match {}", pattern)));
        }
    }
    Ok(Value::String(text))
}

fn coerce_to_f64(input: Option<&Value>) -> Option<f64> {
    match input {
        None => None,
        Some(Value::Null) => Some(0.0),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse().ok()
            }
        }
        Some(Value::Array(_)) | Some(Value::Object(_)) => None,
    }
}

fn parse_number(checks: &NumberChecks, input: Option<&Value>) -> Result<Value, ParseIssue> {
    let number = match input {
        Some(Value::Number(n)) => n.as_f64(),
        other if checks.coerce => coerce_to_f64(other),
        other => return Err(expected("number", other)),
    }
    .filter(|n| n.is_finite())
    .ok_or_else(|| ParseIssue::new("expected a finite number"))?;

    if checks.int && number.fract() != 0.0 {
        return Err(ParseIssue::new("expected an integer"));
    }
    if checks.minimum.map_or(false, |min| number < min)
        || checks.exclusive_minimum.map_or(false, |min| number <= min)
    {
        return Err(ParseIssue::new("number too small"));
    }
    if checks.maximum.map_or(false, |max| number > max)
        || checks.exclusive_maximum.map_or(false, |max| number >= max)
    {
        return Err(ParseIssue::new("number too big"));
    }
    Ok(number_value(number))
}

fn parse_date(coerce: bool, input: Option<&Value>) -> Result<Value, ParseIssue> {
    let parsed = match input {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        Some(Value::Number(n)) if coerce => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    };
    parsed
        .map(|d| Value::String(d.to_rfc3339()))
        .ok_or_else(|| expected("date", input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_strips_unknown_keys_and_skips_absent_optionals() {
        let schema = SchemaNode::object([
            ("name", SchemaNode::string()),
            ("age", SchemaNode::int().optional()),
        ]);
        let parsed = schema
            .parse(Some(&json!({"name": "Ann", "extra": true})))
            .unwrap();
        assert_eq!(parsed, Some(json!({"name": "Ann"})));
    }

    #[test]
    fn test_object_reports_path_of_failure() {
        let schema = SchemaNode::object([("name", SchemaNode::string())]);
        let err = schema.parse(Some(&json!({"name": 1}))).unwrap_err();
        assert_eq!(err.message, "name: expected string, received number");
    }

    #[test]
    fn test_coerced_primitives_accept_absent_values() {
        assert!(SchemaNode::string().coerce().is_optional());
        assert!(SchemaNode::boolean().coerce().is_optional());
        assert!(!SchemaNode::number().coerce().is_optional());
        assert!(!SchemaNode::string().is_optional());
    }

    #[test]
    fn test_optionality_of_wrappers() {
        assert!(SchemaNode::string().optional().is_optional());
        assert!(SchemaNode::string().default_value("x").is_optional());
        assert!(SchemaNode::any().is_optional());
        assert!(!SchemaNode::string().nullable().is_optional());
        assert!(SchemaNode::string().nullable().is_nullable());
    }

    #[test]
    fn test_tuple_with_rest() {
        let schema = SchemaNode::tuple(vec![SchemaNode::literal("pong")]).rest(SchemaNode::int());
        assert!(schema.parse(Some(&json!(["pong", 1, 2]))).is_ok());
        assert!(schema.parse(Some(&json!(["pong", "x"]))).is_err());
        assert!(schema.parse(Some(&json!([]))).is_err());

        let fixed = SchemaNode::tuple(vec![SchemaNode::string()]);
        assert!(fixed.parse(Some(&json!(["a", "b"]))).is_err());
    }

    #[test]
    fn test_transform_runs_after_validation() {
        let schema = SchemaNode::string().transform(Transform::new("length", |v| {
            let s = v.as_str().ok_or("not a string")?;
            Ok(json!(s.chars().count()))
        }));
        assert_eq!(schema.parse(Some(&json!("four"))).unwrap(), Some(json!(4)));
        assert!(schema.parse(Some(&json!(4))).is_err());
    }

    #[test]
    fn test_number_bounds_and_integers() {
        let schema = SchemaNode::number_with(NumberChecks {
            int: true,
            minimum: Some(1.0),
            exclusive_maximum: Some(10.0),
            ..NumberChecks::default()
        });
        assert_eq!(schema.parse(Some(&json!(5))).unwrap(), Some(json!(5)));
        assert!(schema.parse(Some(&json!(0))).is_err());
        assert!(schema.parse(Some(&json!(10))).is_err());
        assert!(schema.parse(Some(&json!(2.5))).is_err());
    }

    #[test]
    fn test_string_formats() {
        let email = SchemaNode::string_with(StringChecks {
            format: Some(StringFormat::Email),
            ..StringChecks::default()
        });
        assert!(email.parse(Some(&json!("a@b.io"))).is_ok());
        assert!(email.parse(Some(&json!("nope"))).is_err());
    }

    #[test]
    fn test_date_normalises_to_rfc3339() {
        let parsed = SchemaNode::date()
            .parse(Some(&json!("2024-01-02T03:04:05Z")))
            .unwrap();
        assert_eq!(parsed, Some(json!("2024-01-02T03:04:05+00:00")));
        assert!(SchemaNode::date().parse(Some(&json!(0))).is_err());
        assert!(SchemaNode::date().coerce().parse(Some(&json!(0))).is_ok());
    }

    #[test]
    fn test_lazy_parses_recursive_data() {
        fn tree() -> SchemaNode {
            SchemaNode::object([
                ("name", SchemaNode::string()),
                ("children", SchemaNode::array(SchemaNode::lazy(tree)).optional()),
            ])
        }
        let data = json!({"name": "a", "children": [{"name": "b", "children": []}]});
        assert_eq!(tree().parse(Some(&data)).unwrap(), Some(data));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(SchemaNode::string().kind_name(), "string");
        assert_eq!(SchemaNode::custom("symbol").kind_name(), "symbol");
        assert_eq!(SchemaNode::int().optional().kind_name(), "optional");
    }
}
