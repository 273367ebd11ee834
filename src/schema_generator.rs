use crate::alias::{make_alias, AliasTable};
use crate::error::{Error, Result};
use crate::events::Direction;
use crate::fingerprint::{CanonicalDigest, Fingerprinter};
use crate::probe::{probe_transform, SampleType};
use crate::schema::{number_value, Effect, LazySchema, NumberChecks, SchemaKind, SchemaNode, StringChecks};
use crate::walker::{walk, Next, Overlay, RuleSet};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;

/// Keys a schema object may carry and still be merged into another object
const FLATTENABLE_KEYS: [&str; 4] = ["type", "properties", "required", "examples"];

/// Schema generator - depicts schema trees as AsyncAPI (JSON Schema draft-07) objects
pub struct SchemaGenerator {
    /// Component schemas created for lazy references, one table per generation pass
    aliases: RefCell<AliasTable<SchemaObject>>,
    /// Strategy keying the alias table
    fingerprinter: Box<dyn Fingerprinter>,
}

/// AsyncAPI Schema object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaObject {
    /// Reference to a component schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Properties for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, SchemaObject>>,
    /// Required property names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<BoolOrSchema>,
    /// Items schema for arrays, or positional schemas for tuples
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Items>,
    /// Schema of tuple elements past the positional ones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_items: Option<BoolOrSchema>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<SchemaObject>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<SchemaObject>>,
    /// Property name distinguishing the `oneOf` members
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// `type` keyword, a single name or a list of names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoolOrSchema {
    Bool(bool),
    Schema(Box<SchemaObject>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Items {
    Tuple(Vec<SchemaObject>),
    Single(Box<SchemaObject>),
}

impl SchemaType {
    pub fn names(&self) -> Vec<&str> {
        match self {
            SchemaType::Single(name) => vec![name.as_str()],
            SchemaType::Multiple(names) => names.iter().map(String::as_str).collect(),
        }
    }

    pub fn first(&self) -> Option<&str> {
        self.names().into_iter().next()
    }

    /// Adds `null` unless it is already listed
    pub fn with_null(&self) -> SchemaType {
        if self.names().contains(&"null") {
            return self.clone();
        }
        let mut names: Vec<String> = self.names().into_iter().map(str::to_string).collect();
        names.push("null".to_string());
        SchemaType::Multiple(names)
    }
}

impl SchemaObject {
    pub fn of_type(name: &str) -> Self {
        Self {
            schema_type: Some(SchemaType::Single(name.to_string())),
            ..Self::default()
        }
    }

    pub fn reference(target: impl Into<String>) -> Self {
        Self {
            reference: Some(target.into()),
            ..Self::default()
        }
    }

    fn any() -> Self {
        Self {
            format: Some("any".to_string()),
            ..Self::default()
        }
    }

    fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Plain object schemas are the only ones an intersection can be flattened from
    fn is_flattenable(&self) -> bool {
        if self.schema_type != Some(SchemaType::Single("object".to_string())) {
            return false;
        }
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.keys().all(|k| FLATTENABLE_KEYS.contains(&k.as_str())),
            _ => false,
        }
    }
}

impl Overlay for SchemaObject {
    type Patch = SchemaObject;

    fn overlay(mut self, patch: SchemaObject) -> Self {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if patch.$field.is_some() {
                    self.$field = patch.$field;
                })*
            };
        }
        take!(
            reference,
            schema_type,
            format,
            description,
            properties,
            required,
            additional_properties,
            items,
            additional_items,
            enum_values,
            one_of,
            all_of,
            discriminator,
            default,
            examples,
            minimum,
            maximum,
            exclusive_minimum,
            exclusive_maximum,
            min_length,
            max_length,
            min_items,
            max_items,
            pattern,
        );
        self
    }
}

impl SchemaGenerator {
    /// Create a new SchemaGenerator keyed by canonical digests
    pub fn new() -> Self {
        Self::with_fingerprinter(CanonicalDigest)
    }

    /// Create a SchemaGenerator with a custom alias key strategy
    pub fn with_fingerprinter(fingerprinter: impl Fingerprinter + 'static) -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            aliases: RefCell::new(AliasTable::new("Schema")),
            fingerprinter: Box::new(fingerprinter),
        }
    }

    /// Generate a schema object for data flowing in `direction`
    pub fn generate_schema(&self, node: &SchemaNode, direction: Direction) -> Result<SchemaObject> {
        debug!("Generating {} schema for {} node", direction, node.kind_name());
        walk(node, self, &direction)
    }

    /// Component schemas generated so far, in creation order
    pub fn get_schemas(&self) -> IndexMap<String, SchemaObject> {
        self.aliases
            .borrow()
            .definitions()
            .map(|(name, schema)| (name.to_string(), schema.clone()))
            .collect()
    }

    pub fn into_schemas(self) -> IndexMap<String, SchemaObject> {
        self.aliases.into_inner().into_definitions().into_iter().collect()
    }

    fn depict_tuple(
        &self,
        items: &[SchemaNode],
        rest: Option<&SchemaNode>,
        next: &Next<'_, Self>,
    ) -> Result<SchemaObject> {
        let depicted = items.iter().map(|item| next.call(item)).collect::<Result<Vec<_>>>()?;
        let additional = match rest {
            Some(rest) => BoolOrSchema::Schema(Box::new(next.call(rest)?)),
            None => BoolOrSchema::Bool(false),
        };
        Ok(SchemaObject {
            items: Some(Items::Tuple(depicted)),
            additional_items: Some(additional),
            ..SchemaObject::of_type("array")
        })
    }

    fn depict_object(
        &self,
        shape: &IndexMap<String, SchemaNode>,
        direction: Direction,
        next: &Next<'_, Self>,
    ) -> Result<SchemaObject> {
        let mut properties = IndexMap::new();
        let mut required = Vec::new();
        for (key, value) in shape {
            properties.insert(key.clone(), next.call(value)?);
            // coercing nodes accept an absent value, only the declared wrapper counts
            let optional = if direction.is_output() && value.has_coercion() {
                matches!(value.kind, SchemaKind::Optional(_))
            } else {
                value.is_optional()
            };
            if !optional {
                required.push(key.clone());
            }
        }
        Ok(SchemaObject {
            properties: Some(properties),
            required: if required.is_empty() { None } else { Some(required) },
            ..SchemaObject::of_type("object")
        })
    }

    fn depict_record(
        &self,
        key: &SchemaNode,
        value: &SchemaNode,
        next: &Next<'_, Self>,
    ) -> Result<SchemaObject> {
        let keys: Option<Vec<String>> = match &key.kind {
            SchemaKind::Enum(values) => Some(values.clone()),
            SchemaKind::Literal(literal) => Some(vec![literal_key(literal)]),
            SchemaKind::Union(options) => options
                .iter()
                .map(|option| match &option.kind {
                    SchemaKind::Literal(literal) => Some(literal_key(literal)),
                    _ => None,
                })
                .collect(),
            _ => None,
        };

        let Some(keys) = keys else {
            return Ok(SchemaObject {
                additional_properties: Some(BoolOrSchema::Schema(Box::new(next.call(value)?))),
                ..SchemaObject::of_type("object")
            });
        };

        let mut result = SchemaObject::of_type("object");
        if !keys.is_empty() {
            let depicted = next.call(value)?;
            result.properties = Some(keys.iter().map(|k| (k.clone(), depicted.clone())).collect());
            result.required = Some(keys);
        }
        Ok(result)
    }

    fn depict_intersection(
        &self,
        left: &SchemaNode,
        right: &SchemaNode,
        next: &Next<'_, Self>,
    ) -> Result<SchemaObject> {
        let left = next.call(left)?;
        let right = next.call(right)?;
        match try_flatten(&left, &right) {
            Some(flat) => Ok(flat),
            None => {
                debug!("Intersection members cannot be flattened, using allOf");
                Ok(SchemaObject {
                    all_of: Some(vec![left, right]),
                    ..SchemaObject::default()
                })
            }
        }
    }

    fn depict_effect(
        &self,
        node: &SchemaNode,
        inner: &SchemaNode,
        effect: &Effect,
        direction: Direction,
        next: &Next<'_, Self>,
    ) -> Result<SchemaObject> {
        let input = next.call(inner)?;
        if !matches!(effect, Effect::Transform(_)) || !direction.is_output() || input.is_reference() {
            return Ok(input);
        }

        let sample = input
            .schema_type
            .as_ref()
            .and_then(SchemaType::first)
            .and_then(|t| SampleType::from_depicted(t, input.format.as_deref()));
        let Some(sample) = sample else {
            debug!("No sample for transform input, depicting output as any");
            return next.call(&SchemaNode::any());
        };

        match probe_transform(node, &sample.sample()) {
            Ok(kind) => Ok(SchemaObject::of_type(kind.as_str())),
            Err(e) => {
                debug!("Transform probe failed ({}), depicting output as any", e);
                next.call(&SchemaNode::any())
            }
        }
    }

    fn depict_preprocess(
        &self,
        inner: &SchemaNode,
        direction: Direction,
        next: &Next<'_, Self>,
    ) -> Result<SchemaObject> {
        let mut input = next.call(inner)?;
        if direction.is_output() || input.is_reference() {
            return Ok(input);
        }
        let declared = match (input.format.take(), input.schema_type.take()) {
            (Some(format), _) => format,
            (None, Some(schema_type)) => schema_type.names().join(", "),
            (None, None) => "any".to_string(),
        };
        input.format = Some(format!("{} (preprocessed)", declared));
        Ok(input)
    }

    fn depict_lazy(&self, lazy: &LazySchema, direction: Direction, next: &Next<'_, Self>) -> Result<SchemaObject> {
        let target = lazy.resolve();
        let fingerprint = format!("{}:{}", direction, self.fingerprinter.fingerprint(&target));
        let name = make_alias(&self.aliases, fingerprint, SchemaObject::default, || {
            next.call(&target)
        })?;
        Ok(SchemaObject::reference(format!("#/components/schemas/{}", name)))
    }
}

impl Default for SchemaGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleSet for SchemaGenerator {
    type Output = SchemaObject;
    type Context = Direction;

    fn handle(
        &self,
        node: &SchemaNode,
        ctx: &Direction,
        next: &Next<'_, Self>,
    ) -> Option<Result<SchemaObject>> {
        let direction = *ctx;
        let result = match &node.kind {
            SchemaKind::String(checks) => Ok(depict_string(checks)),
            SchemaKind::Number(checks) => Ok(depict_number(checks)),
            SchemaKind::BigInt { .. } => Ok(SchemaObject {
                format: Some("bigint".to_string()),
                ..SchemaObject::of_type("integer")
            }),
            SchemaKind::Boolean { .. } => Ok(SchemaObject::of_type("boolean")),
            SchemaKind::Date { .. } => Ok(SchemaObject {
                format: Some("date-time".to_string()),
                ..SchemaObject::of_type("string")
            }),
            SchemaKind::Null => Ok(SchemaObject::of_type("null")),
            SchemaKind::Any | SchemaKind::Unknown => Ok(SchemaObject::any()),
            SchemaKind::Literal(value) => Ok(SchemaObject {
                enum_values: Some(vec![value.clone()]),
                ..SchemaObject::of_type(json_type_name(value))
            }),
            SchemaKind::Enum(values) => Ok(SchemaObject {
                enum_values: Some(values.iter().cloned().map(Value::String).collect()),
                ..SchemaObject::of_type("string")
            }),
            SchemaKind::Array {
                item,
                min_items,
                max_items,
            } => next.call(item).map(|items| SchemaObject {
                items: Some(Items::Single(Box::new(items))),
                min_items: *min_items,
                max_items: *max_items,
                ..SchemaObject::of_type("array")
            }),
            SchemaKind::Tuple { items, rest } => self.depict_tuple(items, rest.as_deref(), next),
            SchemaKind::Object { shape } => self.depict_object(shape, direction, next),
            SchemaKind::Record { key, value } => self.depict_record(key, value, next),
            SchemaKind::Union(options) => depict_options(options, next).map(|one_of| SchemaObject {
                one_of: Some(one_of),
                ..SchemaObject::default()
            }),
            SchemaKind::DiscriminatedUnion {
                discriminator,
                options,
            } => depict_options(options, next).map(|one_of| SchemaObject {
                one_of: Some(one_of),
                discriminator: Some(discriminator.clone()),
                ..SchemaObject::default()
            }),
            SchemaKind::Intersection(left, right) => self.depict_intersection(left, right, next),
            SchemaKind::Optional(inner)
            | SchemaKind::Readonly(inner)
            | SchemaKind::Branded { inner, .. }
            | SchemaKind::Catch { inner, .. } => next.call(inner),
            SchemaKind::Nullable(inner) => next.call(inner).map(depict_nullable),
            SchemaKind::Default { inner, value } => next.call(inner).map(|schema| SchemaObject {
                default: Some(value.clone()),
                ..schema
            }),
            SchemaKind::Effect { inner, effect } => {
                self.depict_effect(node, inner, effect, direction, next)
            }
            SchemaKind::Preprocess { inner, .. } => self.depict_preprocess(inner, direction, next),
            SchemaKind::Pipeline { input, output } => {
                next.call(if direction.is_output() { output } else { input })
            }
            SchemaKind::Lazy(lazy) => self.depict_lazy(lazy, direction, next),
            SchemaKind::Void | SchemaKind::Function { .. } | SchemaKind::Custom(_) => return None,
        };
        Some(result)
    }

    fn on_missing(&self, node: &SchemaNode, ctx: &Direction) -> Error {
        Error::UnsupportedKind {
            kind: node.kind_name().to_string(),
            direction: *ctx,
        }
    }

    fn on_each(&self, node: &SchemaNode, ctx: &Direction, prev: &SchemaObject) -> Option<SchemaObject> {
        if prev.is_reference() {
            return None;
        }
        let is_lazy = matches!(node.kind, SchemaKind::Lazy(_));
        let mut patch = SchemaObject {
            description: node.description().map(str::to_string),
            ..SchemaObject::default()
        };

        let coercing_output = ctx.is_output() && node.has_coercion();
        if !is_lazy && !coercing_output && node.is_nullable() {
            patch.schema_type = prev.schema_type.as_ref().map(SchemaType::with_null);
        }

        if !is_lazy {
            let examples = collect_examples(node, *ctx);
            if !examples.is_empty() {
                patch.examples = Some(examples);
            }
        }

        if patch == SchemaObject::default() {
            None
        } else {
            Some(patch)
        }
    }
}

fn depict_string(checks: &StringChecks) -> SchemaObject {
    SchemaObject {
        format: checks.format.map(|f| f.as_str().to_string()),
        min_length: checks.min_length,
        max_length: checks.max_length,
        pattern: checks.pattern.clone(),
        ..SchemaObject::of_type("string")
    }
}

fn depict_number(checks: &NumberChecks) -> SchemaObject {
    let (schema_type, format) = if checks.int {
        ("integer", "int64")
    } else {
        ("number", "double")
    };
    SchemaObject {
        format: Some(format.to_string()),
        minimum: checks.minimum.map(number_value),
        maximum: checks.maximum.map(number_value),
        exclusive_minimum: checks.exclusive_minimum.map(number_value),
        exclusive_maximum: checks.exclusive_maximum.map(number_value),
        ..SchemaObject::of_type(schema_type)
    }
}

fn depict_options(options: &[SchemaNode], next: &Next<'_, SchemaGenerator>) -> Result<Vec<SchemaObject>> {
    options.iter().map(|option| next.call(option)).collect()
}

/// References cannot carry an inline `null`, they are returned untouched
fn depict_nullable(schema: SchemaObject) -> SchemaObject {
    if schema.is_reference() {
        return schema;
    }
    match &schema.schema_type {
        Some(schema_type) => SchemaObject {
            schema_type: Some(schema_type.with_null()),
            ..schema
        },
        None => SchemaObject {
            one_of: Some(vec![schema, SchemaObject::of_type("null")]),
            ..SchemaObject::default()
        },
    }
}

/// Merges two plain object schemas into one, `None` when they do not fit together
fn try_flatten(left: &SchemaObject, right: &SchemaObject) -> Option<SchemaObject> {
    if !left.is_flattenable() || !right.is_flattenable() {
        return None;
    }
    let mut flat = SchemaObject::of_type("object");

    if left.properties.is_some() || right.properties.is_some() {
        let l = serde_json::to_value(left.properties.clone().unwrap_or_default()).ok()?;
        let r = serde_json::to_value(right.properties.clone().unwrap_or_default()).ok()?;
        flat.properties = Some(serde_json::from_value(merge_deep(l, r)?).ok()?);
    }

    if left.required.is_some() || right.required.is_some() {
        let mut required = left.required.clone().unwrap_or_default();
        for name in right.required.iter().flatten() {
            if !required.contains(name) {
                required.push(name.clone());
            }
        }
        flat.required = Some(required);
    }

    if left.examples.is_some() || right.examples.is_some() {
        flat.examples = Some(combine_examples(
            left.examples.as_deref().unwrap_or_default(),
            right.examples.as_deref().unwrap_or_default(),
        ));
    }
    Some(flat)
}

/// Deep merge: objects recurse, arrays concatenate, equal leaves pass, anything else fails
fn merge_deep(left: Value, right: Value) -> Option<Value> {
    match (left, right) {
        (Value::Object(mut l), Value::Object(r)) => {
            for (key, value) in r {
                let merged = match l.get(&key) {
                    Some(existing) => merge_deep(existing.clone(), value)?,
                    None => value,
                };
                l.insert(key, merged);
            }
            Some(Value::Object(l))
        }
        (Value::Array(mut l), Value::Array(r)) => {
            l.extend(r);
            Some(Value::Array(l))
        }
        (l, r) if l == r => Some(r),
        _ => None,
    }
}

fn combine_examples(left: &[Value], right: &[Value]) -> Vec<Value> {
    if left.is_empty() {
        return right.to_vec();
    }
    if right.is_empty() {
        return left.to_vec();
    }
    let mut combined = Vec::new();
    for l in left {
        for r in right {
            if let (Value::Object(a), Value::Object(b)) = (l, r) {
                let mut merged = a.clone();
                merged.extend(b.clone());
                combined.push(Value::Object(merged));
            }
        }
    }
    combined
}

fn collect_examples(node: &SchemaNode, direction: Direction) -> Vec<Value> {
    node.meta
        .examples
        .iter()
        .filter_map(|example| match node.parse(Some(example)) {
            Ok(parsed) if direction.is_output() => Some(parsed.unwrap_or(Value::Null)),
            Ok(_) => Some(example.clone()),
            Err(issue) => {
                debug!("Dropping invalid example: {}", issue);
                None
            }
        })
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn literal_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{StringFormat, Transform};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn depict(node: &SchemaNode, direction: Direction) -> Value {
        let generator = SchemaGenerator::new();
        let schema = generator.generate_schema(node, direction).unwrap();
        serde_json::to_value(schema).unwrap()
    }

    fn length() -> Transform {
        Transform::new("length", |v| match v {
            Value::String(s) => Ok(json!(s.chars().count())),
            other => Err(format!("cannot measure {}", other)),
        })
    }

    fn category() -> SchemaNode {
        SchemaNode::object([
            ("name", SchemaNode::string()),
            ("children", SchemaNode::array(SchemaNode::lazy(category)).optional()),
        ])
    }

    #[test]
    fn test_primitive_types() {
        assert_eq!(depict(&SchemaNode::string(), Direction::In), json!({"type": "string"}));
        assert_eq!(
            depict(&SchemaNode::int(), Direction::In),
            json!({"type": "integer", "format": "int64"})
        );
        assert_eq!(
            depict(&SchemaNode::number(), Direction::In),
            json!({"type": "number", "format": "double"})
        );
        assert_eq!(depict(&SchemaNode::boolean(), Direction::In), json!({"type": "boolean"}));
        assert_eq!(depict(&SchemaNode::null(), Direction::In), json!({"type": "null"}));
        assert_eq!(depict(&SchemaNode::any(), Direction::In), json!({"format": "any"}));
        assert_eq!(
            depict(&SchemaNode::date(), Direction::Out),
            json!({"type": "string", "format": "date-time"})
        );
    }

    #[test]
    fn test_string_checks() {
        let node = SchemaNode::string_with(StringChecks {
            min_length: Some(1),
            max_length: Some(64),
            format: Some(StringFormat::Email),
            ..StringChecks::default()
        });
        assert_eq!(
            depict(&node, Direction::In),
            json!({"type": "string", "format": "email", "minLength": 1, "maxLength": 64})
        );
    }

    #[test]
    fn test_literal_and_enum() {
        assert_eq!(
            depict(&SchemaNode::literal("pong"), Direction::In),
            json!({"type": "string", "enum": ["pong"]})
        );
        assert_eq!(
            depict(&SchemaNode::enumeration(["a", "b"]), Direction::In),
            json!({"type": "string", "enum": ["a", "b"]})
        );
    }

    #[test]
    fn test_input_tuple_scenario() {
        let node = SchemaNode::tuple(vec![
            SchemaNode::string(),
            SchemaNode::object([("from", SchemaNode::string())]),
        ]);
        assert_eq!(
            depict(&node, Direction::In),
            json!({
                "type": "array",
                "items": [
                    {"type": "string"},
                    {"type": "object", "properties": {"from": {"type": "string"}}, "required": ["from"]}
                ],
                "additionalItems": false
            })
        );
    }

    #[test]
    fn test_tuple_with_rest_element() {
        let node = SchemaNode::tuple(vec![SchemaNode::literal("pong")]).rest(SchemaNode::unknown());
        let depicted = depict(&node, Direction::Out);
        assert_eq!(depicted["items"].as_array().unwrap().len(), 1);
        assert_eq!(depicted["additionalItems"], json!({"format": "any"}));
    }

    #[test]
    fn test_tuple_arity_property() {
        for n in 0..4 {
            let items: Vec<_> = (0..n).map(|_| SchemaNode::string()).collect();
            let fixed = depict(&SchemaNode::tuple(items.clone()), Direction::In);
            assert_eq!(fixed["items"].as_array().unwrap().len(), n);
            assert_eq!(fixed["additionalItems"], json!(false));

            let variadic = depict(&SchemaNode::tuple(items).rest(SchemaNode::int()), Direction::In);
            assert_eq!(variadic["items"].as_array().unwrap().len(), n);
            assert_ne!(variadic["additionalItems"], json!(false));
        }
    }

    #[test]
    fn test_optional_properties_are_not_required() {
        let node = SchemaNode::object([
            ("id", SchemaNode::int()),
            ("email", SchemaNode::string().optional()),
            ("role", SchemaNode::string().default_value("user")),
        ]);
        let depicted = depict(&node, Direction::In);
        assert_eq!(depicted["required"], json!(["id"]));
        assert_eq!(depicted["properties"]["role"]["default"], json!("user"));
    }

    #[test]
    fn test_coercion_optionality_depends_on_direction() {
        let node = SchemaNode::object([("flag", SchemaNode::boolean().coerce())]);
        // coerced booleans accept anything on input, output always has the property
        assert_eq!(depict(&node, Direction::In).get("required"), None);
        assert_eq!(depict(&node, Direction::Out)["required"], json!(["flag"]));
    }

    #[test]
    fn test_nullable_appends_null_once() {
        let node = SchemaNode::string().nullable();
        assert_eq!(depict(&node, Direction::In), json!({"type": ["string", "null"]}));

        let twice = SchemaNode::string().nullable().nullable();
        assert_eq!(depict(&twice, Direction::In), json!({"type": ["string", "null"]}));
    }

    #[test]
    fn test_nullable_rule_is_idempotent_on_depicted_fragment() {
        let fragment = depict_nullable(SchemaObject::of_type("string"));
        let again = depict_nullable(fragment.clone());
        assert_eq!(again, fragment);
        assert_eq!(
            again.schema_type,
            Some(SchemaType::Multiple(vec!["string".into(), "null".into()]))
        );
    }

    #[test]
    fn test_nullable_reference_is_left_unresolved() {
        let node = SchemaNode::lazy(category).nullable();
        let depicted = depict(&node, Direction::In);
        assert_eq!(depicted, json!({"$ref": "#/components/schemas/Schema1"}));
    }

    #[test]
    fn test_unions() {
        let plain = SchemaNode::union(vec![SchemaNode::string(), SchemaNode::int()]);
        assert_eq!(
            depict(&plain, Direction::In),
            json!({"oneOf": [{"type": "string"}, {"type": "integer", "format": "int64"}]})
        );

        let tagged = SchemaNode::discriminated_union(
            "kind",
            vec![
                SchemaNode::object([("kind", SchemaNode::literal("a"))]),
                SchemaNode::object([("kind", SchemaNode::literal("b"))]),
            ],
        );
        let depicted = depict(&tagged, Direction::In);
        assert_eq!(depicted["discriminator"], json!("kind"));
        assert_eq!(depicted["oneOf"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_intersection_flattens_plain_objects() {
        let node = SchemaNode::intersection(
            SchemaNode::object([("a", SchemaNode::string())]),
            SchemaNode::object([("b", SchemaNode::int().optional())]),
        );
        assert_eq!(
            depict(&node, Direction::In),
            json!({
                "type": "object",
                "properties": {"a": {"type": "string"}, "b": {"type": "integer", "format": "int64"}},
                "required": ["a"]
            })
        );
    }

    #[test]
    fn test_intersection_falls_back_to_all_of() {
        let node = SchemaNode::intersection(
            SchemaNode::object([("a", SchemaNode::string())]),
            SchemaNode::object([("a", SchemaNode::int())]),
        );
        let depicted = depict(&node, Direction::In);
        assert_eq!(depicted["allOf"].as_array().unwrap().len(), 2);

        let mixed = SchemaNode::intersection(SchemaNode::string(), SchemaNode::string().describe("x"));
        assert!(depict(&mixed, Direction::In).get("allOf").is_some());
    }

    #[test]
    fn test_record_depictions() {
        let free = SchemaNode::record(SchemaNode::string(), SchemaNode::int());
        assert_eq!(
            depict(&free, Direction::In),
            json!({"type": "object", "additionalProperties": {"type": "integer", "format": "int64"}})
        );

        let keyed = SchemaNode::record(SchemaNode::enumeration(["x", "y"]), SchemaNode::boolean());
        assert_eq!(
            depict(&keyed, Direction::In),
            json!({
                "type": "object",
                "properties": {"x": {"type": "boolean"}, "y": {"type": "boolean"}},
                "required": ["x", "y"]
            })
        );
    }

    #[test]
    fn test_output_transform_is_probed() {
        let node = SchemaNode::string().transform(length());
        assert_eq!(depict(&node, Direction::Out), json!({"type": "number"}));
        // input keeps the declared type
        assert_eq!(depict(&node, Direction::In), json!({"type": "string"}));
    }

    #[test]
    fn test_failed_probe_degrades_to_any() {
        let node = SchemaNode::int().transform(length());
        assert_eq!(depict(&node, Direction::Out), json!({"format": "any"}));

        let wrapped = SchemaNode::string().transform(Transform::new("wrap", |v| Ok(json!({"v": v}))));
        assert_eq!(depict(&wrapped, Direction::Out), json!({"format": "any"}));
    }

    #[test]
    fn test_input_preprocess_is_annotated() {
        let node = SchemaNode::preprocess(
            Transform::new("trim", |v| match v {
                Value::String(s) => Ok(Value::String(s.trim().to_string())),
                other => Ok(other),
            }),
            SchemaNode::string_with(StringChecks {
                format: Some(StringFormat::Email),
                ..StringChecks::default()
            }),
        );
        assert_eq!(depict(&node, Direction::In), json!({"format": "email (preprocessed)"}));
        assert_eq!(
            depict(&SchemaNode::preprocess(Transform::new("id", |v| Ok(v)), SchemaNode::int()), Direction::In),
            json!({"format": "int64 (preprocessed)"})
        );
        assert_eq!(
            depict(&node, Direction::Out),
            json!({"type": "string", "format": "email"})
        );
    }

    #[test]
    fn test_pipeline_side_depends_on_direction() {
        let node = SchemaNode::string().pipe(SchemaNode::int());
        assert_eq!(depict(&node, Direction::In), json!({"type": "string"}));
        assert_eq!(depict(&node, Direction::Out)["type"], json!("integer"));
    }

    #[test]
    fn test_description_and_examples_overlay() {
        let node = SchemaNode::string().describe("user name").example("ann").example(5);
        assert_eq!(
            depict(&node, Direction::In),
            json!({"type": "string", "description": "user name", "examples": ["ann"]})
        );
    }

    #[test]
    fn test_output_examples_are_parsed() {
        let node = SchemaNode::string().transform(length()).example("four");
        assert_eq!(depict(&node, Direction::Out)["examples"], json!([4]));
        assert_eq!(depict(&node, Direction::In)["examples"], json!(["four"]));
    }

    #[test]
    fn test_self_reference_terminates_with_one_definition() {
        let generator = SchemaGenerator::new();
        let root = generator
            .generate_schema(&SchemaNode::lazy(category), Direction::In)
            .unwrap();
        assert_eq!(root.reference.as_deref(), Some("#/components/schemas/Schema1"));

        let schemas = generator.into_schemas();
        assert_eq!(schemas.len(), 1);
        let definition = serde_json::to_value(&schemas["Schema1"]).unwrap();
        assert_eq!(
            definition["properties"]["children"],
            json!({"type": "array", "items": {"$ref": "#/components/schemas/Schema1"}})
        );
        assert_eq!(definition["required"], json!(["name"]));
    }

    #[test]
    fn test_directions_get_separate_aliases() {
        let generator = SchemaGenerator::new();
        generator.generate_schema(&SchemaNode::lazy(category), Direction::In).unwrap();
        generator.generate_schema(&SchemaNode::lazy(category), Direction::In).unwrap();
        generator.generate_schema(&SchemaNode::lazy(category), Direction::Out).unwrap();
        assert_eq!(generator.get_schemas().len(), 2);
    }

    #[test]
    fn test_unsupported_kinds_are_fatal() {
        let generator = SchemaGenerator::new();
        let node = SchemaNode::object([("cb", SchemaNode::custom("symbol"))]);
        let err = generator.generate_schema(&node, Direction::In).unwrap_err();
        assert!(matches!(err, Error::UnsupportedKind { ref kind, .. } if kind == "symbol"));

        let function = SchemaNode::function(SchemaNode::tuple(vec![]), SchemaNode::void());
        assert!(generator.generate_schema(&function, Direction::Out).is_err());
    }

    #[test]
    fn test_determinism() {
        let node = SchemaNode::tuple(vec![category(), SchemaNode::string().nullable()]);
        assert_eq!(depict(&node, Direction::Out), depict(&node, Direction::Out));
    }
}
