//! Declarative event manifests.
//!
//! A manifest lists namespaces and their events in YAML or JSON. Each event carries schema
//! specs: objects tagged with `type`, or a bare type name. Named schemas live under
//! `definitions` and are referenced with `{type: ref, name: ...}`; references become lazy
//! nodes, so definitions may refer to themselves.
//!
//! ```yaml
//! definitions:
//!   User:
//!     type: object
//!     properties:
//!       name: string
//!       friends: {type: array, items: {type: ref, name: User}}
//! namespaces:
//!   /chat:
//!     actions:
//!       join:
//!         args: [{type: ref, name: User}]
//!         ack: [boolean]
//! ```

use crate::config::GeneratorConfig;
use crate::error::{Error, Result};
use crate::events::{Direction, EventInfo, Namespace};
use crate::schema::{
    number_value, NumberChecks, SchemaKind, SchemaNode, StringChecks, StringFormat, Transform,
};
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::rc::Rc;

type Spec = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub config: GeneratorConfig,
    /// Named schema specs
    pub definitions: IndexMap<String, Value>,
    /// Namespaces keyed by path
    pub namespaces: IndexMap<String, NamespaceSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceSpec {
    /// Security scheme names required to connect
    pub security: Vec<String>,
    /// Events sent by the server
    pub emission: IndexMap<String, EventSpec>,
    /// Events received by the server
    pub actions: IndexMap<String, EventSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSpec {
    /// Argument list, or a single schema spec describing it
    pub args: Option<Value>,
    /// Variadic argument following `args`
    pub rest: Option<Value>,
    /// Acknowledgement argument list
    pub ack: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Value>,
    pub description: Option<String>,
}

impl Manifest {
    /// Load a manifest, choosing the format by file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!("Loading manifest: {}", path.display());
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Merges another manifest into this one.
    ///
    /// Namespaces with the same path are combined, later definitions replace earlier ones,
    /// and a non-default configuration replaces the current one.
    pub fn merge(&mut self, other: Manifest) {
        if other.config != GeneratorConfig::default() {
            self.config = other.config;
        }
        for (name, spec) in other.definitions {
            if self.definitions.insert(name.clone(), spec).is_some() {
                warn!("Definition {} declared more than once, keeping the last one", name);
            }
        }
        for (path, spec) in other.namespaces {
            let target = self.namespaces.entry(path).or_default();
            for scheme in spec.security {
                if !target.security.contains(&scheme) {
                    target.security.push(scheme);
                }
            }
            target.emission.extend(spec.emission);
            target.actions.extend(spec.actions);
        }
    }

    /// Converts all specs into namespaces with schema trees.
    ///
    /// Every definition is converted once up front, so malformed specs and dangling
    /// references are reported here rather than during generation.
    pub fn build(&self) -> Result<Vec<Namespace>> {
        let converter = Converter {
            definitions: Rc::new(self.definitions.clone()),
        };
        for (name, spec) in &self.definitions {
            converter.convert(spec, &format!("definitions.{}", name))?;
        }

        let mut namespaces = Vec::with_capacity(self.namespaces.len());
        for (path, spec) in &self.namespaces {
            let mut namespace = Namespace::new(path.clone());
            namespace.security = spec.security.clone();
            for (events, direction, section) in [
                (&spec.actions, Direction::In, "actions"),
                (&spec.emission, Direction::Out, "emission"),
            ] {
                for (name, event) in events {
                    let at = format!("namespaces.{}.{}.{}", path, section, name);
                    namespace
                        .events
                        .push(converter.event(name, direction, event, &at)?);
                }
            }
            debug!("Namespace {} has {} events", path, namespace.events.len());
            namespaces.push(namespace);
        }
        info!(
            "Loaded {} namespaces and {} definitions",
            namespaces.len(),
            self.definitions.len()
        );
        Ok(namespaces)
    }
}

/// Converts schema specs into nodes, resolving references against shared definitions
#[derive(Clone)]
struct Converter {
    /// Raw specs only: lazy getters hold this map, so it must not contain nodes
    definitions: Rc<IndexMap<String, Value>>,
}

impl Converter {
    fn event(&self, name: &str, direction: Direction, spec: &EventSpec, path: &str) -> Result<EventInfo> {
        let mut payload = match &spec.args {
            Some(args) => self.arguments(args, &format!("{}.args", path))?,
            None => SchemaNode::tuple(Vec::new()),
        };
        if let Some(rest) = &spec.rest {
            let rest = self.convert(rest, &format!("{}.rest", path))?;
            if payload.tuple_parts().is_none() {
                return Err(Error::invalid(path, "`rest` requires a list of arguments"));
            }
            payload = payload.rest(rest);
        }

        let mut event = EventInfo::new(name, direction, payload);
        if let Some(ack) = &spec.ack {
            event = event.with_ack(self.arguments(ack, &format!("{}.ack", path))?);
        }
        event.examples = spec.examples.clone();
        event.description = spec.description.clone();
        Ok(event)
    }

    /// A list is a tuple of its items, anything else is a schema spec
    fn arguments(&self, spec: &Value, path: &str) -> Result<SchemaNode> {
        match spec {
            Value::Array(items) => Ok(SchemaNode::tuple(self.list(items, path)?)),
            other => self.convert(other, path),
        }
    }

    fn list(&self, items: &[Value], path: &str) -> Result<Vec<SchemaNode>> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.convert(item, &format!("{}[{}]", path, i)))
            .collect()
    }

    fn convert(&self, spec: &Value, path: &str) -> Result<SchemaNode> {
        let spec = match spec {
            Value::String(type_name) => {
                let mut map = Spec::new();
                map.insert("type".to_string(), Value::String(type_name.clone()));
                map
            }
            Value::Object(map) => map.clone(),
            other => {
                return Err(Error::invalid(
                    path,
                    format!("expected a schema spec, found {}", other),
                ))
            }
        };
        let type_name = spec
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid(path, "missing `type`"))?;

        let node = self.kind(type_name, &spec, path)?;
        self.decorate(node, type_name, &spec, path)
    }

    fn kind(&self, type_name: &str, spec: &Spec, path: &str) -> Result<SchemaNode> {
        let coerce = flag(spec, "coerce");
        let node = match type_name {
            "string" => SchemaNode::string_with(StringChecks {
                min_length: opt_usize(spec, "minLength", path)?,
                max_length: opt_usize(spec, "maxLength", path)?,
                format: match opt_str(spec, "format", path)? {
                    Some(name) => Some(StringFormat::from_name(name).ok_or_else(|| {
                        Error::invalid(path, format!("unknown string format `{}`", name))
                    })?),
                    None => None,
                },
                pattern: opt_str(spec, "pattern", path)?.map(str::to_string),
                coerce,
            }),
            "number" | "integer" => SchemaNode::number_with(NumberChecks {
                int: type_name == "integer",
                minimum: opt_f64(spec, "minimum", path)?,
                maximum: opt_f64(spec, "maximum", path)?,
                exclusive_minimum: opt_f64(spec, "exclusiveMinimum", path)?,
                exclusive_maximum: opt_f64(spec, "exclusiveMaximum", path)?,
                coerce,
            }),
            "bigint" => SchemaNode::new(SchemaKind::BigInt { coerce }),
            "boolean" => SchemaNode::new(SchemaKind::Boolean { coerce }),
            "date" => SchemaNode::new(SchemaKind::Date { coerce }),
            "null" => SchemaNode::null(),
            "any" => SchemaNode::any(),
            "unknown" => SchemaNode::unknown(),
            "void" => SchemaNode::void(),
            "literal" => SchemaNode::literal(required(spec, "value", path)?.clone()),
            "enum" => {
                let values = required(spec, "values", path)?
                    .as_array()
                    .ok_or_else(|| Error::invalid(path, "`values` must be a list"))?;
                let values = values
                    .iter()
                    .map(|v| {
                        v.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| Error::invalid(path, "enum values must be strings"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                SchemaNode::enumeration(values)
            }
            "array" => SchemaNode::new(SchemaKind::Array {
                item: Box::new(self.convert(required(spec, "items", path)?, &format!("{}.items", path))?),
                min_items: opt_usize(spec, "minItems", path)?,
                max_items: opt_usize(spec, "maxItems", path)?,
            }),
            "tuple" => {
                let items = self.list(list(spec, "items", path)?, &format!("{}.items", path))?;
                let tuple = SchemaNode::tuple(items);
                match spec.get("rest") {
                    Some(rest) => tuple.rest(self.convert(rest, &format!("{}.rest", path))?),
                    None => tuple,
                }
            }
            "object" => {
                let mut shape = IndexMap::new();
                if let Some(properties) = spec.get("properties") {
                    let properties = properties
                        .as_object()
                        .ok_or_else(|| Error::invalid(path, "`properties` must be a map"))?;
                    for (key, value) in properties {
                        shape.insert(key.clone(), self.convert(value, &format!("{}.{}", path, key))?);
                    }
                }
                SchemaNode::new(SchemaKind::Object { shape })
            }
            "record" => {
                let key = match spec.get("key") {
                    Some(key) => self.convert(key, &format!("{}.key", path))?,
                    None => SchemaNode::string(),
                };
                let value = self.convert(required(spec, "values", path)?, &format!("{}.values", path))?;
                SchemaNode::record(key, value)
            }
            "union" => SchemaNode::union(self.list(list(spec, "options", path)?, &format!("{}.options", path))?),
            "discriminatedUnion" => {
                let discriminator = opt_str(spec, "discriminator", path)?
                    .ok_or_else(|| Error::invalid(path, "missing `discriminator`"))?;
                SchemaNode::discriminated_union(
                    discriminator,
                    self.list(list(spec, "options", path)?, &format!("{}.options", path))?,
                )
            }
            "intersection" => {
                let mut members = self.list(list(spec, "of", path)?, &format!("{}.of", path))?.into_iter();
                let (Some(first), Some(second)) = (members.next(), members.next()) else {
                    return Err(Error::invalid(path, "intersection needs at least two members"));
                };
                members.fold(SchemaNode::intersection(first, second), SchemaNode::intersection)
            }
            "optional" => self.inner(spec, path)?.optional(),
            "nullable" => self.inner(spec, path)?.nullable(),
            "readonly" => self.inner(spec, path)?.readonly(),
            "default" => self.inner(spec, path)?.default_value(required(spec, "value", path)?.clone()),
            "catch" => self.inner(spec, path)?.catch_value(required(spec, "value", path)?.clone()),
            "branded" => {
                let brand = opt_str(spec, "brand", path)?
                    .ok_or_else(|| Error::invalid(path, "missing `brand`"))?;
                self.inner(spec, path)?.brand(brand)
            }
            "transform" => self.inner(spec, path)?.transform(transform(spec, path)?),
            "preprocess" => SchemaNode::preprocess(transform(spec, path)?, self.inner(spec, path)?),
            "pipeline" => {
                let input = self.convert(required(spec, "input", path)?, &format!("{}.input", path))?;
                let output = self.convert(required(spec, "output", path)?, &format!("{}.output", path))?;
                input.pipe(output)
            }
            "function" => {
                let args = match spec.get("args") {
                    Some(args) => self.arguments(args, &format!("{}.args", path))?,
                    None => SchemaNode::tuple(Vec::new()),
                };
                let returns = match spec.get("returns") {
                    Some(returns) => self.convert(returns, &format!("{}.returns", path))?,
                    None => SchemaNode::void(),
                };
                SchemaNode::function(args, returns)
            }
            "ref" => self.reference(spec, path)?,
            other => {
                debug!("Unrecognised schema type `{}` at {}", other, path);
                SchemaNode::custom(other)
            }
        };
        Ok(node)
    }

    fn inner(&self, spec: &Spec, path: &str) -> Result<SchemaNode> {
        self.convert(required(spec, "of", path)?, &format!("{}.of", path))
    }

    fn reference(&self, spec: &Spec, path: &str) -> Result<SchemaNode> {
        let name = opt_str(spec, "name", path)?
            .ok_or_else(|| Error::invalid(path, "missing reference `name`"))?
            .to_string();
        if !self.definitions.contains_key(&name) {
            return Err(Error::UnknownReference(name));
        }
        let converter = self.clone();
        Ok(SchemaNode::lazy_named(format!("definitions.{}", name), move || {
            let at = format!("definitions.{}", name);
            // definitions were validated by Manifest::build before any getter runs
            converter
                .definitions
                .get(&name)
                .and_then(|spec| converter.convert(spec, &at).ok())
                .unwrap_or_else(|| SchemaNode::custom(format!("invalid reference {}", name)))
        }))
    }

    /// Applies the wrapper shorthands shared by every spec
    fn decorate(&self, mut node: SchemaNode, type_name: &str, spec: &Spec, path: &str) -> Result<SchemaNode> {
        if type_name != "default" {
            if let Some(value) = spec.get("default") {
                node = node.default_value(value.clone());
            }
        }
        if flag(spec, "nullable") {
            node = node.nullable();
        }
        if flag(spec, "optional") {
            node = node.optional();
        }
        if type_name != "readonly" && flag(spec, "readonly") {
            node = node.readonly();
        }
        if type_name != "branded" {
            if let Some(brand) = opt_str(spec, "brand", path)? {
                node = node.brand(brand);
            }
        }
        if let Some(description) = opt_str(spec, "description", path)? {
            node = node.describe(description);
        }
        if let Some(examples) = spec.get("examples") {
            let examples = examples
                .as_array()
                .ok_or_else(|| Error::invalid(path, "`examples` must be a list"))?;
            for example in examples {
                node = node.example(example.clone());
            }
        }
        Ok(node)
    }
}

/// Looks up a builtin transform by name
pub fn builtin_transform(name: &str) -> Result<Transform> {
    let transform = match name {
        "length" => Transform::new(name, |value| match value {
            Value::String(s) => Ok(Value::from(s.chars().count())),
            Value::Array(items) => Ok(Value::from(items.len())),
            other => Err(format!("cannot take the length of {}", other)),
        }),
        "toString" => Transform::new(name, |value| match value {
            Value::String(s) => Ok(Value::String(s)),
            other => Ok(Value::String(other.to_string())),
        }),
        "trim" => Transform::new(name, |value| match value {
            Value::String(s) => Ok(Value::String(s.trim().to_string())),
            other => Ok(other),
        }),
        "parseNumber" => Transform::new(name, |value| match value {
            Value::Number(n) => Ok(Value::Number(n)),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(number_value)
                .map_err(|_| format!("`{}` is not a number", s)),
            other => Err(format!("cannot parse {} as a number", other)),
        }),
        "toUpperCase" => Transform::new(name, |value| match value {
            Value::String(s) => Ok(Value::String(s.to_uppercase())),
            other => Err(format!("cannot upper-case {}", other)),
        }),
        other => return Err(Error::UnknownTransform(other.to_string())),
    };
    Ok(transform)
}

fn transform(spec: &Spec, path: &str) -> Result<Transform> {
    let name = opt_str(spec, "transform", path)?
        .ok_or_else(|| Error::invalid(path, "missing `transform` name"))?;
    builtin_transform(name)
}

fn required<'a>(spec: &'a Spec, key: &str, path: &str) -> Result<&'a Value> {
    spec.get(key)
        .ok_or_else(|| Error::invalid(path, format!("missing `{}`", key)))
}

fn list<'a>(spec: &'a Spec, key: &str, path: &str) -> Result<&'a [Value]> {
    required(spec, key, path)?
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| Error::invalid(path, format!("`{}` must be a list", key)))
}

fn flag(spec: &Spec, key: &str) -> bool {
    spec.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn opt_str<'a>(spec: &'a Spec, key: &str, path: &str) -> Result<Option<&'a str>> {
    match spec.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(Error::invalid(path, format!("`{}` must be a string", key))),
    }
}

fn opt_usize(spec: &Spec, key: &str, path: &str) -> Result<Option<usize>> {
    match spec.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| Error::invalid(path, format!("`{}` must be a non-negative integer", key))),
    }
}

fn opt_f64(spec: &Spec, key: &str, path: &str) -> Result<Option<f64>> {
    match spec.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| Error::invalid(path, format!("`{}` must be a number", key))),
    }
}
