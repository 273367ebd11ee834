//! Content fingerprints for schema nodes.
//!
//! The cycle resolver keys its alias table by fingerprint. The default strategy writes
//! the node out in a canonical JSON form and hashes it with SHA-256.

use crate::schema::{Effect, SchemaKind, SchemaNode};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

/// Strategy producing the alias key of a schema node
pub trait Fingerprinter {
    fn fingerprint(&self, node: &SchemaNode) -> String;
}

impl<F> Fingerprinter for F
where
    F: Fn(&SchemaNode) -> String,
{
    fn fingerprint(&self, node: &SchemaNode) -> String {
        self(node)
    }
}

/// Canonical serialization followed by a SHA-256 digest
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalDigest;

impl Fingerprinter for CanonicalDigest {
    fn fingerprint(&self, node: &SchemaNode) -> String {
        let canonical = serde_json::to_string(&canonical_form(node)).unwrap_or_default();
        format!("{:x}", Sha256::digest(canonical.as_bytes()))
    }
}

/// Structural JSON description of a node. Closures contribute their names only.
///
/// Lazy nodes are expanded until their key repeats on the current path, where they are
/// written as a reference to that key.
pub fn canonical_form(node: &SchemaNode) -> Value {
    describe(node, &mut Vec::new())
}

fn describe(node: &SchemaNode, path: &mut Vec<String>) -> Value {
    let mut out = Map::new();
    out.insert("kind".into(), json!(node.kind_name()));
    if let SchemaKind::Lazy(lazy) = &node.kind {
        out.insert("ref".into(), json!(lazy.key()));
        if !path.iter().any(|key| key == lazy.key()) {
            path.push(lazy.key().to_string());
            out.insert("target".into(), describe(&lazy.resolve(), path));
            path.pop();
        }
    }

    let mut child = |n: &SchemaNode| describe(n, path);

    match &node.kind {
        SchemaKind::String(checks) => {
            out.insert("minLength".into(), json!(checks.min_length));
            out.insert("maxLength".into(), json!(checks.max_length));
            out.insert("format".into(), json!(checks.format.map(|f| f.as_str())));
            out.insert("pattern".into(), json!(checks.pattern));
            out.insert("coerce".into(), json!(checks.coerce));
        }
        SchemaKind::Number(checks) => {
            out.insert("int".into(), json!(checks.int));
            out.insert("minimum".into(), json!(checks.minimum));
            out.insert("maximum".into(), json!(checks.maximum));
            out.insert("exclusiveMinimum".into(), json!(checks.exclusive_minimum));
            out.insert("exclusiveMaximum".into(), json!(checks.exclusive_maximum));
            out.insert("coerce".into(), json!(checks.coerce));
        }
        SchemaKind::BigInt { coerce }
        | SchemaKind::Boolean { coerce }
        | SchemaKind::Date { coerce } => {
            out.insert("coerce".into(), json!(coerce));
        }
        SchemaKind::Null
        | SchemaKind::Any
        | SchemaKind::Unknown
        | SchemaKind::Void
        | SchemaKind::Custom(_) => {}
        SchemaKind::Literal(value) => {
            out.insert("value".into(), value.clone());
        }
        SchemaKind::Enum(values) => {
            out.insert("values".into(), json!(values));
        }
        SchemaKind::Array {
            item,
            min_items,
            max_items,
        } => {
            out.insert("item".into(), child(item));
            out.insert("minItems".into(), json!(min_items));
            out.insert("maxItems".into(), json!(max_items));
        }
        SchemaKind::Tuple { items, rest } => {
            out.insert("items".into(), Value::Array(items.iter().map(&mut child).collect()));
            out.insert("rest".into(), rest.as_deref().map(&mut child).unwrap_or(Value::Null));
        }
        SchemaKind::Object { shape } => {
            let properties: Map<String, Value> =
                shape.iter().map(|(k, v)| (k.clone(), child(v))).collect();
            out.insert("shape".into(), Value::Object(properties));
        }
        SchemaKind::Record { key, value } => {
            out.insert("key".into(), child(key));
            out.insert("value".into(), child(value));
        }
        SchemaKind::Union(options) => {
            out.insert("options".into(), Value::Array(options.iter().map(&mut child).collect()));
        }
        SchemaKind::DiscriminatedUnion {
            discriminator,
            options,
        } => {
            out.insert("discriminator".into(), json!(discriminator));
            out.insert("options".into(), Value::Array(options.iter().map(&mut child).collect()));
        }
        SchemaKind::Intersection(left, right) => {
            out.insert("left".into(), child(left));
            out.insert("right".into(), child(right));
        }
        SchemaKind::Optional(inner) | SchemaKind::Nullable(inner) | SchemaKind::Readonly(inner) => {
            out.insert("inner".into(), child(inner));
        }
        SchemaKind::Default { inner, value } | SchemaKind::Catch { inner, value } => {
            out.insert("inner".into(), child(inner));
            out.insert("value".into(), value.clone());
        }
        SchemaKind::Branded { inner, brand } => {
            out.insert("inner".into(), child(inner));
            out.insert("brand".into(), json!(brand));
        }
        SchemaKind::Effect { inner, effect } => {
            out.insert("inner".into(), child(inner));
            let effect = match effect {
                Effect::Transform(t) => json!({"transform": t.name()}),
                Effect::Refine(r) => json!({"refine": r.name()}),
            };
            out.insert("effect".into(), effect);
        }
        SchemaKind::Preprocess { inner, transform } => {
            out.insert("inner".into(), child(inner));
            out.insert("transform".into(), json!(transform.name()));
        }
        SchemaKind::Pipeline { input, output } => {
            out.insert("input".into(), child(input));
            out.insert("output".into(), child(output));
        }
        SchemaKind::Lazy(_) => {}
        SchemaKind::Function { args, returns } => {
            out.insert("args".into(), child(args));
            out.insert("returns".into(), child(returns));
        }
    }

    out.insert("description".into(), json!(node.meta.description));
    if !node.meta.examples.is_empty() {
        out.insert("examples".into(), Value::Array(node.meta.examples.clone()));
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category() -> SchemaNode {
        SchemaNode::object([
            ("name", SchemaNode::string()),
            ("children", SchemaNode::array(SchemaNode::lazy(category)).optional()),
        ])
    }

    #[test]
    fn test_fingerprint_consistency() {
        let a = CanonicalDigest.fingerprint(&category());
        let b = CanonicalDigest.fingerprint(&category());
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_differs_by_structure() {
        let a = CanonicalDigest.fingerprint(&SchemaNode::string());
        let b = CanonicalDigest.fingerprint(&SchemaNode::string().describe("name"));
        let c = CanonicalDigest.fingerprint(&SchemaNode::number());
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_canonical_form_terminates_on_self_reference() {
        let form = canonical_form(&SchemaNode::lazy(category));
        assert_eq!(form["kind"], "lazy");
        assert_eq!(form["target"]["kind"], "object");
    }

    fn chain(depth: usize, leaf: fn() -> SchemaNode) -> SchemaNode {
        if depth == 0 {
            return leaf();
        }
        SchemaNode::object([(
            "next",
            SchemaNode::lazy_named(format!("Link{}", depth), move || chain(depth - 1, leaf)),
        )])
    }

    #[test]
    fn test_deep_references_are_expanded() {
        let text = || SchemaNode::object([("z", SchemaNode::string())]);
        let count = || SchemaNode::object([("z", SchemaNode::int())]);
        for depth in 1..6 {
            assert_ne!(
                CanonicalDigest.fingerprint(&chain(depth, text)),
                CanonicalDigest.fingerprint(&chain(depth, count)),
                "chains of depth {} collide",
                depth
            );
        }
    }

    #[test]
    fn test_repeated_key_becomes_reference() {
        let form = canonical_form(&category());
        let nested = &form["shape"]["children"]["inner"]["item"];
        assert_eq!(nested["target"]["kind"], "object");
        let cycle = &nested["target"]["shape"]["children"]["inner"]["item"];
        assert_eq!(cycle["kind"], "lazy");
        assert_eq!(cycle["ref"], nested["ref"]);
        assert!(cycle.get("target").is_none());
    }

    #[test]
    fn test_closure_strategy() {
        let by_kind = |node: &SchemaNode| node.kind_name().to_string();
        assert_eq!(by_kind.fingerprint(&SchemaNode::boolean()), "boolean");
    }
}
