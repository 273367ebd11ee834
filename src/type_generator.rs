use crate::alias::{make_alias, AliasTable};
use crate::config::OptionalPropStyle;
use crate::error::{Error, Result};
use crate::events::Direction;
use crate::fingerprint::{CanonicalDigest, Fingerprinter};
use crate::probe::{probe_transform, SampleType};
use crate::schema::{Effect, LazySchema, SchemaKind, SchemaNode};
use crate::typescript::{Declaration, Keyword, Param, PropertySignature, TsType};
use crate::walker::{walk, Next, RuleSet};
use indexmap::IndexMap;
use log::debug;
use serde_json::Value;
use std::cell::RefCell;

/// Type generator - depicts schema trees as TypeScript types
pub struct TypeGenerator {
    /// Type aliases created for lazy references
    aliases: RefCell<AliasTable<TsType>>,
    fingerprinter: Box<dyn Fingerprinter>,
    optional_props: OptionalPropStyle,
}

impl TypeGenerator {
    pub fn new(optional_props: OptionalPropStyle) -> Self {
        Self::with_fingerprinter(optional_props, CanonicalDigest)
    }

    pub fn with_fingerprinter(
        optional_props: OptionalPropStyle,
        fingerprinter: impl Fingerprinter + 'static,
    ) -> Self {
        debug!("Initializing TypeGenerator with {:?}", optional_props);
        Self {
            aliases: RefCell::new(AliasTable::new("Type")),
            fingerprinter: Box::new(fingerprinter),
            optional_props,
        }
    }

    /// Generate the type of data flowing in `direction`
    pub fn generate_type(&self, node: &SchemaNode, direction: Direction) -> Result<TsType> {
        debug!("Generating {} type for {} node", direction, node.kind_name());
        walk(node, self, &direction)
    }

    /// Alias declarations created so far, in creation order
    pub fn alias_declarations(&self) -> Vec<Declaration> {
        self.aliases
            .borrow()
            .definitions()
            .map(|(name, ty)| Declaration::alias(name, ty.clone()))
            .collect()
    }

    fn depict_object(
        &self,
        shape: &IndexMap<String, SchemaNode>,
        direction: Direction,
        next: &Next<'_, Self>,
    ) -> Result<TsType> {
        let mut members = Vec::with_capacity(shape.len());
        for (key, value) in shape {
            let optional = if direction.is_output() && value.has_coercion() {
                matches!(value.kind, SchemaKind::Optional(_))
            } else {
                value.is_optional()
            };
            members.push(PropertySignature {
                name: key.clone(),
                ty: next.call(value)?,
                optional: optional && self.optional_props.with_question_mark,
            });
        }
        Ok(TsType::Object(members))
    }

    fn depict_effect(
        &self,
        node: &SchemaNode,
        inner: &SchemaNode,
        effect: &Effect,
        direction: Direction,
        next: &Next<'_, Self>,
    ) -> Result<TsType> {
        let input = next.call(inner)?;
        if !matches!(effect, Effect::Transform(_)) || !direction.is_output() {
            return Ok(input);
        }
        let Some(sample) = sample_type(&input) else {
            debug!("No sample for transform input, typing output as any");
            return Ok(TsType::keyword(Keyword::Any));
        };
        match probe_transform(node, &sample.sample()) {
            Ok(kind) => Ok(match kind.as_str() {
                "number" => TsType::keyword(Keyword::Number),
                "boolean" => TsType::keyword(Keyword::Boolean),
                _ => TsType::keyword(Keyword::String),
            }),
            Err(e) => {
                debug!("Transform probe failed ({}), typing output as any", e);
                Ok(TsType::keyword(Keyword::Any))
            }
        }
    }

    fn depict_function(
        &self,
        args: &SchemaNode,
        returns: &SchemaNode,
        direction: Direction,
        next: &Next<'_, Self>,
    ) -> Result<TsType> {
        let (items, rest) = match args.tuple_parts() {
            Some(parts) => parts,
            None => (std::slice::from_ref(args), None),
        };

        let mut params = Vec::with_capacity(items.len() + 1);
        for (i, item) in items.iter().enumerate() {
            let is_callback = matches!(item.kind, SchemaKind::Function { .. });
            // callbacks are invoked by the other side, so their data flows the other way
            let ty = if is_callback {
                walk(item, self, &direction.flip())?
            } else {
                next.call(item)?
            };
            let name = if is_callback && i + 1 == items.len() {
                "cb".to_string()
            } else {
                format!("p{}", i)
            };
            params.push(Param {
                name,
                ty,
                rest: false,
            });
        }
        if let Some(rest) = rest {
            params.push(Param {
                name: "rest".to_string(),
                ty: next.call(rest)?,
                rest: true,
            });
        }

        Ok(TsType::Function {
            params,
            returns: Box::new(next.call(returns)?),
        })
    }

    fn depict_lazy(&self, lazy: &LazySchema, direction: Direction, next: &Next<'_, Self>) -> Result<TsType> {
        let target = lazy.resolve();
        let fingerprint = format!("{}:{}", direction, self.fingerprinter.fingerprint(&target));
        let name = make_alias(
            &self.aliases,
            fingerprint,
            || TsType::keyword(Keyword::Any),
            || next.call(&target),
        )?;
        Ok(TsType::reference(name))
    }
}

impl RuleSet for TypeGenerator {
    type Output = TsType;
    type Context = Direction;

    fn handle(&self, node: &SchemaNode, ctx: &Direction, next: &Next<'_, Self>) -> Option<Result<TsType>> {
        let direction = *ctx;
        let result = match &node.kind {
            SchemaKind::String(_) => Ok(TsType::keyword(Keyword::String)),
            SchemaKind::Number(_) => Ok(TsType::keyword(Keyword::Number)),
            SchemaKind::BigInt { .. } => Ok(TsType::keyword(Keyword::BigInt)),
            SchemaKind::Boolean { .. } => Ok(TsType::keyword(Keyword::Boolean)),
            SchemaKind::Date { .. } => Ok(TsType::reference("Date")),
            SchemaKind::Null => Ok(TsType::keyword(Keyword::Null)),
            SchemaKind::Any => Ok(TsType::keyword(Keyword::Any)),
            SchemaKind::Unknown => Ok(TsType::keyword(Keyword::Unknown)),
            SchemaKind::Void => Ok(TsType::keyword(Keyword::Void)),
            SchemaKind::Literal(value) => Ok(TsType::Literal(value.clone())),
            SchemaKind::Enum(values) => Ok(TsType::union(
                values.iter().map(|v| TsType::Literal(Value::String(v.clone()))),
            )),
            SchemaKind::Array { item, .. } => next.call(item).map(TsType::array),
            SchemaKind::Tuple { items, rest } => items
                .iter()
                .map(|item| next.call(item))
                .collect::<Result<Vec<_>>>()
                .and_then(|items| {
                    let rest = match rest {
                        Some(rest) => Some(Box::new(next.call(rest)?)),
                        None => None,
                    };
                    Ok(TsType::Tuple { items, rest })
                }),
            SchemaKind::Object { shape } => self.depict_object(shape, direction, next),
            SchemaKind::Record { key, value } => next
                .call(key)
                .and_then(|k| Ok(TsType::Record(Box::new(k), Box::new(next.call(value)?)))),
            SchemaKind::Union(options) | SchemaKind::DiscriminatedUnion { options, .. } => options
                .iter()
                .map(|option| next.call(option))
                .collect::<Result<Vec<_>>>()
                .map(TsType::union),
            SchemaKind::Intersection(left, right) => next
                .call(left)
                .and_then(|l| Ok(TsType::Intersection(vec![l, next.call(right)?]))),
            SchemaKind::Optional(inner) => next.call(inner).map(|ty| {
                if self.optional_props.with_undefined {
                    TsType::union([ty, TsType::keyword(Keyword::Undefined)])
                } else {
                    ty
                }
            }),
            SchemaKind::Nullable(inner) => next
                .call(inner)
                .map(|ty| TsType::union([ty, TsType::keyword(Keyword::Null)])),
            SchemaKind::Default { inner, .. }
            | SchemaKind::Catch { inner, .. }
            | SchemaKind::Branded { inner, .. }
            | SchemaKind::Readonly(inner)
            | SchemaKind::Preprocess { inner, .. } => next.call(inner),
            SchemaKind::Effect { inner, effect } => {
                self.depict_effect(node, inner, effect, direction, next)
            }
            SchemaKind::Pipeline { input, output } => {
                next.call(if direction.is_output() { output } else { input })
            }
            SchemaKind::Lazy(lazy) => self.depict_lazy(lazy, direction, next),
            SchemaKind::Function { args, returns } => {
                self.depict_function(args, returns, direction, next)
            }
            SchemaKind::Custom(_) => return None,
        };
        Some(result)
    }

    fn on_missing(&self, node: &SchemaNode, ctx: &Direction) -> Error {
        Error::UnsupportedKind {
            kind: node.kind_name().to_string(),
            direction: *ctx,
        }
    }

    fn on_each(&self, node: &SchemaNode, _ctx: &Direction, _prev: &TsType) -> Option<String> {
        node.description().map(str::to_string)
    }
}

/// Sample input for probing a transform whose input was typed as `ty`
fn sample_type(ty: &TsType) -> Option<SampleType> {
    match ty.bare() {
        TsType::Keyword(Keyword::Number) => Some(SampleType::Number),
        TsType::Keyword(Keyword::BigInt) => Some(SampleType::BigInt),
        TsType::Keyword(Keyword::String) => Some(SampleType::String),
        TsType::Keyword(Keyword::Boolean) => Some(SampleType::Boolean),
        TsType::Keyword(Keyword::Null) => Some(SampleType::Null),
        TsType::Object(_) | TsType::Record(..) => Some(SampleType::Object),
        TsType::Array(_) | TsType::Tuple { .. } => Some(SampleType::Array),
        TsType::Reference(name) if name == "Date" => Some(SampleType::Date),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Transform;
    use crate::typescript::{print_declarations, print_type};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn print(node: &SchemaNode, direction: Direction) -> String {
        let generator = TypeGenerator::new(OptionalPropStyle::default());
        print_type(&generator.generate_type(node, direction).unwrap())
    }

    fn node_tree() -> SchemaNode {
        SchemaNode::object([
            ("value", SchemaNode::int()),
            ("next", SchemaNode::lazy(node_tree).nullable()),
        ])
    }

    #[test]
    fn test_primitives() {
        assert_eq!(print(&SchemaNode::string(), Direction::In), "string");
        assert_eq!(print(&SchemaNode::int(), Direction::In), "number");
        assert_eq!(print(&SchemaNode::bigint(), Direction::In), "bigint");
        assert_eq!(print(&SchemaNode::date(), Direction::Out), "Date");
        assert_eq!(print(&SchemaNode::null(), Direction::Out), "null");
        assert_eq!(print(&SchemaNode::unknown(), Direction::Out), "unknown");
        assert_eq!(
            print(&SchemaNode::enumeration(["on", "off"]), Direction::In),
            "\"on\" | \"off\""
        );
    }

    #[test]
    fn test_containers() {
        assert_eq!(print(&SchemaNode::array(SchemaNode::string()), Direction::In), "string[]");
        assert_eq!(
            print(
                &SchemaNode::record(SchemaNode::string(), SchemaNode::boolean()),
                Direction::In
            ),
            "Record<string, boolean>"
        );
        assert_eq!(
            print(
                &SchemaNode::tuple(vec![SchemaNode::literal("pong")]).rest(SchemaNode::unknown()),
                Direction::Out
            ),
            "[\"pong\", ...unknown[]]"
        );
        assert_eq!(
            print(
                &SchemaNode::intersection(SchemaNode::string(), SchemaNode::string().brand("Id")),
                Direction::In
            ),
            "string & string"
        );
    }

    #[test]
    fn test_tuple_arity_property() {
        let generator = TypeGenerator::new(OptionalPropStyle::default());
        for n in 0..4 {
            let items: Vec<_> = (0..n).map(|_| SchemaNode::string()).collect();
            for rest in [None, Some(SchemaNode::int())] {
                let tuple = match &rest {
                    Some(rest) => SchemaNode::tuple(items.clone()).rest(rest.clone()),
                    None => SchemaNode::tuple(items.clone()),
                };

                match generator.generate_type(&tuple, Direction::In).unwrap() {
                    TsType::Tuple { items, rest: tail } => {
                        assert_eq!(items.len(), n);
                        assert_eq!(tail.is_some(), rest.is_some());
                    }
                    other => panic!("expected a tuple, got {:?}", other),
                }

                let function = SchemaNode::function(tuple, SchemaNode::void());
                match generator.generate_type(&function, Direction::In).unwrap() {
                    TsType::Function { params, .. } => {
                        let rest_slots = usize::from(rest.is_some());
                        assert_eq!(params.len(), n + rest_slots);
                        assert_eq!(params.iter().filter(|p| p.rest).count(), rest_slots);
                    }
                    other => panic!("expected a function, got {:?}", other),
                }
            }
        }
    }

    #[test]
    fn test_empty_choices_are_never() {
        let empty: [&str; 0] = [];
        assert_eq!(print(&SchemaNode::enumeration(empty), Direction::In), "never");
        assert_eq!(print(&SchemaNode::union(Vec::new()), Direction::Out), "never");
        assert_eq!(
            print(
                &SchemaNode::string().nullable().describe("nick").nullable(),
                Direction::In
            ),
            "string | null"
        );
    }

    #[test]
    fn test_optional_style_matrix() {
        let node = SchemaNode::object([("a", SchemaNode::string().optional())]);
        let cases = [
            (true, true, "a?: string | undefined;"),
            (true, false, "a?: string;"),
            (false, true, "a: string | undefined;"),
            (false, false, "a: string;"),
        ];
        for (with_question_mark, with_undefined, expected) in cases {
            let generator = TypeGenerator::new(OptionalPropStyle {
                with_question_mark,
                with_undefined,
            });
            let printed = print_type(&generator.generate_type(&node, Direction::In).unwrap());
            assert_eq!(printed, format!("{{\n    {}\n}}", expected));
        }
    }

    #[test]
    fn test_coerced_output_property_is_required() {
        let node = SchemaNode::object([("count", SchemaNode::int().coerce())]);
        assert_eq!(print(&node, Direction::Out), "{\n    count: number;\n}");
        let flag = SchemaNode::object([("flag", SchemaNode::boolean().coerce())]);
        assert_eq!(print(&flag, Direction::In), "{\n    flag?: boolean;\n}");
    }

    #[test]
    fn test_nullable_idempotence() {
        assert_eq!(print(&SchemaNode::string().nullable(), Direction::In), "string | null");
        assert_eq!(
            print(&SchemaNode::string().nullable().nullable(), Direction::In),
            "string | null"
        );
    }

    #[test]
    fn test_transform_output_is_probed() {
        let length = Transform::new("length", |v| match v {
            Value::String(s) => Ok(json!(s.len())),
            other => Err(format!("cannot measure {}", other)),
        });
        let node = SchemaNode::string().transform(length);
        assert_eq!(print(&node, Direction::Out), "number");
        assert_eq!(print(&node, Direction::In), "string");

        let opaque = SchemaNode::unknown().transform(Transform::new("id", |v| Ok(v)));
        assert_eq!(print(&opaque, Direction::Out), "any");
    }

    #[test]
    fn test_pipeline_direction() {
        let node = SchemaNode::string().pipe(SchemaNode::boolean());
        assert_eq!(print(&node, Direction::In), "string");
        assert_eq!(print(&node, Direction::Out), "boolean");
    }

    #[test]
    fn test_function_parameters() {
        let ack = SchemaNode::function(
            SchemaNode::tuple(vec![SchemaNode::literal("pong")]),
            SchemaNode::void(),
        );
        let node = SchemaNode::function(
            SchemaNode::tuple(vec![SchemaNode::string(), ack]),
            SchemaNode::void(),
        );
        assert_eq!(
            print(&node, Direction::In),
            "(p0: string, cb: (p0: \"pong\") => void) => void"
        );

        let variadic = SchemaNode::function(
            SchemaNode::tuple(vec![]).rest(SchemaNode::number()),
            SchemaNode::void(),
        );
        assert_eq!(print(&variadic, Direction::In), "(...rest: number[]) => void");
    }

    #[test]
    fn test_callback_is_typed_in_flipped_direction() {
        let ack = SchemaNode::function(
            SchemaNode::tuple(vec![SchemaNode::string().pipe(SchemaNode::int())]),
            SchemaNode::void(),
        );
        let node = SchemaNode::function(SchemaNode::tuple(vec![ack]), SchemaNode::void());
        assert_eq!(print(&node, Direction::In), "(cb: (p0: number) => void) => void");
    }

    #[test]
    fn test_descriptions_become_comments() {
        let node = SchemaNode::object([("id", SchemaNode::string().describe("Primary key"))]);
        assert_eq!(
            print(&node, Direction::In),
            "{\n    /** Primary key */\n    id: string;\n}"
        );
    }

    #[test]
    fn test_self_reference_terminates() {
        let generator = TypeGenerator::new(OptionalPropStyle::default());
        let ty = generator
            .generate_type(&SchemaNode::lazy(node_tree), Direction::Out)
            .unwrap();
        assert_eq!(ty, TsType::reference("Type1"));

        let aliases = generator.alias_declarations();
        assert_eq!(aliases.len(), 1);
        assert_eq!(
            print_declarations(&aliases),
            "export type Type1 = {\n    value: number;\n    next: Type1 | null;\n};\n"
        );
    }

    #[test]
    fn test_custom_kind_is_fatal() {
        let generator = TypeGenerator::new(OptionalPropStyle::default());
        let node = SchemaNode::array(SchemaNode::custom("symbol"));
        let err = generator.generate_type(&node, Direction::Out).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported schema kind `symbol` (output direction)"
        );
    }
}
