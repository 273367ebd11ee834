//! A small TypeScript type AST and its printer.
//!
//! Only the constructs the type generator emits are modelled. Printing is deterministic:
//! four-space indentation, object members one per line, and documentation comments
//! hoisted onto the member, parameter or declaration that carries them.

use crate::naming::is_identifier;
use crate::walker::Overlay;
use serde_json::Value;

const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    String,
    Number,
    BigInt,
    Boolean,
    Null,
    Undefined,
    Any,
    Unknown,
    Never,
    Void,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::String => "string",
            Keyword::Number => "number",
            Keyword::BigInt => "bigint",
            Keyword::Boolean => "boolean",
            Keyword::Null => "null",
            Keyword::Undefined => "undefined",
            Keyword::Any => "any",
            Keyword::Unknown => "unknown",
            Keyword::Never => "never",
            Keyword::Void => "void",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TsType {
    Keyword(Keyword),
    Literal(Value),
    Reference(String),
    Array(Box<TsType>),
    Tuple {
        items: Vec<TsType>,
        rest: Option<Box<TsType>>,
    },
    Object(Vec<PropertySignature>),
    Record(Box<TsType>, Box<TsType>),
    Union(Vec<TsType>),
    Intersection(Vec<TsType>),
    Function {
        params: Vec<Param>,
        returns: Box<TsType>,
    },
    /// A type carrying a documentation comment
    Documented {
        comment: String,
        inner: Box<TsType>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySignature {
    pub name: String,
    pub ty: TsType,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TsType,
    /// `...name: T[]`
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclarationKind {
    Alias(TsType),
    Interface(Vec<PropertySignature>),
}

/// Exported top-level declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclarationKind,
}

impl TsType {
    pub fn keyword(keyword: Keyword) -> Self {
        TsType::Keyword(keyword)
    }

    pub fn reference(name: impl Into<String>) -> Self {
        TsType::Reference(name.into())
    }

    pub fn array(item: TsType) -> Self {
        TsType::Array(Box::new(item))
    }

    /// Union of `members`, flattening nested unions and dropping duplicates.
    /// A single member is returned as is, no members at all is `never`.
    pub fn union(members: impl IntoIterator<Item = TsType>) -> Self {
        let mut flat: Vec<TsType> = Vec::new();
        for member in members {
            // comments on nested unions do not survive flattening
            let parts = match member.bare() {
                TsType::Union(inner) => inner.clone(),
                _ => vec![member],
            };
            for part in parts {
                if !flat.contains(&part) {
                    flat.push(part);
                }
            }
        }
        match flat.len() {
            0 => TsType::keyword(Keyword::Never),
            1 => flat.remove(0),
            _ => TsType::Union(flat),
        }
    }

    /// The type without its documentation wrapper
    pub fn bare(&self) -> &TsType {
        match self {
            TsType::Documented { inner, .. } => inner.bare(),
            other => other,
        }
    }

    fn split_comment(&self) -> (Option<&str>, &TsType) {
        match self {
            TsType::Documented { comment, inner } => (Some(comment.as_str()), inner.bare()),
            other => (None, other),
        }
    }
}

impl Overlay for TsType {
    type Patch = String;

    fn overlay(self, comment: String) -> Self {
        let inner = match self {
            TsType::Documented { inner, .. } => inner,
            other => Box::new(other),
        };
        TsType::Documented { comment, inner }
    }
}

impl Declaration {
    pub fn alias(name: impl Into<String>, ty: TsType) -> Self {
        Self {
            name: name.into(),
            kind: DeclarationKind::Alias(ty),
        }
    }

    pub fn interface(name: impl Into<String>, members: Vec<PropertySignature>) -> Self {
        Self {
            name: name.into(),
            kind: DeclarationKind::Interface(members),
        }
    }
}

/// Prints a type expression at the top indentation level
pub fn print_type(ty: &TsType) -> String {
    let mut out = String::new();
    write_type(&mut out, ty, 0);
    out
}

pub fn print_declaration(declaration: &Declaration) -> String {
    let mut out = String::new();
    match &declaration.kind {
        DeclarationKind::Alias(ty) => {
            let (comment, bare) = ty.split_comment();
            write_comment(&mut out, comment, 0);
            out.push_str(&format!("export type {} = ", declaration.name));
            write_type(&mut out, bare, 0);
            out.push(';');
        }
        DeclarationKind::Interface(members) => {
            out.push_str(&format!("export interface {} ", declaration.name));
            write_members(&mut out, members, 0);
        }
    }
    out
}

/// Prints declarations separated by blank lines, ending with a newline
pub fn print_declarations(declarations: &[Declaration]) -> String {
    let mut out = declarations
        .iter()
        .map(print_declaration)
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push('\n');
    out
}

fn write_type(out: &mut String, ty: &TsType, depth: usize) {
    match ty {
        TsType::Keyword(keyword) => out.push_str(keyword.as_str()),
        TsType::Literal(value) => out.push_str(&value.to_string()),
        TsType::Reference(name) => out.push_str(name),
        TsType::Array(item) => {
            write_operand(out, item, depth, needs_parens_in_array(item));
            out.push_str("[]");
        }
        TsType::Tuple { items, rest } => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_type(out, item.bare(), depth);
            }
            if let Some(rest) = rest {
                if !items.is_empty() {
                    out.push_str(", ");
                }
                out.push_str("...");
                write_operand(out, rest, depth, needs_parens_in_array(rest));
                out.push_str("[]");
            }
            out.push(']');
        }
        TsType::Object(members) => write_members(out, members, depth),
        TsType::Record(key, value) => {
            out.push_str("Record<");
            write_type(out, key.bare(), depth);
            out.push_str(", ");
            write_type(out, value.bare(), depth);
            out.push('>');
        }
        TsType::Union(members) => write_joined(out, members, " | ", depth, |m| {
            matches!(m, TsType::Function { .. } | TsType::Union(_))
        }),
        TsType::Intersection(members) => write_joined(out, members, " & ", depth, |m| {
            matches!(m, TsType::Function { .. } | TsType::Union(_) | TsType::Intersection(_))
        }),
        TsType::Function { params, returns } => {
            out.push('(');
            for (i, param) in params.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let (comment, bare) = param.ty.split_comment();
                if let Some(comment) = comment {
                    out.push_str(&format!("/** {} */ ", escape_comment(comment)));
                }
                if param.rest {
                    out.push_str("...");
                }
                out.push_str(&param.name);
                out.push_str(": ");
                if param.rest {
                    write_operand(out, bare, depth, needs_parens_in_array(bare));
                    out.push_str("[]");
                } else {
                    write_type(out, bare, depth);
                }
            }
            out.push_str(") => ");
            write_type(out, returns.bare(), depth);
        }
        TsType::Documented { inner, .. } => write_type(out, inner, depth),
    }
}

fn write_operand(out: &mut String, ty: &TsType, depth: usize, parens: bool) {
    let ty = ty.bare();
    if parens {
        out.push('(');
        write_type(out, ty, depth);
        out.push(')');
    } else {
        write_type(out, ty, depth);
    }
}

fn write_joined(
    out: &mut String,
    members: &[TsType],
    separator: &str,
    depth: usize,
    parens: impl Fn(&TsType) -> bool,
) {
    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        let bare = member.bare();
        write_operand(out, bare, depth, parens(bare));
    }
}

fn write_members(out: &mut String, members: &[PropertySignature], depth: usize) {
    if members.is_empty() {
        out.push_str("{}");
        return;
    }
    out.push_str("{\n");
    for member in members {
        let (comment, bare) = member.ty.split_comment();
        write_comment(out, comment, depth + 1);
        out.push_str(&INDENT.repeat(depth + 1));
        out.push_str(&property_name(&member.name));
        if member.optional {
            out.push('?');
        }
        out.push_str(": ");
        write_type(out, bare, depth + 1);
        out.push_str(";\n");
    }
    out.push_str(&INDENT.repeat(depth));
    out.push('}');
}

fn write_comment(out: &mut String, comment: Option<&str>, depth: usize) {
    if let Some(comment) = comment {
        out.push_str(&INDENT.repeat(depth));
        out.push_str(&format!("/** {} */\n", escape_comment(comment)));
    }
}

fn needs_parens_in_array(ty: &TsType) -> bool {
    matches!(
        ty.bare(),
        TsType::Union(_) | TsType::Intersection(_) | TsType::Function { .. }
    )
}

fn property_name(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        Value::String(name.to_string()).to_string()
    }
}

fn escape_comment(comment: &str) -> String {
    comment.replace("*/", "*\\/").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn string() -> TsType {
        TsType::keyword(Keyword::String)
    }

    #[test]
    fn test_union_flattens_and_dedups() {
        let inner = TsType::union([string(), TsType::keyword(Keyword::Null)]);
        let outer = TsType::union([inner, TsType::keyword(Keyword::Null)]);
        assert_eq!(print_type(&outer), "string | null");
        assert_eq!(TsType::union([string()]), string());
    }

    #[test]
    fn test_empty_union_is_never() {
        assert_eq!(TsType::union(Vec::new()), TsType::keyword(Keyword::Never));
        let function = TsType::Function {
            params: vec![Param {
                name: "p0".into(),
                ty: TsType::union(Vec::new()),
                rest: false,
            }],
            returns: Box::new(TsType::keyword(Keyword::Void)),
        };
        assert_eq!(print_type(&function), "(p0: never) => void");
    }

    #[test]
    fn test_documented_union_is_flattened() {
        let inner = TsType::union([string(), TsType::keyword(Keyword::Null)]).overlay("nick".into());
        let outer = TsType::union([inner, TsType::keyword(Keyword::Null)]);
        assert_eq!(print_type(&outer), "string | null");
    }

    #[test]
    fn test_array_parenthesises_compound_items() {
        let item = TsType::union([string(), TsType::keyword(Keyword::Number)]);
        assert_eq!(print_type(&TsType::array(item)), "(string | number)[]");
        assert_eq!(print_type(&TsType::array(string())), "string[]");
    }

    #[test]
    fn test_tuple_with_rest() {
        let tuple = TsType::Tuple {
            items: vec![TsType::Literal(json!("pong"))],
            rest: Some(Box::new(TsType::keyword(Keyword::Unknown))),
        };
        assert_eq!(print_type(&tuple), "[\"pong\", ...unknown[]]");
    }

    #[test]
    fn test_object_members() {
        let object = TsType::Object(vec![
            PropertySignature {
                name: "id".into(),
                ty: TsType::keyword(Keyword::Number).overlay("Identifier".into()),
                optional: false,
            },
            PropertySignature {
                name: "content-type".into(),
                ty: TsType::union([string(), TsType::keyword(Keyword::Undefined)]),
                optional: true,
            },
        ]);
        assert_eq!(
            print_type(&object),
            "{\n    /** Identifier */\n    id: number;\n    \"content-type\"?: string | undefined;\n}"
        );
        assert_eq!(print_type(&TsType::Object(vec![])), "{}");
    }

    #[test]
    fn test_function_parameters() {
        let callback = TsType::Function {
            params: vec![Param {
                name: "p0".into(),
                ty: TsType::Literal(json!("pong")),
                rest: false,
            }],
            returns: Box::new(TsType::keyword(Keyword::Void)),
        };
        let function = TsType::Function {
            params: vec![
                Param {
                    name: "p0".into(),
                    ty: string().overlay("Rest argument #1".into()),
                    rest: false,
                },
                Param {
                    name: "cb".into(),
                    ty: callback,
                    rest: false,
                },
            ],
            returns: Box::new(TsType::keyword(Keyword::Void)),
        };
        assert_eq!(
            print_type(&function),
            "(/** Rest argument #1 */ p0: string, cb: (p0: \"pong\") => void) => void"
        );
    }

    #[test]
    fn test_rest_parameter() {
        let function = TsType::Function {
            params: vec![Param {
                name: "rest".into(),
                ty: TsType::keyword(Keyword::Number),
                rest: true,
            }],
            returns: Box::new(TsType::keyword(Keyword::Void)),
        };
        assert_eq!(print_type(&function), "(...rest: number[]) => void");
    }

    #[test]
    fn test_functions_in_unions_are_parenthesised() {
        let function = TsType::Function {
            params: vec![],
            returns: Box::new(TsType::keyword(Keyword::Void)),
        };
        let union = TsType::union([function, TsType::keyword(Keyword::Undefined)]);
        assert_eq!(print_type(&union), "(() => void) | undefined");
    }

    #[test]
    fn test_overlay_replaces_comment() {
        let ty = string().overlay("first".into()).overlay("second".into());
        assert_eq!(
            ty,
            TsType::Documented {
                comment: "second".into(),
                inner: Box::new(string()),
            }
        );
    }

    #[test]
    fn test_declarations() {
        let alias = Declaration::alias("Type1", TsType::array(string()).overlay("Names".into()));
        let interface = Declaration::interface(
            "ChatActions",
            vec![PropertySignature {
                name: "ping".into(),
                ty: TsType::reference("ChatPingAction"),
                optional: false,
            }],
        );
        assert_eq!(
            print_declarations(&[alias, interface]),
            "/** Names */\nexport type Type1 = string[];\n\nexport interface ChatActions {\n    ping: ChatPingAction;\n}\n"
        );
    }

    #[test]
    fn test_nested_object_indentation() {
        let object = TsType::Object(vec![PropertySignature {
            name: "user".into(),
            ty: TsType::Object(vec![PropertySignature {
                name: "name".into(),
                ty: string(),
                optional: false,
            }]),
            optional: false,
        }]);
        assert_eq!(
            print_type(&object),
            "{\n    user: {\n        name: string;\n    };\n}"
        );
    }

    #[test]
    fn test_comment_terminator_is_escaped() {
        assert_eq!(escape_comment("a */ b"), "a *\\/ b");
    }
}
