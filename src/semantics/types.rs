//! The small type language the validator reasons about (`spec.md` §3's
//! "Type families" and §4.5's numeric promotion table). Built from the
//! flat transform/template-arg text the parser already produced, never
//! from a separate type-expression grammar.

use crate::ast::Transform;
use crate::registries;

#[derive(Clone, Debug, PartialEq)]
pub enum Ty {
    Primitive(String),
    Pointer(Box<Ty>),
    Reference(Box<Ty>),
    Array(Box<Ty>),
    Vector(Box<Ty>),
    Map(Box<Ty>, Box<Ty>),
    /// A user-defined struct-like definition, referenced by its full path
    /// or bare name.
    Named(String),
    Void,
    Unknown,
}

impl Ty {
    pub fn is_primitive(&self) -> bool {
        matches!(self, Ty::Primitive(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Ty::Primitive(p) if p == "string")
    }
}

/// Parses a template-arg text such as `"Pointer<i32>"` or `"map<i32, string>"`
/// into a structured `Ty`. Template args are rendered as flat strings by the
/// parser's `parse_type_text` (`spec.md` §4.2), so this performs the same
/// depth-aware `<...>` / `,` splitting in reverse.
pub fn parse_type_text(text: &str) -> Ty {
    let text = text.trim();
    if text.is_empty() {
        return Ty::Unknown;
    }
    match text.find('<') {
        None => from_leaf(text),
        Some(open) => {
            let name = &text[..open];
            let close = match text.rfind('>') {
                Some(c) => c,
                None => return Ty::Unknown,
            };
            let inner = &text[open + 1..close];
            let parts = split_top_level_commas(inner);
            match name {
                "Pointer" => Ty::Pointer(Box::new(parse_type_text(parts.first().map(String::as_str).unwrap_or("")))),
                "Reference" => Ty::Reference(Box::new(parse_type_text(parts.first().map(String::as_str).unwrap_or("")))),
                "array" => Ty::Array(Box::new(parse_type_text(parts.first().map(String::as_str).unwrap_or("")))),
                "vector" => Ty::Vector(Box::new(parse_type_text(parts.first().map(String::as_str).unwrap_or("")))),
                "map" => Ty::Map(
                    Box::new(parse_type_text(parts.first().map(String::as_str).unwrap_or(""))),
                    Box::new(parse_type_text(parts.get(1).map(String::as_str).unwrap_or(""))),
                ),
                other => Ty::Named(other.to_string()),
            }
        }
    }
}

fn from_leaf(name: &str) -> Ty {
    match name {
        "void" => Ty::Void,
        "int" | "i32" | "i64" | "u64" | "float" | "f32" | "f64" | "bool" | "string" => {
            Ty::Primitive(normalize_primitive(name))
        }
        other => Ty::Named(other.to_string()),
    }
}

/// `int`/`float` are generic aliases (`spec.md` §3); resolved to concrete
/// widths so the promotion table only needs concrete primitive names.
fn normalize_primitive(name: &str) -> String {
    match name {
        "int" => "i32".to_string(),
        "float" => "f64".to_string(),
        other => other.to_string(),
    }
}

/// The declared type of a parameter or binding, found the same way the
/// parser's `transforms_are_type_like` looks for it: the first transform
/// that names a primitive, a templated type family, or an otherwise
/// unrecognized (struct-path) name, skipping leading qualifiers like `mut`.
pub fn declared_type(transforms: &[Transform]) -> Ty {
    for t in transforms {
        let is_type_like = registries::is_primitive_type(&t.name)
            || registries::is_templated_type_family(&t.name)
            || !registries::is_known_semantic_transform(&t.name);
        if is_type_like {
            let text = if t.template_args.is_empty() {
                t.name.clone()
            } else {
                format!("{}<{}>", t.name, t.template_args.join(", "))
            };
            return parse_type_text(&text);
        }
    }
    Ty::Unknown
}

fn split_top_level_commas(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '<' => {
                depth += 1;
                current.push(c);
            }
            '>' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumKind {
    I32,
    I64,
    U64,
    F32,
    F64,
    Bool,
}

pub fn num_kind_of(ty: &Ty) -> Option<NumKind> {
    match ty {
        Ty::Primitive(p) => match p.as_str() {
            "i32" => Some(NumKind::I32),
            "i64" => Some(NumKind::I64),
            "u64" => Some(NumKind::U64),
            "f32" => Some(NumKind::F32),
            "f64" => Some(NumKind::F64),
            "bool" => Some(NumKind::Bool),
            _ => None,
        },
        _ => None,
    }
}

/// The numeric promotion table from `spec.md` §4.5. `None` is the table's
/// `⊥` (invalid mixed operands).
pub fn promote(a: NumKind, b: NumKind) -> Option<NumKind> {
    use NumKind::*;
    match (a, b) {
        (I32, I32) => Some(I32),
        (I32, I64) | (I64, I32) => Some(I64),
        (I32, F32) | (F32, I32) => Some(F32),
        (I32, F64) | (F64, I32) => Some(F64),
        (I64, I64) => Some(I64),
        (I64, F64) | (F64, I64) => Some(F64),
        (U64, U64) => Some(U64),
        (F32, F32) => Some(F32),
        (F32, F64) | (F64, F32) => Some(F64),
        (F64, F64) => Some(F64),
        _ => None,
    }
}

/// Comparisons widen `bool` to `i32` when paired with a signed integer
/// (`spec.md` §4.5); used only by comparison-operand checking, not by
/// arithmetic.
pub fn comparison_num_kind(a: NumKind, b: NumKind) -> Option<NumKind> {
    use NumKind::*;
    match (a, b) {
        (Bool, I32) | (I32, Bool) => Some(I32),
        (Bool, I64) | (I64, Bool) => Some(I64),
        (Bool, Bool) => Some(Bool),
        _ => promote(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_primitive() {
        assert_eq!(parse_type_text("i32"), Ty::Primitive("i32".to_string()));
        assert_eq!(parse_type_text("int"), Ty::Primitive("i32".to_string()));
    }

    #[test]
    fn parses_nested_templated_types() {
        assert_eq!(
            parse_type_text("Pointer<i32>"),
            Ty::Pointer(Box::new(Ty::Primitive("i32".to_string())))
        );
        assert_eq!(
            parse_type_text("map<i32, string>"),
            Ty::Map(
                Box::new(Ty::Primitive("i32".to_string())),
                Box::new(Ty::Primitive("string".to_string()))
            )
        );
    }

    #[test]
    fn promotion_table_matches_spec() {
        assert_eq!(promote(NumKind::I32, NumKind::I64), Some(NumKind::I64));
        assert_eq!(promote(NumKind::I32, NumKind::U64), None);
        assert_eq!(promote(NumKind::U64, NumKind::U64), Some(NumKind::U64));
        assert_eq!(promote(NumKind::Bool, NumKind::Bool), None);
    }
}
