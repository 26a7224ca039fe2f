//! Process-lifetime constant tables enumerating the known text-filter and
//! semantic-transform names, the effect vocabulary, and the builtin
//! operations the validator special-cases (`spec.md` §2, §4.4, §6). These
//! are read-only after start; no runtime mutation is needed anywhere in
//! the front-end (`spec.md` §5).

/// Names recognized by the text-filter pipeline's active-filter-set logic.
pub const TEXT_FILTER_NAMES: &[&str] = &[
    "collections",
    "operators",
    "implicit-i32",
    "implicit-utf8",
    "append_operators",
];

pub fn is_known_text_filter(name: &str) -> bool {
    TEXT_FILTER_NAMES.contains(&name)
}

/// Primitive type names usable as a `return<T>` type or anywhere else a
/// primitive type is expected.
pub const PRIMITIVE_TYPES: &[&str] = &[
    "int", "i32", "i64", "u64", "float", "f32", "f64", "bool", "void", "string",
];

pub fn is_primitive_type(name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&name)
}

/// Templated type family names: `Pointer<T>`, `Reference<T>`, `array<T>`,
/// `vector<T>`, `map<K,V>`.
pub const TEMPLATED_TYPE_FAMILIES: &[&str] = &["Pointer", "Reference", "array", "vector", "map"];

pub fn is_templated_type_family(name: &str) -> bool {
    TEMPLATED_TYPE_FAMILIES.contains(&name)
}

/// Storage-class transform names (`spec.md` §3 Transform).
pub const STORAGE_CLASS_TRANSFORMS: &[&str] = &[
    "struct", "pod", "stack", "heap", "buffer", "handle", "gpu_lane",
];

pub fn is_storage_class_transform(name: &str) -> bool {
    STORAGE_CLASS_TRANSFORMS.contains(&name)
}

/// Binding-qualifier transform names.
pub const QUALIFIER_TRANSFORMS: &[&str] = &[
    "mut",
    "copy",
    "restrict",
    "public",
    "private",
    "package",
    "static",
    "align_bytes",
    "align_kbytes",
];

pub fn is_qualifier_transform(name: &str) -> bool {
    QUALIFIER_TRANSFORMS.contains(&name)
}

/// Transform names that carry semantic meaning understood by the
/// validator, as opposed to arbitrary names appended by a rule that the
/// validator doesn't special-case.
pub fn is_known_semantic_transform(name: &str) -> bool {
    matches!(name, "return" | "effects" | "capabilities")
        || is_storage_class_transform(name)
        || is_qualifier_transform(name)
}

/// The effect vocabulary named in `spec.md` §6. Additional effects are
/// permitted (any lower_snake_case identifier), so this is used only to
/// recognize the builtins' *required* effects, not to reject unknown ones.
pub const KNOWN_EFFECTS: &[&str] = &[
    "io_out",
    "io_err",
    "heap_alloc",
    "pathspace_notify",
    "pathspace_insert",
    "pathspace_take",
];

pub fn is_lower_snake_case(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && identifier.chars().next().map_or(false, |c| c.is_ascii_lowercase())
}

/// Arithmetic/comparison builtin call names, as produced by the
/// `operators` text filter or written directly in canonical form.
pub const ARITHMETIC_BUILTINS: &[&str] = &[
    "plus", "minus", "multiply", "divide", "negate",
];

pub const COMPARISON_BUILTINS: &[&str] = &[
    "equal",
    "not_equal",
    "less_than",
    "less_equal",
    "greater_than",
    "greater_equal",
];

pub const LOGICAL_BUILTINS: &[&str] = &["and", "or", "not"];

/// `clamp`/`lerp`/`min`/`max`: numeric builtins that select or interpolate
/// among their operands rather than combining exactly two, promoted through
/// the same numeric table as arithmetic (`spec.md` §4.5).
pub const NUMERIC_SELECT_BUILTINS: &[&str] = &["clamp", "lerp", "min", "max"];

pub const POINTER_BUILTINS: &[&str] = &["location", "dereference"];

pub const INCREMENT_BUILTINS: &[&str] = &["increment", "decrement"];

/// Builtins requiring an `io_out`/`io_err` capability, mapped to the
/// effect they require.
pub fn print_builtin_effect(name: &str) -> Option<&'static str> {
    match name {
        "print" | "print_line" => Some("io_out"),
        "print_error" | "print_line_error" => Some("io_err"),
        _ => None,
    }
}

pub fn is_print_builtin(name: &str) -> bool {
    print_builtin_effect(name).is_some()
}

/// Container operation builtins dispatched on array/vector/map/string
/// targets.
pub const CONTAINER_BUILTINS: &[&str] = &["count", "at", "at_unsafe"];

pub fn is_builtin(name: &str) -> bool {
    ARITHMETIC_BUILTINS.contains(&name)
        || COMPARISON_BUILTINS.contains(&name)
        || LOGICAL_BUILTINS.contains(&name)
        || NUMERIC_SELECT_BUILTINS.contains(&name)
        || POINTER_BUILTINS.contains(&name)
        || INCREMENT_BUILTINS.contains(&name)
        || CONTAINER_BUILTINS.contains(&name)
        || is_print_builtin(name)
        || matches!(name, "assign" | "convert" | "if" | "then" | "else" | "return")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_filters_and_rejects_unknown() {
        assert!(is_known_text_filter("operators"));
        assert!(!is_known_text_filter("nonsense"));
    }

    #[test]
    fn lower_snake_case_validation() {
        assert!(is_lower_snake_case("io_out"));
        assert!(!is_lower_snake_case("IoOut"));
        assert!(!is_lower_snake_case(""));
        assert!(!is_lower_snake_case("_io"));
    }
}
