//! Mapping between abstract schema types and MySQL column types.

use crate::config::ColumnType;

pub fn to_native_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Integer => "INT",
        ColumnType::String => "VARCHAR(255)",
    }
}

/// Native declaration for a schema type name; unknown names map like `string`.
pub fn native_type_for_name(name: &str) -> &'static str {
    to_native_type(ColumnType::from_name(name))
}

/// Classify a native column type by substring: `int` first, then `varchar`, else string.
/// `int` is checked first so a name containing both classifies as integer; `varchar` and
/// everything else both land on string. Lossy: `bigint` and `tinyint(1)` are both integers.
/// MySQL reports lowercase names; input is lowercased so our own `INT` declaration classifies
/// the same way.
pub fn from_native_type(native: &str) -> ColumnType {
    if native.to_ascii_lowercase().contains("int") {
        ColumnType::Integer
    } else {
        ColumnType::String
    }
}
