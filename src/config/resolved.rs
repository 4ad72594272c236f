//! Resolved desired schema: document validated and flattened for runtime use.
//! Loaded once at boot and shared read-only by the reconciler and the CRUD layer.

use std::collections::HashMap;

/// Name of the implicit row identifier every table carries.
pub const ID_COLUMN: &str = "id";

/// Abstract column type as written in the schema file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    String,
}

impl ColumnType {
    /// Strict parse of a schema type name.
    pub fn parse(name: &str) -> Option<ColumnType> {
        match name {
            "integer" => Some(ColumnType::Integer),
            "string" => Some(ColumnType::String),
            _ => None,
        }
    }

    /// Lenient parse: unrecognized names fall back to `String`.
    pub fn from_name(name: &str) -> ColumnType {
        Self::parse(name).unwrap_or(ColumnType::String)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::String => "string",
        }
    }
}

/// A `{name, type}` pair. Equality is structural, which is what the column diff compares.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: ColumnType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        ColumnSpec { name: name.into(), ty }
    }
}

/// Column as it is created. The integer `id` is always the auto-increment row identifier;
/// `primary` says whether it carries the primary key or only a unique key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    pub spec: ColumnSpec,
    pub auto_increment: bool,
    pub primary: bool,
}

impl ColumnDef {
    pub fn plain(spec: ColumnSpec) -> Self {
        ColumnDef {
            spec,
            auto_increment: false,
            primary: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub primary_key: Option<String>,
}

impl TableSpec {
    /// Primary key column, `id` when the document does not name one.
    pub fn primary_key_name(&self) -> &str {
        self.primary_key.as_deref().unwrap_or(ID_COLUMN)
    }

    /// Declared columns with the implicit integer `id` prepended when the table does not declare one.
    /// An integer `id`, declared or not, auto-increments so every row gets an address for CRUD.
    pub fn effective_columns(&self) -> Vec<ColumnDef> {
        let mut out = Vec::with_capacity(self.columns.len() + 1);
        if !self.columns.iter().any(|c| c.name == ID_COLUMN) {
            out.push(self.column_def(ColumnSpec::new(ID_COLUMN, ColumnType::Integer)));
        }
        out.extend(self.columns.iter().cloned().map(|c| self.column_def(c)));
        out
    }

    fn column_def(&self, spec: ColumnSpec) -> ColumnDef {
        let primary = spec.name == self.primary_key_name();
        if spec.name == ID_COLUMN && spec.ty == ColumnType::Integer {
            return ColumnDef {
                spec,
                auto_increment: true,
                primary,
            };
        }
        ColumnDef {
            primary,
            ..ColumnDef::plain(spec)
        }
    }

    /// Type of a field, including the implicit `id`.
    pub fn column_type(&self, field: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == field)
            .map(|c| c.ty)
            .or_else(|| (field == ID_COLUMN).then_some(ColumnType::Integer))
    }
}

#[derive(Clone, Debug, Default)]
pub struct DesiredSchema {
    pub tables: Vec<TableSpec>,
    table_index: HashMap<String, usize>,
}

impl DesiredSchema {
    pub fn new(tables: Vec<TableSpec>) -> Self {
        let table_index = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        DesiredSchema { tables, table_index }
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.table_index.get(name).map(|&i| &self.tables[i])
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    /// Abstract type of `table.field`, or None when either is not in the schema.
    pub fn field_type(&self, table: &str, field: &str) -> Option<ColumnType> {
        self.table(table).and_then(|t| t.column_type(field))
    }
}
