//! DDL statements issued by the reconciler and their MySQL rendering.

use crate::config::{ColumnDef, TableSpec};
use crate::sql::{quoted, to_native_type};

/// A single schema change.
#[derive(Clone, Debug, PartialEq)]
pub enum Ddl {
    /// Create a table with its effective columns and primary key.
    CreateTable(TableSpec),
    DropTable(String),
    AddColumn { table: String, column: ColumnDef },
    DropColumn { table: String, column: String },
    AddPrimaryKey { table: String, column: String },
    DropPrimaryKey { table: String },
}

impl Ddl {
    pub fn table(&self) -> &str {
        match self {
            Ddl::CreateTable(t) => &t.name,
            Ddl::DropTable(name) => name,
            Ddl::AddColumn { table, .. }
            | Ddl::DropColumn { table, .. }
            | Ddl::AddPrimaryKey { table, .. }
            | Ddl::DropPrimaryKey { table } => table,
        }
    }

    pub fn to_sql(&self) -> String {
        match self {
            Ddl::CreateTable(t) => {
                let mut defs: Vec<String> = t.effective_columns().iter().map(column_definition).collect();
                defs.push(format!("PRIMARY KEY ({})", quoted(t.primary_key_name())));
                format!("CREATE TABLE {} ({});", quoted(&t.name), defs.join(", "))
            }
            Ddl::DropTable(name) => format!("DROP TABLE {};", quoted(name)),
            Ddl::AddColumn { table, column } => {
                // MySQL only accepts an auto-increment column that is keyed in the same statement.
                let key = if column.auto_increment && column.primary {
                    " PRIMARY KEY"
                } else {
                    ""
                };
                format!(
                    "ALTER TABLE {} ADD COLUMN {}{};",
                    quoted(table),
                    column_definition(column),
                    key
                )
            }
            Ddl::DropColumn { table, column } => {
                format!("ALTER TABLE {} DROP COLUMN {};", quoted(table), quoted(column))
            }
            Ddl::AddPrimaryKey { table, column } => {
                format!("ALTER TABLE {} ADD PRIMARY KEY ({});", quoted(table), quoted(column))
            }
            Ddl::DropPrimaryKey { table } => format!("ALTER TABLE {} DROP PRIMARY KEY;", quoted(table)),
        }
    }
}

fn column_definition(c: &ColumnDef) -> String {
    let mut def = format!("{} {}", quoted(&c.spec.name), to_native_type(c.spec.ty));
    if c.auto_increment {
        def.push_str(" NOT NULL AUTO_INCREMENT");
        if !c.primary {
            def.push_str(" UNIQUE");
        }
    }
    def
}
