//! Builds parameterized INSERT, SELECT, UPDATE, DELETE addressed by the `id` column.

use crate::config::ID_COLUMN;
use crate::sql::SqlValue;

/// Quote identifier for MySQL.
pub fn quoted(s: &str) -> String {
    format!("`{}`", s.replace('`', "``"))
}

/// One SQL statement and its positional parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    /// Statement without parameters (DDL, introspection).
    pub fn raw(sql: impl Into<String>) -> Self {
        Statement {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, v: SqlValue) -> Self {
        self.params.push(v);
        self
    }
}

pub fn insert(table: &str, fields: &[(String, SqlValue)]) -> Statement {
    let cols: Vec<String> = fields.iter().map(|(name, _)| quoted(name)).collect();
    let placeholders = vec!["?"; fields.len()];
    Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted(table),
            cols.join(", "),
            placeholders.join(", ")
        ),
        params: fields.iter().map(|(_, v)| v.clone()).collect(),
    }
}

pub fn select_by_id(table: &str, id: i64) -> Statement {
    Statement::raw(format!(
        "SELECT * FROM {} WHERE {} = ? LIMIT 1",
        quoted(table),
        quoted(ID_COLUMN)
    ))
    .bind(SqlValue::Int(id))
}

/// UPDATE by id. Caller guarantees `fields` is non-empty.
pub fn update(table: &str, id: i64, fields: &[(String, SqlValue)]) -> Statement {
    let sets: Vec<String> = fields.iter().map(|(name, _)| format!("{} = ?", quoted(name))).collect();
    let mut params: Vec<SqlValue> = fields.iter().map(|(_, v)| v.clone()).collect();
    params.push(SqlValue::Int(id));
    Statement {
        sql: format!(
            "UPDATE {} SET {} WHERE {} = ?",
            quoted(table),
            sets.join(", "),
            quoted(ID_COLUMN)
        ),
        params,
    }
}

pub fn delete(table: &str, id: i64) -> Statement {
    Statement::raw(format!("DELETE FROM {} WHERE {} = ?", quoted(table), quoted(ID_COLUMN))).bind(SqlValue::Int(id))
}
