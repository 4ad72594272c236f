//! Schema document validation: identifiers, uniqueness and primary key references.

use crate::config::{SchemaDocument, ID_COLUMN};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;

const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_$]{0,63}$";

pub fn validate(doc: &SchemaDocument) -> Result<(), ConfigError> {
    let ident = Regex::new(IDENTIFIER_PATTERN).map_err(|e| ConfigError::Validation(e.to_string()))?;

    let mut table_names = HashSet::new();
    for t in &doc.tables {
        if !ident.is_match(&t.name) {
            return Err(ConfigError::Validation(format!("invalid table name '{}'", t.name)));
        }
        if !table_names.insert(t.name.as_str()) {
            return Err(ConfigError::DuplicateTable(t.name.clone()));
        }

        let mut column_names = HashSet::new();
        for c in &t.columns {
            if !ident.is_match(&c.name) {
                return Err(ConfigError::Validation(format!(
                    "invalid column name '{}' in table '{}'",
                    c.name, t.name
                )));
            }
            if !column_names.insert(c.name.as_str()) {
                return Err(ConfigError::DuplicateColumn {
                    table: t.name.clone(),
                    column: c.name.clone(),
                });
            }
        }

        if let Some(pk) = &t.primary_key {
            if pk != ID_COLUMN && !column_names.contains(pk.as_str()) {
                return Err(ConfigError::InvalidPrimaryKey {
                    table: t.name.clone(),
                    column: pk.clone(),
                });
            }
        }
    }

    Ok(())
}
