//! Load the desired schema from its JSON document.

use crate::config::resolved::{ColumnSpec, ColumnType, DesiredSchema, TableSpec};
use crate::config::types::SchemaDocument;
use crate::config::validate;
use crate::error::ConfigError;
use std::path::Path;

/// Build the desired schema from a parsed document (validates first).
pub fn resolve(doc: &SchemaDocument) -> Result<DesiredSchema, ConfigError> {
    validate(doc)?;
    let tables = doc
        .tables
        .iter()
        .map(|t| TableSpec {
            name: t.name.clone(),
            columns: t
                .columns
                .iter()
                .map(|c| {
                    if ColumnType::parse(&c.type_).is_none() {
                        tracing::warn!(
                            table = %t.name,
                            column = %c.name,
                            type_name = %c.type_,
                            "unknown column type, using string"
                        );
                    }
                    ColumnSpec::new(c.name.clone(), ColumnType::from_name(&c.type_))
                })
                .collect(),
            primary_key: t.primary_key.clone(),
        })
        .collect();
    Ok(DesiredSchema::new(tables))
}

pub fn parse_schema(json: &str) -> Result<DesiredSchema, ConfigError> {
    let doc: SchemaDocument = serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))?;
    resolve(&doc)
}

/// Read, parse and resolve the schema file.
pub async fn load_schema(path: &Path) -> Result<DesiredSchema, ConfigError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let schema = parse_schema(&raw)?;
    tracing::info!(path = %path.display(), tables = schema.tables.len(), "desired schema loaded");
    Ok(schema)
}
