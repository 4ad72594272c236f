//! Raw schema document types matching the JSON schema file.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub tables: Vec<TableDocument>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDocument {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnDocument>,
    #[serde(default)]
    pub primary_key: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnDocument {
    pub name: String,
    /// Abstract type name: "integer" or "string". Anything else is treated as "string".
    #[serde(rename = "type", default = "default_column_type")]
    pub type_: String,
}

fn default_column_type() -> String {
    "string".into()
}
