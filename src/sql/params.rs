//! Convert serde_json::Value to values that sqlx can bind, guided by the column's abstract type.

use crate::config::ColumnType;
use serde_json::Value;

/// A value bound to a `?` placeholder.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    /// String columns take every scalar as text; integer columns keep numbers numeric.
    pub fn from_json(v: &Value, ty: ColumnType) -> Self {
        match (ty, v) {
            (_, Value::Null) => SqlValue::Null,
            (ColumnType::String, Value::String(s)) => SqlValue::Text(s.clone()),
            (ColumnType::String, Value::Number(n)) => SqlValue::Text(n.to_string()),
            (ColumnType::String, Value::Bool(b)) => SqlValue::Text(b.to_string()),
            (ColumnType::Integer, Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    SqlValue::UInt(u)
                } else {
                    SqlValue::Float(n.as_f64().unwrap_or_default())
                }
            }
            (ColumnType::Integer, Value::Bool(b)) => SqlValue::Int(i64::from(*b)),
            (ColumnType::Integer, Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(i) => SqlValue::Int(i),
                Err(_) => SqlValue::Text(s.clone()),
            },
            (_, Value::Array(_) | Value::Object(_)) => SqlValue::Text(v.to_string()),
        }
    }
}
