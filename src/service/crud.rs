//! Generic CRUD execution: one parameterized statement per operation, rows addressed by `id`.

use crate::config::DesiredSchema;
use crate::db::{QueryExecutor, Record};
use crate::error::{AppError, CrudOperation, QueryError};
use crate::sql::{delete, insert, select_by_id, update, SqlValue};
use serde_json::{Map, Value};

pub struct CrudService;

impl CrudService {
    /// Insert one record. Returns the generated row id.
    pub async fn create(
        executor: &dyn QueryExecutor,
        schema: &DesiredSchema,
        table: &str,
        record: &Map<String, Value>,
    ) -> Result<u64, AppError> {
        let fields = bind_fields(schema, table, record)?;
        let q = insert(table, &fields);
        let outcome = executor
            .execute(&q)
            .await
            .map_err(|e| failed(CrudOperation::Create, table, e))?;
        Ok(outcome.last_insert_id)
    }

    /// Fetch the row with `id`: zero or one records.
    pub async fn read(executor: &dyn QueryExecutor, table: &str, id: i64) -> Result<Vec<Record>, AppError> {
        let q = select_by_id(table, id);
        executor
            .fetch_all(&q)
            .await
            .map_err(|e| failed(CrudOperation::Read, table, e))
    }

    /// Update the fields present in `record` on row `id`.
    pub async fn update(
        executor: &dyn QueryExecutor,
        schema: &DesiredSchema,
        table: &str,
        id: i64,
        record: &Map<String, Value>,
    ) -> Result<(), AppError> {
        let fields = bind_fields(schema, table, record)?;
        if fields.is_empty() {
            return Err(AppError::BadRequest("no fields to update".into()));
        }
        let q = update(table, id, &fields);
        let outcome = executor
            .execute(&q)
            .await
            .map_err(|e| failed(CrudOperation::Update, table, e))?;
        tracing::debug!(table, id, rows = outcome.rows_affected, "updated");
        Ok(())
    }

    pub async fn delete(executor: &dyn QueryExecutor, table: &str, id: i64) -> Result<(), AppError> {
        let q = delete(table, id);
        let outcome = executor
            .execute(&q)
            .await
            .map_err(|e| failed(CrudOperation::Delete, table, e))?;
        tracing::debug!(table, id, rows = outcome.rows_affected, "deleted");
        Ok(())
    }
}

/// Look up each field's type; the first field missing from the schema aborts the operation.
fn bind_fields(
    schema: &DesiredSchema,
    table: &str,
    record: &Map<String, Value>,
) -> Result<Vec<(String, SqlValue)>, AppError> {
    record
        .iter()
        .map(|(field, value)| -> Result<(String, SqlValue), AppError> {
            let ty = schema
                .field_type(table, field)
                .ok_or_else(|| AppError::UnknownField {
                    table: table.to_string(),
                    field: field.clone(),
                })?;
            Ok((field.clone(), SqlValue::from_json(value, ty)))
        })
        .collect()
}

fn failed(op: CrudOperation, table: &str, e: QueryError) -> AppError {
    tracing::error!(table, operation = ?op, error = %e, "request statement failed");
    AppError::Failed(op)
}
