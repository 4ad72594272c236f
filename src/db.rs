//! The one MySQL connection: connect with bounded retry, then execute statements one at a time.

use crate::config::{DatabaseConfig, RetryPolicy};
use crate::error::{ConnectError, QueryError};
use crate::sql::{SqlValue, Statement};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Connection, MySql, Row};
use std::fmt::Display;
use std::future::Future;
use tokio::sync::Mutex;

/// One result row: column name to JSON value.
pub type Record = Map<String, Value>;

/// What a non-query statement reports back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    pub last_insert_id: u64,
}

/// Runs single statements. Implementations never overlap two statements.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, statement: &Statement) -> Result<ExecOutcome, QueryError>;

    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Record>, QueryError>;
}

/// Retry gave up; carries the attempt count and the last error.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last: E,
}

/// Run `op` until it succeeds or `policy.max_attempts` is reached, sleeping `policy.interval` in between.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < policy.max_attempts => {
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "attempt failed, retrying in {:?}",
                    policy.interval
                );
                tokio::time::sleep(policy.interval).await;
                attempt += 1;
            }
            Err(e) => return Err(RetryExhausted { attempts: attempt, last: e }),
        }
    }
}

pub fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database)
}

/// Exclusively owned connection; statements are serialized through the mutex.
pub struct Database {
    conn: Mutex<MySqlConnection>,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig, policy: &RetryPolicy) -> Result<Self, ConnectError> {
        let options = connect_options(config);
        let options = &options;
        let conn = retry(policy, move |attempt| {
            tracing::info!(attempt, host = %config.host, port = config.port, database = %config.database, "connecting");
            MySqlConnection::connect_with(options)
        })
        .await
        .map_err(|e| {
            tracing::error!(attempts = e.attempts, error = %e.last, "database connection failed");
            ConnectError {
                attempts: e.attempts,
                source: e.last,
            }
        })?;
        tracing::info!("database connection established");
        Ok(Database { conn: Mutex::new(conn) })
    }
}

#[async_trait]
impl QueryExecutor for Database {
    async fn execute(&self, statement: &Statement) -> Result<ExecOutcome, QueryError> {
        tracing::debug!(sql = %statement.sql, params = ?statement.params, "execute");
        let mut conn = self.conn.lock().await;
        let result = bind_params(&statement.sql, &statement.params)
            .execute(&mut *conn)
            .await
            .map_err(|e| query_error(statement, e))?;
        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_id(),
        })
    }

    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Record>, QueryError> {
        tracing::debug!(sql = %statement.sql, params = ?statement.params, "query");
        let mut conn = self.conn.lock().await;
        let rows = bind_params(&statement.sql, &statement.params)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| query_error(statement, e))?;
        Ok(rows.iter().map(row_to_record).collect())
    }
}

fn bind_params<'q>(sql: &'q str, params: &'q [SqlValue]) -> Query<'q, MySql, MySqlArguments> {
    let mut query = sqlx::query(sql);
    for p in params {
        query = match p {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Int(n) => query.bind(*n),
            SqlValue::UInt(n) => query.bind(*n),
            SqlValue::Float(n) => query.bind(*n),
            SqlValue::Text(s) => query.bind(s.as_str()),
        };
    }
    query
}

fn query_error(statement: &Statement, cause: sqlx::Error) -> QueryError {
    tracing::warn!(sql = %statement.sql, error = %cause, "statement failed");
    QueryError {
        statement: statement.sql.clone(),
        cause,
    }
}

fn row_to_record(row: &MySqlRow) -> Record {
    let mut out = Map::new();
    for (idx, col) in row.columns().iter().enumerate() {
        out.insert(col.name().to_string(), cell_to_value(row, idx));
    }
    out
}

fn cell_to_value(row: &MySqlRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return v
            .and_then(|f| serde_json::Number::from_f64(f as f64))
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return v.map(|d| Value::String(d.to_rfc3339())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return v.map(|d| Value::String(d.to_string())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return v.map(|d| Value::String(d.to_string())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return v
            .map(|b| Value::String(String::from_utf8_lossy(&b).into_owned()))
            .unwrap_or(Value::Null);
    }
    // DECIMAL and friends arrive as text.
    if let Ok(v) = row.try_get_unchecked::<Option<String>, _>(idx) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    Value::Null
}
