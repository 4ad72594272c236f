//! Converge the live database schema to the desired schema: DDL for tables, columns and primary keys.
//!
//! Runs once at boot, strictly sequentially. Not transactional: every DDL statement commits on its
//! own, so a failure part way leaves the database partially migrated and aborts startup.

use crate::config::{ColumnSpec, DesiredSchema, TableSpec};
use crate::db::{QueryExecutor, Record};
use crate::error::{QueryError, ReconcileError};
use crate::sql::{from_native_type, Ddl, SqlValue, Statement};
use async_trait::async_trait;
use serde_json::Value;

/// Live catalog access plus DDL application.
#[async_trait]
pub trait SchemaBackend: Send + Sync {
    /// Live table names, in introspection order.
    async fn table_names(&self) -> Result<Vec<String>, QueryError>;

    /// Live columns of `table` with types reverse-mapped to abstract types.
    async fn columns(&self, table: &str) -> Result<Vec<ColumnSpec>, QueryError>;

    async fn primary_key(&self, table: &str) -> Result<Option<String>, QueryError>;

    async fn apply(&self, ddl: &Ddl) -> Result<(), QueryError>;
}

const TABLES_SQL: &str = "SELECT TABLE_NAME AS name FROM information_schema.TABLES \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_NAME";

const COLUMNS_SQL: &str = "SELECT COLUMN_NAME AS name, COLUMN_TYPE AS type FROM information_schema.COLUMNS \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION";

const PRIMARY_KEY_SQL: &str = "SELECT COLUMN_NAME AS name FROM information_schema.KEY_COLUMN_USAGE \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY' \
     ORDER BY ORDINAL_POSITION LIMIT 1";

/// MySQL `information_schema` introspection over any executor.
pub struct Introspector<'a> {
    executor: &'a dyn QueryExecutor,
}

impl<'a> Introspector<'a> {
    pub fn new(executor: &'a dyn QueryExecutor) -> Self {
        Introspector { executor }
    }
}

fn text(record: &Record, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl<'a> SchemaBackend for Introspector<'a> {
    async fn table_names(&self) -> Result<Vec<String>, QueryError> {
        let rows = self.executor.fetch_all(&Statement::raw(TABLES_SQL)).await?;
        Ok(rows.iter().filter_map(|r| text(r, "name")).collect())
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnSpec>, QueryError> {
        let q = Statement::raw(COLUMNS_SQL).bind(SqlValue::Text(table.to_string()));
        let rows = self.executor.fetch_all(&q).await?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                let name = text(r, "name")?;
                let native = text(r, "type").unwrap_or_default();
                Some(ColumnSpec::new(name, from_native_type(&native)))
            })
            .collect())
    }

    async fn primary_key(&self, table: &str) -> Result<Option<String>, QueryError> {
        let q = Statement::raw(PRIMARY_KEY_SQL).bind(SqlValue::Text(table.to_string()));
        let rows = self.executor.fetch_all(&q).await?;
        Ok(rows.first().and_then(|r| text(r, "name")))
    }

    async fn apply(&self, ddl: &Ddl) -> Result<(), QueryError> {
        self.executor.execute(&Statement::raw(ddl.to_sql())).await?;
        Ok(())
    }
}

/// DDL issued by one reconciliation run, in order.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub applied: Vec<Ddl>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

struct Run<'a, B: SchemaBackend + ?Sized> {
    backend: &'a B,
    report: ReconcileReport,
}

impl<B: SchemaBackend + ?Sized> Run<'_, B> {
    async fn apply(&mut self, ddl: Ddl) -> Result<(), QueryError> {
        tracing::info!(table = %ddl.table(), sql = %ddl.to_sql(), "applying schema change");
        self.backend.apply(&ddl).await?;
        self.report.applied.push(ddl);
        Ok(())
    }
}

/// Diff live against desired and apply DDL: tables first, then columns of every desired table.
pub async fn reconcile<B>(backend: &B, desired: &DesiredSchema) -> Result<ReconcileReport, ReconcileError>
where
    B: SchemaBackend + ?Sized,
{
    let mut run = Run {
        backend,
        report: ReconcileReport::default(),
    };

    let live_tables = backend.table_names().await?;
    let desired_tables = desired.table_names();
    if live_tables != desired_tables {
        fix_tables(&mut run, desired, &live_tables).await?;
    }

    for table in &desired.tables {
        fix_columns(&mut run, table).await?;
    }

    if run.report.is_empty() {
        tracing::info!("database schema already up to date");
    } else {
        tracing::info!(changes = run.report.applied.len(), "database schema reconciled");
    }
    Ok(run.report)
}

async fn fix_tables<B: SchemaBackend + ?Sized>(
    run: &mut Run<'_, B>,
    desired: &DesiredSchema,
    live_tables: &[String],
) -> Result<(), QueryError> {
    for name in live_tables {
        if desired.table(name).is_none() {
            run.apply(Ddl::DropTable(name.clone())).await?;
        }
    }
    for table in &desired.tables {
        if !live_tables.contains(&table.name) {
            run.apply(Ddl::CreateTable(table.clone())).await?;
        }
    }
    Ok(())
}

async fn fix_columns<B: SchemaBackend + ?Sized>(run: &mut Run<'_, B>, table: &TableSpec) -> Result<(), QueryError> {
    let live = run.backend.columns(&table.name).await?;
    let wanted = table.effective_columns();

    let to_remove: Vec<&ColumnSpec> = live
        .iter()
        .filter(|c| !wanted.iter().any(|w| w.spec == **c))
        .collect();
    let to_add: Vec<_> = wanted.iter().filter(|w| !live.contains(&w.spec)).collect();
    if to_remove.is_empty() && to_add.is_empty() {
        tracing::debug!(table = %table.name, "columns up to date");
        return Ok(());
    }

    let mut live_pk = run.backend.primary_key(&table.name).await?;

    // Drops go first so a retyped column can be re-added under the same name.
    for column in to_remove {
        if live_pk.as_deref() == Some(column.name.as_str()) {
            drop_primary_key(run, table, &mut live_pk).await?;
        }
        run.apply(Ddl::DropColumn {
            table: table.name.clone(),
            column: column.name.clone(),
        })
        .await?;
    }

    for column in to_add {
        // A table holds one primary key; the old one goes before the desired key column is keyed.
        if column.primary && live_pk.is_some() {
            drop_primary_key(run, table, &mut live_pk).await?;
        }
        run.apply(Ddl::AddColumn {
            table: table.name.clone(),
            column: column.clone(),
        })
        .await?;
        if column.primary {
            if !column.auto_increment {
                run.apply(Ddl::AddPrimaryKey {
                    table: table.name.clone(),
                    column: column.spec.name.clone(),
                })
                .await?;
            }
            live_pk = Some(column.spec.name.clone());
        }
    }
    Ok(())
}

async fn drop_primary_key<B: SchemaBackend + ?Sized>(
    run: &mut Run<'_, B>,
    table: &TableSpec,
    live_pk: &mut Option<String>,
) -> Result<(), QueryError> {
    run.apply(Ddl::DropPrimaryKey {
        table: table.name.clone(),
    })
    .await?;
    *live_pk = None;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_schema, ColumnType};
    use crate::db::ExecOutcome;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Clone, Debug, Default)]
    struct LiveTable {
        columns: Vec<ColumnSpec>,
        primary_key: Option<String>,
    }

    /// Catalog in memory; applying DDL mutates it the way MySQL would.
    #[derive(Default)]
    struct MemoryBackend {
        tables: Mutex<BTreeMap<String, LiveTable>>,
        log: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    impl MemoryBackend {
        fn with_table(self, name: &str, columns: &[(&str, ColumnType)], pk: Option<&str>) -> Self {
            self.tables.lock().unwrap().insert(
                name.to_string(),
                LiveTable {
                    columns: columns.iter().map(|(n, t)| ColumnSpec::new(*n, *t)).collect(),
                    primary_key: pk.map(String::from),
                },
            );
            self
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn table(&self, name: &str) -> Option<LiveTable> {
            self.tables.lock().unwrap().get(name).cloned()
        }
    }

    fn err(sql: &str) -> QueryError {
        QueryError {
            statement: sql.to_string(),
            cause: sqlx::Error::Protocol("rejected".into()),
        }
    }

    #[async_trait]
    impl SchemaBackend for MemoryBackend {
        async fn table_names(&self) -> Result<Vec<String>, QueryError> {
            Ok(self.tables.lock().unwrap().keys().cloned().collect())
        }

        async fn columns(&self, table: &str) -> Result<Vec<ColumnSpec>, QueryError> {
            Ok(self.table(table).map(|t| t.columns).unwrap_or_default())
        }

        async fn primary_key(&self, table: &str) -> Result<Option<String>, QueryError> {
            Ok(self.table(table).and_then(|t| t.primary_key))
        }

        async fn apply(&self, ddl: &Ddl) -> Result<(), QueryError> {
            let sql = ddl.to_sql();
            if self.fail_on.as_deref() == Some(sql.as_str()) {
                return Err(err(&sql));
            }
            self.log.lock().unwrap().push(sql.clone());
            let mut tables = self.tables.lock().unwrap();
            match ddl {
                Ddl::CreateTable(t) => {
                    tables.insert(
                        t.name.clone(),
                        LiveTable {
                            columns: t.effective_columns().into_iter().map(|c| c.spec).collect(),
                            primary_key: Some(t.primary_key_name().to_string()),
                        },
                    );
                }
                Ddl::DropTable(name) => {
                    tables.remove(name);
                }
                Ddl::AddColumn { table, column } => {
                    let t = tables.get_mut(table).ok_or_else(|| err(&sql))?;
                    if column.auto_increment && column.primary {
                        if t.primary_key.is_some() {
                            return Err(err(&sql));
                        }
                        t.primary_key = Some(column.spec.name.clone());
                    }
                    t.columns.push(column.spec.clone());
                }
                Ddl::DropColumn { table, column } => {
                    let t = tables.get_mut(table).ok_or_else(|| err(&sql))?;
                    t.columns.retain(|c| c.name != *column);
                    if t.primary_key.as_deref() == Some(column.as_str()) {
                        t.primary_key = None;
                    }
                }
                Ddl::AddPrimaryKey { table, column } => {
                    let t = tables.get_mut(table).ok_or_else(|| err(&sql))?;
                    if t.primary_key.is_some() {
                        return Err(err(&sql));
                    }
                    t.primary_key = Some(column.clone());
                }
                Ddl::DropPrimaryKey { table } => {
                    let t = tables.get_mut(table).ok_or_else(|| err(&sql))?;
                    t.primary_key = None;
                }
            }
            Ok(())
        }
    }

    fn users_schema() -> DesiredSchema {
        parse_schema(
            r#"{"tables":[{"name":"users","columns":[{"name":"email","type":"string"}],"primaryKey":"id"}]}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn creates_missing_table() {
        let backend = MemoryBackend::default();
        let report = reconcile(&backend, &users_schema()).await.unwrap();
        assert_eq!(
            backend.log(),
            vec!["CREATE TABLE `users` (`id` INT NOT NULL AUTO_INCREMENT, `email` VARCHAR(255), PRIMARY KEY (`id`));"]
        );
        assert_eq!(report.applied.len(), 1);
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let backend = MemoryBackend::default().with_table("legacy", &[("id", ColumnType::Integer)], Some("id"));
        let schema = parse_schema(
            r#"{"tables":[
                {"name":"users","columns":[{"name":"email","type":"string"},{"name":"age","type":"integer"}]},
                {"name":"codes","columns":[{"name":"code","type":"string"}],"primaryKey":"code"}
            ]}"#,
        )
        .unwrap();
        let first = reconcile(&backend, &schema).await.unwrap();
        assert!(!first.is_empty());
        let second = reconcile(&backend, &schema).await.unwrap();
        assert!(second.is_empty(), "unexpected DDL: {:?}", second.applied);
    }

    #[tokio::test]
    async fn drops_tables_not_in_schema() {
        let backend = MemoryBackend::default()
            .with_table("users", &[("id", ColumnType::Integer), ("email", ColumnType::String)], Some("id"))
            .with_table("sessions", &[("id", ColumnType::Integer)], Some("id"));
        reconcile(&backend, &users_schema()).await.unwrap();
        assert_eq!(backend.log(), vec!["DROP TABLE `sessions`;"]);
        assert!(backend.table("sessions").is_none());
    }

    #[tokio::test]
    async fn drops_extra_column_only() {
        let backend = MemoryBackend::default().with_table(
            "users",
            &[
                ("id", ColumnType::Integer),
                ("email", ColumnType::String),
                ("legacy_flag", ColumnType::Integer),
            ],
            Some("id"),
        );
        reconcile(&backend, &users_schema()).await.unwrap();
        assert_eq!(backend.log(), vec!["ALTER TABLE `users` DROP COLUMN `legacy_flag`;"]);
    }

    #[tokio::test]
    async fn column_order_is_not_a_difference() {
        let backend = MemoryBackend::default().with_table(
            "users",
            &[("email", ColumnType::String), ("id", ColumnType::Integer)],
            Some("id"),
        );
        let report = reconcile(&backend, &users_schema()).await.unwrap();
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn type_change_drops_then_adds() {
        let backend = MemoryBackend::default().with_table(
            "users",
            &[("id", ColumnType::Integer), ("email", ColumnType::Integer)],
            Some("id"),
        );
        reconcile(&backend, &users_schema()).await.unwrap();
        assert_eq!(
            backend.log(),
            vec![
                "ALTER TABLE `users` DROP COLUMN `email`;",
                "ALTER TABLE `users` ADD COLUMN `email` VARCHAR(255);",
            ]
        );
    }

    #[tokio::test]
    async fn missing_implicit_id_is_added_keyed() {
        let backend = MemoryBackend::default().with_table("users", &[("email", ColumnType::String)], None);
        reconcile(&backend, &users_schema()).await.unwrap();
        assert_eq!(
            backend.log(),
            vec!["ALTER TABLE `users` ADD COLUMN `id` INT NOT NULL AUTO_INCREMENT PRIMARY KEY;"]
        );
        assert_eq!(backend.table("users").unwrap().primary_key.as_deref(), Some("id"));
    }

    #[tokio::test]
    async fn implicit_id_on_explicitly_keyed_table_is_unique() {
        let backend = MemoryBackend::default().with_table("codes", &[("code", ColumnType::String)], Some("code"));
        let schema = parse_schema(
            r#"{"tables":[{"name":"codes","columns":[{"name":"code","type":"string"}],"primaryKey":"code"}]}"#,
        )
        .unwrap();
        reconcile(&backend, &schema).await.unwrap();
        assert_eq!(
            backend.log(),
            vec!["ALTER TABLE `codes` ADD COLUMN `id` INT NOT NULL AUTO_INCREMENT UNIQUE;"]
        );
        assert_eq!(backend.table("codes").unwrap().primary_key.as_deref(), Some("code"));
    }

    #[tokio::test]
    async fn declared_integer_id_is_stable_across_runs() {
        let backend = MemoryBackend::default();
        let schema = parse_schema(
            r#"{"tables":[{"name":"users","columns":[
                {"name":"id","type":"integer"},
                {"name":"email","type":"string"}
            ],"primaryKey":"id"}]}"#,
        )
        .unwrap();
        reconcile(&backend, &schema).await.unwrap();
        assert_eq!(
            backend.log(),
            vec!["CREATE TABLE `users` (`id` INT NOT NULL AUTO_INCREMENT, `email` VARCHAR(255), PRIMARY KEY (`id`));"]
        );
        assert!(reconcile(&backend, &schema).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn old_primary_key_is_dropped_before_keyed_id_is_added() {
        let backend = MemoryBackend::default().with_table(
            "users",
            &[("email", ColumnType::String), ("code", ColumnType::String)],
            Some("code"),
        );
        let schema = parse_schema(
            r#"{"tables":[{"name":"users","columns":[
                {"name":"email","type":"string"},
                {"name":"code","type":"string"}
            ]}]}"#,
        )
        .unwrap();
        reconcile(&backend, &schema).await.unwrap();
        assert_eq!(
            backend.log(),
            vec![
                "ALTER TABLE `users` DROP PRIMARY KEY;",
                "ALTER TABLE `users` ADD COLUMN `id` INT NOT NULL AUTO_INCREMENT PRIMARY KEY;",
            ]
        );
        assert_eq!(backend.table("users").unwrap().primary_key.as_deref(), Some("id"));
    }

    #[tokio::test]
    async fn retyped_primary_key_is_unkeyed_before_drop_and_rekeyed_after_add() {
        let backend = MemoryBackend::default().with_table(
            "codes",
            &[("id", ColumnType::Integer), ("code", ColumnType::Integer)],
            Some("code"),
        );
        let schema = parse_schema(
            r#"{"tables":[{"name":"codes","columns":[{"name":"code","type":"string"}],"primaryKey":"code"}]}"#,
        )
        .unwrap();
        reconcile(&backend, &schema).await.unwrap();
        assert_eq!(
            backend.log(),
            vec![
                "ALTER TABLE `codes` DROP PRIMARY KEY;",
                "ALTER TABLE `codes` DROP COLUMN `code`;",
                "ALTER TABLE `codes` ADD COLUMN `code` VARCHAR(255);",
                "ALTER TABLE `codes` ADD PRIMARY KEY (`code`);",
            ]
        );
        assert_eq!(backend.table("codes").unwrap().primary_key.as_deref(), Some("code"));
    }

    #[tokio::test]
    async fn create_and_drop_happen_in_one_run() {
        let backend = MemoryBackend::default().with_table("old", &[("id", ColumnType::Integer)], Some("id"));
        let report = reconcile(&backend, &users_schema()).await.unwrap();
        let creates = report
            .applied
            .iter()
            .filter(|d| matches!(d, Ddl::CreateTable(t) if t.name == "users"))
            .count();
        let drops_users = report
            .applied
            .iter()
            .filter(|d| matches!(d, Ddl::DropTable(n) if n == "users"))
            .count();
        assert_eq!(creates, 1);
        assert_eq!(drops_users, 0);
        assert_eq!(report.applied[0], Ddl::DropTable("old".into()));
    }

    #[tokio::test]
    async fn failure_aborts_and_keeps_earlier_changes() {
        let backend = MemoryBackend {
            fail_on: Some("ALTER TABLE `users` ADD COLUMN `email` VARCHAR(255);".into()),
            ..MemoryBackend::default()
        }
        .with_table("users", &[("id", ColumnType::Integer), ("email", ColumnType::Integer)], Some("id"));
        let err = reconcile(&backend, &users_schema()).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Query(q) if q.statement.contains("ADD COLUMN")));
        assert_eq!(backend.log(), vec!["ALTER TABLE `users` DROP COLUMN `email`;"]);
    }

    struct CannedExecutor {
        rows: Vec<Record>,
        seen: Mutex<Vec<Statement>>,
    }

    #[async_trait]
    impl QueryExecutor for CannedExecutor {
        async fn execute(&self, statement: &Statement) -> Result<ExecOutcome, QueryError> {
            self.seen.lock().unwrap().push(statement.clone());
            Ok(ExecOutcome::default())
        }

        async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Record>, QueryError> {
            self.seen.lock().unwrap().push(statement.clone());
            Ok(self.rows.clone())
        }
    }

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[tokio::test]
    async fn introspector_reverse_maps_column_types() {
        let exec = CannedExecutor {
            rows: vec![
                record(&[("name", "id"), ("type", "int")]),
                record(&[("name", "email"), ("type", "varchar(255)")]),
                record(&[("name", "created"), ("type", "datetime")]),
            ],
            seen: Mutex::new(Vec::new()),
        };
        let cols = Introspector::new(&exec).columns("users").await.unwrap();
        assert_eq!(
            cols,
            vec![
                ColumnSpec::new("id", ColumnType::Integer),
                ColumnSpec::new("email", ColumnType::String),
                ColumnSpec::new("created", ColumnType::String),
            ]
        );
        let seen = exec.seen.lock().unwrap();
        assert_eq!(seen[0].params, vec![SqlValue::Text("users".into())]);
    }

    #[tokio::test]
    async fn introspector_applies_rendered_ddl() {
        let exec = CannedExecutor {
            rows: vec![record(&[("name", "id")])],
            seen: Mutex::new(Vec::new()),
        };
        let introspector = Introspector::new(&exec);
        assert_eq!(introspector.primary_key("users").await.unwrap().as_deref(), Some("id"));
        introspector.apply(&Ddl::DropTable("old".into())).await.unwrap();
        let seen = exec.seen.lock().unwrap();
        assert_eq!(seen[1].sql, "DROP TABLE `old`;");
    }
}
