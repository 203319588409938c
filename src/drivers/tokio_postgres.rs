use std::collections::HashMap;

use tokio::runtime::{Builder, Runtime};
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, Config, NoTls, SimpleQueryMessage};

use super::postgres_wire::{TextParam, WireValue};
use crate::error::{NativeError, NativeResult};
use crate::traits::{
    ConnectTarget, ConnectionInfo, NativeClient, NativeConnection, NativeCursor, PreparedId,
    QueryOutcome,
};
use crate::types::{BoundParameter, Row, SqlValue};

/// Native client for PostgreSQL using tokio-postgres.
///
/// Each connection owns a current-thread runtime and blocks on it, so
/// every call returns only once the server has answered.
///
/// Ad hoc SQL runs over the simple query protocol, so scripts of several
/// statements are accepted and values come back as text. Prepared
/// statements use the extended protocol and return typed values.
#[derive(Debug, Default)]
pub struct TokioPostgresClient;

impl TokioPostgresClient {
    pub fn new() -> Self {
        Self
    }
}

impl NativeClient for TokioPostgresClient {
    fn open(&self, target: &ConnectTarget) -> NativeResult<Box<dyn NativeConnection>> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| NativeError::new(format!("failed to start runtime: {}", e)))?;

        let mut config = Config::new();
        // A socket setting wins over the host; a leading '/' makes it a socket directory
        if let Some(host) = target.socket.as_deref().or(target.host.as_deref()) {
            config.host(host);
        }
        if let Some(port) = target.port {
            config.port(port);
        }
        if let Some(user) = target.user.as_deref() {
            config.user(user);
        }
        if let Some(password) = target.password.as_deref() {
            config.password(password);
        }
        if let Some(database) = target.database.as_deref() {
            config.dbname(database);
        }

        let (client, connection) = runtime
            .block_on(config.connect(NoTls))
            .map_err(native_error)?;

        // Driven whenever the runtime blocks on a client call
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: "sqladapter::postgres", "PostgreSQL connection error: {}", e);
            }
        });

        Ok(Box::new(TokioPostgresConnection {
            runtime,
            client: Some(client),
            statements: HashMap::new(),
            next_statement: 1,
        }))
    }
}

struct TokioPostgresConnection {
    runtime: Runtime,
    client: Option<Client>,
    statements: HashMap<PreparedId, tokio_postgres::Statement>,
    next_statement: u64,
}

impl TokioPostgresConnection {
    fn client(&self) -> NativeResult<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| NativeError::new("connection is closed"))
    }

    fn batch(&self, sql: &str) -> NativeResult<()> {
        let client = self.client()?;
        self.runtime
            .block_on(client.batch_execute(sql))
            .map_err(native_error)
    }

    fn run(
        &self,
        statement: &tokio_postgres::Statement,
        args: &[BoundParameter],
    ) -> NativeResult<QueryOutcome> {
        let client = self.client()?;
        if args.len() != statement.params().len() {
            return Err(NativeError::new(format!(
                "statement expects {} parameters, got {}",
                statement.params().len(),
                args.len()
            )));
        }

        let converted = args
            .iter()
            .zip(statement.params())
            .map(|(arg, type_)| bind_value(&arg.value, type_))
            .collect::<NativeResult<Vec<_>>>()?;
        let param_refs: Vec<&(dyn ToSql + Sync)> = converted
            .iter()
            .map(|b| b.as_ref() as &(dyn ToSql + Sync))
            .collect();

        if statement.columns().is_empty() {
            let affected = self
                .runtime
                .block_on(client.execute(statement, &param_refs))
                .map_err(native_error)?;
            return Ok(QueryOutcome::Affected(affected));
        }

        let rows = self
            .runtime
            .block_on(client.query(statement, &param_refs))
            .map_err(native_error)?;
        Ok(QueryOutcome::Rows(Box::new(PostgresCursor::new(statement, rows))))
    }
}

impl NativeConnection for TokioPostgresConnection {
    /// Runs `sql` as-is. With several statements the outcome is that of
    /// the last one.
    fn query(&mut self, sql: &str) -> NativeResult<QueryOutcome> {
        let client = self.client()?;
        let messages = self
            .runtime
            .block_on(client.simple_query(sql))
            .map_err(native_error)?;
        Ok(simple_outcome(messages))
    }

    fn prepare(&mut self, sql: &str) -> NativeResult<PreparedId> {
        let client = self.client()?;
        let statement = self
            .runtime
            .block_on(client.prepare(sql))
            .map_err(native_error)?;

        let id = PreparedId(self.next_statement);
        self.next_statement += 1;
        self.statements.insert(id, statement);
        Ok(id)
    }

    fn execute_prepared(
        &mut self,
        statement: PreparedId,
        args: &[BoundParameter],
    ) -> NativeResult<QueryOutcome> {
        let prepared = self
            .statements
            .get(&statement)
            .ok_or_else(|| NativeError::new(format!("unknown statement handle {}", statement.0)))?;
        self.run(prepared, args)
    }

    fn release_prepared(&mut self, statement: PreparedId) {
        self.statements.remove(&statement);
    }

    fn begin(&mut self) -> NativeResult<()> {
        self.batch("BEGIN")
    }

    fn commit(&mut self) -> NativeResult<()> {
        self.batch("COMMIT")
    }

    fn rollback(&mut self) -> NativeResult<()> {
        self.batch("ROLLBACK")
    }

    fn server_info(&mut self) -> NativeResult<ConnectionInfo> {
        let client = self.client()?;
        let row = self
            .runtime
            .block_on(client.query_one("SELECT current_database(), version()", &[]))
            .map_err(native_error)?;
        Ok(ConnectionInfo {
            database_name: row.try_get(0).map_err(native_error)?,
            server_version: row.try_get(1).map_err(native_error)?,
        })
    }

    fn close(&mut self) {
        self.statements.clear();
        // Dropping the client ends the connection task
        self.client = None;
    }
}

struct PostgresCursor {
    columns: Vec<String>,
    rows: std::vec::IntoIter<tokio_postgres::Row>,
    total: u64,
}

impl PostgresCursor {
    fn new(statement: &tokio_postgres::Statement, rows: Vec<tokio_postgres::Row>) -> Self {
        Self {
            columns: statement
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            total: rows.len() as u64,
            rows: rows.into_iter(),
        }
    }
}

impl NativeCursor for PostgresCursor {
    fn fetch_assoc(&mut self) -> NativeResult<Option<Row>> {
        let Some(row) = self.rows.next() else {
            return Ok(None);
        };
        let values = (0..self.columns.len())
            .map(|i| {
                row.try_get::<_, WireValue>(i)
                    .map(|v| v.0)
                    .map_err(native_error)
            })
            .collect::<NativeResult<Vec<_>>>()?;
        Ok(Some(Row::new(&self.columns, values)))
    }

    fn field_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows the query returned.
    fn affected_rows(&self) -> u64 {
        self.total
    }
}

/// Rows of the last statement of a simple query, already as text.
struct SimpleQueryCursor {
    columns: Vec<String>,
    rows: std::vec::IntoIter<Vec<SqlValue>>,
    total: u64,
}

impl NativeCursor for SimpleQueryCursor {
    fn fetch_assoc(&mut self) -> NativeResult<Option<Row>> {
        Ok(self.rows.next().map(|values| Row::new(&self.columns, values)))
    }

    fn field_count(&self) -> usize {
        self.columns.len()
    }

    fn affected_rows(&self) -> u64 {
        self.total
    }
}

/// Keep the result of the last completed statement. Statements that sent a
/// row description produce rows, the rest an affected count.
fn simple_outcome(messages: Vec<SimpleQueryMessage>) -> QueryOutcome {
    let mut columns: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<SqlValue>> = Vec::new();
    let mut outcome = QueryOutcome::Affected(0);

    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(description) => {
                columns = Some(description.iter().map(|c| c.name().to_string()).collect());
                rows.clear();
            }
            SimpleQueryMessage::Row(row) => {
                let values: Vec<SqlValue> = (0..row.len())
                    .map(|i| SqlValue::from(row.get(i).map(str::to_string)))
                    .collect();
                rows.push(values);
            }
            SimpleQueryMessage::CommandComplete(count) => {
                outcome = match columns.take() {
                    Some(columns) => QueryOutcome::Rows(Box::new(SimpleQueryCursor {
                        columns,
                        rows: std::mem::take(&mut rows).into_iter(),
                        total: count,
                    })),
                    None => QueryOutcome::Affected(count),
                };
            }
            _ => {}
        }
    }
    outcome
}

fn native_error(err: tokio_postgres::Error) -> NativeError {
    match err.as_db_error() {
        Some(db) => NativeError::with_code(db.code().code(), db.message()),
        None => NativeError::new(err.to_string()),
    }
}

/// Convert a parameter to a value the server accepts for `type_`.
fn bind_value(value: &SqlValue, type_: &Type) -> NativeResult<Box<dyn ToSql + Sync + Send>> {
    let mismatch = || {
        NativeError::new(format!(
            "cannot bind {:?} to a parameter of type {}",
            value, type_
        ))
    };

    let bound: Box<dyn ToSql + Sync + Send> = if *type_ == Type::BOOL {
        Box::new(match value {
            SqlValue::Null => None,
            SqlValue::Bool(b) => Some(*b),
            SqlValue::Text(s) => Some(match s.trim().to_ascii_lowercase().as_str() {
                "t" | "true" | "1" | "y" | "yes" | "on" => true,
                "f" | "false" | "0" | "n" | "no" | "off" => false,
                _ => return Err(mismatch()),
            }),
            other => Some(other.as_i64().ok_or_else(mismatch)? != 0),
        })
    } else if *type_ == Type::INT2 {
        Box::new(integer(value, mismatch)?.map(i16::try_from).transpose().map_err(|_| mismatch())?)
    } else if *type_ == Type::INT4 {
        Box::new(integer(value, mismatch)?.map(i32::try_from).transpose().map_err(|_| mismatch())?)
    } else if *type_ == Type::INT8 {
        Box::new(integer(value, mismatch)?)
    } else if *type_ == Type::FLOAT4 {
        Box::new(float(value, mismatch)?.map(|f| f as f32))
    } else if *type_ == Type::FLOAT8 {
        Box::new(float(value, mismatch)?)
    } else {
        // Parsed by the server according to the declared type
        Box::new(TextParam(text(value)))
    };
    Ok(bound)
}

fn integer(value: &SqlValue, mismatch: impl Fn() -> NativeError) -> NativeResult<Option<i64>> {
    match value {
        SqlValue::Null => Ok(None),
        SqlValue::Bool(b) => Ok(Some(i64::from(*b))),
        SqlValue::Text(s) => s.trim().parse().map(Some).map_err(|_| mismatch()),
        other => other.as_i64().map(Some).ok_or_else(mismatch),
    }
}

fn float(value: &SqlValue, mismatch: impl Fn() -> NativeError) -> NativeResult<Option<f64>> {
    match value {
        SqlValue::Null => Ok(None),
        SqlValue::Double(f) => Ok(Some(*f)),
        SqlValue::Text(s) => s.trim().parse().map(Some).map_err(|_| mismatch()),
        other => other.as_i64().map(|i| Some(i as f64)).ok_or_else(mismatch),
    }
}

fn text(value: &SqlValue) -> Option<String> {
    match value {
        SqlValue::Null => None,
        SqlValue::Text(s) => Some(s.clone()),
        SqlValue::Int32(i) => Some(i.to_string()),
        SqlValue::Int64(i) => Some(i.to_string()),
        SqlValue::Double(f) => Some(f.to_string()),
        SqlValue::Bool(b) => Some(b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_postgres::types::Format;

    #[test]
    fn test_bind_integer_from_text() {
        assert!(bind_value(&SqlValue::from("42"), &Type::INT4).is_ok());
        assert!(bind_value(&SqlValue::from("forty-two"), &Type::INT4).is_err());
    }

    #[test]
    fn test_bind_out_of_range_integer() {
        assert!(bind_value(&SqlValue::Int64(i64::from(i32::MAX) + 1), &Type::INT4).is_err());
        assert!(bind_value(&SqlValue::Int64(7), &Type::INT2).is_ok());
    }

    #[test]
    fn test_bind_null_to_any_type() {
        for type_ in [Type::BOOL, Type::INT4, Type::FLOAT8, Type::TEXT] {
            assert!(bind_value(&SqlValue::Null, &type_).is_ok());
        }
    }

    #[test]
    fn test_bind_unmapped_types_as_text() {
        for type_ in [Type::DATE, Type::NUMERIC, Type::TIMESTAMPTZ, Type::UUID] {
            let bound = bind_value(&SqlValue::from("2024-01-01"), &type_).unwrap();
            assert!(matches!(bound.encode_format(&type_), Format::Text));
        }
    }

    #[test]
    fn test_bind_bool_from_text() {
        assert!(bind_value(&SqlValue::from("true"), &Type::BOOL).is_ok());
        assert!(bind_value(&SqlValue::from("f"), &Type::BOOL).is_ok());
        assert!(bind_value(&SqlValue::from("maybe"), &Type::BOOL).is_err());
    }

    #[test]
    fn test_simple_outcome_keeps_last_statement() {
        let outcome = simple_outcome(vec![
            SimpleQueryMessage::CommandComplete(0),
            SimpleQueryMessage::CommandComplete(3),
        ]);
        assert!(matches!(outcome, QueryOutcome::Affected(3)));
        assert!(matches!(simple_outcome(Vec::new()), QueryOutcome::Affected(0)));
    }

    #[test]
    fn test_text_rendering() {
        assert_eq!(text(&SqlValue::Int32(42)), Some("42".to_string()));
        assert_eq!(text(&SqlValue::Null), None);
    }
}
