use crate::error::NativeResult;
use crate::types::{BoundParameter, Row, SqlValue};

/// Resolved settings for opening a native connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectTarget {
    pub host: Option<String>,
    /// Database name or path on the server.
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    pub socket: Option<String>,
}

impl ConnectTarget {
    /// Connection string in `host:database` form, or just the database when no host is set.
    pub fn dsn(&self) -> String {
        let database = self.database.as_deref().unwrap_or_default();
        match self.host.as_deref() {
            Some(host) => format!("{}:{}", host, database),
            None => database.to_string(),
        }
    }
}

/// Metadata reported by a live native connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionInfo {
    pub database_name: Option<String>,
    pub server_version: Option<String>,
}

/// Handle to a statement prepared on a native connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreparedId(pub u64);

/// What a native query or execute call produced.
pub enum QueryOutcome {
    /// A result set to fetch from.
    Rows(Box<dyn NativeCursor>),
    /// A statement without a result set, with its affected row count.
    Affected(u64),
}

impl std::fmt::Debug for QueryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryOutcome::Rows(cursor) => f
                .debug_struct("Rows")
                .field("field_count", &cursor.field_count())
                .finish_non_exhaustive(),
            QueryOutcome::Affected(n) => f.debug_tuple("Affected").field(n).finish(),
        }
    }
}

/// Entry point of a native client library.
/// Implementations open connections; everything else hangs off the returned handle.
pub trait NativeClient: Send + Sync {
    fn open(&self, target: &ConnectTarget) -> NativeResult<Box<dyn NativeConnection>>;
}

/// A single open native connection.
///
/// Calls block until the native library returns. A handle is used by
/// one caller at a time; there is no internal locking.
pub trait NativeConnection: Send {
    /// Run SQL immediately.
    fn query(&mut self, sql: &str) -> NativeResult<QueryOutcome>;

    fn prepare(&mut self, sql: &str) -> NativeResult<PreparedId>;

    /// Execute a prepared statement with positional arguments.
    fn execute_prepared(
        &mut self,
        statement: PreparedId,
        args: &[BoundParameter],
    ) -> NativeResult<QueryOutcome>;

    fn begin(&mut self) -> NativeResult<()>;

    fn commit(&mut self) -> NativeResult<()>;

    fn rollback(&mut self) -> NativeResult<()>;

    fn server_info(&mut self) -> NativeResult<ConnectionInfo>;

    /// Free a prepared statement handle.
    fn release_prepared(&mut self, _statement: PreparedId) {}

    /// Last auto-generated key on this connection, if the native library tracks one.
    fn last_generated_value(&mut self) -> NativeResult<Option<SqlValue>> {
        Ok(None)
    }

    /// Release the native handle. Called at most once.
    fn close(&mut self);
}

/// A native fetch cursor.
pub trait NativeCursor: Send {
    /// Next row as a column-name mapping; `None` once the set is exhausted.
    fn fetch_assoc(&mut self) -> NativeResult<Option<Row>>;

    fn field_count(&self) -> usize;

    /// Rows affected by the statement that produced this cursor.
    fn affected_rows(&self) -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dsn_with_host() {
        let target = ConnectTarget {
            host: Some("db1".to_string()),
            database: Some("/data/orders.fdb".to_string()),
            ..Default::default()
        };
        assert_eq!(target.dsn(), "db1:/data/orders.fdb");
    }

    #[test]
    fn test_dsn_without_host() {
        let target = ConnectTarget {
            database: Some("employee".to_string()),
            ..Default::default()
        };
        assert_eq!(target.dsn(), "employee");
    }
}
