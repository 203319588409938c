use std::sync::Arc;

use crate::connection::Connection;
use crate::drivers::TokioPostgresClient;
use crate::error::Result;
use crate::profiler::Profiler;
use crate::result_set::ResultSet;
use crate::statement::Statement;
use crate::traits::{NativeClient, QueryOutcome};
use crate::types::ConnectionParameters;

/// Main entry point for sqladapter.
/// Holds one connection and hands out statements and results bound to it.
pub struct Driver {
    connection: Connection,
}

impl Driver {
    /// Create a driver over any native client. Nothing is opened until first use.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use sqladapter::drivers::InMemoryNativeClient;
    /// use sqladapter::types::ConnectionParameters;
    /// use sqladapter::Driver;
    ///
    /// let client = Arc::new(InMemoryNativeClient::new());
    /// let mut driver = Driver::new(client, ConnectionParameters::new().set("db", "employee"));
    /// assert!(!driver.connection().is_connected());
    /// ```
    pub fn new(client: Arc<dyn NativeClient>, parameters: ConnectionParameters) -> Self {
        Self {
            connection: Connection::new(client, parameters),
        }
    }

    /// Connect to a PostgreSQL server through tokio-postgres.
    ///
    /// # Example
    /// ```ignore
    /// let params = ConnectionParameters::new()
    ///     .set("host", "localhost")
    ///     .set("user", "postgres")
    ///     .set("dbname", "orders");
    /// let mut driver = Driver::postgres(params)?;
    /// ```
    pub fn postgres(parameters: ConnectionParameters) -> Result<Self> {
        let mut driver = Self::new(Arc::new(TokioPostgresClient::new()), parameters);
        driver.connection.connect()?;
        Ok(driver)
    }

    pub fn with_connection(connection: Connection) -> Self {
        Self { connection }
    }

    pub fn with_profiler(mut self, profiler: impl Profiler + 'static) -> Self {
        self.connection.set_profiler(Box::new(profiler));
        self
    }

    pub fn connection(&mut self) -> &mut Connection {
        &mut self.connection
    }

    pub fn into_connection(self) -> Connection {
        self.connection
    }

    /// Create an unprepared statement on this driver's connection.
    pub fn create_statement(&mut self, sql: impl Into<String>) -> Statement<'_> {
        self.connection.statement(sql)
    }

    /// Wrap a native outcome produced on this driver's connection.
    pub fn create_result(&mut self, outcome: QueryOutcome) -> Result<ResultSet> {
        self.connection.create_result(outcome)
    }
}
