use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{AdapterError, Result};
use crate::profiler::Profiler;
use crate::result_set::ResultSet;
use crate::statement::Statement;
use crate::traits::{NativeClient, NativeConnection, QueryOutcome};
use crate::types::{ConnectionParameters, ParameterContainer, SqlValue};

/// Owns one native connection handle and its transaction flag.
///
/// The handle is opened lazily by `connect()` (or by any call that needs it)
/// and released by `disconnect()` or on drop.
pub struct Connection {
    client: Arc<dyn NativeClient>,
    parameters: ConnectionParameters,
    resource: Option<Box<dyn NativeConnection>>,
    in_transaction: bool,
    profiler: Option<Box<dyn Profiler>>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("connected", &self.is_connected())
            .field("in_transaction", &self.in_transaction)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Create a disconnected connection for the given parameters.
    pub fn new(client: Arc<dyn NativeClient>, parameters: ConnectionParameters) -> Self {
        Self {
            client,
            parameters,
            resource: None,
            in_transaction: false,
            profiler: None,
        }
    }

    /// Wrap a native handle that is already open.
    pub fn from_resource(client: Arc<dyn NativeClient>, resource: Box<dyn NativeConnection>) -> Self {
        let mut connection = Self::new(client, ConnectionParameters::new());
        connection.resource = Some(resource);
        connection
    }

    /// Replace the native handle, closing the previous one if it was live.
    pub fn set_resource(&mut self, resource: Box<dyn NativeConnection>) -> &mut Self {
        self.disconnect();
        self.resource = Some(resource);
        self
    }

    pub fn resource(&mut self) -> Option<&mut Box<dyn NativeConnection>> {
        self.resource.as_mut()
    }

    pub fn parameters(&self) -> &ConnectionParameters {
        &self.parameters
    }

    /// Replace the connection parameters. Not allowed while connected.
    pub fn set_parameters(&mut self, parameters: ConnectionParameters) -> Result<()> {
        if self.is_connected() {
            return Err(AdapterError::Usage(
                "Connection parameters cannot be changed while connected".to_string(),
            ));
        }
        self.parameters = parameters;
        Ok(())
    }

    pub fn set_profiler(&mut self, profiler: Box<dyn Profiler>) -> &mut Self {
        self.profiler = Some(profiler);
        self
    }

    pub fn profiler(&self) -> Option<&dyn Profiler> {
        self.profiler.as_deref()
    }

    pub fn with_profiler(mut self, profiler: impl Profiler + 'static) -> Self {
        self.profiler = Some(Box::new(profiler));
        self
    }

    /// Open the native connection unless one is already held.
    pub fn connect(&mut self) -> Result<()> {
        if self.resource.is_some() {
            return Ok(());
        }

        let target = self.parameters.target()?;
        let dsn = target.dsn();
        debug!(target: "sqladapter::connection", dsn = %dsn, user = ?target.user, "opening native connection");

        let resource = self.client.open(&target).map_err(|e| {
            AdapterError::Connection(format!("Unable to connect to database '{}': {}", dsn, e.message))
        })?;
        self.resource = Some(resource);

        info!(target: "sqladapter::connection", dsn = %dsn, "connected");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.resource.is_some()
    }

    /// Close the native handle if one is held. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if let Some(mut resource) = self.resource.take() {
            if self.in_transaction {
                warn!(target: "sqladapter::connection", "closing connection with an open transaction");
            }
            resource.close();
            info!(target: "sqladapter::connection", "disconnected");
        }
        self.in_transaction = false;
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn begin_transaction(&mut self) -> Result<()> {
        self.native()?.begin().map_err(AdapterError::query)?;
        self.in_transaction = true;
        debug!(target: "sqladapter::connection", "transaction started");
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.native()?.commit().map_err(AdapterError::query)?;
        self.in_transaction = false;
        debug!(target: "sqladapter::connection", "transaction committed");
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        let in_transaction = self.in_transaction;
        let resource = self.resource.as_mut().ok_or_else(|| {
            AdapterError::Usage("Must be connected before you can rollback".to_string())
        })?;
        if !in_transaction {
            return Err(AdapterError::Usage(
                "Must call begin_transaction() before you can rollback".to_string(),
            ));
        }

        resource.rollback().map_err(AdapterError::query)?;
        self.in_transaction = false;
        debug!(target: "sqladapter::connection", "transaction rolled back");
        Ok(())
    }

    /// Run SQL immediately, connecting first if needed.
    pub fn execute(&mut self, sql: &str) -> Result<ResultSet> {
        self.connect()?;
        debug!(target: "sqladapter::connection", sql, "execute");

        self.profile_start(sql, None);
        let outcome = self.native()?.query(sql);
        self.profile_finish();

        let outcome = outcome.map_err(AdapterError::query)?;
        self.create_result(outcome)
    }

    /// Create a statement bound to this connection.
    ///
    /// The statement holds the connection mutably until it is dropped, so a
    /// second statement cannot be created while the first is alive:
    ///
    /// ```compile_fail
    /// # use std::sync::Arc;
    /// # use sqladapter::drivers::InMemoryNativeClient;
    /// # use sqladapter::types::ConnectionParameters;
    /// # use sqladapter::Connection;
    /// let mut connection = Connection::new(
    ///     Arc::new(InMemoryNativeClient::new()),
    ///     ConnectionParameters::new().set("database", "orders"),
    /// );
    /// let mut insert = connection.statement("INSERT INTO T(A) VALUES (?)");
    /// let mut select = connection.statement("SELECT A FROM T");
    /// insert.execute(None).unwrap();
    /// select.execute(None).unwrap();
    /// ```
    ///
    /// Keep a prepared handle across statements with
    /// [`Statement::take_resource`] and [`Statement::set_resource`].
    pub fn statement(&mut self, sql: impl Into<String>) -> Statement<'_> {
        Statement::new(self, sql)
    }

    /// Wrap a native outcome into a result set.
    /// Mutations carry the connection's last generated value.
    /// A failed generated-value lookup leaves the value unset rather than
    /// discarding the completed mutation.
    pub fn create_result(&mut self, outcome: QueryOutcome) -> Result<ResultSet> {
        let generated_value = match outcome {
            QueryOutcome::Affected(_) => match self.last_generated_value() {
                Ok(value) => value,
                Err(e) => {
                    warn!(target: "sqladapter::connection", error = %e, "generated value lookup failed");
                    None
                }
            },
            QueryOutcome::Rows(_) => None,
        };
        Ok(ResultSet::new(outcome, generated_value))
    }

    /// Name of the database this connection is attached to, or empty if the
    /// server does not report one.
    pub fn current_schema(&mut self) -> Result<String> {
        let info = self.native()?.server_info().map_err(AdapterError::query)?;
        Ok(info.database_name.unwrap_or_default())
    }

    pub fn last_generated_value(&mut self) -> Result<Option<SqlValue>> {
        self.native()?
            .last_generated_value()
            .map_err(AdapterError::query)
    }

    /// The live native handle, connecting first if needed.
    pub(crate) fn native(&mut self) -> Result<&mut Box<dyn NativeConnection>> {
        self.connect()?;
        self.resource
            .as_mut()
            .ok_or_else(|| AdapterError::Connection("No native connection handle".to_string()))
    }

    pub(crate) fn profile_start(&mut self, sql: &str, parameters: Option<&ParameterContainer>) {
        if let Some(profiler) = self.profiler.as_mut() {
            profiler.profile_start(sql, parameters);
        }
    }

    pub(crate) fn profile_finish(&mut self) {
        if let Some(profiler) = self.profiler.as_mut() {
            profiler.profile_finish();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}
