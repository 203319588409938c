use tracing::debug;

use crate::connection::Connection;
use crate::error::{AdapterError, Result};
use crate::profiler::Profiler;
use crate::result_set::ResultSet;
use crate::traits::PreparedId;
use crate::types::{ParameterContainer, Parameters};

/// A prepared query bound to a connection.
///
/// Prepared at most once, either explicitly with `prepare()` or on the
/// first `execute()`. The prepared handle is released when the statement
/// is dropped.
///
/// A statement borrows its connection exclusively, so only one statement
/// per connection can be alive at a time. A handle can outlive its
/// statement by taking it with [`Statement::take_resource`] and adopting it
/// later with [`Statement::set_resource`].
pub struct Statement<'c> {
    connection: &'c mut Connection,
    sql: String,
    parameter_container: Option<ParameterContainer>,
    resource: Option<PreparedId>,
    profiler: Option<Box<dyn Profiler>>,
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("parameter_container", &self.parameter_container)
            .field("resource", &self.resource)
            .field("profiled", &self.profiler.is_some())
            .finish_non_exhaustive()
    }
}

impl<'c> Statement<'c> {
    pub fn new(connection: &'c mut Connection, sql: impl Into<String>) -> Self {
        Self {
            connection,
            sql: sql.into(),
            parameter_container: None,
            resource: None,
            profiler: None,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn set_sql(&mut self, sql: impl Into<String>) -> &mut Self {
        self.sql = sql.into();
        self
    }

    pub fn parameter_container(&self) -> Option<&ParameterContainer> {
        self.parameter_container.as_ref()
    }

    pub fn set_parameter_container(&mut self, container: ParameterContainer) -> &mut Self {
        self.parameter_container = Some(container);
        self
    }

    pub fn resource(&self) -> Option<PreparedId> {
        self.resource
    }

    /// Adopt a handle prepared elsewhere on the same connection.
    pub fn set_resource(&mut self, resource: PreparedId) -> &mut Self {
        self.resource = Some(resource);
        self
    }

    /// Detach the prepared handle so it is not released on drop.
    pub fn take_resource(&mut self) -> Option<PreparedId> {
        self.resource.take()
    }

    /// Profiler for this statement's executions. Takes precedence over the
    /// connection's profiler.
    pub fn set_profiler(&mut self, profiler: Box<dyn Profiler>) -> &mut Self {
        self.profiler = Some(profiler);
        self
    }

    pub fn profiler(&self) -> Option<&dyn Profiler> {
        self.profiler.as_deref()
    }

    pub fn is_prepared(&self) -> bool {
        self.resource.is_some()
    }

    /// Prepare `sql`, or the statement's own SQL when `None` or empty.
    pub fn prepare(&mut self, sql: Option<&str>) -> Result<&mut Self> {
        if self.is_prepared() {
            return Err(AdapterError::Usage(
                "This statement has already been prepared".to_string(),
            ));
        }

        if let Some(sql) = sql.filter(|s| !s.is_empty()) {
            self.sql = sql.to_string();
        }

        debug!(target: "sqladapter::statement", sql = %self.sql, "prepare");
        let id = self
            .connection
            .native()?
            .prepare(&self.sql)
            .map_err(AdapterError::prepare)?;
        self.resource = Some(id);
        Ok(self)
    }

    /// Execute the statement, preparing it first if needed.
    ///
    /// Supplied values are written by position into the statement's
    /// parameter container. A supplied container is adopted only when the
    /// statement holds none; otherwise the held container wins.
    pub fn execute(&mut self, parameters: Option<Parameters>) -> Result<ResultSet> {
        if !self.is_prepared() {
            self.prepare(None)?;
        }
        self.merge_parameters(parameters);

        let id = self.resource.ok_or_else(|| {
            AdapterError::Usage("Statement has no prepared handle".to_string())
        })?;
        let args = self
            .parameter_container
            .as_ref()
            .map(ParameterContainer::bound_parameters)
            .unwrap_or_default();

        self.connection.connect()?;
        debug!(target: "sqladapter::statement", sql = %self.sql, args = args.len(), "execute");

        self.profile_start();
        let outcome = self.connection.native()?.execute_prepared(id, &args);
        self.profile_finish();

        let outcome = outcome.map_err(AdapterError::execution)?;
        self.connection.create_result(outcome)
    }

    fn profile_start(&mut self) {
        match self.profiler.as_mut() {
            Some(profiler) => profiler.profile_start(&self.sql, self.parameter_container.as_ref()),
            None => self
                .connection
                .profile_start(&self.sql, self.parameter_container.as_ref()),
        }
    }

    fn profile_finish(&mut self) {
        match self.profiler.as_mut() {
            Some(profiler) => profiler.profile_finish(),
            None => self.connection.profile_finish(),
        }
    }

    fn merge_parameters(&mut self, parameters: Option<Parameters>) {
        match parameters {
            Some(Parameters::Values(values)) => match self.parameter_container.as_mut() {
                Some(held) => {
                    held.set_from_values(values);
                }
                None => self.parameter_container = Some(ParameterContainer::from_positional(values)),
            },
            Some(Parameters::Container(container)) => {
                if self.parameter_container.is_none() {
                    self.parameter_container = Some(container);
                } else {
                    debug!(target: "sqladapter::statement", "statement already holds a parameter container; supplied container ignored");
                }
            }
            None => {}
        }
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        if let (Some(id), Some(resource)) = (self.resource.take(), self.connection.resource()) {
            resource.release_prepared(id);
        }
    }
}
