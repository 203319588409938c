//! Timing hooks around native query and execute calls.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::types::ParameterContainer;

/// Receives a start/finish pair around every native query or execute call.
pub trait Profiler: Send {
    fn profile_start(&mut self, sql: &str, parameters: Option<&ParameterContainer>);

    fn profile_finish(&mut self);
}

/// One completed native call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileEntry {
    pub sql: String,
    pub parameters: Option<ParameterContainer>,
    pub elapsed: Duration,
}

#[derive(Default)]
struct ProfilerState {
    pending: Option<(String, Option<ParameterContainer>, Instant)>,
    entries: Vec<ProfileEntry>,
}

/// Profiler that records every call in order.
///
/// Clones share the same log, so a caller can keep one handle and give
/// another to a connection.
///
/// # Example
/// ```
/// use sqladapter::profiler::{Profiler, QueryProfiler};
///
/// let profiler = QueryProfiler::new();
/// let mut handle = profiler.clone();
/// handle.profile_start("SELECT 1 FROM RDB$DATABASE", None);
/// handle.profile_finish();
/// assert_eq!(profiler.entries().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct QueryProfiler {
    state: Arc<Mutex<ProfilerState>>,
}

impl QueryProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// All completed entries, oldest first.
    pub fn entries(&self) -> Vec<ProfileEntry> {
        self.lock().entries.clone()
    }

    pub fn last_entry(&self) -> Option<ProfileEntry> {
        self.lock().entries.last().cloned()
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.pending = None;
    }

    fn lock(&self) -> MutexGuard<'_, ProfilerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Profiler for QueryProfiler {
    fn profile_start(&mut self, sql: &str, parameters: Option<&ParameterContainer>) {
        self.lock().pending = Some((sql.to_string(), parameters.cloned(), Instant::now()));
    }

    fn profile_finish(&mut self) {
        let mut state = self.lock();
        match state.pending.take() {
            Some((sql, parameters, started)) => state.entries.push(ProfileEntry {
                sql,
                parameters,
                elapsed: started.elapsed(),
            }),
            None => tracing::debug!(target: "sqladapter::profiler", "profile_finish without profile_start"),
        }
    }
}
