use crate::error::{AdapterError, Result};
use crate::traits::{NativeCursor, QueryOutcome};
use crate::types::{Row, SqlValue};

/// What produced a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// A query with a fetchable row set.
    Rows,
    /// A mutating statement with no row set.
    Mutation,
}

/// Position of a result set in its forward-only lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Nothing fetched yet.
    Fresh,
    /// The lookahead holds a row.
    Iterating,
    /// The native cursor returned its end sentinel.
    Exhausted,
}

enum Source {
    Cursor(Box<dyn NativeCursor>),
    Mutation { affected_rows: u64 },
}

/// Forward-only, non-restartable result of a query or statement execution.
///
/// Holds a single-row lookahead: `current()` and `valid()` inspect it,
/// `advance()` replaces it with the next native row. Rewinding is only
/// allowed before the first forward move.
///
/// Also usable as an `Iterator` over `Result<Row>`.
pub struct ResultSet {
    source: Source,
    generated_value: Option<SqlValue>,
    position: u64,
    current: Option<Row>,
    state: CursorState,
    // Whether the iterator already handed out the lookahead row.
    yielded: bool,
}

impl std::fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSet")
            .field("kind", &self.kind())
            .field("state", &self.state)
            .field("position", &self.position)
            .field("generated_value", &self.generated_value)
            .finish_non_exhaustive()
    }
}

impl ResultSet {
    /// Wraps a native outcome. `generated_value` is the auto-generated key
    /// reported for the statement, if any.
    pub fn new(outcome: QueryOutcome, generated_value: Option<SqlValue>) -> Self {
        let source = match outcome {
            QueryOutcome::Rows(cursor) => Source::Cursor(cursor),
            QueryOutcome::Affected(affected_rows) => Source::Mutation { affected_rows },
        };
        Self {
            source,
            generated_value,
            position: 0,
            current: None,
            state: CursorState::Fresh,
            yielded: false,
        }
    }

    pub fn kind(&self) -> ResultKind {
        match self.source {
            Source::Cursor(_) => ResultKind::Rows,
            Source::Mutation { .. } => ResultKind::Mutation,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// No-op: rows are always streamed from the native cursor.
    pub fn buffer(&mut self) {}

    pub fn is_buffered(&self) -> bool {
        false
    }

    /// True when the result has columns to fetch.
    pub fn is_query_result(&self) -> bool {
        self.field_count() > 0
    }

    /// Rows affected by a mutating statement. Not meaningful for fetch results.
    pub fn affected_rows(&self) -> u64 {
        match &self.source {
            Source::Cursor(cursor) => cursor.affected_rows(),
            Source::Mutation { affected_rows } => *affected_rows,
        }
    }

    pub fn field_count(&self) -> usize {
        match &self.source {
            Source::Cursor(cursor) => cursor.field_count(),
            Source::Mutation { .. } => 0,
        }
    }

    pub fn generated_value(&self) -> Option<&SqlValue> {
        self.generated_value.as_ref()
    }

    /// The lookahead row, fetching it first if nothing has been fetched yet.
    pub fn current(&mut self) -> Result<Option<&Row>> {
        if self.state == CursorState::Fresh {
            self.fetch()?;
        }
        Ok(self.current.as_ref())
    }

    /// Fetches the next native row into the lookahead and moves the position forward.
    /// Once exhausted this does nothing.
    pub fn advance(&mut self) -> Result<Option<&Row>> {
        self.step()?;
        Ok(self.current.as_ref())
    }

    /// Starts iteration. Fails once the position has moved forward.
    pub fn rewind(&mut self) -> Result<()> {
        if self.position > 0 {
            return Err(AdapterError::Usage(
                "This result is a forward only result set, calling rewind() after moving forward is not supported"
                    .to_string(),
            ));
        }
        if self.state == CursorState::Fresh {
            self.fetch()?;
        }
        Ok(())
    }

    /// True while the lookahead holds a real row.
    pub fn valid(&self) -> bool {
        self.current.is_some()
    }

    /// Zero-based position of the lookahead row.
    pub fn key(&self) -> u64 {
        self.position
    }

    fn step(&mut self) -> Result<()> {
        if self.state == CursorState::Exhausted {
            return Ok(());
        }
        self.fetch()?;
        self.position += 1;
        Ok(())
    }

    fn fetch(&mut self) -> Result<()> {
        let row = match &mut self.source {
            Source::Cursor(cursor) => match cursor.fetch_assoc() {
                Ok(row) => row,
                Err(err) => {
                    self.current = None;
                    self.state = CursorState::Exhausted;
                    return Err(AdapterError::execution(err));
                }
            },
            Source::Mutation { .. } => None,
        };
        self.state = if row.is_some() {
            CursorState::Iterating
        } else {
            CursorState::Exhausted
        };
        if self.state == CursorState::Exhausted {
            tracing::debug!(target: "sqladapter::result", position = self.position, "result set exhausted");
        }
        self.current = row;
        self.yielded = false;
        Ok(())
    }
}

impl Iterator for ResultSet {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let moved = match self.state {
            CursorState::Fresh => self.fetch(),
            CursorState::Iterating if self.yielded => self.step(),
            _ => Ok(()),
        };
        if let Err(err) = moved {
            return Some(Err(err));
        }
        let row = self.current.as_ref()?.clone();
        self.yielded = true;
        Some(Ok(row))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::error::{NativeError, NativeResult};

    // Cursor over fixed rows, optionally failing on a given fetch
    struct VecCursor {
        columns: Vec<String>,
        rows: VecDeque<Vec<SqlValue>>,
        fail_on_fetch: Option<usize>,
        fetches: usize,
    }

    impl VecCursor {
        fn ids(n: i32) -> Box<Self> {
            Box::new(Self {
                columns: vec!["ID".to_string()],
                rows: (0..n).map(|i| vec![SqlValue::Int32(i)]).collect(),
                fail_on_fetch: None,
                fetches: 0,
            })
        }
    }

    impl NativeCursor for VecCursor {
        fn fetch_assoc(&mut self) -> NativeResult<Option<Row>> {
            self.fetches += 1;
            if self.fail_on_fetch == Some(self.fetches) {
                return Err(NativeError::with_code("-902", "connection lost"));
            }
            Ok(self.rows.pop_front().map(|v| Row::new(&self.columns, v)))
        }

        fn field_count(&self) -> usize {
            self.columns.len()
        }
    }

    fn rows(n: i32) -> ResultSet {
        ResultSet::new(QueryOutcome::Rows(VecCursor::ids(n)), None)
    }

    fn id(row: Option<&Row>) -> Option<i64> {
        row.and_then(|r| r.get("ID").ok()).and_then(SqlValue::as_i64)
    }

    #[test]
    fn test_keys_run_from_zero_until_exhausted() {
        let mut result = rows(3);
        result.rewind().unwrap();
        let mut keys = Vec::new();
        while result.valid() {
            keys.push(result.key());
            result.advance().unwrap();
        }
        assert_eq!(keys, vec![0, 1, 2]);
        assert_eq!(result.state(), CursorState::Exhausted);
    }

    #[test]
    fn test_current_does_not_advance() {
        let mut result = rows(2);
        assert_eq!(result.state(), CursorState::Fresh);
        assert_eq!(id(result.current().unwrap()), Some(0));
        assert_eq!(id(result.current().unwrap()), Some(0));
        assert_eq!(result.key(), 0);
        assert_eq!(id(result.advance().unwrap()), Some(1));
        assert_eq!(result.key(), 1);
    }

    #[test]
    fn test_rewind_first_fetches_row_zero() {
        let mut result = rows(2);
        result.rewind().unwrap();
        assert!(result.valid());
        assert_eq!(result.key(), 0);
        assert_eq!(id(result.current().unwrap()), Some(0));
    }

    #[test]
    fn test_rewind_after_current_keeps_row_zero() {
        let mut result = rows(2);
        result.current().unwrap();
        result.rewind().unwrap();
        assert_eq!(id(result.current().unwrap()), Some(0));
    }

    #[test]
    fn test_rewind_after_advance_is_usage_error() {
        let mut result = rows(3);
        result.rewind().unwrap();
        result.advance().unwrap();
        match result.rewind().unwrap_err() {
            AdapterError::Usage(message) => assert!(message.contains("forward only")),
            other => panic!("Expected Usage error, got {:?}", other),
        }
        assert_eq!(id(result.current().unwrap()), Some(1));
    }

    #[test]
    fn test_valid_false_only_at_sentinel() {
        let mut result = rows(1);
        result.rewind().unwrap();
        assert!(result.valid());
        result.advance().unwrap();
        assert!(!result.valid());
        result.advance().unwrap();
        assert_eq!(result.key(), 1);
    }

    #[test]
    fn test_empty_result() {
        let mut result = rows(0);
        assert!(result.current().unwrap().is_none());
        assert!(!result.valid());
        assert_eq!(result.state(), CursorState::Exhausted);
        assert_eq!(result.field_count(), 1);
        assert!(result.is_query_result());
    }

    #[test]
    fn test_iterator_yields_each_row_once() {
        let ids: Vec<i64> = rows(3)
            .map(|r| r.unwrap().get("ID").unwrap().as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_iterator_after_current_starts_at_lookahead() {
        let mut result = rows(2);
        result.current().unwrap();
        assert_eq!(result.by_ref().count(), 2);
        assert_eq!(result.key(), 2);
    }

    #[test]
    fn test_fetch_failure_is_execution_error() {
        let mut cursor = VecCursor::ids(3);
        cursor.fail_on_fetch = Some(2);
        let mut result = ResultSet::new(QueryOutcome::Rows(cursor), None);
        result.rewind().unwrap();
        let err = result.advance().unwrap_err();
        assert_eq!(err.native_code(), Some("-902"));
        assert!(!result.valid());
        assert_eq!(result.state(), CursorState::Exhausted);
    }

    #[test]
    fn test_mutation_result() {
        let mut result = ResultSet::new(QueryOutcome::Affected(4), Some(SqlValue::Int64(17)));
        assert_eq!(result.kind(), ResultKind::Mutation);
        assert_eq!(result.affected_rows(), 4);
        assert_eq!(result.field_count(), 0);
        assert!(!result.is_query_result());
        assert_eq!(result.generated_value(), Some(&SqlValue::Int64(17)));
        assert!(result.next().is_none());
    }

    #[test]
    fn test_never_buffered() {
        let mut result = rows(1);
        result.buffer();
        assert!(!result.is_buffered());
        assert_eq!(result.state(), CursorState::Fresh);
    }
}
