use crate::error::{AdapterError, Result};
use crate::types::SqlValue;

/// A single fetched row: column name to value, in result column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Creates a new Row from column names and values.
    /// Extra values beyond the column list are dropped.
    pub fn new(columns: &[String], values: Vec<SqlValue>) -> Self {
        let values: Vec<SqlValue> = values.into_iter().take(columns.len()).collect();
        Self {
            columns: columns[..values.len()].to_vec(),
            values,
        }
    }

    /// Gets a value by column name.
    pub fn get(&self, column: &str) -> Result<&SqlValue> {
        self.position(column)
            .map(|i| &self.values[i])
            .ok_or_else(|| AdapterError::ColumnNotFound(column.to_string()))
    }

    /// Gets a text value by column name; `None` when the value is not text.
    pub fn get_str(&self, column: &str) -> Result<Option<&str>> {
        self.get(column).map(SqlValue::as_str)
    }

    /// Returns all column names in this row.
    pub fn columns(&self) -> Vec<&str> {
        self.columns.iter().map(|s| s.as_str()).collect()
    }

    /// Iterates over (column, value) pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns
            .iter()
            .map(|c| c.as_str())
            .zip(self.values.iter())
    }

    /// Returns the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Row {
        let columns = vec!["ID".to_string(), "NAME".to_string()];
        Row::new(&columns, vec![SqlValue::Int32(1), SqlValue::from("John")])
    }

    #[test]
    fn test_row_get() {
        let row = sample();
        assert_eq!(row.get("ID").unwrap(), &SqlValue::Int32(1));
        assert_eq!(row.get_str("NAME").unwrap(), Some("John"));
        assert_eq!(row.get_str("ID").unwrap(), None);
    }

    #[test]
    fn test_row_get_missing_column() {
        let err = sample().get("MISSING").unwrap_err();
        match err {
            AdapterError::ColumnNotFound(name) => assert_eq!(name, "MISSING"),
            _ => panic!("Expected ColumnNotFound error"),
        }
    }

    #[test]
    fn test_row_preserves_column_order() {
        let row = sample();
        assert_eq!(row.columns(), vec!["ID", "NAME"]);
        let pairs: Vec<_> = row.iter().map(|(c, _)| c).collect();
        assert_eq!(pairs, vec!["ID", "NAME"]);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_row_with_fewer_values_than_columns() {
        let columns = vec!["A".to_string(), "B".to_string()];
        let row = Row::new(&columns, vec![SqlValue::Null]);
        assert_eq!(row.len(), 1);
        assert!(row.get("B").is_err());
    }
}
