//! The boundary to the external execution layer.
//!
//! The compiler never talks to a database. It hands an [`ExecutionRequest`]
//! to a [`JdbcExecutor`] and reads rows back through a [`RowSource`].

use std::collections::VecDeque;

use thiserror::Error;

use crate::metamodel::SqlType;

use super::parameter::Value;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Row has {width} columns, column {column} was requested")]
    MissingColumn { column: usize, width: usize },

    #[error("Unexpected {found} value in column {column} (expected {expected})")]
    UnexpectedValue {
        column: usize,
        expected: String,
        found: &'static str,
    },
}

/// One value bound to one `?` marker.
#[derive(Debug, Clone, PartialEq)]
pub struct JdbcBinding {
    /// 1-based marker position.
    pub position: usize,
    pub value: Value,
    /// `None` lets the driver infer the type.
    pub sql_type: Option<SqlType>,
}

/// SQL plus one binding per marker, in marker order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    pub sql: String,
    pub bindings: Vec<JdbcBinding>,
}

pub type Row = Vec<Value>;

/// Forward-only cursor over result rows.
pub trait RowSource {
    fn next_row(&mut self) -> Result<Option<Row>, ExecutionError>;
}

pub trait JdbcExecutor {
    fn query(&mut self, request: &ExecutionRequest) -> Result<Box<dyn RowSource>, ExecutionError>;

    /// Returns the affected row count.
    fn update(&mut self, request: &ExecutionRequest) -> Result<u64, ExecutionError>;
}

/// In-memory rows, for tests and for callers that already hold a result set.
#[derive(Debug, Clone, Default)]
pub struct VecRowSource {
    rows: VecDeque<Row>,
}

impl VecRowSource {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows: rows.into() }
    }
}

impl RowSource for VecRowSource {
    fn next_row(&mut self) -> Result<Option<Row>, ExecutionError> {
        Ok(self.rows.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_row_source_drains_in_order() {
        let mut rows = VecRowSource::new(vec![vec![Value::from(1)], vec![Value::from(2)]]);
        assert_eq!(rows.next_row(), Ok(Some(vec![Value::from(1)])));
        assert_eq!(rows.next_row(), Ok(Some(vec![Value::from(2)])));
        assert_eq!(rows.next_row(), Ok(None));
    }
}
