//! SQL generation module.
//!
//! - [`ast`] - database-centric SQL AST produced by the converter
//! - [`render`] - deterministic renderer producing SQL text and parameter slots
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations

pub mod ast;
pub mod dialect;
pub mod render;
pub mod token;

#[cfg(test)]
pub mod test_utils;

pub use ast::{
    ColumnReference, DeleteStatement, JdbcParameter, QuerySpec, SelectStatement,
    SortSpecification, SqlExpr, SqlJoinKind, SqlLiteral, SqlStatement, TableGroup, TableJoin,
    TableReference, UpdateStatement,
};
pub use dialect::{Dialect, SqlDialect};
pub use render::{ParameterExpansions, ParameterSlot, RenderedSql, SqlRenderer};
pub use token::{Token, TokenStream};
