//! # hqlc
//!
//! A query-language compiler that lowers HQL into dialect-specific SQL.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    HQL query text                        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [hql]
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Syntax tree                           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sqm] (resolved against the metamodel)
//! ┌─────────────────────────────────────────────────────────┐
//! │       Semantic query model (typed, paths resolved)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [convert]
//! ┌─────────────────────────────────────────────────────────┐
//! │        SQL AST + result shape + parameter list           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql::render]
//! ┌─────────────────────────────────────────────────────────┐
//! │          SQL text with `?` markers (QueryPlan)           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [query] bind, execute, [results] assemble
//! ```
//!
//! [`compile::QueryCompiler`] runs the whole pipeline and caches plans.

pub mod cache;
pub mod compile;
pub mod config;
pub mod convert;
pub mod error;
pub mod hql;
pub mod metamodel;
pub mod query;
pub mod results;
pub mod sql;
pub mod sqm;

use error::QueryResult;
use metamodel::MetamodelAccess;

/// Parse and resolve `text` into a semantic query model.
pub fn parse(text: &str, metamodel: &dyn MetamodelAccess) -> QueryResult<sqm::SqmStatement> {
    let statement = hql::HqlParser::new().parse(text)?;
    sqm::build(&statement, metamodel)
}

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::compile::{CompileOptions, QueryCompiler};
    pub use crate::config::Settings;
    pub use crate::convert::{ConversionOptions, LiteralRendering};
    pub use crate::error::{QueryError, QueryResult, QuerySyntaxError};
    pub use crate::metamodel::{Metamodel, MetamodelAccess};
    pub use crate::query::{
        ExecutionError, ExecutionRequest, JdbcExecutor, QueryParameterBindings, QueryPlan,
        RowSource, Value,
    };
    pub use crate::results::{EntityInstance, FieldValue, ResultRow, ResultValue};
    pub use crate::sql::{Dialect, SqlDialect};
}

// Also export at crate root for convenience
pub use compile::{CompileOptions, QueryCompiler};
pub use error::{QueryError, QuerySyntaxError};
pub use sql::Dialect;
