//! Parameters, bindings, compiled plans and the execution boundary.

pub mod binding;
pub mod execution;
pub mod parameter;
pub mod plan;

pub use binding::{BindValue, QueryParameterBinding, QueryParameterBindings};
pub use execution::{
    ExecutionError, ExecutionRequest, JdbcBinding, JdbcExecutor, Row, RowSource, VecRowSource,
};
pub use parameter::{ParameterName, QueryParameter, Value};
pub use plan::QueryPlan;
