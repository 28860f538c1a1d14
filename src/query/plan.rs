//! Compiled query plans.
//!
//! A [`QueryPlan`] is immutable and shareable: it holds the SQL AST, the SQL
//! rendered without multi-valued expansions, the declared parameters and the
//! result shape. Binding happens per execution.

use tracing::debug;

use crate::convert::Conversion;
use crate::error::{QueryError, QueryResult};
use crate::results::{ResultAssembler, ResultRow, ResultShape};
use crate::sql::{ParameterSlot, RenderedSql, SqlRenderer, SqlStatement};

use super::binding::QueryParameterBindings;
use super::execution::{ExecutionRequest, JdbcBinding, JdbcExecutor};
use super::parameter::QueryParameter;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    query: String,
    statement: SqlStatement,
    shape: ResultShape,
    parameters: Vec<QueryParameter>,
    renderer: SqlRenderer,
    rendered: RenderedSql,
}

impl QueryPlan {
    pub fn new(query: impl Into<String>, conversion: Conversion, renderer: SqlRenderer) -> Self {
        let rendered = renderer.render(&conversion.statement, &Default::default());
        Self {
            query: query.into(),
            statement: conversion.statement,
            shape: conversion.shape,
            parameters: conversion.parameters,
            renderer,
            rendered,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// SQL with one marker per parameter occurrence.
    pub fn sql(&self) -> &str {
        &self.rendered.sql
    }

    pub fn slots(&self) -> &[ParameterSlot] {
        &self.rendered.parameters
    }

    pub fn statement(&self) -> &SqlStatement {
        &self.statement
    }

    pub fn shape(&self) -> &ResultShape {
        &self.shape
    }

    pub fn parameters(&self) -> &[QueryParameter] {
        &self.parameters
    }

    pub fn is_select(&self) -> bool {
        matches!(self.statement, SqlStatement::Select(_))
    }

    /// Empty bindings for this plan's parameters.
    pub fn bindings(&self) -> QueryParameterBindings {
        QueryParameterBindings::new(&self.parameters)
    }

    /// Resolve every marker to a value. Fails before anything reaches the
    /// executor when a declared parameter has no value.
    pub fn prepare(&self, bindings: &QueryParameterBindings) -> QueryResult<ExecutionRequest> {
        for parameter in &self.parameters {
            if !bindings.is_bound(&parameter.name) {
                return Err(QueryError::UnboundParameter {
                    name: parameter.name.to_string(),
                });
            }
        }

        let expansions = bindings.expansions();
        let rendered = if expansions.is_empty() {
            self.rendered.clone()
        } else {
            self.renderer.render_expanded(&self.statement, &expansions)?
        };

        let mut jdbc = Vec::with_capacity(rendered.parameters.len());
        for (index, slot) in rendered.parameters.iter().enumerate() {
            let (value, sql_type) = match slot {
                ParameterSlot::Query {
                    name,
                    element,
                    sql_type,
                } => {
                    let binding =
                        bindings
                            .binding(name)
                            .ok_or_else(|| QueryError::UnboundParameter {
                                name: name.to_string(),
                            })?;
                    let value = binding.value_at(*element).ok_or_else(|| {
                        QueryError::InvalidBinding {
                            name: name.to_string(),
                            reason: "no value for an expanded marker".into(),
                        }
                    })?;
                    (
                        value.clone(),
                        binding.bind_type.map(|b| b.sql_type).or(*sql_type),
                    )
                }
                ParameterSlot::Literal { value, sql_type } => (value.clone(), Some(*sql_type)),
            };
            jdbc.push(JdbcBinding {
                position: index + 1,
                value,
                sql_type,
            });
        }
        debug!(markers = jdbc.len(), "prepared execution request");
        Ok(ExecutionRequest {
            sql: rendered.sql,
            bindings: jdbc,
        })
    }

    /// Bind, execute and assemble a select.
    pub fn list(
        &self,
        bindings: &QueryParameterBindings,
        executor: &mut dyn JdbcExecutor,
    ) -> QueryResult<Vec<ResultRow>> {
        if !self.is_select() {
            return Err(QueryError::semantic(
                "Only select statements produce results; use execute_update",
            ));
        }
        let request = self.prepare(bindings)?;
        let mut rows = executor.query(&request)?;
        Ok(ResultAssembler::new(&self.shape).assemble(rows.as_mut())?)
    }

    /// Bind and execute an update or delete, returning the affected row count.
    pub fn execute_update(
        &self,
        bindings: &QueryParameterBindings,
        executor: &mut dyn JdbcExecutor,
    ) -> QueryResult<u64> {
        if self.is_select() {
            return Err(QueryError::semantic(
                "execute_update needs an update or delete statement",
            ));
        }
        let request = self.prepare(bindings)?;
        Ok(executor.update(&request)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{convert, ConversionOptions};
    use crate::hql::HqlParser;
    use crate::metamodel::{company, SqlType};
    use crate::query::execution::{ExecutionError, RowSource, VecRowSource};
    use crate::query::parameter::Value;
    use crate::sql::Dialect;
    use crate::sqm;

    fn compile_plan(query: &str) -> QueryPlan {
        let model = company();
        let statement = HqlParser::new().parse(query).expect("parses");
        let sqm = sqm::build(&statement, &model).expect("builds");
        let options = ConversionOptions::new(Dialect::Ansi);
        let conversion = convert(&sqm, &model, &options).expect("converts");
        QueryPlan::new(query, conversion, SqlRenderer::new(Dialect::Ansi))
    }

    #[derive(Default)]
    struct Recording {
        requests: Vec<ExecutionRequest>,
        rows: Vec<Vec<Value>>,
    }

    impl JdbcExecutor for Recording {
        fn query(
            &mut self,
            request: &ExecutionRequest,
        ) -> Result<Box<dyn RowSource>, ExecutionError> {
            self.requests.push(request.clone());
            Ok(Box::new(VecRowSource::new(std::mem::take(&mut self.rows))))
        }

        fn update(&mut self, request: &ExecutionRequest) -> Result<u64, ExecutionError> {
            self.requests.push(request.clone());
            Ok(2)
        }
    }

    #[test]
    fn test_prepare_binds_in_marker_order() {
        let plan = compile_plan("select p.name from Person p where p.age > :min and p.name = :name");
        let mut bindings = plan.bindings();
        bindings.bind("name", "Ann").expect("binds");
        bindings.bind("min", 18).expect("binds");
        let request = plan.prepare(&bindings).expect("prepares");
        assert_eq!(
            request.sql,
            "select t0.name from Person t0 where t0.age > ? and t0.name = ?"
        );
        assert_eq!(request.bindings[0].value, Value::from(18));
        assert_eq!(request.bindings[0].sql_type, Some(SqlType::Integer));
        assert_eq!(request.bindings[1].position, 2);
        assert_eq!(request.bindings[1].value, Value::from("Ann"));
    }

    #[test]
    fn test_unbound_parameter_never_reaches_executor() {
        let plan = compile_plan("select p.name from Person p where p.name = :name");
        let mut executor = Recording::default();
        let err = plan
            .list(&plan.bindings(), &mut executor)
            .expect_err("unbound");
        assert_eq!(
            err,
            QueryError::UnboundParameter {
                name: ":name".into()
            }
        );
        assert!(executor.requests.is_empty());
    }

    #[test]
    fn test_multi_valued_expansion() {
        let plan = compile_plan("select p.name from Person p where p.id in (:ids)");
        let mut bindings = plan.bindings();
        bindings.bind_multi("ids", [1, 2, 3]).expect("binds");
        let request = plan.prepare(&bindings).expect("prepares");
        assert_eq!(
            request.sql,
            "select t0.name from Person t0 where t0.id in (?, ?, ?)"
        );
        let values: Vec<&Value> = request.bindings.iter().map(|b| &b.value).collect();
        assert_eq!(values, vec![&Value::from(1), &Value::from(2), &Value::from(3)]);
        assert_eq!(plan.sql(), "select t0.name from Person t0 where t0.id in (?)");
    }

    #[test]
    fn test_list_and_execute_update() {
        let plan = compile_plan("select p.name from Person p");
        let mut executor = Recording {
            rows: vec![vec![Value::from("Ann")], vec![Value::from("Bob")]],
            ..Recording::default()
        };
        let rows = plan.list(&plan.bindings(), &mut executor).expect("lists");
        assert_eq!(rows.len(), 2);
        assert!(plan.execute_update(&plan.bindings(), &mut executor).is_err());

        let update = compile_plan("delete from Person p where p.active = false");
        assert_eq!(
            update.execute_update(&update.bindings(), &mut executor),
            Ok(2)
        );
    }
}
