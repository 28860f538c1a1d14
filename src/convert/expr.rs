//! Expression, predicate and sub-query conversion.

use crate::error::{QueryError, QueryResult};
use crate::hql::ast::{NullPrecedence, SortDirection};
use crate::metamodel::SqlType;
use crate::query::parameter::Value;
use crate::sql::{
    JdbcParameter, QuerySpec, SortSpecification, SqlDialect, SqlExpr, SqlLiteral,
};
use crate::sqm::{
    EntitySource, ExpressableType, JunctionKind, SqmExpression, SqmPredicate, SqmQuerySpec,
    SqmSortSpecification,
};

use super::clause::Clause;
use super::{LiteralRendering, SqmConverter};

impl SqmConverter<'_> {
    // =========================================================================
    // Clauses
    // =========================================================================

    pub(super) fn clause_predicate(
        &mut self,
        clause: Clause,
        predicate: Option<&SqmPredicate>,
    ) -> QueryResult<Option<SqlExpr>> {
        let Some(predicate) = predicate else {
            return Ok(None);
        };
        self.clauses.push(clause);
        let converted = self.predicate(predicate);
        self.clauses.pop();
        converted.map(Some)
    }

    /// Where, group by and having of one query spec.
    #[allow(clippy::type_complexity)]
    pub(super) fn filter_clauses(
        &mut self,
        where_clause: Option<&SqmPredicate>,
        restrictions: Vec<SqlExpr>,
        group_by: &[SqmExpression],
        having: Option<&SqmPredicate>,
    ) -> QueryResult<(Option<SqlExpr>, Vec<SqlExpr>, Option<SqlExpr>)> {
        let where_clause = self.clause_predicate(Clause::Where, where_clause)?;
        let where_clause =
            SqlExpr::and_all(where_clause.into_iter().chain(restrictions).collect());

        self.clauses.push(Clause::GroupBy);
        let grouped: QueryResult<Vec<SqlExpr>> =
            group_by.iter().map(|e| self.expression(e)).collect();
        self.clauses.pop();

        let having = self.clause_predicate(Clause::Having, having)?;
        Ok((where_clause, grouped?, having))
    }

    pub(super) fn sort_specification(
        &mut self,
        out: &mut Vec<SortSpecification>,
        sort: &SqmSortSpecification,
    ) -> QueryResult<()> {
        let expr = self.expression(&sort.expression)?;
        match sort.nulls {
            Some(nulls) if !self.options.dialect.supports_nulls_ordering() => {
                // Rank nulls with a leading case expression.
                let (null_rank, value_rank) = match nulls {
                    NullPrecedence::First => (0, 1),
                    NullPrecedence::Last => (1, 0),
                };
                out.push(SortSpecification {
                    expr: SqlExpr::Case {
                        whens: vec![(
                            SqlExpr::IsNull {
                                expr: Box::new(expr.clone()),
                                negated: false,
                            },
                            SqlExpr::Literal(SqlLiteral::Integer(null_rank)),
                        )],
                        otherwise: Some(Box::new(SqlExpr::Literal(SqlLiteral::Integer(
                            value_rank,
                        )))),
                    },
                    direction: SortDirection::Ascending,
                    nulls: None,
                });
                out.push(SortSpecification {
                    expr,
                    direction: sort.direction,
                    nulls: None,
                });
            }
            nulls => out.push(SortSpecification {
                expr,
                direction: sort.direction,
                nulls,
            }),
        }
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub(super) fn expression(&mut self, expr: &SqmExpression) -> QueryResult<SqlExpr> {
        match expr {
            SqmExpression::BasicPath(path) => {
                let qualifier = self.registry.qualifier(&path.from)?;
                Ok(SqlExpr::column(qualifier.as_deref(), path.column.as_str()))
            }
            SqmExpression::EntityPath(path) => match &path.source {
                EntitySource::FromElement(from) => {
                    let column = self.identifier_column(&path.entity)?;
                    let qualifier = self.registry.qualifier(from)?;
                    Ok(SqlExpr::column(qualifier.as_deref(), column))
                }
                EntitySource::ForeignKey { from, column } => {
                    let qualifier = self.registry.qualifier(from)?;
                    Ok(SqlExpr::column(qualifier.as_deref(), column.as_str()))
                }
            },
            SqmExpression::EmbeddedPath(path) => Err(QueryError::unsupported(format!(
                "embedded value '{}' outside the select list",
                path.path
            ))),
            SqmExpression::Literal { value, ty } => Ok(self.literal(value, ty.as_ref())),
            SqmExpression::Parameter { name } => {
                let dialect = self.options.dialect;
                if self.in_top_select() && !dialect.supports_select_list_parameters() {
                    return Err(QueryError::unsupported(format!(
                        "parameter {} in the select list ({} does not accept parameter markers there)",
                        name, dialect
                    )));
                }
                let sql_type = self.parameter_types.get(name).copied().flatten();
                Ok(SqlExpr::Parameter(JdbcParameter::Query {
                    name: name.clone(),
                    sql_type,
                }))
            }
            SqmExpression::Binary { op, lhs, rhs, .. } => Ok(SqlExpr::Arithmetic {
                op: *op,
                lhs: Box::new(self.expression(lhs)?),
                rhs: Box::new(self.expression(rhs)?),
            }),
            SqmExpression::Negated(inner) => Ok(SqlExpr::Negate(Box::new(self.expression(inner)?))),
            SqmExpression::Function {
                name,
                distinct,
                args,
                ..
            } => {
                let name = self
                    .options
                    .dialect
                    .remap_function(name)
                    .map(str::to_string)
                    .unwrap_or_else(|| name.clone());
                let args = args
                    .iter()
                    .map(|a| self.expression(a))
                    .collect::<QueryResult<Vec<_>>>()?;
                Ok(SqlExpr::Function {
                    name,
                    distinct: *distinct,
                    args,
                })
            }
            SqmExpression::CountStar => Ok(SqlExpr::CountStar),
        }
    }

    fn literal(&self, value: &Value, ty: Option<&ExpressableType>) -> SqlExpr {
        let literal = sql_literal(value);
        if value.is_null() || self.clauses.current() == Some(Clause::Limit) {
            return SqlExpr::Literal(literal);
        }
        let inline = match self.options.literal_rendering {
            LiteralRendering::AsLiteral => true,
            LiteralRendering::AsParam => {
                self.in_top_select() && !self.options.dialect.supports_select_list_parameters()
            }
            LiteralRendering::AsParamOutsideSelect => self.in_top_select(),
        };
        if inline {
            return SqlExpr::Literal(literal);
        }
        let sql_type = ty
            .and_then(ExpressableType::bind_type)
            .map(|b| b.sql_type)
            .unwrap_or_else(|| default_sql_type(value));
        SqlExpr::Parameter(JdbcParameter::Literal {
            value: literal,
            sql_type,
        })
    }

    // =========================================================================
    // Predicates
    // =========================================================================

    pub(super) fn predicate(&mut self, predicate: &SqmPredicate) -> QueryResult<SqlExpr> {
        Ok(match predicate {
            SqmPredicate::Junction { kind, predicates } => {
                let items = predicates
                    .iter()
                    .map(|p| self.predicate(p))
                    .collect::<QueryResult<Vec<_>>>()?;
                match kind {
                    JunctionKind::And => SqlExpr::And(items),
                    JunctionKind::Or => SqlExpr::Or(items),
                }
            }
            SqmPredicate::Negated(inner) => SqlExpr::Not(Box::new(self.predicate(inner)?)),
            SqmPredicate::Comparison { op, lhs, rhs } => SqlExpr::Comparison {
                op: *op,
                lhs: Box::new(self.expression(lhs)?),
                rhs: Box::new(self.expression(rhs)?),
            },
            SqmPredicate::NullCheck { expr, negated } => SqlExpr::IsNull {
                expr: Box::new(self.expression(expr)?),
                negated: *negated,
            },
            SqmPredicate::Between {
                expr,
                low,
                high,
                negated,
            } => SqlExpr::Between {
                expr: Box::new(self.expression(expr)?),
                low: Box::new(self.expression(low)?),
                high: Box::new(self.expression(high)?),
                negated: *negated,
            },
            SqmPredicate::Like {
                expr,
                pattern,
                escape,
                negated,
            } => SqlExpr::Like {
                expr: Box::new(self.expression(expr)?),
                pattern: Box::new(self.expression(pattern)?),
                escape: escape
                    .as_ref()
                    .map(|e| self.expression(e).map(Box::new))
                    .transpose()?,
                negated: *negated,
            },
            SqmPredicate::InList {
                expr,
                list,
                negated,
            } => SqlExpr::InList {
                expr: Box::new(self.expression(expr)?),
                list: list
                    .iter()
                    .map(|e| self.expression(e))
                    .collect::<QueryResult<Vec<_>>>()?,
                negated: *negated,
            },
            SqmPredicate::InSubquery {
                expr,
                query,
                negated,
            } => SqlExpr::InSubquery {
                expr: Box::new(self.expression(expr)?),
                query: Box::new(self.subquery(query)?),
                negated: *negated,
            },
            SqmPredicate::Exists { query, negated } => SqlExpr::Exists {
                query: Box::new(self.subquery(query)?),
                negated: *negated,
            },
            SqmPredicate::BooleanExpression(expr) => SqlExpr::eq(
                self.expression(expr)?,
                SqlExpr::Literal(SqlLiteral::Boolean(true)),
            ),
        })
    }

    /// Convert a nested query spec in its own registry scope. Outer aliases
    /// stay visible for correlated references.
    fn subquery(&mut self, query: &SqmQuerySpec) -> QueryResult<QuerySpec> {
        self.registry.push_scope(false);
        self.depth += 1;
        let converted = self.subquery_spec(query);
        self.depth -= 1;
        let from = self.registry.pop_scope();
        let mut spec = converted?;
        spec.from = from;
        Ok(spec)
    }

    fn subquery_spec(&mut self, query: &SqmQuerySpec) -> QueryResult<QuerySpec> {
        let restrictions = self.from_clause(&query.from)?;

        self.clauses.push(Clause::Select);
        let select: QueryResult<Vec<SqlExpr>> = query
            .selections
            .iter()
            .map(|s| self.expression(&s.expression))
            .collect();
        self.clauses.pop();

        let (where_clause, group_by, having) = self.filter_clauses(
            query.where_clause.as_ref(),
            restrictions,
            &query.group_by,
            query.having.as_ref(),
        )?;
        Ok(QuerySpec {
            distinct: query.distinct,
            select: select?,
            from: Vec::new(),
            where_clause,
            group_by,
            having,
        })
    }
}

fn sql_literal(value: &Value) -> SqlLiteral {
    match value {
        Value::Null => SqlLiteral::Null,
        Value::Boolean(b) => SqlLiteral::Boolean(*b),
        Value::Integer(n) => SqlLiteral::Integer(*n),
        Value::Float(x) => SqlLiteral::Float(*x),
        Value::String(s) => SqlLiteral::String(s.clone()),
    }
}

fn default_sql_type(value: &Value) -> SqlType {
    match value {
        Value::Boolean(_) => SqlType::Boolean,
        Value::Integer(_) => SqlType::Integer,
        Value::Float(_) => SqlType::Double,
        Value::Null | Value::String(_) => SqlType::Varchar,
    }
}
