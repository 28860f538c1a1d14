//! Lowering of the HQL syntax tree into the semantic query model.
//!
//! The builder walks statements clause by clause in document order, resolving
//! paths through the [`PathResolver`], checking operand types and inferring the
//! anticipated type of every parameter from the context it appears in.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::{QueryError, QueryResult};
use crate::hql::ast::{self, Expr, Literal, ParameterRef};
use crate::hql::Spanned;
use crate::metamodel::{MetamodelAccess, TypeFamily, ValueType};
use crate::query::parameter::{ParameterName, QueryParameter, Value};

use super::path::NavigablePath;
use super::resolver::PathResolver;
use super::tree::*;
use super::types::{promote_numeric, ExpressableType};

/// Lower a parsed statement against the metamodel.
///
/// # Errors
///
/// Any resolution, typing or parameter error; the first one aborts the build.
pub fn build(
    statement: &ast::Statement,
    metamodel: &dyn MetamodelAccess,
) -> QueryResult<SqmStatement> {
    let mut builder = SqmBuilder::new(metamodel);
    let sqm = match statement {
        ast::Statement::Select(select) => SqmStatement::Select(builder.select_statement(select)?),
        ast::Statement::Update(update) => SqmStatement::Update(builder.update_statement(update)?),
        ast::Statement::Delete(delete) => SqmStatement::Delete(builder.delete_statement(delete)?),
    };
    debug!(parameters = sqm.parameters().len(), "built semantic query model");
    Ok(sqm)
}

/// Clause currently being lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    From,
    Select,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Assignment,
}

const AGGREGATES: &[&str] = &["count", "sum", "avg", "min", "max"];

struct SqmBuilder<'m> {
    resolver: PathResolver<'m>,
    parameters: ParameterCollector,
    clause: Clause,
    /// Number of query specs currently open; 1 is the top-level query.
    depth: usize,
}

impl<'m> SqmBuilder<'m> {
    fn new(metamodel: &'m dyn MetamodelAccess) -> Self {
        Self {
            resolver: PathResolver::new(metamodel),
            parameters: ParameterCollector::default(),
            clause: Clause::From,
            depth: 0,
        }
    }

    fn in_top_select(&self) -> bool {
        self.clause == Clause::Select && self.depth == 1
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn select_statement(&mut self, select: &ast::SelectStatement) -> QueryResult<SqmSelectStatement> {
        self.resolver.push_scope(false);
        self.depth += 1;
        let mut query = self.query_body(&select.query)?;

        self.clause = Clause::OrderBy;
        let mut order_by = Vec::with_capacity(select.order_by.len());
        for item in &select.order_by {
            let expression = match select_alias_reference(&query, &item.expr) {
                Some(aliased) if !self.resolver.has_alias(&aliased.0) => aliased.1,
                _ => self.expression(&item.expr)?,
            };
            order_by.push(SqmSortSpecification {
                expression,
                direction: item.direction,
                nulls: item.nulls,
            });
        }

        self.clause = Clause::Limit;
        let limit = select
            .limit
            .as_ref()
            .map(|e| self.row_count(e, "limit"))
            .transpose()?;
        let offset = select
            .offset
            .as_ref()
            .map(|e| self.row_count(e, "offset"))
            .transpose()?;

        self.validate_fetches(&query)?;
        if limit.is_some() || offset.is_some() {
            if let Some(join) = self
                .resolver
                .joins()
                .into_iter()
                .find(|j| j.fetch && j.association.is_plural())
            {
                warn!(
                    join = %join.path,
                    "collection fetch combined with limit/offset; pagination applies to joined rows"
                );
            }
        }

        self.depth -= 1;
        query.from = self.resolver.pop_scope();
        let parameters = std::mem::take(&mut self.parameters).finish()?;
        Ok(SqmSelectStatement {
            query,
            order_by,
            limit,
            offset,
            parameters,
        })
    }

    fn update_statement(&mut self, update: &ast::UpdateStatement) -> QueryResult<SqmUpdateStatement> {
        self.resolver.push_scope(true);
        self.depth += 1;
        self.clause = Clause::From;
        self.resolver.add_root(
            &update.entity,
            update.alias.as_ref().map(|a| a.value.as_str()),
        )?;

        self.clause = Clause::Assignment;
        let mut assignments = Vec::with_capacity(update.assignments.len());
        for assignment in &update.assignments {
            assignments.push(self.assignment(assignment)?);
        }

        self.clause = Clause::Where;
        let where_clause = self.optional_predicate(update.where_clause.as_ref(), "where clause")?;

        self.depth -= 1;
        let root = self.single_root()?;
        let parameters = std::mem::take(&mut self.parameters).finish()?;
        Ok(SqmUpdateStatement {
            root,
            assignments,
            where_clause,
            parameters,
        })
    }

    fn delete_statement(&mut self, delete: &ast::DeleteStatement) -> QueryResult<SqmDeleteStatement> {
        self.resolver.push_scope(true);
        self.depth += 1;
        self.clause = Clause::From;
        self.resolver.add_root(
            &delete.entity,
            delete.alias.as_ref().map(|a| a.value.as_str()),
        )?;

        self.clause = Clause::Where;
        let where_clause = self.optional_predicate(delete.where_clause.as_ref(), "where clause")?;

        self.depth -= 1;
        let root = self.single_root()?;
        let parameters = std::mem::take(&mut self.parameters).finish()?;
        Ok(SqmDeleteStatement {
            root,
            where_clause,
            parameters,
        })
    }

    fn single_root(&mut self) -> QueryResult<SqmRoot> {
        self.resolver
            .pop_scope()
            .roots
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::semantic("Statement has no target entity"))
    }

    fn assignment(&mut self, assignment: &ast::Assignment) -> QueryResult<SqmAssignment> {
        let target = self.resolver.resolve_path(&assignment.target, false)?;
        let (path, column, basic, target_type) = match &target {
            SqmExpression::BasicPath(p) => (
                p.path.clone(),
                p.column.clone(),
                p.basic,
                ExpressableType::Basic(p.basic),
            ),
            SqmExpression::EntityPath(SqmEntityPath {
                path,
                source: EntitySource::ForeignKey { column, .. },
                id,
                ..
            }) => (
                path.clone(),
                column.clone(),
                *id,
                target.expressable_type().unwrap_or(ExpressableType::Basic(*id)),
            ),
            _ => {
                return Err(QueryError::unsupported(format!(
                    "assignment to '{}'",
                    assignment.target.join(".")
                )));
            }
        };

        let value = self.expression(&assignment.value)?;
        match value.expressable_type() {
            Some(value_type) => {
                if !self.comparable(&target_type, &value_type, &value) {
                    return Err(QueryError::type_mismatch("assignment", target_type, value_type));
                }
            }
            None => self.infer(&value, &target_type)?,
        }
        Ok(SqmAssignment {
            path,
            column,
            basic,
            value,
        })
    }

    // =========================================================================
    // Query specs
    // =========================================================================

    /// Lower a query spec into the scope already pushed by the caller. The
    /// returned spec has an empty from clause; the caller pops the scope.
    fn query_body(&mut self, spec: &ast::QuerySpec) -> QueryResult<SqmQuerySpec> {
        self.clause = Clause::From;
        let mut conditions: Vec<(NavigablePath, &Spanned<Expr>)> = Vec::new();
        for root in &spec.from {
            self.resolver
                .add_root(&root.entity, root.alias.as_ref().map(|a| a.value.as_str()))?;
            for join in &root.joins {
                if join.fetch && self.depth > 1 {
                    return Err(QueryError::semantic(format!(
                        "Join fetch of '{}' is not allowed in a subquery",
                        join.path.join(".")
                    )));
                }
                let path = self.resolver.add_join(
                    &join.path,
                    join.kind,
                    join.fetch,
                    join.alias.as_ref().map(|a| a.value.as_str()),
                )?;
                if let Some(condition) = &join.condition {
                    conditions.push((path, condition));
                }
            }
        }
        for (path, condition) in conditions {
            let predicate = self.predicate(condition, "join condition")?;
            self.resolver.set_join_condition(&path, predicate)?;
        }

        self.clause = Clause::Select;
        let (distinct, selections) = match &spec.select {
            Some(select) => {
                let mut selections = Vec::with_capacity(select.items.len());
                for item in &select.items {
                    selections.push(SqmSelection {
                        expression: self.expression(&item.expr)?,
                        alias: item.alias.as_ref().map(|a| a.value.clone()),
                    });
                }
                (select.distinct, selections)
            }
            None => (false, self.implicit_selections()?),
        };

        self.clause = Clause::Where;
        let where_clause = self.optional_predicate(spec.where_clause.as_ref(), "where clause")?;

        self.clause = Clause::GroupBy;
        let mut group_by = Vec::with_capacity(spec.group_by.len());
        for expr in &spec.group_by {
            group_by.push(self.expression(expr)?);
        }

        self.clause = Clause::Having;
        let having = self.optional_predicate(spec.having.as_ref(), "having clause")?;

        Ok(SqmQuerySpec {
            distinct,
            selections,
            from: SqmFromClause::default(),
            where_clause,
            group_by,
            having,
        })
    }

    fn subquery(&mut self, spec: &ast::QuerySpec) -> QueryResult<SqmQuerySpec> {
        let clause = self.clause;
        self.resolver.push_scope(false);
        self.depth += 1;
        let built = self.query_body(spec);
        self.depth -= 1;
        let from = self.resolver.pop_scope();
        self.clause = clause;
        let mut query = built?;
        query.from = from;
        Ok(query)
    }

    /// `from Person p, Department d` without a select clause selects every root.
    fn implicit_selections(&self) -> QueryResult<Vec<SqmSelection>> {
        let metamodel = self.resolver.metamodel();
        self.resolver
            .roots()
            .into_iter()
            .map(|(path, entity)| {
                let id = metamodel
                    .identifier_of(&entity)
                    .and_then(|a| a.basic_type())
                    .ok_or_else(|| {
                        QueryError::semantic(format!("Entity '{}' has no identifier", entity))
                    })?;
                Ok(SqmSelection {
                    expression: SqmExpression::EntityPath(SqmEntityPath {
                        path: path.clone(),
                        entity,
                        id,
                        source: EntitySource::FromElement(path),
                    }),
                    alias: None,
                })
            })
            .collect()
    }

    /// Every fetch join's owner must itself be selected or fetched.
    fn validate_fetches(&self, query: &SqmQuerySpec) -> QueryResult<()> {
        let mut materialized: HashSet<NavigablePath> = query
            .selections
            .iter()
            .filter_map(|s| match &s.expression {
                SqmExpression::EntityPath(SqmEntityPath {
                    source: EntitySource::FromElement(path),
                    ..
                }) => Some(path.clone()),
                _ => None,
            })
            .collect();
        for join in self.resolver.joins() {
            if !join.fetch {
                continue;
            }
            if !materialized.contains(&join.lhs) {
                return Err(QueryError::semantic(format!(
                    "query specified join fetching, but the owner of the fetched association was not present in the select list [{}]",
                    join.path
                )));
            }
            materialized.insert(join.path.clone());
        }
        Ok(())
    }

    fn row_count(&mut self, expr: &Spanned<Expr>, clause: &str) -> QueryResult<SqmExpression> {
        match &expr.value {
            Expr::Literal(Literal::Integer(n)) if *n >= 0 => Ok(SqmExpression::Literal {
                value: Value::Integer(*n),
                ty: Some(ExpressableType::basic(ValueType::Integer)),
            }),
            Expr::Parameter(reference) => {
                let name = self.parameters.register(reference)?;
                self.parameters
                    .anticipate(&name, &ExpressableType::basic(ValueType::Integer))?;
                Ok(SqmExpression::Parameter { name })
            }
            _ => Err(QueryError::semantic(format!(
                "The {} must be a non-negative integer literal or a parameter",
                clause
            ))),
        }
    }

    // =========================================================================
    // Predicates
    // =========================================================================

    fn optional_predicate(
        &mut self,
        expr: Option<&Spanned<Expr>>,
        context: &str,
    ) -> QueryResult<Option<SqmPredicate>> {
        expr.map(|e| self.predicate(e, context)).transpose()
    }

    fn predicate(&mut self, expr: &Spanned<Expr>, context: &str) -> QueryResult<SqmPredicate> {
        match &expr.value {
            Expr::And(lhs, rhs) => self.junction(JunctionKind::And, lhs, rhs, context),
            Expr::Or(lhs, rhs) => self.junction(JunctionKind::Or, lhs, rhs, context),
            Expr::Not(inner) => match &inner.value {
                Expr::Exists(query) => Ok(SqmPredicate::Exists {
                    query: Box::new(self.subquery(query)?),
                    negated: true,
                }),
                _ => Ok(SqmPredicate::Negated(Box::new(self.predicate(inner, context)?))),
            },
            Expr::Comparison { op, lhs, rhs } => {
                let lhs = self.expression(lhs)?;
                let rhs = self.expression(rhs)?;
                self.check_comparable("comparison", &lhs, &rhs)?;
                Ok(SqmPredicate::Comparison { op: *op, lhs, rhs })
            }
            Expr::IsNull { expr, negated } => Ok(SqmPredicate::NullCheck {
                expr: self.expression(expr)?,
                negated: *negated,
            }),
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let expr = self.expression(expr)?;
                let low = self.expression(low)?;
                let high = self.expression(high)?;
                self.check_comparable("between", &expr, &low)?;
                self.check_comparable("between", &expr, &high)?;
                Ok(SqmPredicate::Between {
                    expr,
                    low,
                    high,
                    negated: *negated,
                })
            }
            Expr::Like {
                expr,
                pattern,
                escape,
                negated,
            } => {
                let expr = self.expression(expr)?;
                self.require_family("like", &expr, TypeFamily::Text)?;
                let pattern = self.expression(pattern)?;
                self.require_family("like", &pattern, TypeFamily::Text)?;
                let escape = match escape {
                    Some(escape) => {
                        let escape = self.expression(escape)?;
                        self.require_family("like escape", &escape, TypeFamily::Text)?;
                        Some(escape)
                    }
                    None => None,
                };
                Ok(SqmPredicate::Like {
                    expr,
                    pattern,
                    escape,
                    negated: *negated,
                })
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let expr = self.expression(expr)?;
                let mut elements = Vec::with_capacity(list.len());
                for element in list {
                    let element = self.expression(element)?;
                    self.check_comparable("in list", &expr, &element)?;
                    elements.push(element);
                }
                if let [only] = elements.as_slice() {
                    if let Some(name) = only.as_parameter() {
                        self.parameters.allow_multi_valued(name);
                    }
                }
                Ok(SqmPredicate::InList {
                    expr,
                    list: elements,
                    negated: *negated,
                })
            }
            Expr::InSubquery {
                expr,
                query,
                negated,
            } => {
                let expr = self.expression(expr)?;
                let query = self.subquery(query)?;
                match query.selections.as_slice() {
                    [selection] => {
                        self.check_comparable("in subquery", &expr, &selection.expression)?
                    }
                    _ => {
                        return Err(QueryError::semantic(
                            "Subquery of an in predicate must select exactly one expression",
                        ));
                    }
                }
                Ok(SqmPredicate::InSubquery {
                    expr,
                    query: Box::new(query),
                    negated: *negated,
                })
            }
            Expr::Exists(query) => Ok(SqmPredicate::Exists {
                query: Box::new(self.subquery(query)?),
                negated: false,
            }),
            _ => {
                let value = self.expression(expr)?;
                match value.expressable_type() {
                    Some(ty) if ty.is_boolean() => Ok(SqmPredicate::BooleanExpression(value)),
                    Some(ty) => Err(QueryError::type_mismatch(context, ty, "boolean")),
                    None => {
                        self.infer(&value, &ExpressableType::basic(ValueType::Boolean))?;
                        Ok(SqmPredicate::BooleanExpression(value))
                    }
                }
            }
        }
    }

    fn junction(
        &mut self,
        kind: JunctionKind,
        lhs: &Spanned<Expr>,
        rhs: &Spanned<Expr>,
        context: &str,
    ) -> QueryResult<SqmPredicate> {
        let mut predicates = Vec::new();
        for side in [lhs, rhs] {
            match self.predicate(side, context)? {
                SqmPredicate::Junction {
                    kind: inner,
                    predicates: nested,
                } if inner == kind => predicates.extend(nested),
                other => predicates.push(other),
            }
        }
        Ok(SqmPredicate::Junction { kind, predicates })
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn expression(&mut self, expr: &Spanned<Expr>) -> QueryResult<SqmExpression> {
        match &expr.value {
            Expr::Path(segments) => {
                let resolved = self.resolver.resolve_path(segments, self.in_top_select())?;
                if matches!(resolved, SqmExpression::EmbeddedPath(_)) && !self.in_top_select() {
                    return Err(QueryError::unsupported(format!(
                        "embedded-valued path '{}' outside the select list",
                        segments.join(".")
                    )));
                }
                Ok(resolved)
            }
            Expr::Literal(literal) => Ok(literal_expression(literal)),
            Expr::Parameter(reference) => Ok(SqmExpression::Parameter {
                name: self.parameters.register(reference)?,
            }),
            Expr::Negate(inner) => {
                let inner = self.expression(inner)?;
                self.require_family("negation", &inner, TypeFamily::Numeric)?;
                Ok(SqmExpression::Negated(Box::new(inner)))
            }
            Expr::Arithmetic { op, lhs, rhs } => {
                let lhs = self.expression(lhs)?;
                let rhs = self.expression(rhs)?;
                let ty = self.arithmetic_type(*op, &lhs, &rhs)?;
                Ok(SqmExpression::Binary {
                    op: *op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    ty,
                })
            }
            Expr::Function {
                name,
                distinct,
                star,
                args,
            } => self.function(name, *distinct, *star, args),
            _ => Err(QueryError::unsupported("predicate used as a value")),
        }
    }

    fn arithmetic_type(
        &mut self,
        op: ast::ArithmeticOp,
        lhs: &SqmExpression,
        rhs: &SqmExpression,
    ) -> QueryResult<Option<ExpressableType>> {
        if op == ast::ArithmeticOp::Concat {
            self.require_family("concatenation", lhs, TypeFamily::Text)?;
            self.require_family("concatenation", rhs, TypeFamily::Text)?;
            return Ok(Some(ExpressableType::basic(ValueType::String)));
        }
        let context = "arithmetic";
        let left = self.require_family(context, lhs, TypeFamily::Numeric)?;
        let right = self.require_family(context, rhs, TypeFamily::Numeric)?;
        Ok(match (left, right) {
            (Some(l), Some(r)) => Some(ExpressableType::basic(promote_numeric(l, r))),
            (Some(t), None) => {
                self.infer(rhs, &ExpressableType::basic(t))?;
                Some(ExpressableType::basic(t))
            }
            (None, Some(t)) => {
                self.infer(lhs, &ExpressableType::basic(t))?;
                Some(ExpressableType::basic(t))
            }
            (None, None) => None,
        })
    }

    fn function(
        &mut self,
        name: &str,
        distinct: bool,
        star: bool,
        args: &[Spanned<Expr>],
    ) -> QueryResult<SqmExpression> {
        let name = name.to_lowercase();
        if distinct && !AGGREGATES.contains(&name.as_str()) {
            return Err(QueryError::semantic(format!(
                "distinct is only allowed in aggregate functions, not in '{}'",
                name
            )));
        }
        if star {
            return match name.as_str() {
                "count" if !distinct => Ok(SqmExpression::CountStar),
                _ => Err(QueryError::semantic(format!("'{}(*)' is not allowed", name))),
            };
        }

        let mut built = Vec::with_capacity(args.len());
        for arg in args {
            built.push(self.expression(arg)?);
        }
        let context = format!("function {}", name);
        let ty = match name.as_str() {
            "count" => {
                expect_arity(&name, &built, 1)?;
                ExpressableType::basic(ValueType::Long)
            }
            "sum" => {
                expect_arity(&name, &built, 1)?;
                match self.require_family(&context, &built[0], TypeFamily::Numeric)? {
                    Some(ValueType::Integer | ValueType::Long) | None => {
                        ExpressableType::basic(ValueType::Long)
                    }
                    Some(other) => ExpressableType::basic(other),
                }
            }
            "avg" => {
                expect_arity(&name, &built, 1)?;
                self.require_family(&context, &built[0], TypeFamily::Numeric)?;
                ExpressableType::basic(ValueType::Double)
            }
            "min" | "max" => {
                expect_arity(&name, &built, 1)?;
                built[0]
                    .expressable_type()
                    .ok_or_else(|| untyped_argument(&name))?
            }
            "abs" => {
                expect_arity(&name, &built, 1)?;
                let ty = self.require_family(&context, &built[0], TypeFamily::Numeric)?;
                ExpressableType::basic(ty.ok_or_else(|| untyped_argument(&name))?)
            }
            "upper" | "lower" => {
                expect_arity(&name, &built, 1)?;
                self.require_family(&context, &built[0], TypeFamily::Text)?;
                ExpressableType::basic(ValueType::String)
            }
            "length" => {
                expect_arity(&name, &built, 1)?;
                self.require_family(&context, &built[0], TypeFamily::Text)?;
                ExpressableType::basic(ValueType::Integer)
            }
            "concat" => {
                expect_min_arity(&name, &built, 2)?;
                for arg in &built {
                    self.require_family(&context, arg, TypeFamily::Text)?;
                }
                ExpressableType::basic(ValueType::String)
            }
            "coalesce" => {
                expect_min_arity(&name, &built, 2)?;
                let ty = built
                    .iter()
                    .find_map(SqmExpression::expressable_type)
                    .ok_or_else(|| untyped_argument(&name))?;
                for arg in &built {
                    match arg.expressable_type() {
                        Some(other) if !self.comparable(&ty, &other, arg) => {
                            return Err(QueryError::type_mismatch(context, ty, other));
                        }
                        Some(_) => {}
                        None => self.infer(arg, &ty)?,
                    }
                }
                ty
            }
            _ => {
                return Err(QueryError::unsupported(format!("function '{}'", name)));
            }
        };

        Ok(SqmExpression::Function {
            name,
            distinct,
            args: built,
            ty,
        })
    }

    // =========================================================================
    // Typing
    // =========================================================================

    /// Check that `expr` belongs to `family`, inferring it for an untyped
    /// parameter. Returns the value type when known.
    fn require_family(
        &mut self,
        context: &str,
        expr: &SqmExpression,
        family: TypeFamily,
    ) -> QueryResult<Option<ValueType>> {
        match expr.expressable_type() {
            Some(ty) if ty.family() == Some(family) => Ok(ty.value_type()),
            Some(ty) => Err(QueryError::type_mismatch(context, ty, family_name(family))),
            None => {
                let anticipated = match family {
                    TypeFamily::Text => Some(ValueType::String),
                    TypeFamily::Boolean => Some(ValueType::Boolean),
                    TypeFamily::Numeric | TypeFamily::Temporal => None,
                };
                if let Some(value_type) = anticipated {
                    self.infer(expr, &ExpressableType::basic(value_type))?;
                }
                Ok(None)
            }
        }
    }

    fn check_comparable(
        &mut self,
        context: &str,
        lhs: &SqmExpression,
        rhs: &SqmExpression,
    ) -> QueryResult<()> {
        match (lhs.expressable_type(), rhs.expressable_type()) {
            (Some(l), Some(r)) => {
                if self.comparable(&l, &r, rhs) || self.comparable(&r, &l, lhs) {
                    Ok(())
                } else {
                    Err(QueryError::type_mismatch(context, l, r))
                }
            }
            (Some(ty), None) => self.infer(rhs, &ty),
            (None, Some(ty)) => self.infer(lhs, &ty),
            (None, None) => Ok(()),
        }
    }

    /// Whether a value of type `other` (produced by `other_expr`) may be
    /// compared with or assigned to a value of type `ty`.
    fn comparable(
        &self,
        ty: &ExpressableType,
        other: &ExpressableType,
        other_expr: &SqmExpression,
    ) -> bool {
        match (ty, other) {
            (ExpressableType::Basic(a), ExpressableType::Basic(b)) => {
                let (a, b) = (a.value_type.family(), b.value_type.family());
                a == b
                    || (a == TypeFamily::Temporal
                        && matches!(
                            other_expr,
                            SqmExpression::Literal {
                                value: Value::String(_),
                                ..
                            }
                        ))
            }
            (
                ExpressableType::Entity { name: a, .. },
                ExpressableType::Entity { name: b, .. },
            ) => {
                let metamodel = self.resolver.metamodel();
                let root = |name: &str| metamodel.root_entity_of(name).map(|m| m.name.clone());
                root(a).is_some() && root(a) == root(b)
            }
            (ExpressableType::Embeddable(a), ExpressableType::Embeddable(b)) => a == b,
            _ => false,
        }
    }

    fn infer(&mut self, expr: &SqmExpression, ty: &ExpressableType) -> QueryResult<()> {
        match expr.as_parameter() {
            Some(name) => self.parameters.anticipate(name, ty),
            None => Ok(()),
        }
    }
}

/// `order by x` where `x` names a select item.
fn select_alias_reference(
    query: &SqmQuerySpec,
    expr: &Spanned<Expr>,
) -> Option<(String, SqmExpression)> {
    let Expr::Path(segments) = &expr.value else {
        return None;
    };
    let [name] = segments.as_slice() else {
        return None;
    };
    query
        .selections
        .iter()
        .find(|s| {
            s.alias
                .as_deref()
                .is_some_and(|alias| alias.eq_ignore_ascii_case(name))
        })
        .map(|s| (name.clone(), s.expression.clone()))
}

fn literal_expression(literal: &Literal) -> SqmExpression {
    let (value, ty) = match literal {
        Literal::Integer(n) => {
            let value_type = if i32::try_from(*n).is_ok() {
                ValueType::Integer
            } else {
                ValueType::Long
            };
            (Value::Integer(*n), Some(value_type))
        }
        Literal::Decimal(x) => (Value::Float(*x), Some(ValueType::Double)),
        Literal::String(s) => (Value::String(s.clone()), Some(ValueType::String)),
        Literal::Boolean(b) => (Value::Boolean(*b), Some(ValueType::Boolean)),
        Literal::Null => (Value::Null, None),
    };
    SqmExpression::Literal {
        value,
        ty: ty.map(ExpressableType::basic),
    }
}

fn family_name(family: TypeFamily) -> &'static str {
    match family {
        TypeFamily::Boolean => "boolean",
        TypeFamily::Numeric => "numeric",
        TypeFamily::Text => "string",
        TypeFamily::Temporal => "temporal",
    }
}

fn expect_arity(name: &str, args: &[SqmExpression], arity: usize) -> QueryResult<()> {
    if args.len() != arity {
        return Err(QueryError::semantic(format!(
            "Function '{}' expects {} argument(s), got {}",
            name,
            arity,
            args.len()
        )));
    }
    Ok(())
}

fn expect_min_arity(name: &str, args: &[SqmExpression], min: usize) -> QueryResult<()> {
    if args.len() < min {
        return Err(QueryError::semantic(format!(
            "Function '{}' expects at least {} arguments, got {}",
            name,
            min,
            args.len()
        )));
    }
    Ok(())
}

fn untyped_argument(name: &str) -> QueryError {
    QueryError::semantic(format!(
        "Cannot infer the type of function '{}' from its arguments",
        name
    ))
}

// =============================================================================
// Parameters
// =============================================================================

/// Collects the parameters of one statement in first-occurrence order.
#[derive(Debug, Default)]
struct ParameterCollector {
    order: Vec<ParameterName>,
    parameters: HashMap<ParameterName, QueryParameter>,
}

impl ParameterCollector {
    fn register(&mut self, reference: &ParameterRef) -> QueryResult<ParameterName> {
        let name = match reference {
            ParameterRef::Named(name) => ParameterName::Named(name.clone()),
            ParameterRef::Positional(ordinal) => ParameterName::Positional(*ordinal),
        };
        let mixed = self.order.iter().any(|existing| {
            matches!(
                (existing, &name),
                (ParameterName::Named(_), ParameterName::Positional(_))
                    | (ParameterName::Positional(_), ParameterName::Named(_))
            )
        });
        if mixed {
            return Err(QueryError::semantic(
                "Named and positional parameters cannot be mixed in one query",
            ));
        }
        if !self.parameters.contains_key(&name) {
            self.order.push(name.clone());
            self.parameters
                .insert(name.clone(), QueryParameter::new(name.clone()));
        }
        Ok(name)
    }

    fn anticipate(&mut self, name: &ParameterName, ty: &ExpressableType) -> QueryResult<()> {
        let Some(parameter) = self.parameters.get_mut(name) else {
            return Ok(());
        };
        match &parameter.anticipated_type {
            None => {
                parameter.anticipated_type = Some(ty.clone());
                Ok(())
            }
            Some(existing) if compatible(existing, ty) => Ok(()),
            Some(existing) => Err(QueryError::type_mismatch(
                format!("parameter {}", name),
                existing,
                ty,
            )),
        }
    }

    fn allow_multi_valued(&mut self, name: &ParameterName) {
        if let Some(parameter) = self.parameters.get_mut(name) {
            parameter.allows_multi_valued = true;
        }
    }

    fn finish(mut self) -> QueryResult<Vec<QueryParameter>> {
        let ordinals: BTreeSet<u32> = self
            .order
            .iter()
            .filter_map(|n| match n {
                ParameterName::Positional(ordinal) => Some(*ordinal),
                ParameterName::Named(_) => None,
            })
            .collect();
        if let Some(gap) = (1..=ordinals.len() as u32).find(|o| !ordinals.contains(o)) {
            return Err(QueryError::semantic(format!(
                "Positional parameters must be numbered contiguously from 1; ?{} is missing",
                gap
            )));
        }
        Ok(self
            .order
            .iter()
            .filter_map(|name| self.parameters.remove(name))
            .collect())
    }
}

/// Two anticipated types are compatible when they bind the same way.
fn compatible(a: &ExpressableType, b: &ExpressableType) -> bool {
    match (a, b) {
        (ExpressableType::Basic(x), ExpressableType::Basic(y)) => {
            x.value_type.family() == y.value_type.family()
        }
        (ExpressableType::Entity { id: x, .. }, ExpressableType::Entity { id: y, .. }) => {
            x.value_type.family() == y.value_type.family()
        }
        (ExpressableType::Embeddable(x), ExpressableType::Embeddable(y)) => x == y,
        _ => false,
    }
}
