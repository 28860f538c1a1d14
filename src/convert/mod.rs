//! SQM to SQL AST conversion.
//!
//! One [`SqmConverter`] per compilation, consumed by [`SqmConverter::convert`].
//! It allocates table aliases, registers every from element, expands entity
//! selections into columns plus a [`ResultShape`], and applies the literal
//! rendering policy of the target dialect.
//!
//! # Example
//!
//! ```ignore
//! use hqlc::convert::{convert, ConversionOptions};
//!
//! let sqm = hqlc::parse("from Person p where p.name = :n", &metamodel)?;
//! let conversion = convert(&sqm, &metamodel, &ConversionOptions::default())?;
//! ```

mod alias;
mod clause;
mod expr;
mod fetch;
mod registry;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::hql::ast::JoinKind;
use crate::metamodel::{Attribute, ManagedType, MetamodelAccess, SqlType, TableName};
use crate::query::parameter::{ParameterName, QueryParameter};
use crate::results::ResultShape;
use crate::sql::{
    DeleteStatement, Dialect, SelectStatement, SqlDialect, SqlExpr, SqlJoinKind, SqlLiteral,
    SqlStatement, TableJoin, TableReference, UpdateStatement,
};
use crate::sqm::{
    SqmDeleteStatement, SqmFromClause, SqmJoin, SqmJoinAssociation, SqmSelectStatement,
    SqmStatement, SqmUpdateStatement,
};

use alias::AliasGenerator;
use clause::{Clause, ClauseStack};
use registry::FromClauseRegistry;

/// Default bound on metamodel-driven (eager) fetch nesting.
pub const DEFAULT_MAX_FETCH_DEPTH: usize = 3;

/// How query literals reach the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralRendering {
    /// Inline every literal.
    AsLiteral,
    /// Every literal becomes a `?` marker.
    AsParam,
    /// Markers everywhere except the top-level select list.
    AsParamOutsideSelect,
}

impl LiteralRendering {
    /// Policy used when none is configured: dialects that reject markers in
    /// the select list keep select-list literals inline.
    pub fn default_for(dialect: Dialect) -> Self {
        if dialect.supports_select_list_parameters() {
            LiteralRendering::AsParam
        } else {
            LiteralRendering::AsParamOutsideSelect
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LiteralRendering::AsLiteral => "as_literal",
            LiteralRendering::AsParam => "as_param",
            LiteralRendering::AsParamOutsideSelect => "as_param_outside_select",
        }
    }
}

impl fmt::Display for LiteralRendering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown literal rendering '{0}' (expected as_literal, as_param or as_param_outside_select)")]
pub struct UnknownLiteralRendering(pub String);

impl FromStr for LiteralRendering {
    type Err = UnknownLiteralRendering;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "as_literal" | "literal" => Ok(LiteralRendering::AsLiteral),
            "as_param" | "param" => Ok(LiteralRendering::AsParam),
            "as_param_outside_select" => Ok(LiteralRendering::AsParamOutsideSelect),
            _ => Err(UnknownLiteralRendering(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversionOptions {
    pub dialect: Dialect,
    pub literal_rendering: LiteralRendering,
    pub max_fetch_depth: usize,
}

impl ConversionOptions {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            literal_rendering: LiteralRendering::default_for(dialect),
            max_fetch_depth: DEFAULT_MAX_FETCH_DEPTH,
        }
    }

    pub fn with_literal_rendering(mut self, literal_rendering: LiteralRendering) -> Self {
        self.literal_rendering = literal_rendering;
        self
    }

    pub fn with_max_fetch_depth(mut self, max_fetch_depth: usize) -> Self {
        self.max_fetch_depth = max_fetch_depth;
        self
    }
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self::new(Dialect::default())
    }
}

/// Output of one conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub statement: SqlStatement,
    /// Empty for update and delete.
    pub shape: ResultShape,
    pub parameters: Vec<QueryParameter>,
}

/// Convert a semantic query model into a SQL AST.
pub fn convert(
    sqm: &SqmStatement,
    metamodel: &dyn MetamodelAccess,
    options: &ConversionOptions,
) -> QueryResult<Conversion> {
    SqmConverter::new(metamodel, options, sqm.parameters()).convert(sqm)
}

pub struct SqmConverter<'a> {
    metamodel: &'a dyn MetamodelAccess,
    options: &'a ConversionOptions,
    aliases: AliasGenerator,
    clauses: ClauseStack,
    registry: FromClauseRegistry,
    /// Number of query specs currently open; 1 is the top-level query.
    depth: usize,
    parameter_types: HashMap<ParameterName, Option<SqlType>>,
}

impl<'a> SqmConverter<'a> {
    pub fn new(
        metamodel: &'a dyn MetamodelAccess,
        options: &'a ConversionOptions,
        parameters: &[QueryParameter],
    ) -> Self {
        Self {
            metamodel,
            options,
            aliases: AliasGenerator::new(),
            clauses: ClauseStack::default(),
            registry: FromClauseRegistry::default(),
            depth: 0,
            parameter_types: parameters
                .iter()
                .map(|p| (p.name.clone(), p.bind_type().map(|b| b.sql_type)))
                .collect(),
        }
    }

    /// Run the conversion. Nothing is produced unless every step succeeds.
    pub fn convert(mut self, sqm: &SqmStatement) -> QueryResult<Conversion> {
        let (statement, shape) = match sqm {
            SqmStatement::Select(select) => {
                let (select, shape) = self.select_statement(select)?;
                (SqlStatement::Select(select), shape)
            }
            SqmStatement::Update(update) => (
                SqlStatement::Update(self.update_statement(update)?),
                ResultShape::default(),
            ),
            SqmStatement::Delete(delete) => (
                SqlStatement::Delete(self.delete_statement(delete)?),
                ResultShape::default(),
            ),
        };
        debug!(
            dialect = %self.options.dialect,
            aliases = self.aliases.allocated(),
            joins = statement.join_count(),
            results = shape.results.len(),
            "converted to SQL AST"
        );
        Ok(Conversion {
            statement,
            shape,
            parameters: sqm.parameters().to_vec(),
        })
    }

    fn in_top_select(&self) -> bool {
        self.clauses.current() == Some(Clause::Select) && self.depth == 1
    }

    // =========================================================================
    // Metamodel lookups
    // =========================================================================

    fn managed(&self, name: &str) -> QueryResult<&'a ManagedType> {
        self.metamodel
            .resolve_managed_type(name)
            .ok_or_else(|| QueryError::UnknownEntity {
                name: name.to_string(),
            })
    }

    fn table_of(&self, entity: &str) -> QueryResult<TableName> {
        self.metamodel
            .table_of(entity)
            .ok_or_else(|| QueryError::UnknownEntity {
                name: entity.to_string(),
            })
    }

    fn identifier(&self, entity: &str) -> QueryResult<&'a Attribute> {
        self.metamodel
            .identifier_of(entity)
            .ok_or_else(|| QueryError::semantic(format!("Entity '{}' has no identifier", entity)))
    }

    fn identifier_column(&self, entity: &str) -> QueryResult<String> {
        self.identifier(entity)?
            .column()
            .map(str::to_string)
            .ok_or_else(|| QueryError::semantic(format!("Entity '{}' has no identifier", entity)))
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn select_statement(
        &mut self,
        select: &SqmSelectStatement,
    ) -> QueryResult<(SelectStatement, ResultShape)> {
        self.registry.push_scope(false);
        self.depth += 1;
        let query = &select.query;
        let restrictions = self.from_clause(&query.from)?;

        self.clauses.push(Clause::Select);
        let mut columns = Vec::new();
        let mut shape = ResultShape::default();
        for selection in &query.selections {
            let result = self.domain_result(&mut columns, selection)?;
            shape.results.push(result);
        }
        self.clauses.pop();

        let (where_clause, group_by, having) = self.filter_clauses(
            query.where_clause.as_ref(),
            restrictions,
            &query.group_by,
            query.having.as_ref(),
        )?;

        self.clauses.push(Clause::OrderBy);
        let mut order_by = Vec::with_capacity(select.order_by.len());
        for sort in &select.order_by {
            self.sort_specification(&mut order_by, sort)?;
        }
        self.clauses.pop();

        self.clauses.push(Clause::Limit);
        let limit = select
            .limit
            .as_ref()
            .map(|e| self.expression(e))
            .transpose()?;
        let offset = select
            .offset
            .as_ref()
            .map(|e| self.expression(e))
            .transpose()?;
        self.clauses.pop();

        self.depth -= 1;
        let from = self.registry.pop_scope();
        Ok((
            SelectStatement {
                query: crate::sql::QuerySpec {
                    distinct: query.distinct,
                    select: columns,
                    from,
                    where_clause,
                    group_by,
                    having,
                },
                order_by,
                limit,
                offset,
            },
            shape,
        ))
    }

    fn update_statement(&mut self, update: &SqmUpdateStatement) -> QueryResult<UpdateStatement> {
        self.registry.push_scope(true);
        self.depth += 1;
        let table = self.table_of(&update.root.entity)?;
        let alias = self.aliases.next_alias();
        self.registry.add_root(
            update.root.path.clone(),
            &update.root.entity,
            TableReference {
                table: table.clone(),
                alias,
            },
        )?;
        let restriction = self.subtype_restriction(&update.root.entity, None)?;

        self.clauses.push(Clause::Set);
        let mut assignments = Vec::with_capacity(update.assignments.len());
        for assignment in &update.assignments {
            let value = self.expression(&assignment.value)?;
            assignments.push((assignment.column.clone(), value));
        }
        self.clauses.pop();

        let where_clause = self.clause_predicate(Clause::Where, update.where_clause.as_ref())?;
        let where_clause = SqlExpr::and_all(where_clause.into_iter().chain(restriction).collect());
        self.depth -= 1;
        self.registry.pop_scope();
        Ok(UpdateStatement {
            table,
            assignments,
            where_clause,
        })
    }

    fn delete_statement(&mut self, delete: &SqmDeleteStatement) -> QueryResult<DeleteStatement> {
        self.registry.push_scope(true);
        self.depth += 1;
        let table = self.table_of(&delete.root.entity)?;
        let alias = self.aliases.next_alias();
        self.registry.add_root(
            delete.root.path.clone(),
            &delete.root.entity,
            TableReference {
                table: table.clone(),
                alias,
            },
        )?;
        let restriction = self.subtype_restriction(&delete.root.entity, None)?;
        let where_clause = self.clause_predicate(Clause::Where, delete.where_clause.as_ref())?;
        let where_clause = SqlExpr::and_all(where_clause.into_iter().chain(restriction).collect());
        self.depth -= 1;
        self.registry.pop_scope();
        Ok(DeleteStatement {
            table,
            where_clause,
        })
    }

    // =========================================================================
    // From clause
    // =========================================================================

    /// Register roots and joins in document order. Join conditions are
    /// converted once every join of the clause has an alias. Yields the
    /// discriminator restrictions of subtype roots, which belong in `where`.
    fn from_clause(&mut self, from: &SqmFromClause) -> QueryResult<Vec<SqlExpr>> {
        self.clauses.push(Clause::From);
        let mut restrictions = Vec::new();
        for root in &from.roots {
            let table = self.table_of(&root.entity)?;
            let alias = self.aliases.next_alias();
            restrictions.extend(self.subtype_restriction(&root.entity, Some(alias.as_str()))?);
            self.registry
                .add_root(root.path.clone(), &root.entity, TableReference { table, alias })?;
            for join in &root.joins {
                self.join(join)?;
            }
        }
        for join in from.joins() {
            if let Some(condition) = &join.condition {
                let condition = self.predicate(condition)?;
                self.registry.add_join_condition(&join.path, condition)?;
            }
        }
        self.clauses.pop();
        Ok(restrictions)
    }

    fn join(&mut self, join: &SqmJoin) -> QueryResult<()> {
        let lhs = self.registry.element(&join.lhs)?.alias.clone();
        let table = match &join.association {
            SqmJoinAssociation::ToOne { target, .. }
            | SqmJoinAssociation::OneToMany { target, .. } => self.table_of(target)?,
            SqmJoinAssociation::ElementCollection { table, .. } => table.clone(),
        };
        let alias = self.aliases.next_alias();
        let predicate = self.join_predicate(&join.association, &lhs, &alias)?;
        let kind = match join.kind {
            JoinKind::Inner => SqlJoinKind::Inner,
            JoinKind::LeftOuter => SqlJoinKind::LeftOuter,
        };
        let reusable =
            join.fetch || (!join.association.is_plural() && join.condition.is_none());
        self.registry.add_join(
            join.path.clone(),
            join.association.target_entity(),
            &join.lhs,
            &join.attribute,
            join.fetch,
            reusable,
            TableJoin {
                kind,
                table: TableReference { table, alias },
                predicate,
            },
        )
    }

    /// The link predicate of a join, narrowed to the target subtype.
    fn join_predicate(
        &self,
        association: &SqmJoinAssociation,
        lhs: &str,
        alias: &str,
    ) -> QueryResult<SqlExpr> {
        let link = join_predicate(association, lhs, alias);
        let restriction = match association.target_entity() {
            Some(target) => self.subtype_restriction(target, Some(alias))?,
            None => None,
        };
        Ok(match restriction {
            Some(restriction) => SqlExpr::And(vec![link, restriction]),
            None => link,
        })
    }

    /// Subtypes share the table of their hierarchy root; this restricts its
    /// rows to `entity` and the entities below it. `None` for a root.
    fn subtype_restriction(
        &self,
        entity: &str,
        qualifier: Option<&str>,
    ) -> QueryResult<Option<SqlExpr>> {
        if self.managed(entity)?.super_type.is_none() {
            return Ok(None);
        }
        let root = self
            .metamodel
            .root_entity_of(entity)
            .ok_or_else(|| QueryError::UnknownEntity {
                name: entity.to_string(),
            })?;
        let column = root.discriminator_column.as_deref().ok_or_else(|| {
            QueryError::unsupported(format!(
                "subtype '{}' of '{}', which declares no discriminator column",
                entity, root.name
            ))
        })?;
        let column = SqlExpr::column(qualifier, column);
        let mut values: Vec<SqlExpr> = self
            .metamodel
            .hierarchy_below(entity)
            .into_iter()
            .map(|m| SqlExpr::Literal(SqlLiteral::String(m.discriminator().to_string())))
            .collect();
        Ok(Some(if values.len() == 1 {
            SqlExpr::eq(column, values.remove(0))
        } else {
            SqlExpr::InList {
                expr: Box::new(column),
                list: values,
                negated: false,
            }
        }))
    }
}

/// The `on` predicate linking a joined table to its owner.
fn join_predicate(association: &SqmJoinAssociation, lhs: &str, alias: &str) -> SqlExpr {
    match association {
        SqmJoinAssociation::ToOne {
            fk_column,
            target_id_column,
            ..
        } => SqlExpr::eq(
            SqlExpr::column(Some(lhs), fk_column.as_str()),
            SqlExpr::column(Some(alias), target_id_column.as_str()),
        ),
        SqmJoinAssociation::OneToMany {
            key_column,
            owner_id_column,
            ..
        }
        | SqmJoinAssociation::ElementCollection {
            key_column,
            owner_id_column,
            ..
        } => SqlExpr::eq(
            SqlExpr::column(Some(alias), key_column.as_str()),
            SqlExpr::column(Some(lhs), owner_id_column.as_str()),
        ),
    }
}
