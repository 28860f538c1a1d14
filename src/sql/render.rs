//! Deterministic SQL AST renderer.
//!
//! Produces the SQL text and the ordered list of parameter slots (one per `?`
//! marker, in text order). Aliases are emitted exactly as the converter
//! allocated them. Rendering the same statement twice yields byte-identical
//! output.

use std::collections::BTreeMap;

use tracing::debug;

use super::ast::*;
use super::dialect::{Dialect, SqlDialect};
use super::token::{Token, TokenStream};
use crate::hql::ast::{ArithmeticOp, ComparisonOp, NullPrecedence, SortDirection};
use crate::error::{QueryError, QueryResult};
use crate::metamodel::{SqlType, TableName};
use crate::query::parameter::{ParameterName, Value};

/// Number of values bound to each multi-valued parameter. A listed parameter
/// renders one marker per value, which is only valid SQL as an item of an
/// `in` list.
pub type ParameterExpansions = BTreeMap<ParameterName, usize>;

/// What a single `?` marker is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterSlot {
    Query {
        name: ParameterName,
        /// Index into a multi-valued binding.
        element: Option<usize>,
        sql_type: Option<SqlType>,
    },
    Literal { value: Value, sql_type: SqlType },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSql {
    pub sql: String,
    pub parameters: Vec<ParameterSlot>,
}

// Binding strength, loosest first.
const PREC_NONE: u8 = 0;
const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_NOT: u8 = 3;
const PREC_PREDICATE: u8 = 4;
const PREC_ADDITIVE: u8 = 5;
const PREC_MULTIPLICATIVE: u8 = 6;
const PREC_UNARY: u8 = 7;
const PREC_ATOM: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlRenderer {
    dialect: Dialect,
    quote_identifiers: bool,
    format_sql: bool,
}

impl SqlRenderer {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            quote_identifiers: false,
            format_sql: false,
        }
    }

    /// Always quote table and column names.
    pub fn with_quoted_identifiers(mut self, quote: bool) -> Self {
        self.quote_identifiers = quote;
        self
    }

    /// Emit one clause per line.
    pub fn with_format(mut self, format: bool) -> Self {
        self.format_sql = format;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Render `statement`. A listed parameter outside an `in` list keeps a
    /// single marker; use [`render_expanded`](Self::render_expanded) to have
    /// that rejected instead.
    pub fn render(&self, statement: &SqlStatement, expansions: &ParameterExpansions) -> RenderedSql {
        self.render_with(statement, expansions).0
    }

    /// Render with multi-valued expansions, failing when a listed parameter
    /// also occurs where a value list is not valid SQL.
    pub fn render_expanded(
        &self,
        statement: &SqlStatement,
        expansions: &ParameterExpansions,
    ) -> QueryResult<RenderedSql> {
        match self.render_with(statement, expansions) {
            (rendered, None) => Ok(rendered),
            (_, Some(name)) => Err(QueryError::InvalidBinding {
                name: name.to_string(),
                reason: "multi-valued binding used outside an in list".into(),
            }),
        }
    }

    fn render_with(
        &self,
        statement: &SqlStatement,
        expansions: &ParameterExpansions,
    ) -> (RenderedSql, Option<ParameterName>) {
        let mut ctx = RenderContext {
            renderer: self,
            expansions,
            slots: Vec::new(),
            misplaced: None,
        };
        let mut ts = TokenStream::new();
        match statement {
            SqlStatement::Select(select) => ctx.select_statement(&mut ts, select),
            SqlStatement::Update(update) => ctx.update_statement(&mut ts, update),
            SqlStatement::Delete(delete) => ctx.delete_statement(&mut ts, delete),
        }

        let sql = ts.serialize(self.dialect);
        let parameters: Vec<ParameterSlot> = ts
            .parameter_slots()
            .filter_map(|slot| ctx.slots.get(slot).cloned())
            .collect();
        debug!(
            dialect = %self.dialect,
            parameters = parameters.len(),
            "rendered SQL"
        );
        (RenderedSql { sql, parameters }, ctx.misplaced)
    }
}

struct RenderContext<'r> {
    renderer: &'r SqlRenderer,
    expansions: &'r ParameterExpansions,
    slots: Vec<ParameterSlot>,
    /// First listed parameter met outside an `in` list.
    misplaced: Option<ParameterName>,
}

impl RenderContext<'_> {
    fn dialect(&self) -> Dialect {
        self.renderer.dialect
    }

    /// Clause separator: a newline in formatted mode, a space otherwise.
    fn separator(&self, ts: &mut TokenStream, nested: bool) {
        if self.renderer.format_sql && !nested {
            ts.newline();
        } else {
            ts.space();
        }
    }

    fn name(&self, name: &str) -> Token {
        if self.renderer.quote_identifiers {
            Token::QuotedIdent(name.to_string())
        } else {
            Token::Ident(name.to_string())
        }
    }

    fn table(&self, table: &TableName) -> Token {
        Token::QualifiedIdent {
            schema: table.schema.clone(),
            name: table.name.clone(),
            quoted: self.renderer.quote_identifiers,
        }
    }

    /// A query parameter marker, expanded to one marker per bound value when
    /// it is an item of an `in` list.
    fn query_parameter(
        &mut self,
        ts: &mut TokenStream,
        name: &ParameterName,
        sql_type: Option<SqlType>,
        list_item: bool,
    ) {
        let count = self.expansions.get(name).copied().unwrap_or(0);
        if count > 0 && list_item {
            for element in 0..count {
                if element > 0 {
                    ts.comma().space();
                }
                self.slot(
                    ts,
                    ParameterSlot::Query {
                        name: name.clone(),
                        element: Some(element),
                        sql_type,
                    },
                );
            }
            return;
        }
        if count > 0 && self.misplaced.is_none() {
            self.misplaced = Some(name.clone());
        }
        self.slot(
            ts,
            ParameterSlot::Query {
                name: name.clone(),
                element: None,
                sql_type,
            },
        );
    }

    fn slot(&mut self, ts: &mut TokenStream, slot: ParameterSlot) {
        let index = self.slots.len();
        self.slots.push(slot);
        ts.push(Token::Param(index));
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn select_statement(&mut self, ts: &mut TokenStream, select: &SelectStatement) {
        self.query_spec(ts, &select.query, false);

        let paginated = select.limit.is_some() || select.offset.is_some();
        if !select.order_by.is_empty() {
            self.separator(ts, false);
            ts.push(Token::OrderBy).space();
            for (i, sort) in select.order_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                self.sort_specification(ts, sort);
            }
        } else if paginated && self.dialect().requires_order_by_for_offset() {
            self.separator(ts, false);
            ts.push(Token::OrderBy)
                .space()
                .lparen()
                .push(Token::Select)
                .space()
                .push(Token::LitNull)
                .rparen();
        }

        if paginated {
            let limit = select.limit.as_ref().map(|e| self.fragment(e));
            let offset = select.offset.as_ref().map(|e| self.fragment(e));
            let pagination = self.dialect().emit_limit_offset(limit, offset);
            if !pagination.is_empty() {
                self.separator(ts, false);
                ts.append(&pagination);
            }
        }
    }

    fn fragment(&mut self, expr: &SqlExpr) -> TokenStream {
        let mut ts = TokenStream::new();
        self.expr(&mut ts, expr, PREC_NONE);
        ts
    }

    fn update_statement(&mut self, ts: &mut TokenStream, update: &UpdateStatement) {
        ts.push(Token::Update).space().push(self.table(&update.table));
        self.separator(ts, false);
        ts.push(Token::Set).space();
        for (i, (column, value)) in update.assignments.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.push(self.name(column)).space().push(Token::Eq).space();
            self.expr(ts, value, PREC_ADDITIVE);
        }
        if let Some(predicate) = &update.where_clause {
            self.separator(ts, false);
            ts.push(Token::Where).space();
            self.expr(ts, predicate, PREC_NONE);
        }
    }

    fn delete_statement(&mut self, ts: &mut TokenStream, delete: &DeleteStatement) {
        ts.push(Token::Delete)
            .space()
            .push(Token::From)
            .space()
            .push(self.table(&delete.table));
        if let Some(predicate) = &delete.where_clause {
            self.separator(ts, false);
            ts.push(Token::Where).space();
            self.expr(ts, predicate, PREC_NONE);
        }
    }

    fn query_spec(&mut self, ts: &mut TokenStream, query: &QuerySpec, nested: bool) {
        ts.push(Token::Select).space();
        if query.distinct {
            ts.push(Token::Distinct).space();
        }
        for (i, item) in query.select.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            self.expr(ts, item, PREC_NONE);
        }

        self.separator(ts, nested);
        ts.push(Token::From).space();
        for (i, group) in query.from.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            self.table_group(ts, group, nested);
        }

        if let Some(predicate) = &query.where_clause {
            self.separator(ts, nested);
            ts.push(Token::Where).space();
            self.expr(ts, predicate, PREC_NONE);
        }

        if !query.group_by.is_empty() {
            self.separator(ts, nested);
            ts.push(Token::GroupBy).space();
            for (i, expr) in query.group_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                self.expr(ts, expr, PREC_NONE);
            }
        }

        if let Some(having) = &query.having {
            self.separator(ts, nested);
            ts.push(Token::Having).space();
            self.expr(ts, having, PREC_NONE);
        }
    }

    fn table_reference(&self, ts: &mut TokenStream, table: &TableReference) {
        ts.push(self.table(&table.table))
            .space()
            .push(Token::Ident(table.alias.clone()));
    }

    fn table_group(&mut self, ts: &mut TokenStream, group: &TableGroup, nested: bool) {
        self.table_reference(ts, &group.root);
        for join in &group.joins {
            if self.renderer.format_sql && !nested {
                ts.newline().indent(1);
            } else {
                ts.space();
            }
            if join.kind == SqlJoinKind::LeftOuter {
                ts.push(Token::Left).space();
            }
            ts.push(Token::Join).space();
            self.table_reference(ts, &join.table);
            ts.space().push(Token::On).space();
            self.expr(ts, &join.predicate, PREC_NONE);
        }
    }

    fn sort_specification(&mut self, ts: &mut TokenStream, sort: &SortSpecification) {
        self.expr(ts, &sort.expr, PREC_NONE);
        if sort.direction == SortDirection::Descending {
            ts.space().push(Token::Desc);
        }
        match sort.nulls {
            Some(NullPrecedence::First) => {
                ts.space().push(Token::NullsFirst);
            }
            Some(NullPrecedence::Last) => {
                ts.space().push(Token::NullsLast);
            }
            None => {}
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn expr(&mut self, ts: &mut TokenStream, expr: &SqlExpr, parent: u8) {
        let own = precedence(expr);
        let wrap = own < parent;
        if wrap {
            ts.lparen();
        }
        self.expr_inner(ts, expr);
        if wrap {
            ts.rparen();
        }
    }

    fn expr_inner(&mut self, ts: &mut TokenStream, expr: &SqlExpr) {
        match expr {
            SqlExpr::Column(column) => {
                if let Some(qualifier) = &column.qualifier {
                    ts.push(Token::Ident(qualifier.clone())).push(Token::Dot);
                }
                ts.push(self.name(&column.column));
            }
            SqlExpr::Literal(literal) => self.literal(ts, literal),
            SqlExpr::Parameter(JdbcParameter::Query { name, sql_type }) => {
                self.query_parameter(ts, name, *sql_type, false)
            }
            SqlExpr::Parameter(JdbcParameter::Literal { value, sql_type }) => self.slot(
                ts,
                ParameterSlot::Literal {
                    value: value.to_value(),
                    sql_type: *sql_type,
                },
            ),
            SqlExpr::Arithmetic {
                op: ArithmeticOp::Concat,
                lhs,
                rhs,
            } if !self.dialect().supports_concat_operator() => {
                ts.push(Token::FunctionName("concat".into())).lparen();
                self.expr(ts, lhs, PREC_NONE);
                ts.comma().space();
                self.expr(ts, rhs, PREC_NONE);
                ts.rparen();
            }
            SqlExpr::Arithmetic { op, lhs, rhs } => {
                let own = arithmetic_precedence(*op);
                self.expr(ts, lhs, own);
                ts.space().push(arithmetic_token(*op)).space();
                self.expr(ts, rhs, own + 1);
            }
            SqlExpr::Negate(inner) => {
                ts.push(Token::Minus);
                self.expr(ts, inner, PREC_ATOM);
            }
            SqlExpr::Function {
                name,
                distinct,
                args,
            } => {
                ts.push(Token::FunctionName(name.clone())).lparen();
                if *distinct {
                    ts.push(Token::Distinct).space();
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    self.expr(ts, arg, PREC_NONE);
                }
                ts.rparen();
            }
            SqlExpr::CountStar => {
                ts.push(Token::FunctionName("count".into()))
                    .lparen()
                    .push(Token::Star)
                    .rparen();
            }
            SqlExpr::Case { whens, otherwise } => {
                ts.push(Token::Case);
                for (condition, result) in whens {
                    ts.space().push(Token::When).space();
                    self.expr(ts, condition, PREC_NONE);
                    ts.space().push(Token::Then).space();
                    self.expr(ts, result, PREC_NONE);
                }
                if let Some(otherwise) = otherwise {
                    ts.space().push(Token::Else).space();
                    self.expr(ts, otherwise, PREC_NONE);
                }
                ts.space().push(Token::End);
            }
            SqlExpr::Comparison { op, lhs, rhs } => {
                self.expr(ts, lhs, PREC_ADDITIVE);
                ts.space().push(comparison_token(*op)).space();
                self.expr(ts, rhs, PREC_ADDITIVE);
            }
            SqlExpr::And(items) => self.junction(ts, items, Token::And, PREC_NOT),
            SqlExpr::Or(items) => self.junction(ts, items, Token::Or, PREC_AND),
            SqlExpr::Not(inner) => {
                ts.push(Token::Not).space().lparen();
                self.expr(ts, inner, PREC_NONE);
                ts.rparen();
            }
            SqlExpr::IsNull { expr, negated } => {
                self.expr(ts, expr, PREC_ADDITIVE);
                ts.space().push(if *negated {
                    Token::IsNotNull
                } else {
                    Token::IsNull
                });
            }
            SqlExpr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                self.expr(ts, expr, PREC_ADDITIVE);
                ts.space();
                if *negated {
                    ts.push(Token::Not).space();
                }
                ts.push(Token::Between).space();
                self.expr(ts, low, PREC_ADDITIVE);
                ts.space().push(Token::And).space();
                self.expr(ts, high, PREC_ADDITIVE);
            }
            SqlExpr::Like {
                expr,
                pattern,
                escape,
                negated,
            } => {
                self.expr(ts, expr, PREC_ADDITIVE);
                ts.space();
                if *negated {
                    ts.push(Token::Not).space();
                }
                ts.push(Token::Like).space();
                self.expr(ts, pattern, PREC_ADDITIVE);
                if let Some(escape) = escape {
                    ts.space().push(Token::Escape).space();
                    self.expr(ts, escape, PREC_ADDITIVE);
                }
            }
            SqlExpr::InList {
                expr,
                list,
                negated,
            } => {
                self.expr(ts, expr, PREC_ADDITIVE);
                ts.space();
                if *negated {
                    ts.push(Token::Not).space();
                }
                ts.push(Token::In).space().lparen();
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    match item {
                        SqlExpr::Parameter(JdbcParameter::Query { name, sql_type }) => {
                            self.query_parameter(ts, name, *sql_type, true)
                        }
                        other => self.expr(ts, other, PREC_NONE),
                    }
                }
                ts.rparen();
            }
            SqlExpr::InSubquery {
                expr,
                query,
                negated,
            } => {
                self.expr(ts, expr, PREC_ADDITIVE);
                ts.space();
                if *negated {
                    ts.push(Token::Not).space();
                }
                ts.push(Token::In).space().lparen();
                self.query_spec(ts, query, true);
                ts.rparen();
            }
            SqlExpr::Exists { query, negated } => {
                if *negated {
                    ts.push(Token::Not).space();
                }
                ts.push(Token::Exists).space().lparen();
                self.query_spec(ts, query, true);
                ts.rparen();
            }
        }
    }

    fn junction(&mut self, ts: &mut TokenStream, items: &[SqlExpr], op: Token, child: u8) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                ts.space().push(op.clone()).space();
            }
            self.expr(ts, item, child);
        }
    }

    fn literal(&self, ts: &mut TokenStream, literal: &SqlLiteral) {
        match literal {
            SqlLiteral::Null => ts.push(Token::LitNull),
            SqlLiteral::Boolean(b) => ts.push(Token::LitBool(*b)),
            SqlLiteral::Integer(n) if *n < 0 => ts.lparen().push(Token::LitInt(*n)).rparen(),
            SqlLiteral::Integer(n) => ts.push(Token::LitInt(*n)),
            SqlLiteral::Float(x) if *x < 0.0 => ts.lparen().push(Token::LitFloat(*x)).rparen(),
            SqlLiteral::Float(x) => ts.push(Token::LitFloat(*x)),
            SqlLiteral::String(s) => ts.push(Token::LitString(s.clone())),
        };
    }
}

fn precedence(expr: &SqlExpr) -> u8 {
    match expr {
        SqlExpr::Or(items) if items.len() > 1 => PREC_OR,
        SqlExpr::And(items) if items.len() > 1 => PREC_AND,
        SqlExpr::Or(_) | SqlExpr::And(_) => PREC_ATOM,
        SqlExpr::Not(_) => PREC_NOT,
        SqlExpr::Comparison { .. }
        | SqlExpr::IsNull { .. }
        | SqlExpr::Between { .. }
        | SqlExpr::Like { .. }
        | SqlExpr::InList { .. }
        | SqlExpr::InSubquery { .. }
        | SqlExpr::Exists { .. } => PREC_PREDICATE,
        SqlExpr::Arithmetic { op, .. } => arithmetic_precedence(*op),
        SqlExpr::Negate(_) => PREC_UNARY,
        SqlExpr::Column(_)
        | SqlExpr::Literal(_)
        | SqlExpr::Parameter(_)
        | SqlExpr::Function { .. }
        | SqlExpr::CountStar
        | SqlExpr::Case { .. } => PREC_ATOM,
    }
}

fn arithmetic_precedence(op: ArithmeticOp) -> u8 {
    match op {
        ArithmeticOp::Add | ArithmeticOp::Subtract | ArithmeticOp::Concat => PREC_ADDITIVE,
        ArithmeticOp::Multiply | ArithmeticOp::Divide | ArithmeticOp::Modulo => {
            PREC_MULTIPLICATIVE
        }
    }
}

fn arithmetic_token(op: ArithmeticOp) -> Token {
    match op {
        ArithmeticOp::Add => Token::Plus,
        ArithmeticOp::Subtract => Token::Minus,
        ArithmeticOp::Multiply => Token::Mul,
        ArithmeticOp::Divide => Token::Div,
        ArithmeticOp::Modulo => Token::Mod,
        ArithmeticOp::Concat => Token::Concat,
    }
}

fn comparison_token(op: ComparisonOp) -> Token {
    match op {
        ComparisonOp::Eq => Token::Eq,
        ComparisonOp::NotEq => Token::Ne,
        ComparisonOp::Lt => Token::Lt,
        ComparisonOp::LtEq => Token::Lte,
        ComparisonOp::Gt => Token::Gt,
        ComparisonOp::GtEq => Token::Gte,
    }
}
