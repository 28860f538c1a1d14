//! SQL abstract syntax tree.
//!
//! The database-centric mirror of the semantic query model: table references
//! carry the aliases allocated during conversion, expressions refer to columns
//! rather than domain paths, and parameters are JDBC markers.

use crate::hql::ast::{ArithmeticOp, ComparisonOp, NullPrecedence, SortDirection};
use crate::metamodel::{SqlType, TableName};
use crate::query::parameter::{ParameterName, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlStatement {
    Select(SelectStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub query: QuerySpec,
    pub order_by: Vec<SortSpecification>,
    pub limit: Option<SqlExpr>,
    pub offset: Option<SqlExpr>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySpec {
    pub distinct: bool,
    pub select: Vec<SqlExpr>,
    pub from: Vec<TableGroup>,
    pub where_clause: Option<SqlExpr>,
    pub group_by: Vec<SqlExpr>,
    pub having: Option<SqlExpr>,
}

/// A physical table with the alias allocated for it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableReference {
    pub table: TableName,
    pub alias: String,
}

/// A root table reference plus the joins hanging off it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableGroup {
    pub root: TableReference,
    pub joins: Vec<TableJoin>,
}

impl TableGroup {
    pub fn new(root: TableReference) -> Self {
        Self {
            root,
            joins: Vec::new(),
        }
    }

    /// Number of table references (root included).
    pub fn table_count(&self) -> usize {
        1 + self.joins.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlJoinKind {
    Inner,
    LeftOuter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableJoin {
    pub kind: SqlJoinKind,
    pub table: TableReference,
    pub predicate: SqlExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpecification {
    pub expr: SqlExpr,
    pub direction: SortDirection,
    pub nulls: Option<NullPrecedence>,
}

/// `update table set column = value, ... [where ...]`; columns are unqualified.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: TableName,
    pub assignments: Vec<(String, SqlExpr)>,
    pub where_clause: Option<SqlExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: TableName,
    pub where_clause: Option<SqlExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnReference {
    /// Table alias; `None` in single-table DML.
    pub qualifier: Option<String>,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlLiteral {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl SqlLiteral {
    pub fn to_value(&self) -> Value {
        match self {
            SqlLiteral::Null => Value::Null,
            SqlLiteral::Boolean(b) => Value::Boolean(*b),
            SqlLiteral::Integer(n) => Value::Integer(*n),
            SqlLiteral::Float(x) => Value::Float(*x),
            SqlLiteral::String(s) => Value::String(s.clone()),
        }
    }
}

/// A JDBC parameter marker.
#[derive(Debug, Clone, PartialEq)]
pub enum JdbcParameter {
    /// Bound from a query parameter at execution time.
    Query {
        name: ParameterName,
        sql_type: Option<SqlType>,
    },
    /// A query literal rendered as a marker; its value travels with the plan.
    Literal { value: SqlLiteral, sql_type: SqlType },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    Column(ColumnReference),
    Literal(SqlLiteral),
    Parameter(JdbcParameter),
    Arithmetic {
        op: ArithmeticOp,
        lhs: Box<SqlExpr>,
        rhs: Box<SqlExpr>,
    },
    Negate(Box<SqlExpr>),
    Function {
        name: String,
        distinct: bool,
        args: Vec<SqlExpr>,
    },
    CountStar,
    Case {
        whens: Vec<(SqlExpr, SqlExpr)>,
        otherwise: Option<Box<SqlExpr>>,
    },
    Comparison {
        op: ComparisonOp,
        lhs: Box<SqlExpr>,
        rhs: Box<SqlExpr>,
    },
    And(Vec<SqlExpr>),
    Or(Vec<SqlExpr>),
    Not(Box<SqlExpr>),
    IsNull {
        expr: Box<SqlExpr>,
        negated: bool,
    },
    Between {
        expr: Box<SqlExpr>,
        low: Box<SqlExpr>,
        high: Box<SqlExpr>,
        negated: bool,
    },
    Like {
        expr: Box<SqlExpr>,
        pattern: Box<SqlExpr>,
        escape: Option<Box<SqlExpr>>,
        negated: bool,
    },
    InList {
        expr: Box<SqlExpr>,
        list: Vec<SqlExpr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<SqlExpr>,
        query: Box<QuerySpec>,
        negated: bool,
    },
    Exists {
        query: Box<QuerySpec>,
        negated: bool,
    },
}

impl SqlExpr {
    pub fn column(qualifier: Option<&str>, column: impl Into<String>) -> Self {
        SqlExpr::Column(ColumnReference {
            qualifier: qualifier.map(str::to_string),
            column: column.into(),
        })
    }

    pub fn eq(lhs: SqlExpr, rhs: SqlExpr) -> Self {
        SqlExpr::Comparison {
            op: ComparisonOp::Eq,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Conjunction of `predicates`, flattening nested conjunctions.
    pub fn and_all(predicates: Vec<SqlExpr>) -> Option<SqlExpr> {
        let mut flat = Vec::with_capacity(predicates.len());
        for predicate in predicates {
            match predicate {
                SqlExpr::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(SqlExpr::And(flat)),
        }
    }
}

impl SqlStatement {
    /// All table groups of the top-level query (empty for DML).
    pub fn table_groups(&self) -> &[TableGroup] {
        match self {
            SqlStatement::Select(select) => &select.query.from,
            _ => &[],
        }
    }

    /// Total join count across the top-level from clause.
    pub fn join_count(&self) -> usize {
        self.table_groups().iter().map(|g| g.joins.len()).sum()
    }
}
