//! Syntax tree produced by the HQL parser.
//!
//! Nodes here are purely syntactic: paths are unresolved segment lists and no
//! node carries a type. The SQM builder turns this tree into the typed
//! semantic query model.

use super::span::{merge, Span, Spanned};

// ============================================================================
// Statements
// ============================================================================

/// A top-level statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

/// `[select ...] from ... [order by ...] [limit ...] [offset ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub query: QuerySpec,
    pub order_by: Vec<SortItem>,
    pub limit: Option<Spanned<Expr>>,
    pub offset: Option<Spanned<Expr>>,
}

/// The body of a select (also the body of a sub-query).
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub select: Option<SelectClause>,
    pub from: Vec<FromRoot>,
    pub where_clause: Option<Spanned<Expr>>,
    pub group_by: Vec<Spanned<Expr>>,
    pub having: Option<Spanned<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectClause {
    pub distinct: bool,
    pub items: Vec<SelectItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Spanned<Expr>,
    pub alias: Option<Spanned<String>>,
}

/// `EntityName [as alias] join*`
#[derive(Debug, Clone, PartialEq)]
pub struct FromRoot {
    pub entity: Spanned<String>,
    pub alias: Option<Spanned<String>>,
    pub joins: Vec<JoinClause>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
}

/// `[inner|left [outer]] join [fetch] path [as alias] [on|with condition]`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub fetch: bool,
    pub path: Spanned<Vec<String>>,
    pub alias: Option<Spanned<String>>,
    pub condition: Option<Spanned<Expr>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPrecedence {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortItem {
    pub expr: Spanned<Expr>,
    pub direction: SortDirection,
    pub nulls: Option<NullPrecedence>,
}

/// `update Entity [alias] set path = expr, ... [where ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub entity: Spanned<String>,
    pub alias: Option<Spanned<String>>,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<Spanned<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: Spanned<Vec<String>>,
    pub value: Spanned<Expr>,
}

/// `delete [from] Entity [alias] [where ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub entity: Spanned<String>,
    pub alias: Option<Spanned<String>>,
    pub where_clause: Option<Spanned<Expr>>,
}

// ============================================================================
// Expressions
// ============================================================================

/// An expression or predicate. Predicates are expressions of boolean type;
/// the builder decides which contexts accept which.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Dotted path: `p.address.city`
    Path(Vec<String>),
    Literal(Literal),
    Parameter(ParameterRef),
    Negate(Box<Spanned<Expr>>),
    Arithmetic {
        op: ArithmeticOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    /// `name([distinct] args)` or `count(*)` when `star` is set.
    Function {
        name: String,
        distinct: bool,
        star: bool,
        args: Vec<Spanned<Expr>>,
    },
    Comparison {
        op: ComparisonOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    IsNull {
        expr: Box<Spanned<Expr>>,
        negated: bool,
    },
    Between {
        expr: Box<Spanned<Expr>>,
        low: Box<Spanned<Expr>>,
        high: Box<Spanned<Expr>>,
        negated: bool,
    },
    Like {
        expr: Box<Spanned<Expr>>,
        pattern: Box<Spanned<Expr>>,
        escape: Option<Box<Spanned<Expr>>>,
        negated: bool,
    },
    InList {
        expr: Box<Spanned<Expr>>,
        list: Vec<Spanned<Expr>>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Spanned<Expr>>,
        query: Box<QuerySpec>,
        negated: bool,
    },
    Exists(Box<QuerySpec>),
    Not(Box<Spanned<Expr>>),
    And(Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    Or(Box<Spanned<Expr>>, Box<Spanned<Expr>>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Decimal(f64),
    String(String),
    Boolean(bool),
    Null,
}

/// `:name` or `?1`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParameterRef {
    Named(String),
    Positional(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ComparisonOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::NotEq => "<>",
            ComparisonOp::Lt => "<",
            ComparisonOp::LtEq => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::GtEq => ">=",
        }
    }
}

impl ArithmeticOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
            ArithmeticOp::Modulo => "%",
            ArithmeticOp::Concat => "||",
        }
    }
}

/// Build a spanned binary node covering both operands.
pub(crate) fn spanned_binary(
    lhs: Spanned<Expr>,
    rhs: Spanned<Expr>,
    build: impl FnOnce(Box<Spanned<Expr>>, Box<Spanned<Expr>>) -> Expr,
) -> Spanned<Expr> {
    let span: Span = merge(&lhs.span, &rhs.span);
    Spanned::new(build(Box::new(lhs), Box::new(rhs)), span)
}
