//! The semantic query model: a typed, metamodel-resolved query tree.
//!
//! Every domain path has been resolved to a column, an entity reference or an
//! embedded component, and every join (explicit or implicit) is listed on the
//! root it hangs off in document order. The converter consumes the tree once.

use crate::hql::ast::{ArithmeticOp, ComparisonOp, JoinKind, NullPrecedence, SortDirection};
use crate::metamodel::{BasicType, TableName, ValueType};
use crate::query::parameter::{ParameterName, QueryParameter, Value};

use super::path::NavigablePath;
use super::types::ExpressableType;

#[derive(Debug, Clone, PartialEq)]
pub enum SqmStatement {
    Select(SqmSelectStatement),
    Update(SqmUpdateStatement),
    Delete(SqmDeleteStatement),
}

impl SqmStatement {
    /// Parameters declared by the statement, in first-occurrence order.
    pub fn parameters(&self) -> &[QueryParameter] {
        match self {
            SqmStatement::Select(s) => &s.parameters,
            SqmStatement::Update(u) => &u.parameters,
            SqmStatement::Delete(d) => &d.parameters,
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self, SqmStatement::Select(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmSelectStatement {
    pub query: SqmQuerySpec,
    pub order_by: Vec<SqmSortSpecification>,
    pub limit: Option<SqmExpression>,
    pub offset: Option<SqmExpression>,
    pub parameters: Vec<QueryParameter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmQuerySpec {
    pub distinct: bool,
    pub selections: Vec<SqmSelection>,
    pub from: SqmFromClause,
    pub where_clause: Option<SqmPredicate>,
    pub group_by: Vec<SqmExpression>,
    pub having: Option<SqmPredicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmSelection {
    pub expression: SqmExpression,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqmFromClause {
    pub roots: Vec<SqmRoot>,
}

impl SqmFromClause {
    /// All joins of all roots, in document order per root.
    pub fn joins(&self) -> impl Iterator<Item = &SqmJoin> {
        self.roots.iter().flat_map(|r| r.joins.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmRoot {
    pub path: NavigablePath,
    pub entity: String,
    pub alias: Option<String>,
    pub joins: Vec<SqmJoin>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmJoin {
    pub path: NavigablePath,
    /// Table-owning from element the join hangs off.
    pub lhs: NavigablePath,
    /// Attribute path relative to `lhs` (`department`, `address.country`).
    pub attribute: String,
    pub kind: JoinKind,
    pub association: SqmJoinAssociation,
    pub fetch: bool,
    pub implicit: bool,
    pub alias: Option<String>,
    pub condition: Option<SqmPredicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqmJoinAssociation {
    /// `lhs.fk_column = target.target_id_column`
    ToOne {
        target: String,
        fk_column: String,
        target_id_column: String,
        optional: bool,
    },
    /// `target.key_column = lhs.owner_id_column`
    OneToMany {
        target: String,
        key_column: String,
        owner_id_column: String,
    },
    /// Element collection table joined on its key column.
    ElementCollection {
        basic: BasicType,
        table: TableName,
        column: String,
        key_column: String,
        owner_id_column: String,
    },
}

impl SqmJoinAssociation {
    /// Entity the join produces rows of, if any.
    pub fn target_entity(&self) -> Option<&str> {
        match self {
            SqmJoinAssociation::ToOne { target, .. }
            | SqmJoinAssociation::OneToMany { target, .. } => Some(target),
            SqmJoinAssociation::ElementCollection { .. } => None,
        }
    }

    pub fn is_plural(&self) -> bool {
        !matches!(self, SqmJoinAssociation::ToOne { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmBasicPath {
    pub path: NavigablePath,
    /// From element whose table holds the column.
    pub from: NavigablePath,
    pub column: String,
    pub basic: BasicType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntitySource {
    /// The entity is a from element of its own (root or join).
    FromElement(NavigablePath),
    /// Only the foreign key on the owning table is known.
    ForeignKey {
        from: NavigablePath,
        column: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmEntityPath {
    pub path: NavigablePath,
    pub entity: String,
    pub id: BasicType,
    pub source: EntitySource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmEmbeddedPath {
    pub path: NavigablePath,
    pub from: NavigablePath,
    /// Column prefix accumulated along the path.
    pub prefix: String,
    pub embeddable: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqmExpression {
    BasicPath(SqmBasicPath),
    EntityPath(SqmEntityPath),
    EmbeddedPath(SqmEmbeddedPath),
    Literal {
        value: Value,
        ty: Option<ExpressableType>,
    },
    Parameter {
        name: ParameterName,
    },
    Binary {
        op: ArithmeticOp,
        lhs: Box<SqmExpression>,
        rhs: Box<SqmExpression>,
        ty: Option<ExpressableType>,
    },
    Negated(Box<SqmExpression>),
    Function {
        name: String,
        distinct: bool,
        args: Vec<SqmExpression>,
        ty: ExpressableType,
    },
    CountStar,
}

impl SqmExpression {
    pub fn as_parameter(&self) -> Option<&ParameterName> {
        match self {
            SqmExpression::Parameter { name } => Some(name),
            _ => None,
        }
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self, SqmExpression::Literal { value: Value::Null, .. })
    }

    /// Type of the expression; `None` until inferred (parameters, `null`).
    pub fn expressable_type(&self) -> Option<ExpressableType> {
        match self {
            SqmExpression::BasicPath(path) => Some(ExpressableType::Basic(path.basic)),
            SqmExpression::EntityPath(path) => Some(ExpressableType::Entity {
                name: path.entity.clone(),
                id: path.id,
            }),
            SqmExpression::EmbeddedPath(path) => {
                Some(ExpressableType::Embeddable(path.embeddable.clone()))
            }
            SqmExpression::Literal { ty, .. } | SqmExpression::Binary { ty, .. } => ty.clone(),
            SqmExpression::Parameter { .. } => None,
            SqmExpression::Negated(inner) => inner.expressable_type(),
            SqmExpression::Function { ty, .. } => Some(ty.clone()),
            SqmExpression::CountStar => Some(ExpressableType::basic(ValueType::Long)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JunctionKind {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqmPredicate {
    Junction {
        kind: JunctionKind,
        predicates: Vec<SqmPredicate>,
    },
    Negated(Box<SqmPredicate>),
    Comparison {
        op: ComparisonOp,
        lhs: SqmExpression,
        rhs: SqmExpression,
    },
    NullCheck {
        expr: SqmExpression,
        negated: bool,
    },
    Between {
        expr: SqmExpression,
        low: SqmExpression,
        high: SqmExpression,
        negated: bool,
    },
    Like {
        expr: SqmExpression,
        pattern: SqmExpression,
        escape: Option<SqmExpression>,
        negated: bool,
    },
    InList {
        expr: SqmExpression,
        list: Vec<SqmExpression>,
        negated: bool,
    },
    InSubquery {
        expr: SqmExpression,
        query: Box<SqmQuerySpec>,
        negated: bool,
    },
    Exists {
        query: Box<SqmQuerySpec>,
        negated: bool,
    },
    /// A boolean-valued expression used as a predicate.
    BooleanExpression(SqmExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmSortSpecification {
    pub expression: SqmExpression,
    pub direction: SortDirection,
    pub nulls: Option<NullPrecedence>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmAssignment {
    pub path: NavigablePath,
    pub column: String,
    pub basic: BasicType,
    pub value: SqmExpression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmUpdateStatement {
    pub root: SqmRoot,
    pub assignments: Vec<SqmAssignment>,
    pub where_clause: Option<SqmPredicate>,
    pub parameters: Vec<QueryParameter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmDeleteStatement {
    pub root: SqmRoot,
    pub where_clause: Option<SqmPredicate>,
    pub parameters: Vec<QueryParameter>,
}
