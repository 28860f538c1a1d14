//! Select-list expansion into result shapes, including fetch joins.
//!
//! An entity selection reads its identifier first, then every other attribute
//! in name order. To-one and plural attributes are fetched when the query
//! names them in a `join fetch` or when the mapping declares them eager. Eager
//! fetches stop at an entity already on the fetch stack and at the configured
//! depth.

use tracing::trace;

use crate::error::{QueryError, QueryResult};
use crate::metamodel::{AttributeKind, FetchTiming, PluralElement, TableName};
use crate::results::{
    BasicResult, CollectionResult, ComponentResult, DomainResult, EntityResult, FieldKind,
    FieldResult,
};
use crate::sql::{SqlExpr, SqlJoinKind, TableJoin, TableReference};
use crate::sqm::{
    EntitySource, NavigablePath, SqmEmbeddedPath, SqmExpression, SqmJoinAssociation,
    SqmSelection,
};

use super::SqmConverter;

/// Where the columns of one managed type come from.
struct ColumnSource<'p> {
    /// Table-owning from element.
    from: &'p NavigablePath,
    qualifier: Option<String>,
    /// Entity owning the table, for plural keys.
    owner: &'p str,
    column_prefix: String,
    /// Attribute path from `from` down to the current type, dot terminated.
    role_prefix: String,
}

impl ColumnSource<'_> {
    fn column(&self, column: &str) -> SqlExpr {
        SqlExpr::column(
            self.qualifier.as_deref(),
            format!("{}{}", self.column_prefix, column),
        )
    }

    fn role(&self, attribute: &str) -> String {
        format!("{}{}", self.role_prefix, attribute)
    }
}

fn push_column(columns: &mut Vec<SqlExpr>, column: SqlExpr) -> usize {
    columns.push(column);
    columns.len() - 1
}

impl SqmConverter<'_> {
    pub(super) fn domain_result(
        &mut self,
        columns: &mut Vec<SqlExpr>,
        selection: &SqmSelection,
    ) -> QueryResult<DomainResult> {
        match &selection.expression {
            SqmExpression::EntityPath(path) => match &path.source {
                EntitySource::FromElement(from) => {
                    let mut stack = Vec::new();
                    let entity = self.entity_result(columns, from, &path.entity, &mut stack)?;
                    Ok(DomainResult::Entity(entity))
                }
                EntitySource::ForeignKey { .. } => self.basic_result(columns, selection),
            },
            SqmExpression::EmbeddedPath(path) => {
                let mut stack = Vec::new();
                Ok(DomainResult::Embedded(
                    self.embedded_result(columns, path, &mut stack)?,
                ))
            }
            _ => self.basic_result(columns, selection),
        }
    }

    fn basic_result(
        &mut self,
        columns: &mut Vec<SqlExpr>,
        selection: &SqmSelection,
    ) -> QueryResult<DomainResult> {
        let value_type = selection
            .expression
            .expressable_type()
            .and_then(|t| t.value_type());
        let column = push_column(columns, self.expression(&selection.expression)?);
        Ok(DomainResult::Basic(BasicResult {
            column,
            value_type,
            alias: selection.alias.clone(),
        }))
    }

    fn embedded_result(
        &mut self,
        columns: &mut Vec<SqlExpr>,
        path: &SqmEmbeddedPath,
        stack: &mut Vec<String>,
    ) -> QueryResult<ComponentResult> {
        let owner = self
            .registry
            .element(&path.from)?
            .entity
            .clone()
            .ok_or_else(|| {
                QueryError::semantic(format!("'{}' does not belong to an entity", path.path))
            })?;
        let role_prefix: String = path.path.segments()[path.from.depth()..]
            .iter()
            .map(|s| format!("{}.", s.name))
            .collect();
        let source = ColumnSource {
            from: &path.from,
            qualifier: self.registry.qualifier(&path.from)?,
            owner: &owner,
            column_prefix: path.prefix.clone(),
            role_prefix,
        };
        stack.push(owner.clone());
        let fields = self.attribute_fields(columns, &source, &path.embeddable, stack);
        stack.pop();
        Ok(ComponentResult {
            embeddable: path.embeddable.clone(),
            representation: self.managed(&path.embeddable)?.representation,
            fields: fields?,
        })
    }

    fn entity_result(
        &mut self,
        columns: &mut Vec<SqlExpr>,
        from: &NavigablePath,
        entity: &str,
        stack: &mut Vec<String>,
    ) -> QueryResult<EntityResult> {
        let source = ColumnSource {
            from,
            qualifier: self.registry.qualifier(from)?,
            owner: entity,
            column_prefix: String::new(),
            role_prefix: String::new(),
        };
        let id_column = push_column(columns, source.column(&self.identifier_column(entity)?));
        stack.push(entity.to_string());
        let fields = self.attribute_fields(columns, &source, entity, stack);
        stack.pop();
        Ok(EntityResult {
            entity: entity.to_string(),
            representation: self.managed(entity)?.representation,
            id_column,
            fields: fields?,
        })
    }

    fn attribute_fields(
        &mut self,
        columns: &mut Vec<SqlExpr>,
        source: &ColumnSource<'_>,
        type_name: &str,
        stack: &mut Vec<String>,
    ) -> QueryResult<Vec<FieldResult>> {
        let metamodel = self.metamodel;
        let mut fields = Vec::new();
        for attribute in metamodel.attributes_of(type_name) {
            let kind = match &attribute.kind {
                AttributeKind::Identifier { .. } => continue,
                AttributeKind::Basic { basic, column, .. } => FieldKind::Basic {
                    column: push_column(columns, source.column(column)),
                    value_type: basic.value_type,
                },
                AttributeKind::Embedded {
                    embeddable,
                    column_prefix,
                } => {
                    let nested = ColumnSource {
                        from: source.from,
                        qualifier: source.qualifier.clone(),
                        owner: source.owner,
                        column_prefix: format!("{}{}", source.column_prefix, column_prefix),
                        role_prefix: format!("{}.", source.role(&attribute.name)),
                    };
                    FieldKind::Component(ComponentResult {
                        embeddable: embeddable.clone(),
                        representation: self.managed(embeddable)?.representation,
                        fields: self.attribute_fields(columns, &nested, embeddable, stack)?,
                    })
                }
                AttributeKind::ToOne {
                    target,
                    join_column,
                    optional,
                    fetch,
                } => {
                    let role = source.role(&attribute.name);
                    match self.fetched_path(source.from, &role, *fetch, Some(target.as_str()), stack) {
                        Some(explicit) => {
                            let path = match explicit {
                                Some(path) => path,
                                None => {
                                    let association = SqmJoinAssociation::ToOne {
                                        target: target.clone(),
                                        fk_column: format!("{}{}", source.column_prefix, join_column),
                                        target_id_column: self.identifier_column(target)?,
                                        optional: *optional,
                                    };
                                    // An inner join off an outer-joined owner would drop
                                    // the rows where the owner is absent.
                                    let owner_nullable = self.registry.element(source.from)?.nullable;
                                    let kind = if *optional || owner_nullable {
                                        SqlJoinKind::LeftOuter
                                    } else {
                                        SqlJoinKind::Inner
                                    };
                                    self.fetch_join(source.from, &role, association, kind)?
                                }
                            };
                            let fetched = self.entity_result(columns, &path, target, stack)?;
                            FieldKind::Fetched(Box::new(fetched))
                        }
                        None => FieldKind::Reference {
                            entity: target.clone(),
                            column: push_column(columns, source.column(join_column)),
                        },
                    }
                }
                AttributeKind::Plural {
                    element,
                    key_column,
                    fetch,
                } => {
                    let role = source.role(&attribute.name);
                    let target = match element {
                        PluralElement::Entity { target } => Some(target.as_str()),
                        PluralElement::Basic { .. } => None,
                    };
                    let fetched = self.fetched_path(source.from, &role, *fetch, target, stack);
                    match fetched {
                        None => FieldKind::LazyCollection,
                        Some(explicit) => {
                            let path = match explicit {
                                Some(path) => path,
                                None => {
                                    let owner_id_column = self.identifier_column(source.owner)?;
                                    let association = match element {
                                        PluralElement::Entity { target } => {
                                            SqmJoinAssociation::OneToMany {
                                                target: target.clone(),
                                                key_column: key_column.clone(),
                                                owner_id_column,
                                            }
                                        }
                                        PluralElement::Basic {
                                            basic,
                                            table,
                                            column,
                                        } => SqmJoinAssociation::ElementCollection {
                                            basic: *basic,
                                            table: TableName::new(table.as_str()),
                                            column: column.clone(),
                                            key_column: key_column.clone(),
                                            owner_id_column,
                                        },
                                    };
                                    self.fetch_join(
                                        source.from,
                                        &role,
                                        association,
                                        SqlJoinKind::LeftOuter,
                                    )?
                                }
                            };
                            FieldKind::Collection(match element {
                                PluralElement::Entity { target } => CollectionResult::Entities(
                                    Box::new(self.entity_result(columns, &path, target, stack)?),
                                ),
                                PluralElement::Basic { basic, column, .. } => {
                                    let qualifier = self.registry.qualifier(&path)?;
                                    CollectionResult::Values {
                                        column: push_column(
                                            columns,
                                            SqlExpr::column(qualifier.as_deref(), column.as_str()),
                                        ),
                                        value_type: basic.value_type,
                                    }
                                }
                            })
                        }
                    }
                }
            };
            fields.push(FieldResult {
                name: attribute.name.clone(),
                kind,
            });
        }
        Ok(fields)
    }

    /// Whether the association at `role` is fetched. `Some(Some(path))` is an
    /// explicit fetch join of the query, `Some(None)` an eager fetch that
    /// still needs a join, `None` leaves the association unfetched.
    fn fetched_path(
        &self,
        from: &NavigablePath,
        role: &str,
        timing: FetchTiming,
        target: Option<&str>,
        stack: &[String],
    ) -> Option<Option<NavigablePath>> {
        if let Some(path) = self.registry.fetch_join(from, role) {
            return Some(Some(path));
        }
        let eager = timing == FetchTiming::Eager
            && stack.len() < self.options.max_fetch_depth
            && target.map_or(true, |t| !stack.iter().any(|e| e == t));
        if !eager {
            return None;
        }
        match self.registry.reusable_join(from, role) {
            Some(path) => {
                trace!(join = %path, "reusing join for eager fetch");
                Some(Some(path))
            }
            None => Some(None),
        }
    }

    /// Add a join for a fetch the query did not spell out.
    fn fetch_join(
        &mut self,
        from: &NavigablePath,
        role: &str,
        association: SqmJoinAssociation,
        kind: SqlJoinKind,
    ) -> QueryResult<NavigablePath> {
        let path = role
            .split('.')
            .fold(from.clone(), |path, segment| path.append(segment, None));
        let table = match &association {
            SqmJoinAssociation::ToOne { target, .. }
            | SqmJoinAssociation::OneToMany { target, .. } => self.table_of(target)?,
            SqmJoinAssociation::ElementCollection { table, .. } => table.clone(),
        };
        let lhs = self.registry.element(from)?.alias.clone();
        let alias = self.aliases.next_alias();
        let predicate = self.join_predicate(&association, &lhs, &alias)?;
        self.registry.add_join(
            path.clone(),
            association.target_entity(),
            from,
            role,
            true,
            true,
            TableJoin {
                kind,
                table: TableReference { table, alias },
                predicate,
            },
        )?;
        trace!(join = %path, "created fetch join");
        Ok(path)
    }
}
