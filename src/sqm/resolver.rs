//! Path resolution against the metamodel.
//!
//! The resolver owns the from clauses under construction, one scope per
//! (sub-)query. Dotted paths are resolved left to right:
//!
//! - the first segment names a from element of the current or an enclosing
//!   scope, or (with a single root) an attribute of that root;
//! - embedded attributes extend the column prefix without a join;
//! - dereferencing a to-one or plural attribute creates an implicit inner
//!   join, reusing an existing alias-less join of the same role;
//! - `x.toOne.<id>` reads the foreign key and needs no join.
//!
//! Results are cached per navigable path for the lifetime of the resolver,
//! which is one compilation.

use std::collections::HashMap;

use tracing::trace;

use crate::error::{QueryError, QueryResult};
use crate::hql::ast::JoinKind;
use crate::metamodel::{Attribute, AttributeKind, BasicType, MetamodelAccess, PluralElement, TableName};

use super::path::NavigablePath;
use super::tree::*;

#[derive(Debug, Clone)]
struct FromElement {
    path: NavigablePath,
    kind: FromElementKind,
}

#[derive(Debug, Clone)]
enum FromElementKind {
    Entity {
        entity: String,
    },
    /// An aliased embedded component (`join p.address a`); no table of its own.
    Embedded {
        embeddable: String,
        owner: NavigablePath,
        owner_entity: String,
        prefix: String,
        attribute_prefix: String,
    },
    /// Value of an element collection join.
    Element {
        basic: BasicType,
        column: String,
    },
}

/// Position reached while walking a path.
#[derive(Debug, Clone)]
enum Cursor {
    Managed {
        type_name: String,
        /// Entity owning the table `from` denotes.
        owner_entity: String,
        from: NavigablePath,
        prefix: String,
        attribute_prefix: String,
        path: NavigablePath,
        text: String,
    },
    Element {
        basic: BasicType,
        text: String,
    },
}

#[derive(Debug, Default)]
struct Scope {
    roots: Vec<SqmRoot>,
    aliases: HashMap<String, FromElement>,
    dml: bool,
}

fn dotted(text: &str, segment: &str) -> String {
    if text.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", text, segment)
    }
}

pub(crate) struct PathResolver<'m> {
    metamodel: &'m dyn MetamodelAccess,
    scopes: Vec<Scope>,
    cache: HashMap<(NavigablePath, bool), SqmExpression>,
    next_root_id: u32,
}

impl<'m> PathResolver<'m> {
    pub fn new(metamodel: &'m dyn MetamodelAccess) -> Self {
        Self {
            metamodel,
            scopes: Vec::new(),
            cache: HashMap::new(),
            next_root_id: 0,
        }
    }

    pub fn metamodel(&self) -> &'m dyn MetamodelAccess {
        self.metamodel
    }

    pub fn push_scope(&mut self, dml: bool) {
        self.scopes.push(Scope {
            dml,
            ..Scope::default()
        });
    }

    pub fn pop_scope(&mut self) -> SqmFromClause {
        let scope = self.scopes.pop().unwrap_or_default();
        SqmFromClause { roots: scope.roots }
    }

    fn innermost(&self) -> QueryResult<usize> {
        self.scopes
            .len()
            .checked_sub(1)
            .ok_or_else(|| QueryError::semantic("Path resolved outside of any from clause"))
    }

    fn scope_mut(&mut self, index: usize) -> QueryResult<&mut Scope> {
        self.scopes
            .get_mut(index)
            .ok_or_else(|| QueryError::semantic("Path resolved outside of any from clause"))
    }

    /// Root paths and entity names of the innermost scope, in document order.
    pub fn roots(&self) -> Vec<(NavigablePath, String)> {
        self.scopes
            .last()
            .map(|scope| {
                scope
                    .roots
                    .iter()
                    .map(|r| (r.path.clone(), r.entity.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Joins of the innermost scope, in document order per root.
    pub fn joins(&self) -> Vec<&SqmJoin> {
        self.scopes
            .last()
            .map(|scope| scope.roots.iter().flat_map(|r| r.joins.iter()).collect())
            .unwrap_or_default()
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        let key = alias.to_lowercase();
        self.scopes.iter().any(|s| s.aliases.contains_key(&key))
    }

    fn register_alias(&mut self, alias: &str, element: FromElement) -> QueryResult<()> {
        if self.has_alias(alias) {
            return Err(QueryError::semantic(format!(
                "Alias '{}' is used for more than one from element",
                alias
            )));
        }
        let index = self.innermost()?;
        self.scope_mut(index)?
            .aliases
            .insert(alias.to_lowercase(), element);
        Ok(())
    }

    // =========================================================================
    // From clause construction
    // =========================================================================

    pub fn add_root(&mut self, entity: &str, alias: Option<&str>) -> QueryResult<NavigablePath> {
        let managed = self
            .metamodel
            .resolve_managed_type(entity)
            .filter(|m| m.is_entity())
            .ok_or_else(|| QueryError::UnknownEntity {
                name: entity.to_string(),
            })?;
        let entity = managed.name.clone();

        let path = NavigablePath::root(self.next_root_id, entity.as_str(), alias);
        self.next_root_id += 1;

        if let Some(alias) = alias {
            self.register_alias(
                alias,
                FromElement {
                    path: path.clone(),
                    kind: FromElementKind::Entity {
                        entity: entity.clone(),
                    },
                },
            )?;
        }
        let index = self.innermost()?;
        self.scope_mut(index)?.roots.push(SqmRoot {
            path: path.clone(),
            entity,
            alias: alias.map(str::to_string),
            joins: Vec::new(),
        });
        trace!(root = %path, "registered root");
        Ok(path)
    }

    /// Register an explicit join. Returns the path of the joined element.
    pub fn add_join(
        &mut self,
        segments: &[String],
        kind: JoinKind,
        fetch: bool,
        alias: Option<&str>,
    ) -> QueryResult<NavigablePath> {
        let full = segments.join(".");
        let innermost = self.innermost()?;
        let (scope, element, remaining) = self.locate_start(segments)?;
        if scope != innermost {
            return Err(QueryError::unsupported(format!(
                "join through correlated reference '{}'",
                full
            )));
        }
        let Some((last, init)) = remaining.split_last() else {
            return Err(QueryError::semantic(format!(
                "Join path '{}' does not navigate an attribute",
                full
            )));
        };

        let mut cursor = self.cursor_for(&element, segments, remaining)?;
        for (i, segment) in init.iter().enumerate() {
            cursor = self.dereference(scope, cursor, segment, &remaining[i + 1], &full)?;
        }

        let (type_name, owner_entity, from, prefix, attribute_prefix, path, text) = match cursor {
            Cursor::Managed {
                type_name,
                owner_entity,
                from,
                prefix,
                attribute_prefix,
                path,
                text,
            } => (type_name, owner_entity, from, prefix, attribute_prefix, path, text),
            Cursor::Element { basic, text } => {
                return Err(QueryError::IllegalDereference {
                    path: text,
                    segment: last.clone(),
                    type_name: basic.value_type.to_string(),
                });
            }
        };

        let attribute = self.attribute(&type_name, last, &full)?;
        let join_path = path.append(last, alias);
        match &attribute.kind {
            AttributeKind::Embedded {
                embeddable,
                column_prefix,
            } => {
                if fetch {
                    return Err(QueryError::semantic(format!(
                        "Embedded attribute '{}' cannot be join fetched",
                        full
                    )));
                }
                if let Some(alias) = alias {
                    self.register_alias(
                        alias,
                        FromElement {
                            path: join_path.clone(),
                            kind: FromElementKind::Embedded {
                                embeddable: embeddable.clone(),
                                owner: from,
                                owner_entity,
                                prefix: format!("{}{}", prefix, column_prefix),
                                attribute_prefix: format!("{}{}.", attribute_prefix, last),
                            },
                        },
                    )?;
                }
                Ok(join_path)
            }
            AttributeKind::ToOne { .. } | AttributeKind::Plural { .. } => {
                let association = self.association(&owner_entity, attribute, &prefix)?;
                let element_kind = match &attribute.kind {
                    AttributeKind::Plural {
                        element: PluralElement::Basic { basic, column, .. },
                        ..
                    } => FromElementKind::Element {
                        basic: *basic,
                        column: column.clone(),
                    },
                    AttributeKind::ToOne { target, .. }
                    | AttributeKind::Plural {
                        element: PluralElement::Entity { target },
                        ..
                    } => FromElementKind::Entity {
                        entity: target.clone(),
                    },
                    _ => {
                        return Err(QueryError::semantic(format!("Cannot join '{}'", full)));
                    }
                };
                if let Some(alias) = alias {
                    self.register_alias(
                        alias,
                        FromElement {
                            path: join_path.clone(),
                            kind: element_kind,
                        },
                    )?;
                }
                let join = SqmJoin {
                    path: join_path.clone(),
                    lhs: from,
                    attribute: format!("{}{}", attribute_prefix, last),
                    kind,
                    association,
                    fetch,
                    implicit: false,
                    alias: alias.map(str::to_string),
                    condition: None,
                };
                self.push_join(scope, join)?;
                trace!(join = %join_path, path = %text, fetch, "registered explicit join");
                Ok(join_path)
            }
            AttributeKind::Identifier { .. } | AttributeKind::Basic { .. } => {
                Err(QueryError::semantic(format!(
                    "Cannot join basic attribute '{}'",
                    full
                )))
            }
        }
    }

    pub fn set_join_condition(
        &mut self,
        join: &NavigablePath,
        condition: SqmPredicate,
    ) -> QueryResult<()> {
        let index = self.innermost()?;
        let target = self
            .scope_mut(index)?
            .roots
            .iter_mut()
            .flat_map(|r| r.joins.iter_mut())
            .find(|j| j.path == *join)
            .ok_or_else(|| {
                QueryError::semantic(format!("Join '{}' does not accept a condition", join))
            })?;
        target.condition = Some(condition);
        Ok(())
    }

    fn push_join(&mut self, scope: usize, join: SqmJoin) -> QueryResult<()> {
        let root_id = join.lhs.root_id();
        let root = self
            .scope_mut(scope)?
            .roots
            .iter_mut()
            .find(|r| r.path.root_id() == root_id)
            .ok_or_else(|| {
                QueryError::semantic(format!("No root owns join '{}'", join.path))
            })?;
        root.joins.push(join);
        Ok(())
    }

    // =========================================================================
    // Path resolution
    // =========================================================================

    /// Resolve a dotted path. In a `select_context` a terminal to-one is
    /// joined so the entity can be selected as a whole.
    pub fn resolve_path(
        &mut self,
        segments: &[String],
        select_context: bool,
    ) -> QueryResult<SqmExpression> {
        let full = segments.join(".");
        let (scope, element, remaining) = self.locate_start(segments)?;

        let key_path = remaining
            .iter()
            .fold(element.path.clone(), |path, s| path.append(s, None));
        let key = (key_path, select_context);
        if let Some(hit) = self.cache.get(&key) {
            trace!(path = %key.0, "resolver cache hit");
            return Ok(hit.clone());
        }

        let expression = match remaining.split_last() {
            None => self.from_element_expression(&element)?,
            Some((last, init)) => {
                let mut cursor = self.cursor_for(&element, segments, remaining)?;
                let mut resolved = None;
                for (i, segment) in init.iter().enumerate() {
                    if i + 1 == init.len() {
                        if let Some(shortcut) = self.foreign_key_shortcut(&cursor, segment, last)? {
                            resolved = Some(shortcut);
                            break;
                        }
                    }
                    cursor = self.dereference(scope, cursor, segment, &remaining[i + 1], &full)?;
                }
                match resolved {
                    Some(expression) => expression,
                    None => self.terminal(scope, cursor, last, &full, select_context)?,
                }
            }
        };

        self.cache.insert(key, expression.clone());
        Ok(expression)
    }

    /// Find the from element a path starts at: the scope index, the element
    /// and the attribute segments left to walk.
    fn locate_start<'s>(
        &self,
        segments: &'s [String],
    ) -> QueryResult<(usize, FromElement, &'s [String])> {
        let first = segments
            .first()
            .ok_or_else(|| QueryError::semantic("Empty path"))?;
        let key = first.to_lowercase();
        for (index, scope) in self.scopes.iter().enumerate().rev() {
            if let Some(element) = scope.aliases.get(&key) {
                return Ok((index, element.clone(), &segments[1..]));
            }
        }

        let innermost = self.innermost()?;
        let scope = &self.scopes[innermost];
        match scope.roots.as_slice() {
            [root] => Ok((
                innermost,
                FromElement {
                    path: root.path.clone(),
                    kind: FromElementKind::Entity {
                        entity: root.entity.clone(),
                    },
                },
                segments,
            )),
            _ => Err(QueryError::UnresolvedNavigable {
                path: segments.join("."),
                owner: "from clause".into(),
                segment: first.clone(),
            }),
        }
    }

    /// Starting cursor for a from element. `text` is the part of the written
    /// path that named the element (empty for an unqualified attribute).
    fn cursor_for(
        &self,
        element: &FromElement,
        segments: &[String],
        remaining: &[String],
    ) -> QueryResult<Cursor> {
        let text = segments[..segments.len() - remaining.len()].join(".");
        Ok(match &element.kind {
            FromElementKind::Entity { entity } => Cursor::Managed {
                type_name: entity.clone(),
                owner_entity: entity.clone(),
                from: element.path.clone(),
                prefix: String::new(),
                attribute_prefix: String::new(),
                path: element.path.clone(),
                text,
            },
            FromElementKind::Embedded {
                embeddable,
                owner,
                owner_entity,
                prefix,
                attribute_prefix,
            } => Cursor::Managed {
                type_name: embeddable.clone(),
                owner_entity: owner_entity.clone(),
                from: owner.clone(),
                prefix: prefix.clone(),
                attribute_prefix: attribute_prefix.clone(),
                path: element.path.clone(),
                text,
            },
            FromElementKind::Element { basic, .. } => Cursor::Element { basic: *basic, text },
        })
    }

    fn from_element_expression(&self, element: &FromElement) -> QueryResult<SqmExpression> {
        Ok(match &element.kind {
            FromElementKind::Entity { entity } => SqmExpression::EntityPath(SqmEntityPath {
                path: element.path.clone(),
                entity: entity.clone(),
                id: self.identifier_type(entity)?,
                source: EntitySource::FromElement(element.path.clone()),
            }),
            FromElementKind::Embedded {
                embeddable,
                owner,
                prefix,
                ..
            } => SqmExpression::EmbeddedPath(SqmEmbeddedPath {
                path: element.path.clone(),
                from: owner.clone(),
                prefix: prefix.clone(),
                embeddable: embeddable.clone(),
            }),
            FromElementKind::Element { basic, column } => SqmExpression::BasicPath(SqmBasicPath {
                path: element.path.clone(),
                from: element.path.clone(),
                column: column.clone(),
                basic: *basic,
            }),
        })
    }

    fn attribute(&self, type_name: &str, segment: &str, full: &str) -> QueryResult<&'m Attribute> {
        self.metamodel
            .resolve_attribute(type_name, segment)
            .ok_or_else(|| QueryError::UnresolvedNavigable {
                path: full.to_string(),
                owner: type_name.to_string(),
                segment: segment.to_string(),
            })
    }

    fn identifier(&self, entity: &str) -> QueryResult<&'m Attribute> {
        self.metamodel
            .identifier_of(entity)
            .ok_or_else(|| QueryError::semantic(format!("Entity '{}' has no identifier", entity)))
    }

    fn identifier_type(&self, entity: &str) -> QueryResult<BasicType> {
        self.identifier(entity)?
            .basic_type()
            .ok_or_else(|| QueryError::semantic(format!("Entity '{}' has no identifier", entity)))
    }

    fn identifier_column(&self, entity: &str) -> QueryResult<String> {
        self.identifier(entity)?
            .column()
            .map(str::to_string)
            .ok_or_else(|| QueryError::semantic(format!("Entity '{}' has no identifier", entity)))
    }

    /// `x.toOne.<target id>` reads the foreign key column directly.
    fn foreign_key_shortcut(
        &self,
        cursor: &Cursor,
        segment: &str,
        last: &str,
    ) -> QueryResult<Option<SqmExpression>> {
        let Cursor::Managed {
            type_name,
            from,
            prefix,
            path,
            ..
        } = cursor
        else {
            return Ok(None);
        };
        let Some(attribute) = self.metamodel.resolve_attribute(type_name, segment) else {
            return Ok(None);
        };
        let AttributeKind::ToOne {
            target,
            join_column,
            ..
        } = &attribute.kind
        else {
            return Ok(None);
        };
        let identifier = self.identifier(target)?;
        if identifier.name != last {
            return Ok(None);
        }
        let basic = self.identifier_type(target)?;
        Ok(Some(SqmExpression::BasicPath(SqmBasicPath {
            path: path.append(segment, None).append(last, None),
            from: from.clone(),
            column: format!("{}{}", prefix, join_column),
            basic,
        })))
    }

    /// Step through a non-terminal segment; `next` is the segment after it.
    fn dereference(
        &mut self,
        scope: usize,
        cursor: Cursor,
        segment: &str,
        next: &str,
        full: &str,
    ) -> QueryResult<Cursor> {
        let (type_name, owner_entity, from, prefix, attribute_prefix, path, text) = match cursor {
            Cursor::Element { basic, text } => {
                return Err(QueryError::IllegalDereference {
                    path: text,
                    segment: segment.to_string(),
                    type_name: basic.value_type.to_string(),
                });
            }
            Cursor::Managed {
                type_name,
                owner_entity,
                from,
                prefix,
                attribute_prefix,
                path,
                text,
            } => (type_name, owner_entity, from, prefix, attribute_prefix, path, text),
        };

        let attribute = self.attribute(&type_name, segment, full)?;
        let text = dotted(&text, segment);
        match &attribute.kind {
            AttributeKind::Identifier { basic, .. } | AttributeKind::Basic { basic, .. } => {
                Err(QueryError::IllegalDereference {
                    path: text,
                    segment: next.to_string(),
                    type_name: basic.value_type.to_string(),
                })
            }
            AttributeKind::Embedded {
                embeddable,
                column_prefix,
            } => Ok(Cursor::Managed {
                type_name: embeddable.clone(),
                owner_entity,
                from,
                prefix: format!("{}{}", prefix, column_prefix),
                attribute_prefix: format!("{}{}.", attribute_prefix, segment),
                path: path.append(segment, None),
                text,
            }),
            AttributeKind::ToOne { target, .. } => {
                let join = self.implicit_join(
                    scope,
                    &owner_entity,
                    &from,
                    &prefix,
                    &attribute_prefix,
                    &path,
                    attribute,
                    full,
                )?;
                Ok(Cursor::Managed {
                    type_name: target.clone(),
                    owner_entity: target.clone(),
                    from: join.clone(),
                    prefix: String::new(),
                    attribute_prefix: String::new(),
                    path: join,
                    text,
                })
            }
            AttributeKind::Plural { element, .. } => {
                let join = self.implicit_join(
                    scope,
                    &owner_entity,
                    &from,
                    &prefix,
                    &attribute_prefix,
                    &path,
                    attribute,
                    full,
                )?;
                Ok(match element {
                    PluralElement::Entity { target } => Cursor::Managed {
                        type_name: target.clone(),
                        owner_entity: target.clone(),
                        from: join.clone(),
                        prefix: String::new(),
                        attribute_prefix: String::new(),
                        path: join,
                        text,
                    },
                    PluralElement::Basic { basic, .. } => Cursor::Element {
                        basic: *basic,
                        text,
                    },
                })
            }
        }
    }

    fn terminal(
        &mut self,
        scope: usize,
        cursor: Cursor,
        segment: &str,
        full: &str,
        select_context: bool,
    ) -> QueryResult<SqmExpression> {
        let (type_name, owner_entity, from, prefix, attribute_prefix, path) = match cursor {
            Cursor::Element { basic, text } => {
                return Err(QueryError::IllegalDereference {
                    path: text,
                    segment: segment.to_string(),
                    type_name: basic.value_type.to_string(),
                });
            }
            Cursor::Managed {
                type_name,
                owner_entity,
                from,
                prefix,
                attribute_prefix,
                path,
                ..
            } => (type_name, owner_entity, from, prefix, attribute_prefix, path),
        };

        let attribute = self.attribute(&type_name, segment, full)?;
        match &attribute.kind {
            AttributeKind::Identifier { basic, column } | AttributeKind::Basic { basic, column, .. } => {
                Ok(SqmExpression::BasicPath(SqmBasicPath {
                    path: path.append(segment, None),
                    from,
                    column: format!("{}{}", prefix, column),
                    basic: *basic,
                }))
            }
            AttributeKind::Embedded {
                embeddable,
                column_prefix,
            } => Ok(SqmExpression::EmbeddedPath(SqmEmbeddedPath {
                path: path.append(segment, None),
                from,
                prefix: format!("{}{}", prefix, column_prefix),
                embeddable: embeddable.clone(),
            })),
            AttributeKind::ToOne {
                target,
                join_column,
                ..
            } => {
                let id = self.identifier_type(target)?;
                if select_context {
                    let join = self.implicit_join(
                        scope,
                        &owner_entity,
                        &from,
                        &prefix,
                        &attribute_prefix,
                        &path,
                        attribute,
                        full,
                    )?;
                    Ok(SqmExpression::EntityPath(SqmEntityPath {
                        path: join.clone(),
                        entity: target.clone(),
                        id,
                        source: EntitySource::FromElement(join),
                    }))
                } else {
                    Ok(SqmExpression::EntityPath(SqmEntityPath {
                        path: path.append(segment, None),
                        entity: target.clone(),
                        id,
                        source: EntitySource::ForeignKey {
                            from,
                            column: format!("{}{}", prefix, join_column),
                        },
                    }))
                }
            }
            AttributeKind::Plural { .. } => Err(QueryError::unsupported(format!(
                "plural attribute path '{}' used as a value",
                full
            ))),
        }
    }

    /// Create (or reuse) the implicit join for `attribute` hanging off `from`.
    #[allow(clippy::too_many_arguments)]
    fn implicit_join(
        &mut self,
        scope: usize,
        owner_entity: &str,
        from: &NavigablePath,
        prefix: &str,
        attribute_prefix: &str,
        path: &NavigablePath,
        attribute: &Attribute,
        full: &str,
    ) -> QueryResult<NavigablePath> {
        let innermost = self.innermost()?;
        if scope != innermost {
            return Err(QueryError::unsupported(format!(
                "implicit join through correlated reference '{}'",
                full
            )));
        }
        if self.scopes[scope].dml {
            return Err(QueryError::unsupported(format!(
                "implicit join in update or delete statement ('{}')",
                full
            )));
        }

        let role = format!("{}{}", attribute_prefix, attribute.name);
        let existing = self.scopes[scope]
            .roots
            .iter()
            .flat_map(|r| r.joins.iter())
            .find(|j| j.lhs == *from && j.attribute == role && j.alias.is_none())
            .map(|j| j.path.clone());
        if let Some(existing) = existing {
            trace!(join = %existing, "reusing join");
            return Ok(existing);
        }

        let association = self.association(owner_entity, attribute, prefix)?;
        let join_path = path.append(&attribute.name, None);
        self.push_join(
            scope,
            SqmJoin {
                path: join_path.clone(),
                lhs: from.clone(),
                attribute: role,
                kind: JoinKind::Inner,
                association,
                fetch: false,
                implicit: true,
                alias: None,
                condition: None,
            },
        )?;
        trace!(join = %join_path, "created implicit join");
        Ok(join_path)
    }

    fn association(
        &self,
        owner_entity: &str,
        attribute: &Attribute,
        prefix: &str,
    ) -> QueryResult<SqmJoinAssociation> {
        match &attribute.kind {
            AttributeKind::ToOne {
                target,
                join_column,
                optional,
                ..
            } => Ok(SqmJoinAssociation::ToOne {
                target: target.clone(),
                fk_column: format!("{}{}", prefix, join_column),
                target_id_column: self.identifier_column(target)?,
                optional: *optional,
            }),
            AttributeKind::Plural {
                element: PluralElement::Entity { target },
                key_column,
                ..
            } => Ok(SqmJoinAssociation::OneToMany {
                target: target.clone(),
                key_column: key_column.clone(),
                owner_id_column: self.identifier_column(owner_entity)?,
            }),
            AttributeKind::Plural {
                element:
                    PluralElement::Basic {
                        basic,
                        table,
                        column,
                    },
                key_column,
                ..
            } => Ok(SqmJoinAssociation::ElementCollection {
                basic: *basic,
                table: TableName::new(table.as_str()),
                column: column.clone(),
                key_column: key_column.clone(),
                owner_id_column: self.identifier_column(owner_entity)?,
            }),
            _ => Err(QueryError::semantic(format!(
                "Attribute '{}' is not an association",
                attribute.name
            ))),
        }
    }
}
