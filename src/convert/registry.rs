//! From-clause registry: navigable path → allocated table alias.
//!
//! One scope per (sub-)query. Lookups search the innermost scope first and
//! then the enclosing ones, which is how correlated references find the
//! alias of an outer table.

use std::collections::HashMap;

use crate::error::{QueryError, QueryResult};
use crate::sql::{SqlExpr, SqlJoinKind, SqlLiteral, TableGroup, TableJoin, TableReference};
use crate::sqm::NavigablePath;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ElementBinding {
    pub alias: String,
    /// Entity whose rows the table holds; `None` for collection tables.
    pub entity: Option<String>,
    /// Table name, used to qualify correlated references into unqualified DML.
    table: String,
    group: usize,
    /// Reached through an outer join, so its columns may all be null.
    pub nullable: bool,
}

#[derive(Debug, Clone)]
struct RoleBinding {
    lhs: NavigablePath,
    attribute: String,
    path: NavigablePath,
    fetch: bool,
    reusable: bool,
}

#[derive(Debug, Default)]
struct RegistryScope {
    groups: Vec<TableGroup>,
    elements: HashMap<NavigablePath, ElementBinding>,
    roles: Vec<RoleBinding>,
    /// Single-table DML renders columns without a qualifier.
    unqualified: bool,
}

#[derive(Debug, Default)]
pub(crate) struct FromClauseRegistry {
    scopes: Vec<RegistryScope>,
}

impl FromClauseRegistry {
    pub fn push_scope(&mut self, unqualified: bool) {
        self.scopes.push(RegistryScope {
            unqualified,
            ..RegistryScope::default()
        });
    }

    /// Close the innermost scope, yielding its table groups in document order.
    pub fn pop_scope(&mut self) -> Vec<TableGroup> {
        self.scopes.pop().map(|s| s.groups).unwrap_or_default()
    }

    fn innermost(&mut self) -> QueryResult<&mut RegistryScope> {
        self.scopes
            .last_mut()
            .ok_or_else(|| QueryError::semantic("No from clause is being converted"))
    }

    pub fn add_root(
        &mut self,
        path: NavigablePath,
        entity: &str,
        table: TableReference,
    ) -> QueryResult<()> {
        let scope = self.innermost()?;
        let group = scope.groups.len();
        scope.elements.insert(
            path,
            ElementBinding {
                alias: table.alias.clone(),
                entity: Some(entity.to_string()),
                table: table.table.to_string(),
                group,
                nullable: false,
            },
        );
        scope.groups.push(TableGroup::new(table));
        Ok(())
    }

    /// Register a join hanging off `lhs` (which must belong to the innermost
    /// scope) and append it to the owning table group.
    #[allow(clippy::too_many_arguments)]
    pub fn add_join(
        &mut self,
        path: NavigablePath,
        entity: Option<&str>,
        lhs: &NavigablePath,
        attribute: &str,
        fetch: bool,
        reusable: bool,
        join: TableJoin,
    ) -> QueryResult<()> {
        let scope = self.innermost()?;
        let group = scope
            .elements
            .get(lhs)
            .map(|b| b.group)
            .ok_or_else(|| QueryError::semantic(format!("Join owner '{}' is not registered", lhs)))?;
        scope.elements.insert(
            path.clone(),
            ElementBinding {
                alias: join.table.alias.clone(),
                entity: entity.map(str::to_string),
                table: join.table.table.to_string(),
                group,
                nullable: join.kind == SqlJoinKind::LeftOuter,
            },
        );
        scope.roles.push(RoleBinding {
            lhs: lhs.clone(),
            attribute: attribute.to_string(),
            path,
            fetch,
            reusable,
        });
        match scope.groups.get_mut(group) {
            Some(table_group) => {
                table_group.joins.push(join);
                Ok(())
            }
            None => Err(QueryError::semantic(format!(
                "Join owner '{}' has no table group",
                lhs
            ))),
        }
    }

    /// The binding of `path`, searching enclosing scopes outward.
    pub fn element(&self, path: &NavigablePath) -> QueryResult<&ElementBinding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.elements.get(path))
            .ok_or_else(|| QueryError::semantic(format!("No table registered for '{}'", path)))
    }

    /// Column qualifier for columns of `path`'s table. Unqualified DML scopes
    /// yield `None` for their own columns and the table name for references
    /// from a nested sub-query.
    pub fn qualifier(&self, path: &NavigablePath) -> QueryResult<Option<String>> {
        let innermost = self.scopes.len().saturating_sub(1);
        for (index, scope) in self.scopes.iter().enumerate().rev() {
            if let Some(binding) = scope.elements.get(path) {
                return Ok(match (scope.unqualified, index == innermost) {
                    (false, _) => Some(binding.alias.clone()),
                    (true, true) => None,
                    (true, false) => Some(binding.table.clone()),
                });
            }
        }
        Err(QueryError::semantic(format!("No table registered for '{}'", path)))
    }

    /// AND an extra condition into the `on` predicate of the join for `path`.
    pub fn add_join_condition(&mut self, path: &NavigablePath, condition: SqlExpr) -> QueryResult<()> {
        let scope = self.innermost()?;
        let binding = scope
            .elements
            .get(path)
            .cloned()
            .ok_or_else(|| QueryError::semantic(format!("No table registered for '{}'", path)))?;
        let join = scope
            .groups
            .get_mut(binding.group)
            .and_then(|g| g.joins.iter_mut().find(|j| j.table.alias == binding.alias))
            .ok_or_else(|| QueryError::semantic(format!("'{}' is not a join", path)))?;
        let link = std::mem::replace(&mut join.predicate, SqlExpr::Literal(SqlLiteral::Null));
        join.predicate = SqlExpr::and_all(vec![link, condition])
            .unwrap_or(SqlExpr::Literal(SqlLiteral::Boolean(true)));
        Ok(())
    }

    /// An explicit fetch join of `attribute` off `lhs`, if the query has one.
    pub fn fetch_join(&self, lhs: &NavigablePath, attribute: &str) -> Option<NavigablePath> {
        self.scopes.last().and_then(|scope| {
            scope
                .roles
                .iter()
                .find(|r| r.fetch && r.lhs == *lhs && r.attribute == attribute)
                .map(|r| r.path.clone())
        })
    }

    /// A join of `attribute` off `lhs` that a fetch may reuse.
    pub fn reusable_join(&self, lhs: &NavigablePath, attribute: &str) -> Option<NavigablePath> {
        self.scopes.last().and_then(|scope| {
            scope
                .roles
                .iter()
                .find(|r| r.reusable && r.lhs == *lhs && r.attribute == attribute)
                .map(|r| r.path.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metamodel::TableName;

    fn reference(table: &str, alias: &str) -> TableReference {
        TableReference {
            table: TableName::new(table),
            alias: alias.into(),
        }
    }

    #[test]
    fn test_outer_scope_lookup() {
        let mut registry = FromClauseRegistry::default();
        let person = NavigablePath::root(0, "Person", Some("p"));
        let phone = NavigablePath::root(1, "Phone", Some("ph"));
        registry.push_scope(false);
        registry
            .add_root(person.clone(), "Person", reference("Person", "t0"))
            .expect("root");
        registry.push_scope(false);
        registry
            .add_root(phone.clone(), "Phone", reference("Phone", "t1"))
            .expect("root");

        assert_eq!(registry.element(&person).map(|b| b.alias.as_str()).ok(), Some("t0"));
        assert_eq!(registry.element(&phone).map(|b| b.alias.as_str()).ok(), Some("t1"));

        let groups = registry.pop_scope();
        assert_eq!(groups.len(), 1);
        assert!(registry.element(&phone).is_err());
    }

    #[test]
    fn test_join_roles() {
        let mut registry = FromClauseRegistry::default();
        let person = NavigablePath::root(0, "Person", Some("p"));
        let department = person.append("department", None);
        registry.push_scope(false);
        registry
            .add_root(person.clone(), "Person", reference("Person", "t0"))
            .expect("root");
        registry
            .add_join(
                department.clone(),
                Some("Department"),
                &person,
                "department",
                true,
                true,
                TableJoin {
                    kind: SqlJoinKind::LeftOuter,
                    table: reference("Department", "t1"),
                    predicate: SqlExpr::eq(
                        SqlExpr::column(Some("t0"), "department_id"),
                        SqlExpr::column(Some("t1"), "id"),
                    ),
                },
            )
            .expect("join");
        assert_eq!(registry.fetch_join(&person, "department"), Some(department.clone()));
        assert_eq!(registry.reusable_join(&person, "department"), Some(department.clone()));
        assert_eq!(registry.fetch_join(&person, "phones"), None);
        assert!(!registry.element(&person).expect("root").nullable);
        assert!(registry.element(&department).expect("join").nullable);
        let groups = registry.pop_scope();
        assert_eq!(groups[0].joins.len(), 1);
    }

    #[test]
    fn test_unqualified_scope() {
        let mut registry = FromClauseRegistry::default();
        let person = NavigablePath::root(0, "Person", Some("p"));
        registry.push_scope(true);
        registry
            .add_root(person.clone(), "Person", reference("Person", "t0"))
            .expect("root");
        assert_eq!(registry.qualifier(&person), Ok(None));
        registry.push_scope(false);
        assert_eq!(registry.qualifier(&person), Ok(Some("Person".to_string())));
    }
}
