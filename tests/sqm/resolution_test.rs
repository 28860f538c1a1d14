//! Integration tests for path resolution against the company metamodel.

use hqlc::metamodel::Metamodel;
use hqlc::sqm::{EntitySource, SqmExpression, SqmJoinAssociation, SqmSelectStatement, SqmStatement};
use hqlc::{parse, QueryError};

fn company() -> Metamodel {
    Metamodel::from_toml(include_str!("../fixtures/company.toml")).expect("fixture loads")
}

fn select(query: &str) -> SqmSelectStatement {
    match parse(query, &company()) {
        Ok(SqmStatement::Select(select)) => select,
        other => panic!("expected a select for '{}', got {:?}", query, other),
    }
}

fn selection(query: &str, index: usize) -> SqmExpression {
    select(query).query.selections[index].expression.clone()
}

#[test]
fn test_embedded_attribute_needs_no_join() {
    let sqm = select("select p.address.city from Person p");
    assert!(sqm.query.from.roots[0].joins.is_empty());
    match &sqm.query.selections[0].expression {
        SqmExpression::BasicPath(path) => {
            assert_eq!(path.column, "city");
            assert_eq!(path.from.to_string(), "Person(p)");
        }
        other => panic!("expected a basic path, got {:?}", other),
    }
}

#[test]
fn test_to_one_dereference_allocates_one_join() {
    let sqm = select(
        "select p.department.name from Person p \
         where p.department.budget > 10 order by p.department.name",
    );
    let joins = &sqm.query.from.roots[0].joins;
    assert_eq!(joins.len(), 1);
    assert!(joins[0].implicit);
    assert_eq!(joins[0].path.to_string(), "Person(p).department");
    assert!(matches!(
        &joins[0].association,
        SqmJoinAssociation::ToOne { target, fk_column, .. }
            if target == "Department" && fk_column == "department_id"
    ));
}

#[test]
fn test_resolution_ignores_sibling_order() {
    let forward = select("select p.department.name, p.name from Person p");
    let backward = select("select p.name, p.department.name from Person p");
    assert_eq!(
        forward.query.from.roots[0].joins,
        backward.query.from.roots[0].joins
    );
    assert_eq!(
        forward.query.selections[0].expression,
        backward.query.selections[1].expression
    );
}

#[test]
fn test_identifier_of_to_one_reads_foreign_key() {
    let sqm = select("select p.department.id from Person p");
    assert!(sqm.query.from.roots[0].joins.is_empty());
    assert!(matches!(
        &sqm.query.selections[0].expression,
        SqmExpression::BasicPath(path) if path.column == "department_id"
    ));
}

#[test]
fn test_explicit_join_alias() {
    let sqm = select("select d.name from Person p join p.department d");
    let joins = &sqm.query.from.roots[0].joins;
    assert_eq!(joins.len(), 1);
    assert!(!joins[0].implicit);
    assert_eq!(joins[0].alias.as_deref(), Some("d"));
    match &sqm.query.selections[0].expression {
        SqmExpression::BasicPath(path) => {
            assert_eq!(path.from.to_string(), "Person(p).department(d)")
        }
        other => panic!("expected a basic path, got {:?}", other),
    }
}

#[test]
fn test_aliases_are_case_insensitive() {
    let upper = selection("select P.name from Person p", 0);
    let lower = selection("select p.name from Person p", 0);
    assert_eq!(upper, lower);
}

#[test]
fn test_selecting_root_is_an_entity_path() {
    match selection("select p from Person p", 0) {
        SqmExpression::EntityPath(path) => {
            assert_eq!(path.entity, "Person");
            assert!(matches!(path.source, EntitySource::FromElement(_)));
        }
        other => panic!("expected an entity path, got {:?}", other),
    }
}

#[test]
fn test_subtype_sees_inherited_attributes() {
    let sqm = select("select e.name, e.salary from Employee e");
    assert_eq!(sqm.query.selections.len(), 2);

    let err = parse("select p.salary from Person p", &company()).unwrap_err();
    assert_eq!(
        err,
        QueryError::UnresolvedNavigable {
            path: "p.salary".into(),
            owner: "Person".into(),
            segment: "salary".into(),
        }
    );
}

#[test]
fn test_unknown_names() {
    let model = company();
    assert_eq!(
        parse("from Persn p", &model),
        Err(QueryError::UnknownEntity {
            name: "Persn".into()
        })
    );
    assert!(matches!(
        parse("select p.address.country from Person p", &model),
        Err(QueryError::UnresolvedNavigable { .. })
    ));
    assert!(matches!(
        parse("select x.name from Person p", &model),
        Err(QueryError::Semantic { .. } | QueryError::UnresolvedNavigable { .. })
    ));
}

#[test]
fn test_dereferencing_basic_value_is_illegal() {
    assert!(matches!(
        parse("select p.name.first from Person p", &company()),
        Err(QueryError::IllegalDereference { .. })
    ));
}

#[test]
fn test_correlated_subquery_sees_outer_alias() {
    let sqm = select("from Person p where exists (from Phone ph where ph.owner = p)");
    assert_eq!(sqm.query.from.roots.len(), 1);
}

#[test]
fn test_implicit_join_in_correlated_scope_is_unsupported() {
    assert!(matches!(
        parse(
            "from Phone ph where exists (from Company c where c.name = ph.owner.department.name)",
            &company()
        ),
        Err(QueryError::Unsupported { .. })
    ));
}

#[test]
fn test_duplicate_alias_is_rejected() {
    assert!(matches!(
        parse("from Person p, Department P", &company()),
        Err(QueryError::Semantic { .. })
    ));
}
