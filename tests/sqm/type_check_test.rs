//! Integration tests for typing and parameter inference in the semantic model.

use hqlc::metamodel::{Metamodel, ValueType};
use hqlc::query::ParameterName;
use hqlc::sqm::{ExpressableType, SqmStatement};
use hqlc::{parse, QueryError};

fn company() -> Metamodel {
    Metamodel::from_toml(include_str!("../fixtures/company.toml")).expect("fixture loads")
}

fn statement(query: &str) -> SqmStatement {
    parse(query, &company()).unwrap_or_else(|e| panic!("'{}' should build: {}", query, e))
}

fn error(query: &str) -> QueryError {
    parse(query, &company()).expect_err("query should be rejected")
}

#[test]
fn test_parameters_collected_in_first_occurrence_order() {
    let sqm = statement("from Person p where p.name = :name and p.age > :min or p.name = :name");
    let names: Vec<String> = sqm.parameters().iter().map(|p| p.name.to_string()).collect();
    assert_eq!(names, vec![":name", ":min"]);
    assert_eq!(
        sqm.parameters()[0].anticipated_type,
        Some(ExpressableType::basic(ValueType::String))
    );
    assert_eq!(
        sqm.parameters()[1].anticipated_type,
        Some(ExpressableType::basic(ValueType::Integer))
    );
}

#[test]
fn test_parameter_on_either_side_is_inferred() {
    let sqm = statement("from Person p where :min < p.age");
    assert_eq!(
        sqm.parameters()[0].anticipated_type,
        Some(ExpressableType::basic(ValueType::Integer))
    );
}

#[test]
fn test_entity_comparison_binds_identifier() {
    let sqm = statement("from Phone ph where ph.owner = :owner");
    let bind = sqm.parameters()[0].bind_type().expect("bind type");
    assert_eq!(bind.value_type, ValueType::Long);
}

#[test]
fn test_in_list_with_single_parameter_is_multi_valued() {
    let sqm = statement("from Person p where p.name in (:names)");
    assert!(sqm.parameters()[0].allows_multi_valued);
    assert_eq!(sqm.parameters()[0].name, ParameterName::from("names"));
}

#[test]
fn test_update_assignment_type_flows_to_parameter() {
    let sqm = statement("update Person p set p.age = :age where p.id = :id");
    assert_eq!(
        sqm.parameters()[0].anticipated_type,
        Some(ExpressableType::basic(ValueType::Integer))
    );
    assert_eq!(
        sqm.parameters()[1].anticipated_type,
        Some(ExpressableType::basic(ValueType::Long))
    );
}

#[test]
fn test_incompatible_comparison() {
    assert!(matches!(
        error("from Person p where p.name = 1"),
        QueryError::TypeMismatch { .. }
    ));
    assert!(matches!(
        error("from Person p where p.active = 'yes'"),
        QueryError::TypeMismatch { .. }
    ));
}

#[test]
fn test_numeric_promotion_is_compatible() {
    statement("from Department d where d.budget > 100");
    statement("from Person p where p.age < 1.5");
    statement("from Person p where p.id = p.age");
}

#[test]
fn test_where_must_be_boolean() {
    assert_eq!(
        error("from Person p where p.age"),
        QueryError::TypeMismatch {
            context: "where clause".into(),
            left: "integer".into(),
            right: "boolean".into(),
        }
    );
}

#[test]
fn test_parameter_used_with_two_types() {
    assert!(matches!(
        error("from Person p where p.name = :v or p.active = :v"),
        QueryError::TypeMismatch { .. }
    ));
}

#[test]
fn test_mixing_named_and_positional_parameters() {
    assert!(matches!(
        error("from Person p where p.name = :n and p.id = ?1"),
        QueryError::Semantic { .. }
    ));
}

#[test]
fn test_aggregate_types() {
    let SqmStatement::Select(select) =
        statement("select count(p), max(p.age), avg(p.age) from Person p")
    else {
        panic!("expected a select");
    };
    let types: Vec<_> = select
        .query
        .selections
        .iter()
        .map(|s| s.expression.expressable_type())
        .collect();
    assert_eq!(
        types,
        vec![
            Some(ExpressableType::basic(ValueType::Long)),
            Some(ExpressableType::basic(ValueType::Integer)),
            Some(ExpressableType::basic(ValueType::Double)),
        ]
    );
}

#[test]
fn test_string_functions_need_text() {
    assert!(matches!(
        error("select upper(p.age) from Person p"),
        QueryError::TypeMismatch { .. }
    ));
    statement("select upper(p.name), lower(p.address.city) from Person p");
}
