//! Integration tests for fetch joins and eager fetch graphs.

use std::sync::Arc;

use hqlc::metamodel::Metamodel;
use hqlc::query::QueryPlan;
use hqlc::results::{CollectionResult, DomainResult, EntityResult, FieldKind};
use hqlc::{CompileOptions, QueryCompiler, QueryError};

fn company() -> Metamodel {
    Metamodel::from_toml(include_str!("../fixtures/company.toml")).expect("fixture loads")
}

fn plan(query: &str, options: CompileOptions) -> Arc<QueryPlan> {
    QueryCompiler::new(Arc::new(company()), options)
        .compile(query)
        .unwrap_or_else(|e| panic!("'{}' should compile: {}", query, e))
}

fn root_entity(plan: &QueryPlan) -> &EntityResult {
    match &plan.shape().results[0] {
        DomainResult::Entity(entity) => entity,
        other => panic!("expected an entity result, got {:?}", other),
    }
}

fn field<'e>(entity: &'e EntityResult, name: &str) -> &'e FieldKind {
    &entity
        .fields
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("no field {}", name))
        .kind
}

#[test]
fn test_fetched_association_pulls_in_its_eager_graph() {
    let plan = plan(
        "select p from Person p join fetch p.department d",
        CompileOptions::default(),
    );
    assert_eq!(
        plan.sql(),
        "select t0.id, t0.active, t0.city, t0.street, t0.zip, t0.age, \
         t1.id, t1.budget, t2.id, t2.name, t1.name, t0.name \
         from Person t0 join Department t1 on t0.department_id = t1.id \
         join Company t2 on t1.company_id = t2.id"
    );

    let person = root_entity(&plan);
    let FieldKind::Fetched(department) = field(person, "department") else {
        panic!("department should be fetched");
    };
    assert_eq!(department.entity, "Department");
    assert_eq!(department.id_column, 6);
    assert!(matches!(field(department, "company"), FieldKind::Fetched(_)));
    assert!(matches!(field(person, "phones"), FieldKind::LazyCollection));
}

#[test]
fn test_eager_graph_below_outer_fetch_stays_outer() {
    let plan = plan(
        "select p from Person p left join fetch p.department d",
        CompileOptions::default(),
    );
    assert_eq!(
        plan.sql(),
        "select t0.id, t0.active, t0.city, t0.street, t0.zip, t0.age, \
         t1.id, t1.budget, t2.id, t2.name, t1.name, t0.name \
         from Person t0 left join Department t1 on t0.department_id = t1.id \
         left join Company t2 on t1.company_id = t2.id"
    );
    let person = root_entity(&plan);
    let FieldKind::Fetched(department) = field(person, "department") else {
        panic!("department should be fetched");
    };
    assert!(matches!(field(department, "company"), FieldKind::Fetched(_)));
}

#[test]
fn test_fetch_depth_limits_eager_graph() {
    let plan = plan(
        "select p from Person p join fetch p.department d",
        CompileOptions::default().with_max_fetch_depth(1),
    );
    assert_eq!(
        plan.sql(),
        "select t0.id, t0.active, t0.city, t0.street, t0.zip, t0.age, \
         t1.id, t1.budget, t1.company_id, t1.name, t0.name \
         from Person t0 join Department t1 on t0.department_id = t1.id"
    );
    let person = root_entity(&plan);
    let FieldKind::Fetched(department) = field(person, "department") else {
        panic!("explicit fetches ignore the depth limit");
    };
    assert!(matches!(
        field(department, "company"),
        FieldKind::Reference { column: 8, .. }
    ));
}

#[test]
fn test_eager_association_of_root() {
    let eager = plan("select d from Department d", CompileOptions::default());
    assert_eq!(
        eager.sql(),
        "select t0.id, t0.budget, t1.id, t1.name, t0.name from Department t0 \
         join Company t1 on t0.company_id = t1.id"
    );

    let lazy = plan(
        "select d from Department d",
        CompileOptions::default().with_max_fetch_depth(0),
    );
    assert_eq!(
        lazy.sql(),
        "select t0.id, t0.budget, t0.company_id, t0.name from Department t0"
    );
}

#[test]
fn test_element_collection_fetch() {
    let plan = plan(
        "select p from Person p left join fetch p.nicknames n",
        CompileOptions::default(),
    );
    assert_eq!(
        plan.sql(),
        "select t0.id, t0.active, t0.city, t0.street, t0.zip, t0.age, t0.department_id, \
         t0.name, t1.nickname from Person t0 \
         left join Person_nicknames t1 on t1.person_id = t0.id"
    );
    assert!(plan.shape().has_collection_fetch());
    assert!(matches!(
        field(root_entity(&plan), "nicknames"),
        FieldKind::Collection(CollectionResult::Values { column: 8, .. })
    ));
}

#[test]
fn test_entity_collection_fetch() {
    let plan = plan(
        "select p from Person p left join fetch p.phones ph",
        CompileOptions::default(),
    );
    assert_eq!(
        plan.sql(),
        "select t0.id, t0.active, t0.city, t0.street, t0.zip, t0.age, t0.department_id, \
         t0.name, t1.id, t1.kind, t1.number, t1.person_id from Person t0 \
         left join Phone t1 on t1.person_id = t0.id"
    );
    match field(root_entity(&plan), "phones") {
        FieldKind::Collection(CollectionResult::Entities(phone)) => {
            assert_eq!(phone.entity, "Phone");
            assert!(matches!(field(phone, "owner"), FieldKind::Reference { .. }));
        }
        other => panic!("expected fetched phones, got {:?}", other),
    }
}

#[test]
fn test_fetch_owner_must_be_selected() {
    let err = QueryCompiler::new(Arc::new(company()), CompileOptions::default())
        .compile("select p.name from Person p join fetch p.department d")
        .expect_err("fetch without its owner in the select list");
    assert!(matches!(err, QueryError::Semantic { .. }));
    assert!(err.to_string().contains("owner of the fetched association"));
}
