//! Integration tests for the HQL front end through the public parser API.

use hqlc::hql::{
    ComparisonOp, Expr, HqlParser, JoinKind, Literal, NullPrecedence, ParameterRef, SortDirection,
    Statement,
};
use hqlc::{QueryError, QuerySyntaxError};

fn parse(query: &str) -> Statement {
    HqlParser::new()
        .parse(query)
        .unwrap_or_else(|e| panic!("'{}' should parse: {}", query, e))
}

fn syntax_error(query: &str) -> QuerySyntaxError {
    match HqlParser::new().parse(query) {
        Err(QueryError::Syntax(e)) => e,
        other => panic!("expected a syntax error for '{}', got {:?}", query, other),
    }
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_keywords_are_case_insensitive() {
    let lower = parse("select p.name from Person p where p.age > 1 order by p.name");
    let upper = parse("SELECT p.name FROM Person p WHERE p.age > 1 ORDER BY p.name");
    assert_eq!(lower, upper);
}

#[test]
fn test_parse_twice_is_identical() {
    let query = "select p, d.name from Person p left join p.department d \
                 where p.age between :lo and :hi order by d.name desc nulls first";
    let parser = HqlParser::new();
    assert_eq!(parser.parse(query).unwrap(), parser.parse(query).unwrap());
}

#[test]
fn test_full_select_statement() {
    let Statement::Select(select) = parse(
        "select distinct p.name as n, count(ph) \
         from Person p left outer join p.phones ph with ph.kind = 'mobile' \
         where p.active = true and p.name like 'A%' \
         group by p.name having count(ph) > 1 \
         order by n asc nulls last limit 5 offset 10",
    ) else {
        panic!("expected a select");
    };

    let clause = select.query.select.as_ref().expect("select clause");
    assert!(clause.distinct);
    assert_eq!(clause.items.len(), 2);

    let root = &select.query.from[0];
    assert_eq!(root.entity.value, "Person");
    assert_eq!(root.joins.len(), 1);
    assert_eq!(root.joins[0].kind, JoinKind::LeftOuter);
    assert!(!root.joins[0].fetch);
    assert!(root.joins[0].condition.is_some());

    assert!(matches!(
        select.query.where_clause.as_ref().map(|w| &w.value),
        Some(Expr::And(_, _))
    ));
    assert_eq!(select.query.group_by.len(), 1);
    assert!(select.query.having.is_some());

    assert_eq!(select.order_by[0].direction, SortDirection::Ascending);
    assert_eq!(select.order_by[0].nulls, Some(NullPrecedence::Last));
    assert_eq!(
        select.limit.as_ref().map(|l| &l.value),
        Some(&Expr::Literal(Literal::Integer(5)))
    );
    assert_eq!(
        select.offset.as_ref().map(|o| &o.value),
        Some(&Expr::Literal(Literal::Integer(10)))
    );
}

#[test]
fn test_multiple_roots() {
    let Statement::Select(select) = parse("from Person p, Department d where p.department = d")
    else {
        panic!("expected a select");
    };
    let entities: Vec<&str> = select
        .query
        .from
        .iter()
        .map(|r| r.entity.value.as_str())
        .collect();
    assert_eq!(entities, vec!["Person", "Department"]);
}

#[test]
fn test_positional_parameters() {
    let Statement::Select(select) = parse("from Person p where p.id = ?1") else {
        panic!("expected a select");
    };
    match select.query.where_clause.map(|w| w.value) {
        Some(Expr::Comparison { op, rhs, .. }) => {
            assert_eq!(op, ComparisonOp::Eq);
            assert_eq!(rhs.value, Expr::Parameter(ParameterRef::Positional(1)));
        }
        other => panic!("expected a comparison, got {:?}", other),
    }
}

#[test]
fn test_update_and_delete() {
    match parse("update Person p set p.active = false where p.age < :min") {
        Statement::Update(update) => {
            assert_eq!(update.alias.as_ref().map(|a| a.value.as_str()), Some("p"));
            assert_eq!(
                update.assignments[0].target.value,
                vec!["p".to_string(), "active".to_string()]
            );
        }
        other => panic!("expected an update, got {:?}", other),
    }

    match parse("delete Phone ph where ph.kind = 'fax'") {
        Statement::Delete(delete) => {
            assert_eq!(delete.entity.value, "Phone");
            assert!(delete.where_clause.is_some());
        }
        other => panic!("expected a delete, got {:?}", other),
    }
}

#[test]
fn test_nested_subqueries() {
    let Statement::Select(select) = parse(
        "from Person p where p.id in (select ph.owner.id from Phone ph \
         where exists (from Department d where d.name = ph.kind))",
    ) else {
        panic!("expected a select");
    };
    match select.query.where_clause.map(|w| w.value) {
        Some(Expr::InSubquery { query, negated, .. }) => {
            assert!(!negated);
            assert!(matches!(
                query.where_clause.map(|w| w.value),
                Some(Expr::Exists(_))
            ));
        }
        other => panic!("expected an in sub-query, got {:?}", other),
    }
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_error_positions() {
    let err = syntax_error("from Person p where p.name = = 1");
    assert_eq!(err.line, 1);
    assert_eq!(err.column, 30);
    assert_eq!(err.span.start, 29);

    let err = syntax_error("select p.name\nfrom Person p\nwhere p.age >");
    assert_eq!(err.line, 3);
}

#[test]
fn test_error_report_points_at_source() {
    let query = "from Person p where p.name = = 1";
    let err = syntax_error(query);
    let report = err.report(query);
    assert!(report.contains("Error"));
    assert!(report.contains(&err.message));
}

#[test]
fn test_rejected_inputs() {
    for query in [
        "",
        "select",
        "from",
        "from Person p where",
        "from Person p order p.name",
        "update Person p where p.id = 1",
        "from Person p where p.name = 'unterminated",
        "from Person p where p.id = ?",
    ] {
        assert!(
            matches!(HqlParser::new().parse(query), Err(QueryError::Syntax(_))),
            "'{}' should be rejected",
            query
        );
    }
}
