//! HQL front end: lexing and parsing query text into a syntax tree.
//!
//! The grammar covers select, update, and delete statements:
//!
//! - **Select**: `[select [distinct] item, ...] from Entity [as] alias [join ...]`
//!   followed by optional `where`, `group by`, `having`, `order by`, `limit`,
//!   and `offset` clauses
//! - **Joins**: `[inner | left [outer]] join [fetch] path [as] alias [on|with predicate]`
//! - **Parameters**: named (`:name`) or positional (`?1`)
//! - **Update**: `update Entity [alias] set path = expr, ... [where ...]`
//! - **Delete**: `delete [from] Entity [alias] [where ...]`
//!
//! # Example
//!
//! ```ignore
//! use hqlc::hql::HqlParser;
//!
//! let parser = HqlParser::new();
//! let statement = parser.parse("select p from Person p where p.name = :n")?;
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod span;

pub use ast::*;
pub use span::{Span, Spanned};

use chumsky::error::Rich;
use chumsky::input::Input;
use chumsky::span::SimpleSpan;
use chumsky::span::Span as _;
use chumsky::Parser as _;

use crate::error::{QueryResult, QuerySyntaxError};
use lexer::{Keywords, Token};

/// Parses HQL text into [`Statement`]s.
///
/// The keyword table is built once in [`HqlParser::new`] and shared read-only.
/// The chumsky combinators borrow each call's input, so they are assembled per
/// call from immutable parts; no state survives between parses.
#[derive(Debug, Clone, Default)]
pub struct HqlParser {
    keywords: Keywords,
}

impl HqlParser {
    pub fn new() -> Self {
        Self {
            keywords: Keywords::standard(),
        }
    }

    /// Parse one statement.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Syntax` carrying the position of the first
    /// lexing or parsing error.
    pub fn parse(&self, source: &str) -> QueryResult<Statement> {
        // Step 1: Lexical analysis
        let tokens = lexer::lex(&self.keywords, source).map_err(|errs| {
            first_error(
                source,
                errs.into_iter().map(|e: Rich<'_, char>| {
                    let span = e.span();
                    (span.start()..span.end(), e.to_string())
                }),
            )
        })?;

        // Step 2: Parsing
        let len = source.len();
        let eoi: SimpleSpan = (len..len).into();
        let token_stream = tokens
            .as_slice()
            .map(eoi, |(tok, span): &(Token<'_>, SimpleSpan)| (tok, span));

        let statement = parser::parser()
            .parse(token_stream)
            .into_result()
            .map_err(|errs| {
                first_error(
                    source,
                    errs.into_iter()
                        .map(|e: Rich<'_, Token<'_>, SimpleSpan>| {
                            let span = e.span();
                            (span.start()..span.end(), e.to_string())
                        }),
                )
            })?;

        tracing::trace!(kind = statement_kind(&statement), "parsed statement");
        Ok(statement)
    }
}

fn statement_kind(statement: &Statement) -> &'static str {
    match statement {
        Statement::Select(_) => "select",
        Statement::Update(_) => "update",
        Statement::Delete(_) => "delete",
    }
}

fn first_error(
    source: &str,
    mut errors: impl Iterator<Item = (Span, String)>,
) -> crate::error::QueryError {
    let (span, message) = errors
        .next()
        .unwrap_or_else(|| (source.len()..source.len(), "invalid query".to_string()));
    QuerySyntaxError::new(source, span, message).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;

    #[test]
    fn test_shared_parser_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HqlParser>();

        let parser = HqlParser::new();
        let query = "select p.name from Person p where p.age > :min";
        let expected = parser.parse(query).expect("should parse");
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4).map(|_| scope.spawn(|| parser.parse(query))).collect();
            for handle in handles {
                let parsed = handle.join().expect("parser thread");
                assert_eq!(parsed.as_ref(), Ok(&expected));
            }
        });
    }

    #[test]
    fn test_parse_select() {
        let parser = HqlParser::new();
        let statement = parser
            .parse("select p.name from Person p")
            .expect("should parse");
        assert!(matches!(statement, Statement::Select(_)));
    }

    #[test]
    fn test_syntax_error_has_position() {
        let parser = HqlParser::new();
        let err = parser
            .parse("select p.name\nfrom Person p where")
            .expect_err("should fail");
        match err {
            QueryError::Syntax(syntax) => {
                assert_eq!(syntax.line, 2);
                assert!(syntax.column > 1);
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_lex_error_is_syntax_error() {
        let parser = HqlParser::new();
        let err = parser
            .parse("from Person p where p.name = 'open")
            .expect_err("should fail");
        assert!(matches!(err, QueryError::Syntax(_)));
    }
}
