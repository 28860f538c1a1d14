//! Error types shared across the query pipeline.

use std::ops::Range;

use ariadne::{Config, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::hql::span::line_column;
use crate::query::execution::ExecutionError;

/// A lexing or parsing failure, positioned in the query text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Syntax error at line {line}, column {column}: {message}")]
pub struct QuerySyntaxError {
    pub message: String,
    pub span: Range<usize>,
    pub line: usize,
    pub column: usize,
}

impl QuerySyntaxError {
    pub fn new(source: &str, span: Range<usize>, message: impl Into<String>) -> Self {
        let (line, column) = line_column(source, span.start);
        Self {
            message: message.into(),
            span,
            line,
            column,
        }
    }

    /// Render a caret diagnostic for the offending source range.
    pub fn report(&self, source: &str) -> String {
        let mut buf = Vec::new();
        let span = self.span.start.min(source.len())..self.span.end.min(source.len());
        let written = Report::build(ReportKind::Error, span.clone())
            .with_config(Config::default().with_color(false))
            .with_message(&self.message)
            .with_label(Label::new(span).with_message(&self.message))
            .finish()
            .write(Source::from(source), &mut buf);
        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

/// Every failure a query can produce between parsing and execution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error(transparent)]
    Syntax(#[from] QuerySyntaxError),

    #[error("Could not resolve entity '{name}'")]
    UnknownEntity { name: String },

    #[error("Could not resolve attribute '{segment}' of '{owner}' (path '{path}')")]
    UnresolvedNavigable {
        path: String,
        owner: String,
        segment: String,
    },

    #[error("Cannot dereference '{segment}' on basic-valued path '{path}' of type {type_name}")]
    IllegalDereference {
        path: String,
        segment: String,
        type_name: String,
    },

    #[error("Type mismatch in {context}: {left} is not compatible with {right}")]
    TypeMismatch {
        context: String,
        left: String,
        right: String,
    },

    #[error("{message}")]
    Semantic { message: String },

    #[error("No value bound for parameter {name}")]
    UnboundParameter { name: String },

    #[error("Invalid binding for parameter {name}: {reason}")]
    InvalidBinding { name: String, reason: String },

    #[error("Query has no parameter {name}")]
    UnknownParameter { name: String },

    #[error("Unsupported construct: {construct}")]
    Unsupported { construct: String },

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl QueryError {
    pub fn semantic(message: impl Into<String>) -> Self {
        QueryError::Semantic {
            message: message.into(),
        }
    }

    pub fn unsupported(construct: impl Into<String>) -> Self {
        QueryError::Unsupported {
            construct: construct.into(),
        }
    }

    pub fn type_mismatch(
        context: impl Into<String>,
        left: impl std::fmt::Display,
        right: impl std::fmt::Display,
    ) -> Self {
        QueryError::TypeMismatch {
            context: context.into(),
            left: left.to_string(),
            right: right.to_string(),
        }
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
