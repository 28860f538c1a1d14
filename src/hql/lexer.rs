//! Lexer for HQL.
//!
//! Converts query text into a sequence of tokens with span information.
//! Keywords are case-insensitive and are looked up in a [`Keywords`] table
//! owned by the parser, so the table is built once and shared by every parse.

use std::collections::HashMap;

use chumsky::prelude::*;

/// A token in HQL.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    // ========================================================================
    // Clause Keywords
    // ========================================================================
    Select,
    From,
    Where,
    Group,
    By,
    Having,
    Order,
    Limit,
    Offset,
    Update,
    Set,
    Delete,
    Distinct,
    As,

    // ========================================================================
    // Join Keywords
    // ========================================================================
    Join,
    Inner,
    Left,
    Outer,
    Fetch,
    On,
    With,

    // ========================================================================
    // Predicate Keywords
    // ========================================================================
    And,
    Or,
    Not,
    In,
    Is,
    Between,
    Like,
    Escape,
    Exists,
    Null,
    True,
    False,

    // ========================================================================
    // Sort Keywords
    // ========================================================================
    Asc,
    Desc,
    Nulls,
    First,
    Last,

    // ========================================================================
    // Literals
    // ========================================================================
    /// An identifier (not a keyword).
    Ident(&'src str),
    /// A string literal, contents without the enclosing quotes and with
    /// doubled quotes still escaped.
    StringLit(&'src str),
    /// An integer literal.
    Integer(&'src str),
    /// A decimal literal (`1.5`).
    Decimal(&'src str),
    /// `:name` (the name only).
    NamedParam(&'src str),
    /// `?1` (the digits only).
    PositionalParam(&'src str),

    // ========================================================================
    // Symbols
    // ========================================================================
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `=`
    Eq,
    /// `<>` or `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `||`
    Concat,
}

impl Token<'_> {
    /// Keywords that may still be used as attribute names after a `.`.
    pub fn is_soft_keyword(&self) -> bool {
        matches!(
            self,
            Token::Group
                | Token::By
                | Token::Order
                | Token::Limit
                | Token::Offset
                | Token::Set
                | Token::Fetch
                | Token::On
                | Token::With
                | Token::Escape
                | Token::Asc
                | Token::Desc
                | Token::Nulls
                | Token::First
                | Token::Last
                | Token::Update
                | Token::Delete
                | Token::Left
                | Token::Inner
                | Token::Outer
        )
    }
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Select => write!(f, "select"),
            Token::From => write!(f, "from"),
            Token::Where => write!(f, "where"),
            Token::Group => write!(f, "group"),
            Token::By => write!(f, "by"),
            Token::Having => write!(f, "having"),
            Token::Order => write!(f, "order"),
            Token::Limit => write!(f, "limit"),
            Token::Offset => write!(f, "offset"),
            Token::Update => write!(f, "update"),
            Token::Set => write!(f, "set"),
            Token::Delete => write!(f, "delete"),
            Token::Distinct => write!(f, "distinct"),
            Token::As => write!(f, "as"),

            Token::Join => write!(f, "join"),
            Token::Inner => write!(f, "inner"),
            Token::Left => write!(f, "left"),
            Token::Outer => write!(f, "outer"),
            Token::Fetch => write!(f, "fetch"),
            Token::On => write!(f, "on"),
            Token::With => write!(f, "with"),

            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Not => write!(f, "not"),
            Token::In => write!(f, "in"),
            Token::Is => write!(f, "is"),
            Token::Between => write!(f, "between"),
            Token::Like => write!(f, "like"),
            Token::Escape => write!(f, "escape"),
            Token::Exists => write!(f, "exists"),
            Token::Null => write!(f, "null"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),

            Token::Asc => write!(f, "asc"),
            Token::Desc => write!(f, "desc"),
            Token::Nulls => write!(f, "nulls"),
            Token::First => write!(f, "first"),
            Token::Last => write!(f, "last"),

            Token::Ident(s) => write!(f, "{}", s),
            Token::StringLit(s) => write!(f, "'{}'", s),
            Token::Integer(s) => write!(f, "{}", s),
            Token::Decimal(s) => write!(f, "{}", s),
            Token::NamedParam(s) => write!(f, ":{}", s),
            Token::PositionalParam(s) => write!(f, "?{}", s),

            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Eq => write!(f, "="),
            Token::NotEq => write!(f, "<>"),
            Token::Lt => write!(f, "<"),
            Token::LtEq => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::GtEq => write!(f, ">="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Concat => write!(f, "||"),
        }
    }
}

/// Case-insensitive keyword table.
#[derive(Debug, Clone)]
pub struct Keywords {
    table: HashMap<&'static str, Token<'static>>,
}

impl Keywords {
    /// The HQL keyword set.
    pub fn standard() -> Self {
        let table = [
            ("select", Token::Select),
            ("from", Token::From),
            ("where", Token::Where),
            ("group", Token::Group),
            ("by", Token::By),
            ("having", Token::Having),
            ("order", Token::Order),
            ("limit", Token::Limit),
            ("offset", Token::Offset),
            ("update", Token::Update),
            ("set", Token::Set),
            ("delete", Token::Delete),
            ("distinct", Token::Distinct),
            ("as", Token::As),
            ("join", Token::Join),
            ("inner", Token::Inner),
            ("left", Token::Left),
            ("outer", Token::Outer),
            ("fetch", Token::Fetch),
            ("on", Token::On),
            ("with", Token::With),
            ("and", Token::And),
            ("or", Token::Or),
            ("not", Token::Not),
            ("in", Token::In),
            ("is", Token::Is),
            ("between", Token::Between),
            ("like", Token::Like),
            ("escape", Token::Escape),
            ("exists", Token::Exists),
            ("null", Token::Null),
            ("true", Token::True),
            ("false", Token::False),
            ("asc", Token::Asc),
            ("desc", Token::Desc),
            ("nulls", Token::Nulls),
            ("first", Token::First),
            ("last", Token::Last),
        ]
        .into_iter()
        .collect();
        Self { table }
    }

    /// Map an identifier to a keyword token, or return it as `Ident`.
    pub fn classify<'src>(&self, s: &'src str) -> Token<'src> {
        match self.table.get(s.to_ascii_lowercase().as_str()) {
            Some(keyword) => keyword.clone(),
            None => Token::Ident(s),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for Keywords {
    fn default() -> Self {
        Self::standard()
    }
}

/// Create a lexer for HQL.
///
/// Returns a parser that tokenizes the input string into a sequence of
/// tokens with span information, skipping whitespace and comments.
pub fn lexer<'src>(
    keywords: &'src Keywords,
) -> impl Parser<'src, &'src str, Vec<(Token<'src>, SimpleSpan)>, extra::Err<Rich<'src, char>>> {
    // Identifiers: start with letter or underscore, followed by alphanumeric or underscore
    let ident = text::ident().map(move |s: &'src str| keywords.classify(s));

    // String literals: '...' with '' as an escaped quote
    let string_lit = just('\'')
        .ignore_then(
            choice((just("''").ignored(), none_of('\'').ignored()))
                .repeated()
                .to_slice(),
        )
        .then_ignore(just('\''))
        .map(Token::StringLit);

    // Decimals must be tried before integers
    let decimal = text::digits(10)
        .then(just('.'))
        .then(text::digits(10))
        .to_slice()
        .map(Token::Decimal);
    let integer = text::digits(10).to_slice().map(Token::Integer);

    let named_param = just(':').ignore_then(text::ident()).map(Token::NamedParam);
    let positional_param = just('?')
        .ignore_then(text::digits(10).to_slice())
        .map(Token::PositionalParam);

    // Symbols (multi-char first, then single-char)
    let symbol = choice((
        just("<>").to(Token::NotEq),
        just("!=").to(Token::NotEq),
        just("<=").to(Token::LtEq),
        just(">=").to(Token::GtEq),
        just("||").to(Token::Concat),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just(',').to(Token::Comma),
        just('.').to(Token::Dot),
        just('=').to(Token::Eq),
        just('<').to(Token::Lt),
        just('>').to(Token::Gt),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
        just('%').to(Token::Percent),
    ));

    // Single-line comments: -- ... until newline
    let single_line_comment = just("--")
        .then(any().and_is(just('\n').not()).repeated())
        .ignored();

    // Multi-line comments: /* ... */
    let multi_line_comment = just("/*")
        .then(any().and_is(just("*/").not()).repeated())
        .then(just("*/"))
        .ignored();

    let comment = single_line_comment.or(multi_line_comment);

    let token = choice((
        ident,
        string_lit,
        decimal,
        integer,
        named_param,
        positional_param,
        symbol,
    ))
    .map_with(|tok, e| (tok, e.span()));

    token
        .padded_by(comment.padded().repeated())
        .padded()
        .repeated()
        .collect()
        .padded_by(comment.padded().repeated())
        .padded()
        .then_ignore(end())
}

/// Lex a source string into tokens.
///
/// Returns Ok with the token list on success, or Err with the lexer errors.
pub fn lex<'src>(
    keywords: &'src Keywords,
    source: &'src str,
) -> Result<Vec<(Token<'src>, SimpleSpan)>, Vec<Rich<'src, char>>> {
    let (tokens, errs) = lexer(keywords).parse(source).into_output_errors();
    if errs.is_empty() {
        Ok(tokens.unwrap_or_default())
    } else {
        Err(errs)
    }
}
