//! SQL Tokens - the atomic units of SQL output.
//!
//! Tokens are dialect-agnostic representations that serialize
//! to dialect-specific strings. Keywords serialize in lower case.

use super::dialect::{Dialect, SqlDialect};

/// SQL Token - every element the renderer emits.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // === Keywords ===
    Select,
    From,
    Where,
    And,
    Or,
    Not,
    On,
    Join,
    Inner,
    Left,
    Outer,
    GroupBy,
    Having,
    OrderBy,
    Asc,
    Desc,
    NullsFirst,
    NullsLast,
    Limit,
    Offset,
    Fetch,
    Next,
    First,
    Rows,
    Only,
    Case,
    When,
    Then,
    Else,
    End,
    In,
    Between,
    Like,
    Escape,
    IsNull,
    IsNotNull,
    Distinct,
    Exists,
    Update,
    Set,
    Delete,

    // === Punctuation ===
    Comma,
    Dot,
    Star,
    LParen,
    RParen,

    // === Operators ===
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Concat,

    // === Whitespace / Formatting ===
    Space,
    Newline,
    Indent(usize),

    // === Dynamic Content ===
    /// Identifier quoted only when it is not a simple, unreserved name.
    Ident(String),
    /// Identifier that is always quoted.
    QuotedIdent(String),
    /// Qualified identifier: schema.table or just table
    QualifiedIdent {
        schema: Option<String>,
        name: String,
        quoted: bool,
    },
    LitInt(i64),
    /// Float literal; non-finite values render as `null`.
    LitFloat(f64),
    LitString(String),
    LitBool(bool),
    LitNull,
    /// JDBC parameter marker; `usize` indexes the renderer's slot list.
    Param(usize),

    /// Function name, remapped per dialect.
    FunctionName(String),
}

/// Whether `ident` can be emitted without quotes.
pub fn is_simple_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn identifier(dialect: Dialect, ident: &str, force: bool) -> String {
    if force || !is_simple_identifier(ident) || dialect.is_reserved(ident) {
        dialect.quote_identifier(ident)
    } else {
        ident.to_string()
    }
}

impl Token {
    /// Serialize this token to a string for the given dialect.
    pub fn serialize(&self, dialect: Dialect) -> String {
        match self {
            // Keywords
            Token::Select => "select".into(),
            Token::From => "from".into(),
            Token::Where => "where".into(),
            Token::And => "and".into(),
            Token::Or => "or".into(),
            Token::Not => "not".into(),
            Token::On => "on".into(),
            Token::Join => "join".into(),
            Token::Inner => "inner".into(),
            Token::Left => "left".into(),
            Token::Outer => "outer".into(),
            Token::GroupBy => "group by".into(),
            Token::Having => "having".into(),
            Token::OrderBy => "order by".into(),
            Token::Asc => "asc".into(),
            Token::Desc => "desc".into(),
            Token::NullsFirst => "nulls first".into(),
            Token::NullsLast => "nulls last".into(),
            Token::Limit => "limit".into(),
            Token::Offset => "offset".into(),
            Token::Fetch => "fetch".into(),
            Token::Next => "next".into(),
            Token::First => "first".into(),
            Token::Rows => "rows".into(),
            Token::Only => "only".into(),
            Token::Case => "case".into(),
            Token::When => "when".into(),
            Token::Then => "then".into(),
            Token::Else => "else".into(),
            Token::End => "end".into(),
            Token::In => "in".into(),
            Token::Between => "between".into(),
            Token::Like => "like".into(),
            Token::Escape => "escape".into(),
            Token::IsNull => "is null".into(),
            Token::IsNotNull => "is not null".into(),
            Token::Distinct => "distinct".into(),
            Token::Exists => "exists".into(),
            Token::Update => "update".into(),
            Token::Set => "set".into(),
            Token::Delete => "delete".into(),

            // Punctuation
            Token::Comma => ",".into(),
            Token::Dot => ".".into(),
            Token::Star => "*".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),

            // Operators
            Token::Eq => "=".into(),
            Token::Ne => "<>".into(),
            Token::Lt => "<".into(),
            Token::Gt => ">".into(),
            Token::Lte => "<=".into(),
            Token::Gte => ">=".into(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Mul => "*".into(),
            Token::Div => "/".into(),
            Token::Mod => "%".into(),
            Token::Concat => dialect.concat_operator().into(),

            // Whitespace
            Token::Space => " ".into(),
            Token::Newline => "\n".into(),
            Token::Indent(n) => "  ".repeat(*n),

            // Dynamic - dialect-specific formatting
            Token::Ident(name) => identifier(dialect, name, false),
            Token::QuotedIdent(name) => dialect.quote_identifier(name),
            Token::QualifiedIdent {
                schema,
                name,
                quoted,
            } => match schema {
                Some(s) => format!(
                    "{}.{}",
                    identifier(dialect, s, *quoted),
                    identifier(dialect, name, *quoted)
                ),
                None => identifier(dialect, name, *quoted),
            },
            Token::LitInt(n) => n.to_string(),
            Token::LitFloat(f) => {
                if !f.is_finite() {
                    return "null".into();
                }
                let mut buffer = ryu::Buffer::new();
                buffer.format(*f).to_string()
            }
            Token::LitString(s) => dialect.quote_string(s),
            Token::LitBool(b) => dialect.format_bool(*b).into(),
            Token::LitNull => "null".into(),
            Token::Param(_) => "?".into(),

            Token::FunctionName(name) => match dialect.remap_function(name) {
                Some(remapped) => remapped.to_string(),
                None => name.to_lowercase(),
            },
        }
    }
}

/// A stream of tokens that can be serialized to SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Create an empty token stream.
    pub fn new() -> Self {
        Self { tokens: vec![] }
    }

    /// Push a single token.
    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    /// Extend with multiple tokens.
    pub fn extend(&mut self, tokens: impl IntoIterator<Item = Token>) -> &mut Self {
        self.tokens.extend(tokens);
        self
    }

    /// Append another token stream.
    pub fn append(&mut self, other: &TokenStream) -> &mut Self {
        self.tokens.extend(other.tokens.iter().cloned());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Parameter slot indexes in emission order.
    pub fn parameter_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.tokens.iter().filter_map(|t| match t {
            Token::Param(slot) => Some(*slot),
            _ => None,
        })
    }

    /// Serialize all tokens to a SQL string.
    pub fn serialize(&self, dialect: Dialect) -> String {
        self.tokens.iter().map(|t| t.serialize(dialect)).collect()
    }

    // Convenience methods for common tokens
    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }
    pub fn newline(&mut self) -> &mut Self {
        self.push(Token::Newline)
    }
    pub fn indent(&mut self, n: usize) -> &mut Self {
        self.push(Token::Indent(n))
    }
    pub fn comma(&mut self) -> &mut Self {
        self.push(Token::Comma)
    }
    pub fn lparen(&mut self) -> &mut Self {
        self.push(Token::LParen)
    }
    pub fn rparen(&mut self) -> &mut Self {
        self.push(Token::RParen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_serialize() {
        assert_eq!(Token::Select.serialize(Dialect::Ansi), "select");
        assert_eq!(Token::GroupBy.serialize(Dialect::TSql), "group by");
    }

    #[test]
    fn test_ident_quoted_only_when_needed() {
        let tok = Token::Ident("person".into());
        assert_eq!(tok.serialize(Dialect::Postgres), "person");

        let tok = Token::Ident("order".into());
        assert_eq!(tok.serialize(Dialect::Postgres), "\"order\"");
        assert_eq!(tok.serialize(Dialect::TSql), "[order]");
        assert_eq!(tok.serialize(Dialect::MySql), "`order`");

        let tok = Token::Ident("first name".into());
        assert_eq!(tok.serialize(Dialect::Ansi), "\"first name\"");
    }

    #[test]
    fn test_quoted_ident() {
        let tok = Token::QuotedIdent("users".into());
        assert_eq!(tok.serialize(Dialect::Ansi), "\"users\"");
        assert_eq!(tok.serialize(Dialect::TSql), "[users]");
    }

    #[test]
    fn test_qualified_ident() {
        let tok = Token::QualifiedIdent {
            schema: Some("dbo".into()),
            name: "users".into(),
            quoted: true,
        };
        assert_eq!(tok.serialize(Dialect::TSql), "[dbo].[users]");

        let tok = Token::QualifiedIdent {
            schema: Some("hr".into()),
            name: "person".into(),
            quoted: false,
        };
        assert_eq!(tok.serialize(Dialect::Ansi), "hr.person");
    }

    #[test]
    fn test_token_stream() {
        let mut ts = TokenStream::new();
        ts.push(Token::Select)
            .space()
            .push(Token::Ident("name".into()))
            .space()
            .push(Token::From)
            .space()
            .push(Token::Ident("users".into()))
            .space()
            .push(Token::Where)
            .space()
            .push(Token::Ident("id".into()))
            .space()
            .push(Token::Eq)
            .space()
            .push(Token::Param(0));

        assert_eq!(
            ts.serialize(Dialect::Postgres),
            "select name from users where id = ?"
        );
        assert_eq!(ts.parameter_slots().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_concat_dialect() {
        assert_eq!(Token::Concat.serialize(Dialect::Ansi), "||");
        assert_eq!(Token::Concat.serialize(Dialect::TSql), "+");
    }

    #[test]
    fn test_function_remap() {
        assert_eq!(
            Token::FunctionName("LENGTH".into()).serialize(Dialect::TSql),
            "len"
        );
        assert_eq!(
            Token::FunctionName("Upper".into()).serialize(Dialect::Ansi),
            "upper"
        );
    }

    #[test]
    fn test_float_serialize() {
        assert_eq!(Token::LitFloat(3.25).serialize(Dialect::Ansi), "3.25");
        assert_eq!(Token::LitFloat(1.0).serialize(Dialect::Ansi), "1.0");
        assert_eq!(Token::LitFloat(-42.5).serialize(Dialect::Ansi), "-42.5");
        assert_eq!(Token::LitFloat(f64::NAN).serialize(Dialect::Ansi), "null");
        assert_eq!(
            Token::LitFloat(f64::INFINITY).serialize(Dialect::Ansi),
            "null"
        );
    }
}
