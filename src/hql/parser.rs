//! Parser for HQL using chumsky.
//!
//! Transforms the lexer's token stream into the syntax tree in [`super::ast`].
//! Every parser here is generic over the input type, accepting any
//! `ValueInput` that produces `Token` values with `SimpleSpan` spans.

use chumsky::input::ValueInput;
use chumsky::prelude::*;

use super::ast::*;
use super::lexer::Token;
use super::span::{merge, Span, Spanned};

type ParserExtra<'tokens, 'src> = extra::Err<Rich<'tokens, Token<'src>, SimpleSpan>>;

/// Convert a SimpleSpan to our Span type (Range<usize>)
fn to_span(span: SimpleSpan) -> Span {
    span.start..span.end
}

/// Suffix of a comparison-level predicate, applied to the left operand.
enum PredicateSuffix {
    Compare(ComparisonOp, Spanned<Expr>),
    IsNull(bool),
    Between(bool, Spanned<Expr>, Spanned<Expr>),
    Like(bool, Spanned<Expr>, Option<Spanned<Expr>>),
    InList(bool, Vec<Spanned<Expr>>),
    InSubquery(bool, QuerySpec),
}

// ==========================================================================
// Basic token parsers
// ==========================================================================

fn ident<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, Spanned<String>, ParserExtra<'tokens, 'src>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    select! {
        Token::Ident(s) => s.to_string(),
    }
    .map_with(|s, e| Spanned::new(s, to_span(e.span())))
    .labelled("identifier")
}

/// A path segment after a dot may also be a soft keyword (`p.order`).
fn path_segment<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, String, ParserExtra<'tokens, 'src>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    select! {
        Token::Ident(s) => s.to_string(),
    }
    .or(any()
        .filter(|t: &Token<'src>| t.is_soft_keyword())
        .map(|t: Token<'src>| t.to_string()))
    .labelled("attribute name")
}

/// `ident ( . segment )*`
fn path<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, Vec<String>, ParserExtra<'tokens, 'src>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    ident()
        .then(
            just(Token::Dot)
                .ignore_then(path_segment())
                .repeated()
                .collect::<Vec<_>>(),
        )
        .map(|(head, tail)| {
            let mut segments = Vec::with_capacity(tail.len() + 1);
            segments.push(head.value);
            segments.extend(tail);
            segments
        })
        .labelled("path")
}

/// `[as] alias`
fn alias<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, Option<Spanned<String>>, ParserExtra<'tokens, 'src>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    just(Token::As)
        .or_not()
        .ignore_then(ident())
        .or_not()
}

fn parameter<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, ParameterRef, ParserExtra<'tokens, 'src>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    let named = select! {
        Token::NamedParam(s) => ParameterRef::Named(s.to_string()),
    };
    let positional = select! {
        Token::PositionalParam(s) => s,
    }
    .try_map(|s: &str, span| {
        s.parse::<u32>()
            .map(ParameterRef::Positional)
            .map_err(|_| Rich::custom(span, format!("invalid parameter ordinal: ?{}", s)))
    });
    named.or(positional).labelled("parameter")
}

fn literal<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, Literal, ParserExtra<'tokens, 'src>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    let integer = select! {
        Token::Integer(s) => s,
    }
    .try_map(|s: &str, span| {
        s.parse::<i64>()
            .map(Literal::Integer)
            .map_err(|_| Rich::custom(span, format!("integer literal out of range: {}", s)))
    });

    let decimal = select! {
        Token::Decimal(s) => s,
    }
    .try_map(|s: &str, span| {
        s.parse::<f64>()
            .map(Literal::Decimal)
            .map_err(|_| Rich::custom(span, format!("invalid decimal literal: {}", s)))
    });

    let other = select! {
        Token::StringLit(s) => Literal::String(s.replace("''", "'")),
        Token::True => Literal::Boolean(true),
        Token::False => Literal::Boolean(false),
        Token::Null => Literal::Null,
    };

    choice((integer, decimal, other)).labelled("literal")
}

/// A minus sign directly before a numeric token, folded into the literal so
/// the most negative integer can be written.
fn negative_number<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, Literal, ParserExtra<'tokens, 'src>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    just(Token::Minus)
        .ignore_then(select! {
            Token::Integer(s) => (s, false),
            Token::Decimal(s) => (s, true),
        })
        .try_map(|(digits, is_decimal): (&str, bool), span| {
            let text = format!("-{}", digits);
            if is_decimal {
                text.parse::<f64>()
                    .map(Literal::Decimal)
                    .map_err(|_| Rich::custom(span, format!("invalid decimal literal: {}", text)))
            } else {
                text.parse::<i64>().map(Literal::Integer).map_err(|_| {
                    Rich::custom(span, format!("integer literal out of range: {}", text))
                })
            }
        })
}

// ==========================================================================
// Expressions
// ==========================================================================

/// Expression parser covering arithmetic, functions, and predicates.
///
/// Precedence, loosest first: `or`, `and`, `not`, comparison-level
/// predicates, additive (`+ - ||`), multiplicative (`* / %`), unary minus.
pub fn expr_parser<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, Spanned<Expr>, ParserExtra<'tokens, 'src>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    recursive(|expr| {
        let subquery = query_spec(expr.clone())
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .boxed();

        // name( * ) | name( [distinct] args )
        let function = select! {
            Token::Ident(s) => s.to_string(),
        }
        .then(
            choice((
                just(Token::Star).to((false, true, Vec::new())),
                just(Token::Distinct)
                    .or_not()
                    .map(|d| d.is_some())
                    .then(
                        expr.clone()
                            .separated_by(just(Token::Comma))
                            .collect::<Vec<_>>(),
                    )
                    .map(|(distinct, args)| (distinct, false, args)),
            ))
            .delimited_by(just(Token::LParen), just(Token::RParen)),
        )
        .map(|(name, (distinct, star, args))| Expr::Function {
            name,
            distinct,
            star,
            args,
        });

        let exists = just(Token::Exists)
            .ignore_then(subquery.clone())
            .map(|q| Expr::Exists(Box::new(q)));

        let parenthesized = expr
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .map_with(|inner: Spanned<Expr>, e| Spanned::new(inner.value, to_span(e.span())));

        let atom = choice((
            literal().map(Expr::Literal),
            parameter().map(Expr::Parameter),
            function,
            exists,
            path().map(Expr::Path),
        ))
        .map_with(|ex, e| Spanned::new(ex, to_span(e.span())))
        .or(parenthesized)
        .boxed();

        let negated = just(Token::Minus)
            .map_with(|_, e| to_span(e.span()))
            .repeated()
            .foldr(atom, |minus: Span, operand: Spanned<Expr>| {
                let span = merge(&minus, &operand.span);
                Spanned::new(Expr::Negate(Box::new(operand)), span)
            });
        let unary = negative_number()
            .map_with(|lit, e| Spanned::new(Expr::Literal(lit), to_span(e.span())))
            .or(negated)
            .boxed();

        let product = unary
            .clone()
            .foldl(
                select! {
                    Token::Star => ArithmeticOp::Multiply,
                    Token::Slash => ArithmeticOp::Divide,
                    Token::Percent => ArithmeticOp::Modulo,
                }
                .then(unary)
                .repeated(),
                |lhs, (op, rhs)| {
                    spanned_binary(lhs, rhs, |lhs, rhs| Expr::Arithmetic { op, lhs, rhs })
                },
            )
            .boxed();

        let sum = product
            .clone()
            .foldl(
                select! {
                    Token::Plus => ArithmeticOp::Add,
                    Token::Minus => ArithmeticOp::Subtract,
                    Token::Concat => ArithmeticOp::Concat,
                }
                .then(product)
                .repeated(),
                |lhs, (op, rhs)| {
                    spanned_binary(lhs, rhs, |lhs, rhs| Expr::Arithmetic { op, lhs, rhs })
                },
            )
            .boxed();

        // Predicate suffixes
        let compare = select! {
            Token::Eq => ComparisonOp::Eq,
            Token::NotEq => ComparisonOp::NotEq,
            Token::Lt => ComparisonOp::Lt,
            Token::LtEq => ComparisonOp::LtEq,
            Token::Gt => ComparisonOp::Gt,
            Token::GtEq => ComparisonOp::GtEq,
        }
        .then(sum.clone())
        .map(|(op, rhs)| PredicateSuffix::Compare(op, rhs));

        let is_null = just(Token::Is)
            .ignore_then(just(Token::Not).or_not().map(|n| n.is_some()))
            .then_ignore(just(Token::Null))
            .map(PredicateSuffix::IsNull);

        let between = just(Token::Between)
            .ignore_then(sum.clone())
            .then_ignore(just(Token::And))
            .then(sum.clone());

        let like = just(Token::Like)
            .ignore_then(sum.clone())
            .then(just(Token::Escape).ignore_then(sum.clone()).or_not());

        let in_list = expr
            .clone()
            .separated_by(just(Token::Comma))
            .at_least(1)
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        // `in :ids` is shorthand for `in (:ids)`
        let in_parameter = parameter()
            .map_with(|p, e| vec![Spanned::new(Expr::Parameter(p), to_span(e.span()))]);

        let in_target = just(Token::In).ignore_then(choice((
            subquery.clone().map(InTarget::Subquery),
            in_list.map(InTarget::List),
            in_parameter.map(InTarget::List),
        )));

        let negatable = just(Token::Not)
            .or_not()
            .map(|n| n.is_some())
            .then(choice((
                between.map(NegatableSuffix::Between),
                like.map(|(pattern, escape)| NegatableSuffix::Like(pattern, escape)),
                in_target.map(NegatableSuffix::In),
            )))
            .map(|(negated, suffix)| match suffix {
                NegatableSuffix::Between((low, high)) => {
                    PredicateSuffix::Between(negated, low, high)
                }
                NegatableSuffix::Like(pattern, escape) => {
                    PredicateSuffix::Like(negated, pattern, escape)
                }
                NegatableSuffix::In(InTarget::List(list)) => PredicateSuffix::InList(negated, list),
                NegatableSuffix::In(InTarget::Subquery(query)) => {
                    PredicateSuffix::InSubquery(negated, query)
                }
            });

        let comparison = sum
            .then(choice((compare, is_null, negatable)).or_not())
            .map_with(|(lhs, suffix), e| match suffix {
                None => lhs,
                Some(suffix) => Spanned::new(apply_suffix(lhs, suffix), to_span(e.span())),
            })
            .boxed();

        let negation = just(Token::Not)
            .map_with(|_, e| to_span(e.span()))
            .repeated()
            .foldr(comparison, |not: Span, operand: Spanned<Expr>| {
                let span = merge(&not, &operand.span);
                Spanned::new(Expr::Not(Box::new(operand)), span)
            })
            .boxed();

        let conjunction = negation
            .clone()
            .foldl(just(Token::And).ignore_then(negation).repeated(), |lhs, rhs| {
                spanned_binary(lhs, rhs, Expr::And)
            })
            .boxed();

        conjunction
            .clone()
            .foldl(just(Token::Or).ignore_then(conjunction).repeated(), |lhs, rhs| {
                spanned_binary(lhs, rhs, Expr::Or)
            })
            .labelled("expression")
    })
}

enum InTarget {
    List(Vec<Spanned<Expr>>),
    Subquery(QuerySpec),
}

enum NegatableSuffix {
    Between((Spanned<Expr>, Spanned<Expr>)),
    Like(Spanned<Expr>, Option<Spanned<Expr>>),
    In(InTarget),
}

fn apply_suffix(lhs: Spanned<Expr>, suffix: PredicateSuffix) -> Expr {
    let expr = Box::new(lhs);
    match suffix {
        PredicateSuffix::Compare(op, rhs) => Expr::Comparison {
            op,
            lhs: expr,
            rhs: Box::new(rhs),
        },
        PredicateSuffix::IsNull(negated) => Expr::IsNull { expr, negated },
        PredicateSuffix::Between(negated, low, high) => Expr::Between {
            expr,
            low: Box::new(low),
            high: Box::new(high),
            negated,
        },
        PredicateSuffix::Like(negated, pattern, escape) => Expr::Like {
            expr,
            pattern: Box::new(pattern),
            escape: escape.map(Box::new),
            negated,
        },
        PredicateSuffix::InList(negated, list) => Expr::InList {
            expr,
            list,
            negated,
        },
        PredicateSuffix::InSubquery(negated, query) => Expr::InSubquery {
            expr,
            query: Box::new(query),
            negated,
        },
    }
}

// ==========================================================================
// Query specification: select / from / where / group by / having
// ==========================================================================

/// Parser for a query body, shared by top-level selects and sub-queries.
fn query_spec<'tokens, 'src: 'tokens, I, P>(
    expr: P,
) -> impl Parser<'tokens, I, QuerySpec, ParserExtra<'tokens, 'src>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
    P: Parser<'tokens, I, Spanned<Expr>, ParserExtra<'tokens, 'src>> + Clone + 'tokens,
{
    let select_item = expr
        .clone()
        .then(alias())
        .map(|(expr, alias)| SelectItem { expr, alias });

    let select_clause = just(Token::Select)
        .ignore_then(just(Token::Distinct).or_not().map(|d| d.is_some()))
        .then(
            select_item
                .separated_by(just(Token::Comma))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .map(|(distinct, items)| SelectClause { distinct, items });

    let join_kind = choice((
        just(Token::Left)
            .then(just(Token::Outer).or_not())
            .then(just(Token::Join))
            .to(JoinKind::LeftOuter),
        just(Token::Inner)
            .or_not()
            .then(just(Token::Join))
            .to(JoinKind::Inner),
    ));

    let join = join_kind
        .then(just(Token::Fetch).or_not().map(|f| f.is_some()))
        .then(path().map_with(|p, e| Spanned::new(p, to_span(e.span()))))
        .then(alias())
        .then(
            choice((just(Token::On), just(Token::With)))
                .ignore_then(expr.clone())
                .or_not(),
        )
        .map(|((((kind, fetch), path), alias), condition)| JoinClause {
            kind,
            fetch,
            path,
            alias,
            condition,
        });

    let from_root = ident()
        .then(alias())
        .then(join.repeated().collect::<Vec<_>>())
        .map(|((entity, alias), joins)| FromRoot {
            entity,
            alias,
            joins,
        });

    let from_clause = just(Token::From).ignore_then(
        from_root
            .separated_by(just(Token::Comma))
            .at_least(1)
            .collect::<Vec<_>>(),
    );

    let where_clause = just(Token::Where).ignore_then(expr.clone()).or_not();

    let group_by = just(Token::Group)
        .then(just(Token::By))
        .ignore_then(
            expr.clone()
                .separated_by(just(Token::Comma))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .or_not()
        .map(Option::unwrap_or_default);

    let having = just(Token::Having).ignore_then(expr).or_not();

    select_clause
        .or_not()
        .then(from_clause)
        .then(where_clause)
        .then(group_by)
        .then(having)
        .map(|((((select, from), where_clause), group_by), having)| QuerySpec {
            select,
            from,
            where_clause,
            group_by,
            having,
        })
        .boxed()
}

// ==========================================================================
// Statements
// ==========================================================================

/// Create the statement parser.
///
/// Accepts exactly one select, update, or delete statement followed by the
/// end of input.
pub fn parser<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, Statement, ParserExtra<'tokens, 'src>>
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    let expr = expr_parser();

    let direction = choice((
        just(Token::Asc).to(SortDirection::Ascending),
        just(Token::Desc).to(SortDirection::Descending),
    ))
    .or_not()
    .map(Option::unwrap_or_default);

    let nulls = just(Token::Nulls)
        .ignore_then(choice((
            just(Token::First).to(NullPrecedence::First),
            just(Token::Last).to(NullPrecedence::Last),
        )))
        .or_not();

    let sort_item = expr
        .clone()
        .then(direction)
        .then(nulls)
        .map(|((expr, direction), nulls)| SortItem {
            expr,
            direction,
            nulls,
        });

    let order_by = just(Token::Order)
        .then(just(Token::By))
        .ignore_then(
            sort_item
                .separated_by(just(Token::Comma))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .or_not()
        .map(Option::unwrap_or_default);

    let select = query_spec(expr.clone())
        .then(order_by)
        .then(just(Token::Limit).ignore_then(expr.clone()).or_not())
        .then(just(Token::Offset).ignore_then(expr.clone()).or_not())
        .map(|(((query, order_by), limit), offset)| SelectStatement {
            query,
            order_by,
            limit,
            offset,
        });

    let where_clause = just(Token::Where).ignore_then(expr.clone()).or_not();

    let assignment = path()
        .map_with(|p, e| Spanned::new(p, to_span(e.span())))
        .then_ignore(just(Token::Eq))
        .then(expr.clone())
        .map(|(target, value)| Assignment { target, value });

    let update = just(Token::Update)
        .ignore_then(ident())
        .then(alias())
        .then_ignore(just(Token::Set))
        .then(
            assignment
                .separated_by(just(Token::Comma))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .then(where_clause.clone())
        .map(|(((entity, alias), assignments), where_clause)| UpdateStatement {
            entity,
            alias,
            assignments,
            where_clause,
        });

    let delete = just(Token::Delete)
        .ignore_then(just(Token::From).or_not())
        .ignore_then(ident())
        .then(alias())
        .then(where_clause)
        .map(|((entity, alias), where_clause)| DeleteStatement {
            entity,
            alias,
            where_clause,
        });

    choice((
        select.map(Statement::Select),
        update.map(Statement::Update),
        delete.map(Statement::Delete),
    ))
    .then_ignore(end())
}
