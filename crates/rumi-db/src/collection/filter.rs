//! Filter and sort expressions for record-collection queries.
//!
//! Grammar:
//!
//! ```text
//! expr    := and ( "||" and )*
//! and     := term ( "&&" term )*
//! term    := "(" expr ")" | ident op literal
//! op      := "=" | "!=" | "~" | "!~"
//! literal := '...' | "..."      (backslash escapes the next character)
//! ```
//!
//! `~` is a case-sensitive substring match. Values that are absent compare
//! as the empty string.

use std::cmp::Ordering;

use chumsky::extra;
use chumsky::prelude::{any, choice, just, recursive, IterParser, Parser, Rich};
use rumi_core::{Error, Result};

use super::store::Record;

/// Escape a value for interpolation inside a quoted filter literal.
///
/// Every caller that builds a filter from user input must pass the input
/// through here, otherwise a quote in the input ends the literal early.
pub fn escape_filter_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'").replace('"', "\\\"")
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Contains,
    NotContains,
}

/// Parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    Compare {
        field: String,
        op: CompareOp,
        value: String,
    },
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
}

impl FilterExpr {
    /// Evaluate the expression against a record.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            FilterExpr::Compare { field, op, value } => {
                let actual = record.value_as_string(field);
                match op {
                    CompareOp::Eq => actual == *value,
                    CompareOp::NotEq => actual != *value,
                    CompareOp::Contains => actual.contains(value.as_str()),
                    CompareOp::NotContains => !actual.contains(value.as_str()),
                }
            }
            FilterExpr::And(left, right) => left.matches(record) && right.matches(record),
            FilterExpr::Or(left, right) => left.matches(record) || right.matches(record),
        }
    }
}

/// Parser extra carrying rich errors.
type Extra<'src> = extra::Err<Rich<'src, char>>;

fn field_name<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
                .repeated(),
        )
        .to_slice()
        .map(|s: &str| s.to_string())
        .labelled("field name")
}

fn compare_op<'src>() -> impl Parser<'src, &'src str, CompareOp, Extra<'src>> + Clone {
    choice((
        just("!=").to(CompareOp::NotEq),
        just("!~").to(CompareOp::NotContains),
        just('=').to(CompareOp::Eq),
        just('~').to(CompareOp::Contains),
    ))
    .labelled("operator")
}

/// Quoted literal; a backslash escapes the next character.
fn quoted<'src>(quote: char) -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    let escaped = just('\\').ignore_then(any());
    let plain = any().filter(move |c: &char| *c != quote && *c != '\\');

    just(quote)
        .ignore_then(escaped.or(plain).repeated().collect::<String>())
        .then_ignore(just(quote))
}

fn literal<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    quoted('\'').or(quoted('"')).labelled("quoted value")
}

fn comparison<'src>() -> impl Parser<'src, &'src str, FilterExpr, Extra<'src>> + Clone {
    field_name()
        .padded()
        .then(compare_op().padded())
        .then(literal().padded())
        .map(|((field, op), value)| FilterExpr::Compare { field, op, value })
}

fn filter_parser<'src>() -> impl Parser<'src, &'src str, FilterExpr, Extra<'src>> {
    recursive(|expr| {
        let group = expr.delimited_by(just('(').padded(), just(')').padded());
        let term = comparison().or(group);

        let conjunction = term.clone().foldl(
            just("&&").padded().ignore_then(term).repeated(),
            |left, right| FilterExpr::And(Box::new(left), Box::new(right)),
        );

        conjunction.clone().foldl(
            just("||").padded().ignore_then(conjunction).repeated(),
            |left, right| FilterExpr::Or(Box::new(left), Box::new(right)),
        )
    })
}

fn describe_errors(errors: &[Rich<'_, char>]) -> String {
    errors
        .iter()
        .map(|e| {
            let found = e
                .found()
                .map_or_else(|| "end of input".to_string(), |c| format!("'{}'", c));
            format!("{} at offset {} (found {})", e.reason(), e.span().start, found)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn filter_error(input: &str, reason: &str) -> Error {
    Error::InvalidInput(format!("invalid filter '{}': {}", input, reason))
}

/// Parse a filter expression. An empty or blank filter yields `None`
/// (match everything).
pub fn parse_filter(input: &str) -> Result<Option<FilterExpr>> {
    if input.trim().is_empty() {
        return Ok(None);
    }

    filter_parser()
        .parse(input)
        .into_result()
        .map(Some)
        .map_err(|errors| filter_error(input, &describe_errors(&errors)))
}

/// One sort key: field name and direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// Parse a comma-separated sort list such as `-date,title`.
pub fn parse_sort(input: &str) -> Result<Vec<SortKey>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (descending, field) = match part.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, part.strip_prefix('+').unwrap_or(part)),
            };
            if field.is_empty()
                || !field
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
            {
                return Err(Error::InvalidInput(format!(
                    "invalid sort field '{}'",
                    part
                )));
            }
            Ok(SortKey {
                field: field.to_string(),
                descending,
            })
        })
        .collect()
}

/// Compare two records by a list of sort keys.
pub fn compare_records(keys: &[SortKey], a: &Record, b: &Record) -> Ordering {
    for key in keys {
        let ordering = a
            .value_as_string(&key.field)
            .cmp(&b.value_as_string(&key.field));
        let ordering = if key.descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
