//! Boolean search-term DSL.
//!
//! The tag-builder UI combines per-coin descriptions by a boolean expression
//! over positional placeholders: `C1 AND (NOT C2 OR C1)`. The query compiler
//! needs two things from that text:
//!
//! - a normal form in which `NOT` only ever wraps a single placeholder (so
//!   every placeholder gets exactly one negation verdict), and
//! - the AND/OR skeleton, which maps to conjunction/union in the generated
//!   graph pattern.
//!
//! We parse into an expression tree and normalize by pushing negations down
//! with De Morgan's laws. `NOT NOT x` collapses to `x`.

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char as pchar, digit1, multispace0};
use nom::combinator::{all_consuming, map, map_res};
use nom::multi::many0;
use nom::sequence::{delimited, preceded, tuple};
use nom::IResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoolTermError {
    #[error("empty boolean term")]
    Empty,
    #[error("malformed boolean term near `{0}`")]
    Malformed(String),
    #[error("coin placeholders are numbered from 1 (`C1`), got `C0`")]
    ZeroPlaceholder,
}

/// A boolean combination of coin placeholders.
///
/// Leaves are 1-based placeholder indices: `Coin(2)` is the UI's `C2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolTerm {
    Coin(usize),
    Not(Box<BoolTerm>),
    And(Box<BoolTerm>, Box<BoolTerm>),
    Or(Box<BoolTerm>, Box<BoolTerm>),
}

impl BoolTerm {
    pub fn parse(input: &str) -> Result<Self, BoolTermError> {
        if input.trim().is_empty() {
            return Err(BoolTermError::Empty);
        }
        match all_consuming(delimited(multispace0, or_expr, multispace0))(input) {
            Ok((_, term)) => {
                if term.placeholders().contains(&0) {
                    return Err(BoolTermError::ZeroPlaceholder);
                }
                Ok(term)
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                Err(BoolTermError::Malformed(truncate_input(e.input)))
            }
            Err(nom::Err::Incomplete(_)) => Err(BoolTermError::Malformed(truncate_input(input))),
        }
    }

    /// Rewrite so `NOT` only wraps single placeholders.
    ///
    /// `NOT (a AND b)` becomes `NOT a OR NOT b`, `NOT (a OR b)` becomes
    /// `NOT a AND NOT b`, and double negation collapses. Idempotent.
    pub fn normalize(self) -> Self {
        match self {
            BoolTerm::Coin(i) => BoolTerm::Coin(i),
            BoolTerm::And(a, b) => {
                BoolTerm::And(Box::new(a.normalize()), Box::new(b.normalize()))
            }
            BoolTerm::Or(a, b) => BoolTerm::Or(Box::new(a.normalize()), Box::new(b.normalize())),
            BoolTerm::Not(inner) => match *inner {
                BoolTerm::Coin(i) => BoolTerm::Not(Box::new(BoolTerm::Coin(i))),
                BoolTerm::Not(x) => x.normalize(),
                BoolTerm::And(a, b) => BoolTerm::Or(
                    Box::new(BoolTerm::Not(a).normalize()),
                    Box::new(BoolTerm::Not(b).normalize()),
                ),
                BoolTerm::Or(a, b) => BoolTerm::And(
                    Box::new(BoolTerm::Not(a).normalize()),
                    Box::new(BoolTerm::Not(b).normalize()),
                ),
            },
        }
    }

    /// All placeholder indices occurring in the term.
    pub fn placeholders(&self) -> std::collections::BTreeSet<usize> {
        let mut out = std::collections::BTreeSet::new();
        self.collect_placeholders(&mut out);
        out
    }

    fn collect_placeholders(&self, out: &mut std::collections::BTreeSet<usize>) {
        match self {
            BoolTerm::Coin(i) => {
                out.insert(*i);
            }
            BoolTerm::Not(inner) => inner.collect_placeholders(out),
            BoolTerm::And(a, b) | BoolTerm::Or(a, b) => {
                a.collect_placeholders(out);
                b.collect_placeholders(out);
            }
        }
    }

    /// Placeholder indices that occur under a `NOT` in the *normalized* tree.
    ///
    /// A placeholder index receives one negation verdict: if `NOT Ci` appears
    /// anywhere, every occurrence of `Ci` is treated as negated.
    pub fn negated_placeholders(&self) -> std::collections::BTreeSet<usize> {
        let mut out = std::collections::BTreeSet::new();
        self.collect_negated(false, &mut out);
        out
    }

    fn collect_negated(&self, under_not: bool, out: &mut std::collections::BTreeSet<usize>) {
        match self {
            BoolTerm::Coin(i) => {
                if under_not {
                    out.insert(*i);
                }
            }
            BoolTerm::Not(inner) => inner.collect_negated(!under_not, out),
            BoolTerm::And(a, b) | BoolTerm::Or(a, b) => {
                a.collect_negated(under_not, out);
                b.collect_negated(under_not, out);
            }
        }
    }

    /// Render back to the textual surface form, single-spaced.
    pub fn render(&self) -> String {
        self.render_prec(0)
    }

    // Precedence: OR = 1, AND = 2, NOT = 3. Children at lower precedence than
    // their parent get parenthesized; binary right operands render one level
    // tighter so right-nested chains survive the left-associative reparse.
    fn render_prec(&self, parent: u8) -> String {
        let (prec, text) = match self {
            BoolTerm::Coin(i) => (4, format!("C{i}")),
            BoolTerm::Not(inner) => (3, format!("NOT {}", inner.render_prec(3))),
            BoolTerm::And(a, b) => {
                (2, format!("{} AND {}", a.render_prec(2), b.render_prec(3)))
            }
            BoolTerm::Or(a, b) => (1, format!("{} OR {}", a.render_prec(1), b.render_prec(2))),
        };
        if prec < parent {
            format!("({text})")
        } else {
            text
        }
    }
}

/// Parse, normalize and re-render a boolean term.
///
/// The output is logically equivalent to the input and contains no
/// `NOT (...)` group; whitespace is collapsed. Self-contained: the result
/// depends on nothing but `input`.
pub fn normalize_term(input: &str) -> Result<String, BoolTermError> {
    Ok(BoolTerm::parse(input)?.normalize().render())
}

fn truncate_input(input: &str) -> String {
    let snippet: String = input.chars().take(24).collect();
    snippet.trim().to_string()
}

// ---------------------------------------------------------------------------
// nom grammar
// ---------------------------------------------------------------------------

fn or_expr(input: &str) -> IResult<&str, BoolTerm> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(keyword("OR"), and_expr))(input)?;
    Ok((input, fold_left(first, rest, |a, b| {
        BoolTerm::Or(Box::new(a), Box::new(b))
    })))
}

fn and_expr(input: &str) -> IResult<&str, BoolTerm> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(preceded(keyword("AND"), unary))(input)?;
    Ok((input, fold_left(first, rest, |a, b| {
        BoolTerm::And(Box::new(a), Box::new(b))
    })))
}

fn unary(input: &str) -> IResult<&str, BoolTerm> {
    alt((
        map(preceded(keyword("NOT"), unary), |t| BoolTerm::Not(Box::new(t))),
        primary,
    ))(input)
}

fn primary(input: &str) -> IResult<&str, BoolTerm> {
    preceded(
        multispace0,
        alt((
            delimited(
                pchar('('),
                delimited(multispace0, or_expr, multispace0),
                pchar(')'),
            ),
            placeholder,
        )),
    )(input)
}

fn placeholder(input: &str) -> IResult<&str, BoolTerm> {
    map_res(preceded(pchar('C'), digit1), |digits: &str| {
        digits.parse::<usize>().map(BoolTerm::Coin)
    })(input)
}

fn keyword(word: &'static str) -> impl Fn(&str) -> IResult<&str, ()> {
    move |input: &str| {
        map(tuple((multispace0, tag(word), multispace0)), |_| ())(input)
    }
}

fn fold_left<F>(first: BoolTerm, rest: Vec<BoolTerm>, combine: F) -> BoolTerm
where
    F: Fn(BoolTerm, BoolTerm) -> BoolTerm,
{
    rest.into_iter().fold(first, combine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn coin(i: usize) -> BoolTerm {
        BoolTerm::Coin(i)
    }

    fn not(t: BoolTerm) -> BoolTerm {
        BoolTerm::Not(Box::new(t))
    }

    fn and(a: BoolTerm, b: BoolTerm) -> BoolTerm {
        BoolTerm::And(Box::new(a), Box::new(b))
    }

    fn or(a: BoolTerm, b: BoolTerm) -> BoolTerm {
        BoolTerm::Or(Box::new(a), Box::new(b))
    }

    #[test]
    fn parses_placeholders_and_precedence() {
        let t = BoolTerm::parse("C1 OR C2 AND C3").unwrap();
        assert_eq!(t, or(coin(1), and(coin(2), coin(3))));
    }

    #[test]
    fn parses_parenthesized_groups() {
        let t = BoolTerm::parse("(C1 OR C2) AND C3").unwrap();
        assert_eq!(t, and(or(coin(1), coin(2)), coin(3)));
    }

    #[test]
    fn rejects_garbage_and_unbalanced_parens() {
        assert!(BoolTerm::parse("C1 AND (C2").is_err());
        assert!(BoolTerm::parse("C1 C2").is_err());
        assert!(BoolTerm::parse("AND C1").is_err());
        assert_eq!(BoolTerm::parse("  "), Err(BoolTermError::Empty));
        assert_eq!(BoolTerm::parse("C0"), Err(BoolTermError::ZeroPlaceholder));
    }

    #[test]
    fn not_over_and_becomes_or_of_nots() {
        let t = BoolTerm::parse("NOT (C1 AND C2)").unwrap().normalize();
        assert_eq!(t, or(not(coin(1)), not(coin(2))));
        assert_eq!(t.render(), "NOT C1 OR NOT C2");
    }

    #[test]
    fn not_over_or_becomes_and_of_nots() {
        let t = BoolTerm::parse("NOT (C1 OR C2)").unwrap().normalize();
        assert_eq!(t, and(not(coin(1)), not(coin(2))));
    }

    #[test]
    fn double_negation_collapses() {
        let t = BoolTerm::parse("NOT NOT C1").unwrap().normalize();
        assert_eq!(t, coin(1));
        let t = BoolTerm::parse("NOT (NOT C1 AND C2)").unwrap().normalize();
        assert_eq!(t, or(coin(1), not(coin(2))));
    }

    #[test]
    fn normalized_text_has_no_not_group() {
        let text = normalize_term("NOT (C1 AND NOT (C2 OR C3))").unwrap();
        assert!(!text.contains("NOT ("));
    }

    #[test]
    fn negation_verdicts_cover_every_occurrence() {
        let t = BoolTerm::parse("C1 AND (NOT C2 OR C1)").unwrap().normalize();
        let negated = t.negated_placeholders();
        assert!(negated.contains(&2));
        assert!(!negated.contains(&1));
    }

    fn bool_term_strategy() -> impl Strategy<Value = BoolTerm> {
        let leaf = (1usize..=4).prop_map(BoolTerm::Coin);
        leaf.prop_recursive(4, 24, 2, |inner| {
            prop_oneof![
                inner.clone().prop_map(|t| BoolTerm::Not(Box::new(t))),
                (inner.clone(), inner.clone())
                    .prop_map(|(a, b)| BoolTerm::And(Box::new(a), Box::new(b))),
                (inner.clone(), inner)
                    .prop_map(|(a, b)| BoolTerm::Or(Box::new(a), Box::new(b))),
            ]
        })
    }

    fn eval(t: &BoolTerm, env: &[bool]) -> bool {
        match t {
            BoolTerm::Coin(i) => env[(i - 1) % env.len()],
            BoolTerm::Not(x) => !eval(x, env),
            BoolTerm::And(a, b) => eval(a, env) && eval(b, env),
            BoolTerm::Or(a, b) => eval(a, env) || eval(b, env),
        }
    }

    fn not_only_on_leaves(t: &BoolTerm) -> bool {
        match t {
            BoolTerm::Coin(_) => true,
            BoolTerm::Not(inner) => matches!(**inner, BoolTerm::Coin(_)),
            BoolTerm::And(a, b) | BoolTerm::Or(a, b) => {
                not_only_on_leaves(a) && not_only_on_leaves(b)
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            failure_persistence: None,
            ..ProptestConfig::default()
        })]

        #[test]
        fn render_parse_roundtrips(t in bool_term_strategy()) {
            let text = t.render();
            let back = BoolTerm::parse(&text).expect("rendered term must parse");
            prop_assert_eq!(back, t);
        }

        #[test]
        fn normalize_preserves_truth_tables(t in bool_term_strategy()) {
            let n = t.clone().normalize();
            for bits in 0u8..16 {
                let env = [bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0];
                prop_assert_eq!(eval(&t, &env), eval(&n, &env));
            }
        }

        #[test]
        fn normalize_is_idempotent_and_leaf_scoped(t in bool_term_strategy()) {
            let n = t.normalize();
            prop_assert!(not_only_on_leaves(&n));
            prop_assert_eq!(n.clone().normalize(), n);
        }
    }
}
