//! Query assembler: boolean term × coin descriptions → one SELECT query.
//!
//! The boolean term is parsed and normalized first (so `NOT` only wraps
//! single placeholders), then lowered structurally: a leaf becomes that
//! coin's fragment group, `AND` becomes adjacent groups, `OR` becomes a
//! union. Each placeholder index gets exactly one negation verdict — if
//! `NOT Ci` occurs anywhere in the normalized term, every occurrence of `Ci`
//! is built negated.
//!
//! A term referencing a placeholder with no matching coin is rejected here,
//! before anything reaches the store.

use std::collections::BTreeSet;

use nummograph_dsl::bool_term::BoolTerm;
use nummograph_dsl::sparql::{Pattern, Projection, SelectQuery};

use crate::builder::coin_fragment;
use crate::coin::{CoinSpec, RecordKind};
use crate::error::SearchError;

/// Column list of the outer search query, in projection order.
pub const SELECT_COLUMNS: [&str; 11] = [
    "url",
    "thumbnailObverse",
    "thumbnailReverse",
    "descriptionObverse",
    "descriptionReverse",
    "date",
    "maxDiameter",
    "id",
    "weight",
    "type",
    "mint",
];

/// Compile coin descriptions combined by a boolean term into a SELECT query.
///
/// The returned query carries no prefix declarations; the caller attaches the
/// configured namespace preamble before rendering.
pub fn compile_query(
    coins: &[CoinSpec],
    term: &str,
    kind: RecordKind,
) -> Result<SelectQuery, SearchError> {
    let term = BoolTerm::parse(term)?.normalize();

    if let Some(&placeholder) = term.placeholders().iter().next_back() {
        if placeholder > coins.len() {
            return Err(SearchError::PlaceholderOutOfRange {
                placeholder,
                coins: coins.len(),
            });
        }
    }

    let negated = term.negated_placeholders();
    let patterns = lower_term(&term, coins, kind, &negated);

    Ok(SelectQuery::new(
        SELECT_COLUMNS.iter().map(|c| Projection::var(*c)).collect(),
        patterns,
    ))
}

fn lower_term(
    term: &BoolTerm,
    coins: &[CoinSpec],
    kind: RecordKind,
    negated: &BTreeSet<usize>,
) -> Vec<Pattern> {
    match term {
        BoolTerm::Coin(i) => vec![Pattern::Group(coin_fragment(
            *i,
            &coins[i - 1],
            kind,
            negated.contains(i),
        ))],
        // Normalized, so this only wraps a leaf; the verdict is already
        // applied through `negated`.
        BoolTerm::Not(inner) => lower_term(inner, coins, kind, negated),
        BoolTerm::And(a, b) => {
            let mut out = lower_term(a, coins, kind, negated);
            out.extend(lower_term(b, coins, kind, negated));
            out
        }
        BoolTerm::Or(..) => {
            let mut arms = Vec::new();
            collect_union_arms(term, coins, kind, negated, &mut arms);
            vec![Pattern::Union(arms)]
        }
    }
}

// Flatten nested ORs into sibling union arms.
fn collect_union_arms(
    term: &BoolTerm,
    coins: &[CoinSpec],
    kind: RecordKind,
    negated: &BTreeSet<usize>,
    arms: &mut Vec<Vec<Pattern>>,
) {
    match term {
        BoolTerm::Or(a, b) => {
            collect_union_arms(a, coins, kind, negated, arms);
            collect_union_arms(b, coins, kind, negated, arms);
        }
        other => arms.push(lower_term(other, coins, kind, negated)),
    }
}
