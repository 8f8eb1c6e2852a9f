//! Error taxonomy for the search core.
//!
//! Three outcomes exist: a request can be rejected before dispatch
//! (malformed expression), the upstream store can fail (propagated, never
//! retried), or the query can succeed — possibly with zero rows, which is a
//! plain empty result and never an error.

use nummograph_dsl::bool_term::BoolTermError;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SearchError {
    /// The boolean term does not parse (unbalanced parentheses, stray
    /// tokens). Rejected before any query is issued.
    #[error("malformed boolean expression: {0}")]
    MalformedExpression(#[from] BoolTermError),

    /// The boolean term references a coin placeholder with no matching coin
    /// description. Rejected before any query is issued.
    #[error("boolean expression references C{placeholder}, but only {coins} coin description(s) were given")]
    PlaceholderOutOfRange { placeholder: usize, coins: usize },

    /// Network, HTTP or decode failure at the triple store.
    #[error(transparent)]
    Store(#[from] StoreError),
}
