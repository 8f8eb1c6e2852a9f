//! Availability probes for UI gating.
//!
//! Each probe reduces a recommendation strategy to a yes/no existence check:
//! the strategy query with an empty prefix filter, bounded to one row. The
//! specialize probe is two-step — the one-hop specialization first, then a
//! class-search variant — and that exact order is load-bearing: both queries
//! run strictly sequentially, the second only when the first is empty.

use crate::coin::{RecordKind, Side};
use crate::error::SearchError;
use crate::hierarchy::{
    class_query, equivalent_query, simple_generalize_query, simple_specialize_query,
    subject_participation_query, TagContext,
};
use crate::navigator::{run_query, PRIMARY_KIND};
use crate::store::TripleStore;

const PROBE_LIMIT: u64 = 1;

/// At least one one-hop generalization exists for the current entity.
pub fn generalize_available<S: TripleStore>(
    store: &S,
    prefixes: &[(String, String)],
    ctx: &TagContext,
) -> Result<bool, SearchError> {
    let query = simple_generalize_query(&ctx.without_filter(), PRIMARY_KIND).with_limit(PROBE_LIMIT);
    Ok(!run_query(store, prefixes, query)?.is_empty())
}

/// At least one specialization exists for the current entity.
///
/// Tries the one-hop specialization first; only if that is empty, the
/// class-search variant, before declaring unavailable.
pub fn specialize_available<S: TripleStore>(
    store: &S,
    prefixes: &[(String, String)],
    ctx: &TagContext,
) -> Result<bool, SearchError> {
    let ctx = ctx.without_filter();
    let one_hop = simple_specialize_query(&ctx, PRIMARY_KIND).with_limit(PROBE_LIMIT);
    if !run_query(store, prefixes, one_hop)?.is_empty() {
        return Ok(true);
    }
    let class_variant = class_query(&ctx, PRIMARY_KIND).with_limit(PROBE_LIMIT);
    Ok(!run_query(store, prefixes, class_variant)?.is_empty())
}

/// At least one sibling exists for the current entity.
pub fn equivalent_available<S: TripleStore>(
    store: &S,
    prefixes: &[(String, String)],
    ctx: &TagContext,
) -> Result<bool, SearchError> {
    let query = equivalent_query(&ctx.without_filter(), PRIMARY_KIND).with_limit(PROBE_LIMIT);
    Ok(!run_query(store, prefixes, query)?.is_empty())
}

/// The bound (possibly class-typed) subject participates in some triple on
/// the given side; gates predicate/object recommendations as a whole.
pub fn recommendations_available<S: TripleStore>(
    store: &S,
    prefixes: &[(String, String)],
    subject: &str,
    side: Side,
) -> Result<bool, SearchError> {
    let query = subject_participation_query(subject, side, RecordKind::NumismaticObject);
    Ok(!run_query(store, prefixes, query)?.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Row, StaticStore};

    fn ctx() -> TagContext {
        TagContext::from_raw(
            "http://example.org/id/deities",
            "",
            "",
            true,
            Side::Obverse,
            // Typed prefixes never reach probe queries.
            "art",
        )
    }

    fn one_row() -> Vec<Row> {
        vec![Row::from_pairs(&[("candidate", "http://example.org/id/x")])]
    }

    #[test]
    fn generalize_probe_reports_presence() {
        let empty = StaticStore::empty();
        assert!(!generalize_available(&empty, &[], &ctx()).unwrap());

        let populated = StaticStore::empty().with_default(one_row());
        assert!(generalize_available(&populated, &[], &ctx()).unwrap());
    }

    #[test]
    fn probe_queries_drop_the_typed_prefix_and_bound_one_row() {
        let store = StaticStore::empty();
        // Rendered probe query must filter on the empty prefix, not "art".
        let query = simple_generalize_query(&ctx().without_filter(), PRIMARY_KIND)
            .with_limit(1)
            .render();
        assert!(query.contains("LCASE(\"\")"));
        assert!(!query.contains("\"art\""));
        assert!(query.ends_with("LIMIT 1\n"));
        let _ = generalize_available(&store, &[], &ctx()).unwrap();
    }

    #[test]
    fn specialize_probe_tries_one_hop_then_class_variant() {
        // Nothing anywhere: both steps run, result false.
        let empty = StaticStore::empty();
        assert!(!specialize_available(&empty, &[], &ctx()).unwrap());

        // Only the class-search variant has a row: still available.
        let class_only = StaticStore::empty()
            .respond_when("rdfs:subClassOf <http://example.org/id/deities>", vec![])
            .respond_when("rdfs:Class", one_row());
        assert!(specialize_available(&class_only, &[], &ctx()).unwrap());

        // One-hop hit short-circuits.
        let one_hop = StaticStore::empty()
            .respond_when("rdfs:subClassOf <http://example.org/id/deities>", one_row());
        assert!(specialize_available(&one_hop, &[], &ctx()).unwrap());
    }

    #[test]
    fn participation_probe_flips_once_a_triple_exists() {
        let subject = "http://example.org/id/artemis";
        let empty = StaticStore::empty();
        assert!(!recommendations_available(&empty, &[], subject, Side::Obverse).unwrap());

        let populated = StaticStore::empty().with_default(one_row());
        assert!(recommendations_available(&populated, &[], subject, Side::Obverse).unwrap());
    }
}
