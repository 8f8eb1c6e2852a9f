//! Strategy execution and category grouping.
//!
//! Each entry point issues one query (the simple-specialize fallback issues a
//! second, strictly sequentially), then folds the rows into a
//! category → ordered candidate list mapping. Zero rows is a valid outcome
//! and yields an empty mapping.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use nummograph_dsl::sparql::SelectQuery;

use crate::classify::{category_for_uri, RecommendationCategory};
use crate::coin::RecordKind;
use crate::error::SearchError;
use crate::hierarchy::{
    absolute_generalize_query, absolute_specialize_query, class_query, equivalent_query,
    leaf_query, predicate_query, simple_generalize_query, simple_specialize_query, TagContext,
    CANDIDATE, CANDIDATE_NAME, SUPER_CLASS,
};
use crate::store::{Row, TripleStore};

/// Recommendations run against concrete numismatic objects.
pub(crate) const PRIMARY_KIND: RecordKind = RecordKind::NumismaticObject;

/// One recommendation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub link: String,
    #[serde(rename = "name_en")]
    pub name: String,
}

/// Category → candidates, ascending by display name within each bucket.
pub type Recommendations = BTreeMap<RecommendationCategory, Vec<Recommendation>>;

pub(crate) fn run_query<S: TripleStore>(
    store: &S,
    prefixes: &[(String, String)],
    mut query: SelectQuery,
) -> Result<Vec<Row>, SearchError> {
    query.prefixes = prefixes.to_vec();
    Ok(store.select(&query.render())?)
}

// Fold candidate rows into buckets; rows lacking the candidate columns are
// skipped (unbound SELECT columns are absent, not empty).
fn group_rows<F>(rows: Vec<Row>, category_of: F) -> Recommendations
where
    F: Fn(&Row) -> RecommendationCategory,
{
    let mut out = Recommendations::new();
    for row in rows {
        let (Some(link), Some(name)) = (row.get(CANDIDATE), row.get(CANDIDATE_NAME)) else {
            continue;
        };
        let entry = Recommendation {
            link: link.to_string(),
            name: name.to_string(),
        };
        out.entry(category_of(&row)).or_default().push(entry);
    }
    out
}

fn merge(mut left: Recommendations, right: Recommendations) -> Recommendations {
    for (category, entries) in right {
        left.entry(category).or_default().extend(entries);
    }
    left
}

// Bucket by the reported topmost superclass; rows without one classify the
// navigated entity itself.
fn bucket_by_superclass(fallback_uri: String) -> impl Fn(&Row) -> RecommendationCategory {
    move |row| match row.get(SUPER_CLASS) {
        Some(uri) => category_for_uri(uri),
        None => category_for_uri(&fallback_uri),
    }
}

/// Predicate recommendations; empty `prefix` returns all predicates.
pub fn recommend_predicates<S: TripleStore>(
    store: &S,
    prefixes: &[(String, String)],
    ctx: &TagContext,
    prefix: &str,
) -> Result<Recommendations, SearchError> {
    let prefix = if prefix.is_empty() {
        None
    } else {
        Some(prefix)
    };
    let rows = run_query(store, prefixes, predicate_query(ctx, prefix, PRIMARY_KIND))?;
    Ok(group_rows(rows, |_| RecommendationCategory::Verb))
}

/// Subject/object recommendations: leaves bucketed by superclass, then the
/// class candidates.
pub fn recommend_sub_obj<S: TripleStore>(
    store: &S,
    prefixes: &[(String, String)],
    ctx: &TagContext,
) -> Result<Recommendations, SearchError> {
    let leaves = run_query(store, prefixes, leaf_query(ctx, PRIMARY_KIND))?;
    let grouped = group_rows(leaves, |row| {
        category_for_uri(row.get(SUPER_CLASS).unwrap_or_default())
    });
    let classes = run_query(store, prefixes, class_query(ctx, PRIMARY_KIND))?;
    Ok(merge(
        grouped,
        group_rows(classes, |_| RecommendationCategory::Class),
    ))
}

pub fn recommend_generalize_simple<S: TripleStore>(
    store: &S,
    prefixes: &[(String, String)],
    ctx: &TagContext,
) -> Result<Recommendations, SearchError> {
    let rows = run_query(store, prefixes, simple_generalize_query(ctx, PRIMARY_KIND))?;
    Ok(group_rows(rows, |_| RecommendationCategory::Class))
}

/// One hop down; an empty existence-filtered result automatically retries
/// with the absolute specialization and buckets by resolved superclass.
pub fn recommend_specialize_simple<S: TripleStore>(
    store: &S,
    prefixes: &[(String, String)],
    ctx: &TagContext,
) -> Result<Recommendations, SearchError> {
    let rows = run_query(store, prefixes, simple_specialize_query(ctx, PRIMARY_KIND))?;
    if !rows.is_empty() {
        return Ok(group_rows(rows, |_| RecommendationCategory::Class));
    }
    tracing::debug!("simple specialize returned no rows, retrying with absolute specialize");
    recommend_specialize_absolute(store, prefixes, ctx)
}

pub fn recommend_generalize_absolute<S: TripleStore>(
    store: &S,
    prefixes: &[(String, String)],
    ctx: &TagContext,
) -> Result<Recommendations, SearchError> {
    let rows = run_query(
        store,
        prefixes,
        absolute_generalize_query(ctx, PRIMARY_KIND),
    )?;
    Ok(group_rows(rows, |_| RecommendationCategory::Class))
}

pub fn recommend_specialize_absolute<S: TripleStore>(
    store: &S,
    prefixes: &[(String, String)],
    ctx: &TagContext,
) -> Result<Recommendations, SearchError> {
    let rows = run_query(
        store,
        prefixes,
        absolute_specialize_query(ctx, PRIMARY_KIND),
    )?;
    let fallback = ctx.current().unwrap_or_default().to_string();
    Ok(group_rows(rows, bucket_by_superclass(fallback)))
}

/// Siblings; rows without a resolved superclass are class siblings.
pub fn recommend_equivalent<S: TripleStore>(
    store: &S,
    prefixes: &[(String, String)],
    ctx: &TagContext,
) -> Result<Recommendations, SearchError> {
    let rows = run_query(store, prefixes, equivalent_query(ctx, PRIMARY_KIND))?;
    Ok(group_rows(rows, |row| match row.get(SUPER_CLASS) {
        Some(uri) => category_for_uri(uri),
        None => RecommendationCategory::Class,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::Side;
    use crate::store::StaticStore;

    fn ctx() -> TagContext {
        TagContext::from_raw(
            "http://example.org/id/deities",
            "",
            "",
            true,
            Side::Obverse,
            "",
        )
    }

    fn candidate_row(link: &str, name: &str, superclass: Option<&str>) -> Row {
        let mut row = Row::from_pairs(&[(CANDIDATE, link), (CANDIDATE_NAME, name)]);
        if let Some(superclass) = superclass {
            row.insert(SUPER_CLASS, superclass);
        }
        row
    }

    #[test]
    fn predicates_land_in_the_verb_bucket() {
        let store = StaticStore::empty().with_default(vec![
            candidate_row("http://example.org/id/holding", "Holding", None),
            candidate_row("http://example.org/id/riding", "Riding", None),
        ]);
        let out = recommend_predicates(&store, &[], &ctx(), "").unwrap();
        let verbs = &out[&RecommendationCategory::Verb];
        assert_eq!(verbs.len(), 2);
        assert_eq!(verbs[0].name, "Holding");
    }

    #[test]
    fn sub_obj_merges_leaf_and_class_results() {
        let store = StaticStore::empty()
            // Leaf query carries the superclass column constraint.
            .respond_when(
                "rdfs:subClassOf ?superClass",
                vec![candidate_row(
                    "http://example.org/id/artemis",
                    "Artemis",
                    Some("http://xmlns.com/foaf/0.1/#term_Person"),
                )],
            )
            .respond_when(
                "rdfs:Class",
                vec![candidate_row("http://example.org/id/deities", "Deities", None)],
            );
        let out = recommend_sub_obj(&store, &[], &ctx()).unwrap();
        assert_eq!(out[&RecommendationCategory::Person][0].name, "Artemis");
        assert_eq!(out[&RecommendationCategory::Class][0].name, "Deities");
    }

    #[test]
    fn specialize_falls_back_to_absolute_when_empty() {
        // One-hop query (subclass of the current entity) has no rows; the
        // instance query reports leaves with an animal superclass.
        let store = StaticStore::empty()
            .respond_when("rdfs:subClassOf <http://example.org/id/deities>", vec![])
            .respond_when(
                "rdf:type <http://example.org/id/deities>",
                vec![candidate_row(
                    "http://example.org/id/eagle",
                    "Eagle",
                    Some("https://www.wikidata.org/wiki/Q729"),
                )],
            );
        let out = recommend_specialize_simple(&store, &[], &ctx()).unwrap();
        assert!(out.get(&RecommendationCategory::Class).is_none());
        assert_eq!(out[&RecommendationCategory::Animal][0].name, "Eagle");
    }

    #[test]
    fn specialize_uses_one_hop_results_when_present() {
        let store = StaticStore::empty().respond_when(
            "rdfs:subClassOf <http://example.org/id/deities>",
            vec![candidate_row("http://example.org/id/olympians", "Olympians", None)],
        );
        let out = recommend_specialize_simple(&store, &[], &ctx()).unwrap();
        assert_eq!(out[&RecommendationCategory::Class][0].name, "Olympians");
    }

    #[test]
    fn equivalent_rows_without_superclass_are_class_siblings() {
        let store = StaticStore::empty().with_default(vec![
            candidate_row("http://example.org/id/heroes", "Heroes", None),
            candidate_row(
                "http://example.org/id/lion",
                "Lion",
                Some("https://www.wikidata.org/wiki/Q729"),
            ),
        ]);
        let out = recommend_equivalent(&store, &[], &ctx()).unwrap();
        assert_eq!(out[&RecommendationCategory::Class][0].name, "Heroes");
        assert_eq!(out[&RecommendationCategory::Animal][0].name, "Lion");
    }

    #[test]
    fn rows_without_candidate_columns_are_skipped() {
        let store = StaticStore::empty().with_default(vec![
            Row::from_pairs(&[(CANDIDATE, "http://example.org/id/x")]),
            candidate_row("http://example.org/id/y", "Y", None),
        ]);
        let out = recommend_generalize_simple(&store, &[], &ctx()).unwrap();
        assert_eq!(out[&RecommendationCategory::Class].len(), 1);
    }
}
