//! Request-scoped entry points over an immutable configuration.
//!
//! [`CoinSearch`] owns the store handle and the namespace preamble; both are
//! set once at startup and never mutated, so concurrent requests can share a
//! service value freely. Every entry point is blocking and issues exactly one
//! query per logical step.

use nummograph_dsl::sparql::SelectQuery;

use crate::coin::{CoinSpec, RecordKind, Side};
use crate::compile::compile_query;
use crate::error::SearchError;
use crate::hierarchy::TagContext;
use crate::navigator::{self, Recommendations};
use crate::probe;
use crate::store::{Row, TripleStore};

/// Fuseki endpoint of the coin dataset; override per deployment.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3030/db_cn/sparql";

/// Namespace preamble prepended to every generated query.
pub const QUERY_PREFIXES: &[(&str, &str)] = &[
    ("nmo", "http://nomisma.org/ontology#"),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
];

/// Shared immutable configuration, constructed once at startup.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub prefixes: Vec<(String, String)>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            prefixes: QUERY_PREFIXES
                .iter()
                .map(|(p, iri)| (p.to_string(), iri.to_string()))
                .collect(),
        }
    }
}

/// The search core: query compiler + hierarchy navigator over one store.
pub struct CoinSearch<S> {
    store: S,
    config: SearchConfig,
}

impl<S: TripleStore> CoinSearch<S> {
    pub fn new(store: S) -> Self {
        CoinSearch {
            store,
            config: SearchConfig::default(),
        }
    }

    pub fn with_config(store: S, config: SearchConfig) -> Self {
        CoinSearch { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn finalize(&self, mut query: SelectQuery) -> String {
        query.prefixes = self.config.prefixes.clone();
        query.render()
    }

    // -----------------------------------------------------------------------
    // Search path
    // -----------------------------------------------------------------------

    /// Compile coin descriptions + boolean term into executable query text.
    pub fn compile(
        &self,
        coins: &[CoinSpec],
        term: &str,
        kind: RecordKind,
    ) -> Result<String, SearchError> {
        Ok(self.finalize(compile_query(coins, term, kind)?))
    }

    /// Execute raw query text against the store.
    pub fn execute(&self, query: &str) -> Result<Vec<Row>, SearchError> {
        Ok(self.store.select(query)?)
    }

    /// Compile and execute in one step.
    pub fn search(
        &self,
        coins: &[CoinSpec],
        term: &str,
        kind: RecordKind,
    ) -> Result<Vec<Row>, SearchError> {
        let query = self.compile(coins, term, kind)?;
        tracing::debug!(coins = coins.len(), %term, "running coin search");
        self.execute(&query)
    }

    // -----------------------------------------------------------------------
    // Recommendation path
    // -----------------------------------------------------------------------

    pub fn recommend_predicates(
        &self,
        ctx: &TagContext,
        prefix: &str,
    ) -> Result<Recommendations, SearchError> {
        navigator::recommend_predicates(&self.store, &self.config.prefixes, ctx, prefix)
    }

    pub fn recommend_sub_obj(&self, ctx: &TagContext) -> Result<Recommendations, SearchError> {
        navigator::recommend_sub_obj(&self.store, &self.config.prefixes, ctx)
    }

    pub fn recommend_generalize_simple(
        &self,
        ctx: &TagContext,
    ) -> Result<Recommendations, SearchError> {
        navigator::recommend_generalize_simple(&self.store, &self.config.prefixes, ctx)
    }

    pub fn recommend_specialize_simple(
        &self,
        ctx: &TagContext,
    ) -> Result<Recommendations, SearchError> {
        navigator::recommend_specialize_simple(&self.store, &self.config.prefixes, ctx)
    }

    pub fn recommend_generalize_absolute(
        &self,
        ctx: &TagContext,
    ) -> Result<Recommendations, SearchError> {
        navigator::recommend_generalize_absolute(&self.store, &self.config.prefixes, ctx)
    }

    pub fn recommend_specialize_absolute(
        &self,
        ctx: &TagContext,
    ) -> Result<Recommendations, SearchError> {
        navigator::recommend_specialize_absolute(&self.store, &self.config.prefixes, ctx)
    }

    pub fn recommend_equivalent(&self, ctx: &TagContext) -> Result<Recommendations, SearchError> {
        navigator::recommend_equivalent(&self.store, &self.config.prefixes, ctx)
    }

    // -----------------------------------------------------------------------
    // Availability probes
    // -----------------------------------------------------------------------

    pub fn generalize_available(&self, ctx: &TagContext) -> Result<bool, SearchError> {
        probe::generalize_available(&self.store, &self.config.prefixes, ctx)
    }

    pub fn specialize_available(&self, ctx: &TagContext) -> Result<bool, SearchError> {
        probe::specialize_available(&self.store, &self.config.prefixes, ctx)
    }

    pub fn equivalent_available(&self, ctx: &TagContext) -> Result<bool, SearchError> {
        probe::equivalent_available(&self.store, &self.config.prefixes, ctx)
    }

    pub fn recommendations_available(
        &self,
        subject: &str,
        side: Side,
    ) -> Result<bool, SearchError> {
        probe::recommendations_available(&self.store, &self.config.prefixes, subject, side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Row, StaticStore};

    #[test]
    fn compiled_queries_carry_the_configured_preamble() {
        let service = CoinSearch::new(StaticStore::empty());
        let coins = vec![CoinSpec::default()];
        let query = service
            .compile(&coins, "C1", RecordKind::NumismaticObject)
            .unwrap();
        assert!(query.starts_with("PREFIX nmo: <http://nomisma.org/ontology#>"));
        assert!(query.contains("PREFIX skos: <http://www.w3.org/2004/02/skos/core#>"));
    }

    #[test]
    fn execute_passes_raw_query_through() {
        let store = StaticStore::empty()
            .respond_when("SELECT", vec![Row::from_pairs(&[("url", "http://c/1")])]);
        let service = CoinSearch::new(store);
        let rows = service.execute("SELECT * WHERE { ?s ?p ?o }").unwrap();
        assert_eq!(rows[0].get("url"), Some("http://c/1"));
    }

    #[test]
    fn empty_search_result_is_not_an_error() {
        let service = CoinSearch::new(StaticStore::empty());
        let coins = vec![CoinSpec::default()];
        let rows = service
            .search(&coins, "C1", RecordKind::TypeSeriesItem)
            .unwrap();
        assert!(rows.is_empty());
    }
}
