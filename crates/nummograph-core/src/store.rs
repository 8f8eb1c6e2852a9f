//! Triple store gateway.
//!
//! The core only ever needs one operation from the store: run a `SELECT`
//! query, get back an ordered sequence of rows with named columns. The
//! [`TripleStore`] trait captures that; [`SparqlHttpStore`] implements it
//! against a SPARQL 1.1 HTTP endpoint with blocking requests (the core is
//! request-scoped and single-threaded, so there is nothing to overlap).
//!
//! Failures are not retried here — they propagate to the caller.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid SPARQL endpoint `{endpoint}`: {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    #[error("failed to reach SPARQL endpoint {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    #[error("SPARQL endpoint returned HTTP {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("SPARQL endpoint returned invalid result JSON: {0}")]
    Decode(String),
}

/// One result row: an ordered name → value mapping.
///
/// Unbound columns are simply absent; `get` returns `None` for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    bindings: BTreeMap<String, String>,
}

impl Row {
    pub fn new() -> Self {
        Row::default()
    }

    /// Build a row from column/value pairs (fixtures and tests).
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut row = Row::new();
        for (column, value) in pairs {
            row.insert(*column, *value);
        }
        row
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.bindings.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.bindings.get(column).map(String::as_str)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Executes query text remotely and returns rows with named columns.
pub trait TripleStore {
    fn select(&self, query: &str) -> Result<Vec<Row>, StoreError>;
}

impl<T: TripleStore + ?Sized> TripleStore for &T {
    fn select(&self, query: &str) -> Result<Vec<Row>, StoreError> {
        (**self).select(query)
    }
}

/// Blocking SPARQL-over-HTTP gateway.
pub struct SparqlHttpStore {
    endpoint: Url,
    client: reqwest::blocking::Client,
}

impl SparqlHttpStore {
    pub fn new(endpoint: &str) -> Result<Self, StoreError> {
        Self::with_timeout(endpoint, Duration::from_secs(60))
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self, StoreError> {
        let endpoint_url = Url::parse(endpoint).map_err(|e| StoreError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport {
                endpoint: endpoint.to_string(),
                message: format!("failed to build http client: {e}"),
            })?;
        Ok(SparqlHttpStore {
            endpoint: endpoint_url,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

impl TripleStore for SparqlHttpStore {
    fn select(&self, query: &str) -> Result<Vec<Row>, StoreError> {
        tracing::debug!(endpoint = %self.endpoint, chars = query.len(), "executing sparql query");
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/sparql-results+json")
            .form(&[("query", query)])
            .send()
            .map_err(|e| StoreError::Transport {
                endpoint: self.endpoint.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let body: SparqlResultsJson = response
            .json()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(rows_from_results(body))
    }
}

// SPARQL 1.1 Query Results JSON Format, reduced to what we read.
#[derive(Deserialize)]
struct SparqlResultsJson {
    results: SparqlResultsBindings,
}

#[derive(Deserialize)]
struct SparqlResultsBindings {
    bindings: Vec<BTreeMap<String, SparqlRdfTerm>>,
}

#[derive(Deserialize)]
struct SparqlRdfTerm {
    value: String,
}

fn rows_from_results(body: SparqlResultsJson) -> Vec<Row> {
    body.results
        .bindings
        .into_iter()
        .map(|binding| {
            let mut row = Row::new();
            for (column, term) in binding {
                row.insert(column, term.value);
            }
            row
        })
        .collect()
}

/// Decode a SPARQL JSON results document into rows.
pub fn rows_from_json(text: &str) -> Result<Vec<Row>, StoreError> {
    let body: SparqlResultsJson =
        serde_json::from_str(text).map_err(|e| StoreError::Decode(e.to_string()))?;
    Ok(rows_from_results(body))
}

/// In-memory stand-in for a SPARQL endpoint.
///
/// Responses are keyed by a substring of the query text; the first matching
/// rule wins, anything else gets the default (empty) response. Used by unit
/// and integration tests, and handy for offline smoke runs.
#[derive(Debug, Clone, Default)]
pub struct StaticStore {
    rules: Vec<(String, Vec<Row>)>,
    default: Vec<Row>,
}

impl StaticStore {
    pub fn empty() -> Self {
        StaticStore::default()
    }

    /// Return `rows` for any query containing `needle`.
    pub fn respond_when(mut self, needle: impl Into<String>, rows: Vec<Row>) -> Self {
        self.rules.push((needle.into(), rows));
        self
    }

    /// Rows returned when no rule matches.
    pub fn with_default(mut self, rows: Vec<Row>) -> Self {
        self.default = rows;
        self
    }
}

impl TripleStore for StaticStore {
    fn select(&self, query: &str) -> Result<Vec<Row>, StoreError> {
        for (needle, rows) in &self.rules {
            if query.contains(needle.as_str()) {
                return Ok(rows.clone());
            }
        }
        Ok(self.default.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_sparql_json_bindings() {
        let body = r#"{
            "head": {"vars": ["candidate", "candidateName"]},
            "results": {"bindings": [
                {
                    "candidate": {"type": "uri", "value": "http://example.org/id/artemis"},
                    "candidateName": {"type": "literal", "value": "Artemis"}
                },
                {
                    "candidate": {"type": "uri", "value": "http://example.org/id/eagle"}
                }
            ]}
        }"#;
        let rows = rows_from_json(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("candidateName"), Some("Artemis"));
        assert_eq!(rows[1].get("candidate"), Some("http://example.org/id/eagle"));
        assert_eq!(rows[1].get("candidateName"), None);
    }

    #[test]
    fn rejects_non_result_json() {
        assert!(rows_from_json("{\"boom\": true}").is_err());
        assert!(rows_from_json("not json").is_err());
    }

    #[test]
    fn static_store_matches_first_rule() {
        let store = StaticStore::empty()
            .respond_when("rdfs:subClassOf", vec![Row::from_pairs(&[("x", "1")])])
            .respond_when("rdf:type", vec![]);
        assert_eq!(
            store.select("... ?a rdfs:subClassOf ?b ...").unwrap().len(),
            1
        );
        assert!(store.select("... ?a rdf:type ?b ...").unwrap().is_empty());
        assert!(store.select("nothing matches").unwrap().is_empty());
    }
}
