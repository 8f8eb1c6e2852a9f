//! Mint label lookup table.
//!
//! Search rows report mints as bare URIs; the human-readable labels live in
//! the upstream Nomisma gazetteer. The table is downloaded once as CSV,
//! cached on disk, and loaded into an immutable map at startup.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const MINT_QUERY_ENDPOINT: &str = "http://nomisma.org/query";

const MINT_QUERY: &str = "\
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX nmo: <http://nomisma.org/ontology#>
PREFIX skos: <http://www.w3.org/2004/02/skos/core#>
SELECT DISTINCT ?mint ?mintLabel WHERE {
  ?coinType nmo:hasMint ?mintPlace .
  ?coinType rdf:type nmo:TypeSeriesItem .
  ?coinType nmo:hasMint ?mint .
  ?mint skos:prefLabel ?mintLabel FILTER(langMatches(lang(?mintLabel), \"en\"))
}";

/// Immutable mint URI → English label map.
#[derive(Debug, Clone, Default)]
pub struct MintLabels {
    map: HashMap<String, String>,
}

impl MintLabels {
    /// Fetch the table from `endpoint` and write the CSV to `cache_path`.
    pub fn download_to(endpoint: &str, cache_path: &Path) -> Result<()> {
        tracing::info!(%endpoint, "downloading mint label table");
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("failed to build http client")?;
        let response = client
            .get(endpoint)
            .query(&[("query", MINT_QUERY), ("output", "csv")])
            .send()
            .with_context(|| format!("failed to reach {endpoint}"))?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "mint label download failed with HTTP {}",
                response.status()
            ));
        }
        let body = response.text().context("failed to read csv body")?;
        if let Some(parent) = cache_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(cache_path, body)
            .with_context(|| format!("failed to write {}", cache_path.display()))?;
        Ok(())
    }

    /// Load the map from a cached CSV file.
    pub fn load(cache_path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(cache_path)
            .with_context(|| format!("failed to read {}", cache_path.display()))?;
        Ok(MintLabels {
            map: parse_mint_csv(&text)?,
        })
    }

    /// Load from cache, downloading it first if absent.
    pub fn ensure(endpoint: &str, cache_path: &Path) -> Result<Self> {
        if !cache_path.exists() {
            Self::download_to(endpoint, cache_path)?;
        }
        Self::load(cache_path)
    }

    pub fn label(&self, mint_uri: &str) -> Option<&str> {
        self.map.get(mint_uri).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

// Two-column CSV (`mint,mintLabel`) with optional quoting; later rows win on
// duplicate mints, matching a last-write dictionary load.
fn parse_mint_csv(text: &str) -> Result<HashMap<String, String>> {
    let mut lines = text.lines();
    let header = lines.next().ok_or_else(|| anyhow!("empty mint csv"))?;
    let header_fields = split_csv_line(header);
    if header_fields.first().map(String::as_str) != Some("mint") {
        return Err(anyhow!("unexpected mint csv header: {header}"));
    }

    let mut map = HashMap::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_csv_line(line);
        if fields.len() < 2 {
            continue;
        }
        map.insert(fields[0].clone(), fields[1].clone());
    }
    Ok(map)
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            other => current.push(other),
        }
    }
    fields.push(current);
    fields
}
