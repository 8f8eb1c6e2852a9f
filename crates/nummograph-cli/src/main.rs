//! Nummograph CLI: the dispatch boundary in front of the search core.
//!
//! One subcommand per inbound action — compile/search/raw query on the search
//! path, the recommendation variants and availability probes on the
//! tag-builder path, plus the one-time mint label download. All outputs are
//! JSON (or CSV for search exports); probes print the literal
//! `true`/`false` strings the UI consumes.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::io::Read;
use std::path::PathBuf;

use nummograph_core::labels::{MintLabels, MINT_QUERY_ENDPOINT};
use nummograph_core::service::DEFAULT_ENDPOINT;
use nummograph_core::{
    CoinSearch, CoinSpec, RecordKind, Row, Side, SparqlHttpStore, TagContext,
};

#[derive(Parser)]
#[command(name = "nummograph", about = "Iconographic coin search over a SPARQL endpoint")]
struct Cli {
    /// SPARQL endpoint of the coin dataset.
    #[arg(long, global = true, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Enable debug logging.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile coin descriptions + boolean term into SPARQL (no execution).
    Compile(SearchArgs),

    /// Compile and execute a coin search.
    Search {
        #[command(flatten)]
        args: SearchArgs,

        /// Output format.
        #[arg(long, default_value = "json", value_parser = ["json", "csv"])]
        format: String,

        /// Mint label CSV (resolves `?mint` URIs to place names).
        #[arg(long)]
        mint_map: Option<PathBuf>,
    },

    /// Execute raw SPARQL query text (`-` reads stdin).
    Query {
        /// Query file path, or `-` for stdin.
        input: String,
    },

    /// Next-choice recommendations for the tag builder.
    Recommend {
        #[command(subcommand)]
        command: RecommendCommands,
    },

    /// Availability probes; print `true` or `false`.
    Probe {
        #[command(subcommand)]
        command: ProbeCommands,
    },

    /// Download the mint label table and cache it as CSV.
    MintMap {
        /// Cache file to write.
        #[arg(long, default_value = "resources/mint_labels.csv")]
        out: PathBuf,

        /// Gazetteer query endpoint.
        #[arg(long, default_value = MINT_QUERY_ENDPOINT)]
        source: String,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Coin descriptions as JSON: inline text or `@path/to/file.json`.
    #[arg(long)]
    coins: String,

    /// Boolean term over coin placeholders, e.g. `C1 AND (NOT C2 OR C3)`.
    #[arg(long)]
    term: String,

    /// Record kind to search.
    #[arg(long, default_value = "NumismaticObject")]
    kind: RecordKind,
}

#[derive(Args)]
struct ContextArgs {
    /// Bound subject URI (empty = unbound).
    #[arg(long, default_value = "")]
    subject: String,

    /// Bound predicate URI (empty = unbound).
    #[arg(long, default_value = "")]
    predicate: String,

    /// Bound object URI (empty = unbound).
    #[arg(long, default_value = "")]
    object: String,

    /// The active input is the subject position (else object).
    #[arg(long)]
    is_subject: bool,

    /// Coin side the input belongs to.
    #[arg(long)]
    side: Side,

    /// Typed prefix filter.
    #[arg(long, default_value = "")]
    q: String,
}

impl ContextArgs {
    fn to_context(&self) -> TagContext {
        TagContext::from_raw(
            &self.subject,
            &self.predicate,
            &self.object,
            self.is_subject,
            self.side,
            &self.q,
        )
    }
}

#[derive(Subcommand)]
enum RecommendCommands {
    /// Predicate (verb) recommendations.
    Predicate(ContextArgs),
    /// Subject/object recommendations (leaves + classes).
    SubObj(ContextArgs),
    /// One hop up the hierarchy.
    Generalize {
        #[command(flatten)]
        ctx: ContextArgs,
        /// Topmost classes instead of one hop.
        #[arg(long)]
        absolute: bool,
    },
    /// One hop down the hierarchy (falls back to instances when empty).
    Specialize {
        #[command(flatten)]
        ctx: ContextArgs,
        /// Direct instances instead of one hop.
        #[arg(long)]
        absolute: bool,
    },
    /// Siblings sharing an immediate parent.
    Equivalent(ContextArgs),
}

#[derive(Subcommand)]
enum ProbeCommands {
    /// Does any generalization exist?
    Generalize(ContextArgs),
    /// Does any specialization exist?
    Specialize(ContextArgs),
    /// Does any sibling exist?
    Equivalent(ContextArgs),
    /// Does the subject participate in any triple on this side?
    Any {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        side: Side,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let store = SparqlHttpStore::new(&cli.endpoint)?;
    let service = CoinSearch::new(store);

    match cli.command {
        Commands::Compile(args) => {
            let coins = load_coins(&args.coins)?;
            let query = service.compile(&coins, &args.term, args.kind)?;
            println!("{query}");
        }
        Commands::Search {
            args,
            format,
            mint_map,
        } => {
            let coins = load_coins(&args.coins)?;
            let labels = match &mint_map {
                Some(path) => MintLabels::load(path)?,
                None => MintLabels::default(),
            };
            let rows = service.search(&coins, &args.term, args.kind)?;
            eprintln!("{} {} result(s)", "found".green(), rows.len());
            match format.as_str() {
                "csv" => print_csv(&rows, args.kind, &labels),
                _ => print_json_results(&rows, args.kind, &labels)?,
            }
        }
        Commands::Query { input } => {
            let query = read_query(&input)?;
            let rows = service.execute(&query)?;
            let values: Vec<serde_json::Value> = rows.iter().map(row_to_json).collect();
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
        Commands::Recommend { command } => {
            let result = match &command {
                RecommendCommands::Predicate(ctx) => {
                    service.recommend_predicates(&ctx.to_context(), &ctx.q)?
                }
                RecommendCommands::SubObj(ctx) => service.recommend_sub_obj(&ctx.to_context())?,
                RecommendCommands::Generalize { ctx, absolute } => {
                    if *absolute {
                        service.recommend_generalize_absolute(&ctx.to_context())?
                    } else {
                        service.recommend_generalize_simple(&ctx.to_context())?
                    }
                }
                RecommendCommands::Specialize { ctx, absolute } => {
                    if *absolute {
                        service.recommend_specialize_absolute(&ctx.to_context())?
                    } else {
                        service.recommend_specialize_simple(&ctx.to_context())?
                    }
                }
                RecommendCommands::Equivalent(ctx) => {
                    service.recommend_equivalent(&ctx.to_context())?
                }
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Probe { command } => {
            let available = match &command {
                ProbeCommands::Generalize(ctx) => {
                    service.generalize_available(&ctx.to_context())?
                }
                ProbeCommands::Specialize(ctx) => {
                    service.specialize_available(&ctx.to_context())?
                }
                ProbeCommands::Equivalent(ctx) => {
                    service.equivalent_available(&ctx.to_context())?
                }
                ProbeCommands::Any { subject, side } => {
                    service.recommendations_available(subject, *side)?
                }
            };
            // The UI consumes the literal strings.
            println!("{}", if available { "true" } else { "false" });
        }
        Commands::MintMap { out, source } => {
            MintLabels::download_to(&source, &out)?;
            let labels = MintLabels::load(&out)?;
            println!(
                "{} {} mint label(s) cached at {}",
                "ok".green(),
                labels.len(),
                out.display()
            );
        }
    }

    Ok(())
}

fn load_coins(arg: &str) -> Result<Vec<CoinSpec>> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read coins file {path}"))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&text).context("failed to parse coin descriptions JSON")
}

fn read_query(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read query from stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("failed to read query file {input}"))
    }
}

/// Strip a `coin_id=` query-parameter prefix from identifiers.
fn convert_id(id: &str) -> &str {
    match id.split_once("coin_id=") {
        Some((_, rest)) => rest,
        None => id,
    }
}

const MISSING_THUMBNAIL: &str = "static/no_image.jpg";

fn row_to_json(row: &Row) -> serde_json::Value {
    let mut out = serde_json::Map::new();
    for (column, value) in row.columns() {
        out.insert(column.to_string(), serde_json::Value::String(value.to_string()));
    }
    serde_json::Value::Object(out)
}

// Shape one search row the way the presentation layer expects it: defaulted
// thumbnails, parsed numeric fields, mint URI resolved to a place label.
fn shaped_result(row: &Row, kind: RecordKind, labels: &MintLabels) -> serde_json::Value {
    let id = row.get("id").map(convert_id).unwrap_or_default();
    let category = match kind {
        RecordKind::NumismaticObject => row
            .get("type")
            .map(|t| serde_json::Value::String(t.to_string()))
            .unwrap_or(serde_json::Value::Null),
        RecordKind::TypeSeriesItem => serde_json::Value::String("TYPE".to_string()),
    };
    let location = match kind {
        RecordKind::NumismaticObject => row
            .get("mint")
            .and_then(|mint| labels.label(mint))
            .map(|l| serde_json::Value::String(l.to_string()))
            .unwrap_or(serde_json::Value::Null),
        RecordKind::TypeSeriesItem => serde_json::Value::String("TYPE".to_string()),
    };
    let region = match kind {
        RecordKind::NumismaticObject => serde_json::Value::Null,
        RecordKind::TypeSeriesItem => serde_json::Value::String(id.to_string()),
    };

    serde_json::json!({
        "type": kind.type_name(),
        "url": row.get("url"),
        "thumbnailObverse": row.get("thumbnailObverse").unwrap_or(MISSING_THUMBNAIL),
        "thumbnailReverse": row.get("thumbnailReverse").unwrap_or(MISSING_THUMBNAIL),
        "descriptionObverse": row.get("descriptionObverse"),
        "descriptionReverse": row.get("descriptionReverse"),
        "date": row.get("date"),
        "maxDiameter": row.get("maxDiameter").and_then(|v| v.parse::<f64>().ok()),
        "id": id,
        "category": category,
        "weight": row.get("weight").and_then(|v| v.parse::<f64>().ok()),
        "location": location,
        "region": region,
    })
}

fn print_json_results(rows: &[Row], kind: RecordKind, labels: &MintLabels) -> Result<()> {
    let shaped: Vec<serde_json::Value> =
        rows.iter().map(|row| shaped_result(row, kind, labels)).collect();
    println!("{}", serde_json::to_string_pretty(&shaped)?);
    Ok(())
}

fn print_csv(rows: &[Row], kind: RecordKind, labels: &MintLabels) {
    println!(
        "Type,URL,Thumbnail Obverse,Thumbnail Reverse,ID,Weight,Obverse Description,\
         Reverse Description,Date,Max Diameter,Location,Region"
    );
    for row in rows {
        let weight = row
            .get("weight")
            .map(|w| format!("{w} g"))
            .unwrap_or_default();
        let diameter = row
            .get("maxDiameter")
            .map(|d| format!("{d} mm"))
            .unwrap_or_default();
        let location = match kind {
            RecordKind::NumismaticObject => row
                .get("mint")
                .and_then(|mint| labels.label(mint))
                .unwrap_or_default()
                .to_string(),
            RecordKind::TypeSeriesItem => String::new(),
        };
        let fields = [
            kind.type_name(),
            row.get("url").unwrap_or_default(),
            row.get("thumbnailObverse").unwrap_or(MISSING_THUMBNAIL),
            row.get("thumbnailReverse").unwrap_or(MISSING_THUMBNAIL),
            convert_id(row.get("id").unwrap_or_default()),
            &weight,
            row.get("descriptionObverse").unwrap_or_default(),
            row.get("descriptionReverse").unwrap_or_default(),
            row.get("date").unwrap_or_default(),
            &diameter,
            &location,
            "",
        ];
        let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        println!("{}", line.join(","));
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_id_strips_query_param_prefix() {
        assert_eq!(convert_id("https://example.org/?coin_id=1234"), "1234");
        assert_eq!(convert_id("1234"), "1234");
    }

    #[test]
    fn csv_fields_are_quoted_when_needed() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn shaped_results_default_thumbnails_and_parse_numbers() {
        let row = Row::from_pairs(&[
            ("url", "http://example.org/coin/1"),
            ("id", "https://example.org/?coin_id=77"),
            ("weight", "8.42"),
        ]);
        let value = shaped_result(&row, RecordKind::NumismaticObject, &MintLabels::default());
        assert_eq!(value["thumbnailObverse"], "static/no_image.jpg");
        assert_eq!(value["id"], "77");
        assert_eq!(value["weight"], 8.42);
        assert_eq!(value["maxDiameter"], serde_json::Value::Null);
    }
}
