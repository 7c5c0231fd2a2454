//! Clinex CLI - Command-line interface
//!
//! Usage:
//!   clinex extract <document>...
//!   clinex classify <type> --category <category>
//!   clinex taxonomy

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use clinex_core::{AppConfig, ClinicalNlpProvider, Extraction, LoggingConfig, ProviderKind};
use clinex_extractor::taxonomy::COMPREHEND_PHI;
use clinex_extractor::{replay_provider, ExtractionSummary, Taxonomy};
use futures::stream::{self, StreamExt};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "clinex")]
#[command(about = "Clinical NLP extraction normalizer")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract canonical relations from documents
    Extract {
        /// Documents to analyze
        #[arg(required = true)]
        documents: Vec<PathBuf>,
        /// Provider shape (aws | gcp)
        #[arg(long)]
        provider: Option<String>,
        /// Directory of recorded upstream responses
        #[arg(long)]
        replay_dir: Option<PathBuf>,
        /// Documents analyzed at once
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
        /// Print a summary report to stderr
        #[arg(long)]
        summary: bool,
    },
    /// Classify a vendor code
    Classify {
        /// Vendor type code
        vendor_type: String,
        /// Vendor category code
        #[arg(long)]
        category: Option<String>,
        /// Trait flags
        #[arg(long = "trait")]
        traits: Vec<String>,
        #[arg(long, default_value = "aws")]
        provider: String,
        /// Use the protected health information table
        #[arg(long)]
        phi: bool,
    },
    /// Print a provider's mapping table
    Taxonomy {
        #[arg(long, default_value = "aws")]
        provider: String,
        /// Print the protected health information table
        #[arg(long)]
        phi: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };

    init_tracing(&config.logging);

    match cli.command {
        Commands::Extract {
            documents,
            provider,
            replay_dir,
            concurrency,
            pretty,
            summary,
        } => {
            if let Some(kind) = provider {
                config.provider.kind = kind.parse()?;
            }
            if let Some(dir) = replay_dir {
                config.provider.replay_dir = dir;
            }
            config.validate()?;

            let extractions = extract_documents(&config, &documents, concurrency).await?;

            let mut total = ExtractionSummary::default();
            for extraction in &extractions {
                print_json(extraction, pretty)?;
                total.merge(&ExtractionSummary::from_extraction(extraction));
            }
            if summary {
                eprintln!("{}", total.report());
            }
        }
        Commands::Classify {
            vendor_type,
            category,
            traits,
            provider,
            phi,
        } => {
            if phi {
                let category = category.as_deref().unwrap_or("PROTECTED_HEALTH_INFORMATION");
                let (category, entity_type) = COMPREHEND_PHI.classify_phi(category, &vendor_type);
                print_json(
                    &serde_json::json!({ "category": category, "type": entity_type }),
                    true,
                )?;
            } else {
                let taxonomy = Taxonomy::for_provider(provider.parse()?);
                let classification =
                    taxonomy.classify(category.as_deref(), &vendor_type, &traits);
                print_json(&classification, true)?;
            }
        }
        Commands::Taxonomy { provider, phi } => {
            let taxonomy = if phi {
                &COMPREHEND_PHI
            } else {
                Taxonomy::for_provider(provider.parse::<ProviderKind>()?)
            };
            print_json(taxonomy, true)?;
        }
    }

    Ok(())
}

/// Run every document through the configured provider. Output keeps input
/// order; the first failure aborts.
async fn extract_documents(
    config: &AppConfig,
    documents: &[PathBuf],
    concurrency: usize,
) -> anyhow::Result<Vec<Extraction>> {
    let provider = replay_provider(config);
    tracing::info!(
        "Extracting {} documents with {} (replay from {})",
        documents.len(),
        provider.name(),
        config.provider.replay_dir.display()
    );

    let provider = &provider;
    stream::iter(documents)
        .map(|path| async move {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            provider
                .extract(&text)
                .await
                .with_context(|| format!("Extraction failed for {}", path.display()))
        })
        .buffered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect()
}

fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

/// Logs go to stderr; stdout carries only JSON
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.clone().into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}
