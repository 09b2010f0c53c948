//! # Docket CLI (`docket`)
//!
//! Command-line front end for the single-session document retrieval
//! pipeline. One document is active at a time: ingesting a new one
//! evicts the old one first, and queries are answered against the
//! current index only.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docket ingest <file>` | Upload and index a document (pdf, txt, md) |
//! | `docket query "<text>"` | Show the top-k passages for a query |
//! | `docket ask "<question>"` | Retrieve passages and generate an answer |
//! | `docket status` | Show the active-document slot state |
//! | `docket evict` | Remove the active document and its index |
//! | `docket reset` | Wipe the storage root, including stale state |
//!
//! All commands accept a `--config` flag pointing to a TOML file; with
//! no file present, built-in defaults are used (local hash embeddings,
//! `./docket-data` storage root).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docket::answer;
use docket::config::{self, Config, StorageConfig};
use docket::models::DocumentState;
use docket::session::DocumentSession;

/// Docket — ask questions against a single uploaded document.
#[derive(Parser)]
#[command(
    name = "docket",
    about = "A single-session document retrieval pipeline for question answering",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./docket.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload and index a document, replacing any active one.
    Ingest {
        /// Path to the document (.pdf, .txt, .md).
        file: PathBuf,
    },

    /// Retrieve the most relevant passages for a query.
    Query {
        /// Free-text query.
        text: String,

        /// Number of passages to return.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Retrieve passages and generate an answer from the model backend.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Show the active-document slot state.
    Status,

    /// Remove the active document and its index.
    Evict,

    /// Wipe the storage root entirely, including stale state left by
    /// interrupted runs. Unlike `evict`, runs even when the slot is
    /// already empty.
    Reset,
}

fn load_or_default(path: &PathBuf) -> Result<Config> {
    if path.is_file() {
        config::load_config(path)
    } else {
        let config = Config {
            storage: StorageConfig {
                root: PathBuf::from("./docket-data"),
            },
            chunking: Default::default(),
            retrieval: Default::default(),
            embedding: Default::default(),
            answer: Default::default(),
        };
        config::validate(&config)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_or_default(&cli.config)?;

    match cli.command {
        Commands::Ingest { file } => {
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .context("file has no usable name")?
                .to_string();
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;

            let mut session = DocumentSession::open(config).await?;
            session.ingest(&file_name, &bytes).await?;

            println!("ingest {}", file_name);
            println!("  state: {}", session.state());
            println!("ok");
        }

        Commands::Query { text, top_k } => {
            let k = top_k.unwrap_or(config.retrieval.top_k);
            let session = DocumentSession::open(config).await?;
            let results = session.query(&text, k).await;

            if results.is_empty() {
                println!("No relevant passages.");
                return Ok(());
            }

            for (i, result) in results.iter().enumerate() {
                println!(
                    "{}. [{:.4}] {} #{}",
                    i + 1,
                    result.distance,
                    result.passage.document_id,
                    result.passage.ordinal
                );
                let excerpt: String = result.passage.text.chars().take(240).collect();
                println!("    \"{}\"", excerpt.replace('\n', " ").trim());
                println!();
            }
        }

        Commands::Ask { question } => {
            let k = config.retrieval.top_k;
            let answer_config = config.answer.clone();
            let session = DocumentSession::open(config).await?;
            let passages = session.query(&question, k).await;

            if !passages.is_empty() {
                println!("(using {} passages from {})", passages.len(), passages[0].passage.document_id);
            }

            let reply = answer::generate_answer(&answer_config, &passages, "", &question).await?;
            println!("{}", reply);
        }

        Commands::Status => {
            let session = DocumentSession::open(config).await?;
            println!("state: {}", session.state());
            match session.active_document() {
                Some(doc) => {
                    println!("document: {}", doc.id);
                    let date = chrono::DateTime::from_timestamp(doc.ingested_at, 0)
                        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_default();
                    println!("ingested: {}", date);
                }
                None => println!("document: (none)"),
            }
            println!("storage: {}", session.config().storage.root.display());
        }

        Commands::Evict => {
            let mut session = DocumentSession::open(config).await?;
            if session.state() == DocumentState::Empty {
                println!("nothing to evict");
                return Ok(());
            }
            match session.evict() {
                Ok(()) => println!("evicted; slot is empty"),
                Err(e) => println!("evicted with leftovers: {}", e),
            }
        }

        Commands::Reset => {
            let root = config.storage.root.clone();
            let mut session = DocumentSession::open(config).await?;
            match session.evict() {
                Ok(()) => println!("reset; {} removed", root.display()),
                Err(e) => println!("reset with leftovers: {}", e),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_all_commands() {
        for args in [
            vec!["docket", "ingest", "brief.pdf"],
            vec!["docket", "query", "arbitration clauses"],
            vec!["docket", "query", "arbitration", "--top-k", "3"],
            vec!["docket", "ask", "Is the clause enforceable?"],
            vec!["docket", "status"],
            vec!["docket", "evict"],
            vec!["docket", "reset"],
            vec!["docket", "reset", "--config", "./other.toml"],
        ] {
            assert!(Cli::try_parse_from(args.clone()).is_ok(), "failed on {:?}", args);
        }
    }
}
