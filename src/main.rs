use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;

mod auth;
mod cli;
mod config;
mod embedding;
mod errors;
mod index;
mod problems;
#[cfg(test)]
mod tests;
mod web;

use config::{Config, IndexBackend};
use embedding::{Embedder, EmbeddingModel};
use index::{MemoryIndex, PineconeIndex, VectorIndex};
use problems::ProblemBank;

fn build_bank(config: &Config) -> anyhow::Result<ProblemBank> {
    let model = EmbeddingModel::new(
        &config.embedding.model,
        PathBuf::from(&config.embedding.cache_dir),
        Some(Duration::from_secs(config.embedding.download_timeout_secs)),
    )?;
    log::info!(
        "loaded embedding model '{}' ({} dims)",
        model.name(),
        model.dimensions()
    );
    let embedder: Arc<dyn Embedder> = Arc::new(model);

    if embedder.dimensions() != config.index.dimension {
        bail!(
            "model '{}' produces {}-dim vectors but index.dimension is {}",
            config.embedding.model,
            embedder.dimensions(),
            config.index.dimension
        );
    }

    let index: Arc<dyn VectorIndex> = match config.index.backend {
        IndexBackend::Memory => Arc::new(MemoryIndex::new(config.index.dimension)),
        IndexBackend::Pinecone => {
            let api_key =
                std::env::var("PINECONE_API_KEY").context("PINECONE_API_KEY is not set")?;
            Arc::new(PineconeIndex::connect(&config.index, &api_key)?)
        }
    };

    Ok(ProblemBank::new(embedder, index, config))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = cli::Args::parse();
    let config = Config::load_with(&args.config);

    match args.command {
        cli::Command::Daemon {} => {
            let api_key = std::env::var("API_KEY").context("API_KEY is not set")?;
            let bank = Arc::new(build_bank(&config)?);

            web::start_daemon(web::SharedState { bank, api_key }, &config.bind_addr);
            Ok(())
        }

        cli::Command::Classify { text } => {
            let bank = build_bank(&config)?;
            let labels = bank.assign_labels(&text)?;

            println!("{}", serde_json::to_string_pretty(&labels).unwrap());
            Ok(())
        }

        cli::Command::Store { text, labels } => {
            let bank = build_bank(&config)?;
            let inserted = bank.store(&text, problems::parse_labels(&labels))?;

            if inserted {
                println!("stored");
            } else {
                println!("duplicate, not stored");
            }
            Ok(())
        }

        cli::Command::Search { text, labels } => {
            let bank = build_bank(&config)?;
            let similar = bank.search_similar(&text, &problems::parse_labels(&labels))?;

            println!("{}", serde_json::to_string_pretty(&similar).unwrap());
            Ok(())
        }
    }
}
