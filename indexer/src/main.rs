use anyhow::Result;
use clap::{Parser, Subcommand};
use fragment_core::corpus::load_fragments;
use fragment_core::{FragmentId, InvertedIndex};
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "fragment-indexer")]
#[command(about = "Inspect and query the fragment search index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index and print its size
    Stats {
        /// Fragments JSON file or a directory of JSON files
        #[arg(long)]
        input: String,
    },
    /// Run a query against the index
    Search {
        #[arg(long)]
        input: String,
        #[arg(long)]
        query: String,
        /// Maximum hits; 0 means the default
        #[arg(long, default_value_t = 0)]
        limit: usize,
        /// Print hits as JSON lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Serialize)]
struct HitLine<'a> {
    score: usize,
    id: FragmentId,
    title: &'a str,
    length: usize,
    url: &'a str,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Stats { input } => {
            let index = open_index(&input)?;
            let stats = index.stats();
            println!("fragments: {}", stats.fragments);
            println!("terms:     {}", stats.terms);
            println!("postings:  {}", stats.postings);
            Ok(())
        }
        Commands::Search { input, query, limit, json } => {
            let index = open_index(&input)?;
            let hits = index.search_scored(&query, limit);
            if hits.is_empty() {
                tracing::info!(%query, "no matches");
            }
            for hit in hits {
                let f = hit.fragment;
                if json {
                    let line = HitLine { score: hit.score, id: f.id, title: &f.title, length: f.length, url: &f.url };
                    println!("{}", serde_json::to_string(&line)?);
                } else {
                    println!("{:>5}  #{:<6} {}", hit.score, f.id, f.title);
                }
            }
            Ok(())
        }
    }
}

fn open_index(input: &str) -> Result<InvertedIndex> {
    let corpus = load_fragments(input)?;
    Ok(InvertedIndex::build(Arc::new(corpus)))
}
