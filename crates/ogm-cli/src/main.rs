//! CLI entry point for the OGM.

mod demo;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use ogm_core::config::DEFAULT_FILE_PREFIX;
use ogm_core::SessionConfig;
use ogm_graph::{GraphClient, GraphConfig, Neo4jExecutor};
use ogm_session::MemoryExecutor;

#[derive(Parser)]
#[command(name = "ogm")]
#[command(about = "Object-graph mapping toolkit for Neo4j")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: ogm).
    #[arg(short, long, default_value = DEFAULT_FILE_PREFIX, global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved configuration as JSON.
    CheckConfig,
    /// Save a sample graph twice and print the compiled statements.
    Demo {
        /// Traversal depth; -1 for unbounded. Defaults to session.default_depth.
        #[arg(long, allow_hyphen_values = true)]
        depth: Option<i32>,

        /// Use the in-memory executor instead of Neo4j.
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Serialize)]
struct ResolvedConfig {
    session: SessionConfig,
    neo4j: GraphConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();

    let cli = Cli::parse();
    let session_config = SessionConfig::load(&cli.config)?;
    let graph_config = GraphConfig::load(&cli.config)?;

    match cli.command {
        Command::CheckConfig => {
            let mut neo4j = graph_config;
            neo4j.password = "********".to_string();
            let resolved = ResolvedConfig {
                session: session_config,
                neo4j,
            };
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
        Command::Demo { depth, dry_run } => {
            let saves = if dry_run {
                let executor = Arc::new(MemoryExecutor::new());
                let saves = demo::run(executor.clone(), session_config, depth).await?;
                tracing::info!(
                    nodes = executor.node_count(),
                    relationships = executor.relationship_count(),
                    "Dry run complete"
                );
                saves
            } else {
                let client = GraphClient::connect(&graph_config).await?;
                demo::run(Neo4jExecutor::new(client), session_config, depth).await?
            };
            println!("{}", serde_json::to_string_pretty(&saves)?);
        }
    }

    Ok(())
}
