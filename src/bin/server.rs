// Document Circuit - REST API server
// Run with: cargo run --bin server

//! # Document Circuit Server Binary
//!
//! Starts the HTTP API over an in-memory workflow engine.
//!
//! ```text
//! main()
//!   ↓ loads
//! Settings (defaults → optional file → CIRCUIT_* env)
//!   ↓ reads
//! circuit definitions (JSON file)
//!   ↓ builds
//! WorkflowEngine (in-memory state, audit, checklist)
//!   ↓ serves
//! ApiServer (axum)
//! ```

use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use tracing::{info, warn};

use document_circuit::api::ApiServer;
use document_circuit::{InMemoryCircuitRepository, Settings, WorkflowEngine};

#[derive(Parser)]
#[command(name = "document-circuit-server")]
#[command(about = "Document circuit workflow engine - REST API server")]
#[command(version)]
struct Args {
    /// Settings file (toml, yaml or json); optional
    #[arg(short, long, env = "CIRCUIT_CONFIG")]
    config: Option<String>,

    /// Circuit definitions file, overrides the settings value
    #[arg(long)]
    circuits: Option<String>,

    /// Port, overrides the settings value
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let dotenv_result = dotenv();

    let args = Args::parse();
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(circuits) = args.circuits {
        settings.server.circuits_path = Some(circuits);
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    settings.logging.init()?;

    if let Err(e) = dotenv_result {
        info!("No .env file loaded: {}", e);
    }

    info!("Starting Document Circuit Server...");
    info!("Max commit attempts: {}", settings.engine.max_commit_attempts);
    info!("Activate on assign: {}", settings.engine.activate_on_assign);

    let repository = match &settings.server.circuits_path {
        Some(path) => InMemoryCircuitRepository::from_json_file(path)?,
        None => {
            warn!(
                "No circuits file configured (CIRCUIT_SERVER__CIRCUITS_PATH); \
                 serving an empty repository"
            );
            InMemoryCircuitRepository::new()
        }
    };
    info!("Circuits loaded: {}", repository.len());

    let engine =
        WorkflowEngine::in_memory_with_config(Arc::new(repository), settings.engine.clone());
    let server = ApiServer::new(settings.server.clone(), Arc::new(engine));

    server.run().await
}
