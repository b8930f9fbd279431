//! Document Circuit Admin CLI
//!
//! Offline checks for circuit definition files before they are handed to the
//! server: static validation and a readable description of a circuit.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use document_circuit::{Circuit, LoggingConfig};
use tracing::debug;

#[derive(Parser)]
#[command(name = "document-circuit-admin")]
#[command(about = "Document Circuit Admin CLI - Validate and inspect circuit definitions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every circuit in a definitions file
    Validate {
        /// JSON file holding an array of circuits
        #[arg(env = "CIRCUIT_SERVER__CIRCUITS_PATH")]
        file: PathBuf,
    },

    /// Print the steps, actions and checklist of one circuit
    Describe {
        /// JSON file holding an array of circuits
        file: PathBuf,

        /// Circuit to describe
        circuit_id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: if cli.verbose { "debug" } else { "warn" }.to_string(),
        json: false,
    };
    logging.init()?;

    match cli.command {
        Commands::Validate { file } => validate(&file),
        Commands::Describe { file, circuit_id } => describe(&file, &circuit_id),
    }
}

fn load(file: &Path) -> Result<Vec<Circuit>> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let circuits: Vec<Circuit> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of circuits", file.display()))?;
    debug!(count = circuits.len(), "Parsed circuit definitions");
    Ok(circuits)
}

fn validate(file: &Path) -> Result<()> {
    let circuits = load(file)?;
    let mut failures = 0;

    for circuit in &circuits {
        match circuit.validate() {
            Ok(()) => println!("{} {} ({})", "✓".green(), circuit.id, circuit.title),
            Err(e) => {
                failures += 1;
                println!("{} {}", "✗".red(), e.to_string().red());
            }
        }
    }

    println!();
    if failures > 0 {
        bail!("{} of {} circuits are invalid", failures, circuits.len());
    }
    println!("{}", format!("All {} circuits are valid", circuits.len()).green().bold());
    Ok(())
}

fn describe(file: &Path, circuit_id: &str) -> Result<()> {
    let circuits = load(file)?;
    let circuit = circuits
        .iter()
        .find(|c| c.id.as_str() == circuit_id)
        .with_context(|| format!("circuit {} not found in {}", circuit_id, file.display()))?;

    let status = if circuit.is_active {
        "active".green()
    } else {
        "inactive".yellow()
    };
    let flow = if circuit.has_ordered_flow {
        "ordered"
    } else {
        "unordered"
    };
    println!("{} {} [{}, {}]", circuit.id.as_str().bold(), circuit.title, status, flow);

    if let Err(e) = circuit.validate() {
        println!("  {}", e.to_string().red());
    }

    for step in circuit.steps_in_order() {
        let mut line = format!("  {:>3}  {} ({})", step.order_index, step.id, step.step_key);
        if let Some(role) = &step.responsible_role_id {
            line.push_str(&format!(" role={}", role));
        }
        if step.is_final_step {
            println!("{} {}", line.bold(), "final".cyan());
        } else {
            println!("{}", line.bold());
        }

        for action in circuit.actions_for_step(&step.id) {
            match &action.target_step_id {
                Some(target) if !circuit.has_ordered_flow => {
                    println!("       action {} \"{}\" -> {}", action.id, action.title, target)
                }
                _ => println!("       action {} \"{}\"", action.id, action.title),
            }
        }

        for item in circuit.status_items_for_step(&step.id) {
            let marker = if item.is_required { "required" } else { "optional" };
            println!("       item   {} \"{}\" ({})", item.id, item.title, marker.dimmed());
        }
    }

    let finals: Vec<String> = circuit.final_steps().iter().map(|s| s.id.to_string()).collect();
    if finals.is_empty() {
        println!("{}", "  no final step: documents can never complete".yellow());
    } else {
        println!("  final steps: {}", finals.join(", "));
    }

    Ok(())
}
