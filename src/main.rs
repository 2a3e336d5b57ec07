//! ptimer CLI - package timer programs into portable containers
//!
//! Commands:
//!   ptimer create <script> <output>       - Compile a script into a container
//!   ptimer extract <container> <out-dir>  - Unpack a container
//!   ptimer inspect <container>            - Display container metadata

use clap::{Parser, Subcommand};
use ptimer::{create, extract, inspect, CreateOptions, CyclePolicy, Program};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ptimer")]
#[command(about = "Package timer programs into portable containers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a timer script into a container file
    Create {
        /// Path to the timer script
        script: PathBuf,

        /// Path of the container to write
        output: PathBuf,

        /// Treat next-reference cycles as validation errors
        #[arg(long)]
        forbid_cycles: bool,
    },
    /// Unpack a container into a script and its asset files
    Extract {
        /// Path to the container file
        container: PathBuf,

        /// Directory to write the script and assets into
        output_dir: PathBuf,
    },
    /// Inspect a container and display its metadata
    Inspect {
        /// Path to the container file
        container: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Create {
            script,
            output,
            forbid_cycles,
        } => {
            let options = CreateOptions {
                cycle_policy: if forbid_cycles {
                    CyclePolicy::Forbid
                } else {
                    CyclePolicy::Allow
                },
            };
            create(&script, &output, options)?;
            Ok(())
        }
        Commands::Extract {
            container,
            output_dir,
        } => {
            let script_path = extract(&container, &output_dir)?;
            println!("{}", script_path.display());
            Ok(())
        }
        Commands::Inspect { container, json } => inspect_command(&container, json),
    }
}

fn inspect_command(container: &PathBuf, json: bool) -> anyhow::Result<()> {
    let (program, assets) = inspect(container)?;

    if json {
        let output = serde_json::json!({
            "title": program.title,
            "version": program.schema_version,
            "default_duration": program.default_duration,
            "steps": program.steps,
            "assets": assets.values().map(|a| serde_json::json!({
                "id": a.id,
                "content_type": a.content_type,
                "size": a.data.len(),
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_program(&program);
    if !assets.is_empty() {
        println!("assets:");
        for asset in assets.values() {
            println!(
                "  {} ({}, {} bytes)",
                asset.id,
                asset.content_type,
                asset.data.len()
            );
        }
    }
    Ok(())
}

fn print_program(program: &Program) {
    if !program.title.is_empty() {
        println!("title: {}", program.title);
    }
    println!("version: {}", program.schema_version);
    if program.steps.is_empty() {
        println!("steps: none");
        return;
    }
    println!("steps:");
    for step in &program.steps {
        let mut line = format!("  {} ({}s", step.id, step.duration);
        if let Some(next) = &step.next {
            line.push_str(&format!(", next {next}"));
        }
        line.push(')');
        if !step.title.is_empty() {
            line.push_str(&format!(" {}", step.title));
        }
        println!("{line}");
    }
}
