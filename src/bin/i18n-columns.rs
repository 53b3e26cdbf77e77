//! i18n-columns: generate a migration that splits translatable attributes
//! into one column per configured language.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use colored::*;
use tracing_subscriber::EnvFilter;

use i18n_columns::emitter::MigrationArtifact;
use i18n_columns::planner::{MigrationPlan, StepKind};
use i18n_columns::render::render_operation;
use i18n_columns::run::{Outcome, RunOptions, run};

#[derive(Parser)]
#[command(name = "i18n-columns")]
#[command(about = "Generate per-language column migrations for translatable attributes")]
#[command(version)]
struct Cli {
    /// Config file (default: ./i18n-columns.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database to inspect
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Plan against a saved JSON schema snapshot instead of the database
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Save the inspected schema snapshot to this file
    #[arg(long)]
    save_schema: Option<PathBuf>,

    /// JSON model manifest (overrides the config's models)
    #[arg(long)]
    models: Option<PathBuf>,

    /// Print the migration without writing it
    #[arg(long)]
    dry_run: bool,

    /// Show planning decisions
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "i18n_columns=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let options = RunOptions {
        config: cli.config,
        database_url: cli.database_url,
        schema: cli.schema,
        save_schema: cli.save_schema,
        models: cli.models,
        dry_run: cli.dry_run,
    };

    println!("{}", "🌐 i18n column migration".cyan().bold());
    let outcome = run(&options)
        .await
        .context("migration generation aborted")?;

    match outcome {
        Outcome::UpToDate => {
            println!("{}", "✓ Database up to date - no migration written".green());
        }
        Outcome::Preview { plan, artifact } => {
            print_plan(&plan, &artifact);
            println!();
            println!("{}", "(dry run) Nothing written. Script:".dimmed());
            println!();
            print!("{}", artifact.render());
        }
        Outcome::Written { plan, artifact } => {
            print_plan(&plan, &artifact);
            println!();
            println!("{}", "✓ Migration successfully created".green().bold());
            println!("  {}", artifact.summary());
            println!();
            println!(
                "{} Apply {} with your migration runner",
                "💡".yellow(),
                artifact.name.cyan()
            );
        }
    }
    Ok(())
}

fn print_plan(plan: &MigrationPlan, artifact: &MigrationArtifact) {
    println!();
    println!(
        "  {} rename(s), {} new column(s)",
        plan.renames().to_string().yellow(),
        plan.additions().to_string().yellow()
    );
    for step in &plan.steps {
        let kind = match step.kind {
            StepKind::Rename => "rename".yellow(),
            StepKind::Add => "add".green(),
        };
        println!(
            "  {} {}.{} [{}] ← {}",
            kind,
            step.table,
            step.attribute,
            step.language.cyan(),
            step.source_column.dimmed()
        );
    }

    println!();
    println!(
        "┌─ {} ({} operations) ─────────────────────────────────┐",
        "UP".green().bold(),
        artifact.up.len()
    );
    for (i, op) in artifact.up.iter().enumerate() {
        println!("│ {}. {}", i + 1, render_operation(op, artifact.dialect).cyan());
    }
    println!("└──────────────────────────────────────────────────────────────┘");
    println!(
        "┌─ {} ({} operations) ──────────────────────────────┐",
        "DOWN".yellow().bold(),
        artifact.down.len()
    );
    for (i, op) in artifact.down.iter().enumerate() {
        println!("│ {}. {}", i + 1, render_operation(op, artifact.dialect).yellow());
    }
    println!("└──────────────────────────────────────────────────────────────┘");
}
