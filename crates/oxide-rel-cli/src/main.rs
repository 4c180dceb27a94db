//! oxide-rel CLI
//!
//! Command-line tool for evaluating query plans over a workspace file.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_rel::output::render;
use oxide_rel::{listing, profile_relation, run_queries, Format, StrategyArg, Workspace};
use oxide_rel_core::EvalOptions;

/// Evaluate relational query plans.
#[derive(Parser)]
#[command(name = "oxide-rel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Workspace file with relations, views and queries.
    #[arg(short, long, env = "OXIDE_REL_FILE", default_value = "workspace.json")]
    file: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// How joins are executed.
    #[arg(long, value_enum, env = "OXIDE_REL_JOIN_STRATEGY", default_value = "auto")]
    join_strategy: StrategyArg,

    /// Output format.
    #[arg(long, value_enum, default_value = "table")]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate queries from the workspace.
    Run {
        /// Query name (all queries, in file order, if not specified).
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Profile a relation: row, null and distinct counts per column.
    Profile {
        /// Relation name.
        #[arg(short, long)]
        relation: String,
    },

    /// List relations, views and queries.
    List,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let workspace = Workspace::load(&cli.file)?;
    let options = EvalOptions {
        join_strategy: cli.join_strategy.into(),
    };

    match cli.command {
        Commands::Run { query } => {
            let results = run_queries(&workspace, query.as_deref(), options)?;
            if results.is_empty() {
                info!("No queries in workspace.");
            }
            for (name, relation) in &results {
                if cli.format == Format::Table {
                    println!("{name}:");
                }
                println!("{}", render(relation, cli.format)?);
            }
        }

        Commands::Profile { relation } => {
            let profiled = profile_relation(&workspace, &relation)?;
            println!("{}", render(&profiled, cli.format)?);
        }

        Commands::List => {
            println!("{}", listing(&workspace));
        }
    }

    Ok(())
}
