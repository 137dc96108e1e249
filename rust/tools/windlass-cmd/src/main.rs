use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod utils;
mod workload;

#[derive(Parser)]
#[command(name = "windlass-cmd")]
#[command(about = "Command-line driver for the Windlass task execution engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic workload file
    Generate {
        /// Number of entries to generate
        #[arg(short, long, default_value_t = 100)]
        count: usize,

        /// Fraction of entries flagged to fail, between 0.0 and 1.0
        #[arg(long, default_value_t = 0.1)]
        fail_ratio: f64,

        /// Seed for deterministic generation
        #[arg(long)]
        seed: Option<u64>,

        /// Output file for the generated workload (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Execute a workload file on a worker pool
    Run {
        /// Worker threads (defaults to one per logical CPU)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Task queue depth (defaults to twice the worker count)
        #[arg(long)]
        queue_capacity: Option<usize>,

        /// Write a JSON execution report to this file
        #[arg(short, long)]
        output: Option<String>,

        /// Workload file to execute
        workload_path: String,
    },

    /// Inspect a workload file and display summary information
    Inspect {
        /// Increase verbosity (-v lists individual entries)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,

        /// Workload file to inspect
        workload_path: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            count,
            fail_ratio,
            seed,
            output,
        } => commands::generate::run(count, fail_ratio, seed, output),
        Commands::Run {
            workers,
            queue_capacity,
            output,
            workload_path,
        } => commands::run::run(workers, queue_capacity, output, workload_path),
        Commands::Inspect {
            verbose,
            workload_path,
        } => commands::inspect::run(verbose, workload_path),
    }
}
