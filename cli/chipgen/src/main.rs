//! chipgen CLI — generate a Zig chip metadata table from the libopencm3 device database.

mod commands;
mod logging;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chipgen", version, about = "Chip metadata table generator")]
struct Cli {
    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every configured chip and write the Zig table
    Generate {
        /// Configuration file (default: chipgen.toml, searched upward)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output file (overrides output.path)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Chips resolved concurrently (overrides resolver.jobs)
        #[arg(long)]
        jobs: Option<usize>,
        /// Per-query timeout in seconds (overrides database.timeout-secs)
        #[arg(long)]
        timeout: Option<u64>,
        /// Print the document instead of writing it
        #[arg(long)]
        stdout: bool,
    },
    /// Resolve and print the record for a single chip
    Show {
        /// Chip identifier (e.g., stm32f103c8)
        chip: String,
        /// Configuration file (default: chipgen.toml, searched upward)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a template chipgen.toml
    Init {
        /// Directory to create the configuration in (default: current directory)
        dir: Option<PathBuf>,
    },
    /// Check the configuration and database tool
    Doctor {
        /// Configuration file (default: chipgen.toml, searched upward)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Generate {
            config,
            output,
            jobs,
            timeout,
            stdout,
        } => commands::generate::run(
            &cwd,
            &commands::generate::GenerateOptions {
                config,
                output,
                jobs,
                timeout,
                stdout,
            },
        ),

        Commands::Show { chip, config, json } => {
            commands::show::run(&cwd, config.as_deref(), &chip, json)
        }

        Commands::Init { dir } => {
            let dir = dir.unwrap_or(cwd);
            commands::init::run(&dir)
        }

        Commands::Doctor { config } => commands::doctor::run(&cwd, config.as_deref()),
    }
}
