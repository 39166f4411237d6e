pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "carhaul",
    about = "Carhaul operator CLI",
    long_about = "Price shipments, preview payment splits, inspect configuration, and operate the carhaul database.",
    after_help = "Examples:\n  carhaul quote --vehicle-type sedan --distance-miles 500\n  carhaul split --total 1499.99\n  carhaul doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Compute a deterministic shipping quote with its charge breakdown")]
    Quote(commands::quote::QuoteArgs),
    #[command(about = "Preview the upfront/remaining payment split for a quoted total")]
    Split(commands::split::SplitArgs),
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and database connectivity readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    let result = match cli.command {
        Command::Quote(args) => commands::quote::run(&args),
        Command::Split(args) => commands::split::run(&args),
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
