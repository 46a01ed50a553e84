pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lendrelay_core::config::LoadOptions;

#[derive(Debug, Parser)]
#[command(
    name = "lendrelay",
    about = "Lendrelay operator CLI",
    long_about = "Validate, simulate and submit mortgage proposals across partner banks.",
    after_help = "Examples:\n  lendrelay policies\n  lendrelay validate --proposal proposal.json --bank itau --bank caixa\n  lendrelay submit --proposal proposal.json\n  lendrelay submit --proposal proposal.json --dry-run"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a lendrelay.toml file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Print the underwriting policy table")]
    Policies {
        #[arg(long, help = "Only print this bank's policy")]
        bank: Option<String>,
    },
    #[command(about = "Validate a proposal file against bank policies without contacting banks")]
    Validate {
        #[arg(long, help = "Proposal JSON file")]
        proposal: PathBuf,
        #[arg(long = "bank", help = "Bank to validate for (repeatable)")]
        banks: Vec<String>,
    },
    #[command(about = "Request simulations from configured banks")]
    Simulate {
        #[arg(long, help = "Proposal JSON file")]
        proposal: PathBuf,
        #[arg(long = "bank", help = "Bank to simulate at (repeatable)")]
        banks: Vec<String>,
    },
    #[command(about = "Validate, adjust and submit a proposal to configured banks")]
    Submit {
        #[arg(long, help = "Proposal JSON file")]
        proposal: PathBuf,
        #[arg(long = "bank", help = "Bank to submit to (repeatable)")]
        banks: Vec<String>,
        #[arg(long, help = "Keep clients and proposal records in memory instead of the database")]
        dry_run: bool,
    },
}

impl Cli {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config.clone(),
            ..LoadOptions::default()
        }
    }
}

pub fn execute(cli: Cli) -> ExitCode {
    let options = cli.load_options();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(options),
        Command::Config => commands::config::run(options),
        Command::Policies { bank } => commands::policies::run(bank.as_deref()),
        Command::Validate { proposal, banks } => commands::validate::run(&proposal, &banks),
        Command::Simulate { proposal, banks } => {
            commands::simulate::run(options, &proposal, &banks)
        }
        Command::Submit { proposal, banks, dry_run } => {
            commands::submit::run(options, &proposal, &banks, dry_run)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
