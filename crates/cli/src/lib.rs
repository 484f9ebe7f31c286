pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "caio",
    about = "Caio payments assistant operator CLI",
    long_about = "Inspect configuration, check model backend readiness, and ask the assistant one-off questions.",
    after_help = "Examples:\n  caio doctor --json\n  caio config\n  caio ask --email maria.souza@empresa.com \"Quero ver minhas notas\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, render the policy, and check model backend reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Send one message through the agent runtime and print the JSON reply")]
    Ask {
        #[arg(long, help = "Identity of the person asking, e.g. maria.souza@empresa.com")]
        email: String,
        #[arg(help = "Message text")]
        message: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Ask { email, message } => commands::ask::run(&email, &message),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
