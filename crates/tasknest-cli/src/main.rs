use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tasknest_infrastructure::ConfigService;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "tasknest")]
#[command(about = "tasknest - a personal task list backed by Firebase", long_about = None)]
struct Cli {
    /// Directory holding config.toml and the local state (defaults to the
    /// platform config directory)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and send a verification email
    Register {
        email: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in
    Login {
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and forget the local task list
    Logout,
    /// Send a password reset email
    ResetPassword { email: String },
    /// Send the verification email again
    ResendVerification,
    /// Ask the identity service whether the email has been verified
    CheckVerification,
    /// Apply the code from a verification email link
    Verify { code: String },
    /// Show the current session
    Whoami,
    /// Add a task
    Add {
        name: String,
        #[arg(long, short)]
        description: String,
        /// YYYY-MM-DD, today or later
        #[arg(long)]
        deadline: NaiveDate,
    },
    /// Sync, then list tasks
    List {
        /// all, pending or completed; remembered for later listings
        #[arg(long, short)]
        filter: Option<String>,
        /// Case-insensitive match on name or description
        #[arg(long, short)]
        search: Option<String>,
        /// Show the locally stored list without syncing first
        #[arg(long)]
        local: bool,
    },
    /// Change a task
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long)]
        deadline: Option<NaiveDate>,
    },
    /// Flip a task between pending and completed
    Toggle { id: String },
    /// Delete a task
    Delete { id: String },
    /// Replace the local list with the remote one
    Sync,
    /// Show task counters
    Stats,
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_service = ConfigService::new(cli.home.as_deref());
    let config = config_service.get_config()?;
    init_tracing(&config.logging.level);

    let succeeded = commands::run(cli.command, &config_service, cli.json).await?;

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_task_commands() {
        let cli = Cli::try_parse_from([
            "tasknest",
            "--json",
            "add",
            "Buy milk",
            "-d",
            "2%",
            "--deadline",
            "2030-01-01",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Add { ref name, deadline, .. }
                if name == "Buy milk" && deadline == NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
        ));

        assert!(Cli::try_parse_from(["tasknest", "add", "x", "-d", "y", "--deadline", "soon"]).is_err());
    }
}
