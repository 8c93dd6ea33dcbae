//! Telegram Sender CLI - main entry point
//!
//! Usage:
//!   telegram_sender -u <username> -phone <phone> [-m <text>]

use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;

use telegram_sender::cli::{self, Cli, Invocation};
use telegram_sender::commands::send_message::{self, SendReport, SendRequest};
use telegram_sender::error::USAGE_EXIT_CODE;
use telegram_sender::{AuthOutcome, Config, Result};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match cli::parse_args(std::env::args_os()) {
        Invocation::Run(cli) => cli,
        Invocation::Info(text) => {
            print!("{}", text);
            return ExitCode::SUCCESS;
        }
        Invocation::Usage(text) => {
            print!("{}", text);
            return ExitCode::from(USAGE_EXIT_CODE);
        }
    };

    // Logs go to stderr; stdout carries prompts and the result line
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("telegram_sender=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(report) => {
            if let AuthOutcome::LoggedIn(account) = &report.auth {
                println!("✓ Signed in as {}", account.display_name);
            }
            println!("✓ Message sent to @{}", report.peer.username);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(exit_code = err.exit_code(), "{}", err);
            eprintln!("error: {}", err);
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<SendReport> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.sessions_dir {
        config.sessions_dir = dir;
    }

    let request = SendRequest {
        text: cli.message.unwrap_or_else(|| config.message.clone()),
        phone: cli.phone,
        username: cli.username,
    };

    send_message::run(&request, &config).await
}
