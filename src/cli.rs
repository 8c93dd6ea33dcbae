//! Command-line surface
//!
//! Single-dash long flags (`-phone 123`, `-phone=123`) are accepted and
//! rewritten to their `--` form before clap sees them.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

const LONG_FLAGS: [&str; 5] = ["username", "phone", "message", "sessions-dir", "config"];

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "telegram_sender")]
#[command(about = "Send one Telegram message to a username", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Username of the target account (with or without @)
    #[arg(short = 'u', long = "username", value_name = "USERNAME")]
    pub username: String,

    /// Phone number of your account; also keys the stored session
    #[arg(long, value_name = "PHONE")]
    pub phone: String,

    /// Message text (defaults to the configured message)
    #[arg(short, long)]
    pub message: Option<String>,

    /// Directory holding session files
    #[arg(long, env = "SESSIONS_DIR")]
    pub sessions_dir: Option<PathBuf>,

    /// YAML configuration file [default: config.yml, skipped if absent]
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// What `main` should do with the command line.
#[derive(Debug)]
pub enum Invocation {
    Run(Cli),
    /// `--help` / `--version`: print and exit successfully.
    Info(String),
    /// Missing or malformed arguments: print and exit with the usage code.
    Usage(String),
}

/// Rewrite `-phone` style flags to `--phone`.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(Into::into)
        .enumerate()
        .map(|(i, arg)| {
            if i == 0 || passthrough {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            match text.strip_prefix('-') {
                Some(rest) if !rest.starts_with('-') => {
                    let name = rest.split('=').next().unwrap_or(rest);
                    if LONG_FLAGS.contains(&name) {
                        OsString::from(format!("-{}", text))
                    } else {
                        arg
                    }
                }
                _ => arg,
            }
        })
        .collect()
}

pub fn parse_args<I, T>(args: I) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args = normalize_args(args);
    if args.len() <= 1 {
        return Invocation::Usage(format!("{}\n", Cli::command().render_usage()));
    }

    match Cli::try_parse_from(args) {
        Ok(cli) => Invocation::Run(cli),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            Invocation::Info(err.to_string())
        }
        Err(err) => Invocation::Usage(err.to_string()),
    }
}
