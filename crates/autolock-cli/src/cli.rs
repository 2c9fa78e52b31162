//! Argument parsing, logging setup, and command dispatch.

use std::path::PathBuf;

use anyhow::anyhow;
use autolock_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;

use crate::commands::interval::{handle_bounds, handle_get, handle_set};
use crate::commands::watch::handle_watch;
use crate::context::{AppContext, CliError, CliResult};

const DEFAULT_STORE_PATH: &str = "autolock-store.json";
const DEFAULT_POLL_MS: u64 = 500;

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    if let Err(err) = install_logging(&cli) {
        eprintln!("error: {}", err.display_message());
        return err.exit_code();
    }

    match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn install_logging(cli: &Cli) -> CliResult<()> {
    let config = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        build_sha: env!("CARGO_PKG_VERSION"),
    };
    init_logging(&config)
        .map_err(|err| CliError::failure(anyhow!("failed to initialise logging: {err}")))
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    let ctx = AppContext {
        store_path: cli.store,
        output: cli.output,
    };
    debug!(store = %ctx.store_path.display(), command = cli.command.label(), "dispatching");

    let rendered = match cli.command {
        Command::Get => handle_get(&ctx).await?,
        Command::Set(args) => handle_set(&ctx, &args).await?,
        Command::Bounds => handle_bounds(&ctx)?,
        Command::Watch(args) => return handle_watch(&ctx, &args).await,
    };
    println!("{rendered}");
    Ok(())
}

#[derive(Parser)]
#[command(name = "autolock", about = "Inspect and change the wallet auto-lock interval")]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "AUTOLOCK_STORE_PATH",
        default_value = DEFAULT_STORE_PATH,
        help = "Path of the settings store document"
    )]
    store: PathBuf,
    #[arg(
        long,
        global = true,
        env = "AUTOLOCK_LOG_LEVEL",
        default_value = DEFAULT_LOG_LEVEL
    )]
    log_level: String,
    #[arg(
        long,
        global = true,
        env = "AUTOLOCK_LOG_FORMAT",
        value_parser = parse_log_format,
        help = "Log output format (pretty or json)"
    )]
    log_format: Option<LogFormat>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for command results"
    )]
    output: OutputFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Print the current auto-lock interval.
    Get,
    /// Validate and store a new auto-lock interval.
    Set(SetArgs),
    /// Print the storage key and accepted bounds.
    Bounds,
    /// Print every interval change until interrupted.
    Watch(WatchArgs),
}

impl Command {
    const fn label(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set(_) => "set",
            Self::Bounds => "bounds",
            Self::Watch(_) => "watch",
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct SetArgs {
    /// New interval in whole minutes.
    #[arg(allow_hyphen_values = true)]
    pub(crate) minutes: String,
}

#[derive(Args, Debug)]
pub(crate) struct WatchArgs {
    /// How often to check the store document for outside changes.
    #[arg(long, default_value_t = DEFAULT_POLL_MS)]
    pub(crate) poll_ms: u64,
    /// Also run the idle lock timer and report lock transitions.
    #[arg(long)]
    pub(crate) lock_timer: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value
        .parse()
        .map_err(|_| format!("unsupported log format `{value}` (expected pretty or json)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_with_globals() {
        let cli = Cli::try_parse_from([
            "autolock",
            "--store",
            "/tmp/settings.json",
            "--output",
            "json",
            "--log-format",
            "json",
            "set",
            "15",
        ])
        .unwrap();
        assert_eq!(cli.store, PathBuf::from("/tmp/settings.json"));
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        match cli.command {
            Command::Set(args) => assert_eq!(args.minutes, "15"),
            _ => panic!("expected set command"),
        }
    }

    #[test]
    fn set_accepts_negative_input_for_validation() {
        let cli = Cli::try_parse_from(["autolock", "set", "-3"]).unwrap();
        assert!(matches!(cli.command, Command::Set(ref args) if args.minutes == "-3"));
    }

    #[test]
    fn watch_defaults_poll_interval() {
        let cli = Cli::try_parse_from(["autolock", "watch"]).unwrap();
        match cli.command {
            Command::Watch(args) => {
                assert_eq!(args.poll_ms, DEFAULT_POLL_MS);
                assert!(!args.lock_timer);
            }
            _ => panic!("expected watch command"),
        }
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["autolock", "--log-format", "xml", "get"]).is_err());
        assert!(parse_log_format("pretty").is_ok());
    }
}
