use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use guarded_vfs::{Context, EngineConfig};

mod error;
mod input;

use error::CliError;

const EXIT_FAILED: i32 = 1;
const EXIT_BOOTSTRAP: i32 = 2;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ErrorFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "guarded-vfs")]
#[command(about = "Sandboxed, checksum-guarded reads and writes under one workspace root.")]
struct Cli {
    /// Workspace root; default limits and ignore rules apply.
    #[arg(long, conflicts_with = "config", required_unless_present = "config")]
    root: Option<PathBuf>,

    /// Engine config file (.toml or .json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Format for bootstrap errors written to stderr.
    #[arg(long, value_enum, default_value_t = ErrorFormat::Text)]
    error_format: ErrorFormat,

    #[arg(long, default_value_t = input::DEFAULT_MAX_REQUEST_BYTES)]
    max_request_bytes: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read a file, list a directory, search content or look up file names.
    Read {
        /// JSON request, or `-` to read it from stdin.
        request: String,
    },
    /// Create, update or delete a file.
    Write {
        /// JSON request, or `-` to read it from stdin.
        request: String,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Read { .. } => "read",
            Command::Write { .. } => "write",
        }
    }

    fn request(&self) -> &str {
        match self {
            Command::Read { request } | Command::Write { request } => request,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_FAILED),
        Err(err) => {
            tracing::debug!(code = err.code(), error = %err, "bootstrap failed");
            match cli.error_format {
                ErrorFormat::Text => eprintln!("{err}"),
                ErrorFormat::Json => match serde_json::to_string(&err.to_json()) {
                    Ok(text) => eprintln!("{text}"),
                    Err(_) => eprintln!("{err}"),
                },
            }
            std::process::exit(EXIT_BOOTSTRAP);
        }
    }
}

fn build_context(root: Option<&Path>, config: Option<&Path>) -> Result<Context, CliError> {
    match (root, config) {
        (_, Some(config)) => Ok(Context::from_config_path(config)?),
        (Some(root), None) => {
            let root = std::path::absolute(root).map_err(|err| {
                CliError::Input(format!("cannot resolve root {}: {err}", root.display()))
            })?;
            Ok(Context::new(EngineConfig::new(root))?)
        }
        (None, None) => Err(CliError::Input("pass --root or --config".to_string())),
    }
}

/// Runs one request and prints its envelope. Returns whether the envelope reports success.
fn run(cli: &Cli) -> Result<bool, CliError> {
    let ctx = build_context(cli.root.as_deref(), cli.config.as_deref())?;
    let raw = input::load_request(cli.command.request(), cli.max_request_bytes)?;
    let (value, success) = execute(&ctx, &cli.command, &raw)?;
    tracing::debug!(
        command = cli.command.name(),
        request_bytes = raw.len(),
        success,
        "request handled"
    );
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(success)
}

fn execute(
    ctx: &Context,
    command: &Command,
    raw: &str,
) -> Result<(serde_json::Value, bool), CliError> {
    match command {
        Command::Read { .. } => {
            let response = ctx.read_json(raw);
            Ok((serde_json::to_value(&response)?, response.success))
        }
        Command::Write { .. } => {
            let response = ctx.write_json(raw);
            Ok((serde_json::to_value(&response)?, response.success))
        }
    }
}
