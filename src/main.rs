/// Time Planner MCP server binary
///
/// Parses the command line, sets up logging on stderr and serves MCP over
/// stdin/stdout until the client closes the stream.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use time_planner_mcp::{ServerConfig, StorageBackend, TimePlannerServer};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Schedule data file; defaults to ~/.time_planner/time_management_data.<json|db>
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Storage backend for the data file
    #[arg(long, value_enum, default_value_t = StorageBackend::Json)]
    backend: StorageBackend,

    /// JSON file with user preferences (wake-up time, meals, work days...)
    #[arg(long)]
    preferences: Option<PathBuf>,

    /// First day of week 1 (YYYY-MM-DD), used only when starting a new data file
    #[arg(long)]
    epoch: Option<NaiveDate>,

    /// Log at info level
    #[arg(short, long)]
    debug: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn log_level(&self) -> &'static str {
        match (self.verbose, self.debug) {
            (true, _) => "debug",
            (false, true) => "info",
            (false, false) => "warn",
        }
    }
}

/// A directory we can create and write into
fn is_writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".write_probe");
    let ok = std::fs::write(&probe, b"").is_ok();
    let _ = std::fs::remove_file(&probe);
    ok
}

/// Where the data file lives when `--data-file` is not given
///
/// Home, platform data dir, config dir and the working directory are tried in
/// that order; the temp dir is the last resort.
fn default_data_path(backend: StorageBackend) -> std::io::Result<PathBuf> {
    let candidates = [
        dirs::home_dir().map(|home| home.join(".time_planner")),
        dirs::data_dir().map(|data| data.join("time_planner")),
        dirs::config_dir().map(|config| config.join("time_planner")),
        std::env::current_dir().ok().map(|cwd| cwd.join(".time_planner")),
    ];

    if let Some(dir) = candidates.into_iter().flatten().find(|dir| is_writable(dir)) {
        return Ok(dir.join(backend.default_file_name()));
    }

    let fallback = std::env::temp_dir().join("time_planner");
    std::fs::create_dir_all(&fallback)?;
    let path = fallback.join(backend.default_file_name());
    warn!("No writable data directory found, using {}", path.display());
    Ok(path)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // RUST_LOG wins over the flags; stdout carries JSON-RPC only
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("time_planner_mcp={}", args.log_level())));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let data_file = match args.data_file {
        Some(path) => {
            match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)?,
                _ => {}
            }
            path
        }
        None => default_data_path(args.backend)?,
    };
    info!("Starting Time Planner MCP server, data at {}", data_file.display());

    let server = TimePlannerServer::new(ServerConfig {
        data_file,
        backend: args.backend,
        preferences_file: args.preferences,
        epoch: args.epoch,
    })?;
    server.run().await?;

    info!("Time Planner MCP server stopped");
    Ok(())
}
