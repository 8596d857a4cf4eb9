//! Command-line arguments for the control plane binary.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "quantix-vdc",
    about = "Quantix-vDC cluster control plane",
    version
)]
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "/etc/quantix/vdc.yaml")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "QUANTIX_LOG_LEVEL")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Mirror logs to this file as JSON lines
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,

    /// Listen address override (host:port)
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Database URL override
    #[arg(long, env = "QUANTIX_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Development mode: in-memory repositories and a mock node daemon,
    /// no Postgres required
    #[arg(long)]
    pub dev: bool,
}
