use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use hello_app::build::CLAP_LONG_VERSION;
use hello_app::config::{env, DEFAULT_HTTP_PORT};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[clap(long_version = CLAP_LONG_VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: GlobalSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum GlobalSubcommand {
    /// Serve `/hello` and export telemetry until a shutdown signal is received
    #[command(name = "launch")]
    Launch(LaunchOptions),
}

#[derive(Args, Debug)]
pub struct LaunchOptions {
    /// Path to a JSON configuration file
    #[arg(short, long, conflicts_with = "config_content")]
    pub config_file: Option<PathBuf>,

    /// JSON configuration given inline
    #[arg(long)]
    pub config_content: Option<String>,

    /// Address of the OTLP gRPC collector, used when no configuration is given
    #[arg(long, env = env::EXPORTER_ENDPOINT)]
    pub exporter_endpoint: Option<String>,

    /// Comma-separated `key=value` headers sent to managed collectors
    #[arg(long, env = env::EXPORTER_HEADERS)]
    pub exporter_headers: Option<String>,

    /// Host to listen on, all interfaces when unset
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long, default_value_t = DEFAULT_HTTP_PORT)]
    pub port: u16,

    /// Seconds between two metric exports
    #[arg(long, default_value_t = 5)]
    pub metric_step: u64,
}
