use clap::Parser;
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Debug, Parser)]
#[command(
    version,
    about = "Release mirror and update server",
    long_about = "Mirrors the latest release of a repository into a local cache and serves\n\
                  update checks and asset downloads over HTTP. Refreshes on a timer and\n\
                  on release webhooks."
)]
pub struct CliArgs {
    /// Path to the YAML configuration file
    #[arg(
        short,
        long,
        env = "CONFIG_PATH",
        default_value = "config.yaml",
        help = "Path to the YAML configuration file"
    )]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable detailed debug logging")]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, help = "Emit logs as JSON lines instead of human readable text")]
    pub log_json: bool,
}
