pub mod decode;
pub mod dns;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Recursive DNS resolver for a chain-rooted namespace
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the configuration file
    #[arg(
        short,
        long,
        default_value = "/etc/norn/norn.toml",
        env = "CONFIG_PATH"
    )]
    config_path: PathBuf,
    #[command(subcommand)]
    inner: Commands,
}

impl Args {
    pub async fn run(self) {
        match self.inner {
            Commands::Decode(inner) => inner.run(),
            Commands::Dns(inner) => {
                let config = crate::config::Config::load(&self.config_path);
                inner.run(config).await
            }
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    Decode(decode::Command),
    Dns(dns::Command),
}
