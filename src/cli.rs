use clap::Parser;
use std::path::PathBuf;

use crate::config::HarnessConfig;

#[derive(Parser, Debug)]
#[command(name = "relaycheck")]
#[command(author, version, about = "Integration harness for JSON-RPC routing proxies", long_about = None)]
pub struct Cli {
    /// Verbose mode (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Harness config file path
    #[arg(short, long, default_value = "relaycheck.json")]
    pub config: PathBuf,

    /// Number of stub backends to launch
    #[arg(long)]
    pub fleet_size: Option<u16>,

    /// First TCP port of the stub fleet
    #[arg(long)]
    pub fleet_base_port: Option<u16>,

    /// Base URL the proxy under test serves on
    #[arg(long)]
    pub proxy_url: Option<String>,

    /// Path to the proxy binary under test
    #[arg(long)]
    pub proxy_bin: Option<String>,

    /// Configuration file handed to the proxy as its sole argument
    #[arg(long)]
    pub proxy_config: Option<String>,

    /// Path to the stub backend binary
    #[arg(long)]
    pub stub_bin: Option<String>,
}

impl Cli {
    pub fn get_log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::ERROR,
            1 => tracing::Level::WARN,
            2 => tracing::Level::INFO,
            3 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    /// CLI flags win over the config file and environment.
    pub fn apply_overrides(&self, config: &mut HarnessConfig) {
        if let Some(fleet_size) = self.fleet_size {
            config.fleet_size = fleet_size;
        }
        if let Some(fleet_base_port) = self.fleet_base_port {
            config.fleet_base_port = fleet_base_port;
        }
        if let Some(proxy_url) = &self.proxy_url {
            config.proxy_url = proxy_url.clone();
        }
        if let Some(proxy_bin) = &self.proxy_bin {
            config.proxy_bin = proxy_bin.clone();
        }
        if let Some(proxy_config) = &self.proxy_config {
            config.proxy_config = proxy_config.clone();
        }
        if let Some(stub_bin) = &self.stub_bin {
            config.stub_bin = stub_bin.clone();
        }
    }
}
