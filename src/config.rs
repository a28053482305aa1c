use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Harness configuration. Ports and URLs are explicit settings with the
/// classic topology as defaults, so concurrent runs can pick non-colliding
/// port ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Number of stub backends in the fleet.
    #[serde(default = "default_fleet_size")]
    pub fleet_size: u16,
    /// First fleet port; backend `i` listens at `fleet_base_port + i`.
    #[serde(default = "default_fleet_base_port")]
    pub fleet_base_port: u16,
    /// Base URL the proxy under test serves on.
    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,
    /// Proxy binary, invoked as `<proxy_bin> <proxy_config>`.
    #[serde(default = "default_proxy_bin")]
    pub proxy_bin: String,
    /// Configuration file handed to the proxy as its sole argument. Its
    /// schema belongs to the proxy, not the harness.
    #[serde(default = "default_proxy_config")]
    pub proxy_config: String,
    /// Stub backend binary, invoked as `<stub_bin> <port>`.
    #[serde(default = "default_stub_bin")]
    pub stub_bin: String,
    /// Bound on each readiness probe (per backend and for the proxy).
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
    /// Per-call HTTP timeout for scenario requests.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct HarnessConfigEnv {
    pub relay_fleet_size: Option<u16>,
    pub relay_fleet_base_port: Option<u16>,
    pub relay_proxy_url: Option<String>,
    pub relay_proxy_bin: Option<String>,
    pub relay_proxy_config: Option<String>,
    pub relay_stub_bin: Option<String>,
    pub relay_ready_timeout_secs: Option<u64>,
    pub relay_call_timeout_secs: Option<u64>,
}

fn default_fleet_size() -> u16 {
    3
}

fn default_fleet_base_port() -> u16 {
    5001
}

fn default_proxy_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_proxy_bin() -> String {
    "./query_api_proxy".to_string()
}

fn default_proxy_config() -> String {
    "./sample.yml".to_string()
}

fn default_stub_bin() -> String {
    // The stub binary ships next to the orchestrator binary.
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|dir| dir.join("stub_rpc_server")))
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "./stub_rpc_server".to_string())
}

fn default_ready_timeout_secs() -> u64 {
    4
}

fn default_call_timeout_secs() -> u64 {
    10
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            fleet_size: default_fleet_size(),
            fleet_base_port: default_fleet_base_port(),
            proxy_url: default_proxy_url(),
            proxy_bin: default_proxy_bin(),
            proxy_config: default_proxy_config(),
            stub_bin: default_stub_bin(),
            ready_timeout_secs: default_ready_timeout_secs(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

impl HarnessConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).context("Failed to read config file")?;

        serde_json::from_str(&contents).context("Failed to parse config file")
    }

    /// Defaults, overlaid by the config file when present, overlaid by
    /// `RELAY_*` environment variables.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        // Load .env file if it exists (optional)
        if let Ok(dotenv_path) = std::env::current_dir().map(|mut p| {
            p.push(".env");
            p
        }) {
            if dotenv_path.exists() {
                dotenvy::from_path(&dotenv_path).ok();
            }
        }

        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };

        if let Ok(env_config) = envy::from_env::<HarnessConfigEnv>() {
            if let Some(fleet_size) = env_config.relay_fleet_size {
                config.fleet_size = fleet_size;
            }
            if let Some(fleet_base_port) = env_config.relay_fleet_base_port {
                config.fleet_base_port = fleet_base_port;
            }
            if let Some(proxy_url) = env_config.relay_proxy_url {
                config.proxy_url = proxy_url;
            }
            if let Some(proxy_bin) = env_config.relay_proxy_bin {
                config.proxy_bin = proxy_bin;
            }
            if let Some(proxy_config) = env_config.relay_proxy_config {
                config.proxy_config = proxy_config;
            }
            if let Some(stub_bin) = env_config.relay_stub_bin {
                config.stub_bin = stub_bin;
            }
            if let Some(ready_timeout_secs) = env_config.relay_ready_timeout_secs {
                config.ready_timeout_secs = ready_timeout_secs;
            }
            if let Some(call_timeout_secs) = env_config.relay_call_timeout_secs {
                config.call_timeout_secs = call_timeout_secs;
            }
        }

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    pub fn fleet_ports(&self) -> Vec<u16> {
        (0..self.fleet_size)
            .map(|i| self.fleet_base_port + i)
            .collect()
    }

    /// `host:port` the proxy readiness probe connects to, derived from
    /// `proxy_url`.
    pub fn proxy_probe_addr(&self) -> Result<String> {
        let url = reqwest::Url::parse(&self.proxy_url).context("Invalid proxy url")?;
        let host = url.host_str().context("Proxy url has no host")?;
        let port = url
            .port_or_known_default()
            .context("Proxy url has no port")?;

        Ok(format!("{}:{}", host, port))
    }
}
