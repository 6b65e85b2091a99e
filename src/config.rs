use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration loaded from rta-runner.toml.
///
/// The config file is optional: both client binaries default to the current
/// working directory, matching how the runner is normally used next to a
/// freshly built wallet/POS pair.
#[derive(Debug, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct RunnerConfig {
    pub wallet: WalletConfig,
    pub pos: PosConfig,
    pub handshake: HandshakeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub command: String,
    /// `{wallet-path}` is replaced with the CLI-supplied wallet path.
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PosConfig {
    pub command: String,
    /// `{wallet-address}` is replaced with the CLI-supplied POS wallet address.
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct HandshakeConfig {
    /// How long the wallet waits for "Sale initiated" before giving up.
    /// Unset = wait forever (original runner behavior).
    pub timeout_secs: Option<u64>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            command: "./rta-wallet-cli".to_string(),
            args: vec!["--wallet-path".to_string(), "{wallet-path}".to_string()],
        }
    }
}

impl Default for PosConfig {
    fn default() -> Self {
        Self {
            command: "./rta-pos-cli".to_string(),
            args: vec![
                "--wallet-address".to_string(),
                "{wallet-address}".to_string(),
            ],
        }
    }
}

impl HandshakeConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

/// Load configuration from a TOML file.
///
/// A missing file yields the defaults; any other read failure or a parse
/// failure is an error.
pub fn load(path: &Path) -> Result<RunnerConfig, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(RunnerConfig::default());
        }
        Err(e) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}
