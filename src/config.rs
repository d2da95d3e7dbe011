use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure for cipanel.
///
/// Lets users pin the external CLI and panel settings instead of repeating
/// flags. Configuration files are loaded from the current directory, the
/// user config directory, or a specified path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// External pipeline CLI settings
    #[serde(default)]
    pub cli: CliConfig,

    /// Tree panel settings
    #[serde(default)]
    pub view: ViewConfig,

    /// Watch event source settings
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CliConfig {
    /// Program name of the external pipeline CLI
    #[serde(default = "default_cli_program")]
    pub program: String,

    /// Cluster namespace passed through to the CLI, when set
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ViewConfig {
    /// Scheme prefix of identity resources handed to the host
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Re-render the tree after every applied watch event
    #[serde(default)]
    pub live: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WatchConfig {
    /// NDJSON event file read by `cipanel watch` when no --file is given
    pub events_file: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            program: default_cli_program(),
            namespace: None,
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            live: false,
        }
    }
}

fn default_cli_program() -> String {
    "jx".to_string()
}

fn default_scheme() -> String {
    "cipanel".to_string()
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./cipanel.toml
    /// 3. ./cipanel.json
    /// 4. ./cipanel.yaml
    /// 5. ./cipanel.yml
    /// 6. <user config dir>/cipanel/config.toml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        // Try common configuration file names
        let candidates = ["cipanel.toml", "cipanel.json", "cipanel.yaml", "cipanel.yml"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(path) = Self::user_config_path() {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        // No config file found, return defaults
        Ok(Self::default())
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cipanel").join("config.toml"))
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension {
            "toml" => {
                toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
            }
            "json" => {
                serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
            }
            "yaml" | "yml" => {
                serde_yaml::from_str(&contents)
                    .with_context(|| format!("Failed to parse YAML config: {}", path.display()))
            }
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml") | Some("yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
