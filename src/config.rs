//! Provider configuration.
//!
//! [`ProviderConfig`] is the per-provider option set consumed by
//! `create_client`. It can be built in code or read from TOML.
//!
//! ## Config file (XDG)
//! `levitate-llm/providers.toml` is looked up in:
//! - System: `$XDG_CONFIG_DIRS/levitate-llm/providers.toml` (default `/etc/xdg/...`)
//! - User: `$XDG_CONFIG_HOME/levitate-llm/providers.toml` (default `~/.config/...`)
//!
//! Later files are merged over earlier ones, table by table.
//!
//! ```toml
//! default_provider = "claude_cli"
//! workspace_root = "/srv/agent"
//!
//! [providers.claude_cli]
//! model = "sonnet"
//! timeout = 900
//! allowed_tools = ["Read", "Edit"]
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

const CONFIG_DIR_NAME: &str = "levitate-llm";
const CONFIG_FILE_NAME: &str = "providers.toml";

/// How the child process reports its answer on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    #[serde(alias = "stream-json")]
    Jsonl,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Jsonl => "jsonl",
        }
    }
}

/// How the combined prompt reaches the child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptDelivery {
    /// Written to stdin, which is then closed.
    Stdin,
    /// Staged in a temp file whose content becomes the last argv entry.
    ///
    /// Still subject to the platform's argument length limit.
    #[serde(alias = "file")]
    TempFileArgument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Executable name or path; defaults to the provider's command name.
    pub bin: Option<String>,
    /// Seconds before the child is killed.
    pub timeout: u64,
    pub working_directory: Option<PathBuf>,
    pub skip_permissions: bool,
    pub permission_mode: Option<String>,
    pub sandbox: Option<String>,
    pub full_auto: bool,
    pub output_format: OutputFormat,
    #[serde(alias = "allowedTools")]
    pub allowed_tools: Vec<String>,
    #[serde(alias = "disallowedTools")]
    pub disallowed_tools: Vec<String>,
    #[serde(alias = "model")]
    pub model_override: Option<String>,
    pub verbose: bool,
    /// Appended to argv as-is.
    pub extra_args: Vec<String>,
    pub debug: bool,
    /// Overrides the provider's native delivery strategy.
    pub prompt_delivery: Option<PromptDelivery>,
    /// Where prompt files are staged; defaults to the platform temp dir.
    pub temp_dir: Option<PathBuf>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            bin: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            working_directory: None,
            skip_permissions: false,
            permission_mode: None,
            sandbox: None,
            full_auto: false,
            output_format: OutputFormat::Text,
            allowed_tools: Vec::new(),
            disallowed_tools: Vec::new(),
            model_override: None,
            verbose: false,
            extra_args: Vec::new(),
            debug: false,
            prompt_delivery: None,
            temp_dir: None,
        }
    }
}

/// Contents of the merged `providers.toml` files.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub default_provider: Option<String>,
    pub workspace_root: Option<PathBuf>,
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl Settings {
    /// Load from `explicit` if given, else from the XDG search path.
    ///
    /// Missing files are not an error; every option has a default.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from(&[path.to_path_buf()]),
            None => Self::load_from(&find_config_files()),
        }
    }

    pub fn load_from(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut merged = toml::Table::new();
        for path in paths {
            if !path.exists() {
                continue;
            }
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let table = toml::from_str::<toml::Table>(&text).map_err(|source| {
                ConfigError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;
            merge_tables(&mut merged, table);
        }
        Self::from_table(merged)
    }

    fn from_table(mut table: toml::Table) -> Result<Self, ConfigError> {
        let default_provider = table
            .remove("default_provider")
            .and_then(|v| v.as_str().map(str::to_owned));
        let workspace_root = table
            .remove("workspace_root")
            .and_then(|v| v.as_str().map(PathBuf::from));

        let mut providers = BTreeMap::new();
        if let Some(toml::Value::Table(entries)) = table.remove("providers") {
            for (key, value) in entries {
                let cfg = value
                    .try_into::<ProviderConfig>()
                    .map_err(|source| ConfigError::Provider {
                        key: key.clone(),
                        source,
                    })?;
                providers.insert(key, cfg);
            }
        }

        Ok(Self {
            default_provider,
            workspace_root,
            providers,
        })
    }

    /// Settings for `key`, or defaults when the file has none.
    pub fn provider(&self, key: &str) -> ProviderConfig {
        self.providers.get(key).cloned().unwrap_or_default()
    }
}

fn merge_tables(dst: &mut toml::Table, src: toml::Table) {
    for (key, value) in src {
        match (dst.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                dst.insert(key, value);
            }
        }
    }
}

fn split_xdg_config_dirs() -> Vec<PathBuf> {
    let raw = std::env::var("XDG_CONFIG_DIRS").unwrap_or_else(|_| "/etc/xdg".to_owned());
    raw.split(':')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn xdg_config_home() -> PathBuf {
    if let Ok(raw) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".").join(".config"))
}

/// Candidate config files, lowest precedence first.
pub fn find_config_files() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = split_xdg_config_dirs()
        .into_iter()
        .rev()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .collect();
    paths.push(
        xdg_config_home()
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME),
    );
    paths
}
