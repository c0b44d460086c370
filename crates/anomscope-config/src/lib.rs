use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anomscope_core::{DEFAULT_TOP_LIMIT, SemanticRole, TOP_LIMITS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ANOMSCOPE_DIR_NAME: &str = ".anomscope";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_BODY_PREFIX_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScopeConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL or local directory holding the exported JSON files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default = "default_body_prefix_chars")]
    pub body_prefix_chars: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            location: None,
            body_prefix_chars: DEFAULT_BODY_PREFIX_CHARS,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SchemaConfig {
    /// Extra field-name candidates per role, tried after the built-in list.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl SchemaConfig {
    pub fn extra_aliases(&self, role: SemanticRole) -> &[String] {
        self.aliases
            .get(role.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to serialize config TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub fn anomscope_dir(workspace_root: impl AsRef<Path>) -> PathBuf {
    workspace_root.as_ref().join(ANOMSCOPE_DIR_NAME)
}

pub fn config_path(workspace_root: impl AsRef<Path>) -> PathBuf {
    anomscope_dir(workspace_root).join(CONFIG_FILE_NAME)
}

pub fn load_workspace_config(workspace_root: impl AsRef<Path>) -> Result<ScopeConfig, ConfigError> {
    let path = config_path(workspace_root);
    if !path.exists() {
        return Ok(ScopeConfig::default());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: ScopeConfig = toml::from_str(&raw)?;
    Ok(normalize_config(parsed))
}

pub fn ensure_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<ScopeConfig, ConfigError> {
    let workspace_root = workspace_root.as_ref();
    fs::create_dir_all(anomscope_dir(workspace_root))?;

    let path = config_path(workspace_root);
    if path.exists() {
        return load_workspace_config(workspace_root);
    }

    let config = ScopeConfig::default();
    let content = toml::to_string_pretty(&config)?;
    fs::write(path, content)?;

    Ok(config)
}

pub fn validate_config(config: &ScopeConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    if !TOP_LIMITS.contains(&config.view.default_limit) {
        warnings.push(ConfigWarning {
            code: "view.default_limit",
            message: format!(
                "default_limit {} is not one of {:?}; using {DEFAULT_TOP_LIMIT}",
                config.view.default_limit, TOP_LIMITS
            ),
        });
    }

    for role in config.schema.aliases.keys() {
        if role.parse::<SemanticRole>().is_err() {
            warnings.push(ConfigWarning {
                code: "schema.aliases",
                message: format!("aliases for unknown role '{role}' are ignored"),
            });
        }
    }

    warnings
}

fn default_body_prefix_chars() -> usize {
    DEFAULT_BODY_PREFIX_CHARS
}

fn default_limit() -> u32 {
    DEFAULT_TOP_LIMIT
}

fn normalize_optional(input: Option<String>) -> Option<String> {
    input
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn normalize_config(mut config: ScopeConfig) -> ScopeConfig {
    config.source.location = normalize_optional(config.source.location.take());
    if config.source.body_prefix_chars == 0 {
        config.source.body_prefix_chars = DEFAULT_BODY_PREFIX_CHARS;
    }
    config.source.timeout_secs = config.source.timeout_secs.filter(|secs| *secs > 0);

    for candidates in config.schema.aliases.values_mut() {
        candidates.retain(|candidate| !candidate.trim().is_empty());
        for candidate in candidates.iter_mut() {
            *candidate = candidate.trim().to_owned();
        }
    }
    config
        .schema
        .aliases
        .retain(|_, candidates| !candidates.is_empty());

    config
}
