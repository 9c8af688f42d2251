//! Application configuration for annorelay.
//!
//! User config lives at `~/.annorelay/annorelay.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AnnoRelayError, Result};
use crate::types::ColorBucket;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "annorelay.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".annorelay";

/// Discord's per-message character limit, the tightest of the delivery targets.
pub const DEFAULT_MAX_LENGTH: usize = 2000;

// ---------------------------------------------------------------------------
// Config structs (matching annorelay.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backing Zotero database.
    #[serde(default)]
    pub store: StoreSection,

    /// Highlight color classification.
    #[serde(default)]
    pub classifier: ClassifierSection,

    /// Chat delivery payload shaping.
    #[serde(default)]
    pub delivery: DeliverySection,

    /// Spreadsheet row shaping.
    #[serde(default)]
    pub sheet: SheetSection,
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    /// Path to `zotero.sqlite`. A leading `~` expands to the home directory.
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> String {
    "~/Zotero/zotero.sqlite".into()
}

/// Which base policy turns a color into a bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierPolicy {
    /// Exact lookup against Zotero's default highlight colors.
    #[default]
    Exact,
    /// Dominant-channel thresholds, for colors that are not Zotero defaults.
    Heuristic,
}

/// Where Zotero's red/orange highlight lands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedHighlight {
    /// Red stays red and counts as limitations.
    #[default]
    Limitations,
    /// Red is remapped to yellow and counts as methods.
    Methods,
}

/// `[classifier]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierSection {
    #[serde(default)]
    pub policy: ClassifierPolicy,

    #[serde(default)]
    pub red_bucket: RedHighlight,

    /// Additional `hex -> bucket` entries, e.g. `"#f19837" = "yellow"`.
    #[serde(default)]
    pub extra_colors: BTreeMap<String, ColorBucket>,
}

/// How an entry longer than `max_length` is delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OversizePolicy {
    /// Emit the entry alone in an over-long segment.
    #[default]
    Isolate,
    /// Cut the entry to fit and append an ellipsis.
    Truncate,
}

/// `[delivery]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverySection {
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    #[serde(default)]
    pub oversize: OversizePolicy,

    /// Placed between numbered entries inside one segment.
    #[serde(default = "default_entry_separator")]
    pub entry_separator: String,
}

impl Default for DeliverySection {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            oversize: OversizePolicy::default(),
            entry_separator: default_entry_separator(),
        }
    }
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}
fn default_entry_separator() -> String {
    "\n".into()
}

/// `[sheet]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetSection {
    /// Placed between entries of one category cell.
    #[serde(default = "default_block_separator")]
    pub block_separator: String,
}

impl Default for SheetSection {
    fn default() -> Self {
        Self {
            block_separator: default_block_separator(),
        }
    }
}

fn default_block_separator() -> String {
    "\n\n".into()
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime classifier configuration.
#[derive(Debug, Clone, Default)]
pub struct ClassifierConfig {
    pub policy: ClassifierPolicy,
    pub red_bucket: RedHighlight,
    pub extra_colors: BTreeMap<String, ColorBucket>,
}

impl From<&AppConfig> for ClassifierConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            policy: config.classifier.policy,
            red_bucket: config.classifier.red_bucket,
            extra_colors: config.classifier.extra_colors.clone(),
        }
    }
}

/// Runtime delivery configuration.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub max_length: usize,
    pub oversize: OversizePolicy,
    pub entry_separator: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for DeliveryConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_length: config.delivery.max_length,
            oversize: config.delivery.oversize,
            entry_separator: config.delivery.entry_separator.clone(),
        }
    }
}

/// Runtime spreadsheet row configuration.
#[derive(Debug, Clone)]
pub struct SheetConfig {
    pub block_separator: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SheetConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            block_separator: config.sheet.block_separator.clone(),
        }
    }
}

impl AppConfig {
    /// Resolved store path with `~` expanded.
    pub fn store_path(&self) -> Result<PathBuf> {
        expand_home(&self.store.path)
    }

    /// Reject values that would make the pipeline misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.store.path.trim().is_empty() {
            return Err(AnnoRelayError::config("store.path must not be empty"));
        }
        if self.delivery.max_length == 0 {
            return Err(AnnoRelayError::config("delivery.max_length must be positive"));
        }
        for hex in self.classifier.extra_colors.keys() {
            if !looks_like_hex(hex) {
                return Err(AnnoRelayError::config(format!(
                    "classifier.extra_colors key '{hex}' is not a #rgb or #rrggbb color"
                )));
            }
        }
        Ok(())
    }
}

fn looks_like_hex(s: &str) -> bool {
    let digits = s.strip_prefix('#').unwrap_or(s);
    matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// Expand a leading `~` or `~/` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => rest,
        _ => return Ok(PathBuf::from(path)),
    };
    let home = dirs::home_dir()
        .ok_or_else(|| AnnoRelayError::config("could not determine home directory"))?;
    let rest = rest.trim_start_matches(['/', '\\']);
    Ok(if rest.is_empty() { home } else { home.join(rest) })
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.annorelay/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AnnoRelayError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.annorelay/annorelay.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AnnoRelayError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        AnnoRelayError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AnnoRelayError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AnnoRelayError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AnnoRelayError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("zotero.sqlite"));
        assert!(toml_str.contains("max_length = 2000"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.delivery.max_length, DEFAULT_MAX_LENGTH);
        assert_eq!(parsed.classifier.policy, ClassifierPolicy::Exact);
        assert_eq!(parsed.classifier.red_bucket, RedHighlight::Limitations);
    }

    #[test]
    fn config_with_classifier_overrides() {
        let toml_str = r##"
[store]
path = "/data/zotero.sqlite"

[classifier]
policy = "heuristic"
red_bucket = "methods"

[classifier.extra_colors]
"#f19837" = "yellow"

[delivery]
max_length = 1024
oversize = "truncate"
"##;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        config.validate().expect("valid");
        assert_eq!(config.classifier.policy, ClassifierPolicy::Heuristic);
        assert_eq!(config.classifier.red_bucket, RedHighlight::Methods);
        assert_eq!(
            config.classifier.extra_colors.get("#f19837"),
            Some(&ColorBucket::Yellow)
        );

        let delivery = DeliveryConfig::from(&config);
        assert_eq!(delivery.max_length, 1024);
        assert_eq!(delivery.oversize, OversizePolicy::Truncate);
        assert_eq!(delivery.entry_separator, "\n");
        assert_eq!(
            config.store_path().expect("path"),
            PathBuf::from("/data/zotero.sqlite")
        );
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.delivery.max_length = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config
            .classifier
            .extra_colors
            .insert("orange".into(), ColorBucket::Yellow);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("orange"));
    }

    #[test]
    fn home_expansion() {
        let expanded = expand_home("~/Zotero/zotero.sqlite").expect("expand");
        assert!(expanded.ends_with("Zotero/zotero.sqlite"));
        assert!(!expanded.starts_with("~"));

        assert_eq!(
            expand_home("~other/db").expect("no expansion"),
            PathBuf::from("~other/db")
        );
    }
}
