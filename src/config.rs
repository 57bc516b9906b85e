use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Resource opened on startup (defaults to the first configured resource)
  pub default_resource: Option<String>,
  /// Custom title for header (defaults to API host if not set)
  pub title: Option<String>,
  /// Rows per page unless a resource overrides it
  #[serde(default = "default_page_size")]
  pub page_size: u32,
  #[serde(default)]
  pub search: SearchConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default, deserialize_with = "deserialize_lowercase_map")]
  pub resources: BTreeMap<String, ResourceConfig>,
}

fn default_page_size() -> u32 {
  10
}

fn deserialize_lowercase_map<'de, D>(
  deserializer: D,
) -> Result<BTreeMap<String, ResourceConfig>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let m: BTreeMap<String, ResourceConfig> = BTreeMap::deserialize(deserializer)?;
  Ok(m.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect())
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub base_url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  120
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
  /// Keystrokes are coalesced until input has been stable this long
  #[serde(default = "default_debounce_ms")]
  pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
  500
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self {
      debounce_ms: default_debounce_ms(),
    }
  }
}

impl SearchConfig {
  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.debounce_ms)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Keep pages in SQLite across restarts instead of in memory
  #[serde(default)]
  pub persist: bool,
  /// 0 disables expiry, as does anything too large to represent
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,
  #[serde(default = "default_max_entries")]
  pub max_entries: usize,
}

fn default_true() -> bool {
  true
}

fn default_ttl_secs() -> u64 {
  300
}

fn default_max_entries() -> usize {
  256
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      persist: false,
      ttl_secs: default_ttl_secs(),
      max_entries: default_max_entries(),
    }
  }
}

impl CacheConfig {
  pub fn ttl(&self) -> Option<chrono::Duration> {
    if self.ttl_secs == 0 {
      return None;
    }
    i64::try_from(self.ttl_secs)
      .ok()
      .and_then(chrono::Duration::try_seconds)
  }
}

/// A listing endpoint exposed as a browsable resource
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
  /// Listing path relative to the API base URL (e.g. "/brands")
  pub endpoint: String,
  /// Columns to show; empty means "keys of the first record"
  #[serde(default)]
  pub columns: Vec<String>,
  /// Fixed filters appended to every listing request
  #[serde(default)]
  pub query: BTreeMap<String, String>,
  pub page_size: Option<u32>,
  /// Field holding the record id, used to build update/delete paths
  #[serde(default = "default_id_field")]
  pub id_field: String,
  pub description: Option<String>,
}

fn default_id_field() -> String {
  "id".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./crmdesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/crmdesk/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/crmdesk/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("crmdesk.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("crmdesk").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.page_size == 0 {
      return Err(eyre!("page_size must be at least 1"));
    }
    Ok(config)
  }

  /// Look up a resource by (case-insensitive) name
  pub fn resource(&self, name: &str) -> Result<&ResourceConfig> {
    self.resources.get(&name.to_lowercase()).ok_or_else(|| {
      let known: Vec<&str> = self.resources.keys().map(String::as_str).collect();
      eyre!("Unknown resource '{}'. Known: {}", name, known.join(", "))
    })
  }

  /// Name of the resource to open on startup
  pub fn startup_resource(&self) -> Option<String> {
    self
      .default_resource
      .as_ref()
      .map(|r| r.to_lowercase())
      .filter(|r| self.resources.contains_key(r))
      .or_else(|| self.resources.keys().next().cloned())
  }

  /// Effective page size for a resource
  pub fn page_size_for(&self, resource: &ResourceConfig) -> u32 {
    resource.page_size.filter(|n| *n > 0).unwrap_or(self.page_size)
  }
}
