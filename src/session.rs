//! Persisted login session (bearer token and user name).

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Environment variable that overrides the stored token
pub const TOKEN_ENV: &str = "CRMDESK_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub token: String,
  #[serde(default)]
  pub user: Option<String>,
}

/// File-backed session store shared by every API client clone
#[derive(Debug, Clone)]
pub struct SessionStore {
  path: PathBuf,
  current: Arc<RwLock<Option<Session>>>,
}

impl SessionStore {
  /// Open the store at the default location, honouring `CRMDESK_TOKEN`
  pub fn open_default() -> Result<Self> {
    let store = Self::open(Self::default_path()?)?;

    if let Ok(token) = std::env::var(TOKEN_ENV) {
      if !token.trim().is_empty() {
        let mut current = store.current.write().map_err(|e| eyre!("Lock poisoned: {}", e))?;
        *current = Some(Session {
          token: token.trim().to_string(),
          user: None,
        });
      }
    }

    Ok(store)
  }

  /// Open the store at an explicit path, loading any saved session
  pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
    let path = path.into();
    let session = if path.exists() {
      let contents = std::fs::read_to_string(&path)
        .map_err(|e| eyre!("Failed to read session file {}: {}", path.display(), e))?;
      match serde_json::from_str::<Session>(&contents) {
        Ok(session) => Some(session),
        Err(e) => {
          tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable session file");
          None
        }
      }
    } else {
      None
    };

    Ok(Self {
      path,
      current: Arc::new(RwLock::new(session)),
    })
  }

  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("crmdesk").join("session.json"))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Current bearer token, if logged in
  pub fn token(&self) -> Option<String> {
    self
      .current
      .read()
      .ok()
      .and_then(|s| s.as_ref().map(|s| s.token.clone()))
  }

  pub fn user(&self) -> Option<String> {
    self
      .current
      .read()
      .ok()
      .and_then(|s| s.as_ref().and_then(|s| s.user.clone()))
  }

  pub fn is_logged_in(&self) -> bool {
    self.token().is_some()
  }

  /// Persist a new session
  pub fn save(&self, token: impl Into<String>, user: Option<String>) -> Result<()> {
    let session = Session {
      token: token.into(),
      user,
    };

    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create session directory: {}", e))?;
    }
    let data = serde_json::to_vec_pretty(&session)?;
    std::fs::write(&self.path, data)
      .map_err(|e| eyre!("Failed to write session file {}: {}", self.path.display(), e))?;

    let mut current = self.current.write().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *current = Some(session);
    Ok(())
  }

  /// Forget the session in memory and on disk
  pub fn clear(&self) -> Result<()> {
    {
      let mut current = self.current.write().map_err(|e| eyre!("Lock poisoned: {}", e))?;
      *current = None;
    }

    match std::fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(eyre!(
        "Failed to remove session file {}: {}",
        self.path.display(),
        e
      )),
    }
  }
}
