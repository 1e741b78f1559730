//! Credential context and on-disk token storage.
//!
//! The token is handed around as an explicit [`AuthContext`] value; nothing
//! here keeps process-wide state. Stored at `${LUMO_HOME}/auth.json` with
//! 0600 permissions on unix.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lumo_types::{AuthSession, User};
use serde::{Deserialize, Serialize};

use crate::config::paths;

/// Paths that must never carry a bearer token.
const UNAUTHENTICATED_PATHS: &[&str] = &["/api/auth/login", "/api/auth/register"];

/// Credentials attached to outgoing requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    token: Option<String>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            token: (!token.trim().is_empty()).then_some(token),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Token to attach for a request to `path`, if any.
    pub fn bearer_for(&self, path: &str) -> Option<&str> {
        if UNAUTHENTICATED_PATHS.contains(&path) {
            return None;
        }
        self.token()
    }
}

/// Login state persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAuth {
    pub token: String,
    pub user: User,
}

impl From<AuthSession> for StoredAuth {
    fn from(session: AuthSession) -> Self {
        Self {
            token: session.token,
            user: session.user,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthStore {
    path: PathBuf,
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::at(paths::auth_path())
    }
}

impl AuthStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored login, if any.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<StoredAuth>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credentials from {}", self.path.display()))?;
        let stored = serde_json::from_str(&contents).with_context(|| {
            format!("Failed to parse credentials from {}", self.path.display())
        })?;
        Ok(Some(stored))
    }

    /// Returns the context for the stored token, or an anonymous one.
    ///
    /// # Errors
    /// Returns an error if the credentials file is unreadable.
    pub fn context(&self) -> Result<AuthContext> {
        Ok(self
            .load()?
            .map_or_else(AuthContext::anonymous, |s| AuthContext::with_token(s.token)))
    }

    /// Writes the login atomically with restricted permissions.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, auth: &StoredAuth) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(auth).context("Failed to serialize credentials")?;
        let tmp_path = self.path.with_extension("json.tmp");

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&tmp_path)
            .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;

        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                self.path.display()
            )
        })
    }

    /// Removes the stored login. Returns whether one existed.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        Ok(true)
    }
}

/// Masks a token for display (first 8 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 12 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}...")
}
