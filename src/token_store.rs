//! On-disk storage for user OAuth2 tokens.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DriveError, Result};
use crate::models::TokenResponse;

/// Directory under the home directory holding stored credentials.
const CREDENTIAL_DIR: &str = ".credentials";

/// File name of the stored credentials.
const CREDENTIAL_FILE: &str = "drive-exporter.json";

/// Tokens persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry as Unix seconds.
    pub expires_at: u64,
    #[serde(default)]
    pub scope: Option<String>,
}

impl StoredCredentials {
    /// Build from a token endpoint response, keeping `previous_refresh` when
    /// the response carries no refresh token.
    pub fn from_response(response: TokenResponse, previous_refresh: Option<String>) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh),
            expires_at: unix_now() + response.expires_in,
            scope: response.scope,
        }
    }

    pub fn expires_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.expires_at)
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// JSON file holding [`StoredCredentials`].
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.credentials/drive-exporter.json`.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            DriveError::AuthenticationError("Could not determine home directory".to_string())
        })?;
        Ok(home.join(CREDENTIAL_DIR).join(CREDENTIAL_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load stored credentials, `None` when nothing has been stored yet.
    pub fn load(&self) -> Result<Option<StoredCredentials>> {
        if !self.path.exists() {
            debug!("No stored credentials at {}", self.path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let credentials = serde_json::from_str(&content)?;
        Ok(Some(credentials))
    }

    pub fn save(&self, credentials: &StoredCredentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DriveError::filesystem(parent, e))?;
            }
        }

        let content = serde_json::to_string_pretty(credentials)?;
        let mut file = open_private(&self.path).map_err(|e| DriveError::filesystem(&self.path, e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| DriveError::filesystem(&self.path, e))?;

        info!("Storing credentials to {}", self.path.display());
        Ok(())
    }
}

/// Open `path` for writing, readable by the owner only.
fn open_private(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        options.mode(0o600);
        let file = options.open(path)?;
        // mode only applies on creation
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        Ok(file)
    }

    #[cfg(not(unix))]
    {
        options.open(path)
    }
}
