//! Persistent credential store
//!
//! Holds the single access-token key under the application state directory,
//! standing in for the device's NVS preferences namespace. The token is
//! opaque pass-through; no validation of its contents happens here.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Filename for the persisted access token
const TOKEN_FILE: &str = "access_token";

pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Open (creating the directory if needed) the store rooted at `dir`
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(TOKEN_FILE),
        })
    }

    /// True iff a non-empty token is persisted
    pub fn has_token(&self) -> bool {
        !self.load().is_empty()
    }

    /// Overwrite the persisted token
    pub fn save(&self, token: &str) -> Result<(), StorageError> {
        fs::write(&self.path, token)?;
        tracing::debug!("Access token persisted");
        Ok(())
    }

    /// Returns the persisted token, or an empty string when none exists
    pub fn load(&self) -> String {
        fs::read_to_string(&self.path).unwrap_or_default()
    }
}
