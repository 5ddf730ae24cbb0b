use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

use crate::crypto::KdfParams;
use crate::inbox::DEFAULT_MIN_MESSAGE_LEN;
use crate::storage::Storage;

const STORE_FILE: &str = "cipherchat.json";

#[derive(Debug, Clone)]
pub struct Config {
    store_path: PathBuf,
    min_message_len: usize,
    kdf: KdfParams,
}

impl Config {
    pub fn new(store_path: PathBuf) -> Self {
        Self {
            store_path,
            min_message_len: DEFAULT_MIN_MESSAGE_LEN,
            kdf: KdfParams::default(),
        }
    }

    /// Uses `store_path` when given, otherwise the platform data directory.
    pub fn resolve(store_path: Option<PathBuf>) -> Result<Self> {
        match store_path {
            Some(p) => Ok(Self::new(p)),
            None => Ok(Self::new(default_store_path()?)),
        }
    }

    pub fn with_min_message_len(mut self, min_message_len: usize) -> Self {
        self.min_message_len = min_message_len;
        self
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn store_path(&self) -> &PathBuf {
        &self.store_path
    }

    pub fn min_message_len(&self) -> usize {
        self.min_message_len
    }

    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }

    pub fn storage(&self) -> Storage {
        Storage::new(self.store_path.clone())
    }
}

pub fn default_store_path() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "cipherchat")
        .context("could not determine platform directories")?;

    Ok(project_dirs.data_dir().join(STORE_FILE))
}
