// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session credential files.
//!
//! Each session's opaque credential blob lives at `{auth_dir}/{session_id}.creds`.
//! Writes go through a temp file and a rename so a crash never leaves a
//! half-written blob behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use jobcast_core::types::Credentials;
use jobcast_core::JobcastError;
use tracing::debug;

const EXTENSION: &str = "creds";

fn io_err(e: std::io::Error) -> JobcastError {
    JobcastError::Storage {
        source: Box::new(e),
    }
}

/// Stores transport credentials on disk, one file per session.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.{EXTENSION}"))
    }

    /// Loads the stored credentials for a session, if any.
    pub async fn load(&self, session_id: &str) -> Result<Option<Credentials>, JobcastError> {
        match tokio::fs::read(self.path_for(session_id)).await {
            Ok(bytes) => Ok(Some(Credentials(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(e)),
        }
    }

    /// Persists credentials, replacing any previous blob.
    pub async fn save(&self, session_id: &str, credentials: &Credentials) -> Result<(), JobcastError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;
        let path = self.path_for(session_id);
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        tokio::fs::write(&tmp, &credentials.0).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_err)?;
        debug!(session_id, "credentials saved");
        Ok(())
    }

    /// Deletes a session's credentials. Missing files are not an error.
    pub async fn remove(&self, session_id: &str) -> Result<(), JobcastError> {
        match tokio::fs::remove_file(self.path_for(session_id)).await {
            Ok(()) => {
                debug!(session_id, "credentials removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(e)),
        }
    }

    /// Lists the ids of every session with stored credentials, sorted.
    pub async fn list_sessions(&self) -> Result<Vec<String>, JobcastError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
