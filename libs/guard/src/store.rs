//! Ban file persistence
//!
//! The whole ban state is stored as a single JSON document which is read once
//! at startup and rewritten after every change.

use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{GuardError, GuardResult};
use crate::state::BanState;

/// JSON file holding the ban state
#[derive(Debug, Clone)]
pub struct BanFile {
    path: PathBuf,
}

impl BanFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the persisted state
    ///
    /// A missing, unreadable or malformed file yields an empty state: a cold
    /// start must never keep the login flow from working.
    pub async fn load(&self) -> BanState {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No ban file at {}, starting clean", self.path.display());
                return BanState::default();
            }
            Err(e) => {
                warn!(
                    "Failed to read ban file {}: {}, starting clean",
                    self.path.display(),
                    e
                );
                return BanState::default();
            }
        };

        match serde_json::from_str::<BanState>(&contents) {
            Ok(state) => {
                info!(
                    "Loaded ban state from {} ({} failure records, {} bans)",
                    self.path.display(),
                    state.failures.len(),
                    state.bans.len()
                );
                state
            }
            Err(e) => {
                warn!(
                    "Discarding malformed ban file {}: {}",
                    self.path.display(),
                    e
                );
                BanState::default()
            }
        }
    }

    /// Rewrite the file with `state`
    ///
    /// The document goes to a sibling temporary file first and is then
    /// renamed over the previous one.
    pub async fn save(&self, state: &BanState) -> GuardResult<()> {
        let contents = serde_json::to_string_pretty(state).map_err(GuardError::Serialize)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.persist_error(e))?;
        }

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, contents)
            .await
            .map_err(|e| self.persist_error(e))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
                warn!(
                    "Failed to remove {}: {}",
                    tmp_path.display(),
                    cleanup
                );
            }
            return Err(self.persist_error(e));
        }

        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ipbans".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persist_error(&self, source: std::io::Error) -> GuardError {
        GuardError::Persist {
            path: self.path.clone(),
            source,
        }
    }
}
