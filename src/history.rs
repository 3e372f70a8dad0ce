// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Persist console command history between sessions.
// Author: Lukas Bower

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use rustyline::error::ReadlineError;
use rustyline::history::{FileHistory, History};

/// Maximum number of entries retained on disk.
pub const DEFAULT_HISTORY_LEN: usize = 10_000;

/// File name of the history file inside the home directory.
pub const HISTORY_FILE_NAME: &str = ".proxysh-history";

/// Location and length cap of the history file.
///
/// The file is read and written by the line editor's own history, so its format
/// is whatever rustyline serializes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStore {
    path: PathBuf,
    max_len: usize,
}

impl HistoryStore {
    /// Store history at `path`, retaining [`DEFAULT_HISTORY_LEN`] entries.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_len: DEFAULT_HISTORY_LEN,
        }
    }

    /// Override the number of retained entries.
    #[must_use]
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// `~/.proxysh-history`, when a home directory is known.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(HISTORY_FILE_NAME))
    }

    /// Location of the history file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries retained on save.
    #[must_use]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Cap `history` and append the stored entries to it. A missing file leaves
    /// it untouched.
    pub fn load_into(&self, history: &mut dyn History) -> Result<()> {
        history
            .set_max_len(self.max_len)
            .context("failed to cap history")?;
        match history.load(&self.path) {
            Ok(()) => {
                debug!(
                    "loaded {} history entries from {}",
                    history.len(),
                    self.path.display()
                );
                Ok(())
            }
            Err(ReadlineError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no history at {}", self.path.display());
                Ok(())
            }
            Err(err) => Err(err)
                .with_context(|| format!("failed to read history {}", self.path.display())),
        }
    }

    /// Write the most recent `max_len` entries of `history`, creating parent
    /// directories as needed.
    pub fn save_from(&self, history: &mut dyn History) -> Result<()> {
        history
            .set_max_len(self.max_len)
            .context("failed to cap history")?;
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        history
            .save(&self.path)
            .with_context(|| format!("failed to write history {}", self.path.display()))?;
        debug!(
            "saved {} history entries to {}",
            history.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Read the stored entries, oldest first.
    pub fn load(&self) -> Result<Vec<String>> {
        let mut history = session_history(self.max_len);
        self.load_into(&mut history)?;
        Ok(history.iter().cloned().collect())
    }
}

/// In-memory rustyline history holding at most `max_len` entries.
pub(crate) fn session_history(max_len: usize) -> FileHistory {
    let mut history = FileHistory::new();
    if let Err(err) = history.set_max_len(max_len) {
        warn!("history cap of {max_len} rejected: {err}");
    }
    history
}
