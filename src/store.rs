use std::path::{Path, PathBuf};
use std::{fs, io};

use anyhow::Context;
use tracing::{debug, warn};

use crate::Result;
use crate::atomic::write_atomic;

/// File extension of persisted transcripts.
pub const TRANSCRIPT_EXTENSION: &str = "txt";

/// Outcome of [`TranscriptStore::save_if_needed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(PathBuf),
    Skipped(PathBuf),
}

/// Durable transcript sink: one `{stem}.txt` per source image.
///
/// The directory itself is the state; a transcript's presence is the only record that an
/// image has been processed.
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the transcript directory (and parents) if missing.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("failed to create transcript dir: {}", self.dir.display())
        })?;
        Ok(())
    }

    pub fn path_for(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.{TRANSCRIPT_EXTENSION}"))
    }

    pub fn exists(&self, stem: &str) -> bool {
        self.path_for(stem).is_file()
    }

    /// Persist `text` as the transcript for `stem`.
    ///
    /// Without `force`, an existing transcript is left untouched and reported as skipped.
    pub fn save_if_needed(&self, stem: &str, text: &str, force: bool) -> Result<SaveOutcome> {
        self.ensure_dir()?;

        let path = self.path_for(stem);
        if !force && path.is_file() {
            debug!(stem, "transcript exists, not overwriting");
            return Ok(SaveOutcome::Skipped(path));
        }

        write_atomic(&path, text.as_bytes())?;
        Ok(SaveOutcome::Saved(path))
    }

    /// All transcript files, sorted by file name. A missing directory yields none.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read transcript dir: {}", self.dir.display()))?;

        Ok(transcript_paths(entries.map(|e| e.map(|e| e.path()))))
    }
}

/// The `*.txt` files among `entries`, sorted. Entries that cannot be read are logged and
/// left out.
fn transcript_paths(entries: impl IntoIterator<Item = io::Result<PathBuf>>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                warn!(error = %err, "skipping unreadable transcript entry");
                continue;
            }
        };
        let is_transcript = path
            .extension()
            .is_some_and(|ext| ext == TRANSCRIPT_EXTENSION);
        if is_transcript && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    paths
}
