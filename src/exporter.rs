//! Join persisted transcripts back to their staged images and serialize the result.

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use crate::Result;
use crate::atomic::write_atomic;
use crate::csv_encoder::CsvEncoder;
use crate::extensions::{extension_priority, stem_of};
use crate::store::TranscriptStore;

/// Column order of the exported table.
pub const EXPORT_COLUMNS: [&str; 3] = ["original_file_name", "file_path", "transcript_text"];

/// `original_file_name` when no staged image matches a transcript.
pub const UNKNOWN_FILE_NAME: &str = "Unknown";

/// `file_path` when no staged image matches a transcript.
pub const MISSING_FILE_PATH: &str = "Not found";

/// One transcript joined to its source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    pub original_file_name: String,
    pub file_path: String,
    pub transcript_text: String,
}

/// Reads the transcript store and the staging directory; never writes to either.
pub struct Exporter {
    store: TranscriptStore,
    staging_dir: PathBuf,
}

impl Exporter {
    pub fn new(transcript_dir: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: TranscriptStore::new(transcript_dir),
            staging_dir: staging_dir.into(),
        }
    }

    /// Build one record per readable transcript, in transcript file-name order.
    ///
    /// Unreadable transcripts are logged and left out.
    pub fn collect(&self) -> Result<Vec<ExportRecord>> {
        let staged = StagedIndex::scan(&self.staging_dir)?;

        let mut records = Vec::new();
        for path in self.store.list()? {
            match build_record(&path, &staged) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping transcript");
                }
            }
        }
        Ok(records)
    }

    /// Collect and write all records to `w` as CSV. Returns the number of records written.
    pub fn export<W: Write>(&self, w: W) -> Result<usize> {
        let records = self.collect()?;
        write_csv(BufWriter::new(w), &records)?;
        Ok(records.len())
    }

    /// Export into a file at `path`.
    ///
    /// Records are collected and encoded before the file is touched, and the file is
    /// replaced atomically, so a failed export leaves any previous file as it was.
    pub fn export_to_path(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let records = self.collect()?;

        let mut encoded = Vec::new();
        write_csv(&mut encoded, &records)?;
        write_atomic(path, &encoded)
            .with_context(|| format!("failed to write export file: {}", path.display()))?;

        info!(count = records.len(), path = %path.display(), "exported transcripts");
        Ok(records.len())
    }
}

fn write_csv<W: Write>(w: W, records: &[ExportRecord]) -> Result<()> {
    let mut encoder = CsvEncoder::new(w);
    let run_res = records.iter().try_for_each(|r| encoder.write_record(r));
    let close_res = encoder.close();
    run_res.and(close_res)
}

fn build_record(transcript_path: &Path, staged: &StagedIndex) -> Result<ExportRecord> {
    let stem = transcript_path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("transcript name is not UTF-8: {}", transcript_path.display()))?;

    let transcript_text = fs::read_to_string(transcript_path)
        .with_context(|| format!("failed to read transcript: {}", transcript_path.display()))?;

    let (original_file_name, file_path) = match staged.find(stem) {
        Some(image) => (
            image
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(UNKNOWN_FILE_NAME)
                .to_owned(),
            image.display().to_string(),
        ),
        None => (UNKNOWN_FILE_NAME.to_owned(), MISSING_FILE_PATH.to_owned()),
    };

    Ok(ExportRecord {
        original_file_name,
        file_path,
        transcript_text,
    })
}

/// Staged images by stem, built from a single directory scan.
struct StagedIndex {
    by_stem: HashMap<String, Vec<(usize, PathBuf)>>,
}

impl StagedIndex {
    fn scan(staging_dir: &Path) -> Result<Self> {
        if !staging_dir.is_dir() {
            return Ok(Self::from_entries(std::iter::empty()));
        }

        let entries = fs::read_dir(staging_dir)
            .with_context(|| format!("failed to read staging dir: {}", staging_dir.display()))?;
        Ok(Self::from_entries(entries.map(|e| e.map(|e| e.path()))))
    }

    /// Index the image files among `entries`. Entries that cannot be read are logged and
    /// left out.
    fn from_entries(entries: impl IntoIterator<Item = io::Result<PathBuf>>) -> Self {
        let mut by_stem: HashMap<String, Vec<(usize, PathBuf)>> = HashMap::new();
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable staging entry");
                    continue;
                }
            };
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(priority) = extension_priority(name) else {
                continue;
            };
            if path.is_file() {
                by_stem
                    .entry(stem_of(name).to_owned())
                    .or_default()
                    .push((priority, path.clone()));
            }
        }
        Self { by_stem }
    }

    /// The staged image for `stem` with the most preferred extension.
    ///
    /// Ties (e.g. `a.PNG` and `a.png` on a case-sensitive filesystem) go to the
    /// lexicographically smaller path so the result does not depend on directory order.
    fn find(&self, stem: &str) -> Option<&Path> {
        self.by_stem
            .get(stem)?
            .iter()
            .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
            .map(|(_, path)| path.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_index_prefers_extension_order() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("abc.tiff"), b"x")?;
        fs::write(dir.path().join("abc.jpg"), b"x")?;
        fs::write(dir.path().join("abc.txt"), b"x")?;
        fs::write(dir.path().join("other.png"), b"x")?;

        let index = StagedIndex::scan(dir.path())?;
        assert_eq!(index.find("abc"), Some(dir.path().join("abc.jpg").as_path()));
        assert_eq!(index.find("zzz"), None);
        Ok(())
    }

    #[test]
    fn staged_index_matches_uppercase_extensions() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("scan.PNG"), b"x")?;

        let index = StagedIndex::scan(dir.path())?;
        assert_eq!(index.find("scan"), Some(dir.path().join("scan.PNG").as_path()));
        Ok(())
    }

    #[test]
    fn unreadable_staging_entry_is_skipped() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let good = dir.path().join("abc.png");
        fs::write(&good, b"x")?;

        let index = StagedIndex::from_entries([
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
            Ok(good.clone()),
        ]);
        assert_eq!(index.find("abc"), Some(good.as_path()));
        Ok(())
    }

    #[test]
    fn export_to_path_replaces_previous_file_whole() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let transcripts = dir.path().join("transcripts");
        fs::create_dir_all(&transcripts)?;
        fs::write(transcripts.join("abc.txt"), "text")?;

        let out = dir.path().join("export.csv");
        fs::write(&out, "previous export")?;

        let exporter = Exporter::new(&transcripts, dir.path().join("staging"));
        assert_eq!(exporter.export_to_path(&out)?, 1);

        let written = fs::read_to_string(&out)?;
        assert!(written.starts_with("original_file_name,file_path,transcript_text\n"));
        assert!(written.contains("Unknown,Not found,text"));
        assert!(!dir.path().join("export.csv.part").exists());
        Ok(())
    }

    #[test]
    fn export_to_unwritable_path_reports_it() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let exporter = Exporter::new(dir.path().join("transcripts"), dir.path().join("staging"));

        let out = dir.path().join("no-such-dir").join("export.csv");
        let err = exporter.export_to_path(&out).unwrap_err();
        assert!(err.to_string().contains("failed to write export file"));
        assert!(!out.exists());
        Ok(())
    }

    #[test]
    fn missing_staging_dir_matches_nothing() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let index = StagedIndex::scan(&dir.path().join("nope"))?;
        assert_eq!(index.find("abc"), None);
        Ok(())
    }
}
