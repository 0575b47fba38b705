use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::Result;

/// Write `bytes` to `dest_path` safely:
/// - write to `dest_path.part`
/// - fsync + rename to final path
///
/// Readers never observe a truncated file under the final name. On failure the `.part`
/// file is removed and `dest_path` is left untouched.
pub fn write_atomic(dest_path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = part_path(dest_path);

    let result = (|| -> anyhow::Result<()> {
        let mut file = fs::File::create(&tmp_path)
            .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;
        file.write_all(bytes)
            .with_context(|| format!("failed to write: {}", tmp_path.display()))?;
        file.sync_all()?;

        fs::rename(&tmp_path, dest_path)
            .with_context(|| format!("failed to move into place: {}", dest_path.display()))?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }

    Ok(result?)
}

fn part_path(dest_path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.part", dest_path.display()))
}
