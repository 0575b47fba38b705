use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::atomic::write_atomic;
use crate::descriptor::{ImageDescriptor, Origin};
use crate::remote::RemoteStore;
use crate::{Error, Result};

/// Materializes remote images into the staging directory.
///
/// Staged files are keyed by identity (file name), not content: once `staging_dir/identity`
/// exists it is never downloaded or overwritten again.
pub struct Fetcher {
    remote: Option<Arc<dyn RemoteStore>>,
    staging_dir: PathBuf,
}

impl Fetcher {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            remote: None,
            staging_dir: staging_dir.into(),
        }
    }

    /// Attach the remote capability used to download [`Origin::Remote`] images.
    pub fn with_remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Where `desc` is (or will be) staged on disk.
    pub fn staged_path(&self, desc: &ImageDescriptor) -> PathBuf {
        match &desc.origin {
            Origin::Local { path } => path.clone(),
            Origin::Remote { .. } => self.staging_dir.join(&desc.identity),
        }
    }

    /// Return a local path holding `desc`'s bytes, downloading it first if needed.
    ///
    /// Local descriptors are returned as-is.
    pub fn ensure_local(&self, desc: &ImageDescriptor) -> Result<PathBuf> {
        let Origin::Remote { file_id } = &desc.origin else {
            return Ok(self.staged_path(desc));
        };

        let dest = self.staged_path(desc);
        if dest.exists() {
            debug!(identity = %desc.identity, path = %dest.display(), "already staged");
            return Ok(dest);
        }

        let remote = self.remote.as_ref().ok_or_else(|| {
            Error::msg(format!(
                "cannot download '{}': no remote store configured",
                desc.identity
            ))
        })?;

        fs::create_dir_all(&self.staging_dir).with_context(|| {
            format!(
                "failed to create staging dir: {}",
                self.staging_dir.display()
            )
        })?;

        let bytes = remote.fetch_bytes(file_id).map_err(|err| {
            Error::msg(format!("failed to download '{}': {err}", desc.identity))
        })?;
        write_atomic(&dest, &bytes)?;

        info!(identity = %desc.identity, bytes = bytes.len(), "downloaded");
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_descriptor_is_its_own_staged_copy() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scan.png");
        fs::write(&path, b"x")?;

        let desc = ImageDescriptor::local(&path).expect("descriptor");
        let fetcher = Fetcher::new(dir.path().join("staging"));

        assert_eq!(fetcher.ensure_local(&desc)?, path);
        assert!(!dir.path().join("staging").exists());
        Ok(())
    }

    #[test]
    fn remote_descriptor_without_store_errors() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let fetcher = Fetcher::new(dir.path());
        let desc = ImageDescriptor::remote("id-1", "scan.png");

        let err = fetcher.ensure_local(&desc).unwrap_err();
        assert!(err.to_string().contains("no remote store configured"));
        Ok(())
    }

    #[test]
    fn already_staged_file_short_circuits_without_store() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("scan.png"), b"cached")?;
        let fetcher = Fetcher::new(dir.path());
        let desc = ImageDescriptor::remote("id-1", "scan.png");

        let path = fetcher.ensure_local(&desc)?;
        assert_eq!(fs::read(path)?, b"cached");
        Ok(())
    }
}
