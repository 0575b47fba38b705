//! Image discovery: where the pipeline's descriptors come from.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::descriptor::ImageDescriptor;
use crate::extensions::{is_image_name, is_plain_file_name};
use crate::remote::{RemoteItem, RemoteItemKind, RemoteStore};
use crate::{Error, Result};

/// A source of image descriptors.
///
/// Every call re-walks the underlying state from scratch.
pub trait ImageSource {
    fn discover(&self) -> Result<Vec<ImageDescriptor>>;
}

/// Images sitting directly inside one local directory (no recursion).
pub struct LocalSource {
    dir: PathBuf,
}

impl LocalSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ImageSource for LocalSource {
    /// A directory that does not exist yet holds no images.
    fn discover(&self) -> Result<Vec<ImageDescriptor>> {
        if !self.dir.exists() {
            info!(dir = %self.dir.display(), "image directory does not exist");
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read image directory: {}", self.dir.display()))?;

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let Some(desc) = ImageDescriptor::local(entry.path()) else {
                warn!(path = %entry.path().display(), "skipping file with a non UTF-8 name");
                continue;
            };
            if is_image_name(&desc.identity) {
                found.push(desc);
            }
        }

        // read_dir order is platform dependent.
        found.sort_by(|a, b| a.identity.cmp(&b.identity));
        Ok(found)
    }
}

/// Images in a remote folder and all of its subfolders.
///
/// The walk is depth-first: a folder's own images come before anything found in its
/// subfolders. Each folder is listed at most once, and nesting deeper than `max_depth`
/// below the root aborts discovery with [`Error::DepthExceeded`].
pub struct RemoteSource {
    store: Arc<dyn RemoteStore>,
    root_folder_id: String,
    max_depth: usize,
}

impl RemoteSource {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        root_folder_id: impl Into<String>,
        max_depth: usize,
    ) -> Self {
        Self {
            store,
            root_folder_id: root_folder_id.into(),
            max_depth,
        }
    }

    /// Fetch every page of `folder_id`'s children, in page order.
    pub fn list_all_children(&self, folder_id: &str) -> Result<Vec<RemoteItem>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .store
                .list_children(folder_id, page_token.as_deref())
                .map_err(|err| {
                    Error::msg(format!("failed to list remote folder '{folder_id}': {err}"))
                })?;
            debug!(folder_id, count = page.items.len(), "received folder page");
            items.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(items)
    }

    fn walk(
        &self,
        folder_id: &str,
        depth: usize,
        visited: &mut HashSet<String>,
        out: &mut Vec<ImageDescriptor>,
    ) -> Result<()> {
        if depth > self.max_depth {
            return Err(Error::DepthExceeded {
                folder_id: folder_id.to_owned(),
                max_depth: self.max_depth,
            });
        }
        if !visited.insert(folder_id.to_owned()) {
            warn!(folder_id, "folder already visited, skipping");
            return Ok(());
        }

        let mut subfolders = Vec::new();
        for item in self.list_all_children(folder_id)? {
            match item.kind {
                RemoteItemKind::Folder => subfolders.push(item.id),
                RemoteItemKind::File => {
                    if !is_image_name(&item.name) {
                        continue;
                    }
                    if !is_plain_file_name(&item.name) {
                        warn!(name = %item.name, "skipping image whose name cannot be staged");
                        continue;
                    }
                    out.push(ImageDescriptor::remote(item.id, item.name));
                }
            }
        }

        for subfolder in subfolders {
            self.walk(&subfolder, depth + 1, visited, out)?;
        }
        Ok(())
    }
}

impl ImageSource for RemoteSource {
    fn discover(&self) -> Result<Vec<ImageDescriptor>> {
        let mut found = Vec::new();
        let mut visited = HashSet::new();
        self.walk(&self.root_folder_id, 0, &mut visited, &mut found)?;
        Ok(found)
    }
}

/// Extract a folder id from a shared folder URL, or return the input as-is.
///
/// Accepts `.../folders/<id>?...`, `...?id=<id>&...`, or a bare id.
pub fn folder_id_from_url(input: &str) -> String {
    let input = input.trim();
    let tail = if let Some((_, rest)) = input.rsplit_once("folders/") {
        rest
    } else if let Some((_, rest)) = input.rsplit_once("id=") {
        rest
    } else {
        return input.to_owned();
    };

    let end = tail.find(['?', '&']).unwrap_or(tail.len());
    tail[..end].to_owned()
}
