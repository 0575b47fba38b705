use std::path::{Path, PathBuf};

use crate::extensions::stem_of;

/// Where a discovered image lives.
///
/// Resolved once at discovery time and carried through the pipeline, so later stages never
/// have to guess whether they hold a remote reference or a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A file in the remote store, addressed by its opaque id.
    Remote { file_id: String },

    /// A file already on local disk; it doubles as its own staged copy.
    Local { path: PathBuf },
}

/// A discovered reference to a source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    /// The image's file name (e.g. `scan_001.png`).
    pub identity: String,
    pub origin: Origin,
}

impl ImageDescriptor {
    pub fn remote(file_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identity: name.into(),
            origin: Origin::Remote {
                file_id: file_id.into(),
            },
        }
    }

    /// Describe a local file. Returns `None` if the path has no UTF-8 file name.
    pub fn local(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let identity = path.file_name()?.to_str()?.to_owned();
        Some(Self {
            identity,
            origin: Origin::Local {
                path: path.to_path_buf(),
            },
        })
    }

    /// The join key between this image and its transcript.
    pub fn stem(&self) -> &str {
        stem_of(&self.identity)
    }
}
