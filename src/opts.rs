use std::path::PathBuf;

/// Default directory where remote images are staged.
pub const DEFAULT_STAGING_DIR: &str = "downloaded_images";

/// Default directory holding one `{stem}.txt` transcript per image.
pub const DEFAULT_TRANSCRIPT_DIR: &str = "transcripts";

/// Default bound on how deep remote discovery may descend below the root folder.
pub const DEFAULT_MAX_FOLDER_DEPTH: usize = 64;

/// Options that control a transcription run.
///
/// This struct represents *library-level configuration*, not CLI flags directly.
/// The CLI is responsible for mapping user input into this type so that:
/// - the library remains reusable outside of a CLI context
/// - other frontends (tests, batch jobs) can construct options programmatically
#[derive(Debug, Clone)]
pub struct Opts {
    /// Where remote images are materialized before processing.
    ///
    /// Files are stored flat, named by their original file name.
    pub staging_dir: PathBuf,

    /// Where transcripts are persisted.
    ///
    /// The presence of `{stem}.txt` here is the only "already processed" signal.
    pub transcript_dir: PathBuf,

    /// Reprocess every image and overwrite existing transcripts.
    pub force: bool,

    /// Maximum folder nesting (below the root) that remote discovery will follow.
    pub max_folder_depth: usize,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            transcript_dir: PathBuf::from(DEFAULT_TRANSCRIPT_DIR),
            force: false,
            max_folder_depth: DEFAULT_MAX_FOLDER_DEPTH,
        }
    }
}
