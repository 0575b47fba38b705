//! `scanscribe`: incremental OCR transcription of image collections.
//!
//! This crate provides:
//! - Image discovery from a local directory or a remote (Google Drive) folder tree
//! - Staging of remote images, keyed by file name
//! - A deterministic enhancement pass that prepares scans for OCR
//! - Pluggable OCR backends with confidence scoring
//! - An idempotent transcript store (one `{stem}.txt` per image)
//! - CSV export of transcripts joined to their source images
//!
//! Re-running a batch only touches images without a transcript, unless `force` is set.

mod error;

pub use error::{Error, Result};

// High-level API (most consumers should start here).
pub mod opts;
pub mod pipeline;

// Discovery and staging.
pub mod descriptor;
pub mod drive;
pub mod extensions;
pub mod fetcher;
pub mod remote;
pub mod service_account;
pub mod source;

// Image preparation and recognition.
pub mod backend;
pub mod backends;
pub mod preprocess;
pub mod recognizer;
pub mod token;

// Persistence.
pub mod atomic;
pub mod store;

// Export.
pub mod csv_encoder;
pub mod exporter;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;

pub use backend::{OcrBackend, OcrPage};
#[cfg(feature = "tesseract")]
pub use backends::tesseract::TesseractBackend;
pub use descriptor::{ImageDescriptor, Origin};
pub use exporter::{ExportRecord, Exporter};
pub use opts::Opts;
pub use pipeline::{ItemOutcome, ItemReport, Pipeline, RunReport};
pub use remote::{ListPage, RemoteItem, RemoteItemKind, RemoteStore};
pub use source::{ImageSource, LocalSource, RemoteSource, folder_id_from_url};
pub use token::OcrToken;

#[cfg(feature = "logging")]
pub use logging::init as init_logging;
