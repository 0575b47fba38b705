//! High-level API for running an incremental transcription batch.
//!
//! `Pipeline` wires discovery → fetch → preprocess → OCR → persist for every discovered
//! image. The intent is:
//! - The OCR engine is initialized once (expensive) and reused for the whole batch.
//! - An image that already has a transcript is never fetched or recognized again unless
//!   `force` is set.
//! - One bad image never aborts the batch: per-item failures are recorded in the
//!   [`RunReport`] and processing moves on. Only setup (directory creation) and discovery
//!   failures are returned as errors.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use image::{DynamicImage, ImageReader};
use tracing::{error, info};

use crate::backend::OcrBackend;
use crate::descriptor::ImageDescriptor;
use crate::fetcher::Fetcher;
use crate::opts::Opts;
use crate::preprocess::enhance;
use crate::recognizer::Recognizer;
use crate::remote::RemoteStore;
use crate::source::ImageSource;
use crate::store::{SaveOutcome, TranscriptStore};
use crate::{Error, Result};

/// What happened to one descriptor.
#[derive(Debug)]
pub enum ItemOutcome {
    /// OCR ran and the transcript was written.
    Saved { transcript: PathBuf, confidence: f64 },

    /// A transcript already existed; nothing was fetched or recognized.
    Skipped { transcript: PathBuf },

    /// Fetching, decoding, recognizing, or writing failed.
    Failed { error: Error },
}

#[derive(Debug)]
pub struct ItemReport {
    pub identity: String,
    pub outcome: ItemOutcome,
}

/// Per-item results of a run, in discovery order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub items: Vec<ItemReport>,
}

impl RunReport {
    pub fn discovered(&self) -> usize {
        self.items.len()
    }

    pub fn saved(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Saved { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|item| pred(&item.outcome)).count()
    }
}

/// The incremental transcription orchestrator.
///
/// Typical usage:
/// - Construct once with a backend (engine initialization happens in the backend).
/// - Attach a [`RemoteStore`] when processing remote descriptors.
/// - Call [`Pipeline::run`] with an [`ImageSource`].
pub struct Pipeline<B: OcrBackend> {
    recognizer: Recognizer<B>,
    fetcher: Fetcher,
    store: TranscriptStore,
    force: bool,
}

impl<B: OcrBackend> Pipeline<B> {
    pub fn new(backend: B, opts: &Opts) -> Self {
        Self {
            recognizer: Recognizer::new(backend),
            fetcher: Fetcher::new(&opts.staging_dir),
            store: TranscriptStore::new(&opts.transcript_dir),
            force: opts.force,
        }
    }

    /// Attach the remote capability used to stage remote images.
    pub fn with_remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.fetcher = self.fetcher.with_remote(remote);
        self
    }

    /// Create the directories the run writes into.
    ///
    /// The staging directory is only needed when remote images can be downloaded.
    pub fn prepare(&self) -> Result<()> {
        self.store.ensure_dir()?;
        if self.fetcher.has_remote() {
            let staging = self.fetcher.staging_dir();
            fs::create_dir_all(staging).with_context(|| {
                format!("failed to create staging dir: {}", staging.display())
            })?;
        }
        Ok(())
    }

    /// Discover images from `source` and process each of them.
    pub fn run(&mut self, source: &dyn ImageSource) -> Result<RunReport> {
        self.prepare()?;

        let descriptors = source.discover()?;
        info!(count = descriptors.len(), "discovered images");

        Ok(self.process_all(descriptors))
    }

    /// Process descriptors in order, isolating per-item failures.
    pub fn process_all(
        &mut self,
        descriptors: impl IntoIterator<Item = ImageDescriptor>,
    ) -> RunReport {
        let mut report = RunReport::default();

        for desc in descriptors {
            let outcome = match self.process_one(&desc) {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(identity = %desc.identity, error = %err, "failed to process image");
                    ItemOutcome::Failed { error: err }
                }
            };
            report.items.push(ItemReport {
                identity: desc.identity,
                outcome,
            });
        }

        info!(
            saved = report.saved(),
            skipped = report.skipped(),
            failed = report.failed(),
            "run complete"
        );
        report
    }

    /// Process a single descriptor.
    ///
    /// Existing transcripts short-circuit before any download or OCR work.
    pub fn process_one(&mut self, desc: &ImageDescriptor) -> Result<ItemOutcome> {
        let stem = desc.stem();

        if !self.force && self.store.exists(stem) {
            info!(identity = %desc.identity, "skipping, transcript exists");
            return Ok(ItemOutcome::Skipped {
                transcript: self.store.path_for(stem),
            });
        }

        let path = self.fetcher.ensure_local(desc)?;
        let raw = open_image(&path)?;
        let enhanced = enhance(&raw);
        let recognition = self.recognizer.run(&enhanced)?;
        info!(identity = %desc.identity, confidence = recognition.confidence, "recognized");

        // The skip check already happened above, so always write here.
        match self.store.save_if_needed(stem, &recognition.text, true)? {
            SaveOutcome::Saved(transcript) => {
                info!(identity = %desc.identity, path = %transcript.display(), "saved transcript");
                Ok(ItemOutcome::Saved {
                    transcript,
                    confidence: recognition.confidence,
                })
            }
            SaveOutcome::Skipped(transcript) => Ok(ItemOutcome::Skipped { transcript }),
        }
    }

    pub fn store(&self) -> &TranscriptStore {
        &self.store
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn backend(&self) -> &B {
        self.recognizer.backend()
    }
}

/// Decode an image, sniffing the format from content rather than trusting the extension.
fn open_image(path: &Path) -> Result<DynamicImage> {
    let reader = ImageReader::open(path)
        .with_context(|| format!("failed to open image: {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("failed to read image: {}", path.display()))?;
    Ok(reader.decode()?)
}
