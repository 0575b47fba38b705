use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use tracing::error;

use scanscribe::drive::{Credentials, DriveClient, read_credentials};
use scanscribe::opts::{DEFAULT_MAX_FOLDER_DEPTH, DEFAULT_STAGING_DIR, DEFAULT_TRANSCRIPT_DIR};
use scanscribe::{
    Exporter, ImageSource, LocalSource, Opts, Pipeline, RemoteSource, RunReport, TesseractBackend,
    folder_id_from_url,
};

/// Overrides the credentials file when set.
const ACCESS_TOKEN_ENV: &str = "SCANSCRIBE_ACCESS_TOKEN";

#[derive(Parser, Debug)]
#[command(name = "scanscribe")]
#[command(about = "OCR a folder of scanned images into per-image transcripts, or export them")]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["folder_url", "local", "export"]),
))]
struct Params {
    /// Google Drive folder URL or ID to process (recursively).
    #[arg(long = "folder-url")]
    folder_url: Option<String>,

    /// Service-account key file, or a file holding a Drive access token.
    #[arg(long = "credentials", default_value = "credentials.json")]
    credentials: PathBuf,

    /// Process images already in the staging directory.
    #[arg(long = "local", default_value_t = false)]
    local: bool,

    /// Export existing transcripts to FILENAME instead of processing images.
    #[arg(long = "export", visible_alias = "export-csv", value_name = "FILENAME")]
    export: Option<PathBuf>,

    /// Reprocess all images and overwrite existing transcripts.
    #[arg(long = "force", default_value_t = false)]
    force: bool,

    #[arg(long = "staging-dir", default_value = DEFAULT_STAGING_DIR)]
    staging_dir: PathBuf,

    #[arg(long = "transcript-dir", default_value = DEFAULT_TRANSCRIPT_DIR)]
    transcript_dir: PathBuf,

    /// Tesseract language(s), e.g. `eng` or `eng+deu`.
    #[arg(long = "lang", default_value = "eng")]
    language: String,

    /// Directory containing Tesseract's `*.traineddata` files.
    #[arg(long = "tessdata")]
    tessdata: Option<String>,

    /// Maximum Drive folder nesting to follow below the root folder.
    #[arg(long = "max-folder-depth", default_value_t = DEFAULT_MAX_FOLDER_DEPTH)]
    max_folder_depth: usize,
}

impl Params {
    fn opts(&self) -> Opts {
        Opts {
            staging_dir: self.staging_dir.clone(),
            transcript_dir: self.transcript_dir.clone(),
            force: self.force,
            max_folder_depth: self.max_folder_depth,
        }
    }
}

fn main() {
    scanscribe::init_logging();

    if let Err(err) = run(Params::parse()) {
        error!(error = ?err, "scanscribe failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(params: Params) -> Result<()> {
    let opts = params.opts();

    if let Some(output) = &params.export {
        let exporter = Exporter::new(&opts.transcript_dir, &opts.staging_dir);
        let count = exporter.export_to_path(output)?;
        println!("Exported {count} transcripts to {}", output.display());
        return Ok(());
    }

    let backend = TesseractBackend::new(params.tessdata.as_deref(), params.language.as_str())
        .context("failed to initialize OCR backend")?;
    let pipeline = Pipeline::new(backend, &opts);

    let report = if let Some(folder_url) = &params.folder_url {
        let credentials = match std::env::var(ACCESS_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Credentials::AccessToken(token.trim().into()),
            _ => read_credentials(&params.credentials)?,
        };
        let drive = Arc::new(DriveClient::from_credentials(credentials)?);
        let source = RemoteSource::new(
            drive.clone(),
            folder_id_from_url(folder_url),
            opts.max_folder_depth,
        );
        run_pipeline(pipeline.with_remote(drive), &source)?
    } else {
        run_pipeline(pipeline, &LocalSource::new(&opts.staging_dir))?
    };

    println!(
        "Processing complete: {} found, {} saved, {} skipped, {} failed",
        report.discovered(),
        report.saved(),
        report.skipped(),
        report.failed()
    );
    Ok(())
}

fn run_pipeline(
    mut pipeline: Pipeline<TesseractBackend>,
    source: &dyn ImageSource,
) -> Result<RunReport> {
    Ok(pipeline.run(source)?)
}
