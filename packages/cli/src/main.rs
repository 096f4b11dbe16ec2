#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Restores deleted `WordPress` originals in an S3 media bucket.
//!
//! ```text
//! media_restore [BUCKET]
//! ```
//!
//! The bucket comes from the positional argument, then the
//! `MEDIA_RESTORE_BUCKET` environment variable, then [`DEFAULT_BUCKET`].
//! AWS credentials and region are resolved from the usual AWS CLI
//! configuration. Log verbosity follows `RUST_LOG` (default `info`).
//!
//! A plain-text report of the run is written to
//! `restore_report_<timestamp>.txt` in the working directory.

use std::time::Instant;

use clap::Parser;
use media_restore::{RestoreConfig, Restorer, RunReport};
use media_restore_cli_utils::IndicatifProgress;

/// Bucket used when none is given on the command line or in the
/// environment.
const DEFAULT_BUCKET: &str = "image-fixer-bucket";

#[derive(Parser)]
#[command(
    name = "media_restore",
    version,
    about = "Restore missing WordPress originals from their largest resized variant"
)]
struct Cli {
    /// Bucket holding the offloaded media library
    #[arg(env = "MEDIA_RESTORE_BUCKET", default_value = DEFAULT_BUCKET)]
    bucket: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = media_restore_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = RestoreConfig::new(cli.bucket);
    log::info!("Restoring missing originals in s3://{}", config.bucket);

    let start = Instant::now();
    let restorer = Restorer::connect(config).await;
    let progress = IndicatifProgress::groups_bar(&multi, "Restoring");

    let report = match restorer.run(progress.as_ref()).await {
        Ok(report) => report,
        Err(e) => {
            progress.finish_and_clear();
            log::error!("{e}");
            return Err(e.into());
        }
    };

    log::info!(
        "Finished {} in {:.1}s",
        report.bucket,
        start.elapsed().as_secs_f64()
    );
    write_report(&report).await;

    for failure in report.failures() {
        log::warn!("Not restored: {}", failure.original_key);
    }

    Ok(())
}

/// Writes the run report next to where the tool was started.
///
/// A failure here is only a warning; the bucket has already been updated.
async fn write_report(report: &RunReport) {
    let path = report.file_name();
    match tokio::fs::write(&path, report.render()).await {
        Ok(()) => log::info!("Report written to {path}"),
        Err(e) => log::warn!("Could not write report {path}: {e}"),
    }
}
