//! Streamed release download and archive extraction.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use flate2::read::GzDecoder;
use lmhost_core::ProvisionError;
use lmhost_core::ports::ProgressReporter;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::platform::AssetFormat;
use crate::ndjson::{StreamStep, next_step};

/// Stream `url` into `dest`, reporting percent progress when the size is known.
///
/// The partial file is removed on failure or cancellation.
pub async fn download_to_file(
    client: &Client,
    url: &str,
    dest: &Path,
    progress: &dyn ProgressReporter,
    cancel: &CancellationToken,
) -> Result<u64, ProvisionError> {
    let result = stream_to_file(client, url, dest, progress, cancel).await;
    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(dest).await {
            debug!(path = %dest.display(), error = %e, "No partial download to remove");
        }
    }
    result
}

async fn stream_to_file(
    client: &Client,
    url: &str,
    dest: &Path,
    progress: &dyn ProgressReporter,
    cancel: &CancellationToken,
) -> Result<u64, ProvisionError> {
    info!("Downloading server binary from {}", url);
    progress.report("Downloading server binary", None);

    let response = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(ProvisionError::DownloadCancelled),
        response = client.get(url).header("User-Agent", "lmhost").send() => response,
    };
    let response = response
        .map_err(|e| ProvisionError::download_failed(format!("failed to start download: {e}")))?;

    if !response.status().is_success() {
        return Err(ProvisionError::download_failed(format!(
            "HTTP {} from {url}",
            response.status()
        )));
    }

    let total = response.content_length().filter(|t| *t > 0);
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ProvisionError::io(parent, &e))?;
    }
    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| ProvisionError::io(dest, &e))?;

    let mut stream = Box::pin(response.bytes_stream());
    let mut downloaded: u64 = 0;
    let mut last_percent = None;

    loop {
        let chunk = match next_step(&mut stream, Some(cancel)).await {
            StreamStep::Item(Ok(chunk)) => chunk,
            StreamStep::Item(Err(e)) => {
                return Err(ProvisionError::download_failed(format!(
                    "error reading download stream: {e}"
                )));
            }
            StreamStep::End => break,
            StreamStep::Cancelled => {
                info!("Binary download cancelled");
                return Err(ProvisionError::DownloadCancelled);
            }
        };

        file.write_all(&chunk)
            .await
            .map_err(|e| ProvisionError::io(dest, &e))?;
        downloaded += chunk.len() as u64;

        let percent = total.map(|t| percent_of(downloaded, t));
        if percent != last_percent {
            progress.report("Downloading server binary", percent);
            last_percent = percent;
        }
    }

    file.flush().await.map_err(|e| ProvisionError::io(dest, &e))?;
    debug!(bytes = downloaded, "Download complete");
    Ok(downloaded)
}

#[allow(clippy::cast_possible_truncation)]
fn percent_of(done: u64, total: u64) -> u8 {
    (done.saturating_mul(100) / total).min(100) as u8
}

/// Place the executable contained in `asset` at `dest`.
///
/// Blocking; run it on the blocking pool.
pub fn extract_executable(
    asset: &Path,
    format: AssetFormat,
    executable_name: &str,
    dest: &Path,
) -> Result<(), ProvisionError> {
    match format {
        AssetFormat::Raw => fs::copy(asset, dest)
            .map(|_| ())
            .map_err(|e| ProvisionError::io(dest, &e)),
        AssetFormat::TarGz => extract_from_tarball(asset, executable_name, dest),
        AssetFormat::Zip => extract_from_zip(asset, executable_name, dest),
    }
}

fn extract_from_tarball(asset: &Path, executable_name: &str, dest: &Path) -> Result<(), ProvisionError> {
    let file = File::open(asset).map_err(|e| ProvisionError::io(asset, &e))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let entries = archive.entries().map_err(|e| ProvisionError::io(asset, &e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| ProvisionError::io(asset, &e))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .ok()
            .and_then(|p| p.file_name().map(|n| n == executable_name))
            .unwrap_or(false);
        if matches {
            let mut out = File::create(dest).map_err(|e| ProvisionError::io(dest, &e))?;
            io::copy(&mut entry, &mut out).map_err(|e| ProvisionError::io(dest, &e))?;
            return Ok(());
        }
    }

    Err(missing_from_archive(asset, executable_name))
}

fn extract_from_zip(asset: &Path, executable_name: &str, dest: &Path) -> Result<(), ProvisionError> {
    let file = File::open(asset).map_err(|e| ProvisionError::io(asset, &e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ProvisionError::Io {
        path: asset.to_path_buf(),
        message: format!("failed to read zip archive: {e}"),
    })?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| ProvisionError::Io {
            path: asset.to_path_buf(),
            message: format!("failed to read archive entry: {e}"),
        })?;
        if entry.is_dir() {
            continue;
        }
        let file_name = entry.name().rsplit('/').next().unwrap_or_default().to_string();
        if file_name == executable_name {
            let mut out = File::create(dest).map_err(|e| ProvisionError::io(dest, &e))?;
            io::copy(&mut entry, &mut out).map_err(|e| ProvisionError::io(dest, &e))?;
            return Ok(());
        }
    }

    Err(missing_from_archive(asset, executable_name))
}

fn missing_from_archive(asset: &Path, executable_name: &str) -> ProvisionError {
    ProvisionError::Io {
        path: asset.to_path_buf(),
        message: format!("archive does not contain {executable_name}"),
    }
}
