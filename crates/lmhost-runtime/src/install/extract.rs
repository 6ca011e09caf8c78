//! Local extraction of bundled model payloads.

use std::path::{Path, PathBuf};

use lmhost_core::InstallError;
use lmhost_core::ports::ProgressReporter;
use tracing::debug;

fn extraction_failed(path: &Path, err: &std::io::Error) -> InstallError {
    InstallError::ExtractionFailed {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Every regular file under `root`, as paths relative to it, sorted.
async fn list_files(root: &Path) -> Result<Vec<PathBuf>, InstallError> {
    let mut files = Vec::new();
    let mut pending = vec![PathBuf::new()];

    while let Some(relative) = pending.pop() {
        let dir = root.join(&relative);
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| extraction_failed(&dir, &e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| extraction_failed(&dir, &e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| extraction_failed(&entry.path(), &e))?;
            let child = relative.join(entry.file_name());
            if file_type.is_dir() {
                pending.push(child);
            } else {
                files.push(child);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Copy the bundled model at `source` into `dest`, one file at a time.
///
/// Reports files-copied/total-files. A failure leaves whatever was copied
/// so far in place.
pub async fn copy_model_dir(
    source: &Path,
    dest: &Path,
    progress: &dyn ProgressReporter,
) -> Result<usize, InstallError> {
    let files = list_files(source).await?;
    let total = files.len();

    tokio::fs::create_dir_all(dest)
        .await
        .map_err(|e| extraction_failed(dest, &e))?;
    progress.report(&format!("Copying model files (0/{total})"), Some(0));

    for (index, relative) in files.iter().enumerate() {
        let from = source.join(relative);
        let to = dest.join(relative);
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| extraction_failed(parent, &e))?;
        }
        tokio::fs::copy(&from, &to)
            .await
            .map_err(|e| extraction_failed(&to, &e))?;

        let done = index + 1;
        debug!(file = %relative.display(), done, total, "Copied model file");
        progress.report(
            &format!("Copying model files ({done}/{total})"),
            Some(files_percent(done, total)),
        );
    }

    Ok(total)
}

#[allow(clippy::cast_possible_truncation)]
fn files_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (done * 100 / total).min(100) as u8
}
