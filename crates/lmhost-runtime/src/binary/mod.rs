//! Server binary provisioning.
//!
//! Resolution order:
//! 1. An executable already installed in the managed `bin` dir (or the home staging dir)
//! 2. A bundled binary for this `<os>-<arch>` copied into place
//! 3. A release asset downloaded (and extracted) into place
//! 4. A system-wide installation
//!
//! Platforms without a published release skip step 3 and report
//! `PlatformUnsupported` when nothing else turns up.
//!
//! Steps 2 and 3 write to the managed `bin` dir, or to the home staging
//! dir when the former is not writable.

mod download;
mod platform;
mod system;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use lmhost_core::paths::ensure_directory;
use lmhost_core::ports::{ExecutableSource, NoopProgress, ProgressReporter};
use lmhost_core::{ProvisionError, RuntimePaths};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use download::{download_to_file, extract_executable};
pub use platform::{AssetFormat, Platform, ReleaseAsset};
pub use system::{default_system_candidates, find_existing};

/// Release download location; asset names are appended.
pub const DEFAULT_DOWNLOAD_BASE_URL: &str = "https://github.com/ollama/ollama/releases/latest/download/";

/// Resolves, installs or downloads the server executable.
pub struct BinaryProvisioner {
    paths: RuntimePaths,
    platform: Platform,
    http: Client,
    download_base_url: String,
    progress: Arc<dyn ProgressReporter>,
    cancel: CancellationToken,
    /// `None` searches the default system locations.
    system_candidates: Option<Vec<PathBuf>>,
}

impl BinaryProvisioner {
    pub fn new(paths: RuntimePaths) -> Self {
        Self {
            paths,
            platform: Platform::current(),
            http: Client::new(),
            download_base_url: DEFAULT_DOWNLOAD_BASE_URL.to_string(),
            progress: Arc::new(NoopProgress),
            cancel: CancellationToken::new(),
            system_candidates: None,
        }
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn with_download_base_url(mut self, url: impl Into<String>) -> Self {
        let mut url = url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        self.download_base_url = url;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Token that aborts an in-flight binary download.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace the system locations searched as a last resort.
    #[must_use]
    pub fn with_system_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.system_candidates = Some(candidates);
        self
    }

    pub const fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Resolve the executable, installing it if needed.
    pub async fn provision(&self) -> Result<PathBuf, ProvisionError> {
        let exe = self.platform.executable_name();

        for installed in [self.paths.bin_dir().join(exe), self.paths.staging_bin_dir().join(exe)] {
            if installed.is_file() {
                debug!(path = %installed.display(), "Server binary already installed");
                make_executable(&installed)?;
                return Ok(installed);
            }
        }

        if !self.platform.is_supported() {
            warn!(platform = %self.platform, "No server binary published for this platform");
            return self.provision_unpublished(exe).await;
        }

        match self.install(exe).await {
            Ok(path) => {
                info!(path = %path.display(), "Server binary installed");
                Ok(path)
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                warn!(error = %e, "Managed install failed, searching system locations");
                let searched = self.system_candidates();
                find_existing(&searched).ok_or_else(|| ProvisionError::ExecutableNotFound {
                    searched,
                    cause: Some(Box::new(e)),
                })
            }
        }
    }

    /// No release asset to download: a bundled binary, then a system install.
    async fn provision_unpublished(&self, exe: &str) -> Result<PathBuf, ProvisionError> {
        let bundled = self.bundled_path(exe);
        if bundled.is_file() {
            match self.install_bundled(&bundled, exe).await {
                Ok(path) => return Ok(path),
                Err(e) => warn!(error = %e, "Bundled server binary could not be installed"),
            }
        }

        self.search_system().ok_or_else(|| ProvisionError::PlatformUnsupported {
            os: self.platform.os.clone(),
            arch: self.platform.arch.clone(),
        })
    }

    fn bundled_path(&self, exe: &str) -> PathBuf {
        self.paths
            .bundled_bin_dir()
            .join(self.platform.bundle_key())
            .join(exe)
    }

    fn system_candidates(&self) -> Vec<PathBuf> {
        self.system_candidates
            .clone()
            .unwrap_or_else(|| default_system_candidates(&self.platform))
    }

    fn search_system(&self) -> Option<PathBuf> {
        let found = find_existing(&self.system_candidates());
        if let Some(ref path) = found {
            info!(path = %path.display(), "Using system server installation");
        }
        found
    }

    async fn install(&self, exe: &str) -> Result<PathBuf, ProvisionError> {
        let bundled = self.bundled_path(exe);
        if bundled.is_file() {
            return self.install_bundled(&bundled, exe).await;
        }

        debug!(path = %bundled.display(), "No bundled binary, downloading");
        let dest = self.writable_bin_dir()?.join(exe);
        self.install_download(&dest).await?;
        make_executable(&dest)?;
        Ok(dest)
    }

    /// Copy into the managed dir, retrying in the staging dir if that copy fails.
    async fn install_bundled(&self, bundled: &Path, exe: &str) -> Result<PathBuf, ProvisionError> {
        let mut last_error = None;

        for dir in [self.paths.bin_dir(), self.paths.staging_bin_dir()] {
            if let Err(e) = prepare_dir(&dir) {
                debug!(dir = %dir.display(), error = %e, "Skipping unwritable bin directory");
                last_error = Some(e);
                continue;
            }
            let dest = dir.join(exe);
            match tokio::fs::copy(bundled, &dest).await {
                Ok(_) => {
                    info!(from = %bundled.display(), to = %dest.display(), "Copied bundled server binary");
                    make_executable(&dest)?;
                    return Ok(dest);
                }
                Err(e) => {
                    warn!(to = %dest.display(), error = %e, "Failed to copy bundled binary");
                    last_error = Some(ProvisionError::PermissionDenied {
                        path: dest,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ProvisionError::PermissionDenied {
            path: self.paths.staging_bin_dir(),
            reason: "no writable bin directory".to_string(),
        }))
    }

    fn writable_bin_dir(&self) -> Result<PathBuf, ProvisionError> {
        let primary = self.paths.bin_dir();
        match prepare_dir(&primary) {
            Ok(()) => Ok(primary),
            Err(e) => {
                warn!(dir = %primary.display(), error = %e, "Falling back to staging directory");
                let staging = self.paths.staging_bin_dir();
                prepare_dir(&staging)?;
                Ok(staging)
            }
        }
    }

    async fn install_download(&self, dest: &Path) -> Result<(), ProvisionError> {
        let asset = self
            .platform
            .release_asset()
            .ok_or_else(|| ProvisionError::PlatformUnsupported {
                os: self.platform.os.clone(),
                arch: self.platform.arch.clone(),
            })?;

        let download_dir = self.paths.download_dir();
        prepare_dir(&download_dir)?;
        let part = download_dir.join(format!("{}.part", asset.name));
        let url = format!("{}{}", self.download_base_url, asset.name);

        let result = self.download_and_extract(&url, &part, asset, dest).await;
        if let Err(e) = tokio::fs::remove_file(&part).await {
            debug!(path = %part.display(), error = %e, "Download file already removed");
        }
        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
            self.progress.finish_with_error("Server binary download failed");
        }
        result
    }

    async fn download_and_extract(
        &self,
        url: &str,
        part: &Path,
        asset: ReleaseAsset,
        dest: &Path,
    ) -> Result<(), ProvisionError> {
        download_to_file(&self.http, url, part, self.progress.as_ref(), &self.cancel).await?;

        self.progress.report("Extracting server binary", None);
        let (part, dest_owned) = (part.to_path_buf(), dest.to_path_buf());
        let exe = self.platform.executable_name();
        tokio::task::spawn_blocking(move || extract_executable(&part, asset.format, exe, &dest_owned))
            .await
            .map_err(|e| ProvisionError::Io {
                path: dest.to_path_buf(),
                message: format!("extraction task failed: {e}"),
            })??;

        self.progress.finish("Server binary ready");
        Ok(())
    }
}

#[async_trait]
impl ExecutableSource for BinaryProvisioner {
    async fn resolve(&self) -> Result<PathBuf, ProvisionError> {
        self.provision().await
    }
}

fn prepare_dir(dir: &Path) -> Result<(), ProvisionError> {
    ensure_directory(dir).map_err(|e| ProvisionError::PermissionDenied {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Set `0o755` on Unix; nothing to do elsewhere.
fn make_executable(path: &Path) -> Result<(), ProvisionError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)
            .map_err(|e| ProvisionError::io(path, &e))?
            .permissions();
        if perms.mode() & 0o111 != 0o111 {
            perms.set_mode(0o755);
            std::fs::set_permissions(path, perms).map_err(|e| ProvisionError::io(path, &e))?;
        }
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_unsupported_platform_without_system_install() {
        let tmp = TempDir::new().unwrap();
        let provisioner = BinaryProvisioner::new(RuntimePaths::rooted(tmp.path()))
            .with_platform(Platform::new("plan9", "mips"))
            .with_system_candidates(vec![]);

        let err = provisioner.provision().await.unwrap_err();
        assert_eq!(
            err,
            ProvisionError::PlatformUnsupported {
                os: "plan9".into(),
                arch: "mips".into()
            }
        );
    }

    #[tokio::test]
    async fn test_unsupported_platform_uses_system_install() {
        let tmp = TempDir::new().unwrap();
        let system = tmp.path().join("usr-bin-ollama");
        std::fs::write(&system, "").unwrap();
        let provisioner = BinaryProvisioner::new(RuntimePaths::rooted(tmp.path()))
            .with_platform(Platform::new("plan9", "mips"))
            .with_system_candidates(vec![system.clone()]);

        assert_eq!(provisioner.provision().await.unwrap(), system);
    }

    #[tokio::test]
    async fn test_unsupported_platform_reuses_installed_binary() {
        let tmp = TempDir::new().unwrap();
        let paths = RuntimePaths::rooted(tmp.path());
        std::fs::create_dir_all(paths.bin_dir()).unwrap();
        std::fs::write(paths.bin_dir().join("ollama"), "").unwrap();
        let provisioner = BinaryProvisioner::new(paths.clone())
            .with_platform(Platform::new("plan9", "mips"))
            .with_system_candidates(vec![]);

        assert_eq!(provisioner.provision().await.unwrap(), paths.bin_dir().join("ollama"));
    }

    #[tokio::test]
    async fn test_unsupported_platform_copies_bundled_binary() {
        let tmp = TempDir::new().unwrap();
        let paths = RuntimePaths::rooted(tmp.path());
        let bundle = paths.bundled_bin_dir().join("plan9-mips");
        std::fs::create_dir_all(&bundle).unwrap();
        std::fs::write(bundle.join("ollama"), "#!/bin/sh\n").unwrap();
        let provisioner = BinaryProvisioner::new(paths.clone())
            .with_platform(Platform::new("plan9", "mips"))
            .with_system_candidates(vec![]);

        let installed = provisioner.provision().await.unwrap();
        assert_eq!(installed, paths.bin_dir().join("ollama"));
        assert_eq!(std::fs::read_to_string(&installed).unwrap(), "#!/bin/sh\n");
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_download() {
        let tmp = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let provisioner = BinaryProvisioner::new(RuntimePaths::rooted(tmp.path()))
            .with_platform(Platform::new("linux", "x86_64"))
            .with_download_base_url("http://127.0.0.1:9/releases")
            .with_system_candidates(vec![])
            .with_cancellation(cancel);

        assert_eq!(provisioner.provision().await.unwrap_err(), ProvisionError::DownloadCancelled);
        assert!(!RuntimePaths::rooted(tmp.path()).bin_dir().join("ollama").exists());
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let provisioner = BinaryProvisioner::new(RuntimePaths::rooted(Path::new("/tmp/x")))
            .with_download_base_url("http://127.0.0.1:9/releases");
        assert_eq!(provisioner.download_base_url, "http://127.0.0.1:9/releases/");
    }

    #[cfg(unix)]
    #[test]
    fn test_make_executable_sets_mode() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("ollama");
        std::fs::write(&file, "").unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o644)).unwrap();

        make_executable(&file).unwrap();
        let mode = std::fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
