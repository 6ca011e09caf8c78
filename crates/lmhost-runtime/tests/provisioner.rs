//! Binary provisioning against temp directories and a fake release host.

mod common;

use std::fs::File;
use std::path::Path;

use common::FakeServer;
use flate2::Compression;
use flate2::write::GzEncoder;
use lmhost_core::{ProvisionError, RuntimePaths};
use lmhost_runtime::{BinaryProvisioner, Platform};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn linux() -> Platform {
    Platform::new("linux", "x86_64")
}

fn provisioner(paths: RuntimePaths) -> BinaryProvisioner {
    BinaryProvisioner::new(paths)
        .with_platform(linux())
        .with_download_base_url("http://127.0.0.1:9/releases/")
        .with_system_candidates(vec![])
}

fn tarball_with(path: &Path, name: &str, contents: &[u8]) {
    let file = File::create(path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    let mut header = tar::Header::new_gnu();
    header.set_size(contents.len() as u64);
    header.set_mode(0o755);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_cksum();
    builder.append_data(&mut header, name, contents).unwrap();
    builder.into_inner().unwrap().finish().unwrap();
}

#[cfg(unix)]
fn mode_of(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).unwrap().permissions().mode() & 0o777
}

#[tokio::test]
async fn existing_install_is_reused() {
    let tmp = TempDir::new().unwrap();
    let paths = RuntimePaths::rooted(tmp.path());
    std::fs::create_dir_all(paths.bin_dir()).unwrap();
    let installed = paths.bin_dir().join("ollama");
    std::fs::write(&installed, "binary").unwrap();

    let resolved = provisioner(paths).provision().await.unwrap();

    assert_eq!(resolved, installed);
    #[cfg(unix)]
    assert_eq!(mode_of(&resolved), 0o755);
}

#[tokio::test]
async fn bundled_binary_is_copied_into_bin_dir() {
    let tmp = TempDir::new().unwrap();
    let paths = RuntimePaths::rooted(tmp.path());
    let bundle_dir = paths.bundled_bin_dir().join("linux-x86_64");
    std::fs::create_dir_all(&bundle_dir).unwrap();
    std::fs::write(bundle_dir.join("ollama"), "bundled").unwrap();

    let resolved = provisioner(paths.clone()).provision().await.unwrap();

    assert_eq!(resolved, paths.bin_dir().join("ollama"));
    assert_eq!(std::fs::read_to_string(&resolved).unwrap(), "bundled");
    #[cfg(unix)]
    assert_eq!(mode_of(&resolved), 0o755);
}

#[tokio::test]
async fn unwritable_bin_dir_falls_back_to_staging() {
    let tmp = TempDir::new().unwrap();
    let paths = RuntimePaths::rooted(tmp.path());
    // A regular file where the data root should be makes `bin` impossible to create.
    std::fs::write(&paths.data_root, "not a directory").unwrap();
    let bundle_dir = paths.bundled_bin_dir().join("linux-x86_64");
    std::fs::create_dir_all(&bundle_dir).unwrap();
    std::fs::write(bundle_dir.join("ollama"), "bundled").unwrap();

    let resolved = provisioner(paths.clone()).provision().await.unwrap();

    assert_eq!(resolved, paths.staging_bin_dir().join("ollama"));
    assert_eq!(std::fs::read_to_string(&resolved).unwrap(), "bundled");
}

#[tokio::test]
async fn release_archive_is_downloaded_and_extracted() {
    let server = FakeServer::start().await;
    let tmp = TempDir::new().unwrap();
    let archive = tmp.path().join("release.tgz");
    tarball_with(&archive, "bin/ollama", b"downloaded");
    *server.state.release_asset.lock().unwrap() = Some(std::fs::read(&archive).unwrap());

    let paths = RuntimePaths::rooted(&tmp.path().join("root"));
    let resolved = BinaryProvisioner::new(paths.clone())
        .with_platform(linux())
        .with_download_base_url(server.url("/releases"))
        .with_system_candidates(vec![])
        .provision()
        .await
        .unwrap();

    assert_eq!(resolved, paths.bin_dir().join("ollama"));
    assert_eq!(std::fs::read_to_string(&resolved).unwrap(), "downloaded");
    let leftovers = std::fs::read_dir(paths.download_dir()).unwrap().count();
    assert_eq!(leftovers, 0, "partial download left behind");
}

#[tokio::test]
async fn failed_download_without_system_install_is_not_found() {
    let server = FakeServer::start().await;
    let tmp = TempDir::new().unwrap();
    let paths = RuntimePaths::rooted(tmp.path());

    let err = BinaryProvisioner::new(paths.clone())
        .with_platform(linux())
        .with_download_base_url(server.url("/releases"))
        .with_system_candidates(vec![tmp.path().join("nowhere").join("ollama")])
        .provision()
        .await
        .unwrap_err();

    match err {
        ProvisionError::ExecutableNotFound { searched, cause } => {
            assert_eq!(searched.len(), 1);
            assert!(matches!(
                cause.as_deref(),
                Some(ProvisionError::DownloadFailed { .. })
            ));
        }
        other => panic!("expected ExecutableNotFound, got {other:?}"),
    }
    assert!(!paths.bin_dir().join("ollama").exists());
}

#[tokio::test]
async fn failed_download_falls_back_to_system_install() {
    let server = FakeServer::start().await;
    let tmp = TempDir::new().unwrap();
    let system = tmp.path().join("usr-local-bin-ollama");
    std::fs::write(&system, "system").unwrap();

    let resolved = BinaryProvisioner::new(RuntimePaths::rooted(&tmp.path().join("root")))
        .with_platform(linux())
        .with_download_base_url(server.url("/releases"))
        .with_system_candidates(vec![system.clone()])
        .provision()
        .await
        .unwrap();

    assert_eq!(resolved, system);
}

#[tokio::test]
async fn cancelled_download_is_not_masked_by_system_search() {
    let tmp = TempDir::new().unwrap();
    let system = tmp.path().join("ollama-system");
    std::fs::write(&system, "system").unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = provisioner(RuntimePaths::rooted(&tmp.path().join("root")))
        .with_system_candidates(vec![system])
        .with_cancellation(cancel)
        .provision()
        .await
        .unwrap_err();

    assert_eq!(err, ProvisionError::DownloadCancelled);
}
