//! Shared helpers for lmhost-runtime integration tests.
// Each test binary uses a different subset.
#![allow(dead_code)]

pub mod fake_server;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use lmhost_core::ports::{ExecutableSource, ProgressReporter};
use lmhost_core::ProvisionError;
use mockall::mock;

pub use fake_server::{FakeServer, FakeState};

mock! {
    pub Source {}

    #[async_trait]
    impl ExecutableSource for Source {
        async fn resolve(&self) -> Result<PathBuf, ProvisionError>;
    }
}

/// A source that must never be asked for an executable.
pub fn unused_source() -> Arc<dyn ExecutableSource> {
    let mut source = MockSource::new();
    source.expect_resolve().never();
    Arc::new(source)
}

/// A source whose resolution always fails.
pub fn failing_source() -> Arc<dyn ExecutableSource> {
    let mut source = MockSource::new();
    source.expect_resolve().returning(|| {
        Err(ProvisionError::ExecutableNotFound {
            searched: vec![PathBuf::from("/usr/bin/ollama")],
            cause: None,
        })
    });
    Arc::new(source)
}

/// Hands out a script and, on first resolve, brings up a fake API on
/// `port` so the spawned script looks like a healthy server.
pub struct ServingSource {
    pub script: PathBuf,
    pub port: u16,
    pub resolves: AtomicUsize,
    server: tokio::sync::Mutex<Option<FakeServer>>,
}

impl ServingSource {
    pub fn new(script: PathBuf, port: u16) -> Self {
        Self {
            script,
            port,
            resolves: AtomicUsize::new(0),
            server: tokio::sync::Mutex::new(None),
        }
    }

    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutableSource for ServingSource {
    async fn resolve(&self) -> Result<PathBuf, ProvisionError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        let mut server = self.server.lock().await;
        if server.is_none() {
            *server = Some(FakeServer::start_on(self.port).await);
        }
        Ok(self.script.clone())
    }
}

/// Returns the path of a fixed script; counts calls.
pub struct ScriptSource {
    pub script: PathBuf,
    pub resolves: AtomicUsize,
}

impl ScriptSource {
    pub fn new(script: PathBuf) -> Self {
        Self {
            script,
            resolves: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ExecutableSource for ScriptSource {
    async fn resolve(&self) -> Result<PathBuf, ProvisionError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        Ok(self.script.clone())
    }
}

/// Write an executable `/bin/sh` script.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A loopback port that nothing is listening on right now.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Records every progress report.
#[derive(Default)]
pub struct RecordingProgress {
    pub reports: Mutex<Vec<(String, Option<u8>)>>,
    pub finished: Mutex<Option<String>>,
    pub failed: Mutex<Option<String>>,
}

impl RecordingProgress {
    pub fn percents(&self) -> Vec<u8> {
        self.reports.lock().unwrap().iter().filter_map(|(_, p)| *p).collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, message: &str, percent: Option<u8>) {
        self.reports.lock().unwrap().push((message.to_string(), percent));
    }

    fn finish(&self, message: &str) {
        *self.finished.lock().unwrap() = Some(message.to_string());
    }

    fn finish_with_error(&self, message: &str) {
        *self.failed.lock().unwrap() = Some(message.to_string());
    }
}
