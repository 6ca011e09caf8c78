//! CLI bootstrap - the composition root.
//!
//! Settings, paths and the engine are built here; handlers only ever see
//! the finished [`CliContext`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use lmhost_core::{RuntimePaths, Settings, validate_settings};
use lmhost_runtime::{BinaryProvisioner, LocalEngine};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::progress::CliProgress;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub settings: Settings,
    pub paths: RuntimePaths,
}

impl CliConfig {
    /// Environment settings with command-line overrides applied.
    pub fn from_args(port: Option<u16>, data_dir: Option<PathBuf>) -> Result<Self> {
        let mut settings = Settings::from_env();
        if port.is_some() {
            settings.port = port;
        }
        if data_dir.is_some() {
            settings.data_dir = data_dir;
        }
        validate_settings(&settings)?;

        let mut paths = RuntimePaths::resolve().context("failed to resolve lmhost directories")?;
        if let Some(dir) = &settings.data_dir {
            paths.models_dir = dir.join("models");
            paths.data_root.clone_from(dir);
        }

        Ok(Self { settings, paths })
    }
}

/// Fully composed context for CLI commands.
pub struct CliContext {
    pub engine: LocalEngine,
    pub settings: Settings,
    /// Cancelled on Ctrl-C; aborts binary downloads and model pulls.
    pub cancel: CancellationToken,
}

impl CliContext {
    /// Cancel [`Self::cancel`] when Ctrl-C arrives. Abort the handle when done.
    pub fn cancel_on_ctrl_c(&self) -> JoinHandle<()> {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Ctrl-C received, cancelling");
                cancel.cancel();
            }
        })
    }
}

pub fn bootstrap(config: CliConfig) -> CliContext {
    let cancel = CancellationToken::new();
    let provisioner = BinaryProvisioner::new(config.paths.clone())
        .with_progress(Arc::new(CliProgress::new()))
        .with_cancellation(cancel.clone());
    let engine = LocalEngine::builder(&config.settings, config.paths)
        .executable_source(Arc::new(provisioner))
        .build();

    CliContext {
        engine,
        settings: config.settings,
        cancel,
    }
}
