//! Model installation.
//!
//! A model is installed either by copying a bundled payload from the
//! resources directory, or by asking the running server to pull it.

mod extract;
mod pull;

use std::sync::Arc;

use lmhost_core::ports::ProgressReporter;
use lmhost_core::{InstallError, InstallOutcome, ModelDescriptor, ModelRegistry, RuntimePaths};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::process::ProcessSupervisor;

pub use extract::copy_model_dir;
pub use pull::{PullPolicy, pull_model};

/// Installs catalog models and keeps the registry's installed flags honest.
pub struct ModelInstaller {
    registry: Arc<ModelRegistry>,
    supervisor: Arc<ProcessSupervisor>,
    paths: RuntimePaths,
    http: Client,
    policy: PullPolicy,
}

impl ModelInstaller {
    pub fn new(registry: Arc<ModelRegistry>, supervisor: Arc<ProcessSupervisor>, paths: RuntimePaths) -> Self {
        Self {
            registry,
            supervisor,
            paths,
            http: Client::new(),
            policy: PullPolicy::default(),
        }
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: PullPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Install `name`.
    ///
    /// Cancellation is an outcome, not an error: it returns
    /// `InstallOutcome { cancelled: true, .. }`. The installed flag is only
    /// ever set on success.
    pub async fn install(
        &self,
        name: &str,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<InstallOutcome, InstallError> {
        let model = self
            .registry
            .get(name)
            .ok_or_else(|| InstallError::UnknownModel { name: name.to_string() })?;

        match self.install_model(&model, progress, cancel).await {
            Ok(()) => {
                self.registry.set_installed(name, true);
                progress.finish(&format!("{} installed", model.display_name));
                Ok(InstallOutcome::installed(name))
            }
            Err(e) if e.is_cancelled() => {
                progress.finish_with_error("Installation cancelled");
                Ok(InstallOutcome::cancelled(name))
            }
            Err(e) => {
                progress.finish_with_error(&e.to_string());
                Err(e)
            }
        }
    }

    async fn install_model(
        &self,
        model: &ModelDescriptor,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<(), InstallError> {
        let models_dir = &self.paths.models_dir;

        if model.is_installed {
            if model.is_present_in(models_dir) {
                info!(model = %model.name, "Model already installed");
                return Ok(());
            }
            warn!(model = %model.name, "Model marked installed but missing on disk, reinstalling");
        }

        let bundled = self.paths.bundled_models_dir().join(model.dir_name());
        if bundled.is_dir() {
            info!(model = %model.name, from = %bundled.display(), "Installing bundled model");
            copy_model_dir(&bundled, &model.local_dir(models_dir), progress).await?;
            return Ok(());
        }

        progress.report("Starting model server", None);
        self.supervisor.ensure_running().await?;
        pull_model(
            &self.http,
            &self.supervisor.base_url(),
            &model.name,
            self.policy,
            progress,
            cancel,
        )
        .await
    }
}
