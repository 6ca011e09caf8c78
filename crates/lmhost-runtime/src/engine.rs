//! Composition root for one local inference engine.
//!
//! Builds the provisioner, supervisor, installer and generation client
//! once and wires them together. Hosts hold a single `LocalEngine` for the
//! life of the session.

use std::sync::Arc;

use lmhost_core::ports::{ExecutableSource, ProgressReporter, ServerLogSinkPort};
use lmhost_core::{
    GenerateError, InstallError, InstallOutcome, ModelDescriptor, ModelRegistry, RuntimePaths,
    ServerError, ServerStatus, Settings,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::binary::BinaryProvisioner;
use crate::generate::{GenerateOptions, GenerationChunk, GenerationClient};
use crate::install::{ModelInstaller, PullPolicy};
use crate::process::{ProcessSupervisor, SupervisorConfig};

/// Builder for [`LocalEngine`].
pub struct LocalEngineBuilder {
    paths: RuntimePaths,
    config: SupervisorConfig,
    registry: Option<ModelRegistry>,
    source: Option<Arc<dyn ExecutableSource>>,
    log_sink: Option<Arc<dyn ServerLogSinkPort>>,
    policy: PullPolicy,
}

impl LocalEngineBuilder {
    /// Replace the built-in catalog.
    #[must_use]
    pub fn registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replace the default [`BinaryProvisioner`].
    #[must_use]
    pub fn executable_source(mut self, source: Arc<dyn ExecutableSource>) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn log_sink(mut self, sink: Arc<dyn ServerLogSinkPort>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    #[must_use]
    pub fn supervisor_config(mut self, config: SupervisorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn pull_policy(mut self, policy: PullPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> LocalEngine {
        let registry = Arc::new(self.registry.unwrap_or_else(ModelRegistry::builtin));
        let refreshed = registry.refresh_from_disk(&self.paths.models_dir);
        debug!(refreshed, "Reconciled installed flags with model store");

        let source = self
            .source
            .unwrap_or_else(|| Arc::new(BinaryProvisioner::new(self.paths.clone())));
        let mut supervisor = ProcessSupervisor::new(self.config, source);
        if let Some(sink) = self.log_sink {
            supervisor = supervisor.with_log_sink(sink);
        }
        let supervisor = Arc::new(supervisor);

        LocalEngine {
            installer: ModelInstaller::new(Arc::clone(&registry), Arc::clone(&supervisor), self.paths.clone())
                .with_policy(self.policy),
            generator: GenerationClient::new(Arc::clone(&supervisor)),
            registry,
            supervisor,
            paths: self.paths,
        }
    }
}

/// The surface a host application talks to.
pub struct LocalEngine {
    registry: Arc<ModelRegistry>,
    supervisor: Arc<ProcessSupervisor>,
    installer: ModelInstaller,
    generator: GenerationClient,
    paths: RuntimePaths,
}

impl LocalEngine {
    /// Start building an engine over `paths`, serving on `settings`' port.
    pub fn builder(settings: &Settings, paths: RuntimePaths) -> LocalEngineBuilder {
        LocalEngineBuilder {
            config: SupervisorConfig::new(settings.effective_port(), paths.models_dir.clone()),
            paths,
            registry: None,
            source: None,
            log_sink: None,
            policy: PullPolicy::default(),
        }
    }

    pub fn new(settings: &Settings, paths: RuntimePaths) -> Self {
        Self::builder(settings, paths).build()
    }

    pub async fn ensure_running(&self) -> Result<(), ServerError> {
        self.supervisor.ensure_running().await
    }

    pub async fn stop(&self) {
        self.supervisor.stop().await;
    }

    pub fn is_running(&self) -> bool {
        self.supervisor.is_running()
    }

    pub fn status(&self) -> ServerStatus {
        self.supervisor.status()
    }

    pub fn base_url(&self) -> String {
        self.supervisor.base_url()
    }

    pub fn paths(&self) -> &RuntimePaths {
        &self.paths
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    /// Catalog with installed models first.
    pub fn list_catalog(&self) -> Vec<ModelDescriptor> {
        self.registry.list_catalog()
    }

    pub async fn install(
        &self,
        model: &str,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<InstallOutcome, InstallError> {
        self.installer.install(model, progress, cancel).await
    }

    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, GenerateError> {
        self.generator.generate(model, prompt, options).await
    }

    pub async fn generate_streaming<F>(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerateOptions,
        on_chunk: F,
    ) -> Result<String, GenerateError>
    where
        F: FnMut(GenerationChunk<'_>) + Send,
    {
        self.generator
            .generate_streaming(model, prompt, options, on_chunk)
            .await
    }

    /// Stop the server and remove temporary download data.
    ///
    /// Safe to call more than once; failures are only logged.
    pub async fn dispose(&self) {
        self.supervisor.stop().await;

        let tmp = self.paths.download_dir();
        match tokio::fs::remove_dir_all(&tmp).await {
            Ok(()) => info!(path = %tmp.display(), "Removed download staging"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %tmp.display(), error = %e, "Failed to remove download staging"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lmhost_core::{ModelCapabilities, ProvisionError};
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct NoBinary;

    #[async_trait::async_trait]
    impl ExecutableSource for NoBinary {
        async fn resolve(&self) -> Result<PathBuf, ProvisionError> {
            Err(ProvisionError::ExecutableNotFound {
                searched: vec![],
                cause: None,
            })
        }
    }

    fn engine(tmp: &TempDir) -> LocalEngine {
        let paths = RuntimePaths::rooted(tmp.path());
        let settings = Settings {
            port: Some(1),
            ..Settings::default()
        };
        LocalEngine::builder(&settings, paths)
            .executable_source(Arc::new(NoBinary))
            .build()
    }

    #[tokio::test]
    async fn test_dispose_removes_download_dir_and_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let download_dir = engine.paths().download_dir();
        std::fs::create_dir_all(&download_dir).unwrap();
        std::fs::write(download_dir.join("ollama.part"), "x").unwrap();

        engine.dispose().await;
        assert!(!download_dir.exists());
        engine.dispose().await;
        assert_eq!(engine.status(), ServerStatus::Stopped);
    }

    #[tokio::test]
    async fn test_build_reconciles_installed_flags_from_disk() {
        let tmp = TempDir::new().unwrap();
        let paths = RuntimePaths::rooted(tmp.path());
        std::fs::create_dir_all(paths.models_dir.join("tiny-1b")).unwrap();

        let registry = ModelRegistry::new(vec![
            ModelDescriptor::new("tiny:1b", "Tiny", "", "1 MB", 1, ModelCapabilities::CHAT),
            ModelDescriptor::new("huge:70b", "Huge", "", "40 GB", 70, ModelCapabilities::CHAT),
        ])
        .unwrap();
        let engine = LocalEngine::builder(&Settings::default(), paths)
            .registry(registry)
            .executable_source(Arc::new(NoBinary))
            .build();

        let catalog = engine.list_catalog();
        assert_eq!(catalog[0].name, "tiny:1b");
        assert!(catalog[0].is_installed);
        assert!(!catalog[1].is_installed);
    }

    #[tokio::test]
    async fn test_unknown_model_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let err = engine
            .install("no-such-model", &lmhost_core::NoopProgress, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            InstallError::UnknownModel {
                name: "no-such-model".into()
            }
        );
        assert!(!engine.is_running());
    }
}
