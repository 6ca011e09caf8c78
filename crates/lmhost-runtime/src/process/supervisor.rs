//! Lifecycle owner for the local inference server.
//!
//! One [`ProcessSupervisor`] manages at most one server process on one
//! port. Every status change goes through [`ServerStatus::apply`]; the
//! shared state sits behind a `std::sync::Mutex` whose guard is never held
//! across an `.await`.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use lmhost_core::ports::{ExecutableSource, ServerLogSinkPort};
use lmhost_core::{ServerError, ServerStatus, ServerTransition};
use reqwest::Client;
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::health::{HealthPolicy, LivenessFailure, list_server_models, probe_liveness, wait_for_liveness};
use super::shutdown::shutdown_child;
use super::stream::spawn_stream_reader;
use crate::api::TagEntry;

/// Environment variable that redirects the server's model store.
pub const MODELS_ENV: &str = "OLLAMA_MODELS";
/// Environment variable that sets the server's bind address.
pub const HOST_ENV: &str = "OLLAMA_HOST";

/// Tunables for one supervised server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub port: u16,
    pub models_dir: PathBuf,
    pub health: HealthPolicy,
    /// Timeout of the "is someone already serving?" probe.
    pub probe_timeout: Duration,
    /// Grace period between the termination signal and a forced kill.
    pub stop_timeout: Duration,
}

impl SupervisorConfig {
    pub fn new(port: u16, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            port,
            models_dir: models_dir.into(),
            health: HealthPolicy::default(),
            probe_timeout: Duration::from_secs(2),
            stop_timeout: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub const fn with_health(mut self, health: HealthPolicy) -> Self {
        self.health = health;
        self
    }

    #[must_use]
    pub const fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

type StartOutcome = Option<Result<(), ServerError>>;
type ExitCode = Option<Option<i32>>;

/// Handle on a spawned process. The child itself lives in the watcher task.
struct ProcessLink {
    generation: u64,
    pid: Option<u32>,
    stop_tx: oneshot::Sender<Duration>,
    watcher: JoinHandle<()>,
    exit_rx: watch::Receiver<ExitCode>,
}

impl ProcessLink {
    fn is_alive(&self) -> bool {
        self.exit_rx.borrow().is_none()
    }

    /// Ask the watcher to terminate the child and wait until it has been reaped.
    async fn terminate(self, grace: Duration) -> Option<i32> {
        // A dropped receiver means the watcher already saw the exit.
        let _ = self.stop_tx.send(grace);
        if let Err(e) = self.watcher.await {
            warn!(error = %e, "Process watcher task failed");
        }
        let code = *self.exit_rx.borrow();
        code.flatten()
    }

    /// Ask the watcher to kill the child without waiting for it.
    fn kill(self) {
        let _ = self.stop_tx.send(Duration::ZERO);
    }
}

#[derive(Default)]
struct SupervisorState {
    status: ServerStatus,
    executable: Option<PathBuf>,
    process: Option<ProcessLink>,
    /// Running against a server we did not spawn.
    external: bool,
    in_flight: Option<watch::Receiver<StartOutcome>>,
    last_exit: Option<i32>,
    generation: u64,
}

impl SupervisorState {
    fn transition(&mut self, transition: ServerTransition) {
        match self.status.apply(transition) {
            Ok(next) => {
                if next != self.status {
                    debug!(from = %self.status, to = %next, "Server status changed");
                }
                self.status = next;
            }
            Err(e) => warn!("{}", e),
        }
    }

    fn owns_live_process(&self) -> bool {
        !self.external && self.process.as_ref().is_some_and(ProcessLink::is_alive)
    }
}

/// Tears down a start whose leader future was dropped before it finished:
/// the child is killed and the status returns to `Stopped`.
struct StartGuard<'a> {
    state: &'a Mutex<SupervisorState>,
    armed: bool,
}

impl StartGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = lock(self.state);
        state.in_flight = None;
        if state.status == ServerStatus::Starting {
            warn!("Start abandoned by its caller, tearing it down");
            if let Some(link) = state.process.take() {
                link.kill();
            }
            state.external = false;
            state.transition(ServerTransition::StartFailed);
        }
    }
}

fn lock(state: &Mutex<SupervisorState>) -> MutexGuard<'_, SupervisorState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Starts, watches and stops the server process.
pub struct ProcessSupervisor {
    config: SupervisorConfig,
    source: Arc<dyn ExecutableSource>,
    http: Client,
    log_sink: Option<Arc<dyn ServerLogSinkPort>>,
    state: Arc<Mutex<SupervisorState>>,
    /// Serializes whole start and stop sequences against each other.
    lifecycle: tokio::sync::Mutex<()>,
}

impl ProcessSupervisor {
    pub fn new(config: SupervisorConfig, source: Arc<dyn ExecutableSource>) -> Self {
        Self {
            config,
            source,
            http: Client::new(),
            log_sink: None,
            state: Arc::new(Mutex::new(SupervisorState::default())),
            lifecycle: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_log_sink(mut self, sink: Arc<dyn ServerLogSinkPort>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    pub fn base_url(&self) -> String {
        self.config.base_url()
    }

    pub const fn port(&self) -> u16 {
        self.config.port
    }

    pub fn status(&self) -> ServerStatus {
        lock(&self.state).status
    }

    pub fn is_running(&self) -> bool {
        self.status().is_running()
    }

    /// Exit code of the most recent owned process, if it has exited.
    pub fn last_exit(&self) -> Option<i32> {
        lock(&self.state).last_exit
    }

    /// Executable path handed over by the source, once resolved.
    pub fn executable(&self) -> Option<PathBuf> {
        lock(&self.state).executable.clone()
    }

    /// One liveness probe against the configured port, without starting anything.
    pub async fn probe(&self) -> Result<(), String> {
        probe_liveness(&self.http, &self.base_url(), self.config.probe_timeout).await
    }

    /// Models the server on the configured port reports, without starting anything.
    pub async fn server_models(&self) -> Result<Vec<TagEntry>, String> {
        list_server_models(&self.http, &self.base_url(), self.config.probe_timeout).await
    }

    /// Make sure a server answers on the configured port.
    ///
    /// Concurrent callers share one start attempt: the first becomes the
    /// leader, the rest wait for its outcome.
    pub async fn ensure_running(&self) -> Result<(), ServerError> {
        let role = {
            let mut state = lock(&self.state);
            // A closed channel means the leader was dropped mid-start.
            if let Some(rx) = state.in_flight.clone().filter(|rx| rx.has_changed().is_ok()) {
                Err(rx)
            } else if state.status.is_running() && state.owns_live_process() {
                return Ok(());
            } else {
                let (tx, rx) = watch::channel(None);
                state.in_flight = Some(rx);
                Ok(tx)
            }
        };
        let tx = match role {
            Ok(tx) => tx,
            Err(rx) => return Self::await_outcome(rx).await,
        };

        let abandon = StartGuard {
            state: &self.state,
            armed: true,
        };
        let result = {
            let _guard = self.lifecycle.lock().await;
            self.start_sequence().await
        };
        abandon.disarm();

        lock(&self.state).in_flight = None;
        tx.send_replace(Some(result.clone()));
        result
    }

    async fn await_outcome(mut rx: watch::Receiver<StartOutcome>) -> Result<(), ServerError> {
        debug!("Start already in flight, waiting for its outcome");
        match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or(Ok(())),
            // Leader dropped without reporting (its task was cancelled).
            Err(_) => Err(ServerError::StartTimeout {
                attempts: 0,
                last_error: Some("start attempt was abandoned".to_string()),
            }),
        }
    }

    async fn start_sequence(&self) -> Result<(), ServerError> {
        let base_url = self.base_url();

        let (status, external) = {
            let state = lock(&self.state);
            if state.status.is_running() && state.owns_live_process() {
                return Ok(());
            }
            (state.status, state.external)
        };

        if status.is_running() {
            if external && probe_liveness(&self.http, &base_url, self.config.probe_timeout).await.is_ok() {
                return Ok(());
            }
            warn!("Server at {} is no longer answering", base_url);
            let mut state = lock(&self.state);
            state.external = false;
            state.transition(ServerTransition::Exited { code: None });
        }

        // Never adopt a port that our own leftover child is answering on.
        let leftover = lock(&self.state).process.take();
        if let Some(link) = leftover {
            warn!(pid = ?link.pid, "Terminating leftover server process before starting");
            let code = link.terminate(Duration::ZERO).await;
            lock(&self.state).last_exit = code;
        }

        lock(&self.state).transition(ServerTransition::StartRequested);

        if probe_liveness(&self.http, &base_url, self.config.probe_timeout).await.is_ok() {
            info!("Adopting server already listening at {}", base_url);
            let mut state = lock(&self.state);
            state.external = true;
            state.transition(ServerTransition::BecameReady);
            return Ok(());
        }

        match self.spawn_and_wait(&base_url).await {
            Ok(()) => {
                lock(&self.state).transition(ServerTransition::BecameReady);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Server start failed");
                lock(&self.state).transition(ServerTransition::StartFailed);
                Err(e)
            }
        }
    }

    async fn resolve_executable(&self) -> Result<PathBuf, ServerError> {
        let cached = lock(&self.state).executable.clone();
        if let Some(path) = cached {
            return Ok(path);
        }
        let path = self.source.resolve().await?;
        debug!(path = %path.display(), "Resolved server executable");
        lock(&self.state).executable = Some(path.clone());
        Ok(path)
    }

    async fn spawn_and_wait(&self, base_url: &str) -> Result<(), ServerError> {
        let executable = self.resolve_executable().await?;

        let mut child = match self.spawn_child(&executable) {
            Ok(child) => child,
            Err(e) => {
                // Re-resolve next time; the file may have been removed.
                lock(&self.state).executable = None;
                return Err(ServerError::Spawn {
                    path: executable,
                    message: e.to_string(),
                });
            }
        };

        let pid = child.id();
        info!(pid = ?pid, port = %self.config.port, "Spawned server {}", executable.display());

        if let Some(stdout) = child.stdout.take() {
            spawn_stream_reader(stdout, "stdout", self.log_sink.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_stream_reader(stderr, "stderr", self.log_sink.clone());
        }

        let (exit_tx, exit_rx) = watch::channel(None);
        let (stop_tx, stop_rx) = oneshot::channel();
        let generation = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.generation
        };
        let watcher = tokio::spawn(watch_child(
            child,
            generation,
            stop_rx,
            exit_tx,
            Arc::downgrade(&self.state),
        ));
        lock(&self.state).process = Some(ProcessLink {
            generation,
            pid,
            stop_tx,
            watcher,
            exit_rx: exit_rx.clone(),
        });

        match wait_for_liveness(&self.http, base_url, self.config.health, Some(exit_rx)).await {
            Ok(_) => Ok(()),
            Err(LivenessFailure::ProcessExited { code, last_error }) => {
                let mut state = lock(&self.state);
                if state.process.as_ref().is_some_and(|l| l.generation == generation) {
                    state.process = None;
                }
                state.last_exit = code;
                Err(ServerError::ExitedDuringStartup { code, last_error })
            }
            Err(LivenessFailure::Exhausted { attempts, last_error }) => {
                warn!(attempts, "Server did not become ready, killing it");
                let link = {
                    let mut state = lock(&self.state);
                    match state.process.take() {
                        Some(link) if link.generation == generation => Some(link),
                        other => {
                            state.process = other;
                            None
                        }
                    }
                };
                if let Some(link) = link {
                    let code = link.terminate(Duration::ZERO).await;
                    lock(&self.state).last_exit = code;
                }
                Err(ServerError::StartTimeout { attempts, last_error })
            }
        }
    }

    fn spawn_child(&self, executable: &std::path::Path) -> std::io::Result<Child> {
        let mut cmd = Command::new(executable);
        cmd.arg("serve")
            .env(MODELS_ENV, &self.config.models_dir)
            .env(HOST_ENV, format!("127.0.0.1:{}", self.config.port))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group so terminal signals aimed at the host do not
        // reach the server directly.
        #[cfg(unix)]
        cmd.process_group(0);

        cmd.spawn()
    }

    /// Stop the server. Never fails; always converges to `Stopped`.
    ///
    /// A no-op unless the status is `Running`. An adopted external server
    /// is only forgotten, never signalled.
    pub async fn stop(&self) {
        if !self.is_running() {
            debug!("Stop requested while server is {}", self.status());
            return;
        }

        let _guard = self.lifecycle.lock().await;
        let link = {
            let mut state = lock(&self.state);
            if !state.status.is_running() {
                return;
            }
            state.transition(ServerTransition::StopRequested);
            if state.external {
                state.external = false;
                None
            } else {
                state.process.take()
            }
        };

        match link {
            None => info!("Releasing server at {}", self.base_url()),
            Some(link) => {
                info!(pid = ?link.pid, "Stopping server");
                let code = link.terminate(self.config.stop_timeout).await;
                lock(&self.state).last_exit = code;
            }
        }

        lock(&self.state).transition(ServerTransition::StopCompleted);
        info!("Server stopped");
    }
}

/// Own the child until it exits or a stop request arrives.
///
/// The watcher only holds a weak reference to the state, so dropping the
/// supervisor drops the stop sender, which kills the child.
async fn watch_child(
    mut child: Child,
    generation: u64,
    stop_rx: oneshot::Receiver<Duration>,
    exit_tx: watch::Sender<ExitCode>,
    state: Weak<Mutex<SupervisorState>>,
) {
    let result = tokio::select! {
        status = child.wait() => status,
        grace = stop_rx => shutdown_child(&mut child, grace.unwrap_or(Duration::ZERO)).await,
    };

    let code = match result {
        Ok(status) => status.code(),
        Err(e) => {
            warn!(error = %e, "Failed to reap server process");
            None
        }
    };
    exit_tx.send_replace(Some(code));

    let Some(state) = state.upgrade() else {
        debug!(code = ?code, "Server process exited after its supervisor was dropped");
        return;
    };
    let mut state = lock(&state);
    if state.process.as_ref().is_some_and(|l| l.generation == generation) {
        info!(code = ?code, "Server process exited");
        state.process = None;
        state.last_exit = code;
        state.transition(ServerTransition::Exited { code });
    }
}
