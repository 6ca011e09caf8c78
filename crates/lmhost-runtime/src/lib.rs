//! Runtime adapters for lmhost.
//!
//! This crate does everything `lmhost-core` refuses to: it resolves and
//! downloads the server binary, spawns and supervises the server process,
//! and speaks the server's HTTP API for model pulls and generation.
//!
//! # Modules
//!
//! - [`binary`] - Binary provisioning (bundled copy, download, system lookup)
//! - [`process`] - Process supervision, health polling, graceful shutdown
//! - [`install`] - Model installation (local extraction, streamed pull)
//! - [`generate`] - Generation client (batch and streaming)
//! - [`engine`] - `LocalEngine` facade wiring everything together

pub mod api;
pub mod binary;
pub mod engine;
pub mod generate;
pub mod install;
pub mod ndjson;
pub mod process;

pub use binary::{BinaryProvisioner, Platform};
pub use engine::{LocalEngine, LocalEngineBuilder};
pub use generate::{GenerateOptions, GenerationChunk, GenerationClient};
pub use install::{ModelInstaller, PullPolicy};
pub use process::{HealthPolicy, ProcessSupervisor, SupervisorConfig};
