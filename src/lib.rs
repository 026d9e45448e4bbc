//! nginx-forge - generates nginx configuration from a declarative document.
//!
//! A single TOML document (JSON and YAML work too) describes http and stream
//! upstreams, http/stream/mail servers and their TLS bindings. nginx-forge turns it
//! into one nginx include file per entity, grouped in category directories:
//!
//! ```text
//! <output>/http_upstream.d/<name>.conf
//! <output>/http_server.d/<server_name>.conf
//! <output>/stream_upstream.d/<name>.conf
//! <output>/stream_server.d/<name>.conf
//! <output>/http_default.d/default.conf
//! <output>/mail_server.d/<name>.conf
//! ```
//!
//! # Features
//! - Plaintext, TLS-only and redirect-to-TLS http servers with HTTP/2 and IPv6 toggles
//! - Synthesized `/` location (static root or reverse proxy) plus ordered custom locations
//! - HSTS, websocket upgrade and request body size blocks
//! - Stream servers with independent plaintext and TLS halves
//! - Catch-all default servers rejecting unknown hosts on every used port
//! - SMTP proxy listeners (implicit TLS or STARTTLS)
//! - Collect-then-report validation: one run lists every problem in the document
//! - Stale artifact cleanup and a periodic reload worker
//!
//! # Quick Example
//! ```no_run
//! use nginx_forge::{
//!     adapters::LocalFileSystem,
//!     config::load_config,
//!     core::{Orchestrator, OutputLayout},
//! };
//!
//! # fn main() -> eyre::Result<()> {
//! let config = load_config("/config/nginx.toml")?;
//! let orchestrator = Orchestrator::new(LocalFileSystem::new(), OutputLayout::new("/data/nginx"));
//! let report = orchestrator.run(&config)?;
//! println!("{} artifacts written", report.written());
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations) while keeping
//! the generation logic inside `core`. Generators are pure functions of one entity plus the
//! document defaults; only the orchestrator touches the filesystem, through the
//! [`ports::file_system::ArtifactStore`] port.
//!
//! # Error Handling
//! Library APIs return domain specific `thiserror` types; the binary reports them through
//! `eyre`. Problems with a single entity never abort a run, they are logged and counted in
//! the [`core::GenerationReport`].
//!
//! # Concurrency
//! Generation is synchronous and sequential. Concurrent runs against the same output
//! directory are not supported. The compiled template cache is a process-wide
//! `scc::HashMap`.
pub mod config;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{LocalFileSystem, ScriptReloader},
    config::{Config, load_config},
    core::{GenerationReport, Orchestrator, OutputLayout},
    utils::{GracefulShutdown, ReloadWorker},
};
