//! Target jobs and their orchestration.
//!
//! The [`Pipeline`] fans the resolved release out over the target matrix:
//! one job per [`BuildTarget`](crate::bundler::BuildTarget), each of which
//!
//! 1. compiles the binary (unless `--skip-build`)
//! 2. stages the platform-shaped bundle
//! 3. packages it (signing and notarizing on macOS)
//! 4. collects the packages from its `out/` directory
//!
//! and fans the outcomes back into one [`PipelineReport`].
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_matrix::bundler::{Pipeline, Settings, default_matrix};
//!
//! # async fn example(settings: Settings) {
//! let report = Pipeline::new(settings, default_matrix()).run().await;
//! for outcome in report.targets() {
//!     println!("{}: {}", outcome.target, outcome.status);
//! }
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`checksum`] - SHA-256 of collected packages
//! - [`job`] - one target job
//! - [`orchestrator`] - [`Pipeline`] fan-out/fan-in and the report types
//! - [`signing`] - macOS credential loading
//! - [`tool_detection`] - external tool preflight

pub mod checksum;
pub mod job;
pub mod orchestrator;
pub mod signing;
pub mod tool_detection;

pub use checksum::calculate_sha256;
pub use orchestrator::{Pipeline, PipelineReport, PipelineStatus, TargetOutcome, TargetStatus};
pub use signing::{MacCredentials, NotarizationAuth, SigningCredentials, load_mac_credentials};
pub use tool_detection::preflight;
