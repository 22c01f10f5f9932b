//! hubprobe - diagnostic probes for the hosted friends and game-room functions
//!
//! The `manage-friends` and `manage-game-rooms` edge functions own all of
//! the business logic; this crate only sends them requests, reads the JSON
//! envelopes that come back and explains what went wrong.
//!
//! # Usage
//!
//! ```rust,ignore
//! use hubprobe::{ProbeConfig, ProbeContext, Suite};
//!
//! let mut config = ProbeConfig::load()?;
//! config.apply_env()?;
//! let ctx = ProbeContext::new(&config)?;
//! let report = Suite::Rooms.run(&ctx).await;
//! std::process::exit(report.exit_code());
//! ```

pub mod actions;
pub mod client;
pub mod config;
pub mod diagnosis;
pub mod envelope;
pub mod error;
pub mod report;
pub mod suites;

#[cfg(test)]
mod testing;

pub use client::{FunctionsClient, ProbeResponse, RemoteFunction};
pub use config::{Fixtures, ProbeConfig};
pub use diagnosis::Diagnosis;
pub use envelope::Envelope;
pub use error::{ProbeError, Result};
pub use report::{CheckResult, ExitPolicy, RunSummary, SuiteReport, Verdict};
pub use suites::{ProbeContext, Suite};
