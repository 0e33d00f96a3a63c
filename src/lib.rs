//! Verification harness for external build tools.
//!
//! Drives a build tool as a subprocess against a scratch tree and checks
//! that it produced exactly the declared filesystem and console effects.
//! [`harness::Tester`] is the entry point for test code; the lower-level
//! modules are usable on their own.

pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod diffing;
pub mod dir_list;
pub mod error;
pub mod expect;
pub mod fingerprint;
pub mod harness;
pub mod lines;
pub mod names;
pub mod pattern;
pub mod process;
pub mod snapshot;
mod util;

pub use error::{AssertionFailure, HarnessError, Result};
pub use harness::{DiagnosticsSink, MatchMode, RunOptions, Tester, TesterOptions};
