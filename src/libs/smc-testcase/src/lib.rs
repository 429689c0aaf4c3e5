//! SMC Tester Testcase Library
//!
//! In-memory model of the Security Mode Command test script: one subscriber
//! identity plus an ordered list of testcases, each describing how a captured
//! NAS message is to be patched before it is sent back to the UE under test.
//!
//! # Modules
//!
//! - [`types`] - Script, testcase, offset patch and result structures
//! - [`loader`] - YAML script loading
//! - [`error`] - Error types

pub mod error;
pub mod loader;
pub mod types;

pub use error::{ScriptError, ScriptResult};
pub use loader::{load_script, parse_script};
pub use types::{OffsetPatch, Testcase, TestcaseConfig, TestcaseResult};
