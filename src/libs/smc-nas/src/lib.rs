//! SMC Tester NAS Mutation Library
//!
//! Applies a testcase's field overrides and offset patches to a captured
//! NAS Security Mode Command before it is handed back to the UE.
//!
//! Patches address the message by nibble (one hex character of its lowercase
//! hex rendering). A testcase is first compiled into a [`PatchPlan`], an
//! ordered list of `(start, nibbles)` replacements, which is then applied to a
//! copy of the message bytes with a bounds check before every replacement.
//!
//! # Example
//!
//! ```rust
//! use smc_nas::{mutate_message, MutationLayout};
//! use smc_testcase::Testcase;
//!
//! let tc = Testcase::new(1, 93, false).with_mac("deadbeef");
//! let msg = [0x7e, 0x03, 0, 0, 0, 0, 0x01, 0x7e];
//! let out = mutate_message(&msg, &tc, &MutationLayout::default()).unwrap();
//! assert_eq!(out, [0x7e, 0x03, 0xde, 0xad, 0xbe, 0xef, 0x01, 0x7e]);
//! ```

pub mod error;
pub mod layout;
pub mod mutate;

#[cfg(test)]
mod property_tests;

pub use error::{MutationError, MutationResult, PatchSource};
pub use layout::MutationLayout;
pub use mutate::{mutate_message, to_hex, NibblePatch, PatchPlan};
