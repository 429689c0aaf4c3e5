//! Mutation error types

use std::fmt;

use thiserror::Error;

/// Which part of a testcase produced a patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchSource {
    /// Ciphering algorithm nibble
    Ciphering,
    /// Integrity algorithm nibble
    Integrity,
    /// Message authentication code
    Mac,
    /// Offset patch, by position in the script list
    Offset(usize),
}

impl fmt::Display for PatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchSource::Ciphering => write!(f, "ciphering"),
            PatchSource::Integrity => write!(f, "integrity"),
            PatchSource::Mac => write!(f, "MAC"),
            PatchSource::Offset(i) => write!(f, "offset patch #{}", i),
        }
    }
}

/// Mutation error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    /// A single-nibble field override is not exactly one character
    #[error("Testcase {testcase_id}: {field} override must be a single hex digit, got {value:?}")]
    InvalidFieldOverride {
        testcase_id: u32,
        field: PatchSource,
        value: String,
    },

    /// Patch text contains a non-hex character
    #[error("Testcase {testcase_id}: invalid hex digit {ch:?} at position {position} of {field}")]
    InvalidHexDigit {
        testcase_id: u32,
        field: PatchSource,
        ch: char,
        position: usize,
    },

    /// Patch reaches past the end of the message
    #[error("Testcase {testcase_id}: {field} covers hex range {start}..{end} but message has {available} hex characters")]
    OutOfRange {
        testcase_id: u32,
        field: PatchSource,
        start: usize,
        end: usize,
        available: usize,
    },
}

impl MutationError {
    /// Script fault: the testcase cannot be applied to this message
    pub fn is_malformed_testcase(&self) -> bool {
        matches!(
            self,
            Self::InvalidFieldOverride { .. } | Self::OutOfRange { .. }
        )
    }

    /// Hex codec fault in a patch value
    pub fn is_codec_error(&self) -> bool {
        matches!(self, Self::InvalidHexDigit { .. })
    }

    /// Id of the testcase that failed
    pub fn testcase_id(&self) -> u32 {
        match self {
            Self::InvalidFieldOverride { testcase_id, .. }
            | Self::InvalidHexDigit { testcase_id, .. }
            | Self::OutOfRange { testcase_id, .. } => *testcase_id,
        }
    }
}

/// Result type for mutation operations
pub type MutationResult<T> = Result<T, MutationError>;
