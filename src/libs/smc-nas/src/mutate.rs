//! Security Mode Command mutation
//!
//! Patches are applied in a fixed order: ciphering nibble, integrity nibble,
//! MAC, then offset patches in script order. Each patch sees the output of
//! the previous ones, so overlapping patches resolve last-write-wins.

use smc_testcase::Testcase;

use crate::error::{MutationError, MutationResult, PatchSource};
use crate::layout::MutationLayout;

// ============================================================================
// Patch plan
// ============================================================================

/// Replace `nibbles.len()` nibbles starting at nibble index `start`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NibblePatch {
    /// First nibble replaced (hex character index)
    pub start: usize,
    /// Replacement nibble values, each 0..=15
    pub nibbles: Vec<u8>,
    /// Testcase field this patch came from
    pub source: PatchSource,
}

impl NibblePatch {
    /// Number of nibbles replaced
    pub fn len(&self) -> usize {
        self.nibbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nibbles.is_empty()
    }
}

/// Ordered patch list compiled from one testcase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPlan {
    testcase_id: u32,
    patches: Vec<NibblePatch>,
}

impl PatchPlan {
    /// Compile a testcase into its patch list.
    ///
    /// Fails on an override that is not a single hex digit or on patch text
    /// containing non-hex characters. Bounds are checked at apply time, since
    /// they depend on the captured message.
    pub fn compile(testcase: &Testcase, layout: &MutationLayout) -> MutationResult<Self> {
        let id = testcase.id;
        let mut patches = Vec::with_capacity(3 + testcase.offsets.len());

        if let Some(ref value) = testcase.ciphering {
            patches.push(single_nibble(id, PatchSource::Ciphering, layout.ciphering_nibble, value)?);
        }
        if let Some(ref value) = testcase.integrity {
            patches.push(single_nibble(id, PatchSource::Integrity, layout.integrity_nibble, value)?);
        }
        if let Some(ref mac) = testcase.mac {
            if mac.len() == layout.mac_len {
                patches.push(NibblePatch {
                    start: layout.mac_nibble,
                    nibbles: parse_nibbles(id, PatchSource::Mac, mac)?,
                    source: PatchSource::Mac,
                });
            } else {
                log::debug!(
                    "Testcase {}: ignoring MAC override {:?} (need {} hex characters)",
                    id,
                    mac,
                    layout.mac_len
                );
            }
        }
        for (i, offset) in testcase.offsets.iter().enumerate() {
            let source = PatchSource::Offset(i);
            patches.push(NibblePatch {
                start: offset.offset,
                nibbles: parse_nibbles(id, source, &offset.value)?,
                source,
            });
        }

        Ok(Self {
            testcase_id: id,
            patches,
        })
    }

    /// Apply the plan to a copy of `message`
    pub fn apply(&self, message: &[u8]) -> MutationResult<Vec<u8>> {
        let mut buf = message.to_vec();
        let available = buf.len() * 2;

        for patch in &self.patches {
            let end = patch.start.checked_add(patch.len()).unwrap_or(usize::MAX);
            if end > available {
                return Err(MutationError::OutOfRange {
                    testcase_id: self.testcase_id,
                    field: patch.source,
                    start: patch.start,
                    end,
                    available,
                });
            }
            for (i, &nibble) in patch.nibbles.iter().enumerate() {
                set_nibble(&mut buf, patch.start + i, nibble);
            }
        }

        Ok(buf)
    }

    pub fn patches(&self) -> &[NibblePatch] {
        &self.patches
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

/// Compile `testcase` and apply it to `message`
pub fn mutate_message(
    message: &[u8],
    testcase: &Testcase,
    layout: &MutationLayout,
) -> MutationResult<Vec<u8>> {
    PatchPlan::compile(testcase, layout)?.apply(message)
}

/// Lowercase hex rendering, the addressing space of every patch
pub fn to_hex(message: &[u8]) -> String {
    hex::encode(message)
}

// ============================================================================
// Helpers
// ============================================================================

fn single_nibble(
    testcase_id: u32,
    source: PatchSource,
    start: usize,
    value: &str,
) -> MutationResult<NibblePatch> {
    if value.chars().count() != 1 {
        return Err(MutationError::InvalidFieldOverride {
            testcase_id,
            field: source,
            value: value.to_string(),
        });
    }
    Ok(NibblePatch {
        start,
        nibbles: parse_nibbles(testcase_id, source, value)?,
        source,
    })
}

fn parse_nibbles(testcase_id: u32, source: PatchSource, text: &str) -> MutationResult<Vec<u8>> {
    text.chars()
        .enumerate()
        .map(|(position, ch)| {
            ch.to_digit(16)
                .map(|d| d as u8)
                .ok_or(MutationError::InvalidHexDigit {
                    testcase_id,
                    field: source,
                    ch,
                    position,
                })
        })
        .collect()
}

/// Even nibble index is the high half of the byte
fn set_nibble(buf: &mut [u8], index: usize, value: u8) {
    let byte = &mut buf[index / 2];
    if index % 2 == 0 {
        *byte = (*byte & 0x0f) | (value << 4);
    } else {
        *byte = (*byte & 0xf0) | (value & 0x0f);
    }
}
