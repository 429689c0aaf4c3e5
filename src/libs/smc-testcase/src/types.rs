//! Testcase Types
//!
//! Script structures as loaded from YAML, and the result record persisted
//! after every completed testcase cycle.

use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Script
// ============================================================================

/// Loaded test script. Immutable after load; testcases are only read by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestcaseConfig {
    /// Subscriber identity sent verbatim in the first protocol step
    pub supi: String,
    /// Ordered testcase list
    #[serde(default)]
    pub testcases: Vec<Testcase>,
}

impl TestcaseConfig {
    /// Create a script from a SUPI and testcase list
    pub fn new(supi: impl Into<String>, testcases: Vec<Testcase>) -> Self {
        Self {
            supi: supi.into(),
            testcases,
        }
    }

    /// Bounds-checked testcase lookup
    pub fn testcase(&self, index: usize) -> Option<&Testcase> {
        self.testcases.get(index)
    }

    /// Look up a testcase by its script id
    pub fn find_by_id(&self, id: u32) -> Option<&Testcase> {
        self.testcases.iter().find(|tc| tc.id == id)
    }

    /// Number of testcases in the script
    pub fn len(&self) -> usize {
        self.testcases.len()
    }

    /// True if the script has no testcases
    pub fn is_empty(&self) -> bool {
        self.testcases.is_empty()
    }
}

// ============================================================================
// Testcase
// ============================================================================

/// A single testcase: expected message type, protection flag and the
/// overrides to apply to the captured Security Mode Command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Testcase {
    /// Script-assigned testcase id
    pub id: u32,
    /// Expected verdict, recorded for grading only
    #[serde(default)]
    pub result: bool,
    /// Send the message as plain NAS (true) or protected (false)
    #[serde(default)]
    pub plain: bool,
    /// Integrity algorithm nibble override
    #[serde(
        default,
        deserialize_with = "opt_hex_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub integrity: Option<String>,
    /// Ciphering algorithm nibble override
    #[serde(
        default,
        deserialize_with = "opt_hex_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub ciphering: Option<String>,
    /// MAC override; only applied when it is exactly 8 hex characters
    #[serde(
        default,
        deserialize_with = "opt_hex_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub mac: Option<String>,
    /// NAS message type the UE must announce for this testcase
    pub msg_type: u8,
    /// Arbitrary patches, applied in script order
    #[serde(default)]
    pub offsets: Vec<OffsetPatch>,
}

impl Testcase {
    /// Create a testcase with no overrides
    pub fn new(id: u32, msg_type: u8, plain: bool) -> Self {
        Self {
            id,
            msg_type,
            plain,
            ..Default::default()
        }
    }

    /// Set the ciphering nibble override
    pub fn with_ciphering(mut self, value: impl Into<String>) -> Self {
        self.ciphering = Some(value.into());
        self
    }

    /// Set the integrity nibble override
    pub fn with_integrity(mut self, value: impl Into<String>) -> Self {
        self.integrity = Some(value.into());
        self
    }

    /// Set the MAC override
    pub fn with_mac(mut self, mac: impl Into<String>) -> Self {
        self.mac = Some(mac.into());
        self
    }

    /// Append an offset patch
    pub fn with_offset(mut self, offset: usize, value: impl Into<String>) -> Self {
        self.offsets.push(OffsetPatch::new(offset, value));
        self
    }

    /// True if the testcase carries no override of any kind
    pub fn has_overrides(&self) -> bool {
        self.integrity.is_some()
            || self.ciphering.is_some()
            || self.mac.is_some()
            || !self.offsets.is_empty()
    }
}

/// Replace `value.len()` hex characters of the hex-encoded message starting
/// at hex index `offset`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetPatch {
    /// Index into the hex rendering of the message (nibble index)
    pub offset: usize,
    /// Replacement hex characters
    #[serde(deserialize_with = "hex_scalar")]
    pub value: String,
}

impl OffsetPatch {
    pub fn new(offset: usize, value: impl Into<String>) -> Self {
        Self {
            offset,
            value: value.into(),
        }
    }
}

// ============================================================================
// Hex scalars
// ============================================================================

/// Hex fields are usually written unquoted (`integrity: 2`, `mac: 12345678`),
/// which YAML reads as integers. Accept both and keep the text form.
#[derive(Deserialize)]
#[serde(untagged)]
enum HexScalar {
    Text(String),
    Number(u64),
}

impl From<HexScalar> for String {
    fn from(scalar: HexScalar) -> Self {
        match scalar {
            HexScalar::Text(s) => s,
            HexScalar::Number(n) => n.to_string(),
        }
    }
}

fn hex_scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    HexScalar::deserialize(deserializer).map(String::from)
}

fn opt_hex_scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<HexScalar>::deserialize(deserializer).map(|v| v.map(String::from))
}

// ============================================================================
// Result
// ============================================================================

/// Outcome of one completed testcase cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestcaseResult {
    /// Response message type reported by the UE
    pub response_type: u8,
    /// Snapshot of the testcase that produced this response
    pub test_case: Testcase,
    /// RFC 3339 UTC time the result was recorded
    pub recorded_at: String,
}

impl TestcaseResult {
    /// Build a result stamped with the current time
    pub fn new(response_type: u8, test_case: Testcase) -> Self {
        Self {
            response_type,
            test_case,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> TestcaseConfig {
        TestcaseConfig::new(
            "imsi-001010000000001",
            vec![Testcase::new(1, 93, true), Testcase::new(7, 93, false).with_mac("deadbeef")],
        )
    }

    #[test]
    fn test_testcase_lookup_in_bounds() {
        let config = sample_config();
        assert_eq!(config.len(), 2);
        assert_eq!(config.testcase(1).map(|tc| tc.id), Some(7));
    }

    #[test]
    fn test_testcase_lookup_out_of_bounds() {
        let config = sample_config();
        assert!(config.testcase(2).is_none());
        assert!(config.testcase(usize::MAX).is_none());
    }

    #[test]
    fn test_find_by_id() {
        let config = sample_config();
        assert_eq!(config.find_by_id(7).and_then(|tc| tc.mac.as_deref()), Some("deadbeef"));
        assert!(config.find_by_id(3).is_none());
    }

    #[test]
    fn test_has_overrides() {
        assert!(!Testcase::new(1, 93, true).has_overrides());
        assert!(Testcase::new(1, 93, true).with_offset(30, "ff").has_overrides());
        assert!(Testcase::new(1, 93, true).with_integrity("2").has_overrides());
    }

    #[test]
    fn test_result_snapshot_field_names() {
        let result = TestcaseResult::new(9, Testcase::new(4, 5, true));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["response_type"], 9);
        assert_eq!(json["test_case"]["id"], 4);
        assert_eq!(json["test_case"]["msg_type"], 5);
        assert!(json["test_case"].get("mac").is_none());
        assert!(!result.recorded_at.is_empty());
    }
}
