//! Script Loader
//!
//! Reads the YAML test script once at startup.

use std::path::Path;

use crate::error::{ScriptError, ScriptResult};
use crate::types::TestcaseConfig;

/// Read and parse the script at `path`
pub fn load_script(path: impl AsRef<Path>) -> ScriptResult<TestcaseConfig> {
    let path = path.as_ref();
    log::info!("Loading test script from: {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let config = parse_script(&content)?;
    log::info!(
        "Test script loaded: SUPI={}, {} testcases",
        config.supi,
        config.len()
    );
    Ok(config)
}

/// Parse a script document
pub fn parse_script(content: &str) -> ScriptResult<TestcaseConfig> {
    let config: TestcaseConfig = serde_yaml::from_str(content)?;
    if config.supi.is_empty() {
        return Err(ScriptError::MissingSupi);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OffsetPatch;

    const SCRIPT: &str = r#"
supi: imsi-001010000000001
testcases:
  - id: 1
    result: true
    plain: true
    msg_type: 93
  - id: 2
    result: false
    plain: false
    integrity: "0"
    ciphering: "3"
    mac: deadbeef
    msg_type: 93
    offsets:
      - offset: 14
        value: "ff"
      - offset: 16
        value: "00"
"#;

    #[test]
    fn test_parse_script() {
        let config = parse_script(SCRIPT).unwrap();
        assert_eq!(config.supi, "imsi-001010000000001");
        assert_eq!(config.len(), 2);

        let first = &config.testcases[0];
        assert!(first.plain);
        assert!(first.result);
        assert!(!first.has_overrides());

        let second = &config.testcases[1];
        assert_eq!(second.integrity.as_deref(), Some("0"));
        assert_eq!(second.ciphering.as_deref(), Some("3"));
        assert_eq!(second.mac.as_deref(), Some("deadbeef"));
        assert_eq!(
            second.offsets,
            vec![OffsetPatch::new(14, "ff"), OffsetPatch::new(16, "00")]
        );
    }

    #[test]
    fn test_parse_script_unquoted_hex_values() {
        let config = parse_script(
            "supi: imsi-1\ntestcases:\n  - id: 3\n    integrity: 2\n    mac: 12345678\n    msg_type: 93\n    offsets:\n      - offset: 8\n        value: 99\n",
        )
        .unwrap();
        let tc = &config.testcases[0];
        assert_eq!(tc.integrity.as_deref(), Some("2"));
        assert_eq!(tc.mac.as_deref(), Some("12345678"));
        assert_eq!(tc.offsets[0].value, "99");
    }

    #[test]
    fn test_parse_script_unquoted_leading_zeros_stay_text() {
        let config = parse_script(
            "supi: imsi-1\ntestcases:\n  - id: 4\n    mac: 00000000\n    msg_type: 93\n    offsets:\n      - offset: 4\n        value: 0042\n",
        )
        .unwrap();
        let tc = &config.testcases[0];
        assert_eq!(tc.mac.as_deref(), Some("00000000"));
        assert_eq!(tc.offsets[0].value, "0042");
    }

    #[test]
    fn test_sample_script() {
        let config = parse_script(include_str!("../../../../configs/testcases.yaml")).unwrap();
        assert_eq!(config.len(), 3);
        assert_eq!(config.testcases[1].mac.as_deref(), Some("00000000"));
        assert_eq!(config.testcases[2].offsets[0].offset, 12);
    }

    #[test]
    fn test_parse_script_without_testcases() {
        let config = parse_script("supi: imsi-001010000000001\n").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_parse_script_rejects_empty_supi() {
        let err = parse_script("supi: \"\"\ntestcases: []\n").unwrap_err();
        assert!(matches!(err, ScriptError::MissingSupi));
    }

    #[test]
    fn test_parse_script_rejects_wide_msg_type() {
        let err = parse_script("supi: imsi-1\ntestcases:\n  - id: 1\n    msg_type: 300\n")
            .unwrap_err();
        assert!(matches!(err, ScriptError::Parse(_)));
    }

    #[test]
    fn test_load_script_missing_file() {
        let err = load_script("/nonexistent/testcases.yaml").unwrap_err();
        assert!(matches!(err, ScriptError::Io { .. }));
    }
}
