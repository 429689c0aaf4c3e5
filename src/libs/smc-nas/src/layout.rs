//! Security Mode Command field layout
//!
//! Nibble positions of the fields a testcase can override, counted in hex
//! characters from the start of the message. The defaults address a
//! security-protected 5GMM Security Mode Command:
//!
//! ```text
//! byte  0      EPD
//! byte  1      security header type
//! bytes 2..6   MAC                      (nibbles 4..12)
//! byte  6      sequence number
//! ...
//! byte 10      selected NAS security algorithms
//!              high nibble: ciphering   (nibble 20)
//!              low nibble:  integrity   (nibble 21)
//! ```

use serde::{Deserialize, Serialize};

/// Default ciphering algorithm nibble index
pub const DEFAULT_CIPHERING_NIBBLE: usize = 20;
/// Default integrity algorithm nibble index
pub const DEFAULT_INTEGRITY_NIBBLE: usize = 21;
/// Default MAC start nibble index
pub const DEFAULT_MAC_NIBBLE: usize = 4;
/// MAC length in nibbles
pub const DEFAULT_MAC_LEN: usize = 8;

/// Override field positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationLayout {
    /// Nibble replaced by the ciphering override
    pub ciphering_nibble: usize,
    /// Nibble replaced by the integrity override
    pub integrity_nibble: usize,
    /// First nibble replaced by the MAC override
    pub mac_nibble: usize,
    /// Required MAC override length; other lengths are ignored
    pub mac_len: usize,
}

impl Default for MutationLayout {
    fn default() -> Self {
        Self {
            ciphering_nibble: DEFAULT_CIPHERING_NIBBLE,
            integrity_nibble: DEFAULT_INTEGRITY_NIBBLE,
            mac_nibble: DEFAULT_MAC_NIBBLE,
            mac_len: DEFAULT_MAC_LEN,
        }
    }
}
