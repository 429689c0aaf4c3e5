//! SMC Tester Mock UDM Library
//!
//! Read-only SBI service exposing the tester's script to the AMF under test,
//! plus its one-time NRF registration.

pub mod nudm_handler;
pub mod sbi_path;

pub use nudm_handler::{udm_sbi_request_handler, NUDM_TC};
pub use sbi_path::{nf_profile, udm_nrf_register};
