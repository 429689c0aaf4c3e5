//! SMC Tester Daemon Library
//!
//! Fault-injection driver for the NAS Security Mode Command procedure. The UE
//! under test connects over plain TCP once per step; the tester hands it the
//! subscriber identity, checks the message type it is about to protect,
//! patches the captured Security Mode Command as the current testcase
//! prescribes and records the UE's response. The AMF is steered out of band
//! over its SBI interface.

pub mod config;
pub mod control;
pub mod driver;
pub mod tester_sm;

pub use config::{AmfSbiConfig, ControlConfig, DbConfig, RetryConfig, TesterConfig};
pub use control::{
    ControlChannel, ControlDispatcher, ControlJob, ControlPolicy, ControlSignal, SbiControlChannel,
};
pub use driver::{Driver, RunSummary};
pub use tester_sm::{
    AbortReason, DriverState, RetryPolicy, TesterEvent, TesterSm, TesterState, Transition,
};
