//! SMC Tester SBI (Service Based Interface) Library
//!
//! Cleartext HTTP/2 with prior knowledge (h2c), the transport the AMF under
//! test exposes for its test-control callbacks and the one the mock
//! subscriber-data service serves on.
//!
//! # Example
//!
//! ```rust,no_run
//! use smc_sbi::SbiClient;
//!
//! async fn example() {
//!     let client = SbiClient::with_host_port("127.0.0.5", 7777);
//!     let response = client.get("/testcase-enable/v1/true").await;
//! }
//! ```
//!
//! # Modules
//!
//! - [`constants`] - HTTP status codes, methods and headers
//! - [`message`] - Request, response and problem details structures
//! - [`client`] - HTTP/2 client
//! - [`server`] - HTTP/2 server
//! - [`error`] - Error types

pub mod constants;
pub mod error;
pub mod message;

pub mod client;
pub mod server;

pub use client::{SbiClient, SbiClientConfig};
pub use error::{SbiError, SbiResult};
pub use message::{ProblemDetails, SbiHeader, SbiHttpMessage, SbiRequest, SbiResponse};
pub use server::{
    send_bad_request, send_error, send_method_not_allowed, send_not_found, SbiRequestHandler,
    SbiServer, SbiServerConfig,
};
