//! SMC Tester Database Interface Library
//!
//! Append-only persistence of testcase results. The tester only ever
//! inserts; results are read back by the grading tooling, not by this crate.

pub mod mongoc;
pub mod result_store;

// Re-export the mongodb crate for consumers that need direct collection access
pub use mongodb;

pub use mongoc::{masked_db_uri, DbiError, DbiResult, MongoConfig, DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_DB_URI};
pub use result_store::{MemoryResultStore, MongoResultStore, ResultSink};
