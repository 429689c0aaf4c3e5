//! MongoDB Interface
//!
//! Connection settings and connection setup for the result database.

use mongodb::{
    bson::doc,
    options::ClientOptions,
    Client, Database,
};
use thiserror::Error;

/// Default MongoDB URI
pub const DEFAULT_DB_URI: &str = "mongodb://localhost:27017/";
/// Default database name
pub const DEFAULT_DATABASE: &str = "5g-tester";
/// Default result collection name
pub const DEFAULT_COLLECTION: &str = "testcases";

/// Database interface error types
#[derive(Error, Debug)]
pub enum DbiError {
    #[error("MongoDB error: {0}")]
    MongoDb(#[from] mongodb::error::Error),
    #[error("No database URI provided")]
    NoDbUri,
    #[error("Failed to connect to server [{uri}]: {reason}")]
    Unreachable { uri: String, reason: String },
}

/// Result type for database operations
pub type DbiResult<T> = Result<T, DbiError>;

/// Where results are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoConfig {
    /// MongoDB connection URI
    pub uri: String,
    /// Database name
    pub database: String,
    /// Collection receiving one document per testcase cycle
    pub collection: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_DB_URI.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

/// Mask credentials in database URI for logging
pub fn masked_db_uri(db_uri: &str) -> String {
    if let Some(at_pos) = db_uri.find('@') {
        let host_part = &db_uri[at_pos + 1..];
        format!("mongodb://*****:*****@{host_part}")
    } else {
        db_uri.to_string()
    }
}

/// Connect and ping.
///
/// A failed ping is reported as [`DbiError::Unreachable`]: the tester treats
/// an unreachable result store as a startup failure.
pub async fn connect(config: &MongoConfig) -> DbiResult<Database> {
    if config.uri.is_empty() {
        log::error!("No DB_URI");
        return Err(DbiError::NoDbUri);
    }

    let masked = masked_db_uri(&config.uri);
    let mut client_options = ClientOptions::parse(&config.uri).await?;
    client_options.app_name = Some("smc-testerd".to_string());

    let client = Client::with_options(client_options)?;
    let database = client.database(&config.database);

    match database.run_command(doc! { "ping": 1 }, None).await {
        Ok(_) => {
            log::info!("MongoDB URI: '{}' (database '{}')", masked, config.database);
            Ok(database)
        }
        Err(e) => {
            log::warn!("Failed to connect to server [{}]: {}", masked, e);
            Err(DbiError::Unreachable {
                uri: masked,
                reason: e.to_string(),
            })
        }
    }
}
