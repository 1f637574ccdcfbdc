//! MongoDB-backed [`GameStore`](crate::dao::game_store::GameStore).

mod config;
mod connection;
mod error;
mod models;
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoGameStore;

use crate::dao::storage::{StorageError, StorageResult};

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}

/// Parse `uri`, connect to `database` and make sure its indexes exist.
pub async fn connect(uri: &str, database: &str) -> StorageResult<MongoGameStore> {
    let config = MongoConfig::from_uri(uri, Some(database)).await?;
    Ok(MongoGameStore::connect(config).await?)
}
