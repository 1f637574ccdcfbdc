use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tracing::debug;

use super::error::{MongoDaoError, MongoResult};

/// Upper bound of a single connection attempt. Retries belong to the storage supervisor.
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(3);
const APP_NAME: &str = "quiz-live-back";

/// Build a client for `options` and check that `database_name` answers a ping.
pub async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
) -> MongoResult<(Client, Database)> {
    let mut options = options.clone();
    options
        .server_selection_timeout
        .get_or_insert(SERVER_SELECTION_TIMEOUT);
    options.app_name.get_or_insert_with(|| APP_NAME.to_owned());

    let client = Client::with_options(options)
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);

    database
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|source| MongoDaoError::InitialPing {
            database: database_name.to_owned(),
            source,
        })?;
    debug!(database = database_name, "MongoDB answered the initial ping");

    Ok((client, database))
}
