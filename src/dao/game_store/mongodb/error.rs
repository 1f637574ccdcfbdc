use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB database `{database}` did not answer the initial ping")]
    InitialPing {
        database: String,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save quiz `{id}`")]
    SaveQuiz {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load quiz `{id}`")]
    LoadQuiz {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete quiz `{id}`")]
    DeleteQuiz {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list quizzes")]
    ListQuizzes {
        #[source]
        source: MongoError,
    },
    #[error("failed to save game record `{id}`")]
    SaveGameRecord {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load game record `{id}`")]
    LoadGameRecord {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list game records")]
    ListGameRecords {
        #[source]
        source: MongoError,
    },
}
