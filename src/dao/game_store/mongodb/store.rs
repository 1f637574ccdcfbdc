use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Client, Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoGameRecordDocument, MongoQuizDocument, doc_id},
};
use crate::dao::{
    game_store::GameStore,
    models::{GameRecordEntity, GameRecordListItemEntity, QuizEntity},
    storage::StorageResult,
};

const QUIZ_COLLECTION_NAME: &str = "quizzes";
const HISTORY_COLLECTION_NAME: &str = "game_history";

#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    // Kept so the client outlives every database handle cloned from it.
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let quizzes = self.quiz_collection().await;
        let quiz_index = mongodb::IndexModel::builder()
            .keys(doc! {"created_at": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("quiz_created_idx".to_owned()))
                    .build(),
            )
            .build();
        quizzes
            .create_index(quiz_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: QUIZ_COLLECTION_NAME,
                index: "created_at",
                source,
            })?;

        let history = self.history_collection().await;
        let history_index = mongodb::IndexModel::builder()
            .keys(doc! {"pin": 1, "finished_at": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("history_pin_idx".to_owned()))
                    .build(),
            )
            .build();
        history
            .create_index(history_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: HISTORY_COLLECTION_NAME,
                index: "pin,finished_at",
                source,
            })?;

        Ok(())
    }

    async fn quiz_collection(&self) -> Collection<MongoQuizDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoQuizDocument>(QUIZ_COLLECTION_NAME)
    }

    async fn history_collection(&self) -> Collection<MongoGameRecordDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoGameRecordDocument>(HISTORY_COLLECTION_NAME)
    }

    async fn save_quiz(&self, quiz: QuizEntity) -> MongoResult<()> {
        let id = quiz.id;
        let document: MongoQuizDocument = quiz.into();
        self.quiz_collection()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveQuiz { id, source })?;
        Ok(())
    }

    async fn find_quiz(&self, id: Uuid) -> StorageResult<Option<QuizEntity>> {
        let document = self
            .quiz_collection()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadQuiz { id, source })?;

        document.map(QuizEntity::try_from).transpose()
    }

    async fn list_quizzes(&self) -> StorageResult<Vec<QuizEntity>> {
        let documents: Vec<MongoQuizDocument> = self
            .quiz_collection()
            .await
            .find(doc! {})
            .sort(doc! {"created_at": -1})
            .await
            .map_err(|source| MongoDaoError::ListQuizzes { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListQuizzes { source })?;

        documents.into_iter().map(QuizEntity::try_from).collect()
    }

    async fn delete_quiz(&self, id: Uuid) -> MongoResult<bool> {
        let result = self
            .quiz_collection()
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeleteQuiz { id, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn save_game_record(&self, record: GameRecordEntity) -> MongoResult<()> {
        let id = record.id;
        let document: MongoGameRecordDocument = record.into();
        self.history_collection()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveGameRecord { id, source })?;
        Ok(())
    }

    async fn find_game_record(&self, id: Uuid) -> StorageResult<Option<GameRecordEntity>> {
        let document = self
            .history_collection()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadGameRecord { id, source })?;

        document.map(GameRecordEntity::try_from).transpose()
    }

    async fn list_game_records(&self) -> StorageResult<Vec<GameRecordListItemEntity>> {
        let documents: Vec<MongoGameRecordDocument> = self
            .history_collection()
            .await
            .find(doc! {})
            .sort(doc! {"finished_at": -1})
            .await
            .map_err(|source| MongoDaoError::ListGameRecords { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListGameRecords { source })?;

        documents
            .into_iter()
            .map(|document| GameRecordEntity::try_from(document).map(Into::into))
            .collect()
    }
}

impl GameStore for MongoGameStore {
    fn save_quiz(&self, quiz: QuizEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_quiz(quiz).await.map_err(Into::into) })
    }

    fn find_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_quiz(id).await })
    }

    fn list_quizzes(&self) -> BoxFuture<'static, StorageResult<Vec<QuizEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_quizzes().await })
    }

    fn delete_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_quiz(id).await.map_err(Into::into) })
    }

    fn save_game_record(&self, record: GameRecordEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_game_record(record).await.map_err(Into::into) })
    }

    fn find_game_record(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game_record(id).await })
    }

    fn list_game_records(&self) -> BoxFuture<'static, StorageResult<Vec<GameRecordListItemEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_game_records().await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
