pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{GameRecordEntity, GameRecordListItemEntity, QuizEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for quizzes and finished game records.
pub trait GameStore: Send + Sync {
    fn save_quiz(&self, quiz: QuizEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>>;
    /// Stored quizzes, newest first.
    fn list_quizzes(&self) -> BoxFuture<'static, StorageResult<Vec<QuizEntity>>>;
    fn delete_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    fn save_game_record(&self, record: GameRecordEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_game_record(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameRecordEntity>>>;
    /// Stored game records, most recently finished first.
    fn list_game_records(&self) -> BoxFuture<'static, StorageResult<Vec<GameRecordListItemEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
