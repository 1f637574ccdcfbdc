//! Process-local store used for development runs and tests.

use std::{cmp::Reverse, sync::Arc};

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{GameRecordEntity, GameRecordListItemEntity, QuizEntity},
    storage::StorageResult,
};

/// [`GameStore`] keeping everything in memory. Data is lost on restart.
#[derive(Clone, Default)]
pub struct InMemoryGameStore {
    inner: Arc<InMemoryInner>,
}

#[derive(Default)]
struct InMemoryInner {
    quizzes: DashMap<Uuid, QuizEntity>,
    records: DashMap<Uuid, GameRecordEntity>,
}

impl InMemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of game records stored so far.
    pub fn record_count(&self) -> usize {
        self.inner.records.len()
    }
}

impl GameStore for InMemoryGameStore {
    fn save_quiz(&self, quiz: QuizEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.quizzes.insert(quiz.id, quiz);
            Ok(())
        })
    }

    fn find_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.quizzes.get(&id).map(|entry| entry.value().clone())) })
    }

    fn list_quizzes(&self) -> BoxFuture<'static, StorageResult<Vec<QuizEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut quizzes: Vec<QuizEntity> = inner
                .quizzes
                .iter()
                .map(|entry| entry.value().clone())
                .collect();
            quizzes.sort_by_key(|quiz| Reverse(quiz.created_at));
            Ok(quizzes)
        })
    }

    fn delete_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.quizzes.remove(&id).is_some()) })
    }

    fn save_game_record(&self, record: GameRecordEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.records.insert(record.id, record);
            Ok(())
        })
    }

    fn find_game_record(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameRecordEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.records.get(&id).map(|entry| entry.value().clone())) })
    }

    fn list_game_records(&self) -> BoxFuture<'static, StorageResult<Vec<GameRecordListItemEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut records: Vec<GameRecordListItemEntity> = inner
                .records
                .iter()
                .map(|entry| entry.value().clone().into())
                .collect();
            records.sort_by_key(|record| Reverse(record.finished_at));
            Ok(records)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::dao::models::QuestionEntity;

    fn quiz(title: &str, created_at: SystemTime) -> QuizEntity {
        QuizEntity {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            questions: vec![QuestionEntity {
                text: "2 + 2?".into(),
                options: vec!["1".into(), "4".into(), "3".into(), "5".into()],
                correct_index: 1,
                time_limit: 20,
            }],
            created_at,
        }
    }

    #[tokio::test]
    async fn quizzes_are_listed_newest_first() {
        let store = InMemoryGameStore::new();
        let now = SystemTime::now();
        store.save_quiz(quiz("old", now)).await.unwrap();
        store
            .save_quiz(quiz("new", now + Duration::from_secs(60)))
            .await
            .unwrap();

        let titles: Vec<String> = store
            .list_quizzes()
            .await
            .unwrap()
            .into_iter()
            .map(|quiz| quiz.title)
            .collect();
        assert_eq!(titles, vec!["new".to_string(), "old".to_string()]);
    }

    #[tokio::test]
    async fn delete_reports_whether_the_quiz_existed() {
        let store = InMemoryGameStore::new();
        let entity = quiz("trivia", SystemTime::now());
        let id = entity.id;
        store.save_quiz(entity).await.unwrap();

        assert!(store.delete_quiz(id).await.unwrap());
        assert!(!store.delete_quiz(id).await.unwrap());
        assert!(store.find_quiz(id).await.unwrap().is_none());
    }
}
