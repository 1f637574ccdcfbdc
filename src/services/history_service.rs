use uuid::Uuid;

use crate::{
    dto::history::{GameRecordDetail, GameRecordSummary},
    error::ServiceError,
    state::SharedState,
};

/// Stored game records, most recently finished first.
pub async fn list_records(state: &SharedState) -> Result<Vec<GameRecordSummary>, ServiceError> {
    let store = state.require_game_store().await?;
    let records = store.list_game_records().await?;
    Ok(records.into_iter().map(Into::into).collect())
}

pub async fn get_record(state: &SharedState, id: Uuid) -> Result<GameRecordDetail, ServiceError> {
    let store = state.require_game_store().await?;

    let Some(record) = store.find_game_record(id).await? else {
        return Err(ServiceError::NotFound(format!("game record `{id}` not found")));
    };
    Ok(record.into())
}
