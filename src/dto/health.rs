use serde::Serialize;
use utoipa::ToSchema;

/// Body of `GET /healthcheck`.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok`, or `degraded` while the storage backend is unreachable.
    pub status: String,
    /// Sessions currently registered, whatever their phase.
    pub live_sessions: usize,
}

impl HealthResponse {
    pub fn new(degraded: bool, live_sessions: usize) -> Self {
        Self {
            status: if degraded { "degraded" } else { "ok" }.to_owned(),
            live_sessions,
        }
    }
}
