/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Read access to finished game records.
pub mod history_service;
/// Quiz library management.
pub mod quiz_service;
/// Outbound WebSocket events for live sessions.
pub mod session_events;
/// Live session coordination: lobby, rounds, answers and finalization.
pub mod session_service;
/// Storage connection supervision and degraded mode.
pub mod storage_supervisor;
/// WebSocket connection and message handling service.
pub mod websocket_service;
