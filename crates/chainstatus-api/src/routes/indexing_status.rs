use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use chainstatus_core::{project, MaxWorstCaseDistance, StatusProjection};

use crate::error::ApiError;
use crate::state::AppState;

/// Returned when no snapshot could be built.
pub const INDEXER_ERROR_STATUS: u16 = 512;
/// Returned when the requested realtime distance is not met.
pub const REALTIME_NOT_MET_STATUS: u16 = 513;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingStatusQuery {
    pub max_realtime_distance: Option<String>,
}

pub async fn indexing_status(
    State(state): State<AppState>,
    Query(query): Query<IndexingStatusQuery>,
) -> Result<Response, ApiError> {
    let requested = query
        .max_realtime_distance
        .as_deref()
        .map(MaxWorstCaseDistance::parse)
        .transpose()?;

    let cached = state.read_indexing_status().await?;
    let snapshot = cached.value();
    let projection = project(snapshot.map(Arc::as_ref), state.clock.now());

    let status = match (&projection, requested) {
        (StatusProjection::IndexerError { .. }, _) => custom_status(INDEXER_ERROR_STATUS),
        (StatusProjection::Ok(p), Some(max))
            if !p.worst_case_distance.is_some_and(|d| d <= max.as_secs()) =>
        {
            tracing::debug!(
                requested = max.as_secs(),
                worst_case_distance = ?p.worst_case_distance,
                "realtime distance not met"
            );
            custom_status(REALTIME_NOT_MET_STATUS)
        }
        _ => StatusCode::OK,
    };

    Ok((status, Json(projection)).into_response())
}

fn custom_status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::SERVICE_UNAVAILABLE)
}
