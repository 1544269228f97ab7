use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use chainstatus_core::{check_realtime, MaxWorstCaseDistance, RealtimeCheck, RealtimeOutcome};

use crate::error::{ApiError, ResultCode};
use crate::gate::{self, Prerequisites};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeQuery {
    pub max_worst_case_distance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeResponse {
    pub result_code: ResultCode,
    #[serde(flatten)]
    pub check: RealtimeCheck,
}

/// Is the index within `maxWorstCaseDistance` seconds of realtime?
pub async fn realtime(
    State(state): State<AppState>,
    Query(query): Query<RealtimeQuery>,
) -> Result<Json<RealtimeResponse>, ApiError> {
    let raw = query
        .max_worst_case_distance
        .ok_or_else(|| ApiError::InvalidRequest("maxWorstCaseDistance is required".into()))?;
    let max = MaxWorstCaseDistance::parse(&raw)?;

    let cached = state.read_indexing_status().await?;
    let now = state.clock.now();
    let prerequisites = Prerequisites::default().max_worst_case_distance(max);
    let snapshot =
        gate::evaluate(Some(cached.as_ref()), &state.public_config, &prerequisites, now).into_result()?;

    match check_realtime(Some(snapshot.as_ref()), max, now) {
        RealtimeOutcome::Satisfied(check) => Ok(Json(RealtimeResponse {
            result_code: ResultCode::Ok,
            check,
        })),
        other => Err(ApiError::InternalServerError(format!(
            "realtime check disagrees with the support gate: {other:?}"
        ))),
    }
}
