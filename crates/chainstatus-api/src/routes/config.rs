use axum::{extract::State, Json};

use crate::config::PublicConfig;
use crate::state::AppState;

pub async fn config(State(state): State<AppState>) -> Json<PublicConfig> {
    Json(PublicConfig::clone(&state.public_config))
}
