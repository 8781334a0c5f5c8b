//! Daily statistics endpoint.

use crate::error::AppError;
use crate::state::AppState;
use axum::{Json, extract::State};
use wereda_core::engine::Statistics;

/// `GET /api/statistics` - daily operational aggregates.
pub async fn statistics(State(state): State<AppState>) -> Result<Json<Statistics>, AppError> {
    Ok(Json(state.engine.statistics().await?))
}
