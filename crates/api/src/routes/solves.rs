//! Flag submission and scoring handlers

use crate::{ApiError, AppState};
use axum::extract::{Path, State};
use axum::{Extension, Json};
use ctf_platform_models::*;
use serde_json::{json, Value};
use uuid::Uuid;

pub async fn submit_flag(
    State(state): State<AppState>,
    Path(challenge_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<SubmitFlagRequest>,
) -> Result<Json<SubmitFlagOutcome>, ApiError> {
    let outcome = state
        .solver
        .submit_flag(actor, challenge_id, &request.flag)
        .await?;
    Ok(Json(outcome))
}

pub async fn current_points(
    State(state): State<AppState>,
    Path(challenge_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let points = state.solver.current_points(challenge_id).await?;
    Ok(Json(json!({ "points": points })))
}

pub async fn recalculate(
    State(state): State<AppState>,
    Path(challenge_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, ApiError> {
    if !actor.is_admin {
        return Err(PlatformError::Forbidden {
            reason: "score recalculation requires admin role".to_string(),
        }
        .into());
    }
    let updated = state.solver.recalculate_challenge(challenge_id).await?;
    Ok(Json(json!({ "updated": updated })))
}
