//! Instance lifecycle handlers

use crate::{ApiError, AppState};
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use ctf_platform_models::*;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

/// Admins may act on another team's instance by naming it explicitly
#[derive(Debug, Deserialize)]
pub struct TeamQuery {
    pub team_id: Option<Uuid>,
}

fn effective_team(actor: &Actor, query: &TeamQuery) -> Uuid {
    match query.team_id {
        Some(team_id) if actor.is_admin => team_id,
        _ => actor.team_id,
    }
}

pub async fn start(
    State(state): State<AppState>,
    Path(challenge_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<InstanceHandle>, ApiError> {
    let handle = state.instancer.start(actor, challenge_id).await?;
    Ok(Json(handle))
}

pub async fn stop(
    State(state): State<AppState>,
    Path(challenge_id): Path<Uuid>,
    Query(query): Query<TeamQuery>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, ApiError> {
    let team_id = effective_team(&actor, &query);
    state.instancer.stop(actor, team_id, challenge_id).await?;
    Ok(Json(json!({ "stopped": true })))
}

pub async fn kill(
    State(state): State<AppState>,
    Path(challenge_id): Path<Uuid>,
    Query(query): Query<TeamQuery>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, ApiError> {
    let team_id = effective_team(&actor, &query);
    state.instancer.kill(actor, team_id, challenge_id).await?;
    Ok(Json(json!({ "killed": true })))
}

pub async fn status(
    State(state): State<AppState>,
    Path(challenge_id): Path<Uuid>,
    Query(query): Query<TeamQuery>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<InstanceStatusView>, ApiError> {
    let team_id = effective_team(&actor, &query);
    let view = state.instancer.status(team_id, challenge_id).await?;
    Ok(Json(view))
}
