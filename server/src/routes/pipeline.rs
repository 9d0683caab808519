//! HTTP handlers for the pipeline task surface: submit, poll, regenerate.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppJsonResult};
use crate::state::tasks::TaskSnapshot;
use crate::ServerState;

#[derive(Debug, Deserialize)]
pub struct GenerateEmailRequest {
    pub analysis_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub task_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct RegenerateResponse {
    pub task_id: Uuid,
    pub model_used: String,
}

fn required_analysis_id(req: GenerateEmailRequest) -> Result<String, AppError> {
    req.analysis_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("analysis_id is required".to_string()))
}

pub async fn submit_generation(
    State(state): State<ServerState>,
    Json(req): Json<GenerateEmailRequest>,
) -> AppJsonResult<SubmitResponse> {
    let analysis_id = required_analysis_id(req)?;
    let task_id = state.tasks.submit(
        state.analysis_api.clone(),
        state.prompt_client.clone(),
        analysis_id,
        None,
    );

    Ok(Json(SubmitResponse { task_id }))
}

pub async fn poll_task(
    State(state): State<ServerState>,
    Path(task_id): Path<Uuid>,
) -> AppJsonResult<TaskSnapshot> {
    state
        .tasks
        .poll(&task_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Task {} not found", task_id)))
}

pub async fn submit_regeneration(
    State(state): State<ServerState>,
    Json(req): Json<GenerateEmailRequest>,
) -> AppJsonResult<RegenerateResponse> {
    let analysis_id = required_analysis_id(req)?;
    let (task_id, model_used) = state.tasks.submit_regeneration(
        state.analysis_api.clone(),
        state.prompt_client.clone(),
        analysis_id,
    );

    Ok(Json(RegenerateResponse { task_id, model_used }))
}
