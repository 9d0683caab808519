//! Background task tracking for pipeline runs.
//!
//! Each submission spawns one background task that owns its registry entry:
//! no two writers ever touch the same id, so the map only needs to be safe
//! for concurrent inserts. Tasks are ephemeral and live until process exit;
//! there is no eviction, cancellation, or timeout.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rand::seq::SliceRandom;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::pipeline::extractor::AnalysisApi;
use crate::pipeline::orchestrator::run_email_generation_pipeline;
use crate::pipeline::types::PipelineResult;
use crate::prompt::PromptClient;
use crate::server_config::cfg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    FailedInsufficientCredits,
}

/// Point-in-time view of a task, safe to hand to pollers.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PipelineResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
struct TaskEntry {
    status: TaskStatus,
    result: Option<PipelineResult>,
    error: Option<String>,
}

impl TaskEntry {
    fn pending() -> Self {
        Self {
            status: TaskStatus::Pending,
            result: None,
            error: None,
        }
    }
}

#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<RwLock<HashMap<Uuid, TaskEntry>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a task and schedule its pipeline run in the background.
    /// Returns immediately with the task id; progress is observed via `poll`.
    pub fn submit(
        &self,
        analysis_api: AnalysisApi,
        prompt_client: PromptClient,
        record_id: String,
        model_override: Option<String>,
    ) -> Uuid {
        let task_id = Uuid::new_v4();
        self.tasks
            .write()
            .unwrap()
            .insert(task_id, TaskEntry::pending());

        let registry = self.clone();
        tokio::spawn(async move {
            registry.set_status(task_id, TaskStatus::Running);
            tracing::info!("Pipeline task {} started for analysis {}", task_id, record_id);

            let outcome = run_email_generation_pipeline(
                &analysis_api,
                &prompt_client,
                &record_id,
                model_override.as_deref(),
            )
            .await;

            match outcome {
                Ok(result) => {
                    tracing::info!("Pipeline task {} completed", task_id);
                    registry.complete(task_id, result);
                }
                Err(err) => {
                    tracing::error!("Pipeline task {} failed: {}", task_id, err);
                    registry.fail(task_id, err);
                }
            }
        });

        task_id
    }

    /// Like `submit`, but picks a model at random from the configured pool
    /// and reports the choice back to the caller alongside the task id.
    pub fn submit_regeneration(
        &self,
        analysis_api: AnalysisApi,
        prompt_client: PromptClient,
        record_id: String,
    ) -> (Uuid, String) {
        let model = cfg
            .regeneration
            .model_pool
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| cfg.model.id.clone());

        tracing::info!(
            "Regeneration for analysis {} using model {}",
            record_id,
            model
        );

        let task_id = self.submit(analysis_api, prompt_client, record_id, Some(model.clone()));
        (task_id, model)
    }

    /// Non-blocking snapshot of a task. Unknown ids return `None`.
    pub fn poll(&self, task_id: &Uuid) -> Option<TaskSnapshot> {
        self.tasks
            .read()
            .unwrap()
            .get(task_id)
            .map(|entry| TaskSnapshot {
                status: entry.status,
                result: entry.result.clone(),
                error: entry.error.clone(),
            })
    }

    fn set_status(&self, task_id: Uuid, status: TaskStatus) {
        if let Some(entry) = self.tasks.write().unwrap().get_mut(&task_id) {
            entry.status = status;
        }
    }

    fn complete(&self, task_id: Uuid, result: PipelineResult) {
        if let Some(entry) = self.tasks.write().unwrap().get_mut(&task_id) {
            entry.status = TaskStatus::Completed;
            entry.result = Some(result);
        }
    }

    fn fail(&self, task_id: Uuid, err: AppError) {
        let (status, message) = classify_failure(&err);
        if let Some(entry) = self.tasks.write().unwrap().get_mut(&task_id) {
            entry.status = status;
            entry.error = Some(message);
        }
    }
}

/// Map a pipeline error to a terminal status plus a user-facing message.
/// Quota exhaustion gets its own status so clients can show different UX.
fn classify_failure(err: &AppError) -> (TaskStatus, String) {
    match err {
        AppError::AccountExhausted => (
            TaskStatus::FailedInsufficientCredits,
            "INSUFFICIENT_CREDITS_ERROR".to_string(),
        ),
        other => (TaskStatus::Failed, other.to_string()),
    }
}
