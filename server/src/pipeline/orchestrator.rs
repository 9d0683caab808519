//! Pipeline orchestrator: Extract -> Analyze -> Generate.

use crate::error::{AppError, AppResult};
use crate::prompt::{email_generation, gap_analysis, PromptClient};
use crate::server_config::cfg;

use super::extractor::AnalysisApi;
use super::types::PipelineResult;

/// Run the full email generation pipeline for one analysis record.
///
/// The model override only applies to the generate stage and is threaded
/// through as a parameter, so concurrent pipeline runs cannot clobber each
/// other's model choice.
pub async fn run_email_generation_pipeline(
    analysis_api: &AnalysisApi,
    prompt_client: &PromptClient,
    record_id: &str,
    model_override: Option<&str>,
) -> AppResult<PipelineResult> {
    let record = analysis_api
        .fetch_record(record_id)
        .await
        .map_err(|e| tag_stage(e, "extract"))?;

    tracing::info!(
        "Extracted analysis for '{}' with {} opportunities",
        record.company,
        record.opportunities.len()
    );

    let record = gap_analysis::analyze_gaps(prompt_client, record).await;

    let model = model_override.unwrap_or(&cfg.model.id);
    let result = email_generation::generate_emails(prompt_client, &record, model)
        .await
        .map_err(|e| tag_stage(e, "generate"))?;

    tracing::info!(
        "Email generation completed for '{}' using model {} ({} emails)",
        result.company,
        result.model_used,
        result.emails.len()
    );

    Ok(result)
}

/// Attach the failing stage name for observability. Typed variants pass
/// through unchanged so callers can still match on them.
fn tag_stage(err: AppError, stage: &str) -> AppError {
    match err {
        AppError::Internal(e) => {
            AppError::Internal(e.context(format!("Pipeline stage '{}' failed", stage)))
        }
        other => {
            tracing::error!("Pipeline stage '{}' failed: {}", stage, other);
            other
        }
    }
}
