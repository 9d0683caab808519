//! Email generation stage: one concurrent LLM call per gap analysis item.
//!
//! Per-item parse failures degrade to a fallback draft. Account exhaustion
//! is systemic, so it short-circuits the whole batch instead: every
//! remaining call would fail the same way and burn quota.

use futures::future::try_join_all;
use indoc::{formatdoc, indoc};

use crate::error::{AppError, AppResult};
use crate::pipeline::types::{AnalysisRecord, EmailDraft, GapAnalysisItem, PipelineResult};

use super::parse::{normalize_email_output, parse_model_json};
use super::PromptClient;

const FALLBACK_SUBJECT: &str = "Quick AI Insight for You";
const FALLBACK_BODY: &str = "Unable to generate email.";

const SYSTEM_PROMPT: &str = indoc! {r#"
    You are an expert copywriter and sales strategist generating highly personalized cold emails for Consultadd,
    a custom AI solutions company for SMBs and enterprises. Your company has the USP of rapidly deploying
    tailor-made solutions for unique challenges of a company.

    Follow these strict rules:
    - Keep email concise: max 100 words / 250 characters.
    - Avoid jargon or buzzwords.
    - Start with personalized opening referencing company or industry challenge.
    - Briefly mention gap and hint at solution (without giving away much).
    - Highlight Consultadd's value: tailor-made custom AI solutions that unlock efficiency, automate what matters,
      and fit each company's AI journey.
    - End with curiosity-driven, low-pressure CTA.
    - Avoid spammy words, excessive punctuation, or signatures.

    SUBJECT LINE RULES:
    - Catchy, 6-8 words max.
    - Include company name if possible.
    - No spam triggers like FREE, !!!, etc.

    Output must be in valid JSON format:
    {
      "subject_line": "...",
      "email_body": "..."
    }"#};

fn user_prompt(company: &str, item: &GapAnalysisItem) -> String {
    let pain_points = item
        .pain_points
        .iter()
        .take(2)
        .map(|pp| format!("- {}", pp))
        .collect::<Vec<_>>()
        .join("\n");

    formatdoc! {r#"
        Generate a personalized cold email for:

        Company: {company}

        AI Solution Opportunity:
        {ai_solution}

        Gap Analysis:
        {gap_analysis}

        Key Pain Points:
        {pain_points}

        Follow all formatting and output JSON as instructed."#,
    ai_solution = item.ai_solution,
    gap_analysis = item.gap_analysis}
}

/// Generate one email draft per gap analysis item, all concurrently.
///
/// Drafts come back in the same order as `record.gap_analyses` regardless of
/// completion order. Fails only on `AccountExhausted`, which cancels the
/// remaining in-flight calls via the `try_join_all` short-circuit.
pub async fn generate_emails(
    prompt_client: &PromptClient,
    record: &AnalysisRecord,
    model: &str,
) -> AppResult<PipelineResult> {
    let futures = record
        .gap_analyses
        .iter()
        .map(|item| generate_for_gap(prompt_client, model, &record.company, item));

    let emails = try_join_all(futures).await?;

    Ok(PipelineResult {
        company: record.company.clone(),
        emails,
        model_used: model.to_string(),
    })
}

async fn generate_for_gap(
    prompt_client: &PromptClient,
    model: &str,
    company: &str,
    item: &GapAnalysisItem,
) -> AppResult<EmailDraft> {
    let raw = match prompt_client
        .send_chat_prompt(model, SYSTEM_PROMPT, &user_prompt(company, item))
        .await
    {
        Ok(raw) => raw,
        Err(AppError::AccountExhausted) => return Err(AppError::AccountExhausted),
        Err(err) => {
            tracing::warn!(
                "Email generation call failed for '{}': {:?}",
                item.ai_solution,
                err
            );
            return Ok(sanitize_draft(fallback_draft(FALLBACK_BODY)));
        }
    };

    let normalized = normalize_email_output(parse_model_json(&raw));
    let draft = match normalized.emails.into_iter().next() {
        Some(draft) => draft,
        None => {
            tracing::warn!(
                "Email output was not parsable for '{}', using raw text fallback",
                item.ai_solution
            );
            fallback_draft(&raw)
        }
    };

    Ok(sanitize_draft(draft))
}

fn fallback_draft(raw: &str) -> EmailDraft {
    EmailDraft {
        subject_line: FALLBACK_SUBJECT.to_string(),
        email_body: raw.to_string(),
    }
}

/// Enforce the draft invariants: single-line non-empty body, non-empty subject.
fn sanitize_draft(mut draft: EmailDraft) -> EmailDraft {
    draft.subject_line = draft.subject_line.trim().to_string();
    draft.email_body = flatten_whitespace(&draft.email_body);

    if draft.subject_line.is_empty() {
        draft.subject_line = FALLBACK_SUBJECT.to_string();
    }
    if draft.email_body.is_empty() {
        draft.email_body = FALLBACK_BODY.to_string();
    }

    draft
}

fn flatten_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
