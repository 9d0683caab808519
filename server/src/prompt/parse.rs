//! Resilient parsing of model output.
//!
//! Models are asked for JSON via the prompt, but the format is not enforced
//! by the provider: completions come back wrapped in prose, fenced in
//! markdown, or shaped inconsistently. Parsing here recovers what it can and
//! leaves fallback decisions to the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pipeline::types::EmailDraft;

/// Try to parse model output as JSON.
///
/// Falls back to the substring between the first `{` and the last `}` when
/// the full text does not parse, which strips leading/trailing prose and
/// markdown fences. Returns `None` when no JSON can be recovered.
pub fn parse_model_json(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }

    serde_json::from_str(&trimmed[start..=end]).ok()
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EmailsOutput {
    pub emails: Vec<EmailDraft>,
}

/// Reconcile the observed output shapes into `{ emails: [...] }`:
/// a wrapper object with an `emails` list, a single flat draft object, or a
/// bare list of draft objects. Anything else normalizes to an empty list.
pub fn normalize_email_output(parsed: Option<Value>) -> EmailsOutput {
    let Some(value) = parsed else {
        return EmailsOutput::default();
    };

    if value.is_object() {
        if value.get("emails").is_some() {
            return serde_json::from_value(value).unwrap_or_default();
        }
        if value.get("subject_line").is_some() && value.get("email_body").is_some() {
            return serde_json::from_value::<EmailDraft>(value)
                .map(|draft| EmailsOutput {
                    emails: vec![draft],
                })
                .unwrap_or_default();
        }
        return EmailsOutput::default();
    }

    if value.is_array() {
        return serde_json::from_value::<Vec<EmailDraft>>(value)
            .map(|emails| EmailsOutput { emails })
            .unwrap_or_default();
    }

    EmailsOutput::default()
}
