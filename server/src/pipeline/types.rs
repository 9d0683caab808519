//! Data shapes flowing through the email generation pipeline.

use serde::{Deserialize, Serialize};

/// A single AI opportunity hypothesis projected out of the initial analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub solution: String,
    pub why: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PainPointGoal {
    pub pain_point: String,
    pub goal: String,
}

/// Normalized projection of the upstream initial-analysis document.
///
/// Every field is lenient: a sparse upstream document produces a valid
/// record with empty containers instead of failing extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub about: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
    #[serde(default)]
    pub pain_points_and_goals: Vec<PainPointGoal>,
    #[serde(default)]
    pub value_prop_angles: Vec<String>,
    #[serde(default)]
    pub hooks: Vec<String>,
    /// Filled by the gap analysis stage, one entry per opportunity in input order.
    #[serde(default)]
    pub gap_analyses: Vec<GapAnalysisItem>,
}

/// Model output for one opportunity. The alias covers the `"ai solution"`
/// key spelling some models emit despite the prompt asking for `ai_solution`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysisItem {
    #[serde(default, alias = "ai solution")]
    pub ai_solution: String,
    #[serde(default)]
    pub gap_analysis: String,
    #[serde(default)]
    pub pain_points: Vec<String>,
}

/// One generated outreach email. `email_body` never contains raw newlines
/// and both fields are non-empty once a draft leaves the generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub subject_line: String,
    pub email_body: String,
}

/// Terminal output of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub company: String,
    pub emails: Vec<EmailDraft>,
    pub model_used: String,
}
