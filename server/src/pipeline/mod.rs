//! Email Generation Pipeline
//!
//! Turns an upstream analysis id into a set of personalized outreach emails:
//!
//! 1. **Extractor**: fetches the initial-analysis document and projects it
//!    into an [`types::AnalysisRecord`]
//! 2. **Gap analysis**: one concurrent LLM call per opportunity
//!    (`prompt::gap_analysis`)
//! 3. **Email generation**: one concurrent LLM call per gap item
//!    (`prompt::email_generation`)
//!
//! The orchestrator sequences the stages; the task registry in
//! `state::tasks` runs the whole pipeline in the background per submission.

pub mod extractor;
pub mod orchestrator;
pub mod types;
