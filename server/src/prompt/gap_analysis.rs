//! Gap analysis stage: one concurrent LLM call per extracted opportunity.

use futures::future::join_all;
use indoc::formatdoc;

use crate::pipeline::types::{AnalysisRecord, GapAnalysisItem, Opportunity};
use crate::server_config::cfg;

use super::parse::parse_model_json;
use super::PromptClient;

fn system_prompt() -> String {
    formatdoc! {r#"
        You are an expert in AI transformation for all industries.
        Generate a concise and relevant 'gap analysis' and 'pain points' for each AI solution.
        Each output must be in JSON format and directly relate to the provided solution and company context.
        Keep it short, professional, and insightful, with a hook a sales executive can use to pitch the pain points.
        Provide only 2-3 pain points. They should be concise and act as eye openers."#}
}

fn user_prompt(company: &str, opp: &Opportunity) -> String {
    formatdoc! {r#"
        Company: {company}
        AI Solution: {solution}
        Why Need of AI Solution: {why}

        Generate:
        1. A short 'gap_analysis' (what is missing today or challenge faced)
        2. Specific 'pain_points' that this AI solution helps to solve. Provide only 2-3 concise pain points that act as eye openers.

        Output JSON format:
        {{
        "ai_solution": "...",
        "gap_analysis": "...",
        "pain_points": ["...", "..."]
        }}"#,
    solution = opp.solution,
    why = opp.why}
}

/// Run gap analysis for every opportunity on the record, all concurrently,
/// and return the record with `gap_analyses` filled in input order.
///
/// Per-opportunity failures degrade to a placeholder item instead of failing
/// the batch, so the output always has one entry per opportunity.
pub async fn analyze_gaps(prompt_client: &PromptClient, mut record: AnalysisRecord) -> AnalysisRecord {
    let futures = record
        .opportunities
        .iter()
        .map(|opp| analyze_opportunity(prompt_client, &record.company, opp));

    let gap_analyses = join_all(futures).await;
    record.gap_analyses = gap_analyses;
    record
}

async fn analyze_opportunity(
    prompt_client: &PromptClient,
    company: &str,
    opp: &Opportunity,
) -> GapAnalysisItem {
    let raw = match prompt_client
        .send_chat_prompt(&cfg.model.id, &system_prompt(), &user_prompt(company, opp))
        .await
    {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!("Gap analysis call failed for '{}': {:?}", opp.solution, err);
            return placeholder_item(opp);
        }
    };

    let parsed = parse_model_json(&raw)
        .and_then(|value| serde_json::from_value::<GapAnalysisItem>(value).ok());

    match parsed {
        Some(mut item) => {
            if item.ai_solution.trim().is_empty() {
                item.ai_solution = opp.solution.clone();
            }
            item
        }
        None => {
            tracing::warn!(
                "Gap analysis output was not parsable for '{}'",
                opp.solution
            );
            placeholder_item(opp)
        }
    }
}

fn placeholder_item(opp: &Opportunity) -> GapAnalysisItem {
    GapAnalysisItem {
        ai_solution: opp.solution.clone(),
        gap_analysis: "N/A".to_string(),
        pain_points: vec![],
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::HttpClient;

    use super::*;

    fn test_client(server: &MockServer) -> PromptClient {
        PromptClient::new(
            HttpClient::new(),
            server.uri(),
            "test-key".to_string(),
            0.4,
        )
    }

    fn record_with_opportunities(solutions: &[&str]) -> AnalysisRecord {
        AnalysisRecord {
            company: "Acme Labs".to_string(),
            opportunities: solutions
                .iter()
                .map(|s| Opportunity {
                    solution: s.to_string(),
                    why: format!("why {}", s),
                })
                .collect(),
            ..Default::default()
        }
    }

    fn chat_response(content: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content.to_string()}}],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
        }))
    }

    #[tokio::test]
    async fn test_analyze_preserves_input_order() {
        let server = MockServer::start().await;

        // Distinct responses matched by which solution appears in the prompt
        for (solution, analysis) in [("Solution One", "gap one"), ("Solution Two", "gap two")] {
            Mock::given(method("POST"))
                .and(path("/chat/completions"))
                .and(body_string_contains(solution))
                .respond_with(chat_response(json!({
                    "ai_solution": solution,
                    "gap_analysis": analysis,
                    "pain_points": ["p1", "p2"]
                })))
                .mount(&server)
                .await;
        }

        let client = test_client(&server);
        let record = record_with_opportunities(&["Solution One", "Solution Two"]);
        let record = analyze_gaps(&client, record).await;

        assert_eq!(record.gap_analyses.len(), 2);
        assert_eq!(record.gap_analyses[0].ai_solution, "Solution One");
        assert_eq!(record.gap_analyses[0].gap_analysis, "gap one");
        assert_eq!(record.gap_analyses[1].ai_solution, "Solution Two");
        assert_eq!(record.gap_analyses[1].gap_analysis, "gap two");
    }

    #[tokio::test]
    async fn test_analyze_degrades_to_placeholders_when_every_call_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let record = record_with_opportunities(&["A", "B", "C"]);
        let record = analyze_gaps(&client, record).await;

        assert_eq!(record.gap_analyses.len(), 3);
        for (item, expected) in record.gap_analyses.iter().zip(["A", "B", "C"]) {
            assert_eq!(item.ai_solution, expected);
            assert_eq!(item.gap_analysis, "N/A");
            assert!(item.pain_points.is_empty());
        }
    }

    #[tokio::test]
    async fn test_analyze_accepts_legacy_key_spelling() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(chat_response(json!({
                "ai solution": "Legacy",
                "gap_analysis": "gap",
                "pain_points": ["p1"]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let record = record_with_opportunities(&["Legacy"]);
        let record = analyze_gaps(&client, record).await;

        assert_eq!(record.gap_analyses[0].ai_solution, "Legacy");
        assert_eq!(record.gap_analyses[0].gap_analysis, "gap");
    }

    #[tokio::test]
    async fn test_analyze_unparsable_output_becomes_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "sorry, no JSON today"}}]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let record = record_with_opportunities(&["X"]);
        let record = analyze_gaps(&client, record).await;

        assert_eq!(record.gap_analyses.len(), 1);
        assert_eq!(record.gap_analyses[0].ai_solution, "X");
        assert_eq!(record.gap_analyses[0].gap_analysis, "N/A");
    }

    #[tokio::test]
    async fn test_analyze_empty_record_yields_no_items() {
        let server = MockServer::start().await;
        let client = test_client(&server);
        let record = analyze_gaps(&client, record_with_opportunities(&[])).await;
        assert!(record.gap_analyses.is_empty());
    }
}
