//! Record extraction from the upstream analysis service.
//!
//! One status check (no retry loop), then a follow-up fetch of the presigned
//! document URL. Projection is lenient: missing fields become empty values
//! so a partially populated analysis still yields a usable record.

use anyhow::anyhow;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::server_config::cfg;
use crate::HttpClient;

use super::types::{AnalysisRecord, Opportunity, PainPointGoal};

#[derive(Clone)]
pub struct AnalysisApi {
    http_client: HttpClient,
    base_url: String,
    bearer_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnalysisStatus {
    status: String,
    overall_status: String,
    presigned_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAnalysisDocument {
    company: RawCompany,
    more_info: serde_json::Map<String, serde_json::Value>,
    ai_opportunity_hypotheses: Vec<RawHypothesis>,
    value_prop_angles: Vec<RawAngle>,
    pain_points_and_goals: Vec<RawPainPoint>,
    icps_to_contact: Vec<RawIcp>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCompany {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHypothesis {
    hypothesis: String,
    why: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAngle {
    angle: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPainPoint {
    item: String,
    why: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIcp {
    messaging_hook: String,
}

impl AnalysisApi {
    pub fn from_cfg(http_client: HttpClient) -> AppResult<Self> {
        if cfg.upstream.bearer_token.is_empty() {
            return Err(AppError::Configuration(
                "upstream.bearer_token is not set (OUTREACH__UPSTREAM__BEARER_TOKEN)".to_string(),
            ));
        }

        Ok(Self::new(
            http_client,
            cfg.upstream.base_url.clone(),
            cfg.upstream.bearer_token.clone(),
        ))
    }

    pub fn new(http_client: HttpClient, base_url: String, bearer_token: String) -> Self {
        Self {
            http_client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            bearer_token,
        }
    }

    /// Fetch and project the initial analysis for `record_id`.
    ///
    /// Fails with `NotFound` for unknown ids and `UpstreamNotReady` when the
    /// analysis has not reported completion yet.
    pub async fn fetch_record(&self, record_id: &str) -> AppResult<AnalysisRecord> {
        let status_url = format!("{}/{}/files/initial_analysis", self.base_url, record_id);
        let resp = self
            .http_client
            .get(&status_url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(AppError::NotFound(format!(
                    "Analysis {} not found upstream",
                    record_id
                )))
            }
            status => {
                return Err(anyhow!(
                    "Status check for analysis {} returned {}",
                    record_id,
                    status
                )
                .into())
            }
        }

        let status: AnalysisStatus = resp.json().await?;
        if !analysis_is_complete(&status) {
            return Err(AppError::UpstreamNotReady);
        }

        if status.presigned_url.is_empty() {
            return Err(anyhow!(
                "Completed analysis {} did not include a presigned_url",
                record_id
            )
            .into());
        }

        // Presigned URL is fetched without auth headers
        let document = self
            .http_client
            .get(&status.presigned_url)
            .send()
            .await?
            .json::<serde_json::Value>()
            .await?;

        // Malformed documents degrade to defaults rather than failing hard
        let raw: RawAnalysisDocument = serde_json::from_value(document).unwrap_or_default();
        Ok(project_record(raw))
    }
}

/// The upstream reports completion under a few key/value spellings.
fn analysis_is_complete(status: &AnalysisStatus) -> bool {
    status.overall_status == "initial_complete"
        || status.overall_status == "completed"
        || status.status == "completed"
}

fn project_record(raw: RawAnalysisDocument) -> AnalysisRecord {
    AnalysisRecord {
        company: raw.company.name,
        about: raw.more_info,
        opportunities: raw
            .ai_opportunity_hypotheses
            .into_iter()
            .map(|h| Opportunity {
                solution: h.hypothesis,
                why: h.why,
            })
            .collect(),
        pain_points_and_goals: raw
            .pain_points_and_goals
            .into_iter()
            .map(|p| PainPointGoal {
                pain_point: p.item,
                goal: p.why,
            })
            .collect(),
        value_prop_angles: raw.value_prop_angles.into_iter().map(|a| a.angle).collect(),
        hooks: raw
            .icps_to_contact
            .into_iter()
            .map(|i| i.messaging_hook)
            .collect(),
        gap_analyses: vec![],
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_api(server: &MockServer) -> AnalysisApi {
        AnalysisApi::new(HttpClient::new(), server.uri(), "test-token".to_string())
    }

    async fn mount_status(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/abc123/files/initial_analysis"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_fetch_record_projects_document() {
        let server = MockServer::start().await;
        mount_status(
            &server,
            json!({
                "overall_status": "initial_complete",
                "presigned_url": format!("{}/doc", server.uri())
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/doc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "company": {"name": "Acme Labs"},
                "more_info": {"industry": "biotech"},
                "ai_opportunity_hypotheses": [
                    {"hypothesis": "Automate QC", "why": "manual today"},
                    {"hypothesis": "Forecast demand", "why": "stockouts"}
                ],
                "value_prop_angles": [{"angle": "speed"}, {"angle": "cost"}],
                "pain_points_and_goals": [{"item": "slow QC", "why": "scale output"}],
                "icps_to_contact": [{"messaging_hook": "lab throughput"}]
            })))
            .mount(&server)
            .await;

        let record = test_api(&server).fetch_record("abc123").await.unwrap();

        assert_eq!(record.company, "Acme Labs");
        assert_eq!(record.about["industry"], "biotech");
        assert_eq!(record.opportunities.len(), 2);
        assert_eq!(record.opportunities[0].solution, "Automate QC");
        assert_eq!(record.opportunities[0].why, "manual today");
        assert_eq!(record.value_prop_angles, vec!["speed", "cost"]);
        assert_eq!(record.pain_points_and_goals[0].pain_point, "slow QC");
        assert_eq!(record.pain_points_and_goals[0].goal, "scale output");
        assert_eq!(record.hooks, vec!["lab throughput"]);
        assert!(record.gap_analyses.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_record_accepts_alternate_completion_flag() {
        let server = MockServer::start().await;
        mount_status(
            &server,
            json!({
                "status": "completed",
                "presigned_url": format!("{}/doc", server.uri())
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/doc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let record = test_api(&server).fetch_record("abc123").await.unwrap();
        assert_eq!(record.company, "");
    }

    #[tokio::test]
    async fn test_fetch_record_not_ready() {
        let server = MockServer::start().await;
        mount_status(&server, json!({"overall_status": "processing"})).await;

        let err = test_api(&server).fetch_record("abc123").await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamNotReady));
    }

    #[tokio::test]
    async fn test_fetch_record_unknown_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing/files/initial_analysis"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = test_api(&server).fetch_record("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_record_sparse_document_defaults_to_empty() {
        let server = MockServer::start().await;
        mount_status(
            &server,
            json!({
                "overall_status": "completed",
                "presigned_url": format!("{}/doc", server.uri())
            }),
        )
        .await;
        // Document with the wrong top-level shape entirely
        Mock::given(method("GET"))
            .and(path("/doc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["unexpected"])))
            .mount(&server)
            .await;

        let record = test_api(&server).fetch_record("abc123").await.unwrap();
        assert_eq!(record.company, "");
        assert!(record.opportunities.is_empty());
        assert!(record.hooks.is_empty());
    }
}
