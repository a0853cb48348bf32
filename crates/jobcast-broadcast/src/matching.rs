// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the host platform's candidate matching endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use jobcast_config::model::MatchingConfig;
use jobcast_core::JobcastError;
use jobcast_core::traits::MatchingService;
use jobcast_core::types::Applicant;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchWire {
    candidate_id: String,
    full_name: String,
    #[serde(default, alias = "phoneNumber")]
    contact_address: Option<String>,
}

impl From<MatchWire> for Applicant {
    fn from(w: MatchWire) -> Self {
        Applicant {
            candidate_id: w.candidate_id,
            full_name: w.full_name,
            contact_address: w.contact_address,
        }
    }
}

/// The endpoint answers with either a bare array or `{"data": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MatchesBody {
    Bare(Vec<MatchWire>),
    Wrapped { data: Vec<MatchWire> },
}

impl MatchesBody {
    fn into_matches(self) -> Vec<MatchWire> {
        match self {
            MatchesBody::Bare(v) | MatchesBody::Wrapped { data: v } => v,
        }
    }
}

/// Calls `GET {base_url}/jobs/{id}/matches?limit=N`.
#[derive(Clone)]
pub struct HttpMatchingService {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for HttpMatchingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMatchingService")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl HttpMatchingService {
    pub fn new(config: &MatchingConfig) -> Result<Self, JobcastError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| JobcastError::Internal(format!("failed to build matching client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }
}

fn upstream(message: impl Into<String>, source: reqwest::Error) -> JobcastError {
    JobcastError::Upstream {
        message: message.into(),
        source: Some(Box::new(source)),
    }
}

#[async_trait]
impl MatchingService for HttpMatchingService {
    async fn find_matching_applicants(
        &self,
        job_id: &str,
        limit: usize,
    ) -> Result<Vec<Applicant>, JobcastError> {
        let url = format!("{}/jobs/{job_id}/matches?limit={limit}", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| upstream("matching request failed", e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(JobcastError::Upstream {
                message: format!("matching service returned {status}"),
                source: None,
            });
        }

        let body: MatchesBody = resp
            .json()
            .await
            .map_err(|e| upstream("invalid matching response", e))?;
        let mut applicants: Vec<Applicant> =
            body.into_matches().into_iter().map(Applicant::from).collect();
        applicants.truncate(limit);
        debug!(job_id, count = applicants.len(), "matching applicants resolved");
        Ok(applicants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(uri: &str) -> HttpMatchingService {
        HttpMatchingService::new(&MatchingConfig {
            base_url: format!("{uri}/"),
            token: Some("match-secret".into()),
            timeout_secs: 1,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn resolves_bare_array_with_bearer_and_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/42/matches"))
            .and(query_param("limit", "2"))
            .and(header("authorization", "Bearer match-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"candidateId": "c1", "fullName": "Siti", "contactAddress": "0811"},
                {"candidateId": "c2", "fullName": "Budi"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let applicants = service(&server.uri())
            .find_matching_applicants("42", 2)
            .await
            .unwrap();
        assert_eq!(applicants.len(), 2);
        assert_eq!(applicants[0].contact_address.as_deref(), Some("0811"));
        assert_eq!(applicants[1].contact_address, None);
    }

    #[tokio::test]
    async fn resolves_wrapped_body_and_truncates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"candidateId": "c1", "fullName": "Siti", "phoneNumber": "0811"},
                    {"candidateId": "c2", "fullName": "Budi"},
                    {"candidateId": "c3", "fullName": "Ani"}
                ]
            })))
            .mount(&server)
            .await;

        let applicants = service(&server.uri())
            .find_matching_applicants("42", 2)
            .await
            .unwrap();
        assert_eq!(applicants.len(), 2);
        assert_eq!(applicants[0].contact_address.as_deref(), Some("0811"));
    }

    #[tokio::test]
    async fn error_status_is_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = service(&server.uri())
            .find_matching_applicants("42", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, JobcastError::Upstream { .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = service(&server.uri())
            .find_matching_applicants("42", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, JobcastError::Upstream { .. }));
    }

    #[test]
    fn debug_redacts_token() {
        let debug = format!("{:?}", service("http://localhost"));
        assert!(!debug.contains("match-secret"));
    }
}
