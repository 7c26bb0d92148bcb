//! HTTP client for the recommender server.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, Result};

/// Default server address.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// A job description as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub jd: String,
}

#[derive(Debug, Deserialize)]
struct RecommendResponse {
    recommendations: Vec<Recommendation>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    message: String,
}

/// Result of saving a job description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SaveResult {
    pub message: String,
    pub replaced: bool,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
    #[serde(default)]
    stale_index: bool,
}

/// Client for the recommender HTTP API.
#[derive(Debug, Clone)]
pub struct RecommenderClient {
    base_url: String,
    http: reqwest::Client,
}

impl RecommenderClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(base_url));
        }

        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        debug!("POST {url}");

        let mut request = self.http.post(&url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) if body.stale_index => ClientError::StaleIndex(body.detail),
                Ok(body) => ClientError::Server {
                    status: status.as_u16(),
                    detail: body.detail,
                },
                Err(_) => ClientError::Server {
                    status: status.as_u16(),
                    detail: text,
                },
            });
        }

        Ok(response.json().await?)
    }

    /// Fetch up to `k` recommendations for a position name.
    ///
    /// The server default applies when `k` is `None`.
    pub async fn recommend(&self, position: &str, k: Option<usize>) -> Result<Vec<Recommendation>> {
        let mut body = serde_json::json!({ "position_name": position });
        if let Some(k) = k {
            body["k"] = k.into();
        }

        let response: RecommendResponse = self
            .post("/recommend_job_description/", Some(body))
            .await?;
        Ok(response.recommendations)
    }

    /// Rebuild the server index from its corpus file and return the
    /// server's message.
    pub async fn reload(&self) -> Result<String> {
        let response: StatusResponse = self.post("/reload_data/", None).await?;
        Ok(response.message)
    }

    /// Save a job description and trigger a reindex.
    ///
    /// Blank titles and JDs are rejected without contacting the server.
    pub async fn upsert(&self, title: &str, jd: &str, force: bool) -> Result<SaveResult> {
        if title.trim().is_empty() {
            return Err(ClientError::EmptyField("title"));
        }
        if jd.trim().is_empty() {
            return Err(ClientError::EmptyField("job description"));
        }

        let body = serde_json::json!({ "title": title, "jd": jd, "force": force });
        self.post("/upsert_job_description/", Some(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = RecommenderClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_new_rejects_non_http_url() {
        assert!(matches!(
            RecommenderClient::new("localhost:8000"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_recommend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/recommend_job_description/"))
            .and(body_json(serde_json::json!({
                "position_name": "Backend Developer",
                "k": 2
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "recommendations": [
                    {"title": "Backend Developer", "jd": "Build APIs."},
                    {"title": "Platform Engineer", "jd": "Run clusters."}
                ]
            })))
            .mount(&server)
            .await;

        let client = RecommenderClient::new(server.uri()).unwrap();
        let recommendations = client.recommend("Backend Developer", Some(2)).await.unwrap();

        assert_eq!(
            recommendations,
            vec![
                Recommendation {
                    title: "Backend Developer".to_string(),
                    jd: "Build APIs.".to_string(),
                },
                Recommendation {
                    title: "Platform Engineer".to_string(),
                    jd: "Run clusters.".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_recommend_surfaces_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/recommend_job_description/"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "detail": "collection job_descriptions not found, reload data first"
            })))
            .mount(&server)
            .await;

        let client = RecommenderClient::new(server.uri()).unwrap();
        let err = client.recommend("Anything", None).await.unwrap_err();

        match err {
            ClientError::Server { status, detail } => {
                assert_eq!(status, 500);
                assert_eq!(
                    detail,
                    "collection job_descriptions not found, reload data first"
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_reload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reload_data/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "message": "12 job descriptions loaded."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RecommenderClient::new(server.uri()).unwrap();
        assert_eq!(client.reload().await.unwrap(), "12 job descriptions loaded.");
    }

    #[tokio::test]
    async fn test_upsert() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upsert_job_description/"))
            .and(body_json(serde_json::json!({
                "title": "QA Engineer",
                "jd": "Test things.",
                "force": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "message": "JD for 'QA Engineer' has been saved/updated; 4 job descriptions loaded.",
                "replaced": false,
                "count": 4
            })))
            .mount(&server)
            .await;

        let client = RecommenderClient::new(server.uri()).unwrap();
        let result = client.upsert("QA Engineer", "Test things.", false).await.unwrap();

        assert!(!result.replaced);
        assert_eq!(result.count, 4);
    }

    #[tokio::test]
    async fn test_upsert_stale_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upsert_job_description/"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "detail": "index rebuild failed after save",
                "stale_index": true
            })))
            .mount(&server)
            .await;

        let client = RecommenderClient::new(server.uri()).unwrap();
        let err = client.upsert("QA Engineer", "Test.", false).await.unwrap_err();

        assert!(matches!(err, ClientError::StaleIndex(ref detail) if detail == "index rebuild failed after save"));
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_plain_500_is_not_stale() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upsert_job_description/"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "detail": "job description saved but reindex failed"
            })))
            .mount(&server)
            .await;

        let client = RecommenderClient::new(server.uri()).unwrap();
        let err = client.upsert("QA Engineer", "Test.", false).await.unwrap_err();

        assert!(matches!(err, ClientError::Server { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_upsert_rejects_blank_fields_locally() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = RecommenderClient::new(server.uri()).unwrap();

        let err = client.upsert("QA Engineer", "  \n", false).await.unwrap_err();
        assert!(matches!(err, ClientError::EmptyField("job description")));

        let err = client.upsert(" ", "Test things.", false).await.unwrap_err();
        assert!(matches!(err, ClientError::EmptyField("title")));

        server.verify().await;
    }

    #[tokio::test]
    async fn test_upsert_conflict_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upsert_job_description/"))
            .respond_with(ResponseTemplate::new(409).set_body_string("corpus is malformed"))
            .mount(&server)
            .await;

        let client = RecommenderClient::new(server.uri()).unwrap();
        let err = client.upsert("QA Engineer", "Test.", false).await.unwrap_err();

        assert_eq!(err.status(), Some(409));
        assert!(err.to_string().contains("corpus is malformed"));
    }
}
