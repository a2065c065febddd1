use std::time::Duration;

use async_trait::async_trait;

use crate::config::ExtractorSettings;
use crate::models::{ExtractionRequest, ExtractionResponse};

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_ENDPOINT: &str =
    "https://oo6o8y6la6.execute-api.eu-central-1.amazonaws.com/default/Upload-DownloadYoutubeLandingPage";
pub const DEFAULT_APP: &str = "transkriptor";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";
pub const DEFAULT_REFERER: &str = "https://transkriptor.com/";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("{0}")]
    Request(String),
    #[error("extraction API returned status {0}")]
    Upstream(reqwest::StatusCode),
    #[error("extraction API returned an unreadable body: {0}")]
    Decode(String),
}

// ── Extractor seam ───────────────────────────────────────────────────────────

/// Resolves a shared video URL into a direct download link.
#[async_trait]
pub trait LinkExtractor: Send + Sync {
    /// `Ok(None)` means the API answered but had no link to offer.
    async fn download_link(&self, video_url: &str) -> Result<Option<String>, ExtractionError>;
}

// ── HTTP client ──────────────────────────────────────────────────────────────

/// Shared outbound client. Per-call timeouts are set on each request.
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::ClientBuilder::new()
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
}

pub(crate) fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("TimeoutError: {}", e)
    } else if e.is_connect() {
        format!("ConnectError: {}", e)
    } else {
        format!("RequestError: {}", e)
    }
}

// ── Extraction API client ────────────────────────────────────────────────────

pub struct ExtractionClient {
    client: reqwest::Client,
    settings: ExtractorSettings,
}

impl ExtractionClient {
    pub fn new(client: reqwest::Client, settings: ExtractorSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl LinkExtractor for ExtractionClient {
    async fn download_link(&self, video_url: &str) -> Result<Option<String>, ExtractionError> {
        let payload = ExtractionRequest {
            url: video_url,
            app: &self.settings.app,
            is_only_download: true,
        };

        tracing::debug!(url = %video_url, endpoint = %self.settings.endpoint, "requesting download link");

        let response = self
            .client
            .post(&self.settings.endpoint)
            .timeout(self.settings.timeout())
            .header(reqwest::header::USER_AGENT, &self.settings.user_agent)
            .header(reqwest::header::REFERER, &self.settings.referer)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ExtractionError::Request(describe_request_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Upstream(status));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ExtractionError::Decode(e.to_string()))?;
        if !body.is_object() {
            return Err(ExtractionError::Decode("expected a JSON object".to_string()));
        }
        let body: ExtractionResponse =
            serde_json::from_value(body).map_err(|e| ExtractionError::Decode(e.to_string()))?;

        Ok(body.download_url.filter(|link| !link.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    async fn start_api_server() -> String {
        let app = Router::new()
            .route(
                "/link",
                post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                    let expected = json!({
                        "url": "https://youtu.be/abc",
                        "app": "transkriptor",
                        "is_only_download": true,
                    });
                    let referer_ok = headers
                        .get("referer")
                        .and_then(|v| v.to_str().ok())
                        == Some(DEFAULT_REFERER);
                    let agent_ok = headers
                        .get("user-agent")
                        .and_then(|v| v.to_str().ok())
                        == Some(DEFAULT_USER_AGENT);
                    if body != expected || !referer_ok || !agent_ok {
                        return (StatusCode::BAD_REQUEST, Json(json!({})));
                    }
                    (
                        StatusCode::OK,
                        Json(json!({"download_url": "https://cdn.example/video.mp4", "title": "x"})),
                    )
                }),
            )
            .route("/empty", post(|| async { Json(json!({"message": "nothing"})) }))
            .route("/blank", post(|| async { Json(json!({"download_url": ""})) }))
            .route(
                "/down",
                post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
            )
            .route("/garbage", post(|| async { "<html>oops</html>" }))
            .route("/array", post(|| async { Json(json!(["https://cdn.example/video.mp4"])) }))
            .route("/empty-array", post(|| async { Json(json!([])) }))
            .route("/numeric", post(|| async { Json(json!({"download_url": 42})) }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }

    fn client_for(endpoint: String) -> ExtractionClient {
        ExtractionClient::new(
            http_client().unwrap(),
            ExtractorSettings {
                endpoint,
                app: DEFAULT_APP.to_string(),
                user_agent: DEFAULT_USER_AGENT.to_string(),
                referer: DEFAULT_REFERER.to_string(),
                timeout_secs: 5,
            },
        )
    }

    #[tokio::test]
    async fn returns_link_from_api() {
        let server = start_api_server().await;
        let client = client_for(format!("{}/link", server));

        let link = client.download_link("https://youtu.be/abc").await.unwrap();
        assert_eq!(link.as_deref(), Some("https://cdn.example/video.mp4"));
    }

    #[tokio::test]
    async fn missing_or_blank_link_is_none() {
        let server = start_api_server().await;

        let missing = client_for(format!("{}/empty", server));
        assert_eq!(missing.download_link("https://youtu.be/abc").await.unwrap(), None);

        let blank = client_for(format!("{}/blank", server));
        assert_eq!(blank.download_link("https://youtu.be/abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = start_api_server().await;
        let client = client_for(format!("{}/down", server));

        let err = client.download_link("https://youtu.be/abc").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Upstream(s) if s.as_u16() == 503));
    }

    #[tokio::test]
    async fn non_json_body_is_an_error() {
        let server = start_api_server().await;
        let client = client_for(format!("{}/garbage", server));

        let err = client.download_link("https://youtu.be/abc").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Decode(_)));
    }

    #[tokio::test]
    async fn non_object_json_is_an_error() {
        let server = start_api_server().await;

        for route in ["array", "empty-array", "numeric"] {
            let client = client_for(format!("{}/{}", server, route));
            let err = client.download_link("https://youtu.be/abc").await.unwrap_err();
            assert!(matches!(err, ExtractionError::Decode(_)), "route {}", route);
        }
    }

    #[tokio::test]
    async fn unreachable_api_is_a_request_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{}/link", addr));
        let err = client.download_link("https://youtu.be/abc").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Request(_)));
    }
}
