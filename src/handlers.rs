use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{RawQuery, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::{ResponseMode, Settings};
use crate::error::RelayError;
use crate::extract::{self, ExtractionClient, LinkExtractor};
use crate::models::{LinkResponse, YtQuery};
use crate::{relay, validate};

/// Immutable per-process service state; cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<dyn LinkExtractor>,
    pub http: reqwest::Client,
    pub allowed_domains: Arc<[String]>,
    pub mode: ResponseMode,
    pub temp_dir: PathBuf,
    pub download_timeout: Duration,
}

impl AppState {
    pub fn from_settings(settings: &Settings) -> Result<Self, reqwest::Error> {
        let http = extract::http_client()?;
        let extractor = ExtractionClient::new(http.clone(), settings.extractor.clone());

        Ok(Self {
            extractor: Arc::new(extractor),
            http,
            allowed_domains: settings.allowed_domains.clone().into(),
            mode: settings.response_mode,
            temp_dir: settings.download.temp_dir(),
            download_timeout: settings.download.timeout(),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/yt", get(yt_endpoint))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn yt_endpoint(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Response {
    let query = raw
        .as_deref()
        .map(YtQuery::from_query_string)
        .unwrap_or_default();
    match relay_video(&state, query).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn relay_video(state: &AppState, query: YtQuery) -> Result<Response, RelayError> {
    let original_url = match query.url {
        Some(url) if !url.is_empty() => url,
        _ => {
            tracing::info!("rejected request without url");
            return Err(RelayError::MissingUrl);
        }
    };

    if !validate::is_valid_video_url(&original_url, &state.allowed_domains[..]) {
        tracing::info!(url = %original_url, "rejected url outside allow-list");
        return Err(RelayError::InvalidUrl);
    }

    let video_url = validate::decode(&original_url);
    let link = state
        .extractor
        .download_link(&video_url)
        .await
        .map_err(|e| {
            tracing::warn!(url = %video_url, error = %e, "extraction failed");
            RelayError::from(e)
        })?;

    let Some(download_url) = link else {
        tracing::info!(url = %video_url, "extraction returned no link");
        return Err(RelayError::NoDownloadLink);
    };

    match state.mode {
        ResponseMode::Json => {
            tracing::info!(url = %video_url, "download link resolved");
            let body = LinkResponse {
                status: "success".to_string(),
                download_url,
                original_url,
            };
            Ok(Json(body).into_response())
        }
        ResponseMode::Stream => relay::stream_download(
            &state.http,
            &download_url,
            &state.temp_dir,
            state.download_timeout,
        )
        .await
        .map_err(|e| {
            tracing::warn!(url = %video_url, link = %download_url, error = %e, "relay failed");
            e
        }),
    }
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "request handler panicked".to_string()
    };
    tracing::error!(detail = %detail, "request handler panicked");
    RelayError::Unexpected(detail).into_response()
}
