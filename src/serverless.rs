//! Adapter for serverless hosts that hand over a proxy-style JSON event and
//! expect `{statusCode, headers, body}` back. Requests are dispatched through
//! the same router the long-running server uses.

use std::collections::{BTreeMap, HashMap};

use anyhow::Context;
use axum::{
    body::{to_bytes, Body},
    http::Request,
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;
use url::form_urlencoded;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyEvent {
    #[serde(default)]
    pub http_method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub query_string_parameters: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

/// Runs one event through `app`. Never fails: dispatch errors become a 500
/// with the error text as body.
pub async fn handle_event(app: Router, event: ProxyEvent) -> ProxyResponse {
    match dispatch(app, event).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "serverless dispatch failed");
            ProxyResponse {
                status_code: 500,
                headers: HashMap::new(),
                body: format!("{:#}", e),
                is_base64_encoded: false,
            }
        }
    }
}

async fn dispatch(app: Router, event: ProxyEvent) -> anyhow::Result<ProxyResponse> {
    let request = into_request(event)?;
    let response = app.oneshot(request).await?;

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .context("reading response body")?;

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let (body, is_base64_encoded) = match String::from_utf8(bytes.to_vec()) {
        Ok(text) => (text, false),
        Err(e) => (STANDARD.encode(e.into_bytes()), true),
    };

    Ok(ProxyResponse {
        status_code: parts.status.as_u16(),
        headers,
        body,
        is_base64_encoded,
    })
}

fn into_request(event: ProxyEvent) -> anyhow::Result<Request<Body>> {
    let mut uri = event.path.unwrap_or_else(|| "/".to_string());
    if let Some(query) = event.query_string_parameters.filter(|q| !q.is_empty()) {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query.iter())
            .finish();
        uri.push('?');
        uri.push_str(&encoded);
    }

    let mut builder = Request::builder()
        .method(event.http_method.as_deref().unwrap_or("GET"))
        .uri(&uri);
    for (name, value) in event.headers.iter().flatten() {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let body = match event.body {
        Some(body) if event.is_base64_encoded => {
            Body::from(STANDARD.decode(body).context("decoding base64 event body")?)
        }
        Some(body) => Body::from(body),
        None => Body::empty(),
    };

    builder
        .body(body)
        .with_context(|| format!("building request for {}", uri))
}
