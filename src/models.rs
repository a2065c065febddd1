use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
pub struct YtQuery {
    pub url: Option<String>,
}

impl YtQuery {
    /// Takes the first `url` pair; repeats and unknown keys are ignored.
    pub fn from_query_string(raw: &str) -> Self {
        let url = url::form_urlencoded::parse(raw.as_bytes())
            .find(|(key, _)| key == "url")
            .map(|(_, value)| value.into_owned());
        Self { url }
    }
}

/// Body sent to the extraction API.
#[derive(Debug, Serialize)]
pub struct ExtractionRequest<'a> {
    pub url: &'a str,
    pub app: &'a str,
    pub is_only_download: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExtractionResponse {
    #[serde(default)]
    pub download_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkResponse {
    pub status: String,
    pub download_url: String,
    pub original_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_url_pair_wins() {
        let query = YtQuery::from_query_string("x=1&url=https%3A%2F%2Fyoutu.be%2Fa&url=b");
        assert_eq!(query.url.as_deref(), Some("https://youtu.be/a"));
    }

    #[test]
    fn absent_url_is_none() {
        assert!(YtQuery::from_query_string("v=abc").url.is_none());
        assert!(YtQuery::from_query_string("").url.is_none());
    }
}
