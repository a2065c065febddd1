use url::Url;

pub const DEFAULT_ALLOWED_DOMAINS: &[&str] = &["youtube.com", "youtu.be"];

/// Percent-decodes `raw`, replacing invalid UTF-8 sequences.
pub fn decode(raw: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}

/// True when the decoded `raw` is an absolute http(s) URL whose host contains
/// one of `allowed` (case-insensitive).
pub fn is_valid_video_url<S: AsRef<str>>(raw: &str, allowed: &[S]) -> bool {
    let Ok(parsed) = Url::parse(&decode(raw)) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let host = parsed.host_str().unwrap_or("").to_lowercase();
    !host.is_empty()
        && allowed
            .iter()
            .any(|domain| host.contains(&domain.as_ref().to_lowercase()))
}
