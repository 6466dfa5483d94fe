/// Best-effort normalization of an OpenAI-compatible base URL into its chat
/// completions endpoint.
///
/// Rules, in order: trim whitespace and one trailing slash; keep URLs already
/// ending in `/chat/completions`; append `/chat/completions` to URLs ending in
/// `/v1`; otherwise append `/v1/chat/completions`. Providers with other path
/// layouts must be configured with the full endpoint.
pub fn normalize_api_url(base: &str) -> String {
    let mut url = base.trim();
    if let Some(stripped) = url.strip_suffix('/') {
        url = stripped;
    }

    if url.ends_with("/chat/completions") {
        return url.to_string();
    }

    if url.ends_with("/v1") {
        return format!("{url}/chat/completions");
    }

    format!("{url}/v1/chat/completions")
}
