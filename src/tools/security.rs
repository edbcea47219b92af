use crate::error::AppError;

/// Accepts absolute http(s) URLs with a host; anything else is refused
/// before a request is made.
pub fn validate_endpoint_url(input: &str) -> Result<url::Url, AppError> {
    let parsed = url::Url::parse(input.trim())
        .map_err(|e| AppError::Tool(format!("Invalid endpoint_url '{input}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AppError::Tool(format!(
                "Unsupported URL scheme '{other}', only http and https are allowed"
            )))
        }
    }

    if parsed.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(AppError::Tool("endpoint_url has no host".to_string()));
    }
    Ok(parsed)
}

pub fn validate_http_method(input: &str) -> Result<reqwest::Method, AppError> {
    let upper = input.trim().to_ascii_uppercase();
    match upper.as_str() {
        "GET" | "POST" | "PUT" | "PATCH" | "DELETE" | "HEAD" | "OPTIONS" => {
            reqwest::Method::from_bytes(upper.as_bytes()).map_err(|e| AppError::Tool(e.to_string()))
        }
        _ => Err(AppError::Tool(format!("Unsupported HTTP method '{input}'"))),
    }
}
