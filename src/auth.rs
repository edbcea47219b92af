use std::fmt;

use axum::http::HeaderMap;
use serde::Serialize;

use crate::config::AppConfig;
use crate::error::AppError;

/// Header carrying the end user's token when the app runs on-behalf-of.
pub const USER_TOKEN_HEADER: &str = "x-forwarded-access-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    OnBehalfOf,
    ServicePrincipal,
}

#[derive(Clone)]
pub struct Credentials {
    pub host: String,
    pub token: String,
    pub mode: AuthMode,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .field("mode", &self.mode)
            .finish()
    }
}

impl Credentials {
    /// A user token wins over the service token.
    pub fn resolve(config: &AppConfig, user_token: Option<&str>) -> Result<Self, AppError> {
        let host = config
            .host()
            .ok_or_else(|| AppError::Config("DATABRICKS_HOST not configured".to_string()))?;

        if let Some(token) = user_token.map(str::trim).filter(|t| !t.is_empty()) {
            return Ok(Self {
                host,
                token: token.to_string(),
                mode: AuthMode::OnBehalfOf,
            });
        }

        let token = config
            .databricks_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::Config(
                    "No authentication token available (check OAuth configuration)".to_string(),
                )
            })?;

        Ok(Self {
            host,
            token: token.to_string(),
            mode: AuthMode::ServicePrincipal,
        })
    }
}

pub fn auth_mode(user_token: Option<&str>) -> AuthMode {
    match user_token {
        Some(t) if !t.trim().is_empty() => AuthMode::OnBehalfOf,
        _ => AuthMode::ServicePrincipal,
    }
}

pub fn user_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(host: Option<&str>, token: Option<&str>) -> AppConfig {
        AppConfig {
            databricks_host: host.map(str::to_string),
            databricks_token: token.map(str::to_string),
            ..AppConfig::default()
        }
    }

    #[test]
    fn user_token_takes_precedence() {
        let creds = Credentials::resolve(&config(Some("adb.example.net"), Some("svc")), Some("usr")).unwrap();
        assert_eq!(creds.token, "usr");
        assert_eq!(creds.mode, AuthMode::OnBehalfOf);
        assert_eq!(creds.host, "https://adb.example.net");
    }

    #[test]
    fn falls_back_to_service_token() {
        let creds = Credentials::resolve(&config(Some("adb.example.net"), Some("svc")), Some("  ")).unwrap();
        assert_eq!(creds.token, "svc");
        assert_eq!(creds.mode, AuthMode::ServicePrincipal);
        assert!(!format!("{creds:?}").contains("svc"));
    }

    #[test]
    fn missing_pieces_are_config_errors() {
        assert!(matches!(
            Credentials::resolve(&config(None, Some("svc")), None),
            Err(AppError::Config(msg)) if msg.contains("DATABRICKS_HOST")
        ));
        assert!(matches!(
            Credentials::resolve(&config(Some("h"), None), None),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn reads_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_token(&headers), None);
        headers.insert(USER_TOKEN_HEADER, "abc".parse().unwrap());
        assert_eq!(user_token(&headers).as_deref(), Some("abc"));
        assert_eq!(auth_mode(Some("abc")), AuthMode::OnBehalfOf);
    }
}
