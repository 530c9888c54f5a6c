use crate::{
    config::CircleEnv,
    error::{AppError, AppResult},
};

pub const DEFAULT_BASE_URL: &str = "https://app.circle.so";

fn base_url(raw: Option<&String>) -> String {
    raw.map(|s| s.trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

fn required(value: Option<&String>, key: &str, purpose: &str) -> AppResult<String> {
    value
        .cloned()
        .ok_or_else(|| AppError::Configuration(format!("{key} is required for {purpose}")))
}

/// Validated settings for the headless member API.
#[derive(Debug, Clone)]
pub struct HeadlessSettings {
    pub base_url: String,
    pub api_token: String,
    pub email: String,
    pub community_id: String,
}

impl HeadlessSettings {
    pub fn resolve(env: &CircleEnv) -> AppResult<Self> {
        let purpose = "the headless API";
        Ok(Self {
            base_url: base_url(env.headless_base_url.as_ref()),
            api_token: required(env.api_token.as_ref(), "CIRCLE_API_TOKEN", purpose)?,
            email: required(env.headless_email.as_ref(), "CIRCLE_HEADLESS_EMAIL", purpose)?,
            community_id: required(env.community_id.as_ref(), "CIRCLE_COMMUNITY_ID", purpose)?,
        })
    }
}

/// How the admin v2 API expects the API token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    Token,
    XApiToken,
}

impl AuthScheme {
    /// Unrecognized values fall back to bearer.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("token") => AuthScheme::Token,
            Some("x-api-token") => AuthScheme::XApiToken,
            _ => AuthScheme::Bearer,
        }
    }

    /// Header name and value carrying `token`.
    pub fn header(&self, token: &str) -> (&'static str, String) {
        match self {
            AuthScheme::Bearer => ("authorization", format!("Bearer {token}")),
            AuthScheme::Token => ("authorization", format!("Token token={token}")),
            AuthScheme::XApiToken => ("x-api-token", token.to_string()),
        }
    }
}

/// Validated settings for the admin v2 API.
#[derive(Debug, Clone)]
pub struct AdminSettings {
    pub base_url: String,
    pub api_token: String,
    pub scheme: AuthScheme,
    pub community_id: Option<String>,
}

impl AdminSettings {
    pub fn resolve(env: &CircleEnv) -> AppResult<Self> {
        Ok(Self {
            base_url: base_url(env.admin_base_url.as_ref()),
            api_token: required(env.api_token.as_ref(), "CIRCLE_API_TOKEN", "the admin API")?,
            scheme: AuthScheme::parse(env.admin_auth_scheme.as_deref()),
            community_id: env.community_id.clone(),
        })
    }
}
