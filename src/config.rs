use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Raw Circle settings as found in the environment.
///
/// Nothing here is validated at startup: the gateway resolves these on
/// every call so a missing token only breaks the routes that need it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CircleEnv {
    pub headless_base_url: Option<String>,
    pub admin_base_url: Option<String>,
    pub api_token: Option<String>,
    pub headless_email: Option<String>,
    pub community_id: Option<String>,
    pub admin_auth_scheme: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub circle: CircleEnv,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "circle-admin".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "circle-admin-ui".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let circle = CircleEnv::from_env();
        Ok(Self {
            database_url,
            jwt,
            circle,
        })
    }
}

impl CircleEnv {
    pub fn from_env() -> Self {
        Self {
            headless_base_url: non_empty_var("CIRCLE_HEADLESS_BASE_URL"),
            admin_base_url: non_empty_var("CIRCLE_ADMIN_BASE_URL"),
            api_token: non_empty_var("CIRCLE_API_TOKEN"),
            headless_email: non_empty_var("CIRCLE_HEADLESS_EMAIL"),
            community_id: non_empty_var("CIRCLE_COMMUNITY_ID"),
            admin_auth_scheme: non_empty_var("CIRCLE_ADMIN_AUTH_SCHEME"),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
