use std::sync::Arc;

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::{
    clock::Clock,
    settings::HeadlessSettings,
    token_cache::{TokenCache, AUTH_TOKEN_TTL},
    transport::{HttpTransport, UpstreamRequest, UpstreamResponse},
    types::{HeadlessAuth, MemberProfile, MemberSummary, Page},
};
use crate::{
    config::CircleEnv,
    error::{AppError, AppResult},
};

const AUTH_TOKEN_PATH: &str = "/api/v1/headless/auth_token";

/// A call relative to the headless API base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }
}

/// Query accepted by the member list.
#[derive(Debug, Clone, Default)]
pub struct MemberQuery {
    pub page: u32,
    pub per_page: u32,
    pub search: Option<String>,
}

pub(crate) fn build_url(base: &str, path: &str, query: &[(String, String)]) -> AppResult<String> {
    let mut url = Url::parse(&format!("{base}{path}"))
        .map_err(|e| AppError::Configuration(format!("invalid Circle URL {base}{path}: {e}")))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.iter());
    }
    Ok(url.to_string())
}

pub(crate) fn decode<T: DeserializeOwned>(what: &str, body: &str) -> AppResult<T> {
    serde_json::from_str(body).map_err(|e| {
        warn!(error = %e, what, "upstream payload did not match the expected shape");
        AppError::Decode(format!("{what}: {e}"))
    })
}

/// Owns the headless auth token and dispatches authorized calls.
pub struct CircleGateway {
    env: CircleEnv,
    transport: Arc<dyn HttpTransport>,
    tokens: TokenCache<HeadlessAuth>,
}

impl CircleGateway {
    pub fn new(env: CircleEnv, transport: Arc<dyn HttpTransport>, clock: Arc<dyn Clock>) -> Self {
        Self {
            env,
            transport,
            tokens: TokenCache::new(AUTH_TOKEN_TTL, clock),
        }
    }

    pub async fn invalidate_token(&self) {
        self.tokens.invalidate().await;
    }

    async fn authenticate(&self, cfg: &HeadlessSettings) -> AppResult<HeadlessAuth> {
        let req = UpstreamRequest {
            method: Method::POST,
            url: build_url(&cfg.base_url, AUTH_TOKEN_PATH, &[])?,
            headers: vec![
                ("authorization", format!("Bearer {}", cfg.api_token)),
                ("content-type", "application/json".into()),
                ("accept", "application/json".into()),
            ],
            body: Some(json!({ "email": cfg.email })),
        };
        let res = self.transport.send(req).await?;
        if !res.is_success() {
            warn!(status = res.status, "headless authentication failed");
            return Err(AppError::Upstream {
                status: res.status,
                body: res.body,
            });
        }
        let auth: HeadlessAuth = decode("auth token", &res.body)?;
        info!(
            community_id = ?auth.community_id,
            expires_at = ?auth.access_token_expires_at,
            "headless token acquired"
        );
        Ok(auth)
    }

    async fn token(&self, cfg: &HeadlessSettings) -> AppResult<Arc<HeadlessAuth>> {
        self.tokens.get_or_fetch(|| self.authenticate(cfg)).await
    }

    async fn send(&self, url: &str, req: &ApiRequest, token: &str) -> AppResult<UpstreamResponse> {
        self.transport
            .send(UpstreamRequest {
                method: req.method.clone(),
                url: url.to_string(),
                headers: vec![
                    ("authorization", format!("Bearer {token}")),
                    ("content-type", "application/json".into()),
                    ("accept", "application/json".into()),
                    ("cache-control", "no-store".into()),
                ],
                body: req.body.clone(),
            })
            .await
    }

    /// Authorized call returning the raw JSON body.
    ///
    /// A 401 drops the cached token, re-authenticates once and retries once;
    /// whatever the retry returns is final.
    #[instrument(skip(self, req), fields(method = %req.method, path = %req.path))]
    pub async fn call(&self, req: ApiRequest) -> AppResult<Value> {
        let body = self.call_raw(&req).await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        decode("response body", &body)
    }

    async fn call_raw(&self, req: &ApiRequest) -> AppResult<String> {
        let cfg = HeadlessSettings::resolve(&self.env)?;
        let url = build_url(&cfg.base_url, &req.path, &req.query)?;

        let auth = self.token(&cfg).await?;
        let mut res = self.send(&url, req, &auth.access_token).await?;

        if res.status == 401 {
            warn!("headless token rejected; re-authenticating once");
            self.tokens.invalidate().await;
            let fresh = self.token(&cfg).await?;
            res = self.send(&url, req, &fresh.access_token).await?;
        }

        if !res.is_success() {
            return Err(AppError::Upstream {
                status: res.status,
                body: res.body,
            });
        }
        debug!(status = res.status, bytes = res.body.len(), "upstream ok");
        Ok(res.body)
    }

    async fn call_typed<T: DeserializeOwned>(&self, what: &str, req: ApiRequest) -> AppResult<T> {
        let value = self.call(req).await?;
        serde_json::from_value(value).map_err(|e| {
            warn!(error = %e, what, "upstream payload did not match the expected shape");
            AppError::Decode(format!("{what}: {e}"))
        })
    }

    pub async fn current_member(&self) -> AppResult<MemberProfile> {
        self.call_typed(
            "current member",
            ApiRequest::get("/api/headless/v1/community_member"),
        )
        .await
    }

    pub async fn list_members(&self, q: &MemberQuery) -> AppResult<Page<MemberSummary>> {
        let req = ApiRequest::get("/api/headless/v1/community_members")
            .query("page", q.page)
            .query("per_page", q.per_page)
            .query_opt("search", q.search.as_deref().filter(|s| !s.is_empty()));
        self.call_typed("member list", req).await
    }

    pub async fn member_details(&self, id: u64) -> AppResult<MemberProfile> {
        self.call_typed(
            "member details",
            ApiRequest::get(format!("/api/headless/v1/community_members/{id}")),
        )
        .await
    }

    pub async fn member_public_profile(&self, id: u64) -> AppResult<MemberProfile> {
        self.call_typed(
            "public profile",
            ApiRequest::get(format!(
                "/api/headless/v1/community_members/{id}/public_profile"
            )),
        )
        .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::circle::{
        clock::manual::ManualClock,
        transport::fake::{respond, FakeTransport},
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn test_env() -> CircleEnv {
        CircleEnv {
            headless_base_url: Some("https://circle.test".into()),
            admin_base_url: Some("https://circle.test".into()),
            api_token: Some("api-token".into()),
            headless_email: Some("bot@example.com".into()),
            community_id: Some("7".into()),
            admin_auth_scheme: None,
        }
    }

    pub(crate) fn auth_body(token: &str) -> String {
        json!({
            "access_token": token,
            "refresh_token": "r",
            "access_token_expires_at": "2030-01-01T00:00:00Z",
            "refresh_token_expires_at": "2030-01-02T00:00:00Z",
            "community_member_id": 1,
            "community_id": 7
        })
        .to_string()
    }

    fn gateway(transport: Arc<FakeTransport>) -> (CircleGateway, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (CircleGateway::new(test_env(), transport, clock.clone()), clock)
    }

    #[tokio::test]
    async fn attaches_bearer_and_caches_token() {
        let transport = Arc::new(FakeTransport::new(|req| {
            if req.url.ends_with(AUTH_TOKEN_PATH) {
                respond(200, auth_body("tok-1"))
            } else {
                respond(200, r#"{"ok": true}"#)
            }
        }));
        let (gw, _) = gateway(transport.clone());

        gw.call(ApiRequest::get("/api/headless/v1/community_member")).await.unwrap();
        let value = gw.call(ApiRequest::get("/api/headless/v1/community_member")).await.unwrap();
        assert_eq!(value, json!({"ok": true}));

        assert_eq!(transport.count(AUTH_TOKEN_PATH), 1);
        let reqs = transport.requests();
        let auth = &reqs[0];
        assert_eq!(auth.method, Method::POST);
        assert_eq!(auth.header("authorization"), Some("Bearer api-token"));
        assert_eq!(auth.body, Some(json!({"email": "bot@example.com"})));
        let call = &reqs[1];
        assert_eq!(call.header("Authorization"), Some("Bearer tok-1"));
        assert_eq!(call.header("cache-control"), Some("no-store"));
        assert_eq!(call.header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn token_is_reacquired_after_ttl() {
        let transport = Arc::new(FakeTransport::new(|req| {
            if req.url.ends_with(AUTH_TOKEN_PATH) {
                respond(200, auth_body("tok"))
            } else {
                respond(200, "{}")
            }
        }));
        let (gw, clock) = gateway(transport.clone());
        gw.call(ApiRequest::get("/x")).await.unwrap();
        clock.advance(time::Duration::minutes(16));
        gw.call(ApiRequest::get("/x")).await.unwrap();
        assert_eq!(transport.count(AUTH_TOKEN_PATH), 2);
    }

    #[tokio::test]
    async fn retries_once_after_401_with_fresh_token() {
        let auths = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let (a, c) = (auths.clone(), calls.clone());
        let transport = Arc::new(FakeTransport::new(move |req| {
            if req.url.ends_with(AUTH_TOKEN_PATH) {
                let n = a.fetch_add(1, Ordering::SeqCst);
                respond(200, auth_body(&format!("tok-{n}")))
            } else if c.fetch_add(1, Ordering::SeqCst) == 0 {
                respond(401, "expired")
            } else {
                respond(200, r#"{"records": []}"#)
            }
        }));
        let (gw, _) = gateway(transport.clone());

        let value = gw.call(ApiRequest::get("/x")).await.unwrap();
        assert_eq!(value, json!({"records": []}));
        assert_eq!(auths.load(Ordering::SeqCst), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let reqs = transport.requests();
        assert_eq!(reqs.last().unwrap().header("authorization"), Some("Bearer tok-1"));
    }

    #[tokio::test]
    async fn second_401_is_terminal() {
        let transport = Arc::new(FakeTransport::new(|req| {
            if req.url.ends_with(AUTH_TOKEN_PATH) {
                respond(200, auth_body("tok"))
            } else {
                respond(401, "still expired")
            }
        }));
        let (gw, _) = gateway(transport.clone());
        match gw.call(ApiRequest::get("/x")).await {
            Err(AppError::Upstream { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "still expired");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
        assert_eq!(transport.count("/x"), 2);
        assert_eq!(transport.count(AUTH_TOKEN_PATH), 2);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let transport = Arc::new(FakeTransport::new(|req| {
            if req.url.ends_with(AUTH_TOKEN_PATH) {
                respond(200, auth_body("tok"))
            } else {
                respond(503, "down")
            }
        }));
        let (gw, _) = gateway(transport.clone());
        let err = gw.call(ApiRequest::get("/x")).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream { status: 503, .. }));
        assert_eq!(transport.count("/x"), 1);
    }

    #[tokio::test]
    async fn missing_configuration_fails_before_network() {
        let transport = Arc::new(FakeTransport::new(|_| respond(200, "{}")));
        let mut env = test_env();
        env.headless_email = None;
        let gw = CircleGateway::new(env, transport.clone(), Arc::new(ManualClock::new()));
        let err = gw.call(ApiRequest::get("/x")).await.unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn list_members_builds_query_and_rejects_unknown_shape() {
        let transport = Arc::new(FakeTransport::new(|req| {
            if req.url.ends_with(AUTH_TOKEN_PATH) {
                respond(200, auth_body("tok"))
            } else {
                respond(200, r#"{"members": [{"id": 1}]}"#)
            }
        }));
        let (gw, _) = gateway(transport.clone());
        let q = MemberQuery {
            page: 2,
            per_page: 50,
            search: Some("ana maria".into()),
        };
        let err = gw.list_members(&q).await.unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));

        let url = &transport.requests()[1].url;
        assert!(url.starts_with("https://circle.test/api/headless/v1/community_members?"));
        assert!(url.contains("page=2"));
        assert!(url.contains("per_page=50"));
        assert!(url.contains("search=ana+maria"));
    }
}
