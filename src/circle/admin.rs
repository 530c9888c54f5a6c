use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use super::{
    gateway::{build_url, decode},
    settings::AdminSettings,
    transport::{HttpTransport, UpstreamRequest},
    types::{Extra, Page},
};
use crate::{
    config::CircleEnv,
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationLink {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub revoked_at: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Items arrive either bare or under a single `invitation_link` key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LinkItem {
    Wrapped { invitation_link: InvitationLink },
    Bare(InvitationLink),
}

impl From<LinkItem> for InvitationLink {
    fn from(item: LinkItem) -> Self {
        match item {
            LinkItem::Wrapped { invitation_link } => invitation_link,
            LinkItem::Bare(link) => link,
        }
    }
}

/// The two list shapes the admin API is known to return.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LinksPayload {
    Named { invitation_links: Vec<LinkItem> },
    Paged(Page<LinkItem>),
}

impl LinksPayload {
    fn into_links(self) -> Vec<InvitationLink> {
        let items = match self {
            LinksPayload::Named { invitation_links } => invitation_links,
            LinksPayload::Paged(page) => page.records,
        };
        items.into_iter().map(InvitationLink::from).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinkQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Client for the admin v2 API, authenticated with the API token directly.
pub struct AdminClient {
    env: CircleEnv,
    transport: Arc<dyn HttpTransport>,
}

impl AdminClient {
    pub fn new(env: CircleEnv, transport: Arc<dyn HttpTransport>) -> Self {
        Self { env, transport }
    }

    async fn get(&self, path: &str, query: Vec<(String, String)>) -> AppResult<String> {
        let cfg = AdminSettings::resolve(&self.env)?;
        let (auth_name, auth_value) = cfg.scheme.header(&cfg.api_token);
        let res = self
            .transport
            .send(UpstreamRequest {
                method: Method::GET,
                url: build_url(&cfg.base_url, path, &query)?,
                headers: vec![
                    (auth_name, auth_value),
                    ("content-type", "application/json".into()),
                    ("accept", "application/json".into()),
                    ("cache-control", "no-store".into()),
                ],
                body: None,
            })
            .await?;
        if !res.is_success() {
            warn!(status = res.status, path, "admin API call failed");
            return Err(AppError::Upstream {
                status: res.status,
                body: res.body,
            });
        }
        Ok(res.body)
    }

    #[instrument(skip(self))]
    pub async fn list_invitation_links(&self, q: &LinkQuery) -> AppResult<Vec<InvitationLink>> {
        let community_id = AdminSettings::resolve(&self.env)?.community_id;
        let mut query = Vec::new();
        // Zero is treated as "not given", matching the dashboard's links.
        if let Some(page) = q.page.filter(|p| *p > 0) {
            query.push(("page".to_string(), page.to_string()));
        }
        if let Some(per_page) = q.per_page.filter(|p| *p > 0) {
            query.push(("per_page".to_string(), per_page.to_string()));
        }
        if let Some(id) = community_id {
            query.push(("community_id".to_string(), id));
        }

        let body = self.get("/api/admin/v2/invitation_links", query).await?;
        let payload: LinksPayload = decode("invitation links", &body)?;
        Ok(payload.into_links())
    }
}

/// Response body of the invitation-links route.
#[derive(Debug, Serialize)]
pub struct InvitationLinksResponse {
    pub invitation_links: Vec<InvitationLink>,
}

impl From<Vec<InvitationLink>> for InvitationLinksResponse {
    fn from(invitation_links: Vec<InvitationLink>) -> Self {
        Self { invitation_links }
    }
}
