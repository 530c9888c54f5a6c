use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Deserializer};
use tracing::{info, instrument};

use super::{
    admin::{InvitationLinksResponse, LinkQuery},
    enrich::list_enriched,
    gateway::MemberQuery,
    types::{BrokerInfo, EnrichedMember, MemberDetails, MemberProfile, Page},
};
use crate::{
    auth::extractors::AdminSession,
    error::{AppError, AppResult},
    state::AppState,
};

const DEFAULT_PER_PAGE: u32 = 300;

/// Blank or zero paging values mean "use the default".
fn positive_or_none<'de, D>(de: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse::<u32>()
            .map(|n| (n > 0).then_some(n))
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
pub struct MembersParams {
    #[serde(default, deserialize_with = "positive_or_none")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "positive_or_none")]
    pub per_page: Option<u32>,
    pub search: Option<String>,
}

impl From<MembersParams> for MemberQuery {
    fn from(p: MembersParams) -> Self {
        Self {
            page: p.page.unwrap_or(1),
            per_page: p.per_page.unwrap_or(DEFAULT_PER_PAGE),
            search: p.search.filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LinksParams {
    #[serde(default, deserialize_with = "positive_or_none")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "positive_or_none")]
    pub per_page: Option<u32>,
}

pub fn circle_routes() -> Router<AppState> {
    Router::new()
        .route("/circle/members", get(list_members))
        .route("/circle/member/:id", get(get_member))
        .route("/circle/profile", get(get_profile))
        .route("/circle/invitation-links", get(list_invitation_links))
}

#[instrument(skip_all)]
pub async fn list_members(
    State(state): State<AppState>,
    _session: AdminSession,
    params: Result<Query<MembersParams>, QueryRejection>,
) -> AppResult<Json<Page<EnrichedMember>>> {
    let Query(params) = params?;
    let query = MemberQuery::from(params);
    let page = list_enriched(&state.circle, state.stagger, &query).await?;
    info!(rows = page.records.len(), "member page served");
    Ok(Json(page))
}

#[instrument(skip(state, _session))]
pub async fn get_member(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<String>,
) -> AppResult<Json<MemberDetails>> {
    let id: u64 = id
        .trim()
        .parse()
        .map_err(|_| AppError::Validation("Invalid member ID".into()))?;
    let member = state.circle.member_details(id).await?;
    let broker_info = BrokerInfo::from_fields(&member.profile_fields);
    Ok(Json(MemberDetails {
        member,
        broker_info,
    }))
}

#[instrument(skip_all)]
pub async fn get_profile(
    State(state): State<AppState>,
    _session: AdminSession,
) -> AppResult<Json<MemberProfile>> {
    Ok(Json(state.circle.current_member().await?))
}

#[instrument(skip_all)]
pub async fn list_invitation_links(
    State(state): State<AppState>,
    _session: AdminSession,
    params: Result<Query<LinksParams>, QueryRejection>,
) -> AppResult<Json<InvitationLinksResponse>> {
    let Query(params) = params?;
    let links = state
        .admin_api
        .list_invitation_links(&LinkQuery {
            page: params.page,
            per_page: params.per_page,
        })
        .await?;
    Ok(Json(links.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{dto::Principal, repo_types::ADMIN_ROLE};
    use crate::circle::gateway::tests::auth_body;
    use crate::circle::transport::fake::{respond, FakeTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn session() -> AdminSession {
        AdminSession(Principal {
            email: "admin@example.com".into(),
            name: "Admin".into(),
            role: ADMIN_ROLE.into(),
        })
    }

    #[test]
    fn member_params_default_to_first_big_page() {
        let q = MemberQuery::from(MembersParams {
            page: None,
            per_page: None,
            search: Some("  ".into()),
        });
        assert_eq!(q.page, 1);
        assert_eq!(q.per_page, 300);
        assert_eq!(q.search, None);
    }

    fn members_query(uri: &str) -> Result<Query<MembersParams>, QueryRejection> {
        Query::try_from_uri(&uri.parse().unwrap())
    }

    #[test]
    fn blank_and_zero_paging_fall_back_to_defaults() {
        let Query(params) = members_query("/api/circle/members?page=&per_page=0&search=ana").unwrap();
        let q = MemberQuery::from(params);
        assert_eq!((q.page, q.per_page), (1, 300));
        assert_eq!(q.search.as_deref(), Some("ana"));

        let Query(params) = members_query("/api/circle/members?page=4&per_page=%2050%20").unwrap();
        let q = MemberQuery::from(params);
        assert_eq!((q.page, q.per_page), (4, 50));
    }

    #[test]
    fn garbage_paging_is_an_invalid_payload() {
        let err = AppError::from(members_query("/api/circle/members?page=abc").unwrap_err());
        assert!(matches!(err, AppError::Validation(m) if m == "Invalid payload"));
    }

    #[tokio::test]
    async fn blank_paging_reaches_upstream_as_defaults() {
        let transport = Arc::new(FakeTransport::new(|req| {
            if req.url.ends_with("/auth_token") {
                return respond(200, auth_body("tok"));
            }
            respond(200, r#"{"page": 1, "per_page": 300, "records": []}"#)
        }));
        let state = AppState::fake_with_transport(transport.clone());
        let Json(page) = list_members(
            State(state),
            session(),
            members_query("/api/circle/members?page=&per_page=0"),
        )
        .await
        .unwrap();
        assert!(page.records.is_empty());

        let url = &transport.requests()[1].url;
        assert!(url.contains("page=1"), "{url}");
        assert!(url.contains("per_page=300"), "{url}");
    }

    #[tokio::test]
    async fn non_numeric_member_id_is_rejected_without_upstream_call() {
        let transport = Arc::new(FakeTransport::new(|_| respond(200, "{}")));
        let state = AppState::fake_with_transport(transport.clone());
        for id in ["abc", "12abc", "-3", ""] {
            let err = get_member(State(state.clone()), session(), Path(id.into()))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(m) if m == "Invalid member ID"));
        }
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn member_details_carry_broker_info() {
        let transport = Arc::new(FakeTransport::new(|req| {
            if req.url.ends_with("/auth_token") {
                return respond(200, auth_body("tok"));
            }
            respond(
                200,
                json!({
                    "id": 12, "name": "Ana", "bio": "hi",
                    "profile_fields": {
                        "visible": [
                            { "key": "how_did_you_find_us", "label": "Source",
                              "community_member_profile_field": { "display_value": ["Podcast"] } }
                        ],
                        "not_visible": [
                            { "key": "ti_bi_globe_client_id", "label": "Broker",
                              "community_member_profile_field": { "display_value": "BRK-77" } }
                        ]
                    }
                })
                .to_string(),
            )
        }));
        let state = AppState::fake_with_transport(transport.clone());
        let Json(details) = get_member(State(state), session(), Path("12".into()))
            .await
            .unwrap();

        let v = serde_json::to_value(&details).unwrap();
        assert_eq!(v["id"], json!(12));
        assert_eq!(v["name"], json!("Ana"));
        assert_eq!(
            v["brokerInfo"],
            json!({ "brokerId": "BRK-77", "inviter": "N/A", "source": ["Podcast"] })
        );
        assert!(transport.requests()[1].url.ends_with("/api/headless/v1/community_members/12"));
    }
}
