use std::time::Duration;

use futures::future::join_all;
use rand::Rng;
use tracing::{debug, instrument, warn};

use super::{
    gateway::{CircleGateway, MemberQuery},
    location::extract_location,
    types::{EnrichedMember, MemberProfile, MemberSummary, Page, NOT_AVAILABLE},
};
use crate::error::AppResult;

/// Random pause inserted before each enrichment fetch after the first, to
/// stay under the upstream rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stagger {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for Stagger {
    fn default() -> Self {
        Self {
            min_ms: 100,
            max_ms: 300,
        }
    }
}

impl Stagger {
    pub const NONE: Stagger = Stagger {
        min_ms: 0,
        max_ms: 0,
    };

    pub fn pick(&self) -> Duration {
        let ms = if self.max_ms <= self.min_ms {
            self.min_ms
        } else {
            rand::thread_rng().gen_range(self.min_ms..=self.max_ms)
        };
        Duration::from_millis(ms)
    }
}

/// `invitedBy` comes from the visible "Name_or_account" profile field.
fn invited_by(profile: &MemberProfile) -> String {
    profile
        .profile_fields
        .visible("Name_or_account")
        .and_then(|f| f.value())
        .map(|v| v.joined())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

async fn enrich_one(gateway: &CircleGateway, member: MemberSummary) -> EnrichedMember {
    let id = member.community_member_id;
    match gateway.member_public_profile(id).await {
        Ok(profile) => {
            let country = extract_location(Some(&profile), &member);
            EnrichedMember::new(member, invited_by(&profile), country)
        }
        Err(e) => {
            warn!(member_id = id, error = %e, "profile lookup failed; using fallbacks");
            let country = extract_location(None, &member);
            EnrichedMember::new(member, NOT_AVAILABLE.to_string(), country)
        }
    }
}

/// Fetches one page of members and enriches every row with its inviter and
/// a guessed country. Row order, count and pagination metadata are those of
/// the base page; a failed lookup only degrades its own row.
#[instrument(skip(gateway, stagger), fields(page = query.page, per_page = query.per_page))]
pub async fn list_enriched(
    gateway: &CircleGateway,
    stagger: Stagger,
    query: &MemberQuery,
) -> AppResult<Page<EnrichedMember>> {
    let Page { meta, records } = gateway.list_members(query).await?;
    debug!(rows = records.len(), "enriching member page");

    let lookups = records.into_iter().enumerate().map(move |(i, member)| async move {
        if i > 0 {
            tokio::time::sleep(stagger.pick()).await;
        }
        enrich_one(gateway, member).await
    });
    let records = join_all(lookups).await;

    Ok(Page { meta, records })
}
