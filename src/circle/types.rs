//! Upstream payload shapes.
//!
//! Each response is decoded into one of these explicitly. Fields the
//! dashboard does not read land in `extra` and are forwarded verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Extra = Map<String, Value>;

/// Body of `POST /api/v1/headless/auth_token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlessAuth {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub access_token_expires_at: Option<String>,
    #[serde(default)]
    pub refresh_token_expires_at: Option<String>,
    #[serde(default)]
    pub community_member_id: Option<u64>,
    #[serde(default)]
    pub community_id: Option<u64>,
}

/// Pagination fields shared by every list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Page envelope: pagination metadata plus ordered records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(flatten)]
    pub meta: PageMeta,
    pub records: Vec<T>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roles {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub moderator: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberTag {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// One row of `GET /api/headless/v1/community_members`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberSummary {
    pub community_member_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub roles: Roles,
    #[serde(default)]
    pub member_tags: Vec<MemberTag>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A profile field's value: free text or a multi-select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayValue {
    Text(String),
    List(Vec<String>),
}

impl DisplayValue {
    pub fn joined(&self) -> String {
        match self {
            DisplayValue::Text(s) => s.clone(),
            DisplayValue::List(items) => items.join(", "),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            DisplayValue::Text(s) => s.trim().is_empty(),
            DisplayValue::List(items) => items.iter().all(|s| s.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<DisplayValue>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileField {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub community_member_profile_field: Option<FieldValue>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl ProfileField {
    /// Display value, if present and not blank.
    pub fn value(&self) -> Option<&DisplayValue> {
        self.community_member_profile_field
            .as_ref()
            .and_then(|f| f.display_value.as_ref())
            .filter(|v| !v.is_blank())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileFields {
    #[serde(default)]
    pub visible: Vec<ProfileField>,
    #[serde(default)]
    pub not_visible: Vec<ProfileField>,
}

impl ProfileFields {
    pub fn visible(&self, key: &str) -> Option<&ProfileField> {
        self.visible.iter().find(|f| f.key == key)
    }

    pub fn hidden(&self, key: &str) -> Option<&ProfileField> {
        self.not_visible.iter().find(|f| f.key == key)
    }

    /// Visible fields first, then hidden ones.
    pub fn all(&self) -> impl Iterator<Item = &ProfileField> {
        self.visible.iter().chain(self.not_visible.iter())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Member details, public profile, and the current member share this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberProfile {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_info: Option<ProfileInfo>,
    #[serde(default)]
    pub profile_fields: ProfileFields,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Member list row with the derived columns appended.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedMember {
    #[serde(flatten)]
    pub member: MemberSummary,
    #[serde(rename = "invitedBy")]
    pub invited_by: String,
    pub country: String,
}

pub const NOT_AVAILABLE: &str = "N/A";

impl EnrichedMember {
    /// Derived columns replace any upstream field of the same name.
    pub fn new(mut member: MemberSummary, invited_by: String, country: String) -> Self {
        member.extra.remove("invitedBy");
        member.extra.remove("country");
        Self {
            member,
            invited_by,
            country,
        }
    }
}

/// Affiliate-tracking fields pulled from known custom profile keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerInfo {
    pub broker_id: DisplayValue,
    pub inviter: DisplayValue,
    pub source: DisplayValue,
}

impl BrokerInfo {
    pub const BROKER_ID_KEY: &'static str = "ti_bi_globe_client_id";
    pub const INVITER_KEY: &'static str = "Name_or_account";
    pub const SOURCE_KEY: &'static str = "how_did_you_find_us";

    pub fn from_fields(fields: &ProfileFields) -> Self {
        let or_na = |field: Option<&ProfileField>| {
            field
                .and_then(ProfileField::value)
                .cloned()
                .unwrap_or_else(|| DisplayValue::Text(NOT_AVAILABLE.into()))
        };
        Self {
            broker_id: or_na(fields.hidden(Self::BROKER_ID_KEY)),
            inviter: or_na(fields.visible(Self::INVITER_KEY)),
            source: fields
                .visible(Self::SOURCE_KEY)
                .and_then(ProfileField::value)
                .cloned()
                .unwrap_or(DisplayValue::List(Vec::new())),
        }
    }
}

/// `GET /api/circle/member/{id}` response body.
#[derive(Debug, Clone, Serialize)]
pub struct MemberDetails {
    #[serde(flatten)]
    pub member: MemberProfile,
    #[serde(rename = "brokerInfo")]
    pub broker_info: BrokerInfo,
}
