//! Best-effort country guess for a member.
//!
//! Sources are tried in a fixed order and the first hit wins. The result is
//! advisory: capitalized-word patterns will sometimes pick up a proper noun
//! that is not a place.

use lazy_static::lazy_static;
use regex::Regex;

use super::{
    flags::{first_flag, FlagSet},
    types::{MemberProfile, MemberSummary},
};

pub const UNKNOWN: &str = "Unknown";

const FIELD_HINTS: [&str; 4] = ["location", "country", "city", "state"];

// One or more capitalized words, optionally followed by ", Capitalized Words".
const PLACE: &str = r"\p{Lu}[\p{L}'\-]*(?:[ \t]+\p{Lu}[\p{L}'\-]*)*(?:,[ \t]*\p{Lu}[\p{L}'\-]*(?:[ \t]+\p{Lu}[\p{L}'\-]*)*)*";

lazy_static! {
    static ref PATTERNS: Vec<Regex> = [
        r"(?:📍|🌍|🌎|🌏|🏠|🏡)[ \t]*(PLACE)",
        r"(?i:\b(?:based|located|living|lives|live)[ \t]+in)[ \t]+(PLACE)",
        r"(?i:\bfrom)[ \t]+(PLACE)",
        r"(?i:\bin)[ \t]+(PLACE)",
    ]
    .iter()
    .map(|p| Regex::new(&p.replace("PLACE", PLACE)).unwrap())
    .collect();
}

/// Last comma-separated segment, or the whole string if there is only one.
fn last_segment(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let last = trimmed
        .rsplit(',')
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(trimmed);
    Some(last.to_string())
}

fn from_structured(profile: &MemberProfile) -> Option<String> {
    profile
        .profile_info
        .as_ref()
        .and_then(|info| info.location.as_deref())
        .and_then(last_segment)
}

fn from_custom_fields(profile: &MemberProfile) -> Option<String> {
    profile
        .profile_fields
        .all()
        .filter(|f| {
            let key = f.key.to_lowercase();
            let label = f.label.to_lowercase();
            FIELD_HINTS
                .iter()
                .any(|hint| key.contains(hint) || label.contains(hint))
        })
        .find_map(|f| f.value())
        .map(|v| v.joined().trim().to_string())
}

/// Flag first, then the phrase patterns in order.
fn from_free_text(text: &str, flags: FlagSet) -> Option<String> {
    if let Some(code) = first_flag(text) {
        return Some(flags.country(&code).unwrap_or(UNKNOWN).to_string());
    }
    PATTERNS
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .and_then(|m| last_segment(m.as_str()))
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|v| !v.trim().is_empty())
}

/// Never fails; falls back to [`UNKNOWN`].
pub fn extract_location(profile: Option<&MemberProfile>, summary: &MemberSummary) -> String {
    if let Some(profile) = profile {
        if let Some(found) = from_structured(profile)
            .or_else(|| from_custom_fields(profile))
            .or_else(|| non_blank(&profile.bio).and_then(|bio| from_free_text(bio, FlagSet::Full)))
        {
            return found;
        }
    }

    let headline = profile
        .and_then(|p| non_blank(&p.headline))
        .or_else(|| non_blank(&summary.headline));
    headline
        .and_then(|h| from_free_text(h, FlagSet::Headline))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circle::flags::flag_emoji;
    use serde_json::json;

    fn summary(headline: Option<&str>) -> MemberSummary {
        serde_json::from_value(json!({
            "community_member_id": 1,
            "name": "Test",
            "headline": headline,
        }))
        .unwrap()
    }

    fn profile(v: serde_json::Value) -> MemberProfile {
        let mut base = json!({ "id": 1 });
        base.as_object_mut()
            .unwrap()
            .extend(v.as_object().unwrap().clone());
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn structured_location_takes_last_segment() {
        let p = profile(json!({ "profile_info": { "location": "Málaga, Málaga, Spain" } }));
        assert_eq!(extract_location(Some(&p), &summary(None)), "Spain");

        let p = profile(json!({ "profile_info": { "location": "  Remote " } }));
        assert_eq!(extract_location(Some(&p), &summary(None)), "Remote");
    }

    #[test]
    fn custom_field_by_key_or_label() {
        let p = profile(json!({
            "profile_info": { "location": "" },
            "profile_fields": {
                "visible": [
                    { "key": "favourite_pair", "label": "Pair",
                      "community_member_profile_field": { "display_value": "EURUSD" } },
                    { "key": "q7", "label": "Which Country do you trade from?",
                      "community_member_profile_field": { "display_value": ["Portugal", "Brazil"] } }
                ]
            }
        }));
        assert_eq!(extract_location(Some(&p), &summary(None)), "Portugal, Brazil");

        let p = profile(json!({
            "profile_fields": {
                "not_visible": [
                    { "key": "home_city", "label": "",
                      "community_member_profile_field": { "display_value": "Lagos" } }
                ]
            }
        }));
        assert_eq!(extract_location(Some(&p), &summary(None)), "Lagos");
    }

    #[test]
    fn bio_flag_maps_to_country() {
        for (code, name) in [("ES", "Spain"), ("JP", "Japan"), ("ZA", "South Africa")] {
            let p = profile(json!({ "bio": format!("Swing trader {} since 2019", flag_emoji(code)) }));
            assert_eq!(extract_location(Some(&p), &summary(None)), name);
        }
    }

    #[test]
    fn unlisted_flag_is_unknown() {
        // Antarctica has a flag emoji but no entry in the table.
        let p = profile(json!({ "bio": format!("Cold trader {} based in Madrid", flag_emoji("AQ")) }));
        assert_eq!(extract_location(Some(&p), &summary(None)), UNKNOWN);
    }

    #[test]
    fn bio_phrases() {
        let cases = [
            ("📍 Lisbon, Portugal", "Portugal"),
            ("Dad of two, based in Cape Town", "Cape Town"),
            ("Originally from Buenos Aires and loving it", "Buenos Aires"),
            ("Day trading in Dubai.", "Dubai"),
        ];
        for (bio, want) in cases {
            let p = profile(json!({ "bio": bio }));
            assert_eq!(extract_location(Some(&p), &summary(None)), want, "bio: {bio}");
        }
    }

    #[test]
    fn headline_uses_reduced_flag_set() {
        let s = summary(Some(&format!("Forex {}", flag_emoji("MT"))));
        assert_eq!(extract_location(None, &s), UNKNOWN);

        let s = summary(Some(&format!("Forex {}", flag_emoji("IT"))));
        assert_eq!(extract_location(None, &s), "Italy");

        let s = summary(Some("Crypto enthusiast living in New York"));
        assert_eq!(extract_location(None, &s), "New York");
    }

    #[test]
    fn profile_headline_wins_over_summary_headline() {
        let p = profile(json!({ "headline": "From Oslo" }));
        assert_eq!(extract_location(Some(&p), &summary(Some("From Rome"))), "Oslo");
    }

    #[test]
    fn nothing_matches() {
        let p = profile(json!({ "bio": "i trade stuff", "headline": "" }));
        assert_eq!(extract_location(Some(&p), &summary(Some("just vibes"))), UNKNOWN);
        assert_eq!(extract_location(None, &summary(None)), UNKNOWN);
    }

    #[test]
    fn arbitrary_text_never_panics() {
        let samples = [
            "",
            ",,,",
            "in ,",
            "\u{1F3F4}\u{E0067}",
            "🇿",
            "from from from",
            "📍",
            "based in  ",
        ];
        for s in samples {
            let p = profile(json!({ "bio": s, "profile_info": { "location": s } }));
            let out = extract_location(Some(&p), &summary(Some(s)));
            assert!(!out.is_empty());
        }
    }
}
