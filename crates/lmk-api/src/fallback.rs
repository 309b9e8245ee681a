//! Local fallback synthesis for unresolvable universal links.
//!
//! When the backend reports `domain_not_found` for a forwarded web link,
//! the SDK still produces a payload from the URL itself so subscribers get
//! path and campaign attribution instead of nothing. The synthesized
//! payload is marked `is_link_me = false`.

use std::collections::BTreeMap;

use url::Url;

use lmk_schemas::LinkPayload;

/// Query-string keys routed into the `utm` map; everything else lands in
/// `params`. Fixed allow-list used for marketing campaign attribution.
pub const UTM_KEYS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "utm_id",
    "utm_source_platform",
    "utm_creative_format",
    "utm_marketing_tactic",
    "tags",
];

/// Build a payload from the URL alone: path (or `"/"`), query parameters
/// split into `params` vs `utm`, the original absolute URL, and
/// `is_link_me = false`.
pub fn synthesize(url: &Url) -> LinkPayload {
    let path = if url.path().is_empty() {
        "/".to_string()
    } else {
        url.path().to_string()
    };

    let mut params: BTreeMap<String, String> = BTreeMap::new();
    let mut utm: BTreeMap<String, String> = BTreeMap::new();
    for (k, v) in url.query_pairs() {
        if UTM_KEYS.contains(&k.as_ref()) {
            utm.insert(k.into_owned(), v.into_owned());
        } else {
            params.insert(k.into_owned(), v.into_owned());
        }
    }

    LinkPayload {
        link_id: None,
        path: Some(path),
        params: Some(params),
        utm: Some(utm),
        custom: None,
        url: Some(url.to_string()),
        is_link_me: Some(false),
    }
}
