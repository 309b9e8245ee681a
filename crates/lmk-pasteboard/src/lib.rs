//! lmk-pasteboard
//!
//! Layered extraction of a click-correlation token (`cid`) from free-form
//! clipboard text. Pure functions only: no platform access, no network, no
//! state — the host's clipboard reader lives behind a capability trait in
//! `lmk-device`, and this crate is handed the raw text.
//!
//! Matching is an ordered list of strategies, tried in fixed order; the
//! first strategy whose candidate passes token validation wins. A strategy
//! producing an invalid candidate does not retry — it falls through to the
//! next strategy.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Minimum accepted token length.
pub const MIN_TOKEN_LEN: usize = 8;
/// Maximum accepted token length.
pub const MAX_TOKEN_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Matcher strategies
// ---------------------------------------------------------------------------

/// `linkme:cid=<token>` bounded by whitespace or string edges.
static EXPLICIT_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|\s)linkme:cid=(\S+)").expect("static pattern"));

/// Any embedded absolute http(s) URL.
static EMBEDDED_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)https?://\S+").expect("static pattern"));

/// Bare `cid=<token>` bounded by start, `&`, or whitespace on the left and
/// `&`, whitespace, or the string end on the right.
static BARE_CID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[&\s])cid=([^&\s]+)").expect("static pattern"));

fn match_explicit_form(text: &str) -> Option<String> {
    EXPLICIT_FORM
        .captures(text)
        .map(|c| c[1].to_string())
}

fn match_embedded_url(text: &str) -> Option<String> {
    // First parseable URL whose query string carries a cid parameter.
    for m in EMBEDDED_URL.find_iter(text) {
        let Ok(url) = Url::parse(m.as_str()) else {
            continue;
        };
        if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "cid") {
            return Some(v.into_owned());
        }
    }
    None
}

fn match_bare_cid(text: &str) -> Option<String> {
    BARE_CID.captures(text).map(|c| c[1].to_string())
}

/// Strategies in priority order. First valid candidate wins.
const STRATEGIES: &[fn(&str) -> Option<String>] =
    &[match_explicit_form, match_embedded_url, match_bare_cid];

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A token is valid iff it is 8–64 hex characters, case-insensitive.
pub fn is_valid_token(candidate: &str) -> bool {
    (MIN_TOKEN_LEN..=MAX_TOKEN_LEN).contains(&candidate.len())
        && candidate.bytes().all(|b| b.is_ascii_hexdigit())
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract a valid cid token from free-form text, or `None`.
///
/// Strategies are tried in order: explicit `linkme:cid=` form, embedded
/// http(s) URL with a `cid` query parameter, bare `cid=` substring. A
/// candidate failing validation silently advances to the next strategy —
/// an invalid token is not an error, it is just not a token.
pub fn extract_token(text: &str) -> Option<String> {
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(text).filter(|c| is_valid_token(c)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
