//! lmk-device
//!
//! Platform capability boundary and the consent-gated device-fingerprint
//! builder.
//!
//! The SDK never talks to the host platform directly. Clipboard text,
//! vendor/advertising identifiers, and environment facts (bundle id, OS
//! version, locale, ...) come in through the traits below, injected at
//! construction. Each trait has an unavailable variant so the engine runs
//! unchanged on hosts without the capability — and so every identifier
//! source is mockable in tests without a real device.

use serde_json::{json, Map, Value};

use lmk_schemas::LinkMeConfig;

/// Identifier value the platform returns when it has nothing to share.
/// Always filtered out before transmission.
pub const ZERO_IDENTIFIER: &str = "00000000-0000-0000-0000-000000000000";

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// Facts about the hosting application and OS.
///
/// `platform` and `bundle_id` are always reported; every other field is
/// optional and simply omitted from the fingerprint when unavailable.
pub trait HostEnvironment: Send + Sync {
    /// Platform identifier used on the wire (e.g. `"ios"`).
    fn platform(&self) -> String;
    fn bundle_id(&self) -> String;
    fn app_version(&self) -> Option<String>;
    fn build_number(&self) -> Option<String>;
    fn os_version(&self) -> Option<String>;
    fn device_model(&self) -> Option<String>;
    fn locale(&self) -> Option<String>;
    fn timezone(&self) -> Option<String>;
}

/// Device identifier sources and the platform-level tracking authorization.
pub trait IdentifierProvider: Send + Sync {
    /// Vendor-scoped identifier (IDFV-like), if the platform grants one.
    fn vendor_id(&self) -> Option<String>;
    /// Advertising identifier (IDFA-like), if the platform grants one.
    fn advertising_id(&self) -> Option<String>;
    /// Whether the platform-level tracking prompt was answered with a grant.
    /// This is independent of the SDK's runtime consent flag; both gates
    /// must pass before an advertising id is attached.
    fn tracking_authorized(&self) -> bool;
}

/// Read access to the host clipboard.
pub trait PasteboardAccess: Send + Sync {
    fn read_text(&self) -> Option<String>;
}

// ---------------------------------------------------------------------------
// Static / unavailable variants
// ---------------------------------------------------------------------------

/// Host environment backed by plain values supplied by the integrator.
#[derive(Debug, Clone)]
pub struct StaticHostEnvironment {
    pub platform: String,
    pub bundle_id: String,
    pub app_version: Option<String>,
    pub build_number: Option<String>,
    pub os_version: Option<String>,
    pub device_model: Option<String>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
}

impl StaticHostEnvironment {
    pub fn new(bundle_id: impl Into<String>) -> Self {
        Self {
            platform: "ios".to_string(),
            bundle_id: bundle_id.into(),
            app_version: None,
            build_number: None,
            os_version: None,
            device_model: None,
            locale: None,
            timezone: None,
        }
    }
}

impl Default for StaticHostEnvironment {
    fn default() -> Self {
        Self::new("")
    }
}

impl HostEnvironment for StaticHostEnvironment {
    fn platform(&self) -> String {
        self.platform.clone()
    }
    fn bundle_id(&self) -> String {
        self.bundle_id.clone()
    }
    fn app_version(&self) -> Option<String> {
        self.app_version.clone()
    }
    fn build_number(&self) -> Option<String> {
        self.build_number.clone()
    }
    fn os_version(&self) -> Option<String> {
        self.os_version.clone()
    }
    fn device_model(&self) -> Option<String> {
        self.device_model.clone()
    }
    fn locale(&self) -> Option<String> {
        self.locale.clone()
    }
    fn timezone(&self) -> Option<String> {
        self.timezone.clone()
    }
}

/// Identifier provider backed by plain values supplied by the integrator.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentifiers {
    pub vendor_id: Option<String>,
    pub advertising_id: Option<String>,
    pub tracking_authorized: bool,
}

impl IdentifierProvider for StaticIdentifiers {
    fn vendor_id(&self) -> Option<String> {
        self.vendor_id.clone()
    }
    fn advertising_id(&self) -> Option<String> {
        self.advertising_id.clone()
    }
    fn tracking_authorized(&self) -> bool {
        self.tracking_authorized
    }
}

/// Identifier provider for hosts with no identifier capability at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableIdentifiers;

impl IdentifierProvider for UnavailableIdentifiers {
    fn vendor_id(&self) -> Option<String> {
        None
    }
    fn advertising_id(&self) -> Option<String> {
        None
    }
    fn tracking_authorized(&self) -> bool {
        false
    }
}

/// Pasteboard backed by a fixed string, for tests and headless hosts.
#[derive(Debug, Clone, Default)]
pub struct StaticPasteboard {
    pub text: Option<String>,
}

impl StaticPasteboard {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

impl PasteboardAccess for StaticPasteboard {
    fn read_text(&self) -> Option<String> {
        self.text.clone()
    }
}

/// Pasteboard for hosts without clipboard access.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailablePasteboard;

impl PasteboardAccess for UnavailablePasteboard {
    fn read_text(&self) -> Option<String> {
        None
    }
}

// ---------------------------------------------------------------------------
// Fingerprint builder
// ---------------------------------------------------------------------------

/// Build the device fingerprint for one outbound request.
///
/// The map is ephemeral: built per request, never persisted, never reused.
/// Identifier inclusion rules:
/// - vendor id only when `include_vendor_id` is set (the consent block then
///   carries `vendor: true` whether or not an id was available);
/// - advertising id only when the runtime consent flag is set AND the
///   platform-level tracking authorization is granted — the consent block
///   carries `advertising: true` on the flag alone;
/// - an all-zero identifier is never transmitted.
pub fn build_device_payload(
    cfg: &LinkMeConfig,
    advertising_consent: bool,
    host: &dyn HostEnvironment,
    ids: &dyn IdentifierProvider,
) -> Map<String, Value> {
    let mut dev = Map::new();
    dev.insert("platform".to_string(), json!(host.platform()));
    dev.insert("bundleId".to_string(), json!(host.bundle_id()));
    if let Some(v) = host.app_version() {
        dev.insert("appVersion".to_string(), json!(v));
    }
    if let Some(b) = host.build_number() {
        dev.insert("buildNumber".to_string(), json!(b));
    }
    if let Some(v) = host.os_version() {
        dev.insert("osVersion".to_string(), json!(v));
    }
    if let Some(m) = host.device_model() {
        dev.insert("deviceModel".to_string(), json!(m));
    }
    if let Some(l) = host.locale() {
        dev.insert("locale".to_string(), json!(l));
    }
    if let Some(t) = host.timezone() {
        dev.insert("timezone".to_string(), json!(t));
    }

    let mut consent = Map::new();
    if cfg.include_vendor_id {
        consent.insert("vendor".to_string(), json!(true));
        if let Some(idfv) = ids.vendor_id().filter(|id| id.as_str() != ZERO_IDENTIFIER) {
            dev.insert("id_type".to_string(), json!("idfv"));
            dev.insert("device_id".to_string(), json!(idfv));
        }
    }
    if advertising_consent {
        consent.insert("advertising".to_string(), json!(true));
        // Advertising takes precedence over the vendor id when both gates pass.
        if ids.tracking_authorized() {
            if let Some(idfa) = ids
                .advertising_id()
                .filter(|id| id.as_str() != ZERO_IDENTIFIER)
            {
                dev.insert("id_type".to_string(), json!("idfa"));
                dev.insert("device_id".to_string(), json!(idfa));
            }
        }
    }
    dev.insert("consent".to_string(), Value::Object(consent));

    dev
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> LinkMeConfig {
        LinkMeConfig::with_base_url("https://li-nk.me").unwrap()
    }

    fn host() -> StaticHostEnvironment {
        StaticHostEnvironment {
            platform: "ios".to_string(),
            bundle_id: "me.link.example".to_string(),
            app_version: Some("1.2.0".to_string()),
            build_number: Some("42".to_string()),
            os_version: Some("17.4".to_string()),
            device_model: Some("iPhone".to_string()),
            locale: Some("en_US".to_string()),
            timezone: Some("Europe/Berlin".to_string()),
        }
    }

    #[test]
    fn base_fields_present() {
        let dev = build_device_payload(&cfg(), false, &host(), &UnavailableIdentifiers);
        assert_eq!(dev["platform"], "ios");
        assert_eq!(dev["bundleId"], "me.link.example");
        assert_eq!(dev["appVersion"], "1.2.0");
        assert_eq!(dev["buildNumber"], "42");
        assert_eq!(dev["osVersion"], "17.4");
        assert_eq!(dev["deviceModel"], "iPhone");
        assert_eq!(dev["locale"], "en_US");
        assert_eq!(dev["timezone"], "Europe/Berlin");
    }

    #[test]
    fn unavailable_host_fields_are_omitted() {
        let dev = build_device_payload(
            &cfg(),
            false,
            &StaticHostEnvironment::new("me.link.example"),
            &UnavailableIdentifiers,
        );
        assert!(dev.get("appVersion").is_none());
        assert!(dev.get("osVersion").is_none());
        assert!(dev.get("locale").is_none());
        assert_eq!(dev["bundleId"], "me.link.example");
    }

    #[test]
    fn vendor_id_attached_when_flag_set() {
        let ids = StaticIdentifiers {
            vendor_id: Some("11111111-2222-3333-4444-555555555555".to_string()),
            ..Default::default()
        };
        let dev = build_device_payload(&cfg(), false, &host(), &ids);
        assert_eq!(dev["id_type"], "idfv");
        assert_eq!(dev["device_id"], "11111111-2222-3333-4444-555555555555");
        assert_eq!(dev["consent"]["vendor"], true);
        assert!(dev["consent"].get("advertising").is_none());
    }

    #[test]
    fn vendor_flag_off_omits_vendor_entirely() {
        let mut c = cfg();
        c.include_vendor_id = false;
        let ids = StaticIdentifiers {
            vendor_id: Some("11111111-2222-3333-4444-555555555555".to_string()),
            ..Default::default()
        };
        let dev = build_device_payload(&c, false, &host(), &ids);
        assert!(dev.get("device_id").is_none());
        assert!(dev["consent"].get("vendor").is_none());
    }

    #[test]
    fn vendor_consent_marked_even_without_an_id() {
        let dev = build_device_payload(&cfg(), false, &host(), &UnavailableIdentifiers);
        assert_eq!(dev["consent"]["vendor"], true);
        assert!(dev.get("device_id").is_none());
    }

    #[test]
    fn advertising_id_requires_both_gates() {
        let granted = StaticIdentifiers {
            advertising_id: Some("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee".to_string()),
            tracking_authorized: true,
            ..Default::default()
        };
        let unauthorized = StaticIdentifiers {
            advertising_id: Some("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee".to_string()),
            tracking_authorized: false,
            ..Default::default()
        };
        let mut c = cfg();
        c.include_vendor_id = false;

        // consent flag off → nothing, regardless of authorization
        let dev = build_device_payload(&c, false, &host(), &granted);
        assert!(dev.get("device_id").is_none());
        assert!(dev["consent"].get("advertising").is_none());

        // consent flag on but platform authorization missing → consent marked,
        // id withheld
        let dev = build_device_payload(&c, true, &host(), &unauthorized);
        assert_eq!(dev["consent"]["advertising"], true);
        assert!(dev.get("device_id").is_none());

        // both gates pass → id attached
        let dev = build_device_payload(&c, true, &host(), &granted);
        assert_eq!(dev["id_type"], "idfa");
        assert_eq!(dev["device_id"], "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee");
    }

    #[test]
    fn advertising_id_takes_precedence_over_vendor_id() {
        let ids = StaticIdentifiers {
            vendor_id: Some("11111111-2222-3333-4444-555555555555".to_string()),
            advertising_id: Some("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee".to_string()),
            tracking_authorized: true,
        };
        let dev = build_device_payload(&cfg(), true, &host(), &ids);
        assert_eq!(dev["id_type"], "idfa");
        assert_eq!(dev["device_id"], "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee");
    }

    #[test]
    fn zero_identifier_is_filtered() {
        let ids = StaticIdentifiers {
            vendor_id: Some(ZERO_IDENTIFIER.to_string()),
            advertising_id: Some(ZERO_IDENTIFIER.to_string()),
            tracking_authorized: true,
        };
        let dev = build_device_payload(&cfg(), true, &host(), &ids);
        assert!(dev.get("device_id").is_none());
        assert!(dev.get("id_type").is_none());
        // consent marks are unaffected by filtering
        assert_eq!(dev["consent"]["vendor"], true);
        assert_eq!(dev["consent"]["advertising"], true);
    }
}
