//! lmk-schemas
//!
//! Shared value and wire types for the LinkMe SDK. This crate owns **only**
//! data: the configuration value, the attribution payload, the tracked-event
//! body, and the backend error envelope. No I/O, no state, no engine logic.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// SDK configuration. Set wholesale by the latest `configure` call — there is
/// no partial update; the engine swaps the whole value atomically.
#[derive(Clone)]
pub struct LinkMeConfig {
    /// Backend base URL (e.g. `https://li-nk.me`).
    pub base_url: Url,
    /// Sent as the `x-app-id` header when present.
    pub app_id: Option<String>,
    /// Sent as the `x-api-key` header when present. Do not log it.
    pub app_key: Option<String>,
    /// Legacy flag. Pasteboard checking is portal-controlled in production;
    /// when set, `configure` performs one opportunistic pasteboard-token
    /// resolution for integrations that still rely on the old behavior.
    pub enable_pasteboard: bool,
    /// Attach the device fingerprint to outbound requests.
    pub send_device_info: bool,
    /// Allow the vendor-scoped identifier in the device fingerprint.
    pub include_vendor_id: bool,
    /// Initial value of the runtime advertising-consent flag.
    pub include_advertising_id: bool,
    /// Enable diagnostic logging. This is the only failure signal the SDK
    /// emits in production.
    pub debug: bool,
}

impl LinkMeConfig {
    /// Configuration with defaults matching the hosted portal: device info
    /// and vendor id on, advertising id off, debug off.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            app_id: None,
            app_key: None,
            enable_pasteboard: false,
            send_device_info: true,
            include_vendor_id: true,
            include_advertising_id: false,
            debug: false,
        }
    }

    /// Convenience constructor parsing the base URL from a string.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url)
            .with_context(|| format!("invalid base url: {base_url}"))?;
        Ok(Self::new(url))
    }
}

impl fmt::Debug for LinkMeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkMeConfig")
            .field("base_url", &self.base_url.as_str())
            .field("app_id", &self.app_id)
            .field("app_key", &self.app_key.as_ref().map(|_| "REDACTED"))
            .field("enable_pasteboard", &self.enable_pasteboard)
            .field("send_device_info", &self.send_device_info)
            .field("include_vendor_id", &self.include_vendor_id)
            .field("include_advertising_id", &self.include_advertising_id)
            .field("debug", &self.debug)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Attribution payload
// ---------------------------------------------------------------------------

/// Structured attribution data for one resolved link.
///
/// Produced only by decoding a backend response or by local fallback
/// synthesis; never mutated after construction. Field names follow the wire
/// format exactly (`linkId`, `isLinkMe`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<BTreeMap<String, String>>,
    /// The original absolute URL, when the payload stems from one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// `true` when the backend resolved the link; `false` for a locally
    /// synthesized fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_link_me: Option<bool>,
}

// ---------------------------------------------------------------------------
// Tracked app events
// ---------------------------------------------------------------------------

/// Body of `POST /api/app-events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppEvent {
    pub event: String,
    pub platform: String,
    /// Epoch seconds, UTC.
    pub timestamp: i64,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub props: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Backend error envelope
// ---------------------------------------------------------------------------

/// Error body returned by the backend on non-2xx responses: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
