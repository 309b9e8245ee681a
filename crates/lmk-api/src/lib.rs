//! lmk-api
//!
//! The backend HTTP boundary of the LinkMe SDK. This crate owns the
//! [`AttributionApi`] contract, its reqwest-backed implementation, the
//! error taxonomy, and local fallback synthesis for unresolvable web
//! links. It holds **no** SDK state: configuration and device fingerprints
//! are passed in per call so a re-configuration is visible to the very
//! next request.

pub mod error;
pub mod fallback;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;

use lmk_schemas::{AppEvent, LinkMeConfig, LinkPayload};

pub use error::{ApiError, DOMAIN_NOT_FOUND};

/// Device fingerprint map attached to requests when device info is enabled.
pub type DeviceMap = Map<String, Value>;

// ---------------------------------------------------------------------------
// API contract
// ---------------------------------------------------------------------------

/// Backend resolution contract.
///
/// Object-safe so the engine can hold a `Arc<dyn AttributionApi>` and tests
/// can substitute an in-process implementation without a server.
#[async_trait]
pub trait AttributionApi: Send + Sync {
    /// GET `{base}/api/deeplink?cid=<cid>`. On 2xx, the decoded payload with
    /// `is_link_me` forced to `true`.
    async fn resolve_cid(
        &self,
        cfg: &LinkMeConfig,
        device: Option<&DeviceMap>,
        cid: &str,
    ) -> Result<LinkPayload, ApiError>;

    /// POST `{base}/api/deeplink/resolve-url`. On 2xx, the decoded payload
    /// with `is_link_me = true`. A non-2xx `domain_not_found` answer is not
    /// an error: the implementation synthesizes a local fallback payload
    /// from the URL itself (`is_link_me = false`).
    async fn resolve_universal_link(
        &self,
        cfg: &LinkMeConfig,
        device: Option<&DeviceMap>,
        url: &Url,
    ) -> Result<LinkPayload, ApiError>;

    /// POST `{base}/api/deferred/claim` with the install fingerprint.
    async fn claim_deferred(
        &self,
        cfg: &LinkMeConfig,
        device: Option<&DeviceMap>,
        bundle_id: &str,
        platform: &str,
    ) -> Result<LinkPayload, ApiError>;

    /// POST `{base}/api/app-events`. The response body is ignored.
    async fn track(&self, cfg: &LinkMeConfig, event: &AppEvent) -> Result<(), ApiError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// reqwest-backed [`AttributionApi`].
#[derive(Debug, Clone, Default)]
pub struct HttpAttributionApi {
    http: reqwest::Client,
}

impl HttpAttributionApi {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Join the configured base URL with an API path. The base is trimmed so
    /// both `https://li-nk.me` and `https://li-nk.me/` produce the same
    /// endpoint.
    fn endpoint(cfg: &LinkMeConfig, path: &str) -> String {
        format!("{}/{}", cfg.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Auth and content negotiation headers common to every call.
    fn apply_headers(
        mut req: reqwest::RequestBuilder,
        cfg: &LinkMeConfig,
    ) -> reqwest::RequestBuilder {
        if let Some(app_id) = &cfg.app_id {
            req = req.header("x-app-id", app_id);
        }
        if let Some(app_key) = &cfg.app_key {
            req = req.header("x-api-key", app_key);
        }
        req.header("Accept", "application/json")
    }

    /// Send, classify the status, and decode the payload. Forces
    /// `is_link_me = true` on success: a decoded backend answer is by
    /// definition a resolved LinkMe link.
    async fn send_for_payload(req: reqwest::RequestBuilder) -> Result<LinkPayload, ApiError> {
        let resp = req
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }
        let mut payload: LinkPayload =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        payload.is_link_me = Some(true);
        Ok(payload)
    }
}

#[async_trait]
impl AttributionApi for HttpAttributionApi {
    async fn resolve_cid(
        &self,
        cfg: &LinkMeConfig,
        device: Option<&DeviceMap>,
        cid: &str,
    ) -> Result<LinkPayload, ApiError> {
        let mut req = self
            .http
            .get(Self::endpoint(cfg, "api/deeplink"))
            .query(&[("cid", cid)]);
        req = Self::apply_headers(req, cfg);
        // Device fingerprint rides in a header on GET flows.
        if let Some(dev) = device {
            if let Ok(json) = serde_json::to_string(dev) {
                req = req.header("x-linkme-device", json);
            }
        }
        if cfg.debug {
            debug!(cid, "GET /api/deeplink");
        }
        Self::send_for_payload(req).await
    }

    async fn resolve_universal_link(
        &self,
        cfg: &LinkMeConfig,
        device: Option<&DeviceMap>,
        url: &Url,
    ) -> Result<LinkPayload, ApiError> {
        let mut body = json!({ "url": url.as_str() });
        if let Some(dev) = device {
            body["device"] = Value::Object(dev.clone());
        }
        let req = Self::apply_headers(
            self.http.post(Self::endpoint(cfg, "api/deeplink/resolve-url")),
            cfg,
        )
        .json(&body);
        if cfg.debug {
            debug!(url = %url, "POST /api/deeplink/resolve-url");
        }
        match Self::send_for_payload(req).await {
            Ok(payload) => Ok(payload),
            Err(err) if err.is_domain_not_found() => {
                if cfg.debug {
                    debug!(url = %url, "domain not known to backend, synthesizing fallback");
                }
                Ok(fallback::synthesize(url))
            }
            Err(err) => Err(err),
        }
    }

    async fn claim_deferred(
        &self,
        cfg: &LinkMeConfig,
        device: Option<&DeviceMap>,
        bundle_id: &str,
        platform: &str,
    ) -> Result<LinkPayload, ApiError> {
        let mut body = json!({
            "bundleId": bundle_id,
            "platform": platform,
        });
        if let Some(dev) = device {
            body["device"] = Value::Object(dev.clone());
        }
        let req = Self::apply_headers(
            self.http.post(Self::endpoint(cfg, "api/deferred/claim")),
            cfg,
        )
        .json(&body);
        if cfg.debug {
            debug!(bundle_id, "POST /api/deferred/claim");
        }
        Self::send_for_payload(req).await
    }

    async fn track(&self, cfg: &LinkMeConfig, event: &AppEvent) -> Result<(), ApiError> {
        let req = Self::apply_headers(self.http.post(Self::endpoint(cfg, "api/app-events")), cfg)
            .json(event);
        if cfg.debug {
            debug!(event = %event.event, "POST /api/app-events");
        }
        let resp = req
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
