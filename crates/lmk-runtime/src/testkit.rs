//! Test instrumentation: an in-process backend that records every call.
//!
//! Activated by `cfg(test)` or the `testkit` feature. Scenario tests use
//! [`RecordingApi`] to observe routing decisions and attached fingerprints
//! without a server; the HTTP wire shapes themselves are covered against a
//! mock server in `lmk-api`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use lmk_api::{ApiError, AttributionApi, DeviceMap};
use lmk_schemas::{AppEvent, LinkMeConfig, LinkPayload};

/// One observed backend call, with the fingerprint that rode along.
#[derive(Debug, Clone)]
pub enum RecordedCall {
    ResolveCid {
        base_url: String,
        cid: String,
        device: Option<DeviceMap>,
    },
    ResolveUrl {
        base_url: String,
        url: String,
        device: Option<DeviceMap>,
    },
    Claim {
        base_url: String,
        bundle_id: String,
        platform: String,
        device: Option<DeviceMap>,
    },
    Track {
        event: AppEvent,
    },
}

/// Always-succeeding backend double. Each resolution answers with a payload
/// whose `link_id` echoes the request, so tests can assert both call order
/// and payload identity.
#[derive(Default)]
pub struct RecordingApi {
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The `cid` of every recorded resolve-cid call, in call order.
    pub fn resolved_cids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::ResolveCid { cid, .. } => Some(cid),
                _ => None,
            })
            .collect()
    }

    fn echo_payload(link_id: String) -> LinkPayload {
        LinkPayload {
            link_id: Some(link_id),
            is_link_me: Some(true),
            ..Default::default()
        }
    }
}

#[async_trait]
impl AttributionApi for RecordingApi {
    async fn resolve_cid(
        &self,
        cfg: &LinkMeConfig,
        device: Option<&DeviceMap>,
        cid: &str,
    ) -> Result<LinkPayload, ApiError> {
        self.calls.lock().unwrap().push(RecordedCall::ResolveCid {
            base_url: cfg.base_url.to_string(),
            cid: cid.to_string(),
            device: device.cloned(),
        });
        Ok(Self::echo_payload(cid.to_string()))
    }

    async fn resolve_universal_link(
        &self,
        cfg: &LinkMeConfig,
        device: Option<&DeviceMap>,
        url: &Url,
    ) -> Result<LinkPayload, ApiError> {
        self.calls.lock().unwrap().push(RecordedCall::ResolveUrl {
            base_url: cfg.base_url.to_string(),
            url: url.to_string(),
            device: device.cloned(),
        });
        Ok(Self::echo_payload(url.to_string()))
    }

    async fn claim_deferred(
        &self,
        cfg: &LinkMeConfig,
        device: Option<&DeviceMap>,
        bundle_id: &str,
        platform: &str,
    ) -> Result<LinkPayload, ApiError> {
        self.calls.lock().unwrap().push(RecordedCall::Claim {
            base_url: cfg.base_url.to_string(),
            bundle_id: bundle_id.to_string(),
            platform: platform.to_string(),
            device: device.cloned(),
        });
        Ok(Self::echo_payload(format!("claim:{bundle_id}")))
    }

    async fn track(&self, _cfg: &LinkMeConfig, event: &AppEvent) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(RecordedCall::Track {
            event: event.clone(),
        });
        Ok(())
    }
}
