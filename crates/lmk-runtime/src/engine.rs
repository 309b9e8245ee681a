//! Engine state and transition logic.
//!
//! The engine is the exclusive owner of all mutable SDK state: config,
//! readiness, the advertising-consent flag, the user id, the pending-event
//! queue, the listener registry, and the last broadcast payload. Every
//! method here runs inside the serial executor; nothing else touches the
//! fields. Network calls are spawned as independent tasks and re-enter the
//! executor with their result, so concurrent resolutions interleave freely
//! while state transitions stay strictly ordered.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use lmk_api::{ApiError, AttributionApi, DeviceMap};
use lmk_device::{
    build_device_payload, HostEnvironment, IdentifierProvider, PasteboardAccess,
};
use lmk_schemas::{AppEvent, LinkMeConfig, LinkPayload};

use crate::executor::WeakSerialExecutor;
use crate::listeners::{ListenerFn, ListenerRegistry};

/// Completion channel for claim/read operations.
pub(crate) type Reply = oneshot::Sender<Option<LinkPayload>>;

pub(crate) struct Engine {
    exec: WeakSerialExecutor<Engine>,
    api: Arc<dyn AttributionApi>,
    host: Arc<dyn HostEnvironment>,
    identifiers: Arc<dyn IdentifierProvider>,
    pasteboard: Arc<dyn PasteboardAccess>,
    /// Lossy fan-out for stream subscribers; the listener registry is the
    /// exactly-once surface.
    stream_tx: broadcast::Sender<LinkPayload>,

    config: Option<Arc<LinkMeConfig>>,
    ready: bool,
    advertising_consent: bool,
    user_id: Option<String>,
    last_payload: Option<LinkPayload>,
    listeners: ListenerRegistry,
    /// FIFO buffer for events arriving before configuration/readiness.
    /// Unbounded: events are never dropped while the SDK is unconfigured.
    pending: Vec<Url>,
}

impl Engine {
    pub(crate) fn new(
        exec: WeakSerialExecutor<Engine>,
        api: Arc<dyn AttributionApi>,
        host: Arc<dyn HostEnvironment>,
        identifiers: Arc<dyn IdentifierProvider>,
        pasteboard: Arc<dyn PasteboardAccess>,
        stream_tx: broadcast::Sender<LinkPayload>,
    ) -> Self {
        Self {
            exec,
            api,
            host,
            identifiers,
            pasteboard,
            stream_tx,
            config: None,
            ready: false,
            advertising_consent: false,
            user_id: None,
            last_payload: None,
            listeners: ListenerRegistry::new(),
            pending: Vec::new(),
        }
    }

    fn debug_enabled(&self) -> bool {
        self.config.as_ref().map(|c| c.debug).unwrap_or(false)
    }

    // -----------------------------------------------------------------------
    // Configuration and readiness
    // -----------------------------------------------------------------------

    /// Replace the configuration wholesale, mark the engine ready, seed the
    /// consent flag from the config, and drain the queue. Repeatable:
    /// `last_payload` and listeners survive re-configuration untouched.
    pub(crate) fn configure(&mut self, cfg: LinkMeConfig) {
        let cfg = Arc::new(cfg);
        self.advertising_consent = cfg.include_advertising_id;
        self.ready = true;
        self.config = Some(Arc::clone(&cfg));
        if self.debug_enabled() {
            debug!(
                base_url = %cfg.base_url,
                app_id = cfg.app_id.as_deref().unwrap_or("none"),
                "configured"
            );
        }
        self.drain_pending();
        // Legacy integrations: one opportunistic pasteboard resolution at
        // configure time. Portal-controlled installs leave this flag off and
        // rely on claim_deferred instead.
        if cfg.enable_pasteboard {
            self.try_pasteboard_resolution();
        }
    }

    /// Mark readiness without a fresh config — for hosts that gate network
    /// activity on an external consent flow rather than configuration
    /// timing.
    pub(crate) fn set_ready(&mut self) {
        self.ready = true;
        self.drain_pending();
    }

    /// Runtime override of the advertising-consent flag, typically after a
    /// later permission prompt.
    pub(crate) fn set_advertising_consent(&mut self, granted: bool) {
        self.advertising_consent = granted;
    }

    pub(crate) fn set_user_id(&mut self, id: String) {
        self.user_id = Some(id);
    }

    // -----------------------------------------------------------------------
    // Inbound events and routing
    // -----------------------------------------------------------------------

    /// Entry point for app-open / continuation URLs. Queued until the engine
    /// is configured and ready, then routed.
    pub(crate) fn handle_url(&mut self, url: Url) {
        if self.config.is_none() || !self.ready {
            if self.debug_enabled() {
                debug!(
                    url = %url,
                    ready = self.ready,
                    has_config = self.config.is_some(),
                    "queueing url"
                );
            }
            self.pending.push(url);
            return;
        }
        self.route(url);
    }

    /// Routing rule, applied both on the ready path and on drain:
    /// a `cid` query parameter wins over everything; otherwise http(s) URLs
    /// go to backend resolution; everything else is ignored.
    fn route(&mut self, url: Url) {
        let cid = url
            .query_pairs()
            .find(|(k, _)| k == "cid")
            .map(|(_, v)| v.into_owned());
        if let Some(cid) = cid {
            if self.debug_enabled() {
                debug!(cid = %cid, "routing via cid parameter");
            }
            self.spawn_resolve_cid(cid, None);
        } else if matches!(url.scheme(), "http" | "https") {
            if self.debug_enabled() {
                debug!(url = %url, "routing via universal link");
            }
            self.spawn_resolve_universal_link(url);
        } else if self.debug_enabled() {
            debug!(url = %url, "ignoring url: no cid, non-http scheme");
        }
    }

    /// Swap the queue for a fresh one and route every dequeued event in
    /// original order. Events submitted mid-drain land behind this unit in
    /// the executor and take the ready path — never dropped, never routed
    /// twice.
    fn drain_pending(&mut self) {
        if self.config.is_none() || !self.ready {
            return;
        }
        let queued = std::mem::take(&mut self.pending);
        for url in queued {
            self.route(url);
        }
    }

    // -----------------------------------------------------------------------
    // Resolution flows
    // -----------------------------------------------------------------------

    /// Fingerprint for one outbound request, or `None` when device info is
    /// disabled. Built fresh per request; never cached.
    fn device_payload(&self, cfg: &LinkMeConfig) -> Option<DeviceMap> {
        cfg.send_device_info.then(|| {
            build_device_payload(
                cfg,
                self.advertising_consent,
                self.host.as_ref(),
                self.identifiers.as_ref(),
            )
        })
    }

    fn spawn_resolve_cid(&self, cid: String, reply: Option<Reply>) {
        let Some(cfg) = self.config.clone() else {
            if let Some(reply) = reply {
                let _ = reply.send(None);
            }
            return;
        };
        let device = self.device_payload(&cfg);
        let api = Arc::clone(&self.api);
        let exec = self.exec.clone();
        tokio::spawn(async move {
            let result = api.resolve_cid(&cfg, device.as_ref(), &cid).await;
            exec.submit(move |engine| engine.finish_resolution("deeplink", result, reply));
        });
    }

    fn spawn_resolve_universal_link(&self, url: Url) {
        let Some(cfg) = self.config.clone() else {
            return;
        };
        let device = self.device_payload(&cfg);
        let api = Arc::clone(&self.api);
        let exec = self.exec.clone();
        tokio::spawn(async move {
            let result = api.resolve_universal_link(&cfg, device.as_ref(), &url).await;
            exec.submit(move |engine| engine.finish_resolution("resolve-url", result, None));
        });
    }

    /// Apply one completed resolution: broadcast on success, log-and-drop on
    /// failure. Runs inside the executor, so `last_payload` updates in
    /// completion order — last write wins, by contract.
    fn finish_resolution(
        &mut self,
        flow: &'static str,
        result: Result<LinkPayload, ApiError>,
        reply: Option<Reply>,
    ) {
        match result {
            Ok(payload) => {
                if self.debug_enabled() {
                    debug!(
                        flow,
                        link_id = payload.link_id.as_deref().unwrap_or("none"),
                        "payload received"
                    );
                }
                self.emit(payload.clone());
                if let Some(reply) = reply {
                    let _ = reply.send(Some(payload));
                }
            }
            Err(err) => {
                if self.debug_enabled() {
                    debug!(flow, error = %err, "resolution failed");
                }
                if let Some(reply) = reply {
                    let _ = reply.send(None);
                }
            }
        }
    }

    /// Deferred-install claim. Pasteboard token first (direct cid resolve),
    /// fingerprint claim as the fallback. The completion receives the
    /// payload in addition to the regular broadcast; every failure path
    /// delivers `None`.
    pub(crate) fn claim_deferred(&mut self, reply: Reply) {
        if self.config.is_none() {
            let _ = reply.send(None);
            return;
        }
        let token = self
            .pasteboard
            .read_text()
            .and_then(|text| lmk_pasteboard::extract_token(&text));
        match token {
            Some(cid) => {
                if self.debug_enabled() {
                    debug!("pasteboard token found, using direct claim");
                }
                self.spawn_resolve_cid(cid, Some(reply));
            }
            None => {
                if self.debug_enabled() {
                    debug!("no pasteboard token, using fingerprint claim");
                }
                self.spawn_fingerprint_claim(reply);
            }
        }
    }

    fn spawn_fingerprint_claim(&self, reply: Reply) {
        let Some(cfg) = self.config.clone() else {
            let _ = reply.send(None);
            return;
        };
        let device = self.device_payload(&cfg);
        let bundle_id = self.host.bundle_id();
        let platform = self.host.platform();
        let api = Arc::clone(&self.api);
        let exec = self.exec.clone();
        tokio::spawn(async move {
            let result = api
                .claim_deferred(&cfg, device.as_ref(), &bundle_id, &platform)
                .await;
            exec.submit(move |engine| {
                engine.finish_resolution("deferred-claim", result, Some(reply));
            });
        });
    }

    fn try_pasteboard_resolution(&mut self) {
        let Some(token) = self
            .pasteboard
            .read_text()
            .and_then(|text| lmk_pasteboard::extract_token(&text))
        else {
            return;
        };
        if self.debug_enabled() {
            debug!("pasteboard token found at configure");
        }
        self.spawn_resolve_cid(token, None);
    }

    // -----------------------------------------------------------------------
    // Reads, listeners, broadcast
    // -----------------------------------------------------------------------

    /// Deliver the current `last_payload` — no network, just a serialized
    /// read.
    pub(crate) fn get_initial_link(&self, reply: Reply) {
        let _ = reply.send(self.last_payload.clone());
    }

    pub(crate) fn add_listener(&mut self, id: Uuid, handler: ListenerFn) {
        self.listeners.insert(id, handler);
    }

    pub(crate) fn remove_listener(&mut self, id: Uuid) {
        self.listeners.remove(id);
    }

    /// Update `last_payload` and notify subscribers. The two happen in the
    /// same executor unit: no observer can see one without the other.
    pub(crate) fn emit(&mut self, payload: LinkPayload) {
        self.last_payload = Some(payload.clone());
        self.listeners.notify_all(&payload);
        let _ = self.stream_tx.send(payload);
    }

    // -----------------------------------------------------------------------
    // Event tracking
    // -----------------------------------------------------------------------

    /// Fire-and-forget app event. Unconfigured engines drop the event.
    pub(crate) fn track(&self, event: String, props: Option<Value>) {
        let Some(cfg) = self.config.clone() else {
            return;
        };
        let app_event = AppEvent {
            event,
            platform: self.host.platform(),
            timestamp: Utc::now().timestamp(),
            user_id: self.user_id.clone(),
            props,
        };
        let api = Arc::clone(&self.api);
        let debug_enabled = cfg.debug;
        tokio::spawn(async move {
            if let Err(err) = api.track(&cfg, &app_event).await {
                if debug_enabled {
                    debug!(error = %err, "event track failed");
                }
            }
        });
    }
}
