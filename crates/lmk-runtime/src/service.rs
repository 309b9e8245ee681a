//! Public service facade.
//!
//! [`LinkMe`] is the single owned SDK instance an application constructs
//! once and passes by reference to its collaborators. Every method submits
//! a unit into the serial executor and returns immediately; reads resolve
//! through futures. Nothing here blocks the calling context on I/O.

use std::sync::Arc;

use tokio::sync::{broadcast, oneshot};
use tokio_stream::wrappers::BroadcastStream;
use url::Url;
use uuid::Uuid;

use lmk_api::{AttributionApi, HttpAttributionApi};
use lmk_device::{
    HostEnvironment, IdentifierProvider, PasteboardAccess, StaticHostEnvironment,
    UnavailableIdentifiers, UnavailablePasteboard,
};
use lmk_schemas::{LinkMeConfig, LinkPayload};

use crate::engine::Engine;
use crate::executor::{SerialExecutor, WeakSerialExecutor};
use crate::listeners::ListenerFn;

/// Capacity of the lossy stream fan-out. Slow stream consumers lag and drop;
/// the listener registry remains the exactly-once surface.
const STREAM_CAPACITY: usize = 64;

/// Deferred deep-link attribution service.
///
/// Construct once, inside a tokio runtime. Dropping the last handle shuts
/// the engine down; operations submitted afterwards are silent no-ops and
/// pending futures resolve to `None`.
pub struct LinkMe {
    exec: SerialExecutor<Engine>,
    stream_tx: broadcast::Sender<LinkPayload>,
}

impl LinkMe {
    /// Service with no platform capabilities: empty host facts, no
    /// identifiers, no clipboard. Useful for servers-side tools and tests;
    /// real integrations should inject capabilities via
    /// [`LinkMe::with_capabilities`].
    pub fn new() -> Self {
        Self::with_capabilities(
            Arc::new(StaticHostEnvironment::default()),
            Arc::new(UnavailableIdentifiers),
            Arc::new(UnavailablePasteboard),
        )
    }

    /// Service wired to the host platform's capability providers.
    pub fn with_capabilities(
        host: Arc<dyn HostEnvironment>,
        identifiers: Arc<dyn IdentifierProvider>,
        pasteboard: Arc<dyn PasteboardAccess>,
    ) -> Self {
        Self::assemble(
            Arc::new(HttpAttributionApi::new()),
            host,
            identifiers,
            pasteboard,
        )
    }

    /// Test seam: substitute the backend with an in-process implementation.
    #[cfg(any(test, feature = "testkit"))]
    pub fn with_api_for_test(
        api: Arc<dyn AttributionApi>,
        host: Arc<dyn HostEnvironment>,
        identifiers: Arc<dyn IdentifierProvider>,
        pasteboard: Arc<dyn PasteboardAccess>,
    ) -> Self {
        Self::assemble(api, host, identifiers, pasteboard)
    }

    fn assemble(
        api: Arc<dyn AttributionApi>,
        host: Arc<dyn HostEnvironment>,
        identifiers: Arc<dyn IdentifierProvider>,
        pasteboard: Arc<dyn PasteboardAccess>,
    ) -> Self {
        let (stream_tx, _) = broadcast::channel(STREAM_CAPACITY);
        let engine_stream = stream_tx.clone();
        let exec = SerialExecutor::spawn(move |weak| {
            Engine::new(weak, api, host, identifiers, pasteboard, engine_stream)
        });
        Self { exec, stream_tx }
    }

    // -----------------------------------------------------------------------
    // Configuration surface
    // -----------------------------------------------------------------------

    /// Apply a configuration. Marks the engine ready and drains any queued
    /// events. Safe to call again at any time; listeners and the last
    /// payload survive.
    pub fn configure(&self, cfg: LinkMeConfig) {
        self.exec.submit(move |engine| engine.configure(cfg));
    }

    /// Mark the engine ready without a new configuration (for hosts gating
    /// network activity on an external consent flow).
    pub fn set_ready(&self) {
        self.exec.submit(|engine| engine.set_ready());
    }

    /// Opt in/out of advertising-identifier usage at runtime, typically
    /// after the platform tracking prompt. Persist the decision in the app
    /// if it should survive restarts.
    pub fn set_advertising_consent(&self, granted: bool) {
        self.exec
            .submit(move |engine| engine.set_advertising_consent(granted));
    }

    /// Attach a user id to subsequently tracked events.
    pub fn set_user_id(&self, id: impl Into<String>) {
        let id = id.into();
        self.exec.submit(move |engine| engine.set_user_id(id));
    }

    // -----------------------------------------------------------------------
    // Inbound events
    // -----------------------------------------------------------------------

    /// Forward an app-open or continuation URL. Returns immediately; the
    /// event is queued until the engine is configured and ready.
    pub fn handle_url(&self, url: Url) {
        self.exec.submit(move |engine| engine.handle_url(url));
    }

    // -----------------------------------------------------------------------
    // Reads and claims
    // -----------------------------------------------------------------------

    /// The most recent payload, if any — no network call involved.
    pub async fn get_initial_link(&self) -> Option<LinkPayload> {
        let (tx, rx) = oneshot::channel();
        if !self.exec.submit(move |engine| engine.get_initial_link(tx)) {
            return None;
        }
        rx.await.ok().flatten()
    }

    /// Attempt deferred-install attribution: pasteboard token first, device
    /// fingerprint second. Resolves to the claimed payload (also broadcast
    /// to listeners) or `None` — a miss is a legitimate outcome, not an
    /// error.
    pub async fn claim_deferred_if_available(&self) -> Option<LinkPayload> {
        let (tx, rx) = oneshot::channel();
        if !self.exec.submit(move |engine| engine.claim_deferred(tx)) {
            return None;
        }
        rx.await.ok().flatten()
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Register a payload handler. Handlers run inside the engine's
    /// serialized context in registration order; hand long work off to your
    /// own task. The returned handle unregisters exactly this registration.
    pub fn add_listener(
        &self,
        handler: impl Fn(LinkPayload) + Send + 'static,
    ) -> ListenerHandle {
        let id = Uuid::new_v4();
        let boxed: ListenerFn = Box::new(handler);
        self.exec.submit(move |engine| engine.add_listener(id, boxed));
        ListenerHandle {
            id,
            exec: self.exec.downgrade(),
        }
    }

    /// Async stream of broadcast payloads. Best-effort: a consumer that
    /// falls more than the channel capacity behind observes a lag error and
    /// continues; use a listener for exactly-once delivery.
    pub fn payload_stream(&self) -> BroadcastStream<LinkPayload> {
        BroadcastStream::new(self.stream_tx.subscribe())
    }

    // -----------------------------------------------------------------------
    // Event tracking
    // -----------------------------------------------------------------------

    /// Record an app event. Fire-and-forget; dropped when unconfigured.
    pub fn track(&self, event: impl Into<String>) {
        let event = event.into();
        self.exec.submit(move |engine| engine.track(event, None));
    }

    /// Record an app event with a properties object.
    pub fn track_with_props(&self, event: impl Into<String>, props: serde_json::Value) {
        let event = event.into();
        self.exec
            .submit(move |engine| engine.track(event, Some(props)));
    }

    // -----------------------------------------------------------------------
    // Test probes
    // -----------------------------------------------------------------------

    /// Test seam: broadcast a payload as if a resolution completed.
    #[cfg(any(test, feature = "testkit"))]
    pub fn emit_for_test(&self, payload: LinkPayload) {
        self.exec.submit(move |engine| engine.emit(payload));
    }
}

impl Default for LinkMe {
    fn default() -> Self {
        Self::new()
    }
}

/// Unregistration capability returned by [`LinkMe::add_listener`]. Removes
/// exactly the registration it was issued for, regardless of later
/// insertions or removals. Dropping the handle without calling
/// [`ListenerHandle::unsubscribe`] leaves the listener registered.
pub struct ListenerHandle {
    id: Uuid,
    exec: WeakSerialExecutor<Engine>,
}

impl ListenerHandle {
    pub fn unsubscribe(self) {
        let id = self.id;
        self.exec.submit(move |engine| engine.remove_listener(id));
    }
}
