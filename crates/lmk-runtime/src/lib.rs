//! lmk-runtime
//!
//! The resolution engine of the LinkMe SDK: a single serial executor owning
//! all mutable state (configuration, readiness, consent, the pending-event
//! queue, listeners, the last payload), with backend calls running as
//! independent tasks that re-enter the executor on completion.
//!
//! Applications interact through [`LinkMe`]: construct one instance inside
//! a tokio runtime, inject the host's capability providers, `configure`,
//! forward inbound URLs, and subscribe for resolved payloads.
//!
//! ```no_run
//! use std::sync::Arc;
//! use lmk_runtime::{
//!     LinkMe, LinkMeConfig, StaticHostEnvironment, UnavailableIdentifiers,
//!     UnavailablePasteboard,
//! };
//!
//! # async fn wire() -> anyhow::Result<()> {
//! let sdk = LinkMe::with_capabilities(
//!     Arc::new(StaticHostEnvironment::new("me.link.example")),
//!     Arc::new(UnavailableIdentifiers),
//!     Arc::new(UnavailablePasteboard),
//! );
//! sdk.configure(LinkMeConfig::with_base_url("https://li-nk.me")?);
//! let _listener = sdk.add_listener(|payload| {
//!     println!("resolved: {:?}", payload.link_id);
//! });
//! sdk.handle_url(url::Url::parse("https://partner.example/promo?cid=deadbeef00")?);
//! # Ok(())
//! # }
//! ```

mod engine;
pub mod executor;
mod listeners;
mod service;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use service::{LinkMe, ListenerHandle};

// Re-exported so integrators depend on one crate.
pub use lmk_api::{ApiError, AttributionApi, HttpAttributionApi};
pub use lmk_device::{
    HostEnvironment, IdentifierProvider, PasteboardAccess, StaticHostEnvironment,
    StaticIdentifiers, StaticPasteboard, UnavailableIdentifiers, UnavailablePasteboard,
};
pub use lmk_schemas::{AppEvent, LinkMeConfig, LinkPayload};
