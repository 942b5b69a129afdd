#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Progress channel shared between the copy engine and its observers.
//!
//! The bus carries typed events with sequential identifiers over
//! `tokio::broadcast`. Delivery is fire-and-forget: an event published while
//! nobody is subscribed is dropped, and subscribers never see events that were
//! published before they subscribed.
//!
//! Layout: `payloads.rs` (event types), `routing.rs` (the bus),
//! `subscription.rs` (handler-based listeners), `topics.rs` (kind names),
//! `error.rs` (delivery errors).

pub mod error;
pub mod payloads;
pub mod routing;
pub mod subscription;
pub mod topics;

pub use error::{EventBusError, EventBusResult};
pub use payloads::{DEFAULT_CHANNEL_CAPACITY, Event, EventEnvelope, EventId, ProgressEvent};
pub use routing::{EventBus, EventStream};
pub use subscription::Subscription;
