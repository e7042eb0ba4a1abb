//! Event transport for the sequence conductor.
//!
//! This crate provides the publish/subscribe primitive the conductor is
//! built on: the [`EventTransport`] trait, an in-memory reference
//! implementation, and the beat lifecycle topics and payload.

mod beat;
mod transport;

pub use beat::{BeatEvent, TOPIC_BEAT_COMPLETED, TOPIC_BEAT_ERROR, TOPIC_BEAT_STARTED};
pub use transport::{EventTransport, InMemoryTransport, SubscriptionId, TransportHandler};
