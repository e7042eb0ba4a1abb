//! Beat lifecycle topics and payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Published when a beat begins executing.
pub const TOPIC_BEAT_STARTED: &str = "beat:started";
/// Published when a beat finishes successfully.
pub const TOPIC_BEAT_COMPLETED: &str = "beat:completed";
/// Published when a beat fails.
pub const TOPIC_BEAT_ERROR: &str = "beat:error";

/// Payload carried on every beat lifecycle topic.
///
/// The `baton` is the sequence's data baton snapshot at the beat boundary;
/// it has no fixed schema and is logged verbatim for observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeatEvent {
    pub sequence_name: String,
    pub movement_name: String,
    pub beat: u32,
    pub timestamp: DateTime<Utc>,
    /// Milliseconds since the beat started; zero on `beat:started`.
    pub elapsed_ms: u64,
    pub baton: serde_json::Map<String, serde_json::Value>,
    /// Present only on `beat:error`.
    pub error: Option<String>,
}

impl BeatEvent {
    pub fn new(
        sequence_name: impl Into<String>,
        movement_name: impl Into<String>,
        beat: u32,
    ) -> Self {
        Self {
            sequence_name: sequence_name.into(),
            movement_name: movement_name.into(),
            beat,
            timestamp: Utc::now(),
            elapsed_ms: 0,
            baton: serde_json::Map::new(),
            error: None,
        }
    }

    pub fn with_baton(mut self, baton: serde_json::Map<String, serde_json::Value>) -> Self {
        self.baton = baton;
        self
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Serialize for the transport. Infallible for this shape.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
