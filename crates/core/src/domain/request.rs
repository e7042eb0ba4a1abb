use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Open-ended payload carried through every beat of a sequence.
///
/// Keys are documented by convention only; the conductor never assumes a
/// fixed schema and logs the baton verbatim at beat boundaries.
pub type DataBaton = serde_json::Map<String, serde_json::Value>;

/// Queue insertion priority for a sequence request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Chained,
    #[default]
    Normal,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Chained => "chained",
            Self::Normal => "normal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Self::High),
            "chained" => Some(Self::Chained),
            "normal" => Some(Self::Normal),
            _ => None,
        }
    }
}

/// A request to execute a named sequence.
///
/// Created by a caller, owned exclusively by the execution queue while
/// pending, and handed to the executor on dequeue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceRequest {
    pub request_id: Uuid,
    pub sequence_name: String,
    pub priority: Priority,
    /// Data baton: mutable context threaded through every beat.
    pub payload: DataBaton,
    pub queued_at: DateTime<Utc>,
}

impl SequenceRequest {
    pub fn new(sequence_name: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            sequence_name: sequence_name.into(),
            priority: Priority::default(),
            payload: DataBaton::new(),
            queued_at: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_payload(mut self, payload: DataBaton) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.request_id = id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_to_normal_priority() {
        let request = SequenceRequest::new("canvas-create");
        assert_eq!(request.priority, Priority::Normal);
        assert!(request.payload.is_empty());
        assert_eq!(request.sequence_name, "canvas-create");
    }

    #[test]
    fn test_builder_overrides() {
        let mut baton = DataBaton::new();
        baton.insert("elementId".into(), serde_json::json!("btn-1"));

        let request = SequenceRequest::new("canvas-create")
            .with_priority(Priority::High)
            .with_payload(baton);

        assert_eq!(request.priority, Priority::High);
        assert_eq!(request.payload["elementId"], "btn-1");
    }

    #[test]
    fn test_priority_round_trip() {
        for p in [Priority::High, Priority::Chained, Priority::Normal] {
            assert_eq!(Priority::parse(p.as_str()), Some(p));
        }
        assert_eq!(Priority::parse("urgent"), None);
    }
}
