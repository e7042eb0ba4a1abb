//! Priority-ordered execution queue for sequence requests.
//!
//! Requests wait here until the executor dequeues them. Insertion position
//! is governed by priority tier:
//!
//! - `High` goes to the very front, ahead of everything already queued,
//!   including earlier `High` items (most recently enqueued `High` wins).
//! - `Chained` slots in immediately after the contiguous run of `High`
//!   items at the head.
//! - `Normal` appends at the tail.
//!
//! The queue never advances itself: `currently_executing` is set only by
//! the executor through [`ExecutionQueue::set_currently_executing`].

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use tracing::{debug, warn};

use conductor_core::{ConductorError, Priority, Result, SequenceRequest};

/// Snapshot of queue occupancy returned by [`ExecutionQueue::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStatus {
    pub pending: usize,
    /// 0 or 1; at most one sequence executes at a time.
    pub executing: usize,
    pub completed: u64,
    pub active_sequence: Option<String>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<SequenceRequest>,
    currently_executing: Option<SequenceRequest>,
    completed_count: u64,
    priority_overrides: HashMap<String, Priority>,
}

/// Priority-aware FIFO of pending sequence requests.
///
/// All state sits behind one mutex so enqueue/dequeue/mark-completed are
/// atomic with respect to each other.
#[derive(Default)]
pub struct ExecutionQueue {
    state: Mutex<QueueState>,
}

impl ExecutionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a request according to its effective priority.
    ///
    /// A priority override registered for the request's sequence name takes
    /// precedence over the priority the request was built with; the stored
    /// request carries the effective priority.
    pub fn enqueue(&self, mut request: SequenceRequest) -> Result<()> {
        if request.sequence_name.trim().is_empty() {
            return Err(ConductorError::invalid_argument(
                "sequence request has an empty sequence name",
            ));
        }

        let mut state = self.lock();
        if let Some(&override_priority) = state.priority_overrides.get(&request.sequence_name) {
            debug!(
                sequence = %request.sequence_name,
                from = request.priority.as_str(),
                to = override_priority.as_str(),
                "applying priority override"
            );
            request.priority = override_priority;
        }

        debug!(
            sequence = %request.sequence_name,
            request = %request.request_id,
            priority = request.priority.as_str(),
            pending = state.pending.len(),
            "enqueueing sequence request"
        );

        match request.priority {
            // Most recently enqueued High dequeues first. This matches the
            // observed scheduler: each High push lands at position 0.
            Priority::High => state.pending.push_front(request),
            Priority::Chained => {
                let after_high = state
                    .pending
                    .iter()
                    .take_while(|r| r.priority == Priority::High)
                    .count();
                state.pending.insert(after_high, request);
            }
            Priority::Normal => state.pending.push_back(request),
        }
        Ok(())
    }

    /// Pop the head request, if any. Does not touch `currently_executing`
    /// or the completed counter; the executor owns those transitions.
    pub fn dequeue(&self) -> Option<SequenceRequest> {
        self.lock().pending.pop_front()
    }

    /// Read-only look at the head request.
    pub fn peek(&self) -> Option<SequenceRequest> {
        self.lock().pending.front().cloned()
    }

    /// Drop all pending requests and priority overrides, returning how many
    /// requests were removed. The in-flight request and completed counter
    /// are untouched.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let removed = state.pending.len();
        state.pending.clear();
        state.priority_overrides.clear();
        if removed > 0 {
            debug!(removed, "cleared pending sequence requests");
        }
        removed
    }

    pub fn status(&self) -> QueueStatus {
        let state = self.lock();
        QueueStatus {
            pending: state.pending.len(),
            executing: usize::from(state.currently_executing.is_some()),
            completed: state.completed_count,
            active_sequence: state
                .currently_executing
                .as_ref()
                .map(|r| r.sequence_name.clone()),
        }
    }

    /// Record which request the executor is driving. Pure setter.
    pub fn set_currently_executing(&self, request: Option<SequenceRequest>) {
        let mut state = self.lock();
        match &request {
            Some(r) => debug!(
                sequence = %r.sequence_name,
                request = %r.request_id,
                "sequence now executing"
            ),
            None => debug!("execution slot cleared"),
        }
        state.currently_executing = request;
    }

    /// Count a request as completed.
    ///
    /// The counter increments unconditionally, even when the argument is
    /// not the currently executing request; only the executing slot is
    /// guarded by a request-id match. Observed scheduler behavior, kept
    /// as-is pending confirmation from the original maintainers.
    pub fn mark_completed(&self, request: &SequenceRequest) {
        let mut state = self.lock();
        state.completed_count += 1;

        let matches_current = state
            .currently_executing
            .as_ref()
            .is_some_and(|current| current.request_id == request.request_id);
        if matches_current {
            state.currently_executing = None;
        } else if state.currently_executing.is_some() {
            warn!(
                sequence = %request.sequence_name,
                request = %request.request_id,
                "mark_completed called for a request that is not currently executing"
            );
        }

        debug!(
            sequence = %request.sequence_name,
            completed = state.completed_count,
            "sequence request completed"
        );
    }

    /// Register a per-sequence-name default priority consulted at enqueue.
    pub fn set_priority_override(&self, sequence_name: impl Into<String>, priority: Priority) {
        self.lock()
            .priority_overrides
            .insert(sequence_name.into(), priority);
    }

    pub fn priority_override(&self, sequence_name: &str) -> Option<Priority> {
        self.lock().priority_overrides.get(sequence_name).copied()
    }

    /// Clones of all pending requests for the named sequence, in queue order.
    pub fn find_by_sequence_name(&self, sequence_name: &str) -> Vec<SequenceRequest> {
        self.lock()
            .pending
            .iter()
            .filter(|r| r.sequence_name == sequence_name)
            .cloned()
            .collect()
    }

    /// Remove every pending request for the named sequence. Returns the
    /// number removed; zero when nothing matched. This is the only
    /// cancellation primitive — an executing sequence is never interrupted.
    pub fn remove_by_sequence_name(&self, sequence_name: &str) -> usize {
        let mut state = self.lock();
        let before = state.pending.len();
        state.pending.retain(|r| r.sequence_name != sequence_name);
        let removed = before - state.pending.len();
        if removed > 0 {
            debug!(sequence = %sequence_name, removed, "removed pending sequence requests");
        }
        removed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, priority: Priority) -> SequenceRequest {
        SequenceRequest::new(name).with_priority(priority)
    }

    #[test]
    fn test_priority_ordering_across_tiers() {
        let queue = ExecutionQueue::new();
        queue.enqueue(request("a", Priority::Normal)).unwrap();
        queue.enqueue(request("b", Priority::High)).unwrap();
        queue.enqueue(request("c", Priority::Chained)).unwrap();

        assert_eq!(queue.dequeue().unwrap().sequence_name, "b");
        assert_eq!(queue.dequeue().unwrap().sequence_name, "c");
        assert_eq!(queue.dequeue().unwrap().sequence_name, "a");
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_most_recent_high_dequeues_first() {
        let queue = ExecutionQueue::new();
        queue.enqueue(request("x", Priority::High)).unwrap();
        queue.enqueue(request("y", Priority::High)).unwrap();

        assert_eq!(queue.dequeue().unwrap().sequence_name, "y");
        assert_eq!(queue.dequeue().unwrap().sequence_name, "x");
    }

    #[test]
    fn test_fifo_within_normal_tier() {
        let queue = ExecutionQueue::new();
        queue.enqueue(request("a", Priority::Normal)).unwrap();
        queue.enqueue(request("b", Priority::Normal)).unwrap();

        assert_eq!(queue.dequeue().unwrap().sequence_name, "a");
        assert_eq!(queue.dequeue().unwrap().sequence_name, "b");
    }

    #[test]
    fn test_chained_lands_after_high_run_before_normal() {
        let queue = ExecutionQueue::new();
        queue.enqueue(request("n1", Priority::Normal)).unwrap();
        queue.enqueue(request("h1", Priority::High)).unwrap();
        queue.enqueue(request("h2", Priority::High)).unwrap();
        queue.enqueue(request("c1", Priority::Chained)).unwrap();
        queue.enqueue(request("c2", Priority::Chained)).unwrap();

        // Each Chained slots in right behind the High run, so the newer
        // chained request precedes the older one.
        let order: Vec<String> = std::iter::from_fn(|| queue.dequeue())
            .map(|r| r.sequence_name)
            .collect();
        assert_eq!(order, ["h2", "h1", "c2", "c1", "n1"]);
    }

    #[test]
    fn test_enqueue_rejects_empty_sequence_name() {
        let queue = ExecutionQueue::new();
        let err = queue.enqueue(SequenceRequest::new("  ")).unwrap_err();
        assert!(matches!(err, ConductorError::InvalidArgument(_)));
        assert_eq!(queue.status().pending, 0);
    }

    #[test]
    fn test_clear_on_empty_queue_is_idempotent() {
        let queue = ExecutionQueue::new();
        assert_eq!(queue.clear(), 0);
        assert_eq!(queue.status(), QueueStatus {
            pending: 0,
            executing: 0,
            completed: 0,
            active_sequence: None,
        });
    }

    #[test]
    fn test_clear_drops_pending_and_overrides_only() {
        let queue = ExecutionQueue::new();
        queue.set_priority_override("late", Priority::High);
        queue.enqueue(request("a", Priority::Normal)).unwrap();
        let executing = request("busy", Priority::Normal);
        queue.set_currently_executing(Some(executing.clone()));
        queue.mark_completed(&executing);

        assert_eq!(queue.clear(), 1);
        assert_eq!(queue.priority_override("late"), None);
        let status = queue.status();
        assert_eq!(status.pending, 0);
        assert_eq!(status.completed, 1);
    }

    #[test]
    fn test_completed_count_increments_for_non_current_request() {
        let queue = ExecutionQueue::new();
        let current = request("current", Priority::Normal);
        queue.set_currently_executing(Some(current.clone()));

        // A stray completion still bumps the counter but must not clear
        // the executing slot.
        let stray = request("stray", Priority::Normal);
        queue.mark_completed(&stray);
        let status = queue.status();
        assert_eq!(status.completed, 1);
        assert_eq!(status.executing, 1);
        assert_eq!(status.active_sequence.as_deref(), Some("current"));

        queue.mark_completed(&current);
        let status = queue.status();
        assert_eq!(status.completed, 2);
        assert_eq!(status.executing, 0);
        assert_eq!(status.active_sequence, None);
    }

    #[test]
    fn test_status_after_dequeue_and_set_executing() {
        let queue = ExecutionQueue::new();
        queue.enqueue(request("a", Priority::Normal)).unwrap();
        queue.enqueue(request("b", Priority::Normal)).unwrap();
        queue.enqueue(request("c", Priority::Normal)).unwrap();

        let head = queue.dequeue().unwrap();
        queue.set_currently_executing(Some(head.clone()));

        let status = queue.status();
        assert_eq!(status.pending, 2);
        assert_eq!(status.executing, 1);
        assert_eq!(status.completed, 0);
        assert_eq!(status.active_sequence.as_deref(), Some("a"));
    }

    #[test]
    fn test_dequeue_leaves_executing_slot_alone() {
        let queue = ExecutionQueue::new();
        queue.enqueue(request("a", Priority::Normal)).unwrap();
        queue.dequeue().unwrap();
        assert_eq!(queue.status().executing, 0);
    }

    #[test]
    fn test_peek_does_not_mutate() {
        let queue = ExecutionQueue::new();
        queue.enqueue(request("a", Priority::Normal)).unwrap();
        assert_eq!(queue.peek().unwrap().sequence_name, "a");
        assert_eq!(queue.status().pending, 1);
    }

    #[test]
    fn test_priority_override_applies_at_enqueue() {
        let queue = ExecutionQueue::new();
        queue.set_priority_override("urgent", Priority::High);
        queue.enqueue(request("a", Priority::Normal)).unwrap();
        queue.enqueue(request("urgent", Priority::Normal)).unwrap();

        let head = queue.dequeue().unwrap();
        assert_eq!(head.sequence_name, "urgent");
        assert_eq!(head.priority, Priority::High);
    }

    #[test]
    fn test_find_and_remove_by_sequence_name() {
        let queue = ExecutionQueue::new();
        queue.enqueue(request("a", Priority::Normal)).unwrap();
        queue.enqueue(request("b", Priority::Normal)).unwrap();
        queue.enqueue(request("a", Priority::Normal)).unwrap();

        assert_eq!(queue.find_by_sequence_name("a").len(), 2);
        assert_eq!(queue.remove_by_sequence_name("a"), 2);
        assert_eq!(queue.remove_by_sequence_name("missing"), 0);
        assert_eq!(queue.status().pending, 1);
    }
}
