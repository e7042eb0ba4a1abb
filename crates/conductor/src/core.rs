//! The conductor core: one instance per process, wiring the transport,
//! authorization gate, subscription manager, and execution queue together,
//! plus hierarchical beat lifecycle logging.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use conductor_core::{
    CallerContext, ConductorError, DataBaton, Priority, Result, SequenceRequest,
};
use events::{
    BeatEvent, EventTransport, TOPIC_BEAT_COMPLETED, TOPIC_BEAT_ERROR, TOPIC_BEAT_STARTED,
};

use crate::authorization::{AuthorizationGate, GateMode};
use crate::queue::ExecutionQueue;
use crate::subscription::{SubscriptionHandle, SubscriptionManager};

#[derive(Default)]
struct BeatLogging {
    initialized: bool,
    handles: Vec<SubscriptionHandle>,
}

/// Process-wide orchestration core.
///
/// Owns the transport handle, the authorization gate, the subscription
/// manager, and the execution queue. All queue and subscription mutation
/// goes through this one instance; no other component holds a second copy
/// of that state.
pub struct Conductor {
    transport: Arc<dyn EventTransport>,
    gate: Arc<AuthorizationGate>,
    subscriptions: SubscriptionManager,
    queue: ExecutionQueue,
    beat_logging: Mutex<BeatLogging>,
}

impl std::fmt::Debug for Conductor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conductor").finish_non_exhaustive()
    }
}

impl Conductor {
    pub fn new(transport: Arc<dyn EventTransport>, mode: GateMode) -> Self {
        let gate = Arc::new(AuthorizationGate::new(mode));
        let subscriptions =
            SubscriptionManager::new(Arc::clone(&transport), Arc::clone(&gate));
        Self {
            transport,
            gate,
            subscriptions,
            queue: ExecutionQueue::new(),
            beat_logging: Mutex::new(BeatLogging::default()),
        }
    }

    /// Entry point for callers: build a request and hand it to the queue.
    /// Returns the request id for later correlation.
    pub fn request_sequence(
        &self,
        sequence_name: impl Into<String>,
        payload: DataBaton,
        priority: Priority,
    ) -> Result<uuid::Uuid> {
        let request = SequenceRequest::new(sequence_name)
            .with_priority(priority)
            .with_payload(payload);
        let request_id = request.request_id;
        self.queue.enqueue(request)?;
        Ok(request_id)
    }

    /// Wire up beat lifecycle logging. Idempotent: calls after the first
    /// are no-ops until [`cleanup`](Self::cleanup) resets the flag.
    pub fn initialize(&self) -> Result<()> {
        let mut logging = self.lock_logging();
        if logging.initialized {
            debug!("beat lifecycle logging already initialized");
            return Ok(());
        }

        let ctx = CallerContext::internal();
        let started =
            self.subscriptions
                .subscribe(TOPIC_BEAT_STARTED, Arc::new(log_beat_started), &ctx)?;
        let completed =
            self.subscriptions
                .subscribe(TOPIC_BEAT_COMPLETED, Arc::new(log_beat_completed), &ctx)?;
        let errored =
            self.subscriptions
                .subscribe(TOPIC_BEAT_ERROR, Arc::new(log_beat_error), &ctx)?;

        logging.handles.extend([started, completed, errored]);
        logging.initialized = true;
        info!("beat lifecycle logging initialized");
        Ok(())
    }

    /// Tear down every tracked logging subscription. Individual failures
    /// are logged and skipped so one bad unsubscribe never blocks the
    /// rest. Safe to call repeatedly.
    pub fn cleanup(&self) {
        let mut logging = self.lock_logging();
        for handle in logging.handles.drain(..) {
            if !handle.unsubscribe() {
                warn!(
                    topic = handle.topic(),
                    subscription = %handle.id(),
                    "logging subscription was already removed"
                );
            }
        }
        logging.initialized = false;
        debug!("conductor cleanup complete");
    }

    /// True once `initialize` has run and not been undone by `cleanup`.
    /// The transport and gate are guaranteed present by construction.
    pub fn is_initialized(&self) -> bool {
        self.lock_logging().initialized
    }

    pub fn queue(&self) -> &ExecutionQueue {
        &self.queue
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    pub fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    pub fn transport(&self) -> &Arc<dyn EventTransport> {
        &self.transport
    }

    fn lock_logging(&self) -> std::sync::MutexGuard<'_, BeatLogging> {
        self.beat_logging.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Conductor {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Host-owned instance slot.
///
/// Replaces a globally reachable singleton: the host constructs one cell at
/// startup and threads it to whoever needs the conductor. The first
/// `get_instance` call must supply a transport; later calls return the same
/// instance and ignore their argument. `reset_instance` exists for test
/// isolation only.
#[derive(Default)]
pub struct ConductorCell {
    slot: Mutex<Option<Arc<Conductor>>>,
    mode: GateMode,
}

impl ConductorCell {
    pub fn new(mode: GateMode) -> Self {
        Self {
            slot: Mutex::new(None),
            mode,
        }
    }

    /// Return the conductor, constructing and initializing it on first use.
    ///
    /// Fails with [`ConductorError::MissingDependency`] when the slot is
    /// empty and no transport was supplied.
    pub fn get_instance(
        &self,
        transport: Option<Arc<dyn EventTransport>>,
    ) -> Result<Arc<Conductor>> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = slot.as_ref() {
            return Ok(Arc::clone(existing));
        }

        let transport = transport
            .ok_or_else(|| ConductorError::missing_dependency("event transport"))?;
        let conductor = Arc::new(Conductor::new(transport, self.mode));
        conductor.initialize()?;
        *slot = Some(Arc::clone(&conductor));
        info!("conductor instance created");
        Ok(conductor)
    }

    /// Tear down the current instance and empty the slot. Test-only path.
    pub fn reset_instance(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(conductor) = slot.take() {
            conductor.cleanup();
            debug!("conductor instance reset");
        }
    }
}

fn parse_beat(payload: &serde_json::Value) -> Option<BeatEvent> {
    match serde_json::from_value(payload.clone()) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, payload = %payload, "unparseable beat event payload");
            None
        }
    }
}

fn baton_snapshot(event: &BeatEvent) -> String {
    serde_json::to_string(&event.baton).unwrap_or_else(|_| "{}".into())
}

fn log_beat_started(payload: &serde_json::Value) {
    if let Some(event) = parse_beat(payload) {
        info!(
            "┌─ {} · {} · beat {} started",
            event.sequence_name, event.movement_name, event.beat
        );
        info!("│  baton: {}", baton_snapshot(&event));
    }
}

fn log_beat_completed(payload: &serde_json::Value) {
    if let Some(event) = parse_beat(payload) {
        info!(
            "└─ {} · {} · beat {} completed in {}ms",
            event.sequence_name, event.movement_name, event.beat, event.elapsed_ms
        );
    }
}

fn log_beat_error(payload: &serde_json::Value) {
    if let Some(event) = parse_beat(payload) {
        tracing::error!(
            "└─ {} · {} · beat {} failed: {}",
            event.sequence_name,
            event.movement_name,
            event.beat,
            event.error.as_deref().unwrap_or("unknown error")
        );
    }
}
