//! Gated access to the event transport.
//!
//! All subscription traffic flows through [`SubscriptionManager`], which
//! consults the [`AuthorizationGate`] before touching the transport.
//! Managed subscriptions additionally isolate handler panics so one
//! misbehaving listener cannot break delivery to the rest.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error};

use conductor_core::{CallerContext, Result, ViolationKind};
use events::{EventTransport, SubscriptionId, TransportHandler};

use crate::authorization::AuthorizationGate;

/// Idempotent unsubscribe handle returned by a successful subscribe.
pub struct SubscriptionHandle {
    transport: Arc<dyn EventTransport>,
    topic: String,
    id: SubscriptionId,
    active: AtomicBool,
}

impl SubscriptionHandle {
    fn new(transport: Arc<dyn EventTransport>, topic: String, id: SubscriptionId) -> Self {
        Self {
            transport,
            topic,
            id,
            active: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Remove the registration from the transport. Safe to call more than
    /// once; later calls are no-ops returning `false`.
    pub fn unsubscribe(&self) -> bool {
        if self.active.swap(false, Ordering::SeqCst) {
            self.transport.unsubscribe(&self.topic, self.id)
        } else {
            false
        }
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// A subscription tagged with its owner, with panic-isolated delivery.
#[derive(Debug)]
pub struct ManagedSubscription {
    owner_id: String,
    handle: SubscriptionHandle,
}

impl ManagedSubscription {
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn topic(&self) -> &str {
        self.handle.topic()
    }

    pub fn unsubscribe(&self) -> bool {
        self.handle.unsubscribe()
    }
}

/// Outcome of a dry-run subscription check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionCheck {
    pub valid: bool,
    pub reason: String,
    pub recommendation: String,
}

/// Routes every subscribe/unsubscribe through the authorization gate and
/// delegates to the transport on success.
pub struct SubscriptionManager {
    transport: Arc<dyn EventTransport>,
    gate: Arc<AuthorizationGate>,
}

impl SubscriptionManager {
    pub fn new(transport: Arc<dyn EventTransport>, gate: Arc<AuthorizationGate>) -> Self {
        Self { transport, gate }
    }

    /// Gated subscribe. In strict mode an unauthorized caller fails before
    /// the transport is touched; in lenient mode the violation is recorded
    /// and the registration proceeds.
    pub fn subscribe(
        &self,
        topic: &str,
        handler: TransportHandler,
        ctx: &CallerContext,
    ) -> Result<SubscriptionHandle> {
        self.gate.authorize(ctx, ViolationKind::UnauthorizedSubscribe)?;

        let id = self.transport.subscribe(topic, handler);
        debug!(
            topic = %topic,
            subscription = %id,
            caller = %ctx.caller_id(),
            conductor_managed = true,
            "subscription registered"
        );
        Ok(SubscriptionHandle::new(
            Arc::clone(&self.transport),
            topic.to_string(),
            id,
        ))
    }

    /// Gated unsubscribe by subscription id. Returns whether the transport
    /// still had the registration.
    pub fn unsubscribe(
        &self,
        topic: &str,
        id: SubscriptionId,
        ctx: &CallerContext,
    ) -> Result<bool> {
        self.gate
            .authorize(ctx, ViolationKind::UnauthorizedUnsubscribe)?;
        Ok(self.transport.unsubscribe(topic, id))
    }

    /// Like [`subscribe`](Self::subscribe), but the handler is wrapped so a
    /// panic inside it is caught and logged with the owner id attached.
    /// Delivery to other listeners on the topic is never affected.
    pub fn create_managed_subscription(
        &self,
        topic: &str,
        handler: TransportHandler,
        owner_id: &str,
        ctx: &CallerContext,
    ) -> Result<ManagedSubscription> {
        let owner = owner_id.to_string();
        let owned_topic = topic.to_string();
        let wrapped: TransportHandler = Arc::new(move |payload: &serde_json::Value| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(payload)));
            if let Err(cause) = outcome {
                error!(
                    owner = %owner,
                    topic = %owned_topic,
                    panic = %panic_message(&cause),
                    "managed subscription handler panicked"
                );
            }
        });

        let handle = self.subscribe(topic, wrapped, ctx)?;
        Ok(ManagedSubscription {
            owner_id: owner_id.to_string(),
            handle,
        })
    }

    /// Publish a payload to a topic. Emit is intentionally ungated; only
    /// subscription traffic is authorization-checked. Returns the number of
    /// handlers that received the payload.
    pub fn emit(&self, topic: &str, payload: &serde_json::Value, emitter_id: Option<&str>) -> usize {
        if let Some(emitter) = emitter_id {
            debug!(topic = %topic, emitter = %emitter, "emitting event");
        }
        self.transport.publish(topic, payload)
    }

    /// Dry-run check: would this caller be allowed to subscribe to the
    /// topic? No subscription is made and no violation is recorded.
    pub fn validate_subscription(&self, topic: &str, ctx: &CallerContext) -> SubscriptionCheck {
        if self.gate.is_authorized(ctx) {
            SubscriptionCheck {
                valid: true,
                reason: format!("{} may subscribe to '{topic}'", ctx.caller_id()),
                recommendation: "proceed with subscribe()".into(),
            }
        } else {
            SubscriptionCheck {
                valid: false,
                reason: format!(
                    "{} is not an authorized subscriber role for '{topic}'",
                    ctx.caller_id()
                ),
                recommendation:
                    "route the call through a UI adapter, a plugin mount hook, or conductor-internal code"
                        .into(),
            }
        }
    }

    pub fn transport(&self) -> &Arc<dyn EventTransport> {
        &self.transport
    }
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = cause.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
