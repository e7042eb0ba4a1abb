//! Sequence orchestration core.
//!
//! A conductor accepts requests to run named sequences (ordered movements
//! and beats), schedules them through a priority-aware execution queue,
//! emits beat lifecycle events over an injected event transport, and gates
//! all subscription traffic behind an explicit caller-context authorization
//! layer.
//!
//! The scheduling model is cooperative and non-preemptive: one sequence
//! executes at a time, and a high-priority enqueue only wins the next
//! dequeue, never an interrupt.

pub mod authorization;
pub mod core;
pub mod queue;
pub mod subscription;

pub use authorization::{AuthorizationGate, GateMode};
pub use self::core::{Conductor, ConductorCell};
pub use queue::{ExecutionQueue, QueueStatus};
pub use subscription::{
    ManagedSubscription, SubscriptionCheck, SubscriptionHandle, SubscriptionManager,
};

pub use conductor_core::{ConductorError, Result};
