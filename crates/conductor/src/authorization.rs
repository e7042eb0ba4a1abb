//! Authorization gate for event-subscription traffic.
//!
//! Every subscribe/unsubscribe call carries an explicit [`CallerContext`];
//! the gate admits UI components, plugins inside their mount window, and
//! conductor-internal code. Anything else is a violation: fatal in strict
//! mode, recorded-and-waved-through in lenient mode.

use std::sync::Mutex;

use tracing::warn;

use conductor_core::{CallerContext, CallerRole, ConductorError, Result, Violation, ViolationKind};

/// Enforcement mode, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateMode {
    /// Unauthorized calls fail with [`ConductorError::Unauthorized`].
    #[default]
    Strict,
    /// Unauthorized calls proceed after the violation is recorded.
    /// Degraded-but-functional; trades safety for availability.
    Lenient,
}

pub struct AuthorizationGate {
    mode: GateMode,
    violations: Mutex<Vec<Violation>>,
}

impl AuthorizationGate {
    pub fn new(mode: GateMode) -> Self {
        Self {
            mode,
            violations: Mutex::new(Vec::new()),
        }
    }

    pub fn mode(&self) -> GateMode {
        self.mode
    }

    /// Pure role check. Records nothing; used for dry-run validation.
    pub fn is_authorized(&self, ctx: &CallerContext) -> bool {
        matches!(
            ctx.role,
            CallerRole::UiComponent | CallerRole::PluginDuringMount | CallerRole::ConductorInternal
        )
    }

    /// Gate one subscribe/unsubscribe call.
    ///
    /// On an unauthorized caller a [`Violation`] is recorded in either mode;
    /// only strict mode turns it into an error.
    pub fn authorize(&self, ctx: &CallerContext, kind: ViolationKind) -> Result<()> {
        if self.is_authorized(ctx) {
            return Ok(());
        }

        let violation = Violation::new(kind, ctx.caller_id(), ctx.source_label.clone());
        warn!(
            kind = kind.as_str(),
            caller = %violation.caller_id,
            source = %ctx.source_label,
            mode = ?self.mode,
            "authorization violation"
        );
        self.violations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(violation);

        match self.mode {
            GateMode::Strict => Err(ConductorError::unauthorized(
                kind.operation(),
                ctx.caller_id(),
            )),
            GateMode::Lenient => Ok(()),
        }
    }

    /// All violations recorded so far, oldest first.
    pub fn violations(&self) -> Vec<Violation> {
        self.violations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn violation_count(&self) -> usize {
        self.violations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}
