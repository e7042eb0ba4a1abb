mod caller;
mod request;
mod violation;

pub use caller::{CallerContext, CallerRole};
pub use request::{DataBaton, Priority, SequenceRequest};
pub use violation::{Severity, Violation, ViolationKind};
