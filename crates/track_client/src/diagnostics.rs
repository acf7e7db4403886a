use tracing::{debug, error, warn};

use crate::{
    error::TrackError,
    operation::{FailurePolicy, Operation},
};

/// Hook for surfacing operation outcomes. Swallowed failures are visible only here.
pub trait Diagnostics: Send + Sync {
    fn operation_succeeded(&self, op: Operation);
    fn operation_failed(&self, op: Operation, err: &TrackError, policy: FailurePolicy);
}

pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn operation_succeeded(&self, op: Operation) {
        debug!(op = op.name(), "track operation succeeded");
    }

    fn operation_failed(&self, op: Operation, err: &TrackError, policy: FailurePolicy) {
        match policy {
            FailurePolicy::Swallow => {
                warn!(op = op.name(), error = %err, "best-effort track operation failed; ignoring")
            }
            _ => error!(
                op = op.name(),
                error = %err,
                status = err.status(),
                code = ?err.code(),
                ?policy,
                "track operation failed"
            ),
        }
    }
}
