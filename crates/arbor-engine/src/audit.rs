//! # Audit Log Collaborator
//!
//! Fire-and-forget audit trail interface. The engine records what happened;
//! where the records land is the implementation's business. Failures never
//! affect order semantics.

use tracing::info;

/// Audit trail sink.
pub trait AuditLog: Send + Sync {
    /// Records an action. Fire-and-forget: implementations must not fail
    /// the caller.
    fn record(&self, action: &str, module: &str, description: &str);
}

/// Default audit sink: structured log records.
#[derive(Debug, Default, Clone)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn record(&self, action: &str, module: &str, description: &str) {
        info!(action, module, description, "audit");
    }
}
