//! Operator-facing fault capture.
//!
//! Work running on the moderation pool has no caller to return errors to,
//! so faults are handed to a [`FaultReporter`] tagged with the component
//! that raised them.

use std::sync::Arc;
use warden_common::AppError;

/// Sink for faults that no caller is waiting on.
pub trait FaultReporter: Send + Sync {
    /// Record a fault raised by `component`.
    fn capture(&self, component: &'static str, fault: &AppError);
}

/// Reports faults through `tracing` at error level.
#[derive(Clone, Default)]
pub struct TracingFaultReporter;

impl FaultReporter for TracingFaultReporter {
    fn capture(&self, component: &'static str, fault: &AppError) {
        tracing::error!(
            component = component,
            code = fault.error_code(),
            kind = ?fault.fault_kind(),
            fault = %fault,
            "Captured fault"
        );
    }
}

/// Shared handle to a fault reporter.
pub type FaultService = Arc<dyn FaultReporter>;
