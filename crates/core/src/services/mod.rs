//! Moderation services.

#![allow(missing_docs)]

pub mod enforcement;
pub mod escalation;
pub mod fault;
pub mod jobs;
pub mod moderation;
pub mod notification;
pub mod reconciler;
pub mod severity;
pub mod store;
pub mod subject_lock;

pub use enforcement::{
    ActionKind, BAN_HISTORY_DELETION_DAYS, EnforcementActions, EnforcementEvent,
    EnforcementService, NoOpEnforcement,
};
pub use escalation::{EscalationDecision, crossed};
pub use fault::{FaultReporter, FaultService, TracingFaultReporter};
pub use jobs::{JobSender, JobService, ModerationJob};
pub use moderation::{ActionInput, ESCALATION_REASON, ModerationService, WarnInput, WarnOutcome};
pub use notification::{
    DispatchService, ModerationNotice, NO_REASON, NoOpDispatch, NoticeField, NoticeKind,
    NoticeTone, NotificationDispatch,
};
pub use reconciler::{
    AuditActionKind, AuditEvent, ExternalActionReconciler, ReconcileOutcome, TimeoutChange,
};
pub use severity::{SeverityResult, compute_severity, weight_of};
pub use store::{DbInfractionStore, InfractionStore, InfractionStoreService, NewInfraction};
pub use subject_lock::SubjectLocks;
