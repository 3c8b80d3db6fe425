//! Mirrors moderation actions taken outside the bot into the moderation log.
//!
//! Moderators can kick, ban, unban and time out members through the
//! platform's own tools. Those actions show up in the audit log; this
//! module turns them into the same notices the bot would have sent. It
//! never touches infraction history and never calls enforcement.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use warden_common::{AppError, AppResult};

use super::fault::FaultService;
use super::notification::{DispatchService, ModerationNotice, NO_REASON, NoticeKind};

const COMPONENT: &str = "reconciler";

/// Audit log action types the reconciler understands.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditActionKind {
    Kick,
    Ban,
    Unban,
    MemberUpdate,
    #[serde(untagged)]
    Other(String),
}

/// Change to a member's timeout carried by a member-update entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutChange {
    /// New timeout end, or `None` if the timeout was cleared.
    pub new_expiry: Option<DateTime<Utc>>,
}

/// One audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub kind: AuditActionKind,
    /// User the action targeted.
    pub subject_id: String,
    /// User who performed the action.
    pub actor_id: String,
    #[serde(default)]
    pub reason: Option<String>,
    /// Present only on member updates that touched the timeout.
    #[serde(default)]
    pub timeout_change: Option<TimeoutChange>,
}

/// What the reconciler did with an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The bot performed the action itself and already logged it.
    SelfInitiated,
    /// A member update that did not change the timeout.
    NoRelevantChange,
    /// A notice was produced and handed to dispatch.
    Notified(NoticeKind),
    /// The entry could not be mapped to a notice.
    Rejected,
}

/// Converts audit log entries into moderation log notices.
#[derive(Clone)]
pub struct ExternalActionReconciler {
    bot_user_id: String,
    community_id: String,
    dispatch: DispatchService,
    faults: FaultService,
}

impl ExternalActionReconciler {
    /// Create a reconciler for one community.
    #[must_use]
    pub fn new(
        bot_user_id: impl Into<String>,
        community_id: impl Into<String>,
        dispatch: DispatchService,
        faults: FaultService,
    ) -> Self {
        Self {
            bot_user_id: bot_user_id.into(),
            community_id: community_id.into(),
            dispatch,
            faults,
        }
    }

    /// Handle one audit log entry.
    pub async fn on_external_action(&self, event: AuditEvent) -> ReconcileOutcome {
        self.reconcile(event, Utc::now()).await
    }

    async fn reconcile(&self, event: AuditEvent, now: DateTime<Utc>) -> ReconcileOutcome {
        if event.actor_id == self.bot_user_id {
            return ReconcileOutcome::SelfInitiated;
        }

        let notice = match build_notice(&event, now) {
            Ok(Some(notice)) => notice.with_manual_source(),
            Ok(None) => return ReconcileOutcome::NoRelevantChange,
            Err(e) => {
                self.faults.capture(COMPONENT, &e);
                return ReconcileOutcome::Rejected;
            }
        };

        tracing::info!(
            community_id = %self.community_id,
            subject_id = %event.subject_id,
            actor_id = %event.actor_id,
            kind = ?notice.kind,
            "Reconciled external moderation action"
        );

        if let Err(e) = self
            .dispatch
            .send_to_moderation_log(&self.community_id, &notice)
            .await
        {
            tracing::warn!(
                community_id = %self.community_id,
                error = %e,
                "Failed to deliver reconciled notice"
            );
        }
        ReconcileOutcome::Notified(notice.kind)
    }
}

fn build_notice(event: &AuditEvent, now: DateTime<Utc>) -> AppResult<Option<ModerationNotice>> {
    let subject = event.subject_id.as_str();
    let actor = event.actor_id.as_str();
    let reason = event.reason.as_deref().unwrap_or(NO_REASON);

    let notice = match &event.kind {
        AuditActionKind::Kick => ModerationNotice::kick(subject, actor, reason),
        AuditActionKind::Ban => ModerationNotice::ban(subject, actor, reason),
        AuditActionKind::Unban => ModerationNotice::unban(subject, actor, reason),
        AuditActionKind::MemberUpdate => match event.timeout_change {
            None => return Ok(None),
            Some(TimeoutChange {
                new_expiry: Some(until),
            }) => {
                let remaining = (until - now).max(Duration::zero());
                ModerationNotice::timeout(subject, actor, reason, remaining)
            }
            Some(TimeoutChange { new_expiry: None }) => {
                ModerationNotice::timeout_removed(subject, actor, reason)
            }
        },
        AuditActionKind::Other(kind) => {
            return Err(AppError::UnexpectedState(format!(
                "Unsupported audit action: {kind}"
            )));
        }
    };
    Ok(Some(notice))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::{Delivery, RecordingDispatch, RecordingFaultReporter};
    use std::sync::Arc;

    fn reconciler() -> (
        ExternalActionReconciler,
        Arc<RecordingDispatch>,
        Arc<RecordingFaultReporter>,
    ) {
        let dispatch = Arc::new(RecordingDispatch::new());
        let faults = Arc::new(RecordingFaultReporter::new());
        let reconciler =
            ExternalActionReconciler::new("bot", "guild-1", dispatch.clone(), faults.clone());
        (reconciler, dispatch, faults)
    }

    fn event(kind: AuditActionKind, actor: &str) -> AuditEvent {
        AuditEvent {
            kind,
            subject_id: "user1".to_string(),
            actor_id: actor.to_string(),
            reason: None,
            timeout_change: None,
        }
    }

    #[tokio::test]
    async fn test_own_actions_are_ignored() {
        let (reconciler, dispatch, _) = reconciler();

        let outcome = reconciler
            .on_external_action(event(AuditActionKind::Ban, "bot"))
            .await;

        assert_eq!(outcome, ReconcileOutcome::SelfInitiated);
        assert!(dispatch.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_manual_ban_goes_to_log_only() {
        let (reconciler, dispatch, _) = reconciler();

        let outcome = reconciler
            .on_external_action(event(AuditActionKind::Ban, "mod7"))
            .await;

        assert_eq!(outcome, ReconcileOutcome::Notified(NoticeKind::Ban));
        let deliveries = dispatch.deliveries();
        assert_eq!(deliveries.len(), 1);
        let Delivery::Log(community, notice) = &deliveries[0] else {
            panic!("expected a moderation log delivery");
        };
        assert_eq!(community, "guild-1");
        assert_eq!(notice.field_value("Reason"), Some(NO_REASON));
        assert!(notice.field_value("Source").is_some());
        assert_eq!(notice.author_id, "mod7");
    }

    #[tokio::test]
    async fn test_timeout_duration_measured_from_now() {
        let (reconciler, dispatch, _) = reconciler();
        let now = Utc::now();
        let mut update = event(AuditActionKind::MemberUpdate, "mod7");
        update.reason = Some("Cool down".to_string());
        update.timeout_change = Some(TimeoutChange {
            new_expiry: Some(now + Duration::hours(3)),
        });

        let outcome = reconciler.reconcile(update, now).await;

        assert_eq!(outcome, ReconcileOutcome::Notified(NoticeKind::Timeout));
        let deliveries = dispatch.deliveries();
        let Delivery::Log(_, notice) = &deliveries[0] else {
            panic!("expected a moderation log delivery");
        };
        let end = DateTime::parse_from_rfc3339(notice.field_value("End").unwrap()).unwrap();
        assert!(end.with_timezone(&Utc) >= now + Duration::hours(3));
        assert_eq!(notice.field_value("Reason"), Some("Cool down"));
    }

    #[tokio::test]
    async fn test_past_expiry_clamps_to_zero() {
        let now = Utc::now();
        let mut update = event(AuditActionKind::MemberUpdate, "mod7");
        update.timeout_change = Some(TimeoutChange {
            new_expiry: Some(now - Duration::minutes(5)),
        });

        let notice = build_notice(&update, now).unwrap().unwrap();
        let end = DateTime::parse_from_rfc3339(notice.field_value("End").unwrap()).unwrap();

        assert!(end.with_timezone(&Utc) <= notice.timestamp);
    }

    #[tokio::test]
    async fn test_cleared_timeout_and_untouched_update() {
        let (reconciler, dispatch, _) = reconciler();
        let mut cleared = event(AuditActionKind::MemberUpdate, "mod7");
        cleared.timeout_change = Some(TimeoutChange { new_expiry: None });

        assert_eq!(
            reconciler.on_external_action(cleared).await,
            ReconcileOutcome::Notified(NoticeKind::TimeoutRemoved)
        );
        assert_eq!(
            reconciler
                .on_external_action(event(AuditActionKind::MemberUpdate, "mod7"))
                .await,
            ReconcileOutcome::NoRelevantChange
        );
        assert_eq!(dispatch.deliveries().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_action_is_captured() {
        let (reconciler, dispatch, faults) = reconciler();

        let outcome = reconciler
            .on_external_action(event(
                AuditActionKind::Other("channel_delete".to_string()),
                "mod7",
            ))
            .await;

        assert_eq!(outcome, ReconcileOutcome::Rejected);
        assert!(dispatch.deliveries().is_empty());
        assert_eq!(faults.codes(), vec![("reconciler", "UNEXPECTED_STATE")]);
    }

    #[test]
    fn test_audit_event_deserializes() {
        let event: AuditEvent = serde_json::from_value(serde_json::json!({
            "kind": "member_update",
            "subjectId": "user1",
            "actorId": "mod7",
            "timeoutChange": { "newExpiry": null }
        }))
        .unwrap();

        assert_eq!(event.kind, AuditActionKind::MemberUpdate);
        assert_eq!(event.timeout_change, Some(TimeoutChange { new_expiry: None }));

        let other: AuditEvent = serde_json::from_value(serde_json::json!({
            "kind": "role_update",
            "subjectId": "user1",
            "actorId": "mod7"
        }))
        .unwrap();
        assert_eq!(other.kind, AuditActionKind::Other("role_update".to_string()));
    }
}
