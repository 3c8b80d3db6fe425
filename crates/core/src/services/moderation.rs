//! Moderation service: warns, automatic escalation and enforcement actions.
//!
//! Every enforcement call is issued first; its notices are only delivered
//! once the platform accepted the action. Notice delivery never aborts or
//! reverses an action, and failed platform calls are captured as faults
//! without being retried.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;
use warden_common::{AppError, AppResult, CommunitySettings, ConsistencyMode};
use warden_db::entities::infraction::{self, SeverityClass};

use super::enforcement::{
    ActionKind, BAN_HISTORY_DELETION_DAYS, EnforcementEvent, EnforcementService,
};
use super::escalation::EscalationDecision;
use super::fault::FaultService;
use super::notification::{DispatchService, ModerationNotice};
use super::severity::{SeverityResult, compute_severity, weight_of};
use super::store::{InfractionStoreService, NewInfraction};
use super::subject_lock::SubjectLocks;

const COMPONENT: &str = "moderation";

/// Reason recorded on timeouts and bans triggered by accumulated warns.
pub const ESCALATION_REASON: &str = "Too many warns";

/// Input for issuing a warn.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WarnInput {
    pub subject_id: String,
    pub issuer_id: String,
    pub severity: SeverityClass,
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
    /// Channel the warn was issued from.
    pub channel_id: String,
    /// Suppress the echo into `channel_id`.
    #[serde(default)]
    pub quiet: bool,
}

/// Input shared by timeout, ban, unban, kick and timeout removal.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActionInput {
    pub subject_id: String,
    pub issuer_id: String,
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
    pub channel_id: String,
    #[serde(default)]
    pub quiet: bool,
}

/// Result of a processed warn.
#[derive(Debug, Clone)]
pub struct WarnOutcome {
    /// The recorded infraction.
    pub infraction: infraction::Model,
    /// Severity snapshot read right after recording it.
    pub severity: SeverityResult,
    /// Escalation decided from that snapshot.
    pub decision: EscalationDecision,
    /// The warn itself followed by every escalation the platform accepted.
    pub events: Vec<EnforcementEvent>,
}

/// Moderation service for one community.
#[derive(Clone)]
pub struct ModerationService {
    settings: Arc<CommunitySettings>,
    store: InfractionStoreService,
    actions: EnforcementService,
    dispatch: DispatchService,
    faults: FaultService,
    consistency: ConsistencyMode,
    locks: SubjectLocks,
}

impl ModerationService {
    /// Create a new moderation service.
    #[must_use]
    pub fn new(
        settings: CommunitySettings,
        store: InfractionStoreService,
        actions: EnforcementService,
        dispatch: DispatchService,
        faults: FaultService,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            store,
            actions,
            dispatch,
            faults,
            consistency: ConsistencyMode::Relaxed,
            locks: SubjectLocks::new(),
        }
    }

    /// Choose how concurrent warns for the same subject are ordered.
    #[must_use]
    pub fn with_consistency(mut self, consistency: ConsistencyMode) -> Self {
        self.consistency = consistency;
        self
    }

    /// Settings of the community this service moderates.
    #[must_use]
    pub fn settings(&self) -> &CommunitySettings {
        &self.settings
    }

    /// Fault reporter used by this service.
    #[must_use]
    pub fn fault_reporter(&self) -> FaultService {
        self.faults.clone()
    }

    // ========== Warns ==========

    /// Record a warn and escalate if it pushed the subject over a threshold.
    ///
    /// The infraction is recorded before severity is read, and escalation is
    /// decided from that single snapshot before any notice goes out. A
    /// failed timeout or ban leaves the warn recorded.
    pub async fn warn(&self, input: WarnInput) -> AppResult<WarnOutcome> {
        input.validate()?;
        let thresholds = self.settings.thresholds;
        let weight = weight_of(input.severity, &self.settings.weights);

        let guard = match self.consistency {
            ConsistencyMode::PerSubject => Some(self.locks.lock(&input.subject_id).await),
            ConsistencyMode::Relaxed => None,
        };

        let infraction = self
            .store
            .insert(NewInfraction {
                subject_id: input.subject_id.clone(),
                issuer_id: input.issuer_id.clone(),
                severity: input.severity,
                severity_weight: weight,
                reason: input.reason.clone(),
            })
            .await
            .inspect_err(|e| self.faults.capture(COMPONENT, e))?;

        let severity = self
            .current_severity(&input.subject_id)
            .await
            .inspect_err(|e| self.faults.capture(COMPONENT, e))?;

        let decision =
            EscalationDecision::evaluate(&thresholds, severity.total_severity, i64::from(weight));
        drop(guard);

        tracing::info!(
            subject_id = %input.subject_id,
            issuer_id = %input.issuer_id,
            infraction_id = %infraction.id,
            severity = %input.severity,
            total_severity = severity.total_severity,
            timeout = decision.timeout,
            ban = decision.ban,
            "Warn recorded"
        );

        let notice = ModerationNotice::warn_added(
            &input.subject_id,
            &input.issuer_id,
            input.severity,
            weight,
            severity.total_severity,
            thresholds.ban_threshold,
            &input.reason,
        );
        self.notify_subject(&input.subject_id, &notice).await;
        self.notify_log(&notice).await;
        self.echo(&input.channel_id, input.quiet, &notice).await;

        let mut events = vec![EnforcementEvent::now(
            &input.subject_id,
            &input.issuer_id,
            ActionKind::Warn,
            &input.reason,
            input.quiet,
        )];

        let escalation = ActionInput {
            subject_id: input.subject_id.clone(),
            issuer_id: input.issuer_id.clone(),
            reason: ESCALATION_REASON.to_string(),
            channel_id: input.channel_id.clone(),
            quiet: input.quiet,
        };
        if decision.timeout {
            match Duration::try_hours(thresholds.timeout_duration_hours) {
                Some(duration) => {
                    if let Ok(event) = self.timeout(escalation.clone(), duration).await {
                        events.push(event);
                    }
                }
                None => self.faults.capture(
                    COMPONENT,
                    &AppError::Config(format!(
                        "timeout_duration_hours {} is out of range",
                        thresholds.timeout_duration_hours
                    )),
                ),
            }
        }
        // a ban also ends any timeout, but both notices are kept for the audit trail
        if decision.ban {
            if let Ok(event) = self.ban(escalation).await {
                events.push(event);
            }
        }

        Ok(WarnOutcome {
            infraction,
            severity,
            decision,
            events,
        })
    }

    /// Discard every warn of a subject.
    ///
    /// Timeouts and bans that were already applied stay in place.
    pub async fn discard_all(&self, subject_id: &str, issuer_id: &str) -> AppResult<()> {
        self.store
            .discard_all_by_subject(subject_id)
            .await
            .inspect_err(|e| self.faults.capture(COMPONENT, e))?;

        tracing::info!(subject_id = %subject_id, issuer_id = %issuer_id, "Warns cleared");

        let notice = ModerationNotice::warns_cleared(subject_id, issuer_id);
        self.notify_subject(subject_id, &notice).await;
        self.notify_log(&notice).await;
        Ok(())
    }

    /// Discard one warn by ID. Returns whether such a warn exists.
    pub async fn discard_one(&self, infraction_id: &str, issuer_id: &str) -> bool {
        let warn = match self.store.find_by_id(infraction_id).await {
            Ok(Some(warn)) => warn,
            Ok(None) => return false,
            Err(e) => {
                self.faults.capture(COMPONENT, &e);
                return false;
            }
        };

        if let Err(e) = self.store.discard_by_id(&warn.id).await {
            self.faults.capture(COMPONENT, &e);
            return false;
        }

        tracing::info!(
            infraction_id = %warn.id,
            subject_id = %warn.subject_id,
            issuer_id = %issuer_id,
            "Warn cleared"
        );

        self.notify_log(&ModerationNotice::warn_cleared(&warn, issuer_id))
            .await;
        true
    }

    /// Current severity of a subject. Degrades to zero if the store is unavailable.
    pub async fn get_severity(&self, subject_id: &str) -> SeverityResult {
        self.current_severity(subject_id).await.unwrap_or_else(|e| {
            self.faults.capture(COMPONENT, &e);
            SeverityResult::empty()
        })
    }

    /// Active warns of a subject inside the validity window, oldest first.
    pub async fn get_warns(&self, subject_id: &str) -> Vec<infraction::Model> {
        let active = match self.window_start(Utc::now()) {
            Ok(since) => self.store.get_active(subject_id, since).await,
            Err(e) => Err(e),
        };
        active.unwrap_or_else(|e| {
            self.faults.capture(COMPONENT, &e);
            Vec::new()
        })
    }

    /// Full warn history of a subject, including discarded warns.
    pub async fn get_all_warns(&self, subject_id: &str) -> Vec<infraction::Model> {
        self.store.get_all(subject_id).await.unwrap_or_else(|e| {
            self.faults.capture(COMPONENT, &e);
            Vec::new()
        })
    }

    async fn current_severity(&self, subject_id: &str) -> AppResult<SeverityResult> {
        let now = Utc::now();
        let thresholds = &self.settings.thresholds;
        let since = self.window_start(now)?;
        let active = self.store.get_active(subject_id, since).await?;
        Ok(compute_severity(now, thresholds, &active))
    }

    /// Oldest creation time still inside the validity window.
    fn window_start(&self, now: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
        let days = self.settings.thresholds.validity_window_days;
        Duration::try_days(days)
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| {
                AppError::Config(format!("validity_window_days {days} is out of range"))
            })
    }

    // ========== Enforcement ==========

    /// Time out a member.
    pub async fn timeout(
        &self,
        input: ActionInput,
        duration: Duration,
    ) -> AppResult<EnforcementEvent> {
        input.validate()?;
        let notice =
            ModerationNotice::timeout(&input.subject_id, &input.issuer_id, &input.reason, duration);

        self.actions
            .timeout_user(&input.subject_id, duration, &input.reason)
            .await
            .inspect_err(|e| self.faults.capture(COMPONENT, e))?;

        tracing::info!(
            subject_id = %input.subject_id,
            issuer_id = %input.issuer_id,
            minutes = duration.num_minutes(),
            "Member timed out"
        );

        self.notify_subject(&input.subject_id, &notice).await;
        self.notify_log(&notice).await;
        self.echo(&input.channel_id, input.quiet, &notice).await;
        Ok(self.event(&input, ActionKind::Timeout))
    }

    /// Lift a member's timeout.
    pub async fn remove_timeout(&self, input: ActionInput) -> AppResult<EnforcementEvent> {
        input.validate()?;
        let notice =
            ModerationNotice::timeout_removed(&input.subject_id, &input.issuer_id, &input.reason);

        self.actions
            .remove_timeout(&input.subject_id)
            .await
            .inspect_err(|e| self.faults.capture(COMPONENT, e))?;

        tracing::info!(
            subject_id = %input.subject_id,
            issuer_id = %input.issuer_id,
            "Timeout removed"
        );

        self.notify_subject(&input.subject_id, &notice).await;
        self.notify_log(&notice).await;
        self.echo(&input.channel_id, input.quiet, &notice).await;
        Ok(self.event(&input, ActionKind::RemoveTimeout))
    }

    /// Ban a user.
    ///
    /// The direct notice goes out first, while the user can still receive
    /// it. The ban proceeds whether or not that delivery worked.
    pub async fn ban(&self, input: ActionInput) -> AppResult<EnforcementEvent> {
        input.validate()?;
        let notice = ModerationNotice::ban(&input.subject_id, &input.issuer_id, &input.reason);
        let direct = match &self.settings.ban_message {
            Some(text) => notice.clone().with_content(text.clone()),
            None => notice.clone(),
        };
        self.notify_subject(&input.subject_id, &direct).await;

        self.actions
            .ban_user(&input.subject_id, &input.reason, BAN_HISTORY_DELETION_DAYS)
            .await
            .inspect_err(|e| self.faults.capture(COMPONENT, e))?;

        tracing::info!(
            subject_id = %input.subject_id,
            issuer_id = %input.issuer_id,
            "User banned"
        );

        self.notify_log(&notice).await;
        self.echo(&input.channel_id, input.quiet, &notice).await;
        Ok(self.event(&input, ActionKind::Ban))
    }

    /// Revoke a ban. Returns `None` if the user was not banned.
    pub async fn unban(&self, input: ActionInput) -> AppResult<Option<EnforcementEvent>> {
        input.validate()?;
        let banned = self
            .actions
            .is_currently_banned(&input.subject_id)
            .await
            .inspect_err(|e| self.faults.capture(COMPONENT, e))?;
        if !banned {
            return Ok(None);
        }

        let notice = ModerationNotice::unban(&input.subject_id, &input.issuer_id, &input.reason);
        self.actions
            .unban_user(&input.subject_id, &input.reason)
            .await
            .inspect_err(|e| self.faults.capture(COMPONENT, e))?;

        tracing::info!(
            subject_id = %input.subject_id,
            issuer_id = %input.issuer_id,
            "User unbanned"
        );

        self.notify_log(&notice).await;
        self.echo(&input.channel_id, input.quiet, &notice).await;
        Ok(Some(self.event(&input, ActionKind::Unban)))
    }

    /// Kick a member.
    pub async fn kick(&self, input: ActionInput) -> AppResult<EnforcementEvent> {
        input.validate()?;
        let notice = ModerationNotice::kick(&input.subject_id, &input.issuer_id, &input.reason);

        self.actions
            .kick_user(&input.subject_id, &input.reason)
            .await
            .inspect_err(|e| self.faults.capture(COMPONENT, e))?;

        tracing::info!(
            subject_id = %input.subject_id,
            issuer_id = %input.issuer_id,
            "Member kicked"
        );

        self.notify_subject(&input.subject_id, &notice).await;
        self.notify_log(&notice).await;
        self.echo(&input.channel_id, input.quiet, &notice).await;
        Ok(self.event(&input, ActionKind::Kick))
    }

    // ========== Delivery ==========

    fn event(&self, input: &ActionInput, action: ActionKind) -> EnforcementEvent {
        EnforcementEvent::now(
            &input.subject_id,
            &input.issuer_id,
            action,
            &input.reason,
            input.quiet,
        )
    }

    async fn notify_subject(&self, subject_id: &str, notice: &ModerationNotice) {
        if let Err(e) = self.dispatch.send_direct(subject_id, notice).await {
            tracing::warn!(
                subject_id = %subject_id,
                kind = ?notice.kind,
                error = %e,
                "Failed to deliver direct notice"
            );
        }
    }

    async fn notify_log(&self, notice: &ModerationNotice) {
        if let Err(e) = self
            .dispatch
            .send_to_moderation_log(&self.settings.community_id, notice)
            .await
        {
            tracing::warn!(
                community_id = %self.settings.community_id,
                kind = ?notice.kind,
                error = %e,
                "Failed to deliver moderation log notice"
            );
        }
    }

    /// Echo into the invoking channel unless quiet or that channel is the log itself.
    async fn echo(&self, channel_id: &str, quiet: bool, notice: &ModerationNotice) {
        if quiet || channel_id == self.settings.log_channel_id {
            return;
        }
        if let Err(e) = self.dispatch.send_to_channel(channel_id, notice).await {
            tracing::warn!(
                channel_id = %channel_id,
                kind = ?notice.kind,
                error = %e,
                "Failed to echo notice"
            );
        }
    }
}
