//! In-memory collaborators for tests and dry runs.
//!
//! Each fake records what it was asked to do and can be told to fail, so
//! tests can drive the moderation flow without a database or platform.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Barrier;
use warden_common::{
    AppError, AppResult, CommunitySettings, EnforcementThresholds, IdGenerator, SeverityWeights,
};
use warden_db::entities::infraction;

use crate::services::enforcement::{ActionKind, EnforcementActions};
use crate::services::fault::FaultReporter;
use crate::services::notification::{ModerationNotice, NoticeKind, NotificationDispatch};
use crate::services::store::{InfractionStore, NewInfraction};

/// How long an insert waits for the other parties of a rendezvous.
const RENDEZVOUS_WAIT: std::time::Duration = std::time::Duration::from_millis(500);

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Settings for a community `guild-1` logging to channel `log-1`.
#[must_use]
pub fn community_settings() -> CommunitySettings {
    CommunitySettings {
        community_id: "guild-1".to_string(),
        log_channel_id: "log-1".to_string(),
        ban_message: None,
        thresholds: EnforcementThresholds::default(),
        weights: SeverityWeights::default(),
    }
}

// ========== Store ==========

/// Infraction store kept in memory.
#[derive(Default)]
pub struct MemoryInfractionStore {
    rows: Mutex<Vec<infraction::Model>>,
    id_gen: IdGenerator,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    rendezvous: Mutex<Option<Arc<Barrier>>>,
}

impl MemoryInfractionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded infractions, discarded ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        guard(&self.rows).len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make inserts and discards fail with a database error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make lookups fail with a database error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Hold every insert after it is recorded until `parties` inserts are
    /// waiting, or until a short wait runs out.
    ///
    /// Concurrent warns then all append before any of them reads severity.
    pub fn rendezvous_inserts(&self, parties: usize) {
        *guard(&self.rendezvous) = Some(Arc::new(Barrier::new(parties)));
    }

    /// Move an infraction `days` into the past.
    pub fn backdate(&self, id: &str, days: i64) {
        for row in guard(&self.rows).iter_mut().filter(|r| r.id == id) {
            row.created_at -= Duration::days(days);
        }
    }

    fn check(&self, flag: &AtomicBool) -> AppResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(AppError::Database("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl InfractionStore for MemoryInfractionStore {
    async fn insert(&self, infraction: NewInfraction) -> AppResult<infraction::Model> {
        self.check(&self.fail_writes)?;
        let model = infraction::Model {
            id: self.id_gen.generate(),
            subject_id: infraction.subject_id,
            issuer_id: infraction.issuer_id,
            severity: infraction.severity,
            severity_weight: infraction.severity_weight,
            reason: infraction.reason,
            created_at: Utc::now().into(),
            discarded: false,
        };
        guard(&self.rows).push(model.clone());

        let rendezvous = guard(&self.rendezvous).clone();
        if let Some(barrier) = rendezvous {
            let _ = tokio::time::timeout(RENDEZVOUS_WAIT, barrier.wait()).await;
        }
        Ok(model)
    }

    async fn get_active(
        &self,
        subject_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<infraction::Model>> {
        self.check(&self.fail_reads)?;
        let mut active: Vec<_> = guard(&self.rows)
            .iter()
            .filter(|r| {
                r.subject_id == subject_id
                    && !r.discarded
                    && r.created_at.with_timezone(&Utc) >= since
            })
            .cloned()
            .collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(active)
    }

    async fn get_all(&self, subject_id: &str) -> AppResult<Vec<infraction::Model>> {
        self.check(&self.fail_reads)?;
        let mut all: Vec<_> = guard(&self.rows)
            .iter()
            .filter(|r| r.subject_id == subject_id)
            .cloned()
            .collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<infraction::Model>> {
        self.check(&self.fail_reads)?;
        Ok(guard(&self.rows).iter().find(|r| r.id == id).cloned())
    }

    async fn discard_by_id(&self, id: &str) -> AppResult<()> {
        self.check(&self.fail_writes)?;
        for row in guard(&self.rows).iter_mut().filter(|r| r.id == id) {
            row.discarded = true;
        }
        Ok(())
    }

    async fn discard_all_by_subject(&self, subject_id: &str) -> AppResult<()> {
        self.check(&self.fail_writes)?;
        for row in guard(&self.rows)
            .iter_mut()
            .filter(|r| r.subject_id == subject_id)
        {
            row.discarded = true;
        }
        Ok(())
    }
}

// ========== Enforcement ==========

/// A platform call seen by [`RecordingEnforcement`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum EnforcementCall {
    Timeout { subject_id: String, hours: i64 },
    RemoveTimeout { subject_id: String },
    Ban { subject_id: String, history_days: u32 },
    Unban { subject_id: String },
    Kick { subject_id: String },
}

/// Enforcement backend that records accepted calls.
#[derive(Default)]
pub struct RecordingEnforcement {
    calls: Mutex<Vec<EnforcementCall>>,
    banned: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<ActionKind>>,
}

impl RecordingEnforcement {
    /// Create a backend that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls the platform accepted, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<EnforcementCall> {
        guard(&self.calls).clone()
    }

    /// Reject every future call of this kind.
    pub fn fail(&self, action: ActionKind) {
        guard(&self.failing).insert(action);
    }

    /// Put a user on the ban list.
    pub fn mark_banned(&self, subject_id: &str) {
        guard(&self.banned).insert(subject_id.to_string());
    }

    fn accept(&self, action: ActionKind, call: EnforcementCall) -> AppResult<()> {
        if guard(&self.failing).contains(&action) {
            return Err(AppError::RemoteAction(format!("{action} rejected")));
        }
        guard(&self.calls).push(call);
        Ok(())
    }
}

#[async_trait]
impl EnforcementActions for RecordingEnforcement {
    async fn timeout_user(
        &self,
        subject_id: &str,
        duration: Duration,
        _reason: &str,
    ) -> AppResult<()> {
        self.accept(
            ActionKind::Timeout,
            EnforcementCall::Timeout {
                subject_id: subject_id.to_string(),
                hours: duration.num_hours(),
            },
        )
    }

    async fn remove_timeout(&self, subject_id: &str) -> AppResult<()> {
        self.accept(
            ActionKind::RemoveTimeout,
            EnforcementCall::RemoveTimeout {
                subject_id: subject_id.to_string(),
            },
        )
    }

    async fn ban_user(
        &self,
        subject_id: &str,
        _reason: &str,
        history_deletion_days: u32,
    ) -> AppResult<()> {
        self.accept(
            ActionKind::Ban,
            EnforcementCall::Ban {
                subject_id: subject_id.to_string(),
                history_days: history_deletion_days,
            },
        )?;
        guard(&self.banned).insert(subject_id.to_string());
        Ok(())
    }

    async fn unban_user(&self, subject_id: &str, _reason: &str) -> AppResult<()> {
        self.accept(
            ActionKind::Unban,
            EnforcementCall::Unban {
                subject_id: subject_id.to_string(),
            },
        )?;
        guard(&self.banned).remove(subject_id);
        Ok(())
    }

    async fn kick_user(&self, subject_id: &str, _reason: &str) -> AppResult<()> {
        self.accept(
            ActionKind::Kick,
            EnforcementCall::Kick {
                subject_id: subject_id.to_string(),
            },
        )
    }

    async fn is_currently_banned(&self, subject_id: &str) -> AppResult<bool> {
        Ok(guard(&self.banned).contains(subject_id))
    }
}

// ========== Dispatch ==========

/// A notice handed to [`RecordingDispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Sent to a user directly.
    Direct(String, ModerationNotice),
    /// Sent to a community's moderation log.
    Log(String, ModerationNotice),
    /// Echoed into a channel.
    Channel(String, ModerationNotice),
}

/// Notification backend that records deliveries.
#[derive(Default)]
pub struct RecordingDispatch {
    deliveries: Mutex<Vec<Delivery>>,
    fail_direct: AtomicBool,
}

impl RecordingDispatch {
    /// Create a backend that delivers everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful deliveries, in order.
    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivery> {
        guard(&self.deliveries).clone()
    }

    /// Kinds of the notices that reached the moderation log, in order.
    #[must_use]
    pub fn log_kinds(&self) -> Vec<NoticeKind> {
        guard(&self.deliveries)
            .iter()
            .filter_map(|d| match d {
                Delivery::Log(_, notice) => Some(notice.kind),
                _ => None,
            })
            .collect()
    }

    /// Make direct messages fail, as if the user blocked them.
    pub fn fail_direct(&self, fail: bool) {
        self.fail_direct.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationDispatch for RecordingDispatch {
    async fn send_direct(&self, user_id: &str, notice: &ModerationNotice) -> AppResult<()> {
        if self.fail_direct.load(Ordering::SeqCst) {
            return Err(AppError::Notification(format!(
                "{user_id} does not accept direct messages"
            )));
        }
        guard(&self.deliveries).push(Delivery::Direct(user_id.to_string(), notice.clone()));
        Ok(())
    }

    async fn send_to_moderation_log(
        &self,
        community_id: &str,
        notice: &ModerationNotice,
    ) -> AppResult<()> {
        guard(&self.deliveries).push(Delivery::Log(community_id.to_string(), notice.clone()));
        Ok(())
    }

    async fn send_to_channel(&self, channel_id: &str, notice: &ModerationNotice) -> AppResult<()> {
        guard(&self.deliveries).push(Delivery::Channel(channel_id.to_string(), notice.clone()));
        Ok(())
    }
}

// ========== Faults ==========

/// Fault reporter that keeps every captured fault.
#[derive(Default)]
pub struct RecordingFaultReporter {
    captured: Mutex<Vec<(&'static str, &'static str)>>,
}

impl RecordingFaultReporter {
    /// Create an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `(component, error code)` of every captured fault, in order.
    #[must_use]
    pub fn codes(&self) -> Vec<(&'static str, &'static str)> {
        guard(&self.captured).clone()
    }
}

impl FaultReporter for RecordingFaultReporter {
    fn capture(&self, component: &'static str, fault: &AppError) {
        guard(&self.captured).push((component, fault.error_code()));
    }
}
