//! Platform enforcement actions.
//!
//! Provides an abstraction over the platform calls that time out, ban,
//! unban and kick members. The actual implementation talks to the chat
//! platform and lives outside this crate.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use warden_common::AppResult;

/// Days of message history removed when a user is banned.
pub const BAN_HISTORY_DELETION_DAYS: u32 = 7;

/// Kind of moderation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Warn,
    Timeout,
    RemoveTimeout,
    Ban,
    Unban,
    Kick,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Warn => "warn",
            Self::Timeout => "timeout",
            Self::RemoveTimeout => "remove_timeout",
            Self::Ban => "ban",
            Self::Unban => "unban",
            Self::Kick => "kick",
        };
        f.write_str(name)
    }
}

/// Record of one enforcement decision that was carried out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnforcementEvent {
    pub subject_id: String,
    pub issuer_id: String,
    pub action: ActionKind,
    pub reason: String,
    pub quiet: bool,
    pub timestamp: DateTime<Utc>,
}

impl EnforcementEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn now(
        subject_id: &str,
        issuer_id: &str,
        action: ActionKind,
        reason: &str,
        quiet: bool,
    ) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            issuer_id: issuer_id.to_string(),
            action,
            reason: reason.to_string(),
            quiet,
            timestamp: Utc::now(),
        }
    }
}

/// Trait for platform-side enforcement.
///
/// Every call is a remote operation that may be rejected (for example for
/// missing permissions); failures are reported as `AppError::RemoteAction`.
#[async_trait]
pub trait EnforcementActions: Send + Sync {
    /// Prevent a member from communicating for `duration`.
    async fn timeout_user(&self, subject_id: &str, duration: Duration, reason: &str)
    -> AppResult<()>;

    /// Lift an active timeout.
    async fn remove_timeout(&self, subject_id: &str) -> AppResult<()>;

    /// Ban a user, deleting `history_deletion_days` of their messages.
    async fn ban_user(
        &self,
        subject_id: &str,
        reason: &str,
        history_deletion_days: u32,
    ) -> AppResult<()>;

    /// Revoke a ban.
    async fn unban_user(&self, subject_id: &str, reason: &str) -> AppResult<()>;

    /// Remove a member from the community.
    async fn kick_user(&self, subject_id: &str, reason: &str) -> AppResult<()>;

    /// Whether the user is currently on the ban list.
    async fn is_currently_banned(&self, subject_id: &str) -> AppResult<bool>;
}

/// A no-op implementation of `EnforcementActions` for dry runs.
#[derive(Clone, Default)]
pub struct NoOpEnforcement;

#[async_trait]
impl EnforcementActions for NoOpEnforcement {
    async fn timeout_user(
        &self,
        _subject_id: &str,
        _duration: Duration,
        _reason: &str,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn remove_timeout(&self, _subject_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn ban_user(
        &self,
        _subject_id: &str,
        _reason: &str,
        _history_deletion_days: u32,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn unban_user(&self, _subject_id: &str, _reason: &str) -> AppResult<()> {
        Ok(())
    }

    async fn kick_user(&self, _subject_id: &str, _reason: &str) -> AppResult<()> {
        Ok(())
    }

    async fn is_currently_banned(&self, _subject_id: &str) -> AppResult<bool> {
        Ok(false)
    }
}

/// Shared handle to the enforcement backend.
pub type EnforcementService = Arc<dyn EnforcementActions>;
