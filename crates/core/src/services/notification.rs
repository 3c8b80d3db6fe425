//! Moderation notices and their delivery.
//!
//! A [`ModerationNotice`] is the platform-neutral payload of one moderation
//! message. Rendering it (embeds, colours, mentions) and delivering it is
//! the job of a [`NotificationDispatch`] implementation outside this crate.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use warden_common::AppResult;
use warden_db::entities::infraction::{self, SeverityClass};

/// Placeholder used when an action carries no reason.
pub const NO_REASON: &str = "<no reason provided>";

const MANUAL_SOURCE: &str = "This action was executed manually without a bot command.";

/// What a notice is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    WarnAdded,
    WarnsCleared,
    WarnCleared,
    Timeout,
    TimeoutRemoved,
    Ban,
    Unban,
    Kick,
}

/// Visual tone a renderer should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeTone {
    Warning,
    Error,
    Success,
}

/// One labelled value of a notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoticeField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Rendered-independent content of one moderation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModerationNotice {
    pub kind: NoticeKind,
    pub title: String,
    pub tone: NoticeTone,
    /// Moderator the notice is attributed to.
    pub author_id: String,
    /// User the action was taken against.
    pub subject_id: String,
    pub description: Option<String>,
    pub fields: Vec<NoticeField>,
    /// Plain text sent alongside the notice.
    pub content: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ModerationNotice {
    fn new(
        kind: NoticeKind,
        title: impl Into<String>,
        tone: NoticeTone,
        author_id: &str,
        subject_id: &str,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            tone,
            author_id: author_id.to_string(),
            subject_id: subject_id.to_string(),
            description: None,
            fields: Vec::new(),
            content: None,
            timestamp: Utc::now(),
        }
    }

    /// Standard member/moderator/reason layout shared by most actions.
    fn moderation(
        kind: NoticeKind,
        title: &str,
        tone: NoticeTone,
        subject_id: &str,
        moderator_id: &str,
        reason: &str,
    ) -> Self {
        Self::new(kind, title, tone, moderator_id, subject_id)
            .field("Member", subject_id, true)
            .field("Moderator", moderator_id, true)
            .field("Reason", reason, true)
    }

    fn field(mut self, name: &str, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(NoticeField {
            name: name.to_string(),
            value: value.into(),
            inline,
        });
        self
    }

    /// Notice for a newly recorded warn.
    #[must_use]
    pub fn warn_added(
        subject_id: &str,
        issuer_id: &str,
        severity: SeverityClass,
        weight: i32,
        total_severity: i64,
        ban_threshold: i64,
        reason: &str,
    ) -> Self {
        Self::moderation(
            NoticeKind::WarnAdded,
            &format!("Warn Added ({total_severity}/{ban_threshold})"),
            NoticeTone::Warning,
            subject_id,
            issuer_id,
            reason,
        )
        .field("Severity", format!("`{severity} ({weight})`"), true)
    }

    /// Notice for clearing every warn of a user.
    #[must_use]
    pub fn warns_cleared(subject_id: &str, cleared_by: &str) -> Self {
        let mut notice = Self::new(
            NoticeKind::WarnsCleared,
            "Warns Cleared",
            NoticeTone::Warning,
            cleared_by,
            subject_id,
        );
        notice.description = Some(format!(
            "All warns have been cleared from {subject_id}'s record."
        ));
        notice
    }

    /// Notice for clearing a single warn.
    #[must_use]
    pub fn warn_cleared(warn: &infraction::Model, cleared_by: &str) -> Self {
        let mut notice = Self::new(
            NoticeKind::WarnCleared,
            "Warn Cleared",
            NoticeTone::Warning,
            cleared_by,
            &warn.subject_id,
        );
        notice.description = Some(format!(
            "Cleared the following warn from {}'s record:\n\n`{}` {}\nWarned by: {}\nSeverity: `{} ({})`\nReason: {}",
            warn.subject_id,
            warn.id,
            warn.created_at.to_rfc3339(),
            warn.issuer_id,
            warn.severity,
            warn.severity_weight,
            warn.reason,
        ));
        notice
    }

    /// Notice for a timeout lasting `duration` from now.
    #[must_use]
    pub fn timeout(subject_id: &str, moderator_id: &str, reason: &str, duration: Duration) -> Self {
        let notice = Self::moderation(
            NoticeKind::Timeout,
            "Timeout",
            NoticeTone::Error,
            subject_id,
            moderator_id,
            reason,
        );
        let ends_at = notice.timestamp + duration;
        notice.field("End", ends_at.to_rfc3339(), true)
    }

    /// Notice for lifting a timeout.
    #[must_use]
    pub fn timeout_removed(subject_id: &str, moderator_id: &str, reason: &str) -> Self {
        Self::moderation(
            NoticeKind::TimeoutRemoved,
            "Timeout Removed",
            NoticeTone::Success,
            subject_id,
            moderator_id,
            reason,
        )
    }

    /// Notice for a ban.
    #[must_use]
    pub fn ban(subject_id: &str, moderator_id: &str, reason: &str) -> Self {
        Self::moderation(
            NoticeKind::Ban,
            "Ban",
            NoticeTone::Error,
            subject_id,
            moderator_id,
            reason,
        )
    }

    /// Notice for a kick.
    #[must_use]
    pub fn kick(subject_id: &str, moderator_id: &str, reason: &str) -> Self {
        Self::moderation(
            NoticeKind::Kick,
            "Kick",
            NoticeTone::Error,
            subject_id,
            moderator_id,
            reason,
        )
    }

    /// Notice for a revoked ban.
    #[must_use]
    pub fn unban(subject_id: &str, moderator_id: &str, reason: &str) -> Self {
        Self::new(
            NoticeKind::Unban,
            "Ban Revoked",
            NoticeTone::Error,
            moderator_id,
            subject_id,
        )
        .field("Moderator", moderator_id, true)
        .field("Reason", reason, true)
        .field("User Id", format!("```{subject_id}```"), false)
    }

    /// Mark the notice as describing an action taken outside the bot.
    #[must_use]
    pub fn with_manual_source(self) -> Self {
        self.field("Source", MANUAL_SOURCE, false)
    }

    /// Attach plain text content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Look up a field value by name.
    #[must_use]
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

/// Trait for delivering moderation notices.
///
/// Delivery failures are never fatal to the action that produced the notice.
#[async_trait]
pub trait NotificationDispatch: Send + Sync {
    /// Send a notice to the affected user directly.
    async fn send_direct(&self, user_id: &str, notice: &ModerationNotice) -> AppResult<()>;

    /// Send a notice to the moderation log of a community.
    async fn send_to_moderation_log(
        &self,
        community_id: &str,
        notice: &ModerationNotice,
    ) -> AppResult<()>;

    /// Echo a notice into the channel where the action was invoked.
    async fn send_to_channel(&self, channel_id: &str, notice: &ModerationNotice) -> AppResult<()>;
}

/// A no-op implementation of `NotificationDispatch` for when delivery is disabled.
#[derive(Clone, Default)]
pub struct NoOpDispatch;

#[async_trait]
impl NotificationDispatch for NoOpDispatch {
    async fn send_direct(&self, _user_id: &str, _notice: &ModerationNotice) -> AppResult<()> {
        Ok(())
    }

    async fn send_to_moderation_log(
        &self,
        _community_id: &str,
        _notice: &ModerationNotice,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn send_to_channel(
        &self,
        _channel_id: &str,
        _notice: &ModerationNotice,
    ) -> AppResult<()> {
        Ok(())
    }
}

/// Shared handle to the notification backend.
pub type DispatchService = Arc<dyn NotificationDispatch>;
