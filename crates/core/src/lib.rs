//! Moderation core for warden.
//!
//! Records warns, derives each user's decayed severity, escalates to
//! timeouts and bans when thresholds are crossed, and mirrors moderation
//! actions taken outside the bot into the moderation log.
//!
//! Platform calls, notice delivery and fault reporting sit behind traits
//! ([`EnforcementActions`], [`NotificationDispatch`], [`FaultReporter`]) so
//! the chat platform adapter lives outside this crate.

pub mod services;
pub mod test_utils;

pub use services::*;
