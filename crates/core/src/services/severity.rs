//! Severity ledger.
//!
//! Turns a user's active infraction history into the current decayed
//! aggregate severity. Decay is evaluated lazily from wall-clock time at
//! read; nothing is ever recomputed in the background.
//!
//! For every prefix `[0..=i]` of the oldest-first history the candidate
//! severity is the prefix weight minus `decay_amount` for every full
//! `decay_interval_days` elapsed since infraction `i` was issued. The
//! largest positive candidate wins. Prefixes that decay to zero or below
//! never win, so infractions too old to matter drop out and the running
//! total never goes negative.

use chrono::{DateTime, Utc};
use serde::Serialize;
use warden_common::{EnforcementThresholds, SeverityWeights};
use warden_db::entities::infraction::{self, SeverityClass};

/// Aggregate severity of one user at one instant. Always derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SeverityResult {
    /// Current decayed severity, never negative.
    pub total_severity: i64,
    /// Decay subtracted from the winning prefix.
    pub applied_decay: i64,
    /// Oldest-first infractions that produced `total_severity`.
    pub contributing: Vec<infraction::Model>,
}

impl SeverityResult {
    /// Zero severity with no contributing infractions.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Weight assigned to a severity tier.
#[must_use]
pub const fn weight_of(class: SeverityClass, weights: &SeverityWeights) -> i32 {
    match class {
        SeverityClass::Low => weights.low,
        SeverityClass::Medium => weights.medium,
        SeverityClass::High => weights.high,
    }
}

/// Compute the severity of a user as of `as_of`.
///
/// `active` must already be restricted to non-discarded infractions inside
/// the validity window and sorted oldest first; the store query guarantees
/// this.
#[must_use]
pub fn compute_severity(
    as_of: DateTime<Utc>,
    thresholds: &EnforcementThresholds,
    active: &[infraction::Model],
) -> SeverityResult {
    let mut prefix_weight = 0_i64;
    let mut best = 0_i64;
    let mut best_decay = 0_i64;
    let mut best_len = 0_usize;

    for (i, infraction) in active.iter().enumerate() {
        prefix_weight = prefix_weight.saturating_add(i64::from(infraction.severity_weight));
        let discount = decay_discount(as_of, infraction, thresholds);
        let candidate = prefix_weight.saturating_sub(discount);
        if candidate > best {
            best = candidate;
            best_decay = discount;
            best_len = i + 1;
        }
    }

    SeverityResult {
        total_severity: best,
        applied_decay: best_decay,
        contributing: active[..best_len].to_vec(),
    }
}

fn decay_discount(
    as_of: DateTime<Utc>,
    infraction: &infraction::Model,
    thresholds: &EnforcementThresholds,
) -> i64 {
    if thresholds.decay_interval_days <= 0 {
        return 0;
    }
    let age_days = as_of
        .signed_duration_since(infraction.created_at)
        .num_days()
        .max(0);
    thresholds
        .decay_amount
        .saturating_mul(age_days / thresholds.decay_interval_days)
}
