//! Escalation rules applied after a warn.

use warden_common::EnforcementThresholds;

/// Whether adding `weight` is exactly what pushed `total` over `threshold`.
///
/// True only for the warn that crosses the line; later warns that keep the
/// user above it do not fire again.
#[must_use]
pub const fn crossed(threshold: i64, total: i64, weight: i64) -> bool {
    total > threshold && total - weight <= threshold
}

/// Enforcement triggered by one warn, decided from a single severity snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EscalationDecision {
    /// The warn crossed the timeout threshold.
    pub timeout: bool,
    /// Severity is above the ban threshold.
    pub ban: bool,
}

impl EscalationDecision {
    /// Decide escalation for a warn of `weight` that left the user at `total`.
    ///
    /// Both checks read the same `total`, so one warn can trigger a timeout
    /// and a ban together.
    #[must_use]
    pub const fn evaluate(thresholds: &EnforcementThresholds, total: i64, weight: i64) -> Self {
        Self {
            timeout: crossed(thresholds.timeout_threshold, total, weight),
            ban: total > thresholds.ban_threshold,
        }
    }

    /// Whether any enforcement action follows.
    #[must_use]
    pub const fn escalates(&self) -> bool {
        self.timeout || self.ban
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> EnforcementThresholds {
        EnforcementThresholds {
            timeout_threshold: 10,
            ban_threshold: 15,
            ..EnforcementThresholds::default()
        }
    }

    #[test]
    fn test_crossing_fires_once() {
        // existing severity 8, MEDIUM (5) brings it to 13
        assert!(crossed(10, 13, 5));
        // a following LOW (3) brings it to 16; already above the line
        assert!(!crossed(10, 16, 3));
    }

    #[test]
    fn test_crossing_boundaries() {
        // landing exactly on the threshold is not above it
        assert!(!crossed(10, 10, 5));
        // starting exactly on the threshold still counts as crossing
        assert!(crossed(10, 11, 1));
        assert!(!crossed(10, 4, 4));
    }

    #[test]
    fn test_escalation_sequence() {
        let t = thresholds();

        let first = EscalationDecision::evaluate(&t, 13, 5);
        assert!(first.timeout);
        assert!(!first.ban);

        let second = EscalationDecision::evaluate(&t, 16, 3);
        assert!(!second.timeout);
        assert!(second.ban);
    }

    #[test]
    fn test_single_warn_can_trigger_both() {
        // from 2 straight to 18 with a HIGH (16) warn
        let decision = EscalationDecision::evaluate(&thresholds(), 18, 16);
        assert!(decision.timeout);
        assert!(decision.ban);
    }

    #[test]
    fn test_below_thresholds_does_nothing() {
        let decision = EscalationDecision::evaluate(&thresholds(), 7, 3);
        assert_eq!(decision, EscalationDecision::default());
        assert!(!decision.escalates());
    }
}
