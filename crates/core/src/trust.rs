//! Trust scoring and the biometric pass threshold.
//!
//! Both are deliberately simple: a weighted sum over verification and
//! activity signals, and a fixed confidence cutoff for face matching.

use serde::{Deserialize, Serialize};

/// Minimum face-match confidence (percent) accepted as a pass.
pub const BIOMETRIC_PASS_THRESHOLD: f64 = 85.0;

/// Whether a face-match confidence score passes the fixed threshold.
pub fn biometric_passes(confidence: f64) -> bool {
    confidence >= BIOMETRIC_PASS_THRESHOLD
}

/// Verification and activity signals feeding the trust score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustSignals {
    pub identity_verified: bool,
    pub phone_verified: bool,
    pub agreements_completed: u32,
    pub disputes: u32,
}

/// Weighted sum over the signals, clamped to 0..=100.
///
/// Identity verification dominates (40 points), phone adds 20,
/// completed agreements add 5 each up to 40, and each dispute
/// subtracts 15.
pub fn trust_score(signals: &TrustSignals) -> u8 {
    let mut score: i64 = 0;
    if signals.identity_verified {
        score += 40;
    }
    if signals.phone_verified {
        score += 20;
    }
    score += i64::from(signals.agreements_completed.min(8)) * 5;
    score -= i64::from(signals.disputes) * 15;
    score.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        assert!(biometric_passes(85.0));
        assert!(biometric_passes(99.9));
        assert!(!biometric_passes(84.99));
    }

    #[test]
    fn empty_signals_score_zero() {
        assert_eq!(trust_score(&TrustSignals::default()), 0);
    }

    #[test]
    fn fully_verified_active_profile_caps_at_100() {
        let signals = TrustSignals {
            identity_verified: true,
            phone_verified: true,
            agreements_completed: 20,
            disputes: 0,
        };
        assert_eq!(trust_score(&signals), 100);
    }

    #[test]
    fn disputes_pull_the_score_down_but_not_below_zero() {
        let signals = TrustSignals {
            identity_verified: false,
            phone_verified: true,
            agreements_completed: 1,
            disputes: 5,
        };
        assert_eq!(trust_score(&signals), 0);
    }

    #[test]
    fn completed_agreements_are_capped() {
        let few = TrustSignals {
            agreements_completed: 8,
            ..TrustSignals::default()
        };
        let many = TrustSignals {
            agreements_completed: 70,
            ..TrustSignals::default()
        };
        assert_eq!(trust_score(&few), trust_score(&many));
    }
}
