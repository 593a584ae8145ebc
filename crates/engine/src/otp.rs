//! OTP challenge state: channel, resend cooldown, attempt cap.
//!
//! The code itself lives with the signing provider -- it generates,
//! dispatches, and verifies. This module tracks what the engine must
//! enforce locally: the 60-second resend cooldown, the attempt cap,
//! and the 6-digit format gate that keeps malformed codes from ever
//! reaching the provider.

use std::fmt;

use time::{Duration, OffsetDateTime};

/// Cooldown between OTP dispatches. Resend is unavailable strictly
/// before `sent_at + RESEND_COOLDOWN` and available exactly at expiry.
pub const RESEND_COOLDOWN: Duration = Duration::seconds(60);

/// Verification attempts allowed per challenge before the session fails.
pub const MAX_OTP_ATTEMPTS: u32 = 5;

/// Dispatch channel for the one-time code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpChannel {
    Sms,
    Email,
}

impl OtpChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpChannel::Sms => "sms",
            OtpChannel::Email => "email",
        }
    }
}

impl fmt::Display for OtpChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local state of an in-flight OTP challenge.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    pub channel: OtpChannel,
    pub destination: String,
    pub sent_at: OffsetDateTime,
    pub attempts: u32,
}

impl OtpChallenge {
    pub fn new(channel: OtpChannel, destination: impl Into<String>, now: OffsetDateTime) -> Self {
        OtpChallenge {
            channel,
            destination: destination.into(),
            sent_at: now,
            attempts: 0,
        }
    }

    /// Whether a resend is allowed at `now`. Available exactly at
    /// `sent_at + RESEND_COOLDOWN`, not a moment earlier.
    pub fn can_resend(&self, now: OffsetDateTime) -> bool {
        now >= self.sent_at + RESEND_COOLDOWN
    }

    /// Whole seconds until resend becomes available (0 when available).
    pub fn resend_available_in(&self, now: OffsetDateTime) -> i64 {
        let remaining = (self.sent_at + RESEND_COOLDOWN) - now;
        remaining.whole_seconds().max(0)
    }

    /// Restart the cooldown window after a successful dispatch.
    pub fn mark_resent(&mut self, now: OffsetDateTime) {
        self.sent_at = now;
    }

    /// Count a verification attempt. Returns `false` once the cap is
    /// exhausted.
    pub fn register_attempt(&mut self) -> bool {
        self.attempts += 1;
        self.attempts <= MAX_OTP_ATTEMPTS
    }
}

/// Local format gate: exactly 6 ASCII digits.
pub fn code_is_well_formed(code: &str) -> bool {
    code.len() == 6 && code.chars().all(|c| c.is_ascii_digit())
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
