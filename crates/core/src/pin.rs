//! Completion PIN generation and verification.
//!
//! The PIN is a 6-digit shared secret generated when a provider accepts a
//! request. The seeker reads it back to the provider in person; the
//! provider submits it to prove the job was completed face to face.

use rand::Rng;

/// Number of digits in a completion PIN.
pub const PIN_LENGTH: usize = 6;

/// Default cap on failed completion attempts per request.
///
/// A 6-digit space is brute-forceable without a bound; once a request
/// accumulates this many mismatches, further attempts are refused.
pub const DEFAULT_MAX_PIN_ATTEMPTS: i32 = 5;

/// Generate a uniformly random 6-digit PIN, zero-padded (`"000000"`–`"999999"`).
pub fn generate_pin() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:06}")
}

/// Exact-match PIN verification. No partial credit.
pub fn verify_pin(submitted: &str, stored: &str) -> bool {
    submitted == stored
}
