//! Ownership token formats.

use std::time::Duration;

use uuid::Uuid;

/// Opaque token for the robust lock: worker identity, a per-attempt uuid and the
/// expiry the holder expects, e.g. `4242-9f1c...:1735689600300`.
///
/// Only equality matters to the protocol; the timestamp is informational.
pub fn robust_token(now_millis: u64, lease: Duration) -> String {
    format!(
        "{}-{}:{}",
        std::process::id(),
        Uuid::new_v4().simple(),
        expiry_millis(now_millis, lease)
    )
}

/// Token for the basic lock: the expiry timestamp itself.
///
/// Two holders that compute the same expiry produce the same token, so a token can not
/// tell them apart.
pub fn basic_token(now_millis: u64, lease: Duration) -> String {
    expiry_millis(now_millis, lease).to_string()
}

/// Reads the expiry back out of a basic token.
pub fn parse_basic_expiry(value: &str) -> Option<u64> {
    value.trim().parse().ok()
}

fn expiry_millis(now_millis: u64, lease: Duration) -> u64 {
    now_millis.saturating_add(lease.as_millis() as u64)
}
