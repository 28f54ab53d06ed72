use chrono::{DateTime, Duration, Utc};
use rand::{distr::Alphanumeric, Rng};

use super::{AuthError, Result};

/// Generate a random state parameter for CSRF protection.
pub fn generate_state() -> String {
    random_string(32)
}

/// Generate a random nonce bound to the ID token.
pub fn generate_nonce() -> String {
    random_string(32)
}

fn random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Check whether an instant has passed, treating it as `offset_seconds` early.
///
/// An offset too large to apply counts as expired.
pub fn has_expired(expires_at: DateTime<Utc>, offset_seconds: i64, now: DateTime<Utc>) -> bool {
    Duration::try_seconds(offset_seconds)
        .and_then(|offset| expires_at.checked_sub_signed(offset))
        .is_none_or(|deadline| deadline <= now)
}

/// Absolute access token expiry from a relative `expires_in`.
///
/// # Errors
///
/// Returns `InvalidToken` when `expires_in` is beyond the representable range.
pub fn access_token_expiry(
    now: DateTime<Utc>,
    expires_in: Option<i64>,
) -> Result<Option<DateTime<Utc>>> {
    expires_in
        .map(|secs| {
            Duration::try_seconds(secs)
                .and_then(|lifetime| now.checked_add_signed(lifetime))
                .ok_or_else(|| AuthError::InvalidToken(format!("expires_in {secs} is out of range")))
        })
        .transpose()
}
