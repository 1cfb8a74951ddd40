use std::time::Duration;

use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

/// Absolute instant `ttl` from now. Saturates instead of overflowing.
pub fn expires_after(ttl: Duration) -> DateTime<Utc> {
    let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
    now().checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
