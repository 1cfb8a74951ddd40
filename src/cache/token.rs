use chrono::{DateTime, Utc};

/// One-time authorization to open a relay session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayToken {
    pub session_id: String,
    /// set once at creation, never extended
    pub expires_at: DateTime<Utc>,
}

impl RelayToken {
    pub fn new(session_id: String, expires_at: DateTime<Utc>) -> Self {
        Self { session_id, expires_at }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
