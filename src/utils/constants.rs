//! Shared constants and invariants

pub const DEFAULT_TOKEN_TTL_SECS: u64 = 600;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_RECORDING_TIMEOUT_MS: u64 = 25_000;

pub const DEFAULT_SECRET_HEADER: &str = "x-shared-secret";
pub const DEFAULT_AUTH_SCHEME: &str = "Token";
pub const DEFAULT_ROOM_PRIVACY: &str = "private";

// Interview room lengths accepted by the CMS, in minutes
pub const ROOM_MINUTES_ALLOWED: [u32; 2] = [15, 30];
pub const ROOM_MINUTES_DEFAULT: u32 = 15;
pub const ROOM_GRACE_SECS: i64 = 300;
pub const DEFAULT_CANDIDATE_NAME: &str = "Candidate";

/// Number of token characters that may appear in logs.
pub const TOKEN_LOG_PREFIX_LEN: usize = 8;
