use serde::Deserialize;
use std::{env, fs};

use anyhow::{anyhow, Result};

use crate::config::settings::SettingsConfig;
use crate::utils::constants::{
    DEFAULT_AUTH_SCHEME, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_RECORDING_TIMEOUT_MS,
    DEFAULT_ROOM_PRIVACY, DEFAULT_SECRET_HEADER, DEFAULT_SWEEP_INTERVAL_SECS,
    DEFAULT_TOKEN_TTL_SECS,
};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub settings: SettingsConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub tokens: TokensConfig,
    pub transcription: TranscriptionConfig,
    pub recording: Option<RecordingConfig>,
}

/// Shared-secret gate in front of every server-to-server endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_secret_header")]
    pub header: String,
    pub secret: SecretValue,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokensConfig {
    #[serde(default = "default_token_ttl")]
    pub ttl_seconds: u64,
    /// 0 disables the background sweep; the sweep on issuance always runs
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TOKEN_TTL_SECS,
            sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

/// Upstream speech-to-text WebSocket endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct TranscriptionConfig {
    pub url: String,
    #[serde(default = "default_auth_scheme")]
    pub auth_scheme: String,
    pub credential: SecretValue,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

/// Video conferencing / cloud recording provider.
#[derive(Debug, Deserialize, Clone)]
pub struct RecordingConfig {
    pub base_url: String,
    pub api_key: SecretValue,
    #[serde(default = "default_recording_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_room_privacy")]
    pub room_privacy: String,
}

/// Secret value sources
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum SecretValue {
    Literal {
        value: String,
    },
    FromEnv {
        from_env: String,
    },
    FromFile {
        path: String,
    },
}

impl SecretValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            SecretValue::Literal { value } => Ok(value.to_owned()),
            SecretValue::FromEnv { from_env } => env::var(from_env)
                .map_err(|err| anyhow!("env var '{}': {}", from_env, err)),
            SecretValue::FromFile { path } => fs::read_to_string(path)
                .map_err(|err| anyhow!("secret file '{}': {}", path, err))
                .map(|res| res.trim().to_string()),
        }
    }

    /// Where the value comes from, safe to log.
    pub fn describe(&self) -> String {
        match self {
            SecretValue::Literal { .. } => "literal".to_string(),
            SecretValue::FromEnv { from_env } => format!("env:{}", from_env),
            SecretValue::FromFile { path } => format!("file:{}", path),
        }
    }
}

fn default_secret_header() -> String {
    DEFAULT_SECRET_HEADER.to_string()
}

fn default_token_ttl() -> u64 {
    DEFAULT_TOKEN_TTL_SECS
}

fn default_sweep_interval() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}

fn default_auth_scheme() -> String {
    DEFAULT_AUTH_SCHEME.to_string()
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_recording_timeout() -> u64 {
    DEFAULT_RECORDING_TIMEOUT_MS
}

fn default_room_privacy() -> String {
    DEFAULT_ROOM_PRIVACY.to_string()
}
