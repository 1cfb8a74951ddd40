//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks listener, auth, token, transcription and recording invariants
//! - Resolves every secret once so a missing env var or file is reported at startup

use http::HeaderName;
use tracing::{error, info};

use crate::config::settings::SettingsConfig;
use crate::config::types::{
    AuthConfig, RecordingConfig, SecretValue, ServiceConfig, TokensConfig, TranscriptionConfig,
};

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_auth(&cfg.auth, &mut errors);
    validate_tokens(&cfg.tokens, &mut errors);
    validate_transcription(&cfg.transcription, &mut errors);
    if let Some(recording) = &cfg.recording {
        validate_recording(recording, &mut errors);
    }

    if errors.is_empty() {
        info!("config validation passed");
        Ok(())
    } else {
        for e in &errors {
            error!("config: {}", e);
        }
        Err(errors)
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if settings.server.host.trim().is_empty() {
        errors.push("settings.server.host must not be empty".to_string());
    }
    match settings.server.port.parse::<u16>() {
        Ok(0) | Err(_) => errors.push(format!(
            "settings.server.port '{}' must be a port number in 1..=65535",
            settings.server.port
        )),
        Ok(_) => {}
    }
    if settings.metrics.is_enabled && !settings.metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            settings.metrics.path
        ));
    }
    if let Some(logging) = &settings.logging {
        let level = logging.level.to_lowercase();
        if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
            errors.push(format!("settings.logging.level '{}' is not supported", logging.level));
        }
    }
}

fn validate_auth(auth: &AuthConfig, errors: &mut Vec<String>) {
    if HeaderName::from_bytes(auth.header.as_bytes()).is_err() {
        errors.push(format!("auth.header '{}' is not a valid header name", auth.header));
    }
    validate_secret("auth.secret", &auth.secret, errors);
}

fn validate_tokens(tokens: &TokensConfig, errors: &mut Vec<String>) {
    if tokens.ttl_seconds == 0 {
        errors.push("tokens.ttl_seconds must be greater than 0".to_string());
    }
}

fn validate_transcription(transcription: &TranscriptionConfig, errors: &mut Vec<String>) {
    let url = transcription.url.as_str();
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        errors.push(format!("transcription.url '{}' must use ws:// or wss://", url));
    }
    if transcription.auth_scheme.trim().is_empty() {
        errors.push("transcription.auth_scheme must not be empty".to_string());
    }
    if transcription.connect_timeout_ms == 0 {
        errors.push("transcription.connect_timeout_ms must be greater than 0".to_string());
    }
    validate_secret("transcription.credential", &transcription.credential, errors);
}

fn validate_recording(recording: &RecordingConfig, errors: &mut Vec<String>) {
    let url = recording.base_url.as_str();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(format!("recording.base_url '{}' must use http:// or https://", url));
    }
    if recording.timeout_ms == 0 {
        errors.push("recording.timeout_ms must be greater than 0".to_string());
    }
    if !["private", "public"].contains(&recording.room_privacy.as_str()) {
        errors.push(format!(
            "recording.room_privacy '{}' must be 'private' or 'public'",
            recording.room_privacy
        ));
    }
    validate_secret("recording.api_key", &recording.api_key, errors);
}

fn validate_secret(field: &str, secret: &SecretValue, errors: &mut Vec<String>) {
    match secret.resolve() {
        Ok(value) if value.trim().is_empty() => {
            errors.push(format!("{} ({}) resolves to an empty value", field, secret.describe()))
        }
        Ok(_) => {}
        Err(err) => errors.push(format!("{} cannot be resolved: {}", field, err)),
    }
}
