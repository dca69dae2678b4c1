//! Configuration validation

use crate::app_config::{DEFAULT_ASSETS, DEFAULT_FALLBACK, is_valid_speech_rate};
use crate::schema::RawConfig;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Cache version cannot be empty")]
    EmptyCacheVersion,

    #[error("Manifest lists no assets")]
    EmptyManifest,

    #[error("Duplicate asset in manifest: {0}")]
    DuplicateAsset(String),

    #[error("Fallback asset '{0}' is not listed in the manifest")]
    FallbackNotCached(String),

    #[error("Timer duration must be greater than zero: {field}")]
    ZeroDuration { field: &'static str },

    #[error("Warning offset {warn}s must be shorter than full duration {full}s")]
    WarnNotShorterThanFull { full: u32, warn: u32 },

    #[error("Speech rate {0} is outside 1.1..=3.0")]
    SpeechRateOutOfRange(f32),

    #[error("Origin must be an http(s) URL: {0}")]
    InvalidOrigin(String),
}

/// Validate a raw configuration, collecting every problem
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(validate_cache(config));
    errors.extend(validate_timer(config));

    if let Some(origin) = &config.service.origin
        && !(origin.starts_with("http://") || origin.starts_with("https://"))
    {
        errors.push(ValidationError::InvalidOrigin(origin.clone()));
    }

    errors
}

fn validate_cache(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let cache = &config.cache;

    if let Some(version) = &cache.version
        && version.trim().is_empty()
    {
        errors.push(ValidationError::EmptyCacheVersion);
    }

    let assets: Vec<&str> = match &cache.assets {
        Some(list) => list.iter().map(String::as_str).collect(),
        None => DEFAULT_ASSETS.to_vec(),
    };

    if assets.is_empty() {
        errors.push(ValidationError::EmptyManifest);
    }

    let mut seen = HashSet::new();
    for asset in &assets {
        if !seen.insert(*asset) {
            errors.push(ValidationError::DuplicateAsset(asset.to_string()));
        }
    }

    let fallback = cache.fallback.as_deref().unwrap_or(DEFAULT_FALLBACK);
    if !assets.contains(&fallback) {
        errors.push(ValidationError::FallbackNotCached(fallback.to_string()));
    }

    errors
}

fn validate_timer(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let timer = &config.timer;

    let full = timer.full_seconds.unwrap_or(crate::DEFAULT_FULL_SECONDS);
    let warn = timer.warn_seconds.unwrap_or(crate::DEFAULT_WARN_SECONDS);

    if full == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "full_seconds",
        });
    }
    if warn == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "warn_seconds",
        });
    }
    if full > 0 && warn >= full {
        errors.push(ValidationError::WarnNotShorterThanFull { full, warn });
    }

    if let Some(rate) = timer.speech_rate
        && !is_valid_speech_rate(rate)
    {
        errors.push(ValidationError::SpeechRateOutOfRange(rate));
    }

    errors
}
