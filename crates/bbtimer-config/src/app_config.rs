//! Validated configuration structures

use bbtimer_util::{CacheVersion, default_data_dir};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::schema::{RawCacheConfig, RawConfig, RawServiceConfig, RawTimerConfig};

/// Version of the shipped manifest
pub const DEFAULT_CACHE_VERSION: &str = "0.2";

/// Prefix of every generation key this app writes
pub const DEFAULT_APP_PREFIX: &str = "bbtimer_";

/// Path prefix of the shipped assets
pub const DEFAULT_BASE_PATH: &str = "/timer";

/// Assets served from cache while offline
pub const DEFAULT_ASSETS: &[&str] = &[
    "index.html",
    "help.html",
    "timer.js",
    "sliders.css",
    "media/icons/favicon_32.png",
    "media/icons/maskable_512.png",
    "media/sounds/beep.mp3",
    "media/sounds/silence.mp3",
];

pub const DEFAULT_FALLBACK: &str = "index.html";
pub const DEFAULT_FULL_SECONDS: u32 = 15;
pub const DEFAULT_WARN_SECONDS: u32 = 5;
pub const DEFAULT_LOCALE: &str = "en-us";
pub const DEFAULT_BEEP_SOUND: &str = "media/sounds/beep.mp3";
pub const DEFAULT_SILENCE_SOUND: &str = "media/sounds/silence.mp3";
pub const DEFAULT_ORIGIN: &str = "http://localhost:8080";
pub const DEFAULT_SPEECH_COMMAND: &str = "espeak-ng";

/// Slowest selectable speech rate
pub const SPEECH_RATE_MIN: f32 = 1.1;

/// Fastest selectable speech rate
pub const SPEECH_RATE_MAX: f32 = 3.0;

/// How an event (warning or end of countdown) is announced.
///
/// Voice and beep are mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationMode {
    #[default]
    None,
    Voice,
    Beep,
}

impl NotificationMode {
    /// Resolve a pair of independent selections. Voice wins when both are set.
    pub fn from_selection(voice: bool, beep: bool) -> Self {
        match (voice, beep) {
            (true, _) => Self::Voice,
            (false, true) => Self::Beep,
            (false, false) => Self::None,
        }
    }

    pub fn plays_voice(self) -> bool {
        self == Self::Voice
    }

    pub fn plays_beep(self) -> bool {
        self == Self::Beep
    }
}

/// Whether `rate` is one of the selectable speech rates
pub fn is_valid_speech_rate(rate: f32) -> bool {
    rate.is_finite() && (SPEECH_RATE_MIN - 0.001..=SPEECH_RATE_MAX + 0.001).contains(&rate)
}

/// Validated configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub manifest: Manifest,
    pub timer: TimerDefaults,
    pub service: ServiceConfig,
}

impl AppConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let manifest = Manifest::from_raw(raw.cache);
        let timer = TimerDefaults::from_raw(raw.timer, &manifest);

        Self {
            manifest,
            timer,
            service: ServiceConfig::from_raw(raw.service),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let manifest = Manifest::from_raw(RawCacheConfig::default());
        let timer = TimerDefaults::from_raw(RawTimerConfig::default(), &manifest);

        Self {
            manifest,
            timer,
            service: ServiceConfig::from_raw(RawServiceConfig::default()),
        }
    }
}

/// Deploy-time asset manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub version: CacheVersion,
    pub app_prefix: String,
    pub base_path: String,
    /// Absolute asset URLs, in precache order
    pub urls: Vec<String>,
    /// Absolute URL of the fallback asset
    pub fallback_url: String,
}

impl Manifest {
    fn from_raw(raw: RawCacheConfig) -> Self {
        let base_path = normalize_base_path(raw.base_path.as_deref().unwrap_or(DEFAULT_BASE_PATH));
        let assets = raw
            .assets
            .unwrap_or_else(|| DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect());
        let fallback = raw.fallback.unwrap_or_else(|| DEFAULT_FALLBACK.to_string());

        Self {
            version: CacheVersion::new(raw.version.unwrap_or_else(|| DEFAULT_CACHE_VERSION.into())),
            app_prefix: raw.app_prefix.unwrap_or_else(|| DEFAULT_APP_PREFIX.into()),
            urls: assets.iter().map(|a| resolve_asset(&base_path, a)).collect(),
            fallback_url: resolve_asset(&base_path, &fallback),
            base_path,
        }
    }

    /// Build a manifest directly (mostly for tests)
    pub fn new(
        version: impl Into<String>,
        app_prefix: impl Into<String>,
        urls: Vec<String>,
        fallback_url: impl Into<String>,
    ) -> Self {
        Self {
            version: CacheVersion::new(version),
            app_prefix: app_prefix.into(),
            base_path: String::new(),
            urls,
            fallback_url: fallback_url.into(),
        }
    }

    /// Storage key of the generation this manifest populates
    pub fn generation_key(&self) -> String {
        self.version.generation_key(&self.app_prefix)
    }

    /// Absolute URL of an asset given relative to the base path
    pub fn resolve(&self, asset: &str) -> String {
        resolve_asset(&self.base_path, asset)
    }
}

fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Join an asset onto the base path; an empty asset names the base directory itself
fn resolve_asset(base_path: &str, asset: &str) -> String {
    if asset.starts_with('/') {
        return asset.to_string();
    }
    format!("{}/{}", base_path, asset)
}

/// Timer settings used until the user commits their own
#[derive(Debug, Clone, PartialEq)]
pub struct TimerDefaults {
    pub full_seconds: u32,
    pub warn_seconds: u32,
    pub end_notification: NotificationMode,
    pub warn_notification: NotificationMode,
    pub locale: String,
    /// None means "use the platform default"
    pub speech_rate: Option<f32>,
    /// Absolute URL of the beep sound
    pub beep_sound: String,
    /// Absolute URL of the silent priming sound
    pub silence_sound: String,
}

impl TimerDefaults {
    fn from_raw(raw: RawTimerConfig, manifest: &Manifest) -> Self {
        Self {
            full_seconds: raw.full_seconds.unwrap_or(DEFAULT_FULL_SECONDS),
            warn_seconds: raw.warn_seconds.unwrap_or(DEFAULT_WARN_SECONDS),
            end_notification: raw.end_notification.unwrap_or(NotificationMode::Voice),
            warn_notification: raw.warn_notification.unwrap_or(NotificationMode::None),
            locale: raw.locale.unwrap_or_else(|| DEFAULT_LOCALE.into()),
            speech_rate: raw.speech_rate,
            beep_sound: manifest.resolve(raw.beep_sound.as_deref().unwrap_or(DEFAULT_BEEP_SOUND)),
            silence_sound: manifest
                .resolve(raw.silence_sound.as_deref().unwrap_or(DEFAULT_SILENCE_SOUND)),
        }
    }
}

impl Default for TimerDefaults {
    fn default() -> Self {
        AppConfig::default().timer
    }
}

/// Service-level configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub origin: String,
    pub data_dir: PathBuf,
    pub audio_player: Option<String>,
    pub sounds_dir: Option<PathBuf>,
    pub speech_command: String,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            origin: raw
                .origin
                .map(|o| o.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_ORIGIN.into()),
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
            audio_player: raw.audio_player,
            sounds_dir: raw.sounds_dir,
            speech_command: raw
                .speech_command
                .unwrap_or_else(|| DEFAULT_SPEECH_COMMAND.into()),
        }
    }
}
