//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::NotificationMode;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Offline asset cache manifest
    #[serde(default)]
    pub cache: RawCacheConfig,

    /// Timer defaults used until the user commits their own settings
    #[serde(default)]
    pub timer: RawTimerConfig,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,
}

/// Manifest of assets to precache
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawCacheConfig {
    /// Version string; bump whenever any listed asset changes
    pub version: Option<String>,

    /// Prefix prepended to the version to form the generation key
    pub app_prefix: Option<String>,

    /// Path prefix shared by every asset (e.g. "/timer")
    pub base_path: Option<String>,

    /// Asset served when both cache and network miss
    pub fallback: Option<String>,

    /// Assets to precache, relative to `base_path`
    pub assets: Option<Vec<String>>,
}

/// Timer defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTimerConfig {
    pub full_seconds: Option<u32>,
    pub warn_seconds: Option<u32>,
    pub end_notification: Option<NotificationMode>,
    pub warn_notification: Option<NotificationMode>,

    /// Locale for utterances until a voice is chosen
    pub locale: Option<String>,

    /// Speech rate; defaults to the platform rate when unset
    pub speech_rate: Option<f32>,

    /// Beep asset, relative to the cache base path
    pub beep_sound: Option<String>,

    /// Silent asset played once to unlock audio, relative to the cache base path
    pub silence_sound: Option<String>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Origin the manifest assets are fetched from
    pub origin: Option<String>,

    /// Data directory for the settings and cache database
    pub data_dir: Option<PathBuf>,

    /// Command used to play sound files (e.g. "paplay")
    pub audio_player: Option<String>,

    /// Directory holding local copies of the sound assets
    pub sounds_dir: Option<PathBuf>,

    /// Speech synthesizer command (default: "espeak-ng")
    pub speech_command: Option<String>,
}
