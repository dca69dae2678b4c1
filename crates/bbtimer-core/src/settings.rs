//! Settings profile, draft edits and commit validation

use bbtimer_config::{NotificationMode, TimerDefaults, is_valid_speech_rate};
use bbtimer_host_api::PlatformInfo;
use thiserror::Error;

use crate::VoiceCatalog;

/// A rejected settings commit. The committed profile is left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("Invalid settings: full time ({full}s) must be longer than warning time ({warn}s)")]
    WarnNotShorterThanFull { full: u32, warn: u32 },

    #[error("Invalid settings: warning time must be at least one second")]
    ZeroWarn,

    #[error("Invalid settings: speech rate {0} is outside 1.1..=3.0")]
    SpeechRateOutOfRange(f32),

    #[error("Invalid settings: no voice at index {0}")]
    UnknownVoice(usize),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Committed user settings
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsProfile {
    pub full_seconds: u32,
    pub warn_seconds: u32,
    pub end_mode: NotificationMode,
    pub warn_mode: NotificationMode,
    /// `"<name> <locale>"` of the selected voice
    pub voice_id: Option<String>,
    pub speech_rate: f32,
    pub show_counter: bool,
    pub dark_theme: bool,
}

impl SettingsProfile {
    /// Profile used on first run
    pub fn defaults(timer: &TimerDefaults, platform: &PlatformInfo) -> Self {
        Self {
            full_seconds: timer.full_seconds,
            warn_seconds: timer.warn_seconds,
            end_mode: timer.end_notification,
            warn_mode: timer.warn_notification,
            voice_id: None,
            speech_rate: timer
                .speech_rate
                .unwrap_or_else(|| platform.default_speech_rate()),
            show_counter: false,
            dark_theme: platform.prefers_dark,
        }
    }
}

/// Settings being edited but not yet committed.
///
/// Voice and beep are separate selections here; the commit resolves them
/// into a single mode per event.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsDraft {
    pub full_seconds: u32,
    pub warn_seconds: u32,
    pub end_voice: bool,
    pub end_beep: bool,
    pub warn_voice: bool,
    pub warn_beep: bool,
    /// Index into the voice catalog
    pub voice_index: Option<usize>,
    pub speech_rate: f32,
    pub show_counter: bool,
    pub dark_theme: bool,
}

impl SettingsDraft {
    /// Seed a draft from the committed profile
    pub fn from_profile(profile: &SettingsProfile, catalog: &VoiceCatalog) -> Self {
        Self {
            full_seconds: profile.full_seconds,
            warn_seconds: profile.warn_seconds,
            end_voice: profile.end_mode.plays_voice(),
            end_beep: profile.end_mode.plays_beep(),
            warn_voice: profile.warn_mode.plays_voice(),
            warn_beep: profile.warn_mode.plays_beep(),
            voice_index: profile
                .voice_id
                .as_deref()
                .and_then(|id| catalog.position_by_id(id)),
            speech_rate: profile.speech_rate,
            show_counter: profile.show_counter,
            dark_theme: profile.dark_theme,
        }
    }

    pub fn end_mode(&self) -> NotificationMode {
        NotificationMode::from_selection(self.end_voice, self.end_beep)
    }

    pub fn warn_mode(&self) -> NotificationMode {
        NotificationMode::from_selection(self.warn_voice, self.warn_beep)
    }

    /// Check the draft and build the profile it would commit
    pub fn to_profile(&self, catalog: &VoiceCatalog, current: &SettingsProfile) -> SettingsResult<SettingsProfile> {
        if self.warn_seconds == 0 {
            return Err(SettingsError::ZeroWarn);
        }
        if self.full_seconds <= self.warn_seconds {
            return Err(SettingsError::WarnNotShorterThanFull {
                full: self.full_seconds,
                warn: self.warn_seconds,
            });
        }
        if !is_valid_speech_rate(self.speech_rate) {
            return Err(SettingsError::SpeechRateOutOfRange(self.speech_rate));
        }

        let voice_id = match self.voice_index {
            Some(index) => Some(
                catalog
                    .get(index)
                    .ok_or(SettingsError::UnknownVoice(index))?
                    .display_id(),
            ),
            // Nothing to choose from yet; keep whatever was stored
            None => current.voice_id.clone(),
        };

        Ok(SettingsProfile {
            full_seconds: self.full_seconds,
            warn_seconds: self.warn_seconds,
            end_mode: self.end_mode(),
            warn_mode: self.warn_mode(),
            voice_id,
            speech_rate: self.speech_rate,
            show_counter: self.show_counter,
            dark_theme: self.dark_theme,
        })
    }
}
