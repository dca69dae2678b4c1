//! Best-effort settings persistence
//!
//! Settings live in the key-value store under the same keys the installed
//! web app used, so an existing store is read back unchanged. The store may
//! be missing or broken; every failure here degrades to defaults.

use bbtimer_config::{NotificationMode, is_valid_speech_rate};
use bbtimer_store::KeyValueStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::SettingsProfile;

pub const KEY_FULL_TIME: &str = "storedFullTime";
pub const KEY_WARN_TIME: &str = "storedPartTime";
pub const KEY_END_SOUND: &str = "storedEndSound";
pub const KEY_WARN_SOUND: &str = "storedWarnSound";
pub const KEY_VOICE_NAME: &str = "storedVoiceName";
pub const KEY_SPEECH_RATE: &str = "storedSpeechRate";
pub const KEY_SHOW_COUNTER: &str = "storedShowCounter";
pub const KEY_DARK_MODE: &str = "storedDarkMode";

/// Stored code of a notification mode
pub fn mode_code(mode: NotificationMode) -> &'static str {
    match mode {
        NotificationMode::None => "1",
        NotificationMode::Voice => "2",
        NotificationMode::Beep => "3",
    }
}

/// Parse a stored notification mode code
pub fn parse_mode_code(code: &str) -> Option<NotificationMode> {
    match code.trim() {
        "1" => Some(NotificationMode::None),
        "2" => Some(NotificationMode::Voice),
        "3" => Some(NotificationMode::Beep),
        _ => None,
    }
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

fn parse_seconds(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|s| *s > 0)
}

fn parse_rate(value: &str) -> Option<f32> {
    value.trim().parse::<f32>().ok().filter(|r| is_valid_speech_rate(*r))
}

/// Reads and writes the settings profile
pub struct SettingsRepository {
    store: Arc<dyn KeyValueStore>,
    reported_failure: AtomicBool,
}

impl SettingsRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            reported_failure: AtomicBool::new(false),
        }
    }

    /// Load the stored profile over `defaults`.
    ///
    /// Each key is read on its own. A missing or invalid value keeps the
    /// default and writes it back.
    pub fn load(&self, defaults: &SettingsProfile) -> SettingsProfile {
        let mut profile = defaults.clone();

        profile.full_seconds =
            self.load_value(KEY_FULL_TIME, parse_seconds, defaults.full_seconds, |v| v.to_string());
        profile.warn_seconds =
            self.load_value(KEY_WARN_TIME, parse_seconds, defaults.warn_seconds, |v| v.to_string());
        profile.end_mode = self.load_value(KEY_END_SOUND, parse_mode_code, defaults.end_mode, |m| {
            mode_code(m).to_string()
        });
        profile.warn_mode = self.load_value(KEY_WARN_SOUND, parse_mode_code, defaults.warn_mode, |m| {
            mode_code(m).to_string()
        });
        profile.speech_rate = self.load_value(KEY_SPEECH_RATE, parse_rate, defaults.speech_rate, |r| {
            format!("{:.1}", r)
        });
        profile.show_counter = self.load_value(KEY_SHOW_COUNTER, parse_flag, defaults.show_counter, |f| {
            flag(f).to_string()
        });
        profile.dark_theme = self.load_value(KEY_DARK_MODE, parse_flag, defaults.dark_theme, |f| {
            flag(f).to_string()
        });

        // Resolved against the catalog once voices are known
        profile.voice_id = self
            .read(KEY_VOICE_NAME)
            .filter(|id| !id.trim().is_empty())
            .or_else(|| defaults.voice_id.clone());

        if profile.full_seconds <= profile.warn_seconds {
            warn!(
                full = profile.full_seconds,
                warn = profile.warn_seconds,
                "Stored durations are inconsistent, using defaults"
            );
            profile.full_seconds = defaults.full_seconds;
            profile.warn_seconds = defaults.warn_seconds;
            self.write(KEY_FULL_TIME, &defaults.full_seconds.to_string());
            self.write(KEY_WARN_TIME, &defaults.warn_seconds.to_string());
        }

        info!(
            full = profile.full_seconds,
            warn = profile.warn_seconds,
            end = ?profile.end_mode,
            warning = ?profile.warn_mode,
            "Settings loaded"
        );

        profile
    }

    /// Persist the whole profile
    pub fn save(&self, profile: &SettingsProfile) {
        self.write(KEY_FULL_TIME, &profile.full_seconds.to_string());
        self.write(KEY_WARN_TIME, &profile.warn_seconds.to_string());
        self.write(KEY_END_SOUND, mode_code(profile.end_mode));
        self.write(KEY_WARN_SOUND, mode_code(profile.warn_mode));
        if let Some(voice_id) = &profile.voice_id {
            self.write(KEY_VOICE_NAME, voice_id);
        }
        self.write(KEY_SPEECH_RATE, &format!("{:.1}", profile.speech_rate));
        self.write(KEY_SHOW_COUNTER, flag(profile.show_counter));
        self.write(KEY_DARK_MODE, flag(profile.dark_theme));

        debug!("Settings saved");
    }

    /// Persist only the voice choice
    pub fn save_voice(&self, voice_id: &str) {
        self.write(KEY_VOICE_NAME, voice_id);
    }

    fn load_value<T: Copy>(
        &self,
        key: &str,
        parse: impl Fn(&str) -> Option<T>,
        default: T,
        render: impl Fn(T) -> String,
    ) -> T {
        match self.read(key).as_deref().map(|raw| (raw, parse(raw))) {
            Some((_, Some(value))) => value,
            Some((raw, None)) => {
                debug!(key, raw, "Ignoring invalid stored value");
                self.write(key, &render(default));
                default
            }
            None => {
                self.write(key, &render(default));
                default
            }
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                self.report_failure(key, &e);
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            self.report_failure(key, &e);
        }
    }

    /// Warn once, then keep quiet
    fn report_failure(&self, key: &str, error: &bbtimer_store::StoreError) {
        if self.reported_failure.swap(true, Ordering::Relaxed) {
            debug!(key, error = %error, "Settings store access failed");
        } else {
            warn!(key, error = %error, "Settings store unavailable, using defaults");
        }
    }
}
