//! Platform facts the core needs for its defaults

use serde::{Deserialize, Serialize};

/// Speech rate used on Apple platforms, whose engines speak faster
pub const APPLE_SPEECH_RATE: f32 = 1.4;

/// Speech rate used everywhere else
pub const DEFAULT_SPEECH_RATE: f32 = 2.0;

/// Describes the platform the timer runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlatformInfo {
    /// macOS / iOS speech engine
    pub is_apple: bool,

    /// The desktop prefers a dark color scheme
    pub prefers_dark: bool,
}

impl PlatformInfo {
    /// Detect the current platform
    pub fn detect() -> Self {
        let is_apple = cfg!(any(target_os = "macos", target_os = "ios"));
        let prefers_dark = std::env::var("GTK_THEME")
            .map(|theme| theme.to_lowercase().ends_with(":dark"))
            .unwrap_or(false);

        Self {
            is_apple,
            prefers_dark,
        }
    }

    /// Speech rate to use until the user picks one
    pub fn default_speech_rate(&self) -> f32 {
        if self.is_apple {
            APPLE_SPEECH_RATE
        } else {
            DEFAULT_SPEECH_RATE
        }
    }
}
