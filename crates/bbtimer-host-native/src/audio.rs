//! Sound playback through an external player

use bbtimer_host_api::{AudioPlayer, HostError, HostResult, SoundRef};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Plays sounds by running a player command (e.g. `paplay`, `aplay`)
/// on the matching file under `sounds_dir`.
///
/// Without a player, playback is logged and skipped.
pub struct CommandAudio {
    player: Option<String>,
    sounds_dir: PathBuf,
}

impl CommandAudio {
    pub fn new(player: Option<String>, sounds_dir: impl Into<PathBuf>) -> Self {
        Self {
            player,
            sounds_dir: sounds_dir.into(),
        }
    }

    /// Local file for a sound URL: its file name under `sounds_dir`
    pub fn sound_path(&self, sound: &SoundRef) -> PathBuf {
        let name = Path::new(sound.as_str())
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_default();
        self.sounds_dir.join(name)
    }
}

impl AudioPlayer for CommandAudio {
    fn play(&self, sound: &SoundRef) -> HostResult<()> {
        let Some(player) = &self.player else {
            debug!(sound = %sound, "No audio player configured, skipping");
            return Ok(());
        };

        let path = self.sound_path(sound);
        if !path.exists() {
            warn!(path = %path.display(), "Sound file missing");
            return Err(HostError::PlaybackFailed(format!(
                "{} not found",
                path.display()
            )));
        }

        let mut child = Command::new(player)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| HostError::PlaybackFailed(format!("{}: {}", player, e)))?;

        debug!(player = %player, path = %path.display(), pid = child.id(), "Playing sound");

        // Reap the player in the background
        std::thread::spawn(move || {
            let _ = child.wait();
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sound_path_uses_file_name() {
        let audio = CommandAudio::new(None, "/usr/share/bbtimer/sounds");
        assert_eq!(
            audio.sound_path(&SoundRef::new("/timer/media/sounds/beep.mp3")),
            PathBuf::from("/usr/share/bbtimer/sounds/beep.mp3")
        );
    }

    #[test]
    fn test_no_player_is_silent_success() {
        let audio = CommandAudio::new(None, "/nonexistent");
        assert!(audio.play(&SoundRef::new("/timer/media/sounds/beep.mp3")).is_ok());
    }

    #[test]
    fn test_missing_file_fails() {
        let audio = CommandAudio::new(Some("true".into()), "/nonexistent");
        assert!(matches!(
            audio.play(&SoundRef::new("/timer/media/sounds/beep.mp3")),
            Err(HostError::PlaybackFailed(_))
        ));
    }
}
