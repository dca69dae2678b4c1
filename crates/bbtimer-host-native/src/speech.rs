//! Speech through espeak-ng

use bbtimer_host_api::{HostError, HostResult, SpeechEngine, Utterance, Voice};
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Mutex, mpsc};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// espeak-ng speaks this many words per minute at rate 1.0
pub const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// Longest a voice listing may run before it is killed and treated as empty
pub const VOICE_LIST_TIMEOUT: Duration = Duration::from_millis(150);

const WAIT_POLL: Duration = Duration::from_millis(5);

/// Speech engine that runs one espeak-ng process per utterance
pub struct EspeakSpeech {
    command: String,
    list_timeout: Duration,
    current: Mutex<Option<Child>>,
}

impl EspeakSpeech {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            list_timeout: VOICE_LIST_TIMEOUT,
            current: Mutex::new(None),
        }
    }

    pub fn with_list_timeout(mut self, timeout: Duration) -> Self {
        self.list_timeout = timeout;
        self
    }

    fn stop_current(&self) -> HostResult<()> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| HostError::Internal("speech lock poisoned".into()))?;

        if let Some(mut child) = current.take() {
            match child.try_wait() {
                // Already finished is fine
                Ok(Some(_)) => {}
                Ok(None) => {
                    debug!(pid = child.id(), "Interrupting speech");
                    child.kill()?;
                    child.wait()?;
                }
                Err(e) => {
                    // Never block on a process we cannot query
                    warn!(pid = child.id(), error = %e, "Speech process state unknown, killing");
                    let _ = child.kill();
                }
            }
        }
        Ok(())
    }

    /// Run `<command> --voices`, giving up at the deadline
    fn list_voices(&self) -> Option<String> {
        let deadline = Instant::now() + self.list_timeout;

        let mut child = match Command::new(&self.command)
            .arg("--voices")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                debug!(error = %e, command = %self.command, "Speech command unavailable");
                return None;
            }
        };

        let mut stdout = child.stdout.take()?;
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut output = Vec::new();
            let _ = tx.send(stdout.read_to_end(&mut output).map(|_| output));
        });

        let output = rx.recv_timeout(deadline.saturating_duration_since(Instant::now()));
        let status = match output {
            Ok(_) => wait_until(&mut child, deadline),
            Err(_) => None,
        };

        match (output, status) {
            (Ok(Ok(output)), Some(status)) if status.success() => {
                Some(String::from_utf8_lossy(&output).into_owned())
            }
            (_, Some(status)) => {
                warn!(%status, "Listing voices failed");
                None
            }
            _ => {
                warn!(
                    command = %self.command,
                    timeout_ms = self.list_timeout.as_millis() as u64,
                    "Listing voices timed out"
                );
                let _ = child.kill();
                let _ = child.wait();
                None
            }
        }
    }
}

/// Poll for exit until the deadline passes
fn wait_until(child: &mut Child, deadline: Instant) -> Option<ExitStatus> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) if Instant::now() < deadline => std::thread::sleep(WAIT_POLL),
            _ => return None,
        }
    }
}

/// Words per minute for a relative speech rate
pub fn words_per_minute(rate: f32) -> u32 {
    (BASE_WORDS_PER_MINUTE * rate).round().max(80.0) as u32
}

/// Canonical `ll-RR` form of an espeak language tag (`en-us` -> `en-US`)
pub fn normalize_locale(tag: &str) -> String {
    let mut parts = tag.splitn(2, ['-', '_']);
    let language = parts.next().unwrap_or_default().to_lowercase();
    match parts.next() {
        Some(region) if region.len() == 2 => format!("{}-{}", language, region.to_uppercase()),
        Some(rest) => format!("{}-{}", language, rest),
        None => language,
    }
}

/// Parse the table printed by `espeak-ng --voices`
pub fn parse_voice_list(output: &str) -> Vec<Voice> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let columns: Vec<&str> = line.split_whitespace().collect();
            if columns.len() < 4 {
                return None;
            }
            Some(Voice::new(columns[3], normalize_locale(columns[1]), true))
        })
        .collect()
}

impl SpeechEngine for EspeakSpeech {
    fn speak(&self, utterance: &Utterance) -> HostResult<()> {
        self.stop_current()?;

        // Priming only matters where audio needs a user gesture
        if utterance.text.is_empty() {
            return Ok(());
        }

        let language = utterance
            .voice
            .as_ref()
            .map(|v| v.locale.as_str())
            .unwrap_or(utterance.locale.as_str())
            .replace('_', "-")
            .to_lowercase();

        let child = Command::new(&self.command)
            .arg("-v")
            .arg(&language)
            .arg("-s")
            .arg(words_per_minute(utterance.rate).to_string())
            .arg(&utterance.text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| HostError::SpeechFailed(format!("{}: {}", self.command, e)))?;

        debug!(pid = child.id(), text = %utterance.text, language = %language, "Speaking");

        let mut current = self
            .current
            .lock()
            .map_err(|_| HostError::Internal("speech lock poisoned".into()))?;
        *current = Some(child);
        Ok(())
    }

    fn cancel(&self) -> HostResult<()> {
        self.stop_current()
    }

    fn voices(&self) -> Vec<Voice> {
        self.list_voices()
            .map(|output| parse_voice_list(&output))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOICES: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 2  en-gb           --/M      English_(Great_Britain) gmw/en      (en 2)
 2  en-us           --/M      English_(America)  gmw/en-US           (en 3)
 5  fr-fr           --/M      French_(France)    roa/fr
";

    #[test]
    fn test_parse_voice_list() {
        let voices = parse_voice_list(VOICES);
        assert_eq!(voices.len(), 4);
        assert_eq!(voices[2], Voice::new("English_(America)", "en-US", true));
        assert!(voices[2].is_en_us());
        assert_eq!(voices[0].locale, "af");
    }

    #[test]
    fn test_normalize_locale() {
        assert_eq!(normalize_locale("en-us"), "en-US");
        assert_eq!(normalize_locale("en_US"), "en-US");
        assert_eq!(normalize_locale("fr"), "fr");
        assert_eq!(normalize_locale("sr-latn"), "sr-latn");
    }

    #[test]
    fn test_words_per_minute() {
        assert_eq!(words_per_minute(1.0), 175);
        assert_eq!(words_per_minute(2.0), 350);
        assert_eq!(words_per_minute(0.1), 80);
    }

    /// Write an executable stand-in for espeak-ng
    #[cfg(unix)]
    fn fake_espeak(dir: &tempfile::TempDir, script: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("espeak-ng");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[test]
    fn test_voices_from_command() {
        let dir = tempfile::tempdir().unwrap();
        let script = format!("#!/bin/sh\ncat <<'EOF'\n{}EOF\n", VOICES);
        let speech = EspeakSpeech::new(fake_espeak(&dir, &script))
            .with_list_timeout(Duration::from_secs(10));

        let voices = speech.voices();
        assert_eq!(voices.len(), 4);
        assert_eq!(voices[3].locale, "fr-FR");
    }

    #[cfg(unix)]
    #[test]
    fn test_stalled_voice_listing_is_cut_short() {
        let dir = tempfile::tempdir().unwrap();
        let speech = EspeakSpeech::new(fake_espeak(&dir, "#!/bin/sh\nsleep 3\n"));

        let started = Instant::now();
        let voices = speech.voices();
        let elapsed = started.elapsed();

        assert!(voices.is_empty());
        assert!(elapsed < Duration::from_secs(1), "voices() took {:?}", elapsed);
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_voice_listing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let speech = EspeakSpeech::new(fake_espeak(&dir, "#!/bin/sh\necho nope\nexit 1\n"))
            .with_list_timeout(Duration::from_secs(10));
        assert!(speech.voices().is_empty());
    }

    #[test]
    fn test_missing_command() {
        let speech = EspeakSpeech::new("/nonexistent/espeak-ng");
        assert!(speech.voices().is_empty());
        assert!(speech.cancel().is_ok());
        assert!(matches!(
            speech.speak(&Utterance::new("Time", "en-us", 2.0)),
            Err(HostError::SpeechFailed(_))
        ));
        // Empty utterances never spawn anything
        assert!(speech.speak(&Utterance::new("", "en-us", 2.0)).is_ok());
    }
}
