//! Offline voice catalog and discovery

use bbtimer_host_api::{SpeechEngine, Voice};
use tracing::{debug, info};

/// Non-empty observations in a row before the voice list is trusted.
///
/// Speech engines report a partial list while they are still loading.
pub const STABLE_OBSERVATIONS: u32 = 2;

/// Offline voices available for announcements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
}

impl VoiceCatalog {
    /// Build a catalog, keeping only voices that work offline
    pub fn from_voices(voices: impl IntoIterator<Item = Voice>) -> Self {
        Self {
            voices: voices.into_iter().filter(|v| v.is_local).collect(),
        }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn get(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn position_by_id(&self, id: &str) -> Option<usize> {
        self.voices.iter().position(|v| v.display_id() == id)
    }

    /// First US English voice, or the first voice at all
    pub fn default_index(&self) -> Option<usize> {
        if self.voices.is_empty() {
            return None;
        }
        Some(self.voices.iter().position(Voice::is_en_us).unwrap_or(0))
    }

    /// The stored voice if it is still installed, otherwise the default
    pub fn resolve(&self, stored_id: Option<&str>) -> Option<usize> {
        stored_id
            .and_then(|id| self.position_by_id(id))
            .or_else(|| self.default_index())
    }
}

/// Outcome of one discovery poll
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryPoll {
    /// Nothing reported yet, or the list is not stable
    Pending,
    /// The list is stable; polling should stop
    Ready(VoiceCatalog),
    /// Discovery already finished
    Finished,
}

/// Polls the speech engine until its voice list settles
#[derive(Debug, Default)]
pub struct VoiceDiscovery {
    consecutive: u32,
    finished: bool,
}

impl VoiceDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn poll(&mut self, speech: &dyn SpeechEngine) -> DiscoveryPoll {
        if self.finished {
            return DiscoveryPoll::Finished;
        }

        let voices = speech.voices();
        if voices.is_empty() {
            self.consecutive = 0;
            return DiscoveryPoll::Pending;
        }

        self.consecutive += 1;
        debug!(
            reported = voices.len(),
            consecutive = self.consecutive,
            "Speech engine reported voices"
        );

        if self.consecutive < STABLE_OBSERVATIONS {
            return DiscoveryPoll::Pending;
        }

        self.finished = true;
        let catalog = VoiceCatalog::from_voices(voices);
        info!(local_voices = catalog.len(), "Voice list accepted");
        DiscoveryPoll::Ready(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bbtimer_host_api::MockSpeech;

    fn voices() -> Vec<Voice> {
        vec![
            Voice::new("Amelie", "fr-CA", true),
            Voice::new("Samantha", "en_US", true),
            Voice::new("Google US English", "en-US", false),
        ]
    }

    #[test]
    fn test_catalog_keeps_local_voices() {
        let catalog = VoiceCatalog::from_voices(voices());
        assert_eq!(catalog.len(), 2);
        assert!(catalog.voices().iter().all(|v| v.is_local));
    }

    #[test]
    fn test_default_prefers_us_english() {
        let catalog = VoiceCatalog::from_voices(voices());
        assert_eq!(catalog.default_index(), Some(1));

        let catalog = VoiceCatalog::from_voices(vec![Voice::new("Amelie", "fr-CA", true)]);
        assert_eq!(catalog.default_index(), Some(0));

        assert_eq!(VoiceCatalog::default().default_index(), None);
    }

    #[test]
    fn test_stored_voice_wins() {
        let catalog = VoiceCatalog::from_voices(voices());
        assert_eq!(catalog.resolve(Some("Amelie fr-CA")), Some(0));
        assert_eq!(catalog.resolve(Some("Missing xx-XX")), Some(1));
        assert_eq!(catalog.resolve(None), Some(1));
    }

    #[test]
    fn test_needs_two_consecutive_observations() {
        let speech = MockSpeech::new();
        speech.script_voices(vec![
            vec![],
            voices(),
            vec![],
            voices(),
            voices(),
        ]);
        let mut discovery = VoiceDiscovery::new();

        assert_eq!(discovery.poll(&speech), DiscoveryPoll::Pending);
        assert_eq!(discovery.poll(&speech), DiscoveryPoll::Pending);
        // An empty report resets the streak
        assert_eq!(discovery.poll(&speech), DiscoveryPoll::Pending);
        assert_eq!(discovery.poll(&speech), DiscoveryPoll::Pending);

        match discovery.poll(&speech) {
            DiscoveryPoll::Ready(catalog) => assert_eq!(catalog.len(), 2),
            other => panic!("expected Ready, got {:?}", other),
        }
        assert!(discovery.is_finished());
        assert_eq!(discovery.poll(&speech), DiscoveryPoll::Finished);
        assert_eq!(speech.voice_polls(), 5);
    }
}
