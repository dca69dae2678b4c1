//! Recording capability doubles for unit/integration testing

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{
    AudioPlayer, FetchMode, HostError, HostResult, Network, NetworkError, Request, Response,
    SoundRef, SpeechEngine, Utterance, Voice, WorkerHost,
};

/// Mock audio player that records every sound it is asked to play
#[derive(Default)]
pub struct MockAudio {
    played: Mutex<Vec<SoundRef>>,

    /// Configure play to fail
    pub fail_play: Arc<Mutex<bool>>,
}

impl MockAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<SoundRef> {
        self.played.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.played.lock().unwrap().clear();
    }
}

impl AudioPlayer for MockAudio {
    fn play(&self, sound: &SoundRef) -> HostResult<()> {
        if *self.fail_play.lock().unwrap() {
            return Err(HostError::PlaybackFailed("Mock playback failure".into()));
        }
        self.played.lock().unwrap().push(sound.clone());
        Ok(())
    }
}

/// One call observed by [`MockSpeech`]
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechCall {
    Speak(Utterance),
    Cancel,
}

/// Mock speech engine.
///
/// Voice lists are scripted: each `voices()` call pops the next scripted
/// list, and the last one keeps being returned once the script runs out.
#[derive(Default)]
pub struct MockSpeech {
    calls: Mutex<Vec<SpeechCall>>,
    voice_script: Mutex<VecDeque<Vec<Voice>>>,
    last_voices: Mutex<Vec<Voice>>,
    voice_polls: AtomicUsize,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose voice list is complete from the first call
    pub fn with_voices(voices: Vec<Voice>) -> Self {
        let speech = Self::default();
        *speech.last_voices.lock().unwrap() = voices;
        speech
    }

    /// Queue the lists returned by successive `voices()` calls
    pub fn script_voices(&self, lists: Vec<Vec<Voice>>) {
        self.voice_script.lock().unwrap().extend(lists);
    }

    pub fn calls(&self) -> Vec<SpeechCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Texts of every spoken utterance, in order
    pub fn spoken(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SpeechCall::Speak(u) => Some(u.text),
                SpeechCall::Cancel => None,
            })
            .collect()
    }

    pub fn voice_polls(&self) -> usize {
        self.voice_polls.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl SpeechEngine for MockSpeech {
    fn speak(&self, utterance: &Utterance) -> HostResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(SpeechCall::Speak(utterance.clone()));
        Ok(())
    }

    fn cancel(&self) -> HostResult<()> {
        self.calls.lock().unwrap().push(SpeechCall::Cancel);
        Ok(())
    }

    fn voices(&self) -> Vec<Voice> {
        self.voice_polls.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last_voices.lock().unwrap();
        if let Some(next) = self.voice_script.lock().unwrap().pop_front() {
            *last = next;
        }
        last.clone()
    }
}

/// Mock network serving canned responses by URL
#[derive(Default)]
pub struct MockNetwork {
    responses: Mutex<HashMap<String, Response>>,
    fetched: Mutex<Vec<(String, FetchMode)>>,

    /// Simulate lost connectivity: every fetch fails
    pub offline: Arc<Mutex<bool>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `response` for `url`
    pub fn serve(&self, url: impl Into<String>, response: Response) {
        self.responses.lock().unwrap().insert(url.into(), response);
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    /// URLs fetched so far, with the mode used
    pub fn fetched(&self) -> Vec<(String, FetchMode)> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request, mode: FetchMode) -> Result<Response, NetworkError> {
        self.fetched
            .lock()
            .unwrap()
            .push((request.url.clone(), mode));

        if *self.offline.lock().unwrap() {
            return Err(NetworkError::Unavailable("mock network offline".into()));
        }

        let response = self
            .responses
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| Response::text(404, "Not Found"));
        Ok(response)
    }
}

/// Mock worker host counting lifecycle calls
#[derive(Default)]
pub struct MockWorkerHost {
    skip_waiting_calls: AtomicUsize,
    claim_calls: AtomicUsize,

    /// Configure claim to fail
    pub fail_claim: Arc<Mutex<bool>>,
}

impl MockWorkerHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_waiting_calls(&self) -> usize {
        self.skip_waiting_calls.load(Ordering::SeqCst)
    }

    pub fn claim_calls(&self) -> usize {
        self.claim_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerHost for MockWorkerHost {
    async fn skip_waiting(&self) -> HostResult<()> {
        self.skip_waiting_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn claim_clients(&self) -> HostResult<()> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_claim.lock().unwrap() {
            return Err(HostError::Internal("Mock claim failure".into()));
        }
        Ok(())
    }
}
