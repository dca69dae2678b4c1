//! Capability traits

use async_trait::async_trait;
use thiserror::Error;

use crate::{FetchMode, Request, Response, SoundRef, Utterance, Voice};

/// Errors from platform capabilities
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    #[error("Speech failed: {0}")]
    SpeechFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Errors from a network fetch.
///
/// HTTP error statuses are not errors; they come back as a [`Response`].
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Network unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

/// Plays short sound resources. Fire-and-forget: completion is not reported.
pub trait AudioPlayer: Send + Sync {
    fn play(&self, sound: &SoundRef) -> HostResult<()>;
}

/// Speech synthesis
pub trait SpeechEngine: Send + Sync {
    /// Queue an utterance; returns once it is handed to the engine
    fn speak(&self, utterance: &Utterance) -> HostResult<()>;

    /// Stop whatever is currently being spoken
    fn cancel(&self) -> HostResult<()>;

    /// Voices known right now.
    ///
    /// Platforms populate this asynchronously: early calls may return an
    /// empty or incomplete list.
    fn voices(&self) -> Vec<Voice>;
}

/// Outbound resource fetches
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request, mode: FetchMode) -> Result<Response, NetworkError>;
}

/// Lifecycle hooks of the installable app worker
#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// Take over from a previous installation without waiting for its clients to close
    async fn skip_waiting(&self) -> HostResult<()>;

    /// Start controlling every open client page without a reload
    async fn claim_clients(&self) -> HostResult<()>;
}
