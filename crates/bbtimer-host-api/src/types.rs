//! Value types exchanged with platform capabilities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a playable sound resource (an asset URL)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoundRef(String);

impl SoundRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SoundRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A speech synthesis voice as reported by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    /// BCP-47-ish locale; Android reports `en_US` rather than `en-US`
    pub locale: String,
    /// Voice runs on-device (usable offline)
    pub is_local: bool,
}

impl Voice {
    pub fn new(name: impl Into<String>, locale: impl Into<String>, is_local: bool) -> Self {
        Self {
            name: name.into(),
            locale: locale.into(),
            is_local,
        }
    }

    /// Identifier used to persist a voice choice: `"<name> <locale>"`
    pub fn display_id(&self) -> String {
        format!("{} {}", self.name, self.locale)
    }

    /// Whether the voice speaks US English
    pub fn is_en_us(&self) -> bool {
        self.locale == "en-US" || self.locale == "en_US"
    }
}

/// One phrase to be spoken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub locale: String,
    pub voice: Option<Voice>,
    pub rate: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>, locale: impl Into<String>, rate: f32) -> Self {
        Self {
            text: text.into(),
            locale: locale.into(),
            voice: None,
            rate,
        }
    }

    /// Apply a voice; the utterance adopts the voice's locale
    pub fn set_voice(&mut self, voice: &Voice) {
        self.locale = voice.locale.clone();
        self.voice = Some(voice.clone());
    }
}

/// An outbound resource request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub url: String,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".into(),
            url: url.into(),
        }
    }

    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into().to_uppercase(),
            url: url.into(),
        }
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Key used to store and look up this request in a cache generation
    pub fn cache_key(&self) -> &str {
        &self.url
    }
}

/// A resource response, either fetched, stored, or synthesized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// HTTP status for a partial-content response, never cacheable
pub const STATUS_PARTIAL_CONTENT: u16 = 206;

/// HTTP status used when neither cache nor network can answer
pub const STATUS_REQUEST_TIMEOUT: u16 = 408;

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// A `text/plain` response
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, body.into().into_bytes()).with_header("Content-Type", "text/plain")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Status is in the 2xx range
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response can be stored as a complete asset
    pub fn is_cacheable(&self) -> bool {
        self.is_ok() && self.status != STATUS_PARTIAL_CONTENT
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// How a fetch should treat intermediate HTTP caches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Normal request
    #[default]
    Default,
    /// Bypass every HTTP cache (install-time precaching)
    NoStore,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_display_id_and_locale() {
        let voice = Voice::new("Samantha", "en-US", true);
        assert_eq!(voice.display_id(), "Samantha en-US");
        assert!(voice.is_en_us());
        assert!(Voice::new("Android", "en_US", true).is_en_us());
        assert!(!Voice::new("Daniel", "en-GB", true).is_en_us());
    }

    #[test]
    fn utterance_takes_voice_locale() {
        let mut utterance = Utterance::new("Time", "en-us", 2.0);
        utterance.set_voice(&Voice::new("Daniel", "en-GB", true));
        assert_eq!(utterance.locale, "en-GB");
        assert_eq!(utterance.voice.as_ref().unwrap().name, "Daniel");
    }

    #[test]
    fn cacheable_excludes_partial_content() {
        assert!(Response::new(200, "ok").is_cacheable());
        assert!(!Response::new(206, "part").is_cacheable());
        assert!(!Response::new(404, "missing").is_cacheable());
        assert!(Response::new(206, "part").is_ok());
    }

    #[test]
    fn text_response_sets_content_type() {
        let response = Response::text(408, "offline");
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert_eq!(response.body, b"offline");
    }

    #[test]
    fn request_method_normalized() {
        assert!(Request::new("get", "/timer/").is_get());
        assert!(!Request::new("post", "/timer/").is_get());
        assert_eq!(Request::get("/timer/index.html").cache_key(), "/timer/index.html");
    }
}
