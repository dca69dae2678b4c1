//! Strongly-typed identifiers for bbtimer

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Version string of a deployed asset manifest.
///
/// Bumping it is the only thing that makes clients drop their cached assets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheVersion(String);

impl CacheVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key of the generation holding this version's assets
    pub fn generation_key(&self, app_prefix: &str) -> String {
        format!("{}{}", app_prefix, self.0)
    }
}

impl fmt::Display for CacheVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CacheVersion {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier for one countdown run (Ready -> Running -> Expired)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_key_joins_prefix_and_version() {
        let version = CacheVersion::new("0.2");
        assert_eq!(version.generation_key("bbtimer_"), "bbtimer_0.2");
        assert_eq!(version.generation_key(""), "0.2");
    }

    #[test]
    fn run_id_uniqueness() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn ids_serialize_deserialize() {
        let version = CacheVersion::new("1.0.3");
        let json = serde_json::to_string(&version).unwrap();
        assert_eq!(json, "\"1.0.3\"");
        let parsed: CacheVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(version, parsed);

        let run_id = RunId::new();
        let json = serde_json::to_string(&run_id).unwrap();
        let parsed: RunId = serde_json::from_str(&json).unwrap();
        assert_eq!(run_id, parsed);
    }
}
