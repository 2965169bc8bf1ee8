//! Host configuration.
//!
//! Qcode prefixes, the main-channel marker and the location types vary
//! between publishers. A JSON file may override any subset of them.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;

const DEFAULT_TEXT_DIRECTION: &str = "ltr";
const CHANNEL_PREFIX: &str = "imchn";
const SECTION_PREFIX: &str = "imsection";
const MAIN_CHANNEL_MARKER: &str = "imext:main";

/// Host-tunable vocabulary for a [`NewsItem`](crate::NewsItem).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Direction reported when the document does not declare one.
    pub default_text_direction: String,

    /// Substring of a service qcode that marks it as a channel.
    pub channel_qcode_prefix: String,

    /// Substring of a service qcode that marks it as a section.
    pub section_qcode_prefix: String,

    /// `why` value flagging the main channel.
    pub main_channel_marker: String,

    /// Link types returned by location queries.
    pub location_types: Vec<String>,
}

fn default_location_types() -> Vec<String> {
    vec![
        "x-im/place".to_string(),
        "x-im/polygon".to_string(),
        "x-im/position".to_string(),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_text_direction: DEFAULT_TEXT_DIRECTION.to_string(),
            channel_qcode_prefix: CHANNEL_PREFIX.to_string(),
            section_qcode_prefix: SECTION_PREFIX.to_string(),
            main_channel_marker: MAIN_CHANNEL_MARKER.to_string(),
            location_types: default_location_types(),
        }
    }
}

impl Config {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read config from a file that must exist.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load config from a file, or return defaults if it does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json(r#"{"default_text_direction": "rtl"}"#).unwrap();
        assert_eq!(config.default_text_direction, "rtl");
        assert_eq!(config.channel_qcode_prefix, "imchn");
        assert_eq!(config.location_types.len(), 3);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(Config::from_json("{not json").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("newsitem.json");
        fs::write(&path, r#"{"location_types": ["x-im/place"], "main_channel_marker": "x:main"}"#)
            .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.location_types, vec!["x-im/place"]);
        assert_eq!(config.main_channel_marker, "x:main");
        assert_eq!(config.section_qcode_prefix, "imsection");
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load("/nonexistent/newsitem.json").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Config::from_file(dir.path().join("typo.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
