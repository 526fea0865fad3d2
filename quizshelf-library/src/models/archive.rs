//! Archive (package) form of quizzes
//!
//! These are the transient types a package decodes into. They carry no row
//! ids; ids are assigned when the archive is materialized or inserted.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decoded package: quizzes plus the resource blobs they may reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pack {
    pub quizzes: Vec<QuizArchive>,
    /// Resource name to lazily decoded bytes; names are unique within a pack
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceSource>,
}

/// Archive form of one quiz
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizArchive {
    pub name: Option<String>,
    #[serde(default)]
    pub frames: Vec<FrameArchive>,
    #[serde(default)]
    pub dimensions: Vec<DimensionArchive>,
    pub creation_time: DateTime<Utc>,
    #[serde(default)]
    pub modification_time: Option<DateTime<Utc>>,
}

/// Dimension tag attached to a quiz
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionArchive {
    pub name: String,
    #[serde(default = "default_intensity")]
    pub intensity: f64,
}

fn default_intensity() -> f64 {
    1.0
}

/// Archive form of a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FrameArchive {
    Text {
        content: String,
    },
    Image {
        filename: String,
        width: u32,
        height: u32,
        #[serde(default)]
        alt_text: Option<String>,
    },
    Options {
        #[serde(default)]
        name: Option<String>,
        frames: Vec<KeyedArchive>,
    },
}

/// Archive form of a frame allowed inside an options group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LeafArchive {
    Text {
        content: String,
    },
    Image {
        filename: String,
        width: u32,
        height: u32,
        #[serde(default)]
        alt_text: Option<String>,
    },
}

/// Options child with its key flag and ordering priority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedArchive {
    pub content: LeafArchive,
    #[serde(default)]
    pub is_key: bool,
    #[serde(default)]
    pub priority: i64,
}

impl From<LeafArchive> for FrameArchive {
    fn from(leaf: LeafArchive) -> Self {
        match leaf {
            LeafArchive::Text { content } => FrameArchive::Text { content },
            LeafArchive::Image {
                filename,
                width,
                height,
                alt_text,
            } => FrameArchive::Image {
                filename,
                width,
                height,
                alt_text,
            },
        }
    }
}

/// Resource bytes as carried in a package
///
/// Packages hold resources base64-encoded; the bytes are only decoded when a
/// resource is actually copied, so unreferenced blobs cost no decode work.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceSource {
    encoded: String,
}

impl ResourceSource {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            encoded: STANDARD.encode(bytes),
        }
    }

    /// Decode the resource bytes
    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        STANDARD
            .decode(self.encoded.as_bytes())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Size of the encoded form
    pub fn encoded_len(&self) -> usize {
        self.encoded.len()
    }
}

impl std::fmt::Debug for ResourceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ResourceSource({} encoded bytes)", self.encoded.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_source_decodes_lazily() {
        let source = ResourceSource::from_bytes(b"\x89PNG fake");
        assert_eq!(source.read().unwrap(), b"\x89PNG fake");
    }

    #[test]
    fn test_corrupt_resource_is_invalid_data() {
        let source: ResourceSource = serde_json::from_str("\"not base64!!\"").unwrap();
        let err = source.read().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_nested_options_rejected() {
        let json = r#"{
            "type": "options",
            "frames": [
                { "content": { "type": "options", "frames": [] }, "is_key": false, "priority": 0 }
            ]
        }"#;
        assert!(serde_json::from_str::<FrameArchive>(json).is_err());
    }

    #[test]
    fn test_dimension_intensity_defaults() {
        let dim: DimensionArchive = serde_json::from_str(r#"{"name":"Optics"}"#).unwrap();
        assert_eq!(dim.intensity, 1.0);
    }
}
