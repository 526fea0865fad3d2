//! Stored form of quiz content
//!
//! Every frame carries its durable row id. Options children are
//! [`LeafFrame`]s, so composite frames cannot nest.

use super::archive::{DimensionArchive, FrameArchive, KeyedArchive, LeafArchive, QuizArchive};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Frame kind, the first half of a frame's identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameTag {
    Text,
    Image,
    Options,
}

/// (tag, row id): identifies a frame across edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameKey {
    pub tag: FrameTag,
    pub id: i64,
}

impl std::fmt::Display for FrameKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.tag {
            FrameTag::Text => "text",
            FrameTag::Image => "image",
            FrameTag::Options => "options",
        };
        write!(f, "{} frame #{}", tag, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFrame {
    pub id: i64,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFrame {
    pub id: i64,
    /// Resource name in the resource store
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub alt_text: Option<String>,
}

impl ImageFrame {
    /// True when filename or dimensions differ (alt text ignored)
    pub fn content_differs(&self, other: &ImageFrame) -> bool {
        self.filename != other.filename || self.width != other.width || self.height != other.height
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsFrame {
    pub id: i64,
    pub name: Option<String>,
    /// Children in priority order
    pub frames: Vec<KeyedFrame>,
}

/// Frame allowed inside an options group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LeafFrame {
    Text(TextFrame),
    Image(ImageFrame),
}

/// Options child with key flag and priority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedFrame {
    pub frame: LeafFrame,
    pub is_key: bool,
    pub priority: i64,
}

/// One unit of quiz content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame {
    Text(TextFrame),
    Image(ImageFrame),
    Options(OptionsFrame),
}

impl LeafFrame {
    pub fn id(&self) -> i64 {
        match self {
            LeafFrame::Text(f) => f.id,
            LeafFrame::Image(f) => f.id,
        }
    }

    pub fn key(&self) -> FrameKey {
        match self {
            LeafFrame::Text(f) => FrameKey {
                tag: FrameTag::Text,
                id: f.id,
            },
            LeafFrame::Image(f) => FrameKey {
                tag: FrameTag::Image,
                id: f.id,
            },
        }
    }

    pub fn to_archive(&self) -> LeafArchive {
        match self {
            LeafFrame::Text(f) => LeafArchive::Text {
                content: f.content.clone(),
            },
            LeafFrame::Image(f) => LeafArchive::Image {
                filename: f.filename.clone(),
                width: f.width,
                height: f.height,
                alt_text: f.alt_text.clone(),
            },
        }
    }
}

impl Frame {
    pub fn id(&self) -> i64 {
        match self {
            Frame::Text(f) => f.id,
            Frame::Image(f) => f.id,
            Frame::Options(f) => f.id,
        }
    }

    pub fn tag(&self) -> FrameTag {
        match self {
            Frame::Text(_) => FrameTag::Text,
            Frame::Image(_) => FrameTag::Image,
            Frame::Options(_) => FrameTag::Options,
        }
    }

    pub fn key(&self) -> FrameKey {
        FrameKey {
            tag: self.tag(),
            id: self.id(),
        }
    }

    pub fn to_archive(&self) -> FrameArchive {
        match self {
            Frame::Text(f) => FrameArchive::Text {
                content: f.content.clone(),
            },
            Frame::Image(f) => FrameArchive::Image {
                filename: f.filename.clone(),
                width: f.width,
                height: f.height,
                alt_text: f.alt_text.clone(),
            },
            Frame::Options(f) => FrameArchive::Options {
                name: f.name.clone(),
                frames: f
                    .frames
                    .iter()
                    .map(|k| KeyedArchive {
                        content: k.frame.to_archive(),
                        is_key: k.is_key,
                        priority: k.priority,
                    })
                    .collect(),
            },
        }
    }
}

impl From<LeafFrame> for Frame {
    fn from(leaf: LeafFrame) -> Self {
        match leaf {
            LeafFrame::Text(f) => Frame::Text(f),
            LeafFrame::Image(f) => Frame::Image(f),
        }
    }
}

impl LeafArchive {
    /// Materialize with the next free id, advancing the cursor by one
    pub fn materialize(&self, next_id: &mut i64) -> LeafFrame {
        let id = *next_id;
        *next_id += 1;
        match self {
            LeafArchive::Text { content } => LeafFrame::Text(TextFrame {
                id,
                content: content.clone(),
            }),
            LeafArchive::Image {
                filename,
                width,
                height,
                alt_text,
            } => LeafFrame::Image(ImageFrame {
                id,
                filename: filename.clone(),
                width: *width,
                height: *height,
                alt_text: alt_text.clone(),
            }),
        }
    }
}

impl FrameArchive {
    /// Materialize depth-first: an options frame takes the next id, then each
    /// child takes one id in order.
    pub fn materialize(&self, next_id: &mut i64) -> Frame {
        match self {
            FrameArchive::Text { content } => LeafArchive::Text {
                content: content.clone(),
            }
            .materialize(next_id)
            .into(),
            FrameArchive::Image {
                filename,
                width,
                height,
                alt_text,
            } => LeafArchive::Image {
                filename: filename.clone(),
                width: *width,
                height: *height,
                alt_text: alt_text.clone(),
            }
            .materialize(next_id)
            .into(),
            FrameArchive::Options { name, frames } => {
                let id = *next_id;
                *next_id += 1;
                let frames = frames
                    .iter()
                    .map(|k| KeyedFrame {
                        frame: k.content.materialize(next_id),
                        is_key: k.is_key,
                        priority: k.priority,
                    })
                    .collect();
                Frame::Options(OptionsFrame {
                    id,
                    name: name.clone(),
                    frames,
                })
            }
        }
    }
}

/// Materialize a frame list starting at `base`
pub fn materialize_frames(archives: &[FrameArchive], base: i64) -> Vec<Frame> {
    let mut next_id = base;
    archives
        .iter()
        .map(|archive| archive.materialize(&mut next_id))
        .collect()
}

/// A stored quiz with its content tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub name: Option<String>,
    /// Frames in display order
    pub frames: Vec<Frame>,
    pub dimensions: Vec<DimensionArchive>,
    pub creation_time: DateTime<Utc>,
    pub modification_time: Option<DateTime<Utc>>,
}

impl Quiz {
    /// Name used in logs and diagnostics
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => format!("quiz '{}'", name),
            None => format!("untitled quiz #{}", self.id),
        }
    }

    pub fn to_archive(&self) -> QuizArchive {
        QuizArchive {
            name: self.name.clone(),
            frames: self.frames.iter().map(Frame::to_archive).collect(),
            dimensions: self.dimensions.clone(),
            creation_time: self.creation_time,
            modification_time: self.modification_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(content: &str) -> FrameArchive {
        FrameArchive::Text {
            content: content.to_string(),
        }
    }

    fn keyed_text(content: &str, is_key: bool, priority: i64) -> KeyedArchive {
        KeyedArchive {
            content: LeafArchive::Text {
                content: content.to_string(),
            },
            is_key,
            priority,
        }
    }

    #[test]
    fn test_ids_assigned_depth_first_from_base() {
        let archives = vec![
            text("question"),
            FrameArchive::Options {
                name: None,
                frames: vec![keyed_text("a", true, 0), keyed_text("b", false, 1)],
            },
            text("footer"),
        ];

        let frames = materialize_frames(&archives, 10);

        assert_eq!(frames[0].id(), 10);
        match &frames[1] {
            Frame::Options(options) => {
                assert_eq!(options.id, 11);
                assert_eq!(options.frames[0].frame.id(), 12);
                assert_eq!(options.frames[1].frame.id(), 13);
                assert!(options.frames[0].is_key);
            }
            other => panic!("expected options frame, got {:?}", other),
        }
        assert_eq!(frames[2].id(), 14);
    }

    #[test]
    fn test_to_archive_drops_ids() {
        let archive = FrameArchive::Options {
            name: Some("choices".to_string()),
            frames: vec![keyed_text("a", false, 3)],
        };
        let frame = materialize_frames(std::slice::from_ref(&archive), 0).remove(0);
        assert_eq!(frame.to_archive(), archive);
    }

    #[test]
    fn test_frame_key_distinguishes_tags() {
        let text = Frame::Text(TextFrame {
            id: 1,
            content: String::new(),
        });
        let image = Frame::Image(ImageFrame {
            id: 1,
            filename: "a.png".to_string(),
            width: 1,
            height: 1,
            alt_text: None,
        });
        assert_ne!(text.key(), image.key());
    }
}
