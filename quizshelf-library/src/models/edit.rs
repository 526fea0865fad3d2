//! Described deltas to one quiz's content

use super::frame::Frame;
use serde::{Deserialize, Serialize};

/// One recorded mutation of a quiz
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Edit {
    /// Insert `frame` at `insert_index` among the quiz's frames
    Append { frame: Frame, insert_index: usize },
    /// Delete `frame`, which sat at `old_index` when the edit was recorded
    Remove { frame: Frame, old_index: usize },
    /// Replace `old` with `new`; both share a tag and row id
    Update { old: Frame, new: Frame },
    /// Change the quiz's display name
    Rename {
        old: Option<String>,
        new: Option<String>,
    },
}
