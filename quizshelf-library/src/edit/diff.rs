//! Options-frame child diff
//!
//! Children are matched by (tag, row id). The diff is pure; applying it is
//! the job of [`super::apply`].

use crate::models::{FrameKey, KeyedFrame, LeafFrame};

/// One storage step that turns the old child list into the new one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionsChange {
    /// Child only present in the old list
    Remove(KeyedFrame),
    /// Child only present in the new list, at `index` in that list
    Insert { index: usize, item: KeyedFrame },
    /// Child present in both with different content
    Update { old: LeafFrame, new: LeafFrame },
    /// Child present in both with a flipped key flag
    SetKey { frame: FrameKey, is_key: bool },
    /// Child present in both with a different priority
    Reorder { frame: FrameKey, priority: i64 },
}

/// Diff two child lists: removes, inserts, then per-child changes in new-list
/// order
pub fn diff_options(old: &[KeyedFrame], new: &[KeyedFrame]) -> Vec<OptionsChange> {
    let find = |list: &[KeyedFrame], key: FrameKey| list.iter().position(|k| k.frame.key() == key);

    let mut changes: Vec<OptionsChange> = old
        .iter()
        .filter(|o| find(new, o.frame.key()).is_none())
        .cloned()
        .map(OptionsChange::Remove)
        .collect();

    for (index, item) in new.iter().enumerate() {
        if find(old, item.frame.key()).is_none() {
            changes.push(OptionsChange::Insert {
                index,
                item: item.clone(),
            });
        }
    }

    for item in new {
        let key = item.frame.key();
        let Some(previous) = find(old, key).map(|i| &old[i]) else {
            continue;
        };
        if previous.frame != item.frame {
            changes.push(OptionsChange::Update {
                old: previous.frame.clone(),
                new: item.frame.clone(),
            });
        }
        if previous.is_key != item.is_key {
            changes.push(OptionsChange::SetKey {
                frame: key,
                is_key: item.is_key,
            });
        }
        if previous.priority != item.priority {
            changes.push(OptionsChange::Reorder {
                frame: key,
                priority: item.priority,
            });
        }
    }

    changes
}
