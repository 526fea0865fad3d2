//! Edit history compaction

use crate::models::{Edit, Frame, FrameKey};

/// Collapse a raw edit history into the operations worth applying
///
/// Rules, applied as edits are read in order:
/// - an append later removed cancels out entirely
/// - an update of a pending append folds into the append
/// - updates of the same frame collapse to one (first `old`, last `new`)
/// - a remove of a pending update drops the update; the remove stays
/// - renames collapse to one (first `old`, last `new`)
///
/// Keeping the remove of an updated frame departs from the literal
/// "remove of a pending update is dropped" rule: dropping it would leave the
/// frame in the quiz, which the raw history deletes.
///
/// Output is removes, then appends, then updates, then the rename. Removes
/// go first so reinsertions never collide with rows about to be deleted.
/// Since that reorders structural edits, each append's `insert_index` is
/// rewritten to the frame's final position, found by replaying the raw
/// history's positions; appends are emitted in ascending final position.
pub fn optimize(edits: &[Edit]) -> Vec<Edit> {
    let mut removes: Vec<Edit> = Vec::new();
    let mut appends: Vec<Option<Frame>> = Vec::new();
    let mut updates: Vec<(Frame, Frame)> = Vec::new();
    let mut rename: Option<(Option<String>, Option<String>)> = None;
    let mut layout = Layout::default();

    for edit in edits {
        match edit {
            Edit::Append {
                frame,
                insert_index,
            } => {
                layout.insert(*insert_index, appends.len());
                appends.push(Some(frame.clone()));
            }

            Edit::Remove { frame, old_index } => {
                let key = frame.key();
                if let Some(i) = pending_append(&appends, key) {
                    appends[i] = None;
                    layout.remove_appended(i);
                    continue;
                }
                if let Some(i) = position(updates.iter().map(|(_, new)| new), key) {
                    updates.remove(i);
                }
                layout.remove_original(*old_index);
                removes.push(Edit::Remove {
                    frame: frame.clone(),
                    old_index: *old_index,
                });
            }

            Edit::Update { old, new } => {
                let key = new.key();
                if let Some(i) = pending_append(&appends, key) {
                    appends[i] = Some(new.clone());
                } else if let Some(i) = position(updates.iter().map(|(_, n)| n), key) {
                    updates[i].1 = new.clone();
                } else {
                    updates.push((old.clone(), new.clone()));
                }
            }

            Edit::Rename { old, new } => {
                rename = Some(match rename.take() {
                    Some((first, _)) => (first, new.clone()),
                    None => (old.clone(), new.clone()),
                });
            }
        }
    }

    let mut optimized = removes;
    for (append, insert_index) in layout.appended() {
        if let Some(frame) = appends[append].take() {
            optimized.push(Edit::Append {
                frame,
                insert_index,
            });
        }
    }
    optimized.extend(
        updates
            .into_iter()
            .filter(|(old, new)| old != new)
            .map(|(old, new)| Edit::Update { old, new }),
    );
    if let Some((old, new)) = rename {
        optimized.push(Edit::Rename { old, new });
    }
    optimized
}

fn position<'a>(mut frames: impl Iterator<Item = &'a Frame>, key: FrameKey) -> Option<usize> {
    frames.position(|f| f.key() == key)
}

fn pending_append(appends: &[Option<Frame>], key: FrameKey) -> Option<usize> {
    appends
        .iter()
        .position(|a| a.as_ref().is_some_and(|f| f.key() == key))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Original,
    /// Index into the pending appends
    Appended(usize),
}

/// The quiz's frame list as the raw history sees it
///
/// Frames already in the quiz are placeholders added as indices reach them,
/// so the quiz's length never needs to be known. Frames past the known
/// prefix are untouched and keep their relative order.
#[derive(Debug, Default)]
struct Layout {
    slots: Vec<Slot>,
}

impl Layout {
    fn reach(&mut self, len: usize) {
        if self.slots.len() < len {
            self.slots.resize(len, Slot::Original);
        }
    }

    fn insert(&mut self, index: usize, append: usize) {
        self.reach(index);
        self.slots.insert(index, Slot::Appended(append));
    }

    fn remove_original(&mut self, index: usize) {
        self.reach(index + 1);
        if self.slots[index] == Slot::Original {
            self.slots.remove(index);
        }
    }

    fn remove_appended(&mut self, append: usize) {
        self.slots.retain(|s| *s != Slot::Appended(append));
    }

    /// (append, final position) pairs in ascending position
    fn appended(&self) -> Vec<(usize, usize)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(pos, slot)| match slot {
                Slot::Appended(append) => Some((*append, pos)),
                Slot::Original => None,
            })
            .collect()
    }
}
