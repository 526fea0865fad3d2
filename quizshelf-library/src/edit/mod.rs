//! Edit engine: compaction, options diffing and application of edits

pub mod apply;
pub mod diff;
pub mod insert;
pub mod optimize;

pub use apply::{apply, apply_edits};
pub use diff::{diff_options, OptionsChange};
pub use insert::{insert_frame, insert_quiz};
pub use optimize::optimize;
