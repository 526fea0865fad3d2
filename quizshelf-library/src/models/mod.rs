//! Data models for quizzes, packages and edits

pub mod archive;
pub mod edit;
pub mod frame;

pub use archive::{
    DimensionArchive, FrameArchive, KeyedArchive, LeafArchive, Pack, QuizArchive, ResourceSource,
};
pub use edit::Edit;
pub use frame::{
    materialize_frames, Frame, FrameKey, FrameTag, ImageFrame, KeyedFrame, LeafFrame,
    OptionsFrame, Quiz, TextFrame,
};
