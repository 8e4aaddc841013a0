//! Framestack Media - the decode side of the compositor
//!
//! The compositor never decodes anything itself. It talks to a [`Decoder`]:
//! opening and closing clips as they enter and leave the playhead, and
//! asking for the frame a clip shows. This crate defines that contract and
//! ships [`ThreadedDecoder`], a worker-pool implementation over any
//! [`MediaSource`].

pub mod cache;
pub mod decoder;
pub mod source;
pub mod threaded;

pub use cache::{FrameCache, FrameKey};
pub use decoder::{
    close_clip, open_clip, source_frame, Decoder, FrameFetch, FrameRequest, OpenMode,
};
pub use source::{MediaSource, TestPatternSource};
pub use threaded::ThreadedDecoder;
