//! Output sinks for composited frames: still images and video recordings.

pub(crate) mod ffmpeg;
pub(crate) mod sink;
pub(crate) mod still;
