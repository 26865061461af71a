//! Camera-side collaborators: image payloads, input sources, and per-camera capture threads.

pub(crate) mod image;
pub(crate) mod source;
pub(crate) mod thread;
