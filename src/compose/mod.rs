//! Orientation compositing: the matrix chain and per-draw parameters handed to the backend.

pub(crate) mod compositor;
