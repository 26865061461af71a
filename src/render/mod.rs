//! Rendering backend seam: off-screen targets, draws, and display presentation.

pub(crate) mod backend;
pub(crate) mod cpu;
pub(crate) mod layout;
