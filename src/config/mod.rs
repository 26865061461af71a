//! Startup configuration and persisted lens calibration.

pub(crate) mod calibration;
pub(crate) mod pipeline;
