//! The render/control loop: shared context and the per-tick driver.

pub(crate) mod context;
pub(crate) mod driver;
