//! Frame requests and the per-tick session manager that drives them.

pub(crate) mod manager;
pub(crate) mod request;
