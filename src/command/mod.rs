//! Line-oriented control protocol: decoding, application, and transport.

pub(crate) mod apply;
pub(crate) mod channel;
pub(crate) mod parse;
