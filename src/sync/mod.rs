pub(crate) mod barrier;
