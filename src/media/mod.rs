pub(crate) mod blob;
pub(crate) mod preview;
pub(crate) mod probe;
