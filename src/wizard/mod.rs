pub(crate) mod config;
pub(crate) mod persist;
pub(crate) mod session;
pub(crate) mod stage;
