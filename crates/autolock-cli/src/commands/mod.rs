//! Command handlers.

pub(crate) mod interval;
pub(crate) mod watch;
