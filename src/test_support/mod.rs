//! Helpers shared by unit tests.

pub(crate) mod fixtures;
pub(crate) mod socket_guard;
