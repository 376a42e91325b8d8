//! Ambient diagnostic logging for the supervisor lifecycle (startup, fork,
//! signal receipt, teardown). Stderr-only; never touches the record stream
//! on stdout.

mod log;

pub use log::Log;
