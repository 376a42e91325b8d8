//! multi-core implements the record-level dataflow engine behind the `multi`
//! command: a shell-level parallel map dispatcher that fans a delimited byte
//! stream out to N worker shell commands and merges their output back into
//! a single stream.
//!
//! The engine never touches `argv`; callers build an [`Options`] value (by
//! hand or via a CLI front end such as the `multi` binary) and pass it to
//! [`run`].

// modules
mod delimiter;
mod error;
mod exec;
mod fifo;
mod options;
mod pump;
mod splitter;
mod combiner;
mod strutil;
mod supervisor;
pub mod workflow; // ambient logging support, in the style of MDI-style workflows

// re-exports
pub use delimiter::is_delimiter;
pub use error::EngineError;
pub use options::Options;
pub use supervisor::run;

#[cfg(test)]
pub(crate) use strutil::{join, replace_first};
