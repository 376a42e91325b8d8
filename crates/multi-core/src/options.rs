//! The validated, immutable configuration the engine runs with. Built once
//! by a caller (typically the `multi-cli` binary's argv parser) and handed
//! to [`crate::run`]; the engine itself never touches `argv`.

use crate::error::EngineError;

/// Engine configuration. See the crate-level docs for the CLI surface that
/// produces it.
#[derive(Debug, Clone)]
pub struct Options {
    /// Number of mapper shells to run. Always `>= 1`; non-positive inputs
    /// are defaulted to 1 by [`Options::new`].
    pub num_mapper: usize,
    /// When true, use the single-threaded, order-preserving round-robin
    /// splitter/combiner and ignore `splitter_cmd`/`combiner_cmd`.
    pub sequential: bool,
    /// Required mapper shell command template.
    pub mapper_cmd: String,
    /// Optional external splitter command template (ignored when
    /// `sequential` is set).
    pub splitter_cmd: Option<String>,
    /// Optional external combiner command template (ignored when
    /// `sequential` is set).
    pub combiner_cmd: Option<String>,
}

impl Options {
    /// Build a validated `Options`. `num_mapper <= 0` is silently defaulted
    /// to 1, matching the CLI's `-n` defaulting rule. The only hard failure
    /// is a missing mapper command.
    pub fn new(
        num_mapper: i64,
        sequential: bool,
        mapper_cmd: Option<String>,
        splitter_cmd: Option<String>,
        combiner_cmd: Option<String>,
    ) -> Result<Options, EngineError> {
        let mapper_cmd = mapper_cmd
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EngineError::Configuration("mapper command (-m) is required".to_string()))?;

        let num_mapper = if num_mapper > 0 { num_mapper as usize } else { 1 };

        let (splitter_cmd, combiner_cmd) = if sequential {
            (None, None)
        } else {
            (splitter_cmd, combiner_cmd)
        };

        Ok(Options { num_mapper, sequential, mapper_cmd, splitter_cmd, combiner_cmd })
    }
}
