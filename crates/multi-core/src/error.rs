//! The small set of failures that are genuinely fatal to the engine.
//!
//! Most failure modes in this crate are tolerated locally (a FIFO slot that
//! could not be created, a pump that could not open its descriptor) and
//! never reach a caller as an `Err`. `EngineError` covers only the handful
//! of setup failures for which there is no sensible way to keep going.

use std::error::Error;
use std::fmt;
use std::io;

/// Fatal engine-level failures, returned by [`crate::Options::new`] and
/// [`crate::run`].
#[derive(Debug)]
pub enum EngineError {
    /// The caller-supplied [`crate::Options`] are not usable (e.g. no mapper
    /// command was given).
    Configuration(String),
    /// The temporary directory or one of its FIFOs could not be created.
    TmpDir { path: std::path::PathBuf, source: io::Error },
    /// `fork(2)` failed while spawning the splitter, a mapper, or the
    /// combiner.
    Fork(io::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Configuration(msg) => write!(f, "configuration error: {msg}"),
            EngineError::TmpDir { path, source } => {
                write!(f, "could not create temp directory {}: {source}", path.display())
            }
            EngineError::Fork(source) => write!(f, "fork failed: {source}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EngineError::Configuration(_) => None,
            EngineError::TmpDir { source, .. } => Some(source),
            EngineError::Fork(source) => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_displays_message() {
        let e = EngineError::Configuration("mapper command (-m) is required".to_string());
        assert_eq!(e.to_string(), "configuration error: mapper command (-m) is required");
    }

    #[test]
    fn tmpdir_error_includes_path() {
        let e = EngineError::TmpDir {
            path: "/tmp/multi-0".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.to_string().contains("/tmp/multi-0"));
        assert!(e.source().is_some());
    }
}
