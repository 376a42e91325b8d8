//! FIFO set manager: creates and tears down the `in_<i>`/`out_<i>` named
//! pipes that connect splitter, mappers, and combiner.

use std::io;
use std::path::{Path, PathBuf};

use nix::sys::stat::Mode;
use nix::unistd::mkfifo;

use crate::error::EngineError;

/// The two ordered arrays of FIFO paths living under one temp directory.
///
/// A slot is `None` when its FIFO could not be created; per the tolerance
/// rule in §4.2/§4.7, downstream components simply skip absent slots rather
/// than failing the whole run.
pub struct FifoSet {
    pub tmpdir: PathBuf,
    pub in_fifos: Vec<Option<PathBuf>>,
    pub out_fifos: Vec<Option<PathBuf>>,
}

fn fifo_mode() -> Mode {
    Mode::from_bits_truncate(0o600)
}

fn tmpdir_mode() -> Mode {
    Mode::from_bits_truncate(0o700)
}

impl FifoSet {
    /// Create a fresh `<base>/multi-<k>` directory (mode 0700) for the
    /// smallest non-colliding `k`, then create `n` `in_i`/`out_i` FIFO pairs
    /// (mode 0600) inside it.
    pub fn create(base: &Path, n: usize) -> Result<FifoSet, EngineError> {
        let tmpdir = create_tmpdir(base)?;

        let mut in_fifos = Vec::with_capacity(n);
        let mut out_fifos = Vec::with_capacity(n);
        for i in 0..n {
            in_fifos.push(make_fifo(&tmpdir, "in", i));
            out_fifos.push(make_fifo(&tmpdir, "out", i));
        }

        Ok(FifoSet { tmpdir, in_fifos, out_fifos })
    }

    /// Unlink every FIFO that was successfully created, then remove the
    /// temp directory. Safe to call more than once: once the directory is
    /// gone, later calls find nothing left to remove and do nothing.
    pub fn teardown(&self) {
        for slot in self.in_fifos.iter().chain(self.out_fifos.iter()) {
            if let Some(path) = slot {
                let _ = std::fs::remove_file(path);
            }
        }
        let _ = std::fs::remove_dir(&self.tmpdir);
    }

    /// The subset of `in_fifos` that were actually created, in order.
    pub fn present_in_fifos(&self) -> impl Iterator<Item = &PathBuf> {
        self.in_fifos.iter().filter_map(|s| s.as_ref())
    }

    /// The subset of `out_fifos` that were actually created, in order.
    pub fn present_out_fifos(&self) -> impl Iterator<Item = &PathBuf> {
        self.out_fifos.iter().filter_map(|s| s.as_ref())
    }
}

fn make_fifo(tmpdir: &Path, prefix: &str, i: usize) -> Option<PathBuf> {
    let path = tmpdir.join(format!("{prefix}_{i}"));
    match mkfifo(&path, fifo_mode()) {
        Ok(()) => Some(path),
        Err(_) => None,
    }
}

fn create_tmpdir(base: &Path) -> Result<PathBuf, EngineError> {
    for k in 0.. {
        let candidate = base.join(format!("multi-{k}"));
        match std::fs::DirBuilder::new().mode_for_unix(tmpdir_mode()).create(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(EngineError::TmpDir { path: candidate, source: e });
            }
        }
    }
    unreachable!("k ranges over all usize values before this loop could exit otherwise")
}

/// Small extension trait so `create_tmpdir` can ask for mode 0700 without
/// reaching for the `std::os::unix::fs::DirBuilderExt` import at every call
/// site.
trait DirBuilderModeExt {
    fn mode_for_unix(&mut self, mode: Mode) -> &mut Self;
}

impl DirBuilderModeExt for std::fs::DirBuilder {
    fn mode_for_unix(&mut self, mode: Mode) -> &mut Self {
        use std::os::unix::fs::DirBuilderExt;
        self.mode(mode.bits() as u32);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_makes_n_fifo_pairs() {
        let base = tempfile::tempdir().unwrap();
        let set = FifoSet::create(base.path(), 3).unwrap();
        assert_eq!(set.in_fifos.len(), 3);
        assert_eq!(set.out_fifos.len(), 3);
        for slot in set.in_fifos.iter().chain(set.out_fifos.iter()) {
            let path = slot.as_ref().expect("fifo should have been created");
            assert!(path.exists());
        }
        set.teardown();
    }

    #[test]
    fn smallest_non_colliding_k_is_used() {
        let base = tempfile::tempdir().unwrap();
        std::fs::create_dir(base.path().join("multi-0")).unwrap();
        let set = FifoSet::create(base.path(), 1).unwrap();
        assert_eq!(set.tmpdir, base.path().join("multi-1"));
        set.teardown();
    }

    #[test]
    fn teardown_is_idempotent() {
        let base = tempfile::tempdir().unwrap();
        let set = FifoSet::create(base.path(), 2).unwrap();
        set.teardown();
        assert!(!set.tmpdir.exists());
        set.teardown(); // second call must not panic
    }

    #[test]
    fn teardown_removes_tmpdir_entirely() {
        let base = tempfile::tempdir().unwrap();
        let set = FifoSet::create(base.path(), 2).unwrap();
        let tmpdir = set.tmpdir.clone();
        set.teardown();
        assert!(!tmpdir.exists());
    }
}
