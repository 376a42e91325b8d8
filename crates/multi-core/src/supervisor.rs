//! The supervisor: creates the FIFO set, forks splitter, mappers, and
//! combiner, installs signal-driven teardown, and waits for the pipeline to
//! finish.

use std::fs::File;
use std::io;
use std::os::unix::io::FromRawFd;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use crate::combiner;
use crate::error::EngineError;
use crate::exec::{exec_combiner, exec_mapper, exec_splitter};
use crate::fifo::FifoSet;
use crate::options::Options;
use crate::splitter;
use crate::workflow::Log;

/// Run the dispatcher to completion. Blocks until the whole pipeline (one
/// splitter, `options.num_mapper` mappers, one combiner) has exited, then
/// tears down the temp directory and its FIFOs. Installs SIGINT/SIGTERM
/// handling for the duration of the run; either signal triggers the same
/// teardown path and a non-zero exit.
pub fn run(options: Options) -> Result<(), EngineError> {
    let log = Log::new("multi");
    log.initializing();
    log.print(&format!(
        "num_mapper={} sequential={} mapper_cmd={:?}",
        options.num_mapper, options.sequential, options.mapper_cmd
    ));

    // Installed before the temp directory or any FIFO exists, per §4.9 step
    // 2 preceding step 3: a SIGINT/SIGTERM delivered while `FifoSet::create`
    // is still running must still find a live handler. The slot starts
    // empty and is filled in once creation succeeds, so the handler has
    // nothing to tear down until there is something to tear down. Whichever
    // side (this function's own post-pipeline cleanup, or the signal
    // thread) takes the slot first performs the one teardown; the other
    // finds it already empty.
    let slot: Arc<Mutex<Option<Arc<FifoSet>>>> = Arc::new(Mutex::new(None));
    let signal_handle = install_signal_handler(Arc::clone(&slot));

    let fifos = match FifoSet::create(&temp_base_dir(), options.num_mapper) {
        Ok(fifos) => Arc::new(fifos),
        Err(e) => {
            signal_handle.close();
            return Err(e);
        }
    };
    log.print(&format!("created {}", fifos.tmpdir.display()));
    *slot.lock().unwrap() = Some(Arc::clone(&fifos));

    let result = run_pipeline(&options, &fifos, &log);

    if let Some(fifos) = slot.lock().unwrap().take() {
        fifos.teardown();
    }
    log.torn_down();
    signal_handle.close();

    result
}

/// `$TMPDIR` if set and non-empty, otherwise the platform temp directory.
fn temp_base_dir() -> PathBuf {
    match std::env::var_os("TMPDIR") {
        Some(val) if !val.is_empty() => PathBuf::from(val),
        _ => std::env::temp_dir(),
    }
}

enum ForkOutcome {
    Parent(Pid),
    Child,
}

fn fork_child(log: &Log, role: &str) -> Result<ForkOutcome, EngineError> {
    // SAFETY: this process has a signal-handling thread running, but the
    // child branch below never returns to arbitrary Rust code paths other
    // than the exec_* launchers and process::exit, matching the fork+exec
    // discipline the rest of this module assumes.
    match unsafe { fork() }.map_err(|errno| EngineError::Fork(io::Error::from(errno)))? {
        ForkResult::Parent { child } => {
            log.forked(role, child.as_raw());
            Ok(ForkOutcome::Parent(child))
        }
        ForkResult::Child => Ok(ForkOutcome::Child),
    }
}

fn run_pipeline(options: &Options, fifos: &FifoSet, log: &Log) -> Result<(), EngineError> {
    let mut children: Vec<Pid> = Vec::new();

    match fork_child(log, "splitter") {
        Ok(ForkOutcome::Parent(pid)) => children.push(pid),
        Ok(ForkOutcome::Child) => {
            let code = run_splitter_child(options, fifos);
            std::process::exit(code);
        }
        Err(e) => {
            wait_all(&children);
            return Err(e);
        }
    }

    for i in 0..options.num_mapper {
        match fork_child(log, "mapper") {
            Ok(ForkOutcome::Parent(pid)) => children.push(pid),
            Ok(ForkOutcome::Child) => {
                let code = run_mapper_child(options, fifos, i);
                std::process::exit(code);
            }
            Err(e) => {
                wait_all(&children);
                return Err(e);
            }
        }
    }

    match fork_child(log, "combiner") {
        Ok(ForkOutcome::Parent(pid)) => children.push(pid),
        Ok(ForkOutcome::Child) => {
            let code = run_combiner_child(options, fifos);
            std::process::exit(code);
        }
        Err(e) => {
            wait_all(&children);
            return Err(e);
        }
    }

    wait_all(&children);
    Ok(())
}

/// Wait for every child in `children`, then keep reaping until `waitpid`
/// reports no children remain (mirroring the original wait-loop-until-ECHILD
/// pattern, but scoped to the pids this run actually spawned).
fn wait_all(children: &[Pid]) {
    for &pid in children {
        loop {
            match waitpid(pid, None) {
                Ok(WaitStatus::StillAlive) => continue,
                Ok(_) => break,
                Err(nix::errno::Errno::ECHILD) => break,
                Err(nix::errno::Errno::EINTR) => continue,
                Err(_) => break,
            }
        }
    }
}

fn present_paths(fifos: &[Option<PathBuf>]) -> Vec<&Path> {
    fifos.iter().filter_map(|p| p.as_deref()).collect()
}

/// Run the splitter child's chosen policy to completion. Returns the exit
/// code the child process should use: 0 once a built-in policy finishes
/// (per §4.9 step 4), or 1 if `exec` itself failed to replace the process
/// for an external splitter command.
fn run_splitter_child(options: &Options, fifos: &FifoSet) -> i32 {
    // The splitter feeds the mappers' read ends, i.e. `in_fifos` (see the
    // data-flow diagram in the crate docs: stdin -> splitter -> in_fifos ->
    // mapper -> out_fifos -> combiner -> stdout).
    let in_paths = present_paths(&fifos.in_fifos);
    let stdin = unsafe { File::from_raw_fd(0) };
    let log = Log::new("multi-splitter");

    if options.sequential {
        let result = splitter::run_sequential(stdin, &in_paths);
        if let Err(e) = &result {
            log.print(&format!("sequential splitter stopped: {e}"));
        }
        return exit_code_of(result);
    }

    if let Some(cmd) = &options.splitter_cmd {
        let owned: Vec<PathBuf> = in_paths.iter().map(|p| p.to_path_buf()).collect();
        let err = exec_splitter(cmd, stdin, &owned);
        log.print(&format!("exec of splitter command failed: {err}"));
        return 1; // only reached if exec failed
    }

    splitter::run_default(stdin, &in_paths);
    0
}

/// Symmetric to [`run_splitter_child`] for the combiner role.
fn run_combiner_child(options: &Options, fifos: &FifoSet) -> i32 {
    // The combiner drains the mappers' write ends, i.e. `out_fifos`.
    let out_paths = present_paths(&fifos.out_fifos);
    let stdout = unsafe { File::from_raw_fd(1) };
    let log = Log::new("multi-combiner");

    if options.sequential {
        let result = combiner::run_sequential(stdout, &out_paths);
        if let Err(e) = &result {
            log.print(&format!("sequential combiner stopped: {e}"));
        }
        return exit_code_of(result);
    }

    if let Some(cmd) = &options.combiner_cmd {
        let owned: Vec<PathBuf> = out_paths.iter().map(|p| p.to_path_buf()).collect();
        let err = exec_combiner(cmd, &owned, stdout);
        log.print(&format!("exec of combiner command failed: {err}"));
        return 1; // only reached if exec failed
    }

    combiner::run_default(stdout, &out_paths);
    0
}

/// Open this mapper's FIFO pair and `exec` the mapper command. Only
/// returns (with exit code 1) if the slot's FIFOs never materialized or
/// `exec` failed; a successful `exec` never returns here at all.
fn run_mapper_child(options: &Options, fifos: &FifoSet, i: usize) -> i32 {
    let log = Log::new("multi-mapper");

    let (Some(in_path), Some(out_path)) = (&fifos.in_fifos[i], &fifos.out_fifos[i]) else {
        log.print(&format!("mapper {i}: FIFO slot missing, exiting"));
        return 1; // this slot's FIFO(s) failed to create; tolerated per §4.2
    };

    let in_file = match File::open(in_path) {
        Ok(f) => f,
        Err(e) => {
            log.print(&format!("mapper {i}: open of {} failed: {e}", in_path.display()));
            return 1;
        }
    };
    let out_file = match File::create(out_path) {
        Ok(f) => f,
        Err(e) => {
            log.print(&format!("mapper {i}: open of {} failed: {e}", out_path.display()));
            return 1;
        }
    };

    let err = exec_mapper(&options.mapper_cmd, in_file, out_file, i);
    log.print(&format!("mapper {i}: exec failed: {err}"));
    1
}

fn exit_code_of(result: io::Result<()>) -> i32 {
    if result.is_ok() {
        0
    } else {
        1
    }
}

/// Install a dedicated signal-handling thread that tears down whatever
/// `FifoSet` is in `slot` (if any) exactly once on SIGINT or SIGTERM and
/// then exits the process. Live from before the temp directory exists
/// (`slot` starts empty) through the end of the run, so a signal delivered
/// during `FifoSet::create` itself still finds a handler, and one delivered
/// after teardown has already happened (the slot is empty) is a no-op. The
/// returned handle can be closed once the pipeline has finished normally,
/// so the thread does not outlive a successful run.
fn install_signal_handler(slot: Arc<Mutex<Option<Arc<FifoSet>>>>) -> signal_hook::iterator::Handle {
    let mut signals = Signals::new([SIGINT, SIGTERM]).expect("signal_hook registration should not fail");
    let handle = signals.handle();

    std::thread::spawn(move || {
        let log = Log::new("multi");
        if let Some(signal) = signals.forever().next() {
            let name = if signal == SIGINT { "SIGINT" } else { "SIGTERM" };
            log.signal_received(name);
            if let Some(fifos) = slot.lock().unwrap().take() {
                fifos.teardown();
            }
            log.torn_down();
            std::process::exit(128 + signal);
        }
    });

    handle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_base_dir_prefers_nonempty_tmpdir() {
        std::env::set_var("TMPDIR", "/tmp");
        assert_eq!(temp_base_dir(), PathBuf::from("/tmp"));
        std::env::remove_var("TMPDIR");
    }

    #[test]
    fn present_paths_skips_absent_slots() {
        let slots = vec![Some(PathBuf::from("/a")), None, Some(PathBuf::from("/b"))];
        let paths = present_paths(&slots);
        assert_eq!(paths, vec![Path::new("/a"), Path::new("/b")]);
    }
}
