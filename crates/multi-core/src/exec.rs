//! External command launchers: replace the calling process with
//! `sh -c <cmd>` after wiring file descriptors and substituting the `{}`
//! FIFO-path placeholder. Each function here only returns if `exec` itself
//! fails (it is always called from a freshly forked child, never from the
//! supervisor).

use std::os::unix::io::AsRawFd;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;

use crate::strutil::{join, replace_first};

/// `exec_mapper`: wire `in_dsc`/`out_dsc` to fd 0/1, export `MAPPER_ID`,
/// and replace the process with `sh -c cmd`. Only returns (with an error)
/// if `exec` fails.
pub fn exec_mapper(cmd: &str, in_dsc: impl AsRawFd, out_dsc: impl AsRawFd, mapper_id: usize) -> std::io::Error {
    let mut command = Command::new("sh");
    command.arg("-c").arg(cmd);
    command.env("MAPPER_ID", mapper_id.to_string());
    wire_stdio(&mut command, &in_dsc, &out_dsc);
    command.exec()
}

/// `exec_splitter`: substitute `{}` in `cmd` with the space-joined output
/// FIFO paths, wire `in_dsc` to fd 0, and replace the process with
/// `sh -c <expanded>`.
pub fn exec_splitter(cmd: &str, in_dsc: impl AsRawFd, out_fifos: &[std::path::PathBuf]) -> std::io::Error {
    let expanded = replace_first(cmd, &join_paths(out_fifos));
    let mut command = Command::new("sh");
    command.arg("-c").arg(expanded);
    wire_stdin(&mut command, &in_dsc);
    command.exec()
}

/// `exec_combiner`: substitute `{}` in `cmd` with the space-joined input
/// FIFO paths, wire `out_dsc` to fd **1** (the documented role; see
/// `DESIGN.md` for why this deliberately differs from the dup-over-fd-0
/// behavior of the program this was distilled from), and replace the
/// process with `sh -c <expanded>`.
pub fn exec_combiner(cmd: &str, in_fifos: &[std::path::PathBuf], out_dsc: impl AsRawFd) -> std::io::Error {
    let expanded = replace_first(cmd, &join_paths(in_fifos));
    let mut command = Command::new("sh");
    command.arg("-c").arg(expanded);
    wire_stdout(&mut command, &out_dsc);
    command.exec()
}

fn join_paths(paths: &[std::path::PathBuf]) -> String {
    let strs: Vec<String> = paths.iter().map(|p: &std::path::PathBuf| path_to_string(p)).collect();
    join(&strs, " ")
}

fn path_to_string(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

fn wire_stdio(command: &mut Command, in_dsc: &impl AsRawFd, out_dsc: &impl AsRawFd) {
    wire_stdin(command, in_dsc);
    wire_stdout(command, out_dsc);
}

fn wire_stdin(command: &mut Command, in_dsc: &impl AsRawFd) {
    use std::os::unix::io::FromRawFd;
    // SAFETY: the caller (supervisor/splitter/mapper setup) owns `in_dsc`
    // for the remaining lifetime of this already-forked child; duplicating
    // it onto fd 0 via Stdio does not close the original descriptor.
    let dup = unsafe { std::fs::File::from_raw_fd(libc_dup(in_dsc.as_raw_fd())) };
    command.stdin(std::process::Stdio::from(dup));
}

fn wire_stdout(command: &mut Command, out_dsc: &impl AsRawFd) {
    use std::os::unix::io::FromRawFd;
    let dup = unsafe { std::fs::File::from_raw_fd(libc_dup(out_dsc.as_raw_fd())) };
    command.stdout(std::process::Stdio::from(dup));
}

fn libc_dup(fd: std::os::unix::io::RawFd) -> std::os::unix::io::RawFd {
    nix::unistd::dup(fd).expect("dup of an engine-owned descriptor should not fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_paths_space_separates() {
        let paths = vec![Path::new("/tmp/multi-0/out_0").to_path_buf(), Path::new("/tmp/multi-0/out_1").to_path_buf()];
        assert_eq!(join_paths(&paths), "/tmp/multi-0/out_0 /tmp/multi-0/out_1");
    }
}
