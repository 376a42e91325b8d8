//! Built-in combiner policies, symmetric to [`crate::splitter`]: default
//! (concurrent, order-free) and sequential (single-threaded, order
//! preserving, stopping at the first short channel).

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::pump::{read_record_locked, write_all_retrying, Guarded, Pump};

/// Default combiner: one pump per present mapper-output FIFO, all sharing
/// standard output under a single write-mutex. Interleaving across mappers
/// is unspecified; each record is still written as a single atomic write.
pub fn run_default(stdout: File, sources: &[&Path]) {
    let stdout = Arc::new(Mutex::new(stdout));

    crossbeam::scope(|scope| {
        for path in sources {
            let stdout = Arc::clone(&stdout);
            scope.spawn(move |_| {
                let in_file = match File::open(path) {
                    Ok(f) => f,
                    Err(_) => return, // peer never opened its write end; skip this slot
                };
                let pump = Pump::new(Guarded::owned(in_file), Guarded::shared(stdout));
                pump.run();
            });
        }
    })
    .expect("combiner pump threads should not panic");
}

/// Sequential combiner: open every mapper-output FIFO up front, then read a
/// record from each in round-robin order starting at index 0, writing it
/// straight through to `stdout`. Stops at the first channel that reports
/// EOF; any trailing records still buffered on the other channels are
/// discarded.
pub fn run_sequential(mut stdout: File, sources: &[&Path]) -> io::Result<()> {
    let mut ins: Vec<File> = Vec::with_capacity(sources.len());
    for path in sources {
        ins.push(File::open(path)?);
    }
    if ins.is_empty() {
        return Ok(());
    }

    let mut buffer = Vec::new();
    let mut i = 0usize;
    loop {
        buffer.clear();
        let n = read_record_locked(&mut ins[i], &mut buffer)?;
        if n == 0 {
            break;
        }
        write_all_retrying(&mut stdout, &buffer[..n])?;
        i = (i + 1) % ins.len();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom, Write};

    #[test]
    fn sequential_combiner_interleaves_in_round_robin_order() {
        let dir = tempfile::tempdir().unwrap();
        let channel_contents = ["a\nd\n", "b\ne\n", "c\nf\n"];
        let fifo_paths: Vec<_> = channel_contents
            .iter()
            .enumerate()
            .map(|(i, contents)| {
                let path = dir.path().join(format!("in_{i}"));
                std::fs::write(&path, contents).unwrap();
                path
            })
            .collect();
        let path_refs: Vec<&Path> = fifo_paths.iter().map(|p| p.as_path()).collect();

        let mut stdout = tempfile::tempfile().unwrap();
        let out_for_read = stdout.try_clone().unwrap();
        run_sequential(stdout.try_clone().unwrap(), &path_refs).unwrap();
        stdout.flush().unwrap();

        let mut out_for_read = out_for_read;
        out_for_read.seek(SeekFrom::Start(0)).unwrap();
        let mut got = String::new();
        out_for_read.read_to_string(&mut got).unwrap();
        assert_eq!(got, "a\nb\nc\nd\ne\nf\n");
    }

    #[test]
    fn sequential_combiner_stops_at_first_short_channel() {
        let dir = tempfile::tempdir().unwrap();
        let channel_contents = ["a\nd\n", "b\n", "c\nf\n"];
        let fifo_paths: Vec<_> = channel_contents
            .iter()
            .enumerate()
            .map(|(i, contents)| {
                let path = dir.path().join(format!("in_{i}"));
                std::fs::write(&path, contents).unwrap();
                path
            })
            .collect();
        let path_refs: Vec<&Path> = fifo_paths.iter().map(|p| p.as_path()).collect();

        let mut stdout = tempfile::tempfile().unwrap();
        let out_for_read = stdout.try_clone().unwrap();
        run_sequential(stdout.try_clone().unwrap(), &path_refs).unwrap();
        stdout.flush().unwrap();

        // Channel 1 runs dry after "b\n"; "f\n" on channel 2 is never reached.
        let mut out_for_read = out_for_read;
        out_for_read.seek(SeekFrom::Start(0)).unwrap();
        let mut got = String::new();
        out_for_read.read_to_string(&mut got).unwrap();
        assert_eq!(got, "a\nb\nc\n");
    }
}
