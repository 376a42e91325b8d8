//! Built-in splitter policies: default (concurrent, order-free) and
//! sequential (single-threaded, order-preserving round robin).

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::pump::{read_record_locked, write_all_retrying, Guarded, Pump};

/// Default splitter: spawn one pump per present mapper-input FIFO, all
/// sharing standard input under a single read-mutex. Which pump wins a
/// given record is unspecified; each record is delivered whole to exactly
/// one mapper.
pub fn run_default(stdin: File, targets: &[&Path]) {
    let stdin = Arc::new(Mutex::new(stdin));

    crossbeam::scope(|scope| {
        for path in targets {
            let stdin = Arc::clone(&stdin);
            scope.spawn(move |_| {
                let out_file = match File::create(path) {
                    Ok(f) => f,
                    Err(_) => return, // peer never opened its read end; skip this slot
                };
                let pump = Pump::new(Guarded::shared(stdin), Guarded::owned(out_file));
                pump.run();
            });
        }
    })
    .expect("splitter pump threads should not panic");
}

/// Sequential splitter: open every mapper-input FIFO up front, then route
/// input records to them in strict round-robin order, starting at index 0.
pub fn run_sequential(mut stdin: File, targets: &[&Path]) -> io::Result<()> {
    let mut outs: Vec<File> = Vec::with_capacity(targets.len());
    for path in targets {
        outs.push(File::create(path)?);
    }
    if outs.is_empty() {
        return Ok(());
    }

    let mut buffer = Vec::new();
    let mut i = 0usize;
    loop {
        buffer.clear();
        let n = read_record_locked(&mut stdin, &mut buffer)?;
        if n == 0 {
            break;
        }
        write_all_retrying(&mut outs[i], &buffer[..n])?;
        i = (i + 1) % outs.len();
    }
    Ok(())
}
