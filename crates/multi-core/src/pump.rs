//! The buffered record pump (`pomp`): moves one record at a time from an
//! input descriptor to an output descriptor, optionally serialized against
//! sibling pumps by a shared mutex on either side.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

use crate::delimiter::is_delimiter;

const INITIAL_CAPACITY: usize = 1024;

/// A descriptor a pump reads from or writes to, either exclusively owned by
/// this pump (no locking, uncontended by construction) or shared with sibling
/// pumps behind a mutex.
pub enum Guarded {
    Owned(RefCell<File>),
    Shared(Arc<Mutex<File>>),
}

impl Guarded {
    pub fn owned(file: File) -> Self {
        Guarded::Owned(RefCell::new(file))
    }

    pub fn shared(file: Arc<Mutex<File>>) -> Self {
        Guarded::Shared(file)
    }
}

/// One record-at-a-time mover between a `Guarded` input and a `Guarded`
/// output. A pump has no observable ordering relative to its siblings; it
/// only guarantees that each record it reads in full, it writes in full.
pub struct Pump {
    in_dsc: Guarded,
    out_dsc: Guarded,
}

impl Pump {
    pub fn new(in_dsc: Guarded, out_dsc: Guarded) -> Self {
        Self { in_dsc, out_dsc }
    }

    /// Run until input EOF or the first write failure, whichever comes
    /// first.
    pub fn run(&self) {
        let mut buffer = Vec::with_capacity(INITIAL_CAPACITY);
        loop {
            let n = match read_record(&self.in_dsc, &mut buffer) {
                Ok(n) => n,
                Err(_) => break,
            };
            if n == 0 {
                break;
            }
            if write_record(&self.out_dsc, &buffer[..n]).is_err() {
                break;
            }
        }
    }
}

fn read_record(in_dsc: &Guarded, buffer: &mut Vec<u8>) -> io::Result<usize> {
    buffer.clear();
    match in_dsc {
        Guarded::Owned(cell) => read_record_locked(&mut cell.borrow_mut(), buffer),
        Guarded::Shared(arc) => {
            let mut file = arc.lock().unwrap();
            read_record_locked(&mut file, buffer)
        }
    }
}

/// Read one record (including its trailing delimiter, or the final partial
/// record at EOF) into `buffer`, returning its length. Used directly by the
/// sequential splitter/combiner, which are single-threaded and need no
/// locking at all.
pub(crate) fn read_record_locked(file: &mut File, buffer: &mut Vec<u8>) -> io::Result<usize> {
    let mut byte = [0u8; 1];
    loop {
        if buffer.len() == buffer.capacity() {
            let additional = buffer.capacity().max(INITIAL_CAPACITY);
            buffer.reserve(additional);
        }
        let n = file.read(&mut byte)?;
        if n == 0 {
            break;
        }
        buffer.push(byte[0]);
        if is_delimiter(byte[0]) {
            break;
        }
    }
    Ok(buffer.len())
}

fn write_record(out_dsc: &Guarded, data: &[u8]) -> io::Result<()> {
    match out_dsc {
        Guarded::Owned(cell) => write_all_retrying(&mut cell.borrow_mut(), data),
        Guarded::Shared(arc) => {
            let mut file = arc.lock().unwrap();
            write_all_retrying(&mut file, data)
        }
    }
}

/// Write `data` in full to `file`, retrying on short writes.
pub(crate) fn write_all_retrying(file: &mut File, data: &[u8]) -> io::Result<()> {
    let mut written = 0;
    while written < data.len() {
        let n = file.write(&data[written..])?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "pump write advanced zero bytes"));
        }
        written += n;
    }
    Ok(())
}
