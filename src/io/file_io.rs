//! Input/output resolution with the `STDIN`/`STDOUT`/`NONE` sentinels and
//! the overwrite policy.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::{NONE_MARK, STDIN_MARK, STDOUT_MARK};
use crate::error::{Error, ErrorKind, Result};

/// Resolves an input name to a byte source.
///
/// `STDIN` reads standard input; anything else must be an existing regular
/// file.
pub fn open_input(name: &str) -> Result<Box<dyn Read + Send>> {
    if name == STDIN_MARK {
        return Ok(Box::new(io::stdin()));
    }
    let path = Path::new(name);
    if path.is_dir() {
        return Err(Error::new(
            ErrorKind::OpenFile,
            format!("{name} is a directory, expected a file"),
        ));
    }
    let file = File::open(path)
        .map_err(|e| Error::new(ErrorKind::OpenFile, format!("cannot open {name}: {e}")))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Resolves an output name to a byte sink.
///
/// `STDOUT` writes standard output, `NONE` discards everything. Existing
/// files are only replaced when `overwrite` is set; directories are always
/// rejected.
pub fn open_output(name: &str, overwrite: bool) -> Result<Box<dyn Write + Send>> {
    if name == STDOUT_MARK {
        return Ok(Box::new(io::stdout()));
    }
    if name == NONE_MARK {
        return Ok(Box::new(io::sink()));
    }
    let path = Path::new(name);
    if path.is_dir() {
        return Err(Error::new(
            ErrorKind::OutputIsDir,
            format!("output {name} is a directory"),
        ));
    }
    if path.exists() && !overwrite {
        return Err(Error::new(
            ErrorKind::OverwriteFile,
            format!("{name} exists, use force to overwrite"),
        ));
    }
    let file = File::create(path)
        .map_err(|e| Error::new(ErrorKind::CreateFile, format!("cannot create {name}: {e}")))?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Write adapter counting bytes that pass through; the counter handle stays
/// readable after the writer was consumed by a stream.
pub struct CountingWriter<W: Write> {
    inner: W,
    count: Arc<AtomicU64>,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> (Self, Arc<AtomicU64>) {
        let count = Arc::new(AtomicU64::new(0));
        (CountingWriter { inner, count: Arc::clone(&count) }, count)
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
