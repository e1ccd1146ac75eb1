//! Single-file compression driver.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{Config, STDIN_MARK, STDOUT_MARK};
use crate::error::{Error, ErrorKind, Result};
use crate::stream::compress::{CompressConfig, CompressedOutputStream};
use crate::vlog;

use super::file_io::{open_input, open_output, CountingWriter};
use super::info::InfoListener;

const COPY_BUFFER: usize = 65_536;

/// Compresses one input into one output per `cfg`.
/// Returns `(bytes_read, bytes_written)`.
pub fn compress_file(cfg: &Config) -> Result<(u64, u64)> {
    let input_path = Path::new(&cfg.input_name);
    let input_meta = if cfg.input_name == STDIN_MARK {
        None
    } else {
        fs::metadata(input_path).ok()
    };

    let mut source = open_input(&cfg.input_name)?;
    let sink = open_output(&cfg.output_name, cfg.overwrite)?;
    let (sink, written_counter) = CountingWriter::new(sink);

    let stream_cfg = CompressConfig {
        entropy: cfg.entropy_codec,
        transforms: cfg.transform_chain.clone(),
        block_size: cfg.block_size,
        checksum: cfg.checksum,
        jobs: cfg.jobs,
        headerless: cfg.headerless,
        original_size: input_meta.as_ref().map(|m| m.len()),
    };

    vlog!(
        3,
        "Compressing {} -> {} (block {}, transform {}, entropy {}, jobs {})",
        cfg.input_name,
        cfg.output_name,
        cfg.block_size,
        cfg.transform_chain.names(),
        cfg.entropy_codec.name(),
        cfg.jobs
    );

    let start = Instant::now();
    let mut cos = CompressedOutputStream::new(sink, stream_cfg)?;
    if cfg.verbosity >= 4 {
        cos.add_listener(Arc::new(InfoListener::new()));
    }

    let mut buf = vec![0u8; COPY_BUFFER];
    let mut read_total = 0u64;
    loop {
        let n = source
            .read(&mut buf)
            .map_err(|e| Error::new(ErrorKind::ReadFile, format!("read failed: {e}")))?;
        if n == 0 {
            break;
        }
        read_total += n as u64;
        cos.write_all(&buf[..n]).map_err(unwrap_stream_error)?;
    }
    cos.close()?;
    drop(cos);

    let written = written_counter.load(Ordering::Relaxed);
    let elapsed = start.elapsed();
    let ratio = if read_total > 0 {
        written as f64 / read_total as f64
    } else {
        1.0
    };
    vlog!(
        2,
        "{}: {} -> {} bytes ({:.2}%) in {} ms",
        cfg.input_name,
        read_total,
        written,
        ratio * 100.0,
        elapsed.as_millis()
    );

    finish_output_file(cfg, input_meta.as_ref())?;
    Ok((read_total, written))
}

/// Propagates the input mtime onto the output file and honours
/// `remove_input`.
pub(crate) fn finish_output_file(cfg: &Config, input_meta: Option<&fs::Metadata>) -> Result<()> {
    let output_is_file = cfg.output_name != STDOUT_MARK && cfg.output_name != crate::config::NONE_MARK;
    if output_is_file {
        if let Some(meta) = input_meta {
            if let Ok(mtime) = meta.modified() {
                let ft = filetime::FileTime::from_system_time(mtime);
                let _ = filetime::set_file_mtime(Path::new(&cfg.output_name), ft);
            }
        }
    }
    if cfg.remove_input && cfg.input_name != STDIN_MARK {
        fs::remove_file(Path::new(&cfg.input_name)).map_err(|e| {
            Error::new(ErrorKind::WriteFile, format!("cannot remove {}: {e}", cfg.input_name))
        })?;
    }
    Ok(())
}

/// Pulls the library error back out of an `io::Error` raised by the stream
/// adapters, preserving its kind.
pub(crate) fn unwrap_stream_error(e: std::io::Error) -> Error {
    match e.downcast::<Error>() {
        Ok(inner) => inner,
        Err(e) => Error::new(ErrorKind::WriteFile, e.to_string()),
    }
}
