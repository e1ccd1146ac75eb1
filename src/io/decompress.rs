//! Single-file decompression driver.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{Config, STDIN_MARK};
use crate::error::{Error, ErrorKind, Result};
use crate::stream::decompress::{CompressedInputStream, DecompressConfig};
use crate::stream::header::StreamParams;
use crate::vlog;

use super::compress::finish_output_file;
use super::file_io::{open_input, open_output};
use super::info::InfoListener;

const COPY_BUFFER: usize = 65_536;

/// Decompresses one input into one output per `cfg`.
/// Returns `(bytes_read_estimate, bytes_written)`.
pub fn decompress_file(cfg: &Config) -> Result<(u64, u64)> {
    let input_meta = if cfg.input_name == STDIN_MARK {
        None
    } else {
        fs::metadata(Path::new(&cfg.input_name)).ok()
    };

    let source = open_input(&cfg.input_name)?;
    let mut sink = open_output(&cfg.output_name, cfg.overwrite)?;

    let headerless = if cfg.headerless {
        Some(StreamParams {
            version: crate::stream::BITSTREAM_VERSION,
            checksum: cfg.checksum,
            entropy: cfg.entropy_codec,
            transforms: cfg.transform_chain.clone(),
            block_size: cfg.block_size,
            original_size: cfg.output_size,
        })
    } else {
        None
    };

    let stream_cfg = DecompressConfig {
        jobs: cfg.jobs,
        from_block: cfg.from_block,
        to_block: cfg.to_block,
        headerless,
    };

    vlog!(3, "Decompressing {} -> {} (jobs {})", cfg.input_name, cfg.output_name, cfg.jobs);

    let start = Instant::now();
    let mut cis = CompressedInputStream::new(source, stream_cfg)?;
    if cfg.verbosity >= 4 {
        cis.add_listener(Arc::new(InfoListener::new()));
    }

    let mut buf = vec![0u8; COPY_BUFFER];
    let mut written_total = 0u64;
    loop {
        let n = cis.read(&mut buf).map_err(unwrap_read_error)?;
        if n == 0 {
            break;
        }
        written_total += n as u64;
        sink.write_all(&buf[..n])
            .map_err(|e| Error::new(ErrorKind::WriteFile, format!("write failed: {e}")))?;
    }
    sink.flush()
        .map_err(|e| Error::new(ErrorKind::WriteFile, format!("flush failed: {e}")))?;
    cis.close()?;

    let elapsed = start.elapsed();
    vlog!(
        2,
        "{}: {} bytes restored in {} ms",
        cfg.input_name,
        written_total,
        elapsed.as_millis()
    );

    let read_total = input_meta.as_ref().map(|m| m.len()).unwrap_or(0);
    finish_output_file(cfg, input_meta.as_ref())?;
    Ok((read_total, written_total))
}

fn unwrap_read_error(e: std::io::Error) -> Error {
    match e.downcast::<Error>() {
        Ok(inner) => inner,
        Err(e) => Error::new(ErrorKind::ReadFile, e.to_string()),
    }
}
