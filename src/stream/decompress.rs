//! Block decompression pipeline and the readable stream front.
//!
//! Frames are read from the shared bitstream strictly in block order under
//! the atomic gate (length prefix + payload copy only); entropy and
//! transform inverses then run concurrently on private buffers. A batch of
//! up to `jobs` blocks is decoded per refill; decoded bytes drain through
//! [`std::io::Read`].

use std::collections::VecDeque;
use std::io::{self, Cursor, Read};
use std::sync::atomic::AtomicI32;
use std::sync::{Arc, Mutex};

use crossbeam_channel::unbounded;

use crate::bitstream::InputBitStream;
use crate::error::{Error, ErrorKind, Result};
use crate::event::{notify, Event, EventType, ListenerRef};
use crate::hash::ChecksumKind;
use rayon::ThreadPool;

use super::compress::{COPY_MASK, TRANSFORMS_MASK};
use super::header::{read_header, StreamParams};
use super::{
    await_turn, cancel_all, check_jobs, max_transformed_len, release_turn, PipelineConfig,
    MAX_FRAME_BITS,
};

/// Settings for a decompression stream.
#[derive(Debug, Clone)]
pub struct DecompressConfig {
    pub jobs: usize,
    /// First block to deliver (1-based, inclusive).
    pub from_block: i32,
    /// First block NOT to deliver; decoding stops there.
    pub to_block: i32,
    /// Stream parameters for headerless streams; `None` reads the header.
    pub headerless: Option<StreamParams>,
}

impl Default for DecompressConfig {
    fn default() -> Self {
        DecompressConfig { jobs: 1, from_block: 1, to_block: i32::MAX, headerless: None }
    }
}

enum DecodeOutcome {
    Data(Vec<u8>),
    Terminal,
    Canceled,
    Failed(Error),
}

/// Readable decompressed stream over a KANZ container.
pub struct CompressedInputStream<R: Read + Send + 'static> {
    ibs: Arc<Mutex<InputBitStream<R>>>,
    params: Option<StreamParams>,
    headerless: Option<StreamParams>,
    jobs: usize,
    /// Workers for `jobs > 1`; batch completion is the result channel
    /// draining, so no separate join primitive is needed.
    pool: Option<ThreadPool>,
    gate: Arc<AtomicI32>,
    next_block_id: i32,
    from_block: i32,
    to_block: i32,
    current: Vec<u8>,
    current_pos: usize,
    queue: VecDeque<Vec<u8>>,
    pending_error: Option<Error>,
    listeners: Vec<ListenerRef>,
    eos: bool,
    closed: bool,
    total_out: u64,
}

impl<R: Read + Send + 'static> CompressedInputStream<R> {
    pub fn new(source: R, config: DecompressConfig) -> Result<Self> {
        check_jobs(config.jobs)?;
        if config.from_block < 1 || config.to_block <= config.from_block {
            return Err(Error::new(
                ErrorKind::InvalidParam,
                "block range must satisfy 1 <= from < to",
            ));
        }
        let pool = if config.jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.jobs)
                .build()
                .map_err(|e| {
                    Error::new(
                        ErrorKind::CreateDecompressor,
                        format!("cannot build worker pool: {e}"),
                    )
                })?;
            Some(pool)
        } else {
            None
        };

        Ok(CompressedInputStream {
            ibs: Arc::new(Mutex::new(InputBitStream::new(source))),
            params: None,
            headerless: config.headerless,
            jobs: config.jobs,
            pool,
            gate: Arc::new(AtomicI32::new(0)),
            next_block_id: 1,
            from_block: config.from_block,
            to_block: config.to_block,
            current: Vec::new(),
            current_pos: 0,
            queue: VecDeque::new(),
            pending_error: None,
            listeners: Vec::new(),
            eos: false,
            closed: false,
            total_out: 0,
        })
    }

    /// Registers a progress listener.
    pub fn add_listener(&mut self, listener: ListenerRef) {
        self.listeners.push(listener);
    }

    /// Stream parameters, available after the first read (or immediately for
    /// headerless streams).
    pub fn params(&self) -> Option<&StreamParams> {
        self.params.as_ref().or(self.headerless.as_ref())
    }

    /// Total bytes delivered so far.
    pub fn decompressed_total(&self) -> u64 {
        self.total_out
    }

    /// Closes the stream. Idempotent; reads afterwards fail.
    pub fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.ibs.lock().unwrap().close();
            notify(
                &self.listeners,
                &Event::new(EventType::DecompressionEnd, 0, self.total_out as i64),
            );
        }
        Ok(())
    }

    fn ensure_params(&mut self) -> Result<()> {
        if self.params.is_some() {
            return Ok(());
        }
        let params = match &self.headerless {
            Some(p) => p.clone(),
            None => {
                let mut ibs = self.ibs.lock().unwrap();
                read_header(&mut ibs)?
            }
        };
        notify(
            &self.listeners,
            &Event::new(EventType::AfterHeaderDecoding, 0, params.block_size as i64),
        );
        notify(&self.listeners, &Event::new(EventType::DecompressionStart, 0, 0));
        self.params = Some(params);
        Ok(())
    }

    /// Dispatches one batch of decode tasks and queues their output.
    fn refill(&mut self) -> Result<()> {
        self.ensure_params()?;
        let params = self.params.as_ref().unwrap();
        let cfg = PipelineConfig {
            entropy: params.entropy,
            transforms: params.transforms.clone(),
            checksum: params.checksum,
            block_size: params.block_size,
        };

        let listeners: Arc<[ListenerRef]> = Arc::from(self.listeners.as_slice());
        let (tx, rx) = unbounded::<(i32, DecodeOutcome)>();

        let count = self.jobs;
        for k in 0..count {
            let block_id = self.next_block_id + k as i32;
            let cfg = cfg.clone();
            let ibs = Arc::clone(&self.ibs);
            let gate = Arc::clone(&self.gate);
            let listeners = Arc::clone(&listeners);
            let tx = tx.clone();
            let (from, to) = (self.from_block, self.to_block);

            match &self.pool {
                Some(pool) => pool.spawn(move || {
                    let outcome = decode_block(block_id, &cfg, &ibs, &gate, from, to, &listeners);
                    let _ = tx.send((block_id, outcome));
                }),
                None => {
                    let outcome = decode_block(block_id, &cfg, &ibs, &gate, from, to, &listeners);
                    let _ = tx.send((block_id, outcome));
                }
            }
        }
        drop(tx);

        let mut results: Vec<(i32, DecodeOutcome)> = Vec::with_capacity(count);
        for _ in 0..count {
            results.push(rx.recv().expect("decode task dropped its result"));
        }
        results.sort_by_key(|(id, _)| *id);
        self.next_block_id += count as i32;

        // Results are processed in block order. Data past the first
        // terminal/cancel/failure is discarded, but the whole batch is still
        // scanned so a failure reported by a high-id task is never lost
        // behind its canceled peers.
        let mut stop = false;
        let mut saw_cancel = false;
        for (_, outcome) in results {
            match outcome {
                DecodeOutcome::Data(d) => {
                    if !stop && !d.is_empty() {
                        self.queue.push_back(d);
                    }
                }
                DecodeOutcome::Terminal => {
                    self.eos = true;
                    stop = true;
                }
                DecodeOutcome::Canceled => {
                    saw_cancel = true;
                    stop = true;
                }
                DecodeOutcome::Failed(e) => {
                    // Deliver data decoded ahead of the failure first; the
                    // first error in block order wins, and failures behind a
                    // terminal marker are read-past-end noise.
                    if !self.eos && self.pending_error.is_none() {
                        self.pending_error = Some(e);
                    }
                    stop = true;
                }
            }
        }
        if saw_cancel && !self.eos && self.pending_error.is_none() {
            self.pending_error = Some(Error::new(ErrorKind::ProcessBlock, "pipeline canceled"));
        }
        Ok(())
    }
}

impl<R: Read + Send + 'static> Read for CompressedInputStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::other(Error::new(ErrorKind::ReadFile, "stream closed")));
        }
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.current_pos < self.current.len() {
                let n = (self.current.len() - self.current_pos).min(buf.len());
                buf[..n].copy_from_slice(&self.current[self.current_pos..self.current_pos + n]);
                self.current_pos += n;
                self.total_out += n as u64;
                return Ok(n);
            }
            if let Some(next) = self.queue.pop_front() {
                self.current = next;
                self.current_pos = 0;
                continue;
            }
            if let Some(e) = self.pending_error.take() {
                self.eos = true;
                return Err(io::Error::other(e));
            }
            if self.eos {
                return Ok(0);
            }
            self.refill().map_err(io::Error::other)?;
        }
    }
}

impl<R: Read + Send + 'static> Drop for CompressedInputStream<R> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Reads and decodes one block.
fn decode_block<R: Read + Send + 'static>(
    block_id: i32,
    cfg: &PipelineConfig,
    ibs: &Mutex<InputBitStream<R>>,
    gate: &AtomicI32,
    from_block: i32,
    to_block: i32,
    listeners: &[ListenerRef],
) -> DecodeOutcome {
    match decode_block_inner(block_id, cfg, ibs, gate, from_block, to_block, listeners) {
        Ok(outcome) => outcome,
        Err(e) => {
            cancel_all(gate);
            DecodeOutcome::Failed(e)
        }
    }
}

fn decode_block_inner<R: Read + Send + 'static>(
    block_id: i32,
    cfg: &PipelineConfig,
    ibs: &Mutex<InputBitStream<R>>,
    gate: &AtomicI32,
    from_block: i32,
    to_block: i32,
    listeners: &[ListenerRef],
) -> Result<DecodeOutcome> {
    let rerr = |e: crate::bitstream::BitStreamError| Error::new(ErrorKind::ReadFile, e.to_string());

    // Serialized section: length prefix + payload copy, in block order.
    if !await_turn(gate, block_id) {
        return Ok(DecodeOutcome::Canceled);
    }
    let payload: Vec<u8>;
    let frame_bits: u64;
    {
        let mut shared = ibs.lock().unwrap();
        if block_id >= to_block {
            cancel_all(gate);
            return Ok(DecodeOutcome::Terminal);
        }
        let lr = shared.read_bits(5).map_err(rerr)? as u32;
        frame_bits = shared.read_bits(lr + 3).map_err(rerr)?;
        if frame_bits == 0 {
            cancel_all(gate);
            return Ok(DecodeOutcome::Terminal);
        }
        if frame_bits > MAX_FRAME_BITS {
            return Err(Error::new(
                ErrorKind::BlockSize,
                format!("block frame of {frame_bits} bits exceeds the limit"),
            ));
        }
        let nbytes = ((frame_bits + 7) / 8) as usize;
        let mut buf = vec![0u8; nbytes];
        shared.read_bits_into(&mut buf, frame_bits as usize).map_err(rerr)?;
        payload = buf;
    }
    if !release_turn(gate, block_id) {
        return Ok(DecodeOutcome::Canceled);
    }

    // Concurrent section: parse and decode the private frame.
    let mut pbs = InputBitStream::with_capacity(Cursor::new(payload), 1024);
    let mode = pbs.read_bits(8).map_err(rerr)? as u8;

    let copy_mode = mode & COPY_MASK != 0;
    let skip_flags = if copy_mode {
        0xFF
    } else if mode & TRANSFORMS_MASK != 0 {
        pbs.read_bits(8).map_err(rerr)? as u8
    } else {
        (mode << 4) | 0x0F
    };

    let data_size = ((mode >> 5) & 3) + 1;
    let pre_transform_len = pbs.read_bits(8 * data_size as u32).map_err(rerr)? as usize;
    if pre_transform_len == 0 {
        cancel_all(gate);
        return Ok(DecodeOutcome::Terminal);
    }
    let max_out = max_transformed_len(cfg.block_size);
    if pre_transform_len > max_out || pre_transform_len > 1 << 30 {
        return Err(Error::new(
            ErrorKind::BlockSize,
            format!("pre-transform length {pre_transform_len} out of range"),
        ));
    }

    let stored_checksum = if cfg.checksum != ChecksumKind::None {
        Some(pbs.read_bits(cfg.checksum.bits()).map_err(rerr)?)
    } else {
        None
    };

    // Blocks ahead of the requested range are consumed but not decoded.
    if block_id < from_block {
        return Ok(DecodeOutcome::Data(Vec::new()));
    }

    let mut data = vec![0u8; pre_transform_len];
    if copy_mode {
        pbs.read_bits_into(&mut data, pre_transform_len * 8).map_err(rerr)?;
    } else {
        cfg.entropy.decode(&mut pbs, &mut data)?;
        let mut scratch = Vec::new();
        cfg.transforms
            .inverse(skip_flags, &mut data, &mut scratch, max_out + 1024)?;
    }

    if data.len() > cfg.block_size {
        return Err(Error::new(
            ErrorKind::ProcessBlock,
            "decoded block exceeds the stream block size",
        ));
    }

    if let Some(stored) = stored_checksum {
        let computed = cfg.checksum.compute(&data);
        if computed != stored {
            return Err(Error::new(
                ErrorKind::CrcCheck,
                format!("block {block_id} checksum mismatch"),
            ));
        }
        notify(
            listeners,
            &Event::with_hash(EventType::BlockInfo, block_id, data.len() as i64, computed),
        );
    } else {
        notify(
            listeners,
            &Event::new(EventType::BlockInfo, block_id, data.len() as i64),
        );
    }

    Ok(DecodeOutcome::Data(data))
}
