//! Block compression pipeline and the writable stream front.
//!
//! Bytes written by the caller accumulate into per-worker block buffers; a
//! full set of buffers dispatches one batch of encode tasks. Each task runs
//! checksum, transform chain, and entropy coding into a private bitstream,
//! then appends its frame to the shared bitstream strictly in block order
//! through the atomic gate. `close` flushes the partial block, emits the
//! zero-length terminal frame, and pads the stream.

use std::io::{self, Write};
use std::sync::atomic::AtomicI32;
use std::sync::{Arc, Mutex};

use crossbeam_channel::unbounded;

use crate::bitstream::OutputBitStream;
use crate::entropy::EntropyType;
use crate::error::{Error, ErrorKind, Result};
use crate::event::{notify, Event, EventType, ListenerRef};
use crate::hash::ChecksumKind;
use rayon::ThreadPool;
use crate::transform::TransformChain;

use super::header::{write_header, StreamParams};
use super::{
    await_turn, cancel_all, check_block_size, check_jobs, max_transformed_len, release_turn,
    PipelineConfig,
};

/// Mode byte: raw copy, no transform or entropy applied.
pub(crate) const COPY_MASK: u8 = 0x80;
/// Mode byte: full skip-flags byte follows.
pub(crate) const TRANSFORMS_MASK: u8 = 0x10;

/// Settings for a compression stream.
#[derive(Debug, Clone)]
pub struct CompressConfig {
    pub entropy: EntropyType,
    pub transforms: TransformChain,
    pub block_size: usize,
    pub checksum: ChecksumKind,
    pub jobs: usize,
    /// Skip the stream header (the reader must know the parameters).
    pub headerless: bool,
    /// Total input size when known ahead of time; stored in the header.
    pub original_size: Option<u64>,
}

impl Default for CompressConfig {
    fn default() -> Self {
        CompressConfig {
            entropy: EntropyType::None,
            transforms: TransformChain::default(),
            block_size: 4 * 1024 * 1024,
            checksum: ChecksumKind::None,
            jobs: 1,
            headerless: false,
            original_size: None,
        }
    }
}

enum TaskOutcome {
    Done,
    Canceled,
    Failed(Error),
}

/// Writable compressed stream. Implements [`std::io::Write`]; call
/// [`close`](Self::close) (or drop) to finish the stream.
pub struct CompressedOutputStream<W: Write + Send + 'static> {
    obs: Arc<Mutex<OutputBitStream<W>>>,
    config: PipelineConfig,
    headerless: bool,
    original_size: Option<u64>,
    jobs: usize,
    /// Workers for `jobs > 1`; batch completion is the result channel
    /// draining, so no separate join primitive is needed.
    pool: Option<ThreadPool>,
    buffers: Vec<Vec<u8>>,
    buffer_id: usize,
    next_block_id: i32,
    gate: Arc<AtomicI32>,
    listeners: Vec<ListenerRef>,
    header_written: bool,
    closed: bool,
    failed: bool,
    total_in: u64,
}

impl<W: Write + Send + 'static> CompressedOutputStream<W> {
    pub fn new(sink: W, config: CompressConfig) -> Result<Self> {
        check_block_size(config.block_size)?;
        check_jobs(config.jobs)?;

        let pool = if config.jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.jobs)
                .build()
                .map_err(|e| {
                    Error::new(ErrorKind::CreateCompressor, format!("cannot build worker pool: {e}"))
                })?;
            Some(pool)
        } else {
            None
        };

        Ok(CompressedOutputStream {
            obs: Arc::new(Mutex::new(OutputBitStream::new(sink))),
            config: PipelineConfig {
                entropy: config.entropy,
                transforms: config.transforms,
                checksum: config.checksum,
                block_size: config.block_size,
            },
            headerless: config.headerless,
            original_size: config.original_size,
            jobs: config.jobs,
            pool,
            buffers: (0..config.jobs).map(|_| Vec::new()).collect(),
            buffer_id: 0,
            next_block_id: 1,
            gate: Arc::new(AtomicI32::new(0)),
            listeners: Vec::new(),
            header_written: false,
            closed: false,
            failed: false,
            total_in: 0,
        })
    }

    /// Registers a progress listener. Listener lists are snapshotted when a
    /// batch is dispatched.
    pub fn add_listener(&mut self, listener: ListenerRef) {
        self.listeners.push(listener);
    }

    /// Total bytes accepted so far.
    pub fn uncompressed_total(&self) -> u64 {
        self.total_in
    }

    /// Finishes the stream: flushes pending blocks, appends the terminal
    /// frame, and closes the underlying bitstream. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if self.failed {
            self.closed = true;
            return Err(Error::new(ErrorKind::WriteFile, "stream failed earlier"));
        }
        self.ensure_header()?;
        if let Err(e) = self.dispatch_batch() {
            self.failed = true;
            self.closed = true;
            return Err(e);
        }

        let mut obs = self.obs.lock().unwrap();
        let werr = |e: crate::bitstream::BitStreamError| {
            Error::new(ErrorKind::WriteFile, e.to_string())
        };
        // Terminal frame: zero-length field ends the stream.
        obs.write_bits(0, 5).map_err(werr)?;
        obs.write_bits(0, 3).map_err(werr)?;
        obs.close().map_err(werr)?;
        drop(obs);

        self.closed = true;
        notify(
            &self.listeners,
            &Event::new(EventType::CompressionEnd, 0, self.total_in as i64),
        );
        Ok(())
    }

    fn ensure_header(&mut self) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        if !self.headerless {
            let params = StreamParams {
                version: super::header::BITSTREAM_VERSION,
                checksum: self.config.checksum,
                entropy: self.config.entropy,
                transforms: self.config.transforms.clone(),
                block_size: self.config.block_size,
                original_size: self.original_size,
            };
            let mut obs = self.obs.lock().unwrap();
            write_header(&mut obs, &params)?;
        }
        self.header_written = true;
        notify(&self.listeners, &Event::new(EventType::CompressionStart, 0, 0));
        Ok(())
    }

    /// Runs the queued block buffers through the pipeline.
    fn dispatch_batch(&mut self) -> Result<()> {
        let count = if self.buffer_id >= self.jobs {
            self.jobs
        } else {
            self.buffer_id + usize::from(!self.buffers[self.buffer_id].is_empty())
        };
        if count == 0 {
            return Ok(());
        }

        let listeners: Arc<[ListenerRef]> = Arc::from(self.listeners.as_slice());
        let (tx, rx) = unbounded::<(i32, TaskOutcome)>();

        for k in 0..count {
            let data = std::mem::take(&mut self.buffers[k]);
            let block_id = self.next_block_id;
            self.next_block_id += 1;

            let cfg = self.config.clone();
            let obs = Arc::clone(&self.obs);
            let gate = Arc::clone(&self.gate);
            let listeners = Arc::clone(&listeners);
            let tx = tx.clone();

            match &self.pool {
                Some(pool) => pool.spawn(move || {
                    let outcome = encode_block(data, block_id, &cfg, &obs, &gate, &listeners);
                    let _ = tx.send((block_id, outcome));
                }),
                None => {
                    let outcome = encode_block(data, block_id, &cfg, &obs, &gate, &listeners);
                    let _ = tx.send((block_id, outcome));
                }
            }
        }
        drop(tx);

        let mut results: Vec<(i32, TaskOutcome)> = Vec::with_capacity(count);
        for _ in 0..count {
            results.push(rx.recv().expect("encode task dropped its result"));
        }
        results.sort_by_key(|(id, _)| *id);

        self.buffer_id = 0;
        for (_, outcome) in results {
            match outcome {
                TaskOutcome::Done => {}
                TaskOutcome::Canceled => {}
                TaskOutcome::Failed(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn push_bytes(&mut self, buf: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::new(ErrorKind::WriteFile, "stream closed"));
        }
        if self.failed {
            return Err(Error::new(ErrorKind::WriteFile, "stream failed earlier"));
        }
        self.ensure_header()?;

        let mut consumed = 0;
        while consumed < buf.len() {
            let cur = &mut self.buffers[self.buffer_id];
            let room = self.config.block_size - cur.len();
            let n = room.min(buf.len() - consumed);
            cur.extend_from_slice(&buf[consumed..consumed + n]);
            consumed += n;

            if cur.len() == self.config.block_size {
                self.buffer_id += 1;
                if self.buffer_id == self.jobs {
                    if let Err(e) = self.dispatch_batch() {
                        self.failed = true;
                        return Err(e);
                    }
                }
            }
        }
        self.total_in += consumed as u64;
        Ok(consumed)
    }
}

impl<W: Write + Send + 'static> Write for CompressedOutputStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push_bytes(buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Block boundaries are fixed; there is nothing to force out early.
        Ok(())
    }
}

impl<W: Write + Send + 'static> Drop for CompressedOutputStream<W> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Encodes one block and appends its frame to the shared bitstream in order.
fn encode_block<W: Write + Send + 'static>(
    mut data: Vec<u8>,
    block_id: i32,
    cfg: &PipelineConfig,
    obs: &Mutex<OutputBitStream<W>>,
    gate: &AtomicI32,
    listeners: &[ListenerRef],
) -> TaskOutcome {
    match encode_block_inner(&mut data, block_id, cfg, obs, gate, listeners) {
        Ok(true) => TaskOutcome::Done,
        Ok(false) => TaskOutcome::Canceled,
        Err(e) => {
            cancel_all(gate);
            TaskOutcome::Failed(e)
        }
    }
}

fn encode_block_inner<W: Write + Send + 'static>(
    data: &mut Vec<u8>,
    block_id: i32,
    cfg: &PipelineConfig,
    obs: &Mutex<OutputBitStream<W>>,
    gate: &AtomicI32,
    listeners: &[ListenerRef],
) -> Result<bool> {
    let orig_len = data.len();
    let checksum = cfg.checksum.compute(data);

    notify(
        listeners,
        &Event::new(EventType::BeforeTransform, block_id, orig_len as i64),
    );

    // The transform chain consumes its input; copy-mode fallback needs the
    // original bytes back, so keep them.
    let original: Vec<u8> = if cfg.transforms.is_empty() { Vec::new() } else { data.clone() };
    let mut scratch = Vec::new();
    let skip_flags = cfg.transforms.forward(data, &mut scratch);

    let max_out = max_transformed_len(cfg.block_size);
    let untransformed: &[u8] = if cfg.transforms.is_empty() { data } else { &original };
    let copy_mode = data.len() > max_out;
    let payload: &[u8] = if copy_mode { untransformed } else { data };
    let pre_transform_len = payload.len();

    notify(
        listeners,
        &Event::new(EventType::AfterTransform, block_id, pre_transform_len as i64),
    );

    notify(
        listeners,
        &Event::new(EventType::BeforeEntropy, block_id, pre_transform_len as i64),
    );

    let first = build_frame(cfg, payload, skip_flags, checksum, copy_mode)?;
    let (frame, frame_bits) = if !copy_mode && first.1 > super::MAX_FRAME_BITS {
        // Entropy expansion pushed the frame past the format limit; store
        // the untransformed bytes instead.
        build_frame(cfg, untransformed, skip_flags, checksum, true)?
    } else {
        first
    };

    // Serialized section: append the frame in strict block order.
    if !await_turn(gate, block_id) {
        return Ok(false);
    }
    {
        let werr =
            |e: crate::bitstream::BitStreamError| Error::new(ErrorKind::WriteFile, e.to_string());
        let mut shared = obs.lock().unwrap();
        let width = (64 - frame_bits.leading_zeros()).max(3);
        shared.write_bits((width - 3) as u64, 5).map_err(werr)?;
        shared.write_bits(frame_bits, width).map_err(werr)?;
        shared.write_bits_from(&frame, frame_bits as usize).map_err(werr)?;
    }
    if !release_turn(gate, block_id) {
        return Ok(false);
    }

    notify(
        listeners,
        &Event::with_hash(EventType::AfterEntropy, block_id, (frame_bits / 8) as i64, checksum),
    );
    Ok(true)
}

/// Builds one block frame (mode byte, skip flags, length, checksum, coded
/// payload) in a private bitstream. Returns the buffer and its bit count.
fn build_frame(
    cfg: &PipelineConfig,
    payload: &[u8],
    skip_flags: u8,
    checksum: u64,
    copy_mode: bool,
) -> Result<(Vec<u8>, u64)> {
    let werr =
        |e: crate::bitstream::BitStreamError| Error::new(ErrorKind::WriteFile, e.to_string());
    let pre_transform_len = payload.len();

    // Length field width: smallest byte count holding the value.
    let data_size: u8 = match pre_transform_len {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    };

    let mut mode: u8 = (data_size - 1) << 5;
    let mut extended = false;
    if copy_mode {
        mode |= COPY_MASK;
    } else if skip_flags & 0x0F == 0x0F {
        mode |= skip_flags >> 4;
    } else {
        mode |= TRANSFORMS_MASK;
        extended = true;
    }

    let mut pbs = OutputBitStream::with_capacity(
        Vec::with_capacity(pre_transform_len / 4 + 1024),
        8192,
    );
    pbs.write_bits(mode as u64, 8).map_err(werr)?;
    if extended {
        pbs.write_bits(skip_flags as u64, 8).map_err(werr)?;
    }
    pbs.write_bits(pre_transform_len as u64, 8 * data_size as u32).map_err(werr)?;
    if cfg.checksum != ChecksumKind::None {
        pbs.write_bits(checksum, cfg.checksum.bits()).map_err(werr)?;
    }

    if copy_mode {
        pbs.write_bits_from(payload, pre_transform_len * 8).map_err(werr)?;
    } else {
        cfg.entropy.encode(&mut pbs, payload)?;
    }

    let frame_bits = pbs.written();
    pbs.close().map_err(werr)?;
    Ok((pbs.into_inner(), frame_bits))
}
