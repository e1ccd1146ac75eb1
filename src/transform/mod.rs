//! Byte transforms and the per-block transform chain.
//!
//! A transform maps a byte block to another byte block reversibly. `forward`
//! may refuse (returning `None`) when it cannot shrink or usefully
//! restructure the block; the chain records the refusal in the block's skip
//! flags and passes the slot's input through unchanged. `inverse` failures
//! are fatal for the block.
//!
//! Chains hold up to 8 slots addressed by a 48-bit identifier, 6 bits per
//! slot with slot 0 in the most significant position; `NONE` fills unused
//! slots.

mod bwt;
mod fsd;
mod lz;
mod mtft;
mod rlt;
mod rolz;
mod srt;
mod zrlt;

use crate::error::{Error, ErrorKind, Result};

/// Maximum number of slots in a chain.
pub const MAX_CHAIN: usize = 8;

/// Transform identifiers (6-bit fields of the chain id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformType {
    #[default]
    None,
    Bwt,
    Lz,
    Lzx,
    Rolz,
    Rlt,
    Zrlt,
    Srt,
    Mtft,
    Fsd,
}

impl TransformType {
    pub fn id(self) -> u64 {
        match self {
            TransformType::None => 0,
            TransformType::Bwt => 1,
            TransformType::Lz => 2,
            TransformType::Lzx => 3,
            TransformType::Rolz => 4,
            TransformType::Rlt => 5,
            TransformType::Zrlt => 6,
            TransformType::Srt => 7,
            TransformType::Mtft => 8,
            TransformType::Fsd => 9,
        }
    }

    pub fn from_id(id: u64) -> Option<Self> {
        Some(match id {
            0 => TransformType::None,
            1 => TransformType::Bwt,
            2 => TransformType::Lz,
            3 => TransformType::Lzx,
            4 => TransformType::Rolz,
            5 => TransformType::Rlt,
            6 => TransformType::Zrlt,
            7 => TransformType::Srt,
            8 => TransformType::Mtft,
            9 => TransformType::Fsd,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            TransformType::None => "NONE",
            TransformType::Bwt => "BWT",
            TransformType::Lz => "LZ",
            TransformType::Lzx => "LZX",
            TransformType::Rolz => "ROLZ",
            TransformType::Rlt => "RLT",
            TransformType::Zrlt => "ZRLT",
            TransformType::Srt => "SRT",
            TransformType::Mtft => "MTFT",
            TransformType::Fsd => "FSD",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        Some(match upper.as_str() {
            "NONE" => TransformType::None,
            "BWT" => TransformType::Bwt,
            "LZ" => TransformType::Lz,
            "LZX" => TransformType::Lzx,
            "ROLZ" => TransformType::Rolz,
            "RLT" => TransformType::Rlt,
            "ZRLT" => TransformType::Zrlt,
            "SRT" => TransformType::Srt,
            "MTFT" => TransformType::Mtft,
            "FSD" => TransformType::Fsd,
            _ => return None,
        })
    }

    /// Worst-case forward output size for a `src_len` input.
    pub fn max_encoded_len(self, src_len: usize) -> usize {
        match self {
            TransformType::None => src_len,
            TransformType::Bwt => src_len + 8,
            TransformType::Lz | TransformType::Lzx => src_len + src_len / 255 + 16,
            TransformType::Rolz => src_len + src_len / 8 + 16,
            TransformType::Rlt => src_len + src_len / 2 + 16,
            TransformType::Zrlt => src_len * 2 + 16,
            TransformType::Srt => src_len + 264,
            TransformType::Mtft => src_len,
            TransformType::Fsd => src_len + 16,
        }
    }

    /// Applies the forward transform. Returns the output length, or `None`
    /// when the transform refuses the block. `dst` must hold at least
    /// [`max_encoded_len`](Self::max_encoded_len) bytes.
    pub fn forward(self, src: &[u8], dst: &mut [u8]) -> Option<usize> {
        match self {
            TransformType::None => {
                dst[..src.len()].copy_from_slice(src);
                Some(src.len())
            }
            TransformType::Bwt => bwt::forward(src, dst),
            TransformType::Lz => lz::forward(src, dst, false),
            TransformType::Lzx => lz::forward(src, dst, true),
            TransformType::Rolz => rolz::forward(src, dst),
            TransformType::Rlt => rlt::forward(src, dst),
            TransformType::Zrlt => zrlt::forward(src, dst),
            TransformType::Srt => srt::forward(src, dst),
            TransformType::Mtft => mtft::forward(src, dst),
            TransformType::Fsd => fsd::forward(src, dst),
        }
    }

    /// Applies the inverse transform, returning the output length.
    pub fn inverse(self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        match self {
            TransformType::None => {
                if dst.len() < src.len() {
                    return Err(invalid_block("inverse output exceeds buffer"));
                }
                dst[..src.len()].copy_from_slice(src);
                Ok(src.len())
            }
            TransformType::Bwt => bwt::inverse(src, dst),
            TransformType::Lz => lz::inverse(src, dst, false),
            TransformType::Lzx => lz::inverse(src, dst, true),
            TransformType::Rolz => rolz::inverse(src, dst),
            TransformType::Rlt => rlt::inverse(src, dst),
            TransformType::Zrlt => zrlt::inverse(src, dst),
            TransformType::Srt => srt::inverse(src, dst),
            TransformType::Mtft => mtft::inverse(src, dst),
            TransformType::Fsd => fsd::inverse(src, dst),
        }
    }
}

/// Error constructor shared by the transform implementations.
pub(crate) fn invalid_block(msg: &str) -> Error {
    Error::new(ErrorKind::ProcessBlock, msg)
}

/// An ordered list of up to 8 transforms applied per block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformChain {
    transforms: Vec<TransformType>,
}

impl TransformChain {
    /// Builds a chain from explicit slots. Trailing `NONE` entries are
    /// dropped; interior ones stay (and always skip).
    pub fn new(slots: &[TransformType]) -> Result<Self> {
        if slots.len() > MAX_CHAIN {
            return Err(Error::new(
                ErrorKind::InvalidCodec,
                format!("transform chain holds {} slots, maximum is {MAX_CHAIN}", slots.len()),
            ));
        }
        let mut transforms = slots.to_vec();
        while transforms.last() == Some(&TransformType::None) {
            transforms.pop();
        }
        Ok(TransformChain { transforms })
    }

    /// Decodes a 48-bit chain identifier.
    pub fn from_id(id: u64) -> Result<Self> {
        if id >> 48 != 0 {
            return Err(Error::new(ErrorKind::InvalidCodec, "chain id wider than 48 bits"));
        }
        let mut slots = [TransformType::None; MAX_CHAIN];
        for (i, slot) in slots.iter_mut().enumerate() {
            let field = (id >> (6 * (MAX_CHAIN - 1 - i))) & 0x3F;
            *slot = TransformType::from_id(field).ok_or_else(|| {
                Error::new(ErrorKind::InvalidCodec, format!("unknown transform id {field}"))
            })?;
        }
        Self::new(&slots)
    }

    /// Packs the chain into its 48-bit identifier.
    pub fn id(&self) -> u64 {
        let mut id = 0u64;
        for (i, t) in self.transforms.iter().enumerate() {
            id |= t.id() << (6 * (MAX_CHAIN - 1 - i));
        }
        id
    }

    /// Parses a `NAME+NAME+...` chain description.
    pub fn from_names(names: &str) -> Result<Self> {
        let mut slots = Vec::new();
        for part in names.split('+') {
            let t = TransformType::from_name(part.trim()).ok_or_else(|| {
                Error::new(ErrorKind::InvalidCodec, format!("unknown transform '{part}'"))
            })?;
            slots.push(t);
        }
        Self::new(&slots)
    }

    /// `NAME+NAME+...` rendering; `"NONE"` for an empty chain.
    pub fn names(&self) -> String {
        if self.transforms.is_empty() {
            return "NONE".to_owned();
        }
        self.transforms
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join("+")
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Worst-case output size across the whole chain.
    pub fn max_encoded_len(&self, src_len: usize) -> usize {
        let mut sz = src_len;
        for t in &self.transforms {
            sz = t.max_encoded_len(sz);
        }
        sz
    }

    /// Runs the chain forward. `data` holds the block on entry and the
    /// transformed output on return; `scratch` is reused across calls.
    /// Returns the skip flags: bit `0x80 >> i` set means slot `i` was
    /// bypassed (refused, `NONE`, or past the end of the chain).
    pub fn forward(&self, data: &mut Vec<u8>, scratch: &mut Vec<u8>) -> u8 {
        let mut flags = 0u8;
        for i in self.transforms.len()..MAX_CHAIN {
            flags |= 0x80 >> i;
        }
        for (i, t) in self.transforms.iter().enumerate() {
            if *t == TransformType::None {
                flags |= 0x80 >> i;
                continue;
            }
            scratch.resize(t.max_encoded_len(data.len()), 0);
            match t.forward(data, scratch) {
                Some(n) => {
                    scratch.truncate(n);
                    std::mem::swap(data, scratch);
                }
                None => flags |= 0x80 >> i,
            }
        }
        flags
    }

    /// Runs the chain inverse honouring `skip_flags`. `data` holds the
    /// transformed block on entry and the original on return. Intermediate
    /// buffers grow up to `max_out` bytes; exceeding it fails the block.
    pub fn inverse(
        &self,
        skip_flags: u8,
        data: &mut Vec<u8>,
        scratch: &mut Vec<u8>,
        max_out: usize,
    ) -> Result<()> {
        for i in (0..self.transforms.len()).rev() {
            if skip_flags & (0x80 >> i) != 0 {
                continue;
            }
            let t = self.transforms[i];
            scratch.resize(max_out, 0);
            let n = t.inverse(data, scratch)?;
            scratch.truncate(n);
            std::mem::swap(data, scratch);
        }
        Ok(())
    }
}
