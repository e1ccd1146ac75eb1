//! Typed run configuration shared by the CLI and the file front-end.

use crate::entropy::EntropyType;
use crate::error::{Error, ErrorKind, Result};
use crate::hash::ChecksumKind;
use crate::transform::TransformChain;

/// Reserved input/output names.
pub const STDIN_MARK: &str = "STDIN";
pub const STDOUT_MARK: &str = "STDOUT";
pub const NONE_MARK: &str = "NONE";

/// File extension appended to compressed outputs.
pub const KNZ_EXTENSION: &str = ".knz";

/// Default block size (4 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Everything one compression or decompression run needs to know.
#[derive(Debug, Clone)]
pub struct Config {
    pub input_name: String,
    pub output_name: String,
    pub overwrite: bool,
    pub remove_input: bool,
    pub jobs: usize,
    pub block_size: usize,
    pub transform_chain: TransformChain,
    pub entropy_codec: EntropyType,
    pub checksum: ChecksumKind,
    pub verbosity: u32,
    /// First block delivered on decompression (1-based).
    pub from_block: i32,
    /// First block NOT delivered on decompression.
    pub to_block: i32,
    /// Do not follow symbolic links when expanding directories.
    pub no_links: bool,
    /// Ignore dot files when expanding directories.
    pub no_dot_files: bool,
    /// Omit (or expect no) stream header.
    pub headerless: bool,
    /// Expected decompressed size, required information for headerless
    /// streams coming from untrusted sources; advisory otherwise.
    pub output_size: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_name: STDIN_MARK.to_owned(),
            output_name: STDOUT_MARK.to_owned(),
            overwrite: false,
            remove_input: false,
            jobs: 1,
            block_size: DEFAULT_BLOCK_SIZE,
            transform_chain: TransformChain::default(),
            entropy_codec: EntropyType::None,
            checksum: ChecksumKind::None,
            verbosity: 2,
            from_block: 1,
            to_block: i32::MAX,
            no_links: false,
            no_dot_files: false,
            headerless: false,
            output_size: None,
        }
    }
}

/// Parses a byte count with an optional `K`/`M`/`G` suffix (powers of 1024).
pub fn parse_size(text: &str) -> Result<usize> {
    let t = text.trim();
    if t.is_empty() {
        return Err(Error::new(ErrorKind::InvalidParam, "empty size"));
    }
    let (digits, mult) = match t.as_bytes()[t.len() - 1].to_ascii_uppercase() {
        b'K' => (&t[..t.len() - 1], 1usize << 10),
        b'M' => (&t[..t.len() - 1], 1usize << 20),
        b'G' => (&t[..t.len() - 1], 1usize << 30),
        _ => (t, 1usize),
    };
    let value: usize = digits
        .parse()
        .map_err(|_| Error::new(ErrorKind::InvalidParam, format!("invalid size '{text}'")))?;
    value
        .checked_mul(mult)
        .ok_or_else(|| Error::new(ErrorKind::InvalidParam, format!("size '{text}' overflows")))
}
