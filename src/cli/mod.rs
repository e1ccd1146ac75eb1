//! Command-line surface of the `kanzi` binary.
//!
//! Arguments parse with clap; validation and preset resolution happen in
//! [`build_config`], and [`run`] dispatches single files or expanded
//! directories to the file front-end. The process exit code is the stable
//! numeric code of the first error.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;

use crate::config::{parse_size, Config, KNZ_EXTENSION, NONE_MARK, STDIN_MARK, STDOUT_MARK};
use crate::entropy::EntropyType;
use crate::error::{Error, ErrorKind, Result};
use crate::hash::ChecksumKind;
use crate::io::{compress_file, decompress_file, expand_inputs};
use crate::logging::set_verbosity;
use crate::stream::MAX_JOBS;
use crate::transform::TransformChain;
use crate::vlog;

/// Level presets: transform chain and entropy codec per `-l` value.
const LEVEL_PRESETS: [(&str, &str); 9] = [
    ("LZ", "NONE"),
    ("LZ", "HUFFMAN"),
    ("LZX", "HUFFMAN"),
    ("LZX", "ANS0"),
    ("BWT+MTFT+ZRLT", "ANS0"),
    ("BWT+SRT+ZRLT", "FPAQ"),
    ("BWT+MTFT+ZRLT", "CM"),
    ("BWT+MTFT+ZRLT", "TPAQ"),
    ("RLT+BWT+MTFT+ZRLT", "TPAQ"),
];

const DEFAULT_LEVEL: u8 = 3;

/// Modular lossless block compressor.
#[derive(Debug, Parser)]
#[command(name = "kanzi", version, about = "kanzi block compressor", disable_help_subcommand = true)]
pub struct Args {
    /// Compress the input.
    #[arg(short = 'c', long = "compress", conflicts_with = "decompress")]
    pub compress: bool,

    /// Decompress the input.
    #[arg(short = 'd', long = "decompress")]
    pub decompress: bool,

    /// Input file, directory, or STDIN.
    #[arg(short = 'i', long = "input")]
    pub input: Option<String>,

    /// Output file, directory, STDOUT, or NONE.
    #[arg(short = 'o', long = "output")]
    pub output: Option<String>,

    /// Compression level preset (1..9).
    #[arg(short = 'l', long = "level", value_parser = clap::value_parser!(u8).range(1..=9))]
    pub level: Option<u8>,

    /// Explicit transform chain, e.g. BWT+MTFT+ZRLT.
    #[arg(long = "transform")]
    pub transform: Option<String>,

    /// Explicit entropy codec, e.g. TPAQ.
    #[arg(long = "entropy")]
    pub entropy: Option<String>,

    /// Block size in bytes, with optional K/M/G suffix.
    #[arg(short = 'b', long = "block")]
    pub block: Option<String>,

    /// Per-block checksum width (32 or 64).
    #[arg(long = "checksum", value_parser = clap::value_parser!(u32))]
    pub checksum: Option<u32>,

    /// Worker count; 0 selects half the cores.
    #[arg(short = 'j', long = "jobs", default_value_t = 0)]
    pub jobs: usize,

    /// Overwrite existing output files.
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// First block to decompress (1-based).
    #[arg(long = "from")]
    pub from: Option<i32>,

    /// First block NOT to decompress.
    #[arg(long = "to")]
    pub to: Option<i32>,

    /// Verbosity 0..5.
    #[arg(short = 'v', long = "verbose", default_value_t = 2)]
    pub verbose: u32,

    /// Remove the input file after a successful run.
    #[arg(long = "rm")]
    pub remove_input: bool,

    /// Do not follow symbolic links when walking directories.
    #[arg(long = "no-links")]
    pub no_links: bool,

    /// Skip dot files when walking directories.
    #[arg(long = "no-dot-files")]
    pub no_dot_files: bool,

    /// Omit (compress) or assume absent (decompress) the stream header.
    #[arg(long = "headerless")]
    pub headerless: bool,

    /// Expected decompressed size for headerless streams.
    #[arg(long = "output-size")]
    pub output_size: Option<u64>,
}

/// Operation selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMode {
    Compress,
    Decompress,
}

/// Resolves arguments into the typed run configuration.
pub fn build_config(args: &Args) -> Result<(OpMode, Config)> {
    let mode = if args.decompress {
        OpMode::Decompress
    } else if args.compress {
        OpMode::Compress
    } else {
        return Err(Error::new(ErrorKind::MissingParam, "one of -c or -d is required"));
    };

    let level = args.level.unwrap_or(DEFAULT_LEVEL) as usize;
    let (preset_transform, preset_entropy) = LEVEL_PRESETS[level - 1];

    let transform_chain = match &args.transform {
        Some(t) => TransformChain::from_names(t)?,
        None => TransformChain::from_names(preset_transform)?,
    };
    let entropy_codec = match &args.entropy {
        Some(e) => EntropyType::from_name(e)
            .ok_or_else(|| Error::new(ErrorKind::InvalidCodec, format!("unknown entropy codec '{e}'")))?,
        None => EntropyType::from_name(preset_entropy).unwrap(),
    };

    let checksum = match args.checksum {
        None => ChecksumKind::None,
        Some(32) => ChecksumKind::Xxh32,
        Some(64) => ChecksumKind::Xxh64,
        Some(other) => {
            return Err(Error::new(
                ErrorKind::InvalidParam,
                format!("checksum width {other} not supported (32 or 64)"),
            ))
        }
    };

    let jobs = if args.jobs == 0 {
        (num_cpus::get() / 2).clamp(1, MAX_JOBS)
    } else if args.jobs <= MAX_JOBS {
        args.jobs
    } else {
        return Err(Error::new(
            ErrorKind::InvalidParam,
            format!("jobs {} not in [1, {MAX_JOBS}]", args.jobs),
        ));
    };

    let block_size = match &args.block {
        Some(text) => parse_size(text)?,
        None => crate::config::DEFAULT_BLOCK_SIZE,
    };

    let input_name = args.input.clone().unwrap_or_else(|| STDIN_MARK.to_owned());
    let output_name = match &args.output {
        Some(o) => o.clone(),
        None => default_output_name(mode, &input_name)?,
    };

    let from_block = args.from.unwrap_or(1);
    let to_block = args.to.unwrap_or(i32::MAX);
    if from_block < 1 || to_block <= from_block {
        return Err(Error::new(ErrorKind::InvalidParam, "block range must satisfy 1 <= from < to"));
    }

    if args.headerless && mode == OpMode::Decompress && args.transform.is_none() && args.level.is_none()
    {
        vlog!(1, "warning: headerless decompression relies on the provided transform/entropy flags");
    }

    Ok((
        mode,
        Config {
            input_name,
            output_name,
            overwrite: args.force,
            remove_input: args.remove_input,
            jobs,
            block_size,
            transform_chain,
            entropy_codec,
            checksum,
            verbosity: args.verbose,
            from_block,
            to_block,
            no_links: args.no_links,
            no_dot_files: args.no_dot_files,
            headerless: args.headerless,
            output_size: args.output_size,
        },
    ))
}

/// Derives the output name when `-o` is absent.
fn default_output_name(mode: OpMode, input_name: &str) -> Result<String> {
    if input_name == STDIN_MARK {
        return Ok(STDOUT_MARK.to_owned());
    }
    match mode {
        OpMode::Compress => Ok(format!("{input_name}{KNZ_EXTENSION}")),
        OpMode::Decompress => match input_name.strip_suffix(KNZ_EXTENSION) {
            Some(base) => Ok(base.to_owned()),
            None => Err(Error::new(
                ErrorKind::MissingParam,
                format!("cannot derive an output name from {input_name}; use -o"),
            )),
        },
    }
}

/// Executes the requested operation. Returns the process exit code.
pub fn run(args: Args) -> i32 {
    set_verbosity(args.verbose);
    let (mode, config) = match build_config(&args) {
        Ok(v) => v,
        Err(e) => {
            vlog!(1, "kanzi: {e}");
            return e.kind().code();
        }
    };

    match run_config(mode, &config) {
        Ok(()) => 0,
        Err(e) => {
            vlog!(1, "kanzi: {e:#}");
            exit_code(&e)
        }
    }
}

/// Maps an application error back to the stable numeric exit code carried by
/// the innermost library [`Error`] in its chain.
fn exit_code(e: &anyhow::Error) -> i32 {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map(|err| err.kind().code())
        .unwrap_or(ErrorKind::Unknown.code())
}

fn run_config(mode: OpMode, config: &Config) -> anyhow::Result<()> {
    let input_path = Path::new(&config.input_name);
    if config.input_name != STDIN_MARK && input_path.is_dir() {
        return run_directory(mode, config, input_path);
    }

    match mode {
        OpMode::Compress => compress_file(config)
            .map(|_| ())
            .with_context(|| format!("cannot compress {}", config.input_name)),
        OpMode::Decompress => decompress_file(config)
            .map(|_| ())
            .with_context(|| format!("cannot decompress {}", config.input_name)),
    }
}

/// Processes every file under an input directory, mirroring the tree below
/// the output directory.
fn run_directory(mode: OpMode, config: &Config, input_root: &Path) -> anyhow::Result<()> {
    let discard = config.output_name == NONE_MARK;
    if config.output_name == STDOUT_MARK {
        return Err(Error::new(
            ErrorKind::InvalidParam,
            "directory input cannot stream to STDOUT",
        )
        .into());
    }
    let output_root = PathBuf::from(&config.output_name);
    if !discard {
        std::fs::create_dir_all(&output_root)
            .map_err(|e| Error::new(ErrorKind::CreateFile, e.to_string()))
            .with_context(|| format!("cannot create {}", output_root.display()))?;
    }

    let files = expand_inputs(input_root, config.no_links, config.no_dot_files)
        .with_context(|| format!("cannot expand {}", input_root.display()))?;
    let mut failed: Option<anyhow::Error> = None;
    for file in files {
        if mode == OpMode::Decompress && file.extension().map_or(true, |e| e != "knz") {
            vlog!(3, "skipping {} (no {KNZ_EXTENSION} extension)", file.display());
            continue;
        }
        let rel = file.strip_prefix(input_root).unwrap_or(&file);
        let out_name = if discard {
            NONE_MARK.to_owned()
        } else {
            let mapped = match mode {
                OpMode::Compress => {
                    let mut p = output_root.join(rel).into_os_string();
                    p.push(KNZ_EXTENSION);
                    PathBuf::from(p)
                }
                OpMode::Decompress => output_root.join(rel).with_extension(""),
            };
            if let Some(parent) = mapped.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::new(ErrorKind::CreateFile, e.to_string()))
                    .with_context(|| format!("cannot create {}", parent.display()))?;
            }
            mapped.to_string_lossy().into_owned()
        };

        let mut per_file = config.clone();
        per_file.input_name = file.to_string_lossy().into_owned();
        per_file.output_name = out_name;

        let result = match mode {
            OpMode::Compress => compress_file(&per_file).map(|_| ()),
            OpMode::Decompress => decompress_file(&per_file).map(|_| ()),
        }
        .with_context(|| format!("while processing {}", per_file.input_name));
        if let Err(e) = result {
            vlog!(1, "kanzi: {e:#}");
            if failed.is_none() {
                failed = Some(e);
            }
        }
    }
    match failed {
        None => Ok(()),
        Some(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn level_preset_applies() {
        let args = parse(&["kanzi", "-c", "-i", "STDIN", "-l", "5", "-j", "2"]);
        let (mode, cfg) = build_config(&args).unwrap();
        assert_eq!(mode, OpMode::Compress);
        assert_eq!(cfg.transform_chain.names(), "BWT+MTFT+ZRLT");
        assert_eq!(cfg.entropy_codec, EntropyType::Ans0);
        assert_eq!(cfg.output_name, STDOUT_MARK);
    }

    #[test]
    fn explicit_flags_override_preset() {
        let args = parse(&[
            "kanzi", "-c", "-i", "STDIN", "-l", "5", "--transform", "LZ", "--entropy", "NONE",
        ]);
        let (_, cfg) = build_config(&args).unwrap();
        assert_eq!(cfg.transform_chain.names(), "LZ");
        assert_eq!(cfg.entropy_codec, EntropyType::None);
    }

    #[test]
    fn output_names_derive_from_input() {
        let args = parse(&["kanzi", "-c", "-i", "data.bin"]);
        let (_, cfg) = build_config(&args).unwrap();
        assert_eq!(cfg.output_name, "data.bin.knz");

        let args = parse(&["kanzi", "-d", "-i", "data.bin.knz"]);
        let (_, cfg) = build_config(&args).unwrap();
        assert_eq!(cfg.output_name, "data.bin");

        let args = parse(&["kanzi", "-d", "-i", "data.bin"]);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn mode_is_mandatory() {
        let args = parse(&["kanzi", "-i", "x"]);
        let err = build_config(&args).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingParam);
    }

    #[test]
    fn checksum_widths() {
        let args = parse(&["kanzi", "-c", "-i", "STDIN", "--checksum", "64"]);
        let (_, cfg) = build_config(&args).unwrap();
        assert_eq!(cfg.checksum, ChecksumKind::Xxh64);

        let args = parse(&["kanzi", "-c", "-i", "STDIN", "--checksum", "16"]);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn block_sizes_parse_suffixes() {
        let args = parse(&["kanzi", "-c", "-i", "STDIN", "-b", "256K"]);
        let (_, cfg) = build_config(&args).unwrap();
        assert_eq!(cfg.block_size, 256 * 1024);
    }
}
