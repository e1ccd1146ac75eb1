//! File-level front end: path resolution, overwrite policy, directory
//! expansion, and the compress/decompress drivers used by the CLI.

mod compress;
mod decompress;
mod file_io;
mod file_list;
mod info;

pub use compress::compress_file;
pub use decompress::decompress_file;
pub use file_io::{open_input, open_output, CountingWriter};
pub use file_list::expand_inputs;
pub use info::InfoListener;
