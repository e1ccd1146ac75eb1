//! Binary entry point for the `kanzi` command-line tool.

use clap::Parser;

use kanzi::cli::{run, Args};

fn main() {
    let args = Args::parse();
    std::process::exit(run(args));
}
