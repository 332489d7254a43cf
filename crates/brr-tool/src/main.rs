//! `brr`: decode SNES BRR samples to WAV and find them inside ROM images.
//!
//! Log output goes to stderr and follows `RUST_LOG` (default `info`).

mod args;
mod batch;
mod decode;
mod scan;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use args::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decode {
            input,
            output,
            options,
        } => decode::run(&input, &output, &options),
        Commands::Batch {
            input_dir,
            output_dir,
            extension,
            recursive,
            options,
        } => batch::run(&input_dir, &output_dir, &extension, recursive, &options),
        Commands::Scan(scan_args) => scan::run(&scan_args),
    }
}
