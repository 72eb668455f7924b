//! `span-diff` — create a patch from two input files.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use spandiff::{Diff, Patch, SpanBuf};

/// Create a patch from two input files.
#[derive(Parser, Debug)]
#[command(name = "span-diff", version, about)]
struct Args {
    /// Left (old) input file
    #[arg(short, long)]
    left: PathBuf,

    /// Right (new) input file
    #[arg(short, long)]
    right: PathBuf,

    /// Patch output file, defaults to stdout
    #[arg(short, long)]
    patch: Option<PathBuf>,

    /// Cap diff computation at this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let left = fs::read(&args.left)
        .with_context(|| format!("cannot read left input {}", args.left.display()))?;
    let right = fs::read(&args.right)
        .with_context(|| format!("cannot read right input {}", args.right.display()))?;

    let mut builder = Diff::builder();
    if let Some(ms) = args.timeout_ms {
        builder = builder.process_time(Duration::from_millis(ms));
    }
    let diff = builder.build(&SpanBuf::from(left), &SpanBuf::from(right));
    let patch = Patch::from_diff(&diff);

    match &args.patch {
        Some(path) => fs::write(path, patch.to_string())
            .with_context(|| format!("cannot write patch {}", path.display()))?,
        None => io::stdout().write_all(patch.to_string().as_bytes())?,
    }
    Ok(())
}
