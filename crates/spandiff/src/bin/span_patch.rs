//! `span-patch` — apply a patch to an input file.
//!
//! Exits nonzero when any patch fragment failed to apply.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use spandiff::{Patch, SpanBuf};

/// Apply a patch to an input file.
#[derive(Parser, Debug)]
#[command(name = "span-patch", version, about)]
struct Args {
    /// Input file
    #[arg(short, long)]
    input: PathBuf,

    /// Patch file
    #[arg(short, long)]
    patch: PathBuf,

    /// Output file, defaults to stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Apply the patch in reverse
    #[arg(short, long)]
    reverse: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let input = fs::read(&args.input)
        .with_context(|| format!("cannot read input {}", args.input.display()))?;
    let patch_text = fs::read_to_string(&args.patch)
        .with_context(|| format!("cannot read patch {}", args.patch.display()))?;

    let mut patch = Patch::parse(&patch_text)
        .with_context(|| format!("cannot parse patch {}", args.patch.display()))?;
    if args.reverse {
        patch = patch.reverse();
    }

    let applied = patch.apply(&SpanBuf::from(input))?;
    match &args.output {
        Some(path) => fs::write(path, applied.result().as_bytes())
            .with_context(|| format!("cannot write output {}", path.display()))?,
        None => io::stdout().write_all(applied.result().as_bytes())?,
    }

    for (index, used) in applied.used().iter().enumerate() {
        if !used {
            eprintln!("patch fragment {index} did not apply");
        }
    }
    Ok(if applied.all_used() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
