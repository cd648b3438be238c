use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use cache_sim::{
    config::HierarchyConfig, hierarchy::Hierarchy, io::TextOutput, sim::Simulator,
    trace::TraceReader,
};
use clap::Parser;

#[cfg(feature = "stat")]
use terminal_size::terminal_size;

/// simulate an L1/L2 cache hierarchy over a memory trace
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File path to cache parameters (`.json` for the JSON form)
    config: PathBuf,
    /// File path to memory trace (`<R|W> <hex address>` per line)
    trace: PathBuf,
    /// File path to output (defaults to `<TRACE>.out`)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::init();
    }
    run(args)
}

fn run(args: Cli) -> Result<()> {
    let config = HierarchyConfig::load(&args.config)
        .with_context(|| format!("unable to read cache parameters {}", args.config.display()))?;
    let hierarchy = Hierarchy::from_config(&config)?;

    let trace = File::open(&args.trace)
        .with_context(|| format!("unable to open trace file {}", args.trace.display()))?;
    let output_path = args.output.unwrap_or_else(|| default_output(&args.trace));
    let output = File::create(&output_path)
        .with_context(|| format!("unable to open output file {}", output_path.display()))?;

    let mut sim = Simulator::new(hierarchy, TextOutput::new(BufWriter::new(output)));
    sim.run(TraceReader::new(BufReader::new(trace)))?;
    log::info!("finished simulation. results written to {}", output_path.display());
    output_stat(&sim);
    sim.into_output().finish()?;
    Ok(())
}

/// `<trace>.out`, next to the trace.
fn default_output(trace: &Path) -> PathBuf {
    let mut name = trace.as_os_str().to_owned();
    name.push(".out");
    PathBuf::from(name)
}

#[cfg(not(feature = "stat"))]
fn output_stat<O>(_: &Simulator<O>) {}

#[cfg(feature = "stat")]
fn output_stat<O>(sim: &Simulator<O>) {
    let max_width = get_terminal_width().unwrap_or(120) as usize;
    log::info!("statistics:\n{}", sim.collect_stat().view(max_width));
}

#[cfg(feature = "stat")]
fn get_terminal_width() -> Option<u16> {
    terminal_size().map(|(w, _)| w.0.saturating_sub(20))
}
