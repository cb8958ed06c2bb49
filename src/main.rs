//! `call-graph` — whole-program call graph extraction over LLVM IR,
//! with indirect call sites resolved to concrete targets where the
//! collected facts allow it.
//!
//! The report goes to standard output; `[debug]` trace lines from
//! collection and resolution go to standard error through the logger.
//! Files that fail to load are reported and skipped, and the run still
//! exits with 0.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use call_graph_lib as cg;
use cg::output::OutputFormat;


/// Build a whole-program call graph from LLVM modules and resolve
/// indirect calls.
///
/// Examples:
///   call-graph prog.bc                 # single module
///   call-graph a.ll b.ll c.ll          # whole program, one module per TU
///   call-graph --dot prog.bc | dot -Tsvg > graph.svg
#[derive(Parser, Debug)]
#[command(name = "call-graph")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli
{
    /// Input modules: textual IR (.ll), bitcode (.bc), or ELF images
    /// carrying an embedded .llvmbc section
    #[arg(value_name = "FILES", required = true)]
    files: Vec<PathBuf>,

    /// Print the dispatch of each indirect edge under its graph line
    #[arg(short, long)]
    verbose: bool,

    /// Emit the final graph as Graphviz dot instead of the text report
    #[arg(long)]
    dot: bool,
}


fn main() -> Result<()>
{
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("debug"),
    )
    .init();

    let cli = Cli::parse();

    // stage 1: load; failures cost that file's coverage, nothing more
    let modules = cg::inp::load_modules(&cli.files);

    // stages 2-4: collect facts per module, then build and resolve edges
    let mut state = cg::State::empty();
    for module in &modules
    {
        state.collect(module);
    }
    state.build_edges();
    state.resolve();

    // stage 5: sink
    let format = if cli.dot { OutputFormat::Dot } else { OutputFormat::Report };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format
    {
        OutputFormat::Dot    => state.output_dot(&mut out, cg::output::DotConf::default())?,
        OutputFormat::Report => state.output_report(&mut out, cli.verbose)?,
    }

    Ok(())
}
