mod baseline;
mod bench;
mod catalog;
mod compare;
mod ext;
mod format;
mod report;
mod run;
mod stats;

use std::{
  env,
  io::{self, IsTerminal},
  num::NonZeroUsize,
  path::PathBuf,
  process::Command,
};

use anyhow::{Context, Result};
use clap::Parser;

use self::{
  baseline::JsonFile,
  bench::{Bench, RunOptions},
  catalog::Catalog,
  ext::CommandExt,
  report::Terminal,
  run::ProcessRunner,
};

/// Branch name used when none is given and git cannot tell.
const DEFAULT_BRANCH: &str = "<default>";

/// Runs the benchmarks.
#[derive(Parser, Debug)]
struct Args {
  /// The benchmark to run, or "all".
  #[arg(default_value = "all")]
  benchmark: String,
  /// Record the reference language's scores as baselines for the current
  /// branch, instead of running the benchmarks.
  #[arg(long)]
  generate_baseline: bool,
  /// Display graph results.
  #[arg(long)]
  graph: bool,
  /// Which language(s) to run benchmarks for.
  #[arg(short, long = "language")]
  languages: Vec<String>,
  /// Output the results chart as HTML.
  #[arg(long)]
  output_html: bool,
  /// Number of trials per benchmark and language.
  #[arg(short = 'n', long = "numtrials", default_value = "10")]
  trials: NonZeroUsize,
  /// Name of the current branch, detected with git if omitted.
  #[arg(short, long)]
  branch: Option<String>,
  /// Remove a branch's baselines before doing anything else.
  #[arg(short, long)]
  remove_baseline: Option<String>,
  /// Directory holding the benchmark sources and `baseline.json`.
  #[arg(long, default_value = "tests/benchmark")]
  benchmark_dir: PathBuf,
  /// The `next` executable to benchmark.
  #[arg(long, default_value = "./next")]
  interpreter: PathBuf,
}

/// The current git branch, or [`DEFAULT_BRANCH`] outside a repository.
fn current_branch() -> String {
  Command::new("git")
    .args(["rev-parse", "--abbrev-ref", "HEAD"])
    .status_stdout()
    .map(|out| out.trim_end().to_string())
    .ok()
    .filter(|branch| !branch.is_empty())
    .unwrap_or_else(|| DEFAULT_BRANCH.to_string())
}

fn use_color() -> bool {
  !cfg!(windows) && env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal()
}

fn main() -> Result<()> {
  let args = Args::parse();

  let catalog = Catalog::standard(&args.interpreter).context("catalog")?;
  let runner = ProcessRunner::new(&args.benchmark_dir);
  let storage = JsonFile::in_dir(&args.benchmark_dir);

  let mut bench = Bench::new(catalog, runner, storage, args.trials).context("Bench::new")?;
  let mut terminal = Terminal::new(io::stdout().lock(), args.trials.get(), use_color());

  if let Some(removed) = &args.remove_baseline {
    if bench.remove_branch(removed).context("remove baseline")? {
      eprintln!("removed baselines of branch {removed:?}");
    } else {
      eprintln!("no baselines for branch {removed:?}");
    }
  }

  if args.generate_baseline {
    let branch = args.branch.unwrap_or_else(current_branch);
    eprintln!("generating baseline for branch {branch:?}");
    bench
      .generate_baseline(&branch, &mut terminal)
      .context("generate baseline")?;
    eprintln!(
      "saved baselines for {} branch(es): {}",
      bench.baselines().branches().len(),
      bench.baselines().branches().join(", ")
    );

    return Ok(());
  }

  let options = RunOptions {
    selection: args.benchmark.as_str().into(),
    languages: args.languages,
    graph: args.graph,
  };
  let results = bench.run(&options, &mut terminal).context("run")?;

  if args.output_html {
    drop(terminal);
    print!("{}", format::html(&results, bench.catalog()).context("format html")?);
  }

  Ok(())
}
