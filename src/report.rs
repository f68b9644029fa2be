use std::io::Write;

use anyhow::{Context, Result};

use crate::{
  compare::{Comparison, Verdict, Versus},
  format,
  run::TrialFailure,
  stats::{BenchmarkResults, PairResult},
};

/// Receives progress and results as a run proceeds.
pub trait Reporter {
  /// Starts a results table with one comparison column per known branch.
  fn header(&mut self, branches: &[String]) -> Result<()>;
  fn pair_started(&mut self, desc: &str) -> Result<()>;
  fn trial_finished(&mut self) -> Result<()>;
  /// The pair in progress is abandoned after this.
  fn trial_failed(&mut self, failure: &TrialFailure) -> Result<()>;
  fn pair_finished(&mut self, result: &PairResult, versus: &Versus) -> Result<()>;
  fn graph(&mut self, results: &BenchmarkResults) -> Result<()>;
}

const NAME_WIDTH: usize = 20;
const NUMBER_WIDTH: usize = 6;
const BRANCH_MIN_WIDTH: usize = 8;
const COLUMN_PADDING: &str = "  ";

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const NORMAL: &str = "\x1b[0m";

/// Renders the results table as plain text, optionally with ANSI colors.
pub struct Terminal<W: Write> {
  out: W,
  trials: usize,
  color: bool,
  branches: Vec<String>,
}

impl<W: Write> Terminal<W> {
  pub fn new(out: W, trials: usize, color: bool) -> Self {
    Self {
      out,
      trials,
      color,
      branches: Vec::new(),
    }
  }

  fn run_width(&self) -> usize {
    self.trials.max(3)
  }

  fn branch_width(&self, index: usize) -> usize {
    self
      .branches
      .get(index)
      .map_or(BRANCH_MIN_WIDTH, |b| b.len().max(BRANCH_MIN_WIDTH))
  }

  fn paint(&self, text: String, verdict: Verdict) -> String {
    match (self.color, verdict) {
      (true, Verdict::Improvement) => format!("{GREEN}{text}{NORMAL}"),
      (true, Verdict::Regression) => format!("{RED}{text}{NORMAL}"),
      _ => text,
    }
  }

  fn format_versus(&self, versus: &Versus) -> String {
    match versus {
      Versus::Reference(Comparison::Ratio { percent, verdict }) => self.paint(format!("{percent:^6.2}%"), *verdict),
      Versus::Reference(Comparison::NoData) => "---".to_string(),
      Versus::Baselines(comparisons) => comparisons
        .iter()
        .enumerate()
        .map(|(i, comparison)| {
          let width = self.branch_width(i);
          let column = match comparison {
            Comparison::Ratio { percent, verdict } => {
              self.paint(format!("{:^width$}", format!("{percent:^6.2}%")), *verdict)
            }
            Comparison::NoData => format!("{:^width$}", "---"),
          };

          format!("{column}{COLUMN_PADDING}")
        })
        .collect(),
    }
  }
}

impl<W: Write> Reporter for Terminal<W> {
  fn header(&mut self, branches: &[String]) -> Result<()> {
    self.branches = branches.to_vec();
    let run = self.run_width();

    let mut titles = format!(
      "{:^NAME_WIDTH$}{COLUMN_PADDING}{:^run$}{COLUMN_PADDING}{:^NUMBER_WIDTH$}{COLUMN_PADDING}{:^NUMBER_WIDTH$}{COLUMN_PADDING}",
      "Name", "Run", "Best", "SD"
    );
    let mut rule = format!(
      "{:-^NAME_WIDTH$}{COLUMN_PADDING}{:-^run$}{COLUMN_PADDING}{:-^NUMBER_WIDTH$}{COLUMN_PADDING}{:-^NUMBER_WIDTH$}{COLUMN_PADDING}",
      "", "", "", ""
    );
    for (i, branch) in self.branches.iter().enumerate() {
      let width = self.branch_width(i);
      titles.push_str(&format!("{branch:^width$}{COLUMN_PADDING}"));
      rule.push_str(&format!("{:-^width$}{COLUMN_PADDING}", ""));
    }

    writeln!(self.out, "{}", titles.trim_end()).context("write")?;
    writeln!(self.out, "{}", rule.trim_end()).context("write")?;

    Ok(())
  }

  fn pair_started(&mut self, desc: &str) -> Result<()> {
    let padding = self.run_width() - self.trials;
    write!(self.out, "{desc:<NAME_WIDTH$}{COLUMN_PADDING}{:padding$}", "").context("write")?;
    self.out.flush().context("flush")
  }

  fn trial_finished(&mut self) -> Result<()> {
    write!(self.out, ".").context("write")?;
    self.out.flush().context("flush")
  }

  fn trial_failed(&mut self, failure: &TrialFailure) -> Result<()> {
    writeln!(self.out).context("write")?;

    match failure {
      TrialFailure::ExecutableNotFound { program, .. } => {
        writeln!(self.out, "Interpreter was not found ({program})").context("write")?;
      }
      TrialFailure::NonZeroExit { status, .. } => {
        writeln!(self.out, "[Error] Interpreter exited with a non zero status! ({status})").context("write")?;
        writeln!(self.out, "Output: ").context("write")?;
      }
      TrialFailure::OutputMismatch { expected, .. } => {
        writeln!(self.out, "Expected:\n{expected}\nelapsed: <seconds>").context("write")?;
        writeln!(self.out, "Incorrect output:").context("write")?;
      }
    }

    if let Some(output) = failure.output() {
      writeln!(self.out, "{output}").context("write")?;
    }

    Ok(())
  }

  fn pair_finished(&mut self, result: &PairResult, versus: &Versus) -> Result<()> {
    let versus = self.format_versus(versus);
    writeln!(
      self.out,
      "{COLUMN_PADDING}{:4.2}s   {:4.4}   {}",
      result.best,
      result.deviation,
      versus.trim_end()
    )
    .context("write")
  }

  fn graph(&mut self, results: &BenchmarkResults) -> Result<()> {
    write!(self.out, "{}", format::graph(results)?).context("write")
  }
}
