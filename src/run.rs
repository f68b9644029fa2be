use std::{
  io,
  path::PathBuf,
  process::Command,
};

use crate::{
  catalog::{BenchmarkSpec, LanguageSpec},
  ext::CommandExt,
};

/// Elapsed seconds reported by a benchmark program.
pub type Timing = f64;

/// Why a single trial did not produce a timing.
#[derive(thiserror::Error, Debug)]
pub enum TrialFailure {
  #[error("interpreter {program:?} not found")]
  ExecutableNotFound {
    program: String,
    #[source]
    source: io::Error,
  },
  #[error("interpreter exited with non-zero status {status}")]
  NonZeroExit { status: String, output: String },
  #[error("incorrect output")]
  OutputMismatch { expected: String, output: String },
}

impl TrialFailure {
  /// Raw output of the failed trial, if the process got far enough to produce
  /// any.
  pub fn output(&self) -> Option<&str> {
    match self {
      TrialFailure::ExecutableNotFound { .. } => None,
      TrialFailure::NonZeroExit { output, .. } | TrialFailure::OutputMismatch { output, .. } => Some(output),
    }
  }
}

/// Executes single trials of a benchmark for a language.
pub trait Runner {
  /// Whether `language` has an implementation of `benchmark` at all.
  fn has_source(&self, benchmark: &BenchmarkSpec, language: &LanguageSpec) -> bool;

  /// Runs `benchmark` once with `language`, returning the elapsed time it
  /// reported.
  fn run_trial(&mut self, benchmark: &BenchmarkSpec, language: &LanguageSpec) -> Result<Timing, TrialFailure>;
}

/// Runs benchmark sources from a directory as child processes.
///
/// Each trial blocks until the child exits, there is no timeout.
pub struct ProcessRunner {
  dir: PathBuf,
}

impl ProcessRunner {
  pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
    Self { dir: dir.into() }
  }

  /// `<dir>/<benchmark><extension>`
  pub fn source(&self, benchmark: &BenchmarkSpec, language: &LanguageSpec) -> PathBuf {
    self.dir.join(format!("{}{}", benchmark.name, language.extension))
  }
}

impl Runner for ProcessRunner {
  fn has_source(&self, benchmark: &BenchmarkSpec, language: &LanguageSpec) -> bool {
    self.source(benchmark, language).is_file()
  }

  fn run_trial(&mut self, benchmark: &BenchmarkSpec, language: &LanguageSpec) -> Result<Timing, TrialFailure> {
    let (program, args) = match language.command.split_first() {
      Some(split) => split,
      None => {
        return Err(TrialFailure::ExecutableNotFound {
          program: String::new(),
          source: io::Error::new(io::ErrorKind::InvalidInput, "empty command"),
        })
      }
    };

    let (status, output) = Command::new(program)
      .args(args)
      .arg(self.source(benchmark, language))
      .capture_stdout()
      .map_err(|source| TrialFailure::ExecutableNotFound {
        program: program.clone(),
        source,
      })?;

    if !status.success() {
      return Err(TrialFailure::NonZeroExit {
        status: status.to_string(),
        output,
      });
    }

    benchmark
      .parse_elapsed(&output)
      .ok_or_else(|| TrialFailure::OutputMismatch {
        expected: benchmark.expected.clone(),
        output,
      })
  }
}
