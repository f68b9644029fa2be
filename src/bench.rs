use std::num::NonZeroUsize;

use anyhow::{Context, Result};

use crate::{
  baseline::{BaselineStorage, BaselineStore},
  catalog::{BenchmarkSpec, Catalog, LanguageSpec},
  compare::{compare_to_baselines, compare_to_reference, Versus},
  report::Reporter,
  run::Runner,
  stats::{run_pair, BenchmarkResults, Results},
};

/// Which benchmarks a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
  All,
  Named(String),
}

impl From<&str> for Selection {
  fn from(name: &str) -> Self {
    match name {
      "all" => Selection::All,
      name => Selection::Named(name.to_string()),
    }
  }
}

pub struct RunOptions {
  pub selection: Selection,
  /// Languages to run, all of them if empty.
  pub languages: Vec<String>,
  /// Plot each benchmark's trials when more than one language ran.
  pub graph: bool,
}

pub struct Bench<R, S> {
  catalog: Catalog,
  runner: R,
  storage: S,
  /// Baselines as last loaded from `storage`.
  baselines: BaselineStore,
  trials: NonZeroUsize,
}

impl<R: Runner, S: BaselineStorage> Bench<R, S> {
  pub fn new(catalog: Catalog, runner: R, storage: S, trials: NonZeroUsize) -> Result<Self> {
    let baselines = storage.load().context("load baselines")?;

    Ok(Self {
      catalog,
      runner,
      storage,
      baselines,
      trials,
    })
  }

  pub fn catalog(&self) -> &Catalog {
    &self.catalog
  }

  pub fn baselines(&self) -> &BaselineStore {
    &self.baselines
  }

  /// Deletes every baseline recorded for `branch` and persists the result.
  /// Returns whether there was anything to delete.
  pub fn remove_branch(&mut self, branch: &str) -> Result<bool> {
    if !self.baselines.remove_branch(branch) {
      return Ok(false);
    }

    self.storage.save(&self.baselines).context("save baselines")?;
    self.baselines = self.storage.load().context("reload baselines")?;

    Ok(true)
  }

  /// Runs every benchmark for the reference language and records the scores as
  /// `branch`'s baselines, replacing earlier ones. A benchmark that fails
  /// records no score for the branch.
  pub fn generate_baseline<P: Reporter + ?Sized>(&mut self, branch: &str, reporter: &mut P) -> Result<()> {
    let index = self.baselines.branch_index(branch);
    reporter.header(self.baselines.branches())?;

    let reference = self.catalog.reference();
    for benchmark in &self.catalog.benchmarks {
      let result = run_pair(&mut self.runner, reporter, benchmark, reference, self.trials)
        .with_context(|| format!("run {}", benchmark.name))?;

      if let Some(result) = &result {
        let versus = Versus::Baselines(compare_to_baselines(result.score, &self.baselines.scores(&benchmark.name)));
        reporter.pair_finished(result, &versus)?;
      }

      self
        .baselines
        .record_score(&benchmark.name, index, result.map(|r| r.score))?;
    }

    self.storage.save(&self.baselines).context("save baselines")
  }

  /// Runs the selected benchmarks for the selected languages.
  ///
  /// The reference language is compared against its baselines, every other
  /// language against the reference language's score from this run.
  pub fn run<P: Reporter + ?Sized>(&mut self, options: &RunOptions, reporter: &mut P) -> Result<Results> {
    let benchmarks: Vec<&BenchmarkSpec> = match &options.selection {
      Selection::All => self.catalog.benchmarks.iter().collect(),
      Selection::Named(name) => vec![self
        .catalog
        .benchmark(name)
        .with_context(|| format!("unknown benchmark {name:?}"))?],
    };

    for name in &options.languages {
      if self.catalog.language(name).is_none() {
        eprintln!("warning: unknown language {name:?}");
      }
    }

    // Catalog order, so the reference language runs before the others.
    let languages: Vec<&LanguageSpec> = self
      .catalog
      .languages
      .iter()
      .filter(|l| options.languages.is_empty() || options.languages.contains(&l.name))
      .collect();

    reporter.header(self.baselines.branches())?;

    let mut results = Results::new();
    for benchmark in benchmarks {
      let mut by_language = BenchmarkResults::new();
      let mut reference_score = None;

      for &language in &languages {
        let Some(result) = run_pair(&mut self.runner, reporter, benchmark, language, self.trials)
          .with_context(|| format!("run {} - {}", benchmark.name, language.name))?
        else {
          continue;
        };

        let versus = if self.catalog.is_reference(language) {
          reference_score = Some(result.score);
          Versus::Baselines(compare_to_baselines(result.score, &self.baselines.scores(&benchmark.name)))
        } else {
          Versus::Reference(compare_to_reference(reference_score, result.score))
        };

        reporter.pair_finished(&result, &versus)?;
        by_language.insert(language.name.clone(), result);
      }

      if options.graph && languages.len() > 1 {
        reporter.graph(&by_language)?;
      }

      results.insert(benchmark.name.clone(), by_language);
    }

    Ok(results)
  }
}
