use std::{collections::BTreeMap, num::NonZeroUsize};

use anyhow::Result;

use crate::{
  catalog::{BenchmarkSpec, LanguageSpec},
  report::Reporter,
  run::{Runner, Timing},
};

/// Scale applied to inverse times so that scores land in a readable range.
const SCORE_SCALE: f64 = 1000.0;

/// Results of one run, by benchmark name and then language name.
pub type Results = BTreeMap<String, BenchmarkResults>;

/// Results of a single benchmark, by language name.
pub type BenchmarkResults = BTreeMap<String, PairResult>;

/// Reduced timings of one benchmark for one language.
#[derive(Debug, Clone, PartialEq)]
pub struct PairResult {
  /// `"<benchmark> - <language>"`
  pub desc: String,
  pub times: Vec<Timing>,
  pub best: Timing,
  pub score: f64,
  pub deviation: f64,
}

impl PairResult {
  /// Reduces the timings of a pair's trials. Returns `None` if there are none.
  pub fn from_times(desc: String, times: Vec<Timing>) -> Option<Self> {
    let best = times.iter().copied().reduce(f64::min)?;

    Some(Self {
      desc,
      score: score(best),
      deviation: standard_deviation(&times),
      best,
      times,
    })
  }
}

/// Inverse of `time`, so faster is bigger.
pub fn score(time: Timing) -> f64 {
  SCORE_SCALE / time
}

/// Population standard deviation of `times`. Zero for an empty slice.
pub fn standard_deviation(times: &[Timing]) -> f64 {
  if times.is_empty() {
    return 0.0;
  }

  let n = times.len() as f64;
  let mean = times.iter().sum::<f64>() / n;
  let variance = times.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n;

  variance.sqrt()
}

/// Runs `trials` trials of `benchmark` for `language`.
///
/// Returns `Ok(None)` when the language has no implementation of the
/// benchmark, and when any trial fails. A failing trial is reported and ends
/// the pair, the remaining trials are not run.
pub fn run_pair<R: Runner + ?Sized, P: Reporter + ?Sized>(
  runner: &mut R,
  reporter: &mut P,
  benchmark: &BenchmarkSpec,
  language: &LanguageSpec,
  trials: NonZeroUsize,
) -> Result<Option<PairResult>> {
  if !runner.has_source(benchmark, language) {
    return Ok(None);
  }

  let desc = format!("{} - {}", benchmark.name, language.name);
  reporter.pair_started(&desc)?;

  let mut times = Vec::with_capacity(trials.get());
  for _ in 0..trials.get() {
    match runner.run_trial(benchmark, language) {
      Ok(time) => {
        times.push(time);
        reporter.trial_finished()?;
      }
      Err(failure) => {
        reporter.trial_failed(&failure)?;
        return Ok(None);
      }
    }
  }

  Ok(PairResult::from_times(desc, times))
}

#[cfg(test)]
pub(crate) mod tests {
  use std::collections::VecDeque;

  use super::*;
  use crate::{report::tests::Recorder, run::TrialFailure};

  /// Replays a fixed sequence of trial outcomes.
  pub struct Scripted {
    pub missing: Vec<(String, String)>,
    pub outcomes: VecDeque<Result<Timing, TrialFailure>>,
    pub calls: usize,
  }

  impl Scripted {
    pub fn new<I: IntoIterator<Item = Result<Timing, TrialFailure>>>(outcomes: I) -> Self {
      Self {
        missing: Vec::new(),
        outcomes: outcomes.into_iter().collect(),
        calls: 0,
      }
    }

    pub fn times<I: IntoIterator<Item = Timing>>(times: I) -> Self {
      Self::new(times.into_iter().map(Ok))
    }
  }

  impl Runner for Scripted {
    fn has_source(&self, benchmark: &BenchmarkSpec, language: &LanguageSpec) -> bool {
      !self
        .missing
        .iter()
        .any(|(b, l)| *b == benchmark.name && *l == language.name)
    }

    fn run_trial(&mut self, _: &BenchmarkSpec, _: &LanguageSpec) -> Result<Timing, TrialFailure> {
      self.calls += 1;
      self.outcomes.pop_front().expect("no scripted outcome left")
    }
  }

  pub fn mismatch() -> Result<Timing, TrialFailure> {
    Err(TrialFailure::OutputMismatch {
      expected: "317811".to_string(),
      output: "garbage".to_string(),
    })
  }

  fn fib() -> BenchmarkSpec {
    BenchmarkSpec::new("fib", "Recursive Fibonacci", "317811").unwrap()
  }

  fn next() -> LanguageSpec {
    LanguageSpec::new("next", ["next"], ".n")
  }

  fn trials(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
  }

  #[test]
  fn best_is_minimum_and_score_is_inverse() {
    for times in [vec![0.25], vec![0.6, 0.5, 0.55], vec![2.0, 4.0, 1.0, 8.0]] {
      let best = times.iter().copied().fold(f64::INFINITY, f64::min);
      let result = PairResult::from_times("x".into(), times).unwrap();

      assert_eq!(result.best, best);
      assert_eq!(result.score, 1000.0 / best);
    }
  }

  #[test]
  fn deviation_of_identical_times_is_zero() {
    assert_eq!(standard_deviation(&[0.3; 7]), 0.0);
    assert_eq!(standard_deviation(&[1.5]), 0.0);
  }

  #[test]
  fn deviation_uses_population_formula() {
    // Sample deviation would be 1.0 here.
    assert_eq!(standard_deviation(&[1.0, 3.0]), 1.0);
    assert!((standard_deviation(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.0).abs() < 1e-12);
  }

  #[test]
  fn fib_pair_reduces_three_trials() {
    let mut runner = Scripted::times([0.6, 0.5, 0.55]);
    let mut recorder = Recorder::default();

    let result = run_pair(&mut runner, &mut recorder, &fib(), &next(), trials(3))
      .unwrap()
      .unwrap();

    assert_eq!(result.desc, "fib - next");
    assert_eq!(result.times, vec![0.6, 0.5, 0.55]);
    assert_eq!(result.best, 0.5);
    assert_eq!(result.score, 2000.0);
    assert!((result.deviation - 0.0408).abs() < 1e-4);
    assert_eq!(recorder.dots, 3);
  }

  #[test]
  fn any_invalid_trial_aborts_the_pair() {
    for n in 2..=5 {
      for bad in 0..n {
        let outcomes = (0..n).map(|i| if i == bad { mismatch() } else { Ok(0.5) });
        let mut runner = Scripted::new(outcomes);
        let mut recorder = Recorder::default();

        let result = run_pair(&mut runner, &mut recorder, &fib(), &next(), trials(n)).unwrap();

        assert_eq!(result, None, "failure at {bad} of {n}");
        assert_eq!(runner.calls, bad + 1, "trials after the failure must not run");
        assert_eq!(recorder.failures, 1);
      }
    }
  }

  #[test]
  fn missing_source_is_skipped_silently() {
    let mut runner = Scripted::times([]);
    runner.missing.push(("fib".into(), "next".into()));
    let mut recorder = Recorder::default();

    let result = run_pair(&mut runner, &mut recorder, &fib(), &next(), trials(3)).unwrap();

    assert_eq!(result, None);
    assert_eq!(runner.calls, 0);
    assert!(recorder.started.is_empty());
  }
}
