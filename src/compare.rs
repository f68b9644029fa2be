/// Ratios above this percentage count as an improvement.
const IMPROVEMENT_ABOVE: f64 = 105.0;
/// Ratios below this percentage count as a regression.
const REGRESSION_BELOW: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
  Improvement,
  Regression,
  Neutral,
}

impl Verdict {
  pub fn classify(ratio: f64) -> Self {
    if ratio > IMPROVEMENT_ABOVE {
      Verdict::Improvement
    } else if ratio < REGRESSION_BELOW {
      Verdict::Regression
    } else {
      Verdict::Neutral
    }
  }
}

/// A score compared against another one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
  /// There was nothing to compare against.
  NoData,
  /// `100 * candidate / other`, so above 100 means the candidate is faster.
  Ratio { percent: f64, verdict: Verdict },
}

impl Comparison {
  pub fn new(candidate: f64, against: f64) -> Self {
    let percent = 100.0 * candidate / against;

    Comparison::Ratio {
      percent,
      verdict: Verdict::classify(percent),
    }
  }
}

/// What a finished pair was compared against.
#[derive(Debug, Clone, PartialEq)]
pub enum Versus {
  /// The reference language against its own history, one entry per branch.
  Baselines(Vec<Comparison>),
  /// The reference language's score against this language's score.
  Reference(Comparison),
}

/// Compares `score` against every branch's baseline, slot for slot.
pub fn compare_to_baselines(score: f64, baselines: &[Option<f64>]) -> Vec<Comparison> {
  baselines
    .iter()
    .map(|baseline| match baseline {
      Some(baseline) => Comparison::new(score, *baseline),
      None => Comparison::NoData,
    })
    .collect()
}

/// Compares the reference language's score from the same run against another
/// language's `score`. Above 100 means the reference language is faster.
pub fn compare_to_reference(reference: Option<f64>, score: f64) -> Comparison {
  match reference {
    Some(reference) => Comparison::new(reference, score),
    None => Comparison::NoData,
  }
}
