use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

/// A benchmark program and the output every implementation of it must print.
#[derive(Debug, Clone)]
pub struct BenchmarkSpec {
  pub name: String,
  /// Display name used by the HTML chart.
  pub title: String,
  /// Exact text the program prints before its `elapsed:` line.
  pub expected: String,
  validator: Regex,
}

impl BenchmarkSpec {
  pub fn new(name: &str, title: &str, expected: &str) -> Result<Self> {
    let validator = Regex::new(&format!(r"\A{}\r?\nelapsed: (\d+\.\d+)\s*\z", regex::escape(expected)))
      .with_context(|| format!("validator for {name:?}"))?;

    Ok(Self {
      name: name.to_string(),
      title: title.to_string(),
      expected: expected.to_string(),
      validator,
    })
  }

  /// Returns the elapsed seconds reported in `stdout`, or `None` if the output
  /// is not exactly the expected content followed by a positive timing line.
  pub fn parse_elapsed(&self, stdout: &str) -> Option<f64> {
    let captures = self.validator.captures(stdout)?;
    let elapsed: f64 = captures[1].parse().ok()?;

    (elapsed > 0.0).then_some(elapsed)
  }
}

/// An implementation language, run as `command... <source file>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSpec {
  pub name: String,
  pub command: Vec<String>,
  /// Source file extension, including the dot.
  pub extension: String,
}

impl LanguageSpec {
  pub fn new<I, S>(name: &str, command: I, extension: &str) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      name: name.to_string(),
      command: command.into_iter().map(Into::into).collect(),
      extension: extension.to_string(),
    }
  }
}

/// The benchmarks and languages a run iterates over. The first language is the
/// reference language: the one under development, compared against the
/// others and against its own baselines.
#[derive(Debug, Clone)]
pub struct Catalog {
  pub benchmarks: Vec<BenchmarkSpec>,
  pub languages: Vec<LanguageSpec>,
}

impl Catalog {
  pub fn new(benchmarks: Vec<BenchmarkSpec>, languages: Vec<LanguageSpec>) -> Result<Self> {
    if languages.is_empty() {
      anyhow::bail!("catalog has no languages");
    }

    Ok(Self { benchmarks, languages })
  }

  /// The stock benchmark suite, with `interpreter` as the reference `next`
  /// executable.
  pub fn standard(interpreter: &Path) -> Result<Self> {
    let benchmarks = STANDARD_BENCHMARKS
      .iter()
      .map(|(name, title, expected)| BenchmarkSpec::new(name, title, expected))
      .collect::<Result<Vec<_>>>()?;

    let languages = vec![
      LanguageSpec::new("next", [interpreter.to_string_lossy().into_owned()], ".n"),
      LanguageSpec::new("lua", ["lua"], ".lua"),
      LanguageSpec::new("luajit (-joff)", ["luajit", "-joff"], ".lua"),
      LanguageSpec::new("python", ["python"], ".py"),
      LanguageSpec::new("python3", ["python3"], ".py"),
      LanguageSpec::new("ruby", ["ruby"], ".rb"),
    ];

    Self::new(benchmarks, languages)
  }

  pub fn reference(&self) -> &LanguageSpec {
    &self.languages[0]
  }

  pub fn is_reference(&self, language: &LanguageSpec) -> bool {
    self.reference().name == language.name
  }

  pub fn benchmark(&self, name: &str) -> Option<&BenchmarkSpec> {
    self.benchmarks.iter().find(|b| b.name == name)
  }

  pub fn language(&self, name: &str) -> Option<&LanguageSpec> {
    self.languages.iter().find(|l| l.name == name)
  }
}

const STANDARD_BENCHMARKS: &[(&str, &str, &str)] = &[
  ("arrays", "Arrays", "500000500000"),
  (
    "binary_trees",
    "Binary Trees",
    "stretch tree of depth 13 check: -1
8192 trees of depth 4 check: -8192
2048 trees of depth 6 check: -2048
512 trees of depth 8 check: -512
128 trees of depth 10 check: -128
32 trees of depth 12 check: -32
long lived tree of depth 12 check: -1",
  ),
  ("delta_blue", "DeltaBlue", "14065400"),
  ("fannkuch_redx", "Fannkuch Redux", "8629\npfannkuchen 9 = 30"),
  ("fib", "Recursive Fibonacci", "317811\n317811\n317811\n317811\n317811"),
  ("fibers", "Fibers", "4999950000"),
  (
    "garbage_test",
    "Garbage Collection",
    "Final object : <object of 'MyClass'> {2000000, 2000002, 2000002, 2000000}",
  ),
  ("mandelbrot", "Mandelbrot", "3165191"),
  ("map_numeric", "Map (Numeric Keys)", "2000001000000"),
  ("map_string", "Map (String Keys)", "12799920000"),
  ("method_call", "Method Call", "true\nfalse"),
  // Last digits differ from the reference nbody output, value encoding loses
  // some precision.
  ("nbody", "N-Body", "-0.16907516382852\n-0.16907807066611"),
  ("spectral_norm", "Spectral Norm", "1.623647098"),
  ("string_equals", "String Equals", "3000000"),
  ("tuples", "Tuples", "500000500000"),
  ("while", "While Loop", "12500002500003"),
];
