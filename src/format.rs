use std::fmt::Write;

use anyhow::Result;

use crate::{
  catalog::Catalog,
  stats::{self, BenchmarkResults, Results},
};

/// Cells per graph line.
const GRAPH_WIDTH: usize = 68;
const DESC_WIDTH: usize = 30;

/// Next mark for a graph cell hit by one more trial.
fn bump(cell: char) -> char {
  match cell {
    '-' => 'o',
    'o' => 'O',
    _ => '0',
  }
}

/// Plots the score of every trial of one benchmark, one line per language,
/// scaled so that the best score overall lands in the last column.
pub fn graph(results: &BenchmarkResults) -> Result<String> {
  let mut out = String::new();

  let highest = results.values().map(|r| r.score).fold(0.0, f64::max);
  if results.is_empty() || highest <= 0.0 {
    return Ok(out);
  }

  writeln!(out)?;
  writeln!(out, "{:DESC_WIDTH$}0 {highest:66.0}", "")?;

  for result in results.values() {
    let mut line = vec!['-'; GRAPH_WIDTH];
    for &time in &result.times {
      let index = (stats::score(time) / highest * (GRAPH_WIDTH - 1) as f64) as usize;
      let cell = &mut line[index.min(GRAPH_WIDTH - 1)];
      *cell = bump(*cell);
    }

    writeln!(out, "{:DESC_WIDTH$}{}", result.desc, line.into_iter().collect::<String>())?;
  }

  writeln!(out)?;

  Ok(out)
}

/// Renders one bar chart per benchmark with results, fastest language first.
/// Bars are proportional to the best time, relative to the slowest language.
pub fn html(results: &Results, catalog: &Catalog) -> Result<String> {
  let mut out = String::new();

  for benchmark in &catalog.benchmarks {
    let Some(by_language) = results.get(&benchmark.name).filter(|r| !r.is_empty()) else {
      continue;
    };

    let slowest = by_language.values().map(|r| r.best).fold(0.0, f64::max);

    let mut languages = by_language.iter().collect::<Vec<_>>();
    languages.sort_by(|(_, a), (_, b)| b.score.total_cmp(&a.score));

    writeln!(out, "<h3>{}</h3>", benchmark.title)?;
    writeln!(out, r#"<table class="chart">"#)?;

    for (language, result) in languages {
      let width = (100.0 * result.best / slowest) as u32;
      let class = if language == &catalog.reference().name {
        "chart-bar next"
      } else {
        "chart-bar"
      };

      writeln!(out, "  <tr>")?;
      writeln!(
        out,
        r#"    <th>{language}</th><td><div class="{class}" style="width: {width}%;">{:4.2}s&nbsp;</div></td>"#,
        result.best
      )?;
      writeln!(out, "  </tr>")?;
    }

    writeln!(out, "</table>")?;
  }

  Ok(out)
}
