use std::{
  collections::BTreeMap,
  fs, io,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

use crate::ext::PathExt;

/// Historical scores per branch.
///
/// `branches` assigns every branch an index, and each benchmark's score list
/// is indexed by it: slot `i` always belongs to `branches[i]`. Score lists may
/// be shorter than `branches`, missing slots read as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineStore {
  #[serde(rename = "branch list", default, deserialize_with = "null_as_empty")]
  branches: Vec<String>,
  #[serde(flatten)]
  scores: BTreeMap<String, Vec<Option<f64>>>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
  Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl BaselineStore {
  pub fn branches(&self) -> &[String] {
    &self.branches
  }

  pub fn position(&self, branch: &str) -> Option<usize> {
    self.branches.iter().position(|b| b == branch)
  }

  /// Index of `branch`, registering it at the end if it is new.
  pub fn branch_index(&mut self, branch: &str) -> usize {
    if let Some(index) = self.position(branch) {
      return index;
    }

    self.branches.push(branch.to_string());
    self.branches.len() - 1
  }

  /// Sets the score of `benchmark` for the branch at `index`, replacing any
  /// previous value.
  pub fn record_score(&mut self, benchmark: &str, index: usize, score: Option<f64>) -> Result<()> {
    if index >= self.branches.len() {
      anyhow::bail!(
        "branch index {index} out of range for {} known branches",
        self.branches.len()
      );
    }

    let scores = self.scores.entry(benchmark.to_string()).or_default();
    if scores.len() <= index {
      scores.resize(index + 1, None);
    }
    scores[index] = score;

    Ok(())
  }

  /// Forgets `branch` and its score in every benchmark. Later branches move
  /// down one index. Returns whether the branch existed.
  pub fn remove_branch(&mut self, branch: &str) -> bool {
    let Some(index) = self.position(branch) else {
      return false;
    };

    self.branches.remove(index);
    for scores in self.scores.values_mut() {
      if index < scores.len() {
        scores.remove(index);
      }
    }

    true
  }

  /// Scores of `benchmark`, one per known branch.
  pub fn scores(&self, benchmark: &str) -> Vec<Option<f64>> {
    let mut scores = self.scores.get(benchmark).cloned().unwrap_or_default();
    scores.resize(self.branches.len(), None);

    scores
  }

  /// Drops score slots that have no branch. Only hand-edited files have them.
  fn truncate_orphans(&mut self) {
    let len = self.branches.len();
    for scores in self.scores.values_mut() {
      scores.truncate(len);
    }
  }
}

/// Where a [`BaselineStore`] is kept between runs.
pub trait BaselineStorage {
  fn load(&self) -> Result<BaselineStore>;
  fn save(&self, store: &BaselineStore) -> Result<()>;
}

/// A JSON document on disk, conventionally `baseline.json` in the benchmark
/// directory.
pub struct JsonFile {
  path: PathBuf,
}

impl JsonFile {
  pub const FILE_NAME: &'static str = "baseline.json";

  pub fn new<P: Into<PathBuf>>(path: P) -> Self {
    Self { path: path.into() }
  }

  pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
    Self::new(dir.as_ref().join(Self::FILE_NAME))
  }
}

impl BaselineStorage for JsonFile {
  fn load(&self) -> Result<BaselineStore> {
    let json = match fs::read_to_string(&self.path) {
      Ok(json) => json,
      Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BaselineStore::default()),
      Err(err) => return Err(err).with_context(|| format!("read {:?}", self.path)),
    };

    let mut store: BaselineStore = serde_json::from_str(&json).with_context(|| format!("parse {:?}", self.path))?;
    store.truncate_orphans();

    Ok(store)
  }

  fn save(&self, store: &BaselineStore) -> Result<()> {
    let json = serde_json::to_vec_pretty(store).context("serialize baselines")?;
    self.path.write_atomic(&json)
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use std::cell::RefCell;

  use tempfile::TempDir;

  use super::*;

  /// Keeps the "persisted" store in memory and counts saves.
  #[derive(Default)]
  pub struct InMemory {
    pub stored: RefCell<BaselineStore>,
    pub saves: RefCell<usize>,
  }

  impl BaselineStorage for InMemory {
    fn load(&self) -> Result<BaselineStore> {
      Ok(self.stored.borrow().clone())
    }

    fn save(&self, store: &BaselineStore) -> Result<()> {
      *self.stored.borrow_mut() = store.clone();
      *self.saves.borrow_mut() += 1;
      Ok(())
    }
  }

  fn assert_aligned(store: &BaselineStore) {
    for (benchmark, scores) in &store.scores {
      assert!(
        scores.len() <= store.branches.len(),
        "{benchmark} has {} slots for {} branches",
        scores.len(),
        store.branches.len()
      );
    }
  }

  #[test]
  fn branch_index_is_idempotent() {
    let mut store = BaselineStore::default();

    assert_eq!(store.branch_index("main"), 0);
    assert_eq!(store.branch_index("feature-x"), 1);
    assert_eq!(store.branch_index("main"), 0);
    assert_eq!(store.branches(), ["main", "feature-x"]);
  }

  #[test]
  fn record_score_pads_and_overwrites() {
    let mut store = BaselineStore::default();
    store.branch_index("a");
    store.branch_index("b");
    let c = store.branch_index("c");

    store.record_score("fib", c, Some(3.0)).unwrap();
    assert_eq!(store.scores("fib"), vec![None, None, Some(3.0)]);

    store.record_score("fib", c, Some(4.0)).unwrap();
    store.record_score("fib", 0, Some(1.0)).unwrap();
    assert_eq!(store.scores("fib"), vec![Some(1.0), None, Some(4.0)]);

    assert!(store.record_score("fib", 3, Some(1.0)).is_err());
    assert_aligned(&store);
  }

  #[test]
  fn scores_are_padded_to_branch_count() {
    let mut store = BaselineStore::default();
    let main = store.branch_index("main");
    store.record_score("fib", main, Some(12.5)).unwrap();
    store.branch_index("feature-x");

    assert_eq!(store.scores("fib"), vec![Some(12.5), None]);
    assert_eq!(store.scores("nbody"), vec![None, None]);
    assert!(BaselineStore::default().scores("fib").is_empty());
  }

  #[test]
  fn remove_branch_shifts_every_benchmark() {
    let mut store = BaselineStore::default();
    for branch in ["a", "b", "c"] {
      store.branch_index(branch);
    }
    for (i, score) in [1.0, 2.0, 3.0].into_iter().enumerate() {
      store.record_score("fib", i, Some(score)).unwrap();
    }
    store.record_score("short", 0, Some(10.0)).unwrap();
    store.record_score("two", 1, Some(20.0)).unwrap();

    assert!(store.remove_branch("b"));

    assert_eq!(store.branches(), ["a", "c"]);
    assert_eq!(store.scores("fib"), vec![Some(1.0), Some(3.0)]);
    assert_eq!(store.scores("short"), vec![Some(10.0), None]);
    assert_eq!(store.scores("two"), vec![None, None]);
    assert_aligned(&store);

    // Re-adding gets a fresh slot at the end.
    assert_eq!(store.branch_index("b"), 2);
    assert_eq!(store.scores("fib"), vec![Some(1.0), Some(3.0), None]);
    assert_aligned(&store);
  }

  #[test]
  fn removing_unknown_branch_is_a_no_op() {
    let mut store = BaselineStore::default();
    let main = store.branch_index("main");
    store.record_score("fib", main, Some(1.0)).unwrap();
    let before = store.clone();

    assert!(!store.remove_branch("nope"));
    assert_eq!(store, before);
  }

  #[test]
  fn mixed_mutations_keep_alignment() {
    let mut store = BaselineStore::default();
    let names = ["main", "x", "y", "z"];

    for round in 0..12usize {
      let branch = names[round % names.len()];
      let index = store.branch_index(branch);
      store
        .record_score(["fib", "nbody"][round % 2], index, Some(round as f64))
        .unwrap();
      if round % 5 == 4 {
        store.remove_branch(names[(round + 1) % names.len()]);
      }
      assert_aligned(&store);

      // Every recorded score still sits under the branch that wrote it.
      for benchmark in ["fib", "nbody"] {
        for (slot, score) in store.scores(benchmark).into_iter().enumerate() {
          if let Some(score) = score {
            assert_eq!(names[score as usize % names.len()], store.branches()[slot]);
          }
        }
      }
    }
  }

  #[test]
  fn json_round_trip() {
    let dir = TempDir::new().unwrap();
    let file = JsonFile::in_dir(dir.path());

    let mut store = BaselineStore::default();
    let main = store.branch_index("main");
    store.branch_index("feature-x");
    store.record_score("fib", main, Some(12.5)).unwrap();
    store.record_score("fib", 1, None).unwrap();

    file.save(&store).unwrap();
    let loaded = file.load().unwrap();

    assert_eq!(loaded, store);
    assert_eq!(loaded.branches(), ["main", "feature-x"]);
    assert_eq!(loaded.scores("fib"), vec![Some(12.5), None]);

    let written = fs::read_to_string(dir.path().join(JsonFile::FILE_NAME)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(json, serde_json::json!({ "branch list": ["main", "feature-x"], "fib": [12.5, null] }));
  }

  #[test]
  fn missing_file_is_an_empty_store() {
    let dir = TempDir::new().unwrap();
    let store = JsonFile::in_dir(dir.path()).load().unwrap();

    assert_eq!(store, BaselineStore::default());
    assert!(store.branches().is_empty());
  }

  #[test]
  fn loads_files_written_by_hand() {
    let dir = TempDir::new().unwrap();
    let file = JsonFile::in_dir(dir.path());
    let path = dir.path().join(JsonFile::FILE_NAME);

    fs::write(&path, r#"{"branch list": ["main"], "fib": [2000, 1500.5, null], "nbody": []}"#).unwrap();
    let store = file.load().unwrap();
    assert_eq!(store.scores("fib"), vec![Some(2000.0)]);
    assert_aligned(&store);

    fs::write(&path, r#"{"branch list": null}"#).unwrap();
    assert!(file.load().unwrap().branches().is_empty());

    fs::write(&path, r#"{"fib": [1.0]}"#).unwrap();
    assert!(file.load().unwrap().scores("fib").is_empty());
  }

  #[test]
  fn corrupt_file_is_an_error_and_is_left_alone() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(JsonFile::FILE_NAME);
    fs::write(&path, "{ not json").unwrap();

    assert!(JsonFile::new(&path).load().is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
  }
}
