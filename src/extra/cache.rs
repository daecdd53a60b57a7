//! Memoised solutions keyed by the printed form of an instance.
//!
//! The cache file is a JSON object mapping each key to its schedule, for example
//! `{"[0, 1]": {"treeData": ..., "treeType": ..., "treeLeft": ..., "treeRight": ..., "objective": 2}}`.

use crate::error::BreedingError;
use crate::oracle::ExactOracle;
use crate::plants::bit_array::SingleChromGenotype;
use crate::plants::dist_array::DistArray;
use crate::solution::BaseSolution;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceCache {
    entries: BTreeMap<String, BaseSolution>,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&BaseSolution> {
        self.entries.get(key)
    }

    /// Stores `sol` under `key`, returning the schedule it replaces.
    pub fn put(&mut self, key: impl Into<String>, sol: BaseSolution) -> Option<BaseSolution> {
        self.entries.insert(key.into(), sol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn persist_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CacheError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

/// Printed form of a population, one genotype per entry.
pub fn population_key(pop: &[SingleChromGenotype]) -> String {
    let genotypes: Vec<String> = pop.iter().map(|x| x.to_string()).collect();
    format!("[{}]", genotypes.join(", "))
}

/// Wraps an oracle so that each instance is solved at most once per cache.
///
/// Only successful results are stored, so a timed out instance is attempted again on the next
/// call.
#[derive(Debug)]
pub struct CachedOracle<O> {
    inner: O,
    cache: RefCell<InstanceCache>,
}

impl<O: ExactOracle> CachedOracle<O> {
    pub fn new(inner: O) -> Self {
        Self::with_cache(inner, InstanceCache::new())
    }

    pub fn with_cache(inner: O, cache: InstanceCache) -> Self {
        Self {
            inner,
            cache: RefCell::new(cache),
        }
    }

    pub fn into_cache(self) -> InstanceCache {
        self.cache.into_inner()
    }

    fn cached(
        &self,
        key: String,
        compute: impl FnOnce() -> Result<BaseSolution, BreedingError>,
    ) -> Result<BaseSolution, BreedingError> {
        if let Some(sol) = self.cache.borrow().get(&key) {
            debug!("cache hit for {}", key);
            return Ok(sol.clone());
        }
        let sol = compute()?;
        self.cache.borrow_mut().put(key, sol.clone());
        Ok(sol)
    }
}

impl<O: ExactOracle> ExactOracle for CachedOracle<O> {
    fn solve(
        &self,
        n_loci: usize,
        pop: &[SingleChromGenotype],
        timeout: Option<Duration>,
    ) -> Result<BaseSolution, BreedingError> {
        self.cached(population_key(pop), || self.inner.solve(n_loci, pop, timeout))
    }

    fn solve_distribute(
        &self,
        xs: &DistArray,
        timeout: Option<Duration>,
    ) -> Result<BaseSolution, BreedingError> {
        self.cached(xs.to_string(), || self.inner.solve_distribute(xs, timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist_array;
    use crate::oracle::AstarOracle;
    use std::cell::Cell;
    use tempfile::tempdir;

    struct CountingOracle {
        calls: Cell<usize>,
    }

    impl ExactOracle for CountingOracle {
        fn solve(
            &self,
            n_loci: usize,
            pop: &[SingleChromGenotype],
            timeout: Option<Duration>,
        ) -> Result<BaseSolution, BreedingError> {
            self.calls.set(self.calls.get() + 1);
            AstarOracle::default().solve(n_loci, pop, timeout)
        }
    }

    #[test]
    fn persist_and_load_test() {
        let dir = tempdir().expect("temporary directory");
        let path = dir.path().join("cache.json");

        let oracle = AstarOracle::default();
        let mut cache = InstanceCache::new();
        for xs in [dist_array![0, 1], dist_array![0, 1, 0]] {
            let sol = oracle.solve_distribute(&xs, None).expect("feasible");
            cache.put(xs.to_string(), sol);
        }
        cache.persist_to_file(&path).expect("cache is written");

        let loaded = InstanceCache::load_from_file(&path).expect("cache is read");
        assert_eq!(cache, loaded);
        assert_eq!(2, loaded.len());
        assert_eq!(Some(3), loaded.get("[0, 1, 0]").map(|sol| sol.objective));

        let text = std::fs::read_to_string(&path).expect("cache is readable");
        assert!(text.contains("\"treeData\""));
        assert!(text.contains("\"[0, 1]\""));
    }

    #[test]
    fn load_errors_test() {
        let dir = tempdir().expect("temporary directory");
        assert!(matches!(
            InstanceCache::load_from_file(dir.path().join("missing.json")),
            Err(CacheError::Io(_))
        ));
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"[0, 1]\": 3}").expect("file is written");
        assert!(matches!(
            InstanceCache::load_from_file(&path),
            Err(CacheError::Json(_))
        ));
    }

    #[test]
    fn cached_oracle_test() {
        let cached = CachedOracle::new(CountingOracle {
            calls: Cell::new(0),
        });
        let xs = dist_array![0, 1, 0, 2];
        let first = cached.solve_distribute(&xs, None).expect("feasible");
        let second = cached.solve_distribute(&xs, None).expect("feasible");
        assert_eq!(first, second);
        assert_eq!(4, first.objective);
        assert_eq!(1, cached.inner.calls.get());

        let pop = xs.to_population();
        cached.solve(4, &pop, None).expect("feasible");
        cached.solve(4, &pop, None).expect("feasible");
        assert_eq!(2, cached.inner.calls.get());

        let cache = cached.into_cache();
        assert_eq!(2, cache.len());
        assert!(cache.get(&population_key(&pop)).is_some());
    }

    #[test]
    fn failures_are_not_cached_test() {
        let cached = CachedOracle::new(AstarOracle::default());
        let xs = dist_array![0, 1, 0, 2, 1, 0, 2];
        assert!(cached
            .solve_distribute(&xs, Some(Duration::ZERO))
            .is_err_and(|e| e.is_timeout()));
        assert!(cached.into_cache().is_empty());
    }
}
