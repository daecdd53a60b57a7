//! Exact solvers behind a common interface.
//!
//! The stitcher and the wedge bound tests only need an optimal schedule for a residual
//! instance. Any engine able to provide one implements `ExactOracle`; the in-crate A* searches
//! are the default.

use crate::config::Config;
use crate::error::BreedingError;
use crate::plants::bit_array::SingleChromGenotype;
use crate::plants::dist_array::DistArray;
use crate::solution::BaseSolution;
use crate::solvers::{base_min_crossings_astar, base_min_crossings_distribute_astar};
use log::warn;
use std::time::{Duration, Instant};

pub trait ExactOracle {
    /// Minimum-crossings schedule reaching the ideotype from `pop`.
    fn solve(
        &self,
        n_loci: usize,
        pop: &[SingleChromGenotype],
        timeout: Option<Duration>,
    ) -> Result<BaseSolution, BreedingError>;

    /// Minimum-crossings schedule for the homozygous founders described by `xs`.
    fn solve_distribute(
        &self,
        xs: &DistArray,
        timeout: Option<Duration>,
    ) -> Result<BaseSolution, BreedingError> {
        if xs.is_empty() {
            return Err(BreedingError::InvalidInstance("empty distribute array".to_string()));
        }
        self.solve(xs.n_loci(), &xs.to_population(), timeout)
    }
}

impl<O: ExactOracle + ?Sized> ExactOracle for &O {
    fn solve(
        &self,
        n_loci: usize,
        pop: &[SingleChromGenotype],
        timeout: Option<Duration>,
    ) -> Result<BaseSolution, BreedingError> {
        (**self).solve(n_loci, pop, timeout)
    }

    fn solve_distribute(
        &self,
        xs: &DistArray,
        timeout: Option<Duration>,
    ) -> Result<BaseSolution, BreedingError> {
        (**self).solve_distribute(xs, timeout)
    }
}

/// Wall-clock budget of a single search, checked cooperatively.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    pub fn new(budget: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            budget,
        }
    }

    pub fn expired(&self) -> bool {
        self.budget
            .map_or(false, |budget| self.start.elapsed() >= budget)
    }

    /// Fails with `Timeout` once the budget is spent.
    pub fn check(&self) -> Result<(), BreedingError> {
        match self.budget {
            Some(budget) if self.start.elapsed() >= budget => {
                warn!("search stopped after exceeding its {:?} budget", budget);
                Err(BreedingError::Timeout(budget))
            }
            _ => Ok(()),
        }
    }
}

/// Uses the distribute search when the population is a set of homozygous founders
/// partitioning the loci, and the population search otherwise.
#[derive(Debug, Clone, Default)]
pub struct AstarOracle {
    pub config: Config,
}

impl AstarOracle {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ExactOracle for AstarOracle {
    fn solve(
        &self,
        n_loci: usize,
        pop: &[SingleChromGenotype],
        timeout: Option<Duration>,
    ) -> Result<BaseSolution, BreedingError> {
        match DistArray::from_population(n_loci, pop) {
            Some(xs) => self.solve_distribute(&xs, timeout),
            None => base_min_crossings_astar::PopulationAstar::new(self.config.clone())
                .solve(n_loci, pop, timeout),
        }
    }

    fn solve_distribute(
        &self,
        xs: &DistArray,
        timeout: Option<Duration>,
    ) -> Result<BaseSolution, BreedingError> {
        base_min_crossings_distribute_astar::DistributeAstar::new(self.config.clone())
            .solve_distribute(xs, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist_array;
    use crate::solution::check_solution;

    #[test]
    fn deadline_test() {
        let deadline = Deadline::new(None);
        assert!(!deadline.expired());
        assert_eq!(Ok(()), deadline.check());

        let deadline = Deadline::new(Some(Duration::ZERO));
        assert!(deadline.expired());
        assert_eq!(
            Err(BreedingError::Timeout(Duration::ZERO)),
            deadline.check()
        );
    }

    #[test]
    fn astar_oracle_dispatch_test() {
        let oracle = AstarOracle::default();

        let xs = dist_array![0, 1, 0];
        let sol = oracle
            .solve(3, &xs.to_population(), None)
            .expect("distribute instance is feasible");
        assert_eq!(3, sol.objective);
        check_solution(&sol, 3).expect("valid schedule");

        let pop = vec![
            SingleChromGenotype::from_str("101", "010").expect("valid genotype"),
            SingleChromGenotype::from_str("000", "010").expect("valid genotype"),
        ];
        let sol = oracle.solve(3, &pop, None).expect("population is feasible");
        check_solution(&sol, 3).expect("valid schedule");
        assert_eq!(2, sol.objective);
    }

    #[test]
    fn solve_distribute_rejects_empty_test() {
        let oracle = AstarOracle::default();
        assert!(matches!(
            oracle.solve_distribute(&DistArray::default(), None),
            Err(BreedingError::InvalidInstance(_))
        ));
    }
}
