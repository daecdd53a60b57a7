use std::time::Duration;
use thiserror::Error;

/// Failure modes shared by the builders, the stitcher and the exact oracles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreedingError {
    #[error("incompatible arity: expected {expected} loci, found {found}")]
    IncompatibleArity { expected: usize, found: usize },
    #[error("crosspoint split {split} is out of range for {n_loci} loci")]
    InvalidCrosspoint { split: usize, n_loci: usize },
    #[error("no segment covers locus {locus}")]
    Uncoverable { locus: usize },
    #[error("the population cannot reach the ideotype")]
    Infeasible,
    #[error("no solution found within {0:?}")]
    Timeout(Duration),
    #[error("invalid solution: {0}")]
    InvalidSolution(String),
    #[error("{required} generations are required but the limit is {limit}")]
    GenerationLimit { required: usize, limit: usize },
    #[error("invalid instance: {0}")]
    InvalidInstance(String),
}

impl BreedingError {
    /// Fails with `IncompatibleArity` unless `found == expected`.
    pub fn check_arity(expected: usize, found: usize) -> Result<(), Self> {
        if expected == found {
            Ok(())
        } else {
            Err(Self::IncompatibleArity { expected, found })
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
