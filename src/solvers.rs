//! A submodule for the different solvers.
//!
//! Each solver has a function `breeding_program` which solves crossing schedule instances of the
//! single-chromosome problem, minimising either generations or crossings.

/// Finds the min generations for base problem from a minimum segment cover
pub mod base_min_generations_segment;
/// Solves by breeding all non-dominating progeny in each generation
pub mod base_min_generations_enumerator_dominance;
/// Approximates the min crossings for distribute instances with repeated wedges
pub mod base_min_crossings_wedges;
/// Folds full joins and stitches an exact schedule of the residual instance
pub mod base_min_crossings_distribute;
/// Finds the min crossings for distribute instances
pub mod base_min_crossings_distribute_astar;
/// Finds the min crossings for base problem
pub mod base_min_crossings_astar;
