//! Supporting tools around the solvers.

/// Memoised oracle results with JSON persistence
pub mod cache;
/// Parsers and random generators of problem instances
pub mod instance_generators;
