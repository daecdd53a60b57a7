//! Plant breeding program modelling and solving library.
//!
//! Components of the plant breeding program are separated by module.
//! Typical use is as follows:
//! ```
//! use crossing_schedules::dist_array;
//! use crossing_schedules::oracle::AstarOracle;
//! use crossing_schedules::plants::bit_array::*;
//! use crossing_schedules::solution::check_solution;
//! use crossing_schedules::solvers::*;
//!
//! use rand::prelude::*;
//! let mut rng = thread_rng();
//!
//! let n_loci = 10;
//! let n_pop = 6;
//! let pop_0 = SingleChromGenotype::init_pop_random(&mut rng, n_loci, n_pop);
//! let sol = base_min_generations_segment::breeding_program(n_loci, &pop_0, None).unwrap();
//! assert!(check_solution(&sol, n_loci).is_ok());
//!
//! let xs = dist_array![0, 1, 0, 2, 1];
//! let sol = base_min_crossings_distribute::breeding_program(&xs, &AstarOracle::default(), None)
//!     .unwrap();
//! assert!(sol.objective <= base_min_crossings_wedges::min_crossings_estimate(&xs));
//! ```

/// Exports the traits used by the algorithms in `solvers`
pub mod abstract_plants;
pub mod config;
pub mod dominance;
pub mod error;
pub mod extra;
pub mod oracle;
pub mod plants;
pub mod segments;
pub mod solution;
pub mod solvers;
