//! Exact min-crossings search over arbitrary founder populations.
//!
//! A state is the set of non-dominated gametes available so far. Crossing two of them adds every
//! gamete of the new genotype, and the search stops once the ideotype gamete is available; the
//! final selfing is added on top of the path cost.

use crate::abstract_plants::*;
use crate::config::Config;
use crate::dominance::filter_non_dominating;
use crate::error::BreedingError;
use crate::oracle::{Deadline, ExactOracle};
use crate::plants::bit_array::*;
use crate::segments::{extract_segments, minimum_segment_cover};
use crate::solution::BaseSolution;
use crate::solvers::base_min_generations_segment::ceil_log2;
use itertools::Itertools;
use log::{debug, info};
use pathfinding::directed::astar::astar;
use std::cell::Cell;
use std::collections::HashMap;
use std::time::Duration;

type State = Vec<SingleChromGamete>;

fn normalise(gametes: impl IntoIterator<Item = SingleChromGamete>) -> State {
    let mut state = filter_non_dominating::<SingleChromGamete, DomGamete>(gametes);
    state.sort();
    state.dedup();
    state
}

fn successor(state: &State, i: usize, j: usize) -> Result<State, BreedingError> {
    let z = SingleChromGenotype::from_gametes(&state[i], &state[j])?;
    Ok(normalise(state.iter().cloned().chain(z.gametes())))
}

/// Lower bound on the crossings left before the ideotype gamete is available.
///
/// One crossing at most halves the number of segments needed to cover the loci.
fn heuristic(n_loci: usize, state: &State) -> usize {
    let segments = state.iter().flat_map(|gx| extract_segments(gx.clone()));
    minimum_segment_cover(n_loci, segments).map_or(0, |cover| ceil_log2(cover.len()))
}

/// Finds a minimum-crossings schedule from `pop_0`.
pub fn breeding_program(
    n_loci: usize,
    pop_0: &[SingleChromGenotype],
    config: &Config,
) -> Result<BaseSolution, BreedingError> {
    if n_loci == 0 || pop_0.is_empty() {
        return Err(BreedingError::InvalidInstance(format!(
            "{} founders over {} loci",
            pop_0.len(),
            n_loci
        )));
    }
    for x in pop_0 {
        BreedingError::check_arity(n_loci, x.n_loci())?;
    }
    if let Some(x) = pop_0.iter().find(|x| x.is_ideotype()) {
        return Ok(BaseSolution::leaf(x));
    }
    if !SingleChromGenotype::is_feasible(&n_loci, pop_0) {
        return Err(BreedingError::Infeasible);
    }

    let ideotype_gamete = SingleChromGamete::ideotype(n_loci);
    let state_0 = normalise(pop_0.iter().flat_map(|x| x.gametes()));
    let deadline = Deadline::new(config.timeout);
    let expansions = Cell::new(0usize);

    let successors = |state: &State| -> Vec<(State, usize)> {
        if deadline.expired() {
            return vec![];
        }
        expansions.set(expansions.get() + 1);
        (0..state.len())
            .tuple_combinations()
            .filter_map(|(i, j)| successor(state, i, j).ok())
            .filter(|next| next != state)
            .map(|next| (next, 1))
            .collect::<Vec<_>>()
    };

    let result = astar(
        &state_0,
        successors,
        |state| heuristic(n_loci, state),
        |state| state.contains(&ideotype_gamete),
    );
    let Some((path, cost)) = result else {
        deadline.check()?;
        return Err(BreedingError::Infeasible);
    };
    info!(
        "population search found {} crossings after {} expansions",
        cost + 1,
        expansions.get()
    );

    path_to_crossing_schedule(pop_0, &path, &ideotype_gamete)
}

/// Replays the states of the path, finding for each step the pair of gametes whose crossing
/// leads to the next state.
fn path_to_crossing_schedule(
    pop_0: &[SingleChromGenotype],
    path: &[State],
    ideotype_gamete: &SingleChromGamete,
) -> Result<BaseSolution, BreedingError> {
    let mut producers: HashMap<SingleChromGamete, WGamS> = HashMap::new();
    for x in pop_0 {
        let wx = WGen::new(x.clone());
        for gx in x.gametes() {
            producers
                .entry(gx.clone())
                .or_insert_with(|| WGam::new_from_genotype(gx, &wx));
        }
    }

    for (state, next) in path.iter().zip(path.iter().skip(1)) {
        let (i, j) = (0..state.len())
            .tuple_combinations()
            .find(|&(i, j)| successor(state, i, j).map_or(false, |zs| &zs == next))
            .ok_or_else(|| BreedingError::InvalidSolution("path step has no crossing".to_string()))?;
        let missing = || BreedingError::InvalidSolution("gamete without a producer".to_string());
        let wgx = producers.get(&state[i]).ok_or_else(missing)?;
        let wgy = producers.get(&state[j]).ok_or_else(missing)?;
        let wz = WGen::from_gametes(wgx, wgy)?;
        debug!("crossing {} with {} gives {}", state[i], state[j], wz.genotype());
        for gz in wz.genotype().gametes() {
            producers
                .entry(gz.clone())
                .or_insert_with(|| WGam::new_from_genotype(gz, &wz));
        }
    }

    let wg_star = producers.get(ideotype_gamete).ok_or_else(|| {
        BreedingError::InvalidSolution("path does not reach the ideotype gamete".to_string())
    })?;
    let wx_star = WGen::from_gametes(wg_star, wg_star)?;
    Ok(BaseSolution::from_lineage(&wx_star))
}

/// The population A* search as an exact oracle.
#[derive(Debug, Clone, Default)]
pub struct PopulationAstar {
    pub config: Config,
}

impl PopulationAstar {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ExactOracle for PopulationAstar {
    fn solve(
        &self,
        n_loci: usize,
        pop: &[SingleChromGenotype],
        timeout: Option<Duration>,
    ) -> Result<BaseSolution, BreedingError> {
        let config = Config {
            timeout: timeout.or(self.config.timeout),
            ..self.config.clone()
        };
        breeding_program(n_loci, pop, &config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist_array;
    use crate::plants::dist_array::{DistArray, DistArrayGenerator};
    use crate::solution::check_solution;
    use crate::solvers::base_min_crossings_distribute_astar::DistributeAstar;

    fn genotype(s1: &str, s2: &str) -> SingleChromGenotype {
        SingleChromGenotype::from_str(s1, s2).expect("valid genotype")
    }

    #[test]
    fn heuristic_test() {
        let pop = dist_array![0, 1, 0, 1].to_population();
        let state = normalise(pop.iter().flat_map(|x| x.gametes()));
        assert_eq!(2, heuristic(4, &state));
        let state = normalise(vec![SingleChromGamete::ideotype(4)]);
        assert_eq!(0, heuristic(4, &state));
    }

    #[test]
    fn distribute_values_test() {
        macro_rules! f {
            ($xs: expr, $obj_check: expr) => {
                let xs: DistArray = $xs;
                let sol = breeding_program(xs.n_loci(), &xs.to_population(), &Config::default())
                    .expect("feasible");
                assert_eq!($obj_check, sol.objective, "{}", xs);
                check_solution(&sol, xs.n_loci()).expect("valid schedule");
            };
        }
        f!(dist_array![0, 1], 2);
        f!(dist_array![0, 1, 0], 3);
        f!(dist_array![0, 1, 2], 3);
        f!(dist_array![0, 1, 0, 1], 3);
        f!(dist_array![0, 1, 2, 0], 4);
    }

    #[test]
    fn heterozygous_population_test() {
        let pop = vec![genotype("101", "010"), genotype("000", "010")];
        let sol = breeding_program(3, &pop, &Config::default()).expect("feasible");
        assert_eq!(2, sol.objective);
        check_solution(&sol, 3).expect("valid schedule");

        // the ideotype gamete is already available, so only the selfing is needed
        let pop = vec![genotype("1100", "0011")];
        let sol = breeding_program(4, &pop, &Config::default()).expect("feasible");
        assert_eq!(1, sol.objective);
        check_solution(&sol, 4).expect("valid schedule");
    }

    #[test]
    fn agrees_with_distribute_search_test() {
        let distribute = DistributeAstar::default();
        let population = PopulationAstar::default();
        for n_loci in 1..=4 {
            for xs in DistArrayGenerator::new(n_loci) {
                let pop = xs.to_population();
                let expected = distribute.solve(n_loci, &pop, None).expect("feasible");
                let sol = population.solve(n_loci, &pop, None).expect("feasible");
                assert_eq!(expected.objective, sol.objective, "{}", xs);
                check_solution(&sol, n_loci).expect("valid schedule");
            }
        }
    }

    #[test]
    fn rejected_instances_test() {
        let config = Config::default();
        assert_eq!(
            Err(BreedingError::Infeasible),
            breeding_program(3, &[genotype("110", "100")], &config)
        );
        assert_eq!(
            Err(BreedingError::IncompatibleArity {
                expected: 3,
                found: 2
            }),
            breeding_program(3, &[genotype("11", "00")], &config)
        );
        assert!(matches!(
            breeding_program(0, &[], &config),
            Err(BreedingError::InvalidInstance(_))
        ));
        let sol = breeding_program(2, &[genotype("11", "11")], &config).expect("feasible");
        assert_eq!(0, sol.objective);
    }

    #[test]
    fn timeout_test() {
        let pop = dist_array![0, 1, 0, 2, 1, 0, 2].to_population();
        let res = PopulationAstar::default().solve(7, &pop, Some(Duration::ZERO));
        assert_eq!(Err(BreedingError::Timeout(Duration::ZERO)), res);
    }
}
