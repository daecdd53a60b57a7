use crate::abstract_plants::*;
use crate::dominance::filter_non_dominating_fn;
use crate::error::BreedingError;
use crate::oracle::Deadline;
use crate::plants::bit_array::*;
use crate::solution::BaseSolution;
use log::debug;
use std::collections::HashSet;
use std::time::Duration;

/// Finds a minimum-generation schedule by breeding every non-dominated progeny in each
/// generation.
///
/// The frontier holds every non-dominated gamete available so far. Each generation crosses all
/// pairs of the frontier and keeps the gametes that were not seen before, until the ideotype
/// gamete appears and is selfed.
pub fn breeding_program(
    n_loci: usize,
    pop_0: &[SingleChromGenotype],
    timeout: Option<Duration>,
) -> Result<BaseSolution, BreedingError> {
    let deadline = Deadline::new(timeout);
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

    let mut h: HashSet<SingleChromGamete> = HashSet::new();
    let mut contained_gametes: Vec<WGamS> = vec![];
    for x in pop_0 {
        let wx = WGen::new(x.clone());
        for gx in x.gametes() {
            if h.insert(gx.clone()) {
                contained_gametes.push(WGam::new_from_genotype(gx, &wx));
            }
        }
    }
    contained_gametes = filter_non_dominating_fn(contained_gametes, |wgx, wgy| {
        DomGamete::dom(wgx.gamete(), wgy.gamete())
    });

    let ideotype_gamete = SingleChromGamete::ideotype(n_loci);
    let mut generation = 0;
    while !h.contains(&ideotype_gamete) {
        deadline.check()?;
        generation += 1;
        let mut v = vec![];
        for i in 0..contained_gametes.len() {
            for j in i + 1..contained_gametes.len() {
                let wz = WGen::from_gametes(&contained_gametes[i], &contained_gametes[j])?;
                for gz in wz.genotype().gametes() {
                    if h.insert(gz.clone()) {
                        v.push(WGam::new_from_genotype(gz, &wz));
                    }
                }
            }
        }
        if v.is_empty() {
            return Err(BreedingError::Infeasible);
        }
        contained_gametes = filter_non_dominating_fn(
            contained_gametes.into_iter().chain(v),
            |wgx, wgy| DomGamete::dom(wgx.gamete(), wgy.gamete()),
        );
        debug!(
            "generation {}: {} non-dominated gametes",
            generation,
            contained_gametes.len()
        );
    }

    let wg_star = contained_gametes
        .iter()
        .find(|wgx| wgx.gamete().is_ideotype())
        .ok_or_else(|| {
            BreedingError::InvalidSolution("ideotype gamete was dominated away".to_string())
        })?;
    let wx_star = WGen::from_gametes(wg_star, wg_star)?;
    Ok(BaseSolution::from_lineage(&wx_star))
}
