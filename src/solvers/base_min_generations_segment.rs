use crate::abstract_plants::*;
use crate::dominance::filter_non_dominating;
use crate::error::BreedingError;
use crate::plants::bit_array::*;
use crate::segments::{minimum_segment_cover, segments_from_genotype, Segment};
use crate::solution::{check_solution, BaseSolution};
use log::debug;

type SegW = Segment<WGamS>;

/// Builds a schedule with the minimum number of generations from `pop_0`, a population of single
/// chromosome diploid genotypes with `n_loci` loci.
///
/// The non-dominated founders are cut into the segments they can each produce with one
/// crossover, a minimum cover of the loci is taken from those, and the cover is joined as a
/// balanced binary tree before the final gamete is selfed.
/// When `max_generations` is given and the cover needs more, no schedule is built.
pub fn breeding_program(
    n_loci: usize,
    pop_0: &[SingleChromGenotype],
    max_generations: Option<usize>,
) -> Result<BaseSolution, BreedingError> {
    check_instance(n_loci, pop_0)?;
    if let Some(x) = pop_0.iter().find(|x| x.is_ideotype()) {
        return Ok(BaseSolution::leaf(x));
    }

    let min_segments = min_covering_segments(n_loci, pop_0)?;
    let required = generations_for_cover(min_segments.len());
    debug!(
        "covering {} loci with {} segments over {} generations",
        n_loci,
        min_segments.len(),
        required
    );
    if let Some(limit) = max_generations {
        if required > limit {
            return Err(BreedingError::GenerationLimit { required, limit });
        }
    }

    let c_star = join_segments(&min_segments, 0, min_segments.len())?;
    let x_star = WGen::from_gametes(&c_star.g, &c_star.g)?;
    if !x_star.genotype().is_ideotype() {
        return Err(BreedingError::InvalidSolution(format!(
            "segments joined into {} instead of the ideotype",
            x_star.genotype()
        )));
    }
    let sol = BaseSolution::from_lineage(&x_star);
    check_solution(&sol, n_loci)?;
    Ok(sol)
}

/// Finds the number of generations required to construct the ideotype from `pop_0`.
pub fn min_generations(n_loci: usize, pop_0: &[SingleChromGenotype]) -> Result<usize, BreedingError> {
    check_instance(n_loci, pop_0)?;
    if pop_0.iter().any(|x| x.is_ideotype()) {
        return Ok(0);
    }
    let n_segments = min_covering_segments(n_loci, pop_0)?.len();
    Ok(generations_for_cover(n_segments))
}

/// Generations needed to join `n_segments` segments and self the result.
pub fn generations_for_cover(n_segments: usize) -> usize {
    ceil_log2(n_segments) + 1
}

pub(crate) fn ceil_log2(n: usize) -> usize {
    (n.max(1) as f64).log2().ceil() as usize
}

fn check_instance(n_loci: usize, pop_0: &[SingleChromGenotype]) -> Result<(), BreedingError> {
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
    if !SingleChromGenotype::is_feasible(&n_loci, pop_0) {
        return Err(BreedingError::Infeasible);
    }
    Ok(())
}

/// Minimum cover of the loci by segments of the non-dominated founders, each segment carrying
/// the founder that produces it.
pub fn min_covering_segments(
    n_loci: usize,
    pop_0: &[SingleChromGenotype],
) -> Result<Vec<SegW>, BreedingError> {
    let pop_0 = filter_non_dominating::<SingleChromGenotype, DomGenotype>(pop_0.iter().cloned());
    let mut segments = vec![];
    for x in pop_0 {
        let segs = segments_from_genotype(&x)?;
        let wx = WGen::new(x);
        segments.extend(
            segs.into_iter()
                .map(|Segment { s, e, g }| Segment::new(s, e, WGam::new_from_genotype(g, &wx))),
        );
    }
    minimum_segment_cover(n_loci, segments)
}

fn join_segments(segments: &[SegW], i: usize, j: usize) -> Result<SegW, BreedingError> {
    if j <= i {
        return Err(BreedingError::Uncoverable { locus: 0 });
    }
    if j == i + 1 {
        return Ok(segments[i].clone());
    }
    let mid = (i + j) >> 1;
    let c1 = join_segments(segments, i, mid)?;
    let c2 = join_segments(segments, mid, j)?;
    join_pair(&c1, &c2)
}

/// Crosses the gametes of two overlapping or adjacent segments, taking the left gamete up to
/// the locus before `c2` starts.
fn join_pair(c1: &SegW, c2: &SegW) -> Result<SegW, BreedingError> {
    debug_assert!(c1.s < c2.s && c2.s <= c1.e + 1);
    let wz = WGen::from_gametes(&c1.g, &c2.g)?;
    let k = CrosspointBitVec::new(Chrom::Upper, c2.s.saturating_sub(1));
    let g = wz.cross(|z| k.cross(z))?;
    Ok(Segment::new(c1.s, c1.e.max(c2.e), g))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist_array;
    use crate::plants::dist_array::DistArray;
    use rand::prelude::*;

    fn homozygous(s: &str) -> SingleChromGenotype {
        SingleChromGenotype::from_str(s, s).expect("valid genotype")
    }

    #[test]
    fn distribute_generations_test() {
        macro_rules! f {
            ($xs:expr, $gens:expr) => {
                let xs: DistArray = $xs;
                let pop = xs.to_population();
                let sol = breeding_program(xs.n_loci(), &pop, None).expect("feasible");
                assert_eq!($gens, sol.generations());
                assert_eq!(Ok($gens), min_generations(xs.n_loci(), &pop));
                check_solution(&sol, xs.n_loci()).expect("valid schedule");
            };
        }
        f!(dist_array![0, 1], 2);
        f!(dist_array![0, 1, 0], 3);
        f!(dist_array![0, 1, 2, 0], 3);
        f!(dist_array![0, 1, 0, 2, 1], 4);
    }

    #[test]
    fn zigzag_founder_test() {
        let pop = vec![SingleChromGenotype::from_str("0101", "1010").expect("valid genotype")];
        let sol = breeding_program(4, &pop, None).expect("feasible");
        assert_eq!(2, sol.generations());
        assert_eq!(2, sol.objective);
    }

    #[test]
    fn zigzag_homozygous_test() {
        let pop = vec![homozygous("0101"), homozygous("1010")];
        let sol = breeding_program(4, &pop, None).expect("feasible");
        assert_eq!(3, sol.generations());
        // the two first-generation crossings are the same genotype
        assert_eq!(3, sol.objective);
        check_solution(&sol, 4).expect("valid schedule");
    }

    #[test]
    fn ideotype_founder_test() {
        let pop = vec![homozygous("0110"), homozygous("1111")];
        let sol = breeding_program(4, &pop, None).expect("feasible");
        assert_eq!(0, sol.objective);
        assert_eq!(1, sol.n_plants());
        assert_eq!(Ok(0), min_generations(4, &pop));
    }

    #[test]
    fn rejected_instances_test() {
        assert_eq!(
            Err(BreedingError::Infeasible),
            breeding_program(3, &[homozygous("110"), homozygous("100")], None)
        );
        assert_eq!(
            Err(BreedingError::IncompatibleArity {
                expected: 3,
                found: 4
            }),
            breeding_program(3, &[homozygous("110"), homozygous("0011")], None)
        );
        assert!(matches!(
            breeding_program(3, &[], None),
            Err(BreedingError::InvalidInstance(_))
        ));
    }

    #[test]
    fn generation_limit_test() {
        let pop = dist_array![0, 1, 0, 2, 1].to_population();
        assert_eq!(
            Err(BreedingError::GenerationLimit {
                required: 4,
                limit: 3
            }),
            breeding_program(5, &pop, Some(3))
        );
        assert!(breeding_program(5, &pop, Some(4)).is_ok());
    }

    #[test]
    fn random_instances_test() {
        let mut rng = thread_rng();
        let n_loci = 10;
        let n_pop = 5;
        for _ in 0..100 {
            let pop = SingleChromGenotype::init_pop_random(&mut rng, n_loci, n_pop);
            match breeding_program(n_loci, &pop, None) {
                Ok(sol) => {
                    check_solution(&sol, n_loci).expect("valid schedule");
                    assert_eq!(min_generations(n_loci, &pop), Ok(sol.generations()));
                }
                Err(e) => assert_eq!(BreedingError::Infeasible, e),
            }
        }
    }
}
