//! Min-crossings schedules for distribute instances by folding full joins and solving the
//! residual exactly.
//!
//! Two founders form a full join when the last locus of one immediately precedes the first locus
//! of the other. Crossing them yields a genotype that produces their union in one crossover, so
//! each full join is folded into a single crossing before the oracle sees the instance. The
//! oracle's schedule for the residual is then spliced into the index space of the original loci.

use crate::error::BreedingError;
use crate::oracle::ExactOracle;
use crate::plants::dist_array::*;
use crate::solution::{check_solution, BaseSolution, NodeKind};
use log::debug;
use std::time::Duration;

/// Builds a min-crossings schedule for the homozygous founders of `xs`.
///
/// Founders are identified by the canonical relabelling of `xs`. The residual left once every
/// full join is folded is solved by `oracle`, unless it is a single label, in which case the
/// last fold is selfed.
pub fn breeding_program<O: ExactOracle + ?Sized>(
    xs: &DistArray,
    oracle: &O,
    timeout: Option<Duration>,
) -> Result<BaseSolution, BreedingError> {
    if xs.is_empty() {
        return Err(BreedingError::InvalidInstance("empty distribute array".to_string()));
    }
    let xs = canonical_dist_array(xs);
    let n_loci = xs.n_loci();
    let founders = xs.to_population();
    if founders.len() == 1 {
        return Ok(BaseSolution::leaf(&founders[0]));
    }

    // entries in creation order: founders, folds, then the crossings of the residual
    let mut staged = BaseSolution::with_nulls(0, n_loci);
    for x in &founders {
        staged.push(x.to_alleles(), NodeKind::Leaf, 0, 0);
    }

    // 1-based reference of the entry holding each label of `cur`
    let mut parent: Vec<usize> = (1..=founders.len()).collect();
    let mut cur = xs.clone();
    let mut n_folds = 0;
    while let Some((next, mapping, gx, gy)) = fold_once(&cur) {
        let data = [indicator(&cur, gx), indicator(&cur, gy)];
        parent[gx] = staged.push(data, NodeKind::Node, parent[gx], parent[gy]);
        parent = remap_labels(&parent, &mapping, next.n_pop());
        cur = next;
        n_folds += 1;
    }
    debug!("folded {} full joins of {}, leaving {}", n_folds, xs, cur);

    let n_sub = if cur.n_pop() == 1 {
        let ones = vec![1; n_loci];
        staged.push([ones.clone(), ones], NodeKind::Node, parent[0], parent[0]);
        1
    } else {
        splice_residual(&cur, &parent, oracle, timeout, &mut staged)?
    };

    let n_pop = founders.len();
    let sub_start = n_pop + n_folds;
    let order: Vec<usize> = (sub_start..sub_start + n_sub)
        .chain((n_pop..sub_start).rev())
        .chain(0..n_pop)
        .collect();
    staged.objective = n_folds + n_sub;
    let sol = staged.permute(&order)?;
    check_solution(&sol, n_loci)?;
    Ok(sol)
}

/// Folds every full join of `xs`, returning the simplified residual and the number of folds.
///
/// # Examples
/// ```
/// use crossing_schedules::dist_array;
/// use crossing_schedules::solvers::base_min_crossings_distribute::fold_full_joins;
/// assert_eq!(fold_full_joins(&dist_array![0, 1, 2, 1]), (dist_array![0, 1, 0], 1));
/// ```
pub fn fold_full_joins(xs: &DistArray) -> (DistArray, usize) {
    let mut cur = canonical_dist_array(xs);
    let mut n_folds = 0;
    while let Some((next, _, _, _)) = fold_once(&cur) {
        cur = next;
        n_folds += 1;
    }
    (simplify_dist_array(&cur), n_folds)
}

fn fold_once(cur: &DistArray) -> Option<(DistArray, Vec<Option<usize>>, usize, usize)> {
    let (out, gx, gy) = first_full_join(cur)?;
    let (next, mapping) = canonical_mapping(&out);
    Some((next, mapping, gx, gy))
}

fn indicator(xs: &DistArray, g: usize) -> Vec<u8> {
    xs.iter().map(|&x| u8::from(x == g)).collect()
}

fn remap_labels(values: &[usize], mapping: &[Option<usize>], n_pop: usize) -> Vec<usize> {
    let mut out = vec![0; n_pop];
    for (old, new) in mapping.iter().enumerate() {
        if let Some(new) = new {
            out[*new] = values[old];
        }
    }
    out
}

/// Solves the simplified residual of `cur` with `oracle` and appends its crossings to `staged`,
/// expanded back to the original loci. Returns the number of crossings appended.
fn splice_residual<O: ExactOracle + ?Sized>(
    cur: &DistArray,
    parent: &[usize],
    oracle: &O,
    timeout: Option<Duration>,
    staged: &mut BaseSolution,
) -> Result<usize, BreedingError> {
    let n_loci = cur.n_loci();
    let spans_0: Vec<(usize, usize)> = (0..n_loci).map(|i| (i, i)).collect();
    let (simple, spans, mapping) = simplify_dist_array_with_spans(cur, &spans_0);
    let sub_parent = remap_labels(parent, &mapping, simple.n_pop());
    let mut big_to_sub = vec![0; n_loci];
    for (p, &(s, e)) in spans.iter().enumerate() {
        for slot in &mut big_to_sub[s..=e] {
            *slot = p;
        }
    }

    let sub = oracle.solve_distribute(&simple, timeout)?;
    check_solution(&sub, simple.n_loci())?;
    debug!("oracle solved {} with {} crossings", simple, sub.objective);

    let base = staged.n_plants();
    let mut sub_ref = vec![0; sub.n_plants()];
    for (k, kind) in sub.tree_type.iter().enumerate() {
        match kind {
            NodeKind::Node => sub_ref[k] = base + k + 1,
            NodeKind::Leaf => {
                let [upper, lower] = &sub.tree_data[k];
                let label = (0..simple.n_pop()).find(|&g| {
                    upper == lower
                        && upper
                            .iter()
                            .zip(simple.iter())
                            .all(|(&a, &x)| (a == 1) == (x == g))
                });
                sub_ref[k] = match label {
                    Some(g) => sub_parent[g],
                    None => {
                        return Err(BreedingError::InvalidSolution(format!(
                            "leaf {} of the residual schedule is not a founder of {}",
                            k, simple
                        )))
                    }
                };
            }
            NodeKind::Null => {}
        }
    }

    let expand = |c: &Vec<u8>| -> Vec<u8> { big_to_sub.iter().map(|&p| c[p]).collect() };
    for k in 0..sub.objective {
        let [upper, lower] = &sub.tree_data[k];
        staged.push(
            [expand(upper), expand(lower)],
            NodeKind::Node,
            sub_ref[sub.tree_left[k] - 1],
            sub_ref[sub.tree_right[k] - 1],
        );
    }
    Ok(sub.objective)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist_array;
    use crate::oracle::AstarOracle;
    use crate::plants::bit_array::SingleChromGenotype;

    #[test]
    fn fold_full_joins_test() {
        macro_rules! f {
            ($xs: expr, $residual: expr, $n_folds: expr) => {
                assert_eq!(($residual, $n_folds), fold_full_joins(&$xs));
            };
        }
        f!(dist_array![0, 1], dist_array![0], 1);
        f!(dist_array![0, 1, 2], dist_array![0], 2);
        f!(dist_array![0, 1, 0], dist_array![0, 1, 0], 0);
        f!(dist_array![0, 1, 2, 1], dist_array![0, 1, 0], 1);
        f!(dist_array![0, 0, 1, 2, 2, 1], dist_array![0, 1, 0], 1);
    }

    #[test]
    fn breeding_program_test() {
        let oracle = AstarOracle::default();
        macro_rules! f {
            ($xs: expr, $obj_check: expr) => {
                let xs: DistArray = $xs;
                let sol = breeding_program(&xs, &oracle, None).expect("feasible");
                assert_eq!($obj_check, sol.objective, "{}", xs);
                check_solution(&sol, xs.n_loci()).expect("valid schedule");
            };
        }
        f!(dist_array![0], 0);
        f!(dist_array![0, 1], 2);
        f!(dist_array![0, 1, 2], 3);
        f!(dist_array![2, 2, 0, 1], 3);
        f!(dist_array![0, 1, 0], 3);
        f!(dist_array![0, 1, 0, 2], 4);
        f!(dist_array![0, 1, 2, 1], 4);
        f!(dist_array![0, 1, 0, 2, 0], 5);
        f!(dist_array![0, 1, 0, 2, 1, 0, 2], 5);
    }

    #[test]
    fn layout_test() {
        let sol = breeding_program(&dist_array![0, 1, 2, 1], &AstarOracle::default(), None)
            .expect("feasible");
        assert_eq!(4, sol.objective);
        assert_eq!([vec![1; 4], vec![1; 4]], sol.tree_data[0]);
        // the fold of founders 0 and 1 is the last crossing
        assert_eq!([vec![1, 0, 0, 0], vec![0, 1, 0, 1]], sol.tree_data[3]);
        assert_eq!((5, 6), (sol.tree_left[3], sol.tree_right[3]));
        assert_eq!(
            vec![NodeKind::Leaf; 3],
            sol.tree_type[4..].to_vec()
        );
    }

    #[test]
    fn stitched_objective_test() {
        let oracle = AstarOracle::default();
        for n_loci in 1..=6 {
            for xs in DistArrayGenerator::new(n_loci) {
                let sol = breeding_program(&xs, &oracle, None).expect("feasible");
                check_solution(&sol, n_loci).expect("valid schedule");
                let (residual, n_folds) = fold_full_joins(&xs);
                let expected = if residual.n_pop() <= 1 {
                    if n_folds == 0 {
                        0
                    } else {
                        n_folds + 1
                    }
                } else {
                    let sub = oracle
                        .solve_distribute(&residual, None)
                        .expect("feasible residual");
                    n_folds + sub.objective
                };
                assert_eq!(expected, sol.objective, "{}", xs);
                assert!(distribute_lower_bound(&xs) <= sol.objective, "{}", xs);
                assert!(sol.objective <= distribute_upper_bound(&xs), "{}", xs);
            }
        }
    }

    struct IdeotypeOracle;

    impl ExactOracle for IdeotypeOracle {
        fn solve(
            &self,
            n_loci: usize,
            _pop: &[SingleChromGenotype],
            _timeout: Option<Duration>,
        ) -> Result<BaseSolution, BreedingError> {
            Ok(BaseSolution::leaf(&SingleChromGenotype::ideotype(n_loci)))
        }
    }

    #[test]
    fn rejects_foreign_leaves_test() {
        let res = breeding_program(&dist_array![0, 1, 0], &IdeotypeOracle, None);
        assert!(matches!(res, Err(BreedingError::InvalidSolution(_))));
        // fully folded arrays never reach the oracle
        let sol = breeding_program(&dist_array![0, 1, 2], &IdeotypeOracle, None).expect("folded");
        assert_eq!(3, sol.objective);
    }

    #[test]
    fn rejects_empty_test() {
        assert!(matches!(
            breeding_program(&DistArray::default(), &AstarOracle::default(), None),
            Err(BreedingError::InvalidInstance(_))
        ));
    }

    #[test]
    fn timeout_test() {
        let res = breeding_program(
            &dist_array![0, 1, 0, 2, 1, 0, 2],
            &AstarOracle::default(),
            Some(Duration::ZERO),
        );
        assert_eq!(Err(BreedingError::Timeout(Duration::ZERO)), res);
    }
}
