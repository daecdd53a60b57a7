//! Exact min-crossings search over distribute arrays.
//!
//! Each A* step crosses the holders of two labels and regroups the loci they own into the
//! gametes of that crossing. Steps cost 2 against a heuristic of `n_segments + n_pop`, which a
//! single crossing lowers by at most 2.

use crate::abstract_plants::*;
use crate::config::Config;
use crate::dominance::IteratorNonDominating;
use crate::error::BreedingError;
use crate::oracle::{Deadline, ExactOracle};
use crate::plants::bit_array::*;
use crate::plants::dist_array::*;
use crate::solution::BaseSolution;
use log::{info, trace};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::rc::Rc;
use std::time::Duration;

/// Statistics of one search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    expansions: usize,
    pushed_nodes: usize,
    children_created: usize,
    objective: Option<usize>,
}

impl Output {
    pub fn expansions(&self) -> usize {
        self.expansions
    }

    pub fn pushed_nodes(&self) -> usize {
        self.pushed_nodes
    }

    pub fn children_created(&self) -> usize {
        self.children_created
    }

    pub fn objective(&self) -> Option<usize> {
        self.objective
    }
}

#[derive(Debug)]
struct AstarNodeBase {
    xs: DistArray,
    parent_node: Option<Rc<AstarNodeBase>>,
    // redistribution of the parent's array, before simplification, and the crossed labels
    transition: Option<(DistArray, usize, usize)>,
    g: usize,
    n_pop: usize,
    n_segments: usize,
}

#[derive(Debug, Clone)]
struct AstarNode {
    head: Rc<AstarNodeBase>,
}

impl AstarNode {
    fn new(xs: DistArray) -> Self {
        Self {
            head: Rc::new(AstarNodeBase {
                n_pop: xs.n_pop(),
                n_segments: xs.n_segments(),
                xs,
                parent_node: None,
                transition: None,
                g: 0,
            }),
        }
    }

    #[inline]
    fn dist_array(&self) -> &DistArray {
        &self.head.xs
    }

    fn success(&self) -> bool {
        self.head.n_pop <= 1
    }

    #[inline]
    fn parent_node(&self) -> Option<Self> {
        self.head.parent_node.as_ref().map(|node_base| AstarNode {
            head: node_base.clone(),
        })
    }

    #[inline]
    fn g(&self) -> usize {
        self.head.g
    }

    #[inline]
    fn h(&self) -> usize {
        self.head.n_segments + self.head.n_pop
    }

    #[inline]
    fn f(&self) -> usize {
        self.g() + self.h()
    }

    fn create_offspring(&self, zs: DistArray, simple: DistArray, gx: usize, gy: usize) -> Self {
        Self {
            head: Rc::new(AstarNodeBase {
                n_pop: simple.n_pop(),
                n_segments: simple.n_segments(),
                xs: simple,
                parent_node: Some(self.head.clone()),
                transition: Some((zs, gx, gy)),
                g: self.g() + 2,
            }),
        }
    }

    /// Transitions from the start node to this one.
    fn transitions(&self) -> Vec<(DistArray, usize, usize)> {
        let mut out = vec![];
        let mut node_ref = self.clone();
        while let Some(parent) = node_ref.parent_node() {
            if let Some(transition) = &node_ref.head.transition {
                out.push(transition.clone());
            }
            node_ref = parent;
        }
        out.reverse();
        out
    }
}

impl PartialEq for AstarNode {
    fn eq(&self, other: &Self) -> bool {
        self.f() == other.f()
    }
}

impl Eq for AstarNode {}

impl PartialOrd for AstarNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AstarNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.f().cmp(&other.f())
    }
}

#[inline]
fn compute_objective(path: &AstarNode) -> usize {
    let steps = path.transitions().len();
    // the final selfing
    if steps > 0 {
        steps + 1
    } else {
        0
    }
}

/// Runs the search and reports its statistics together with the optimal objective.
pub fn breeding_program_distribute_general(
    xs: &DistArray,
    config: &Config,
) -> Result<Output, BreedingError> {
    let mut output = Output::default();
    let path = astar(xs, config, &mut output)?;
    output.objective = Some(compute_objective(&path));
    Ok(output)
}

/// Finds a minimum-crossings schedule for the homozygous founders of `xs`.
pub fn breeding_program_distribute(
    xs: &DistArray,
    config: &Config,
) -> Result<(BaseSolution, Output), BreedingError> {
    let mut output = Output::default();
    let path = astar(xs, config, &mut output)?;
    output.objective = Some(compute_objective(&path));
    let sol = path_to_crossing_schedule(xs, &path)?;
    Ok((sol, output))
}

fn astar(xs: &DistArray, config: &Config, output: &mut Output) -> Result<AstarNode, BreedingError> {
    if xs.is_empty() {
        return Err(BreedingError::InvalidInstance("empty distribute array".to_string()));
    }
    let deadline = Deadline::new(config.timeout);
    let mut open_list = BinaryHeap::from([Reverse(AstarNode::new(simplify_dist_array(xs)))]);
    let mut closed_list: HashSet<DistArray> = HashSet::new();

    while let Some(Reverse(node)) = open_list.pop() {
        deadline.check()?;
        output.expansions += 1;
        if !closed_list.insert(node.dist_array().clone()) {
            continue;
        }
        trace!("expanding {} with g = {} and f = {}", node.dist_array(), node.g(), node.f());
        if node.success() {
            info!(
                "solved {} after {} expansions, {} pushed nodes and {} children",
                xs, output.expansions, output.pushed_nodes, output.children_created
            );
            return Ok(node);
        }
        let children = branching(&node, config);
        output.children_created += children.len();
        for child in children {
            if !closed_list.contains(child.dist_array()) {
                open_list.push(Reverse(child));
                output.pushed_nodes += 1;
            }
        }
    }
    Err(BreedingError::Infeasible)
}

fn branching(node: &AstarNode, config: &Config) -> Vec<AstarNode> {
    if config.full_join {
        if let Some((zs, gx, gy)) = first_full_join(node.dist_array()) {
            let simple = simplify_dist_array(&zs);
            return vec![node.create_offspring(zs, simple, gx, gy)];
        }
    }
    let redistributions = generate_redistributions(node.dist_array())
        .into_iter()
        .filter(|(zs, _, _)| zs != node.dist_array());
    if config.dominance {
        redistributions
            .filter_non_dominating_fn(|(xs, _, _), (ys, _, _)| dominates_gametewise(xs, ys))
            .map(|(zs, gx, gy)| (simplify_dist_array(&zs), zs, gx, gy))
            .filter_non_dominating_fn(|(xs, ..), (ys, ..)| {
                dominates_gametewise(xs, ys) || dominates_as_subsequence(xs, ys)
            })
            .map(|(simple, zs, gx, gy)| node.create_offspring(zs, simple, gx, gy))
            .collect()
    } else {
        redistributions
            .map(|(zs, gx, gy)| {
                let simple = simplify_dist_array(&zs);
                node.create_offspring(zs, simple, gx, gy)
            })
            .collect()
    }
}

fn collect_gametes(gametes: Vec<Option<WGamS>>) -> Result<Vec<WGamS>, BreedingError> {
    gametes
        .into_iter()
        .enumerate()
        .map(|(label, wg)| {
            wg.ok_or_else(|| {
                BreedingError::InvalidSolution(format!("label {} has no gamete", label))
            })
        })
        .collect()
}

/// Replays the path through lineage handles.
///
/// Every label holds the gamete covering its loci, and every position of the simplified array
/// holds the span of loci merged into it. A group of positions regrouped under one label comes
/// from a single crossover of the crossing, switching chromatid after the last locus of its
/// first source.
fn path_to_crossing_schedule(xs: &DistArray, path: &AstarNode) -> Result<BaseSolution, BreedingError> {
    let n_loci = xs.n_loci();
    let founders = xs.to_population();
    let transitions = path.transitions();
    if transitions.is_empty() {
        return Ok(BaseSolution::leaf(&founders[xs[0]]));
    }

    let spans_0: Vec<(usize, usize)> = (0..n_loci).map(|i| (i, i)).collect();
    let (mut ys, mut spans, mapping) = simplify_dist_array_with_spans(xs, &spans_0);
    let mut gametes: Vec<Option<WGamS>> = vec![None; ys.n_pop()];
    for (old, new) in mapping.iter().enumerate() {
        if let Some(new) = new {
            let wx = WGen::new(founders[old].clone());
            gametes[*new] = Some(WGam::new_from_genotype(founders[old].upper(), &wx));
        }
    }
    let mut gametes = collect_gametes(gametes)?;

    for (zs, gx, gy) in transitions {
        if zs.len() != ys.len() || gx >= gametes.len() || gy >= gametes.len() {
            return Err(BreedingError::InvalidSolution(format!(
                "{} does not redistribute {}",
                zs, ys
            )));
        }
        let wz = WGen::from_gametes(&gametes[gx], &gametes[gy])?;
        let mut next: Vec<Option<WGamS>> = vec![None; zs.n_pop()];
        let mut groups: Vec<Vec<usize>> = vec![vec![]; zs.n_pop()];
        for i in 0..ys.len() {
            if ys[i] == gx || ys[i] == gy {
                groups[zs[i]].push(i);
            } else {
                next[zs[i]] = Some(gametes[ys[i]].clone());
            }
        }
        for (label, positions) in groups.iter().enumerate() {
            if positions.is_empty() {
                continue;
            }
            let source = ys[positions[0]];
            let chrom = if source == gx {
                Chrom::Upper
            } else {
                Chrom::Lower
            };
            let n_first = positions.iter().take_while(|&&i| ys[i] == source).count();
            let split = if n_first == positions.len() {
                n_loci - 1
            } else {
                spans[positions[n_first - 1]].1
            };
            let k = CrosspointBitVec::new(chrom, split);
            next[label] = Some(wz.cross(|z| k.cross(z))?);
        }

        let (ys_next, spans_next, mapping) = simplify_dist_array_with_spans(&zs, &spans);
        let mut remapped: Vec<Option<WGamS>> = vec![None; ys_next.n_pop()];
        for (old, new) in mapping.iter().enumerate() {
            if let Some(new) = new {
                remapped[*new] = next[old].clone();
            }
        }
        ys = ys_next;
        spans = spans_next;
        gametes = collect_gametes(remapped)?;
    }

    if ys.n_pop() != 1 {
        return Err(BreedingError::InvalidSolution(format!(
            "path ends at {} instead of a single label",
            ys
        )));
    }
    let x_star = WGen::from_gametes(&gametes[0], &gametes[0])?;
    if !x_star.genotype().is_ideotype() {
        return Err(BreedingError::InvalidSolution(format!(
            "path replays to {} instead of the ideotype",
            x_star.genotype()
        )));
    }
    Ok(BaseSolution::from_lineage(&x_star))
}

/// The distribute A* search as an exact oracle.
#[derive(Debug, Clone, Default)]
pub struct DistributeAstar {
    pub config: Config,
}

impl DistributeAstar {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ExactOracle for DistributeAstar {
    fn solve(
        &self,
        n_loci: usize,
        pop: &[SingleChromGenotype],
        timeout: Option<Duration>,
    ) -> Result<BaseSolution, BreedingError> {
        let xs = DistArray::from_population(n_loci, pop).ok_or_else(|| {
            BreedingError::InvalidInstance(
                "founders are not homozygous or do not partition the loci".to_string(),
            )
        })?;
        self.solve_distribute(&xs, timeout)
    }

    fn solve_distribute(
        &self,
        xs: &DistArray,
        timeout: Option<Duration>,
    ) -> Result<BaseSolution, BreedingError> {
        let config = Config {
            timeout: timeout.or(self.config.timeout),
            ..self.config.clone()
        };
        breeding_program_distribute(xs, &config).map(|(sol, _)| sol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist_array;
    use crate::solution::check_solution;

    macro_rules! pretty_print {
        ($xs: expr) => {
            format!(
                "[\n{}\n]",
                $xs.iter()
                    .map(|zs| format!("\t{}", zs))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        };
    }

    #[test]
    fn branching_failed_test() {
        macro_rules! f {
            ($xs: expr, $zs: expr) => {
                let node = AstarNode::new($xs);
                let output: Vec<DistArray> = branching(&node, &Config::default())
                    .iter()
                    .map(|x| x.dist_array())
                    .cloned()
                    .collect();
                assert!(
                    output.contains(&$zs),
                    "{} not in {}",
                    $zs,
                    pretty_print!(output)
                );
            };
        }
        f!(dist_array![0, 1, 0], dist_array![0, 1]);
        f!(dist_array![0, 1, 0, 2, 1, 0, 2], dist_array![0, 1, 0, 1, 2]);
    }

    #[test]
    fn branching_full_join_test() {
        let node = AstarNode::new(dist_array![0, 1, 2, 1]);
        let children = branching(&node, &Config::default());
        assert_eq!(1, children.len());
        assert_eq!(&dist_array![0, 1, 0], children[0].dist_array());
    }

    #[test]
    fn breeding_program_distribute_test() {
        macro_rules! f {
            ($xs: expr, $obj_check: expr) => {
                let xs: DistArray = $xs;
                let (sol, output) =
                    breeding_program_distribute(&xs, &Config::default()).expect("feasible");
                assert_eq!($obj_check, sol.objective, "{}", xs);
                assert_eq!(Some($obj_check), output.objective());
                check_solution(&sol, xs.n_loci()).expect("valid schedule");
            };
        }
        f!(dist_array![0], 0);
        f!(dist_array![0, 1], 2);
        f!(dist_array![0, 1, 0], 3);
        f!(dist_array![0, 1, 2], 3);
        f!(dist_array![0, 1, 0, 1], 3);
        f!(dist_array![0, 1, 0, 2], 4);
        f!(dist_array![0, 1, 2, 0], 4);
        f!(dist_array![0, 1, 2, 1], 4);
        f!(dist_array![0, 1, 0, 1, 0], 4);
        f!(dist_array![0, 1, 2, 0, 1], 4);
        f!(dist_array![0, 1, 2, 1, 0], 4);
        f!(dist_array![0, 1, 0, 2, 0], 5);
        f!(dist_array![0, 1, 0, 2, 0, 1, 0], 5);
        f!(dist_array![0, 1, 0, 2, 1, 0, 2], 5);
    }

    #[test]
    fn unsimplified_input_test() {
        let xs = dist_array![1, 1, 0, 0, 1];
        let (sol, _) = breeding_program_distribute(&xs, &Config::default()).expect("feasible");
        assert_eq!(3, sol.objective);
        check_solution(&sol, 5).expect("valid schedule");

        let xs = dist_array![0, 0, 1, 1];
        let (sol, _) = breeding_program_distribute(&xs, &Config::default()).expect("feasible");
        assert_eq!(2, sol.objective);
        check_solution(&sol, 4).expect("valid schedule");
    }

    #[test]
    fn output_statistics_test() {
        let output = breeding_program_distribute_general(&dist_array![0, 1, 0], &Config::default())
            .expect("feasible");
        assert_eq!(Some(3), output.objective());
        assert!(output.expansions() >= 3);
        assert!(output.pushed_nodes() >= 2);
        assert!(output.children_created() >= output.pushed_nodes());

        let output = breeding_program_distribute_general(&dist_array![0], &Config::default())
            .expect("feasible");
        assert_eq!(Some(0), output.objective());
        assert_eq!(1, output.expansions());
    }

    #[test]
    fn all_small_arrays_test() {
        for n_loci in 1..=6 {
            for xs in DistArrayGenerator::new(n_loci) {
                let (sol, output) =
                    breeding_program_distribute(&xs, &Config::default()).expect("feasible");
                check_solution(&sol, n_loci).expect("valid schedule");
                assert!(Some(sol.objective) <= output.objective(), "{}", xs);
                assert!(distribute_lower_bound(&xs) <= sol.objective, "{}", xs);
                assert!(sol.objective <= distribute_upper_bound(&xs), "{}", xs);
            }
        }
    }

    #[test]
    fn dominance_test() {
        let config = Config::new(true, true);
        macro_rules! f {
            ($xs: expr, $obj_check: expr) => {
                let xs: DistArray = $xs;
                let (sol, _) = breeding_program_distribute(&xs, &config).expect("feasible");
                assert_eq!($obj_check, sol.objective, "{}", xs);
                check_solution(&sol, xs.n_loci()).expect("valid schedule");
            };
        }
        f!(dist_array![0, 1], 2);
        f!(dist_array![0, 1, 0], 3);
        f!(dist_array![0, 1, 2], 3);
        f!(dist_array![0, 1, 2, 1], 4);
    }

    #[test]
    fn timeout_test() {
        let config = Config::default().with_timeout(Duration::ZERO);
        assert_eq!(
            Err(BreedingError::Timeout(Duration::ZERO)),
            breeding_program_distribute_general(&dist_array![0, 1, 0, 2, 1, 0, 2], &config)
        );
        let oracle = DistributeAstar::default();
        assert!(oracle
            .solve_distribute(&dist_array![0, 1, 0, 2, 1, 0, 2], Some(Duration::ZERO))
            .is_err_and(|e| e.is_timeout()));
    }

    #[test]
    fn oracle_population_test() {
        let oracle = DistributeAstar::default();
        let mut pop = dist_array![0, 1, 0, 2].to_population();
        pop.reverse();
        let sol = oracle.solve(4, &pop, None).expect("distribute instance");
        assert_eq!(4, sol.objective);
        check_solution(&sol, 4).expect("valid schedule");

        let pop = vec![SingleChromGenotype::from_str("1010", "0101").expect("valid genotype")];
        assert!(matches!(
            oracle.solve(4, &pop, None),
            Err(BreedingError::InvalidInstance(_))
        ));
    }
}
