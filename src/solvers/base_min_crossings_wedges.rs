//! Min-crossings heuristic for distribute instances built from repeated wedges.
//!
//! A wedge is a pair of adjacent loci. Selecting a wedge means crossing the two founders owning
//! it, and every later wedge over the same pair of founders reuses that crossing. Searches run on
//! the simplified array, where the schedule built from a selection uses `n_loci - repeats`
//! crossings.

use crate::abstract_plants::*;
use crate::config::Config;
use crate::error::BreedingError;
use crate::plants::bit_array::*;
use crate::plants::dist_array::*;
use crate::solution::{check_solution, BaseSolution};
use log::debug;
use std::collections::{HashMap, HashSet};

/// Unordered pair of founders meeting at wedge `i`.
fn wedge_class(xs: &DistArray, i: usize) -> (usize, usize) {
    let (l, r) = (xs[i], xs[i + 1]);
    (l.min(r), l.max(r))
}

struct WedgeSearch {
    classes: Vec<(usize, usize)>,
    bound_singles: Option<usize>,
    selected: Vec<bool>,
    counts: HashMap<(usize, usize), usize>,
    best: Option<(usize, Vec<bool>)>,
}

impl WedgeSearch {
    fn new(xs: &DistArray, strict_mingen: bool) -> Self {
        let n_diff = xs.n_loci() - 1;
        let bound_singles = strict_mingen.then(|| xs.n_loci().next_power_of_two() - xs.n_loci());
        Self {
            classes: (0..n_diff).map(|i| wedge_class(xs, i)).collect(),
            bound_singles,
            selected: vec![false; n_diff],
            counts: HashMap::new(),
            best: None,
        }
    }

    fn aux(&mut self, i: usize, prev_skip: bool, obj: usize, singles: usize) {
        let n_diff = self.classes.len();
        if i >= n_diff {
            if self.best.as_ref().map_or(true, |(best, _)| obj > *best) {
                self.best = Some((obj, self.selected.clone()));
            }
            return;
        }
        if let Some((best, _)) = &self.best {
            if obj + (n_diff - i + 1) / 2 <= *best {
                return;
            }
        }

        // select wedge i
        let class = self.classes[i];
        let count = self.counts.entry(class).or_insert(0);
        let repeated = *count > 0;
        *count += 1;
        self.selected[i] = true;
        self.aux(i + 2, false, obj + repeated as usize, singles);
        self.selected[i] = false;
        if let Some(count) = self.counts.get_mut(&class) {
            *count -= 1;
        }

        // leave locus i single
        if !prev_skip && self.bound_singles.map_or(true, |bound| singles < bound) {
            self.aux(i + 1, true, obj, singles + 1);
        }
    }
}

/// Returns the largest number of repeated wedges in any selection of wedges of `xs`, and the
/// first selection found that achieves it.
///
/// A selection never leaves two loci in a row single. With `strict_mingen` the number of single
/// loci is capped so that the resulting schedule still uses the minimum number of generations.
pub fn max_repeated_wedges(
    xs: &DistArray,
    strict_mingen: bool,
) -> Result<(usize, Vec<bool>), BreedingError> {
    if xs.is_empty() {
        return Err(BreedingError::InvalidInstance("empty distribute array".to_string()));
    }
    let mut search = WedgeSearch::new(xs, strict_mingen);
    search.aux(0, false, 0, 0);
    search
        .best
        .ok_or_else(|| BreedingError::InvalidInstance(format!("no wedge selection for {}", xs)))
}

/// The selection of every other wedge, starting with the first, and its number of repeats.
pub fn default_wedges(xs: &DistArray) -> (usize, Vec<bool>) {
    let selection: Vec<bool> = (0..xs.n_loci().saturating_sub(1))
        .map(|i| i % 2 == 0)
        .collect();
    let n_repeats = count_repeats(xs, &selection).unwrap_or(0);
    (n_repeats, selection)
}

fn count_repeats(xs: &DistArray, selection: &[bool]) -> Result<usize, BreedingError> {
    if selection.len() != xs.n_loci().saturating_sub(1)
        || selection.windows(2).any(|w| w[0] && w[1])
    {
        return Err(BreedingError::InvalidInstance(format!(
            "{:?} is not a wedge selection for {}",
            selection, xs
        )));
    }
    let mut seen = HashSet::new();
    Ok((0..selection.len())
        .filter(|&i| selection[i])
        .filter(|&i| !seen.insert(wedge_class(xs, i)))
        .count())
}

/// Estimated minimum number of crossings, final selfing included.
///
/// Adjacent loci of the same founder never need a crossing between them, so the estimate is
/// taken on the simplified array.
pub fn min_crossings_estimate(xs: &DistArray) -> usize {
    let xs = simplify_dist_array(xs);
    if xs.n_pop() <= 1 {
        return 0;
    }
    max_repeated_wedges(&xs, false).map_or(xs.n_loci(), |(n_repeats, _)| xs.n_loci() - n_repeats)
}

/// Runs the wedge search on the simplified form of `xs` and builds the schedule of the best
/// selection over the loci of `xs`.
pub fn breeding_program(xs: &DistArray, config: &Config) -> Result<BaseSolution, BreedingError> {
    if xs.is_empty() {
        return Err(BreedingError::InvalidInstance("empty distribute array".to_string()));
    }
    let xs = canonical_dist_array(xs);
    let spans_0: Vec<(usize, usize)> = (0..xs.n_loci()).map(|i| (i, i)).collect();
    let (simple, spans, _) = simplify_dist_array_with_spans(&xs, &spans_0);
    let (n_repeats, selection) = max_repeated_wedges(&simple, config.strict_mingen)?;
    debug!("{}: {} repeated wedges in {:?}", simple, n_repeats, selection);
    let sol = build_tree_from_selection(&simple, n_repeats, &selection)?.expand_loci(&spans);
    check_solution(&sol, xs.n_loci())?;
    Ok(sol)
}

/// A run of loci `[s, e)` carried by `g`, produced by entry `node` of the schedule.
struct Fragment {
    s: usize,
    e: usize,
    g: SingleChromGamete,
    node: usize,
}

/// Builds the schedule of a wedge selection.
///
/// Crossings take the first `n_loci - repeat_count` entries: the selfing at 0, the merges
/// counting down from the last one at 1, then one crossing per distinct wedge class. Founders
/// follow in label order.
pub fn build_tree_from_selection(
    xs: &DistArray,
    repeat_count: usize,
    selection: &[bool],
) -> Result<BaseSolution, BreedingError> {
    if !is_canonical_dist_array(xs) {
        return Err(BreedingError::InvalidInstance(format!("{} is not canonical", xs)));
    }
    let n_loci = xs.n_loci();
    let n_pop = xs.n_pop();
    let founders = xs.to_population();
    if n_pop == 1 {
        return Ok(BaseSolution::leaf(&founders[0]));
    }
    let n_repeats = count_repeats(xs, selection)?;
    if n_repeats != repeat_count {
        return Err(BreedingError::InvalidInstance(format!(
            "{:?} repeats {} wedges, not {}",
            selection, n_repeats, repeat_count
        )));
    }
    let n_selected = selection.iter().filter(|&&b| b).count();
    let n_classes = n_selected - n_repeats;
    let n_cross = n_loci - n_repeats;

    let mut sol = BaseSolution::with_nulls(n_cross + n_pop, n_loci);
    for (g, x) in founders.iter().enumerate() {
        sol.set_leaf(n_cross + g, x);
    }
    let gametes: Vec<SingleChromGamete> = founders.iter().map(|x| x.upper()).collect();

    // first generation: one crossing per wedge class
    let mut wedge_nodes: HashMap<(usize, usize), (usize, SingleChromGenotype)> = HashMap::new();
    let mut i_wedge = n_cross - n_classes;
    let mut q: Vec<Fragment> = Vec::with_capacity(n_loci);
    let mut i = 0;
    while i < n_loci {
        if i + 1 < n_loci && selection[i] {
            let class = wedge_class(xs, i);
            if !wedge_nodes.contains_key(&class) {
                let z = SingleChromGenotype::from_gametes(&gametes[class.0], &gametes[class.1])?;
                sol.set_node(i_wedge, &z, n_cross + class.0 + 1, n_cross + class.1 + 1);
                wedge_nodes.insert(class, (i_wedge, z));
                i_wedge += 1;
            }
            let (i_z, z) = &wedge_nodes[&class];
            let chrom = if xs[i] == class.0 {
                Chrom::Upper
            } else {
                Chrom::Lower
            };
            let g = CrosspointBitVec::new(chrom, i).cross(z)?;
            q.push(Fragment {
                s: i,
                e: i + 2,
                g,
                node: *i_z,
            });
            i += 2;
        } else {
            q.push(Fragment {
                s: i,
                e: i + 1,
                g: gametes[xs[i]].clone(),
                node: n_cross + xs[i],
            });
            i += 1;
        }
    }

    // merge neighbouring fragments from the back, one round per generation
    let mut i_node = n_cross - 1 - n_classes;
    while q.len() > 1 {
        let mut q_new = vec![];
        while q.len() > 1 {
            if let (Some(c_r), Some(c_l)) = (q.pop(), q.pop()) {
                if i_node == 0 {
                    return Err(BreedingError::InvalidSolution(
                        "ran out of merge crossings".to_string(),
                    ));
                }
                let z = SingleChromGenotype::from_gametes(&c_l.g, &c_r.g)?;
                let g = CrosspointBitVec::new(Chrom::Upper, c_l.e - 1).cross(&z)?;
                sol.set_node(i_node, &z, c_l.node + 1, c_r.node + 1);
                q_new.push(Fragment {
                    s: c_l.s,
                    e: c_r.e,
                    g,
                    node: i_node,
                });
                i_node -= 1;
            }
        }
        q.extend(q_new.into_iter().rev());
    }

    let c_star = q
        .pop()
        .ok_or_else(|| BreedingError::InvalidSolution("no fragments to merge".to_string()))?;
    if c_star.s != 0 || c_star.e != n_loci || !c_star.g.is_ideotype() {
        return Err(BreedingError::InvalidSolution(format!(
            "merged fragment {} does not cover every locus",
            c_star.g
        )));
    }
    let x_star = SingleChromGenotype::homozygous(&c_star.g);
    sol.set_node(0, &x_star, c_star.node + 1, c_star.node + 1);
    sol.objective = n_cross;
    check_solution(&sol, n_loci)?;
    Ok(sol)
}
