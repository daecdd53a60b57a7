//! A structure to represent the distribution of loci among homozygous founders.
//!
//! A `DistArray` describes which founder owns which locus. Each locus is owned by exactly one
//! founder, and each founder can own multiple loci. The module includes the canonical and
//! simplified forms of these arrays, the full-join and redistribution moves used by the exact
//! search, bounds on the number of crossings, and a generator over all canonical arrays of a
//! given length.
//!
//! # Examples
//! ```
//! use crossing_schedules::dist_array;
//! use crossing_schedules::plants::dist_array::*;
//! let xs = dist_array![0, 1, 0, 0, 1, 2, 2];
//! assert_eq!(simplify_dist_array(&xs), dist_array![0, 1, 0, 1, 2]);
//! ```

use crate::abstract_plants::{Diploid, Haploid};
use crate::plants::bit_array::{SingleChromGamete, SingleChromGenotype};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::FromIterator;
use std::ops::{Deref, DerefMut};

/// Describes which founder owns which locus.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct DistArray(Vec<usize>);

impl DistArray {
    /// Returns the number of loci. Is equivalent to `self.len()`.
    ///
    /// # Examples
    /// ```
    /// use crossing_schedules::dist_array;
    /// let xs = dist_array![0, 1, 0, 1, 2];
    /// assert_eq!(xs.n_loci(), 5);
    /// ```
    #[inline]
    pub fn n_loci(&self) -> usize {
        self.len()
    }

    /// Returns the number of founders implied by the DistArray, `max(xs) + 1`.
    pub fn n_pop(&self) -> usize {
        self.0.iter().max().map_or(0, |&max| max + 1)
    }

    /// Number of maximal runs of equal labels.
    pub fn n_segments(&self) -> usize {
        (0..self.len())
            .filter(|&i| i == 0 || self[i] != self[i - 1])
            .count()
    }

    pub fn into_inner(self) -> Vec<usize> {
        self.0
    }

    /// First and last position of each label, indexed by label.
    pub fn ranges(&self) -> Vec<(usize, usize)> {
        distribute_to_ranges(self)
    }

    /// Homozygous founders whose favourable alleles sit at the loci they own.
    pub fn to_population(&self) -> Vec<SingleChromGenotype> {
        (0..self.n_pop())
            .map(|g| {
                let v: Vec<bool> = self.iter().map(|&x| x == g).collect();
                SingleChromGenotype::homozygous(&SingleChromGamete::bool_array(&v))
            })
            .collect()
    }

    /// Recognises a population of homozygous founders partitioning the loci.
    ///
    /// Returns the canonical DistArray of `pop`, or `None` when some founder is heterozygous,
    /// owns no locus, or shares a locus with another founder.
    pub fn from_population(n_loci: usize, pop: &[SingleChromGenotype]) -> Option<Self> {
        if n_loci == 0 || pop.is_empty() {
            return None;
        }
        let mut owner: Vec<Option<usize>> = vec![None; n_loci];
        for (g, x) in pop.iter().enumerate() {
            if x.n_loci() != n_loci || !x.is_homozygous() {
                return None;
            }
            let mut owns_any = false;
            for (i, a) in x.upper().alleles().into_iter().enumerate() {
                if bool::from(a) {
                    if owner[i].is_some() {
                        return None;
                    }
                    owner[i] = Some(g);
                    owns_any = true;
                }
            }
            if !owns_any {
                return None;
            }
        }
        let xs: Option<DistArray> = owner.into_iter().collect();
        xs.map(|xs| canonical_dist_array(&xs))
    }
}

impl fmt::Display for DistArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Checks if a DistArray is in canonical form.
///
/// A DistArray is in canonical form if:
/// - The first element is 0.
/// - Each subsequent element is at most 1 greater than the maximum of all previous elements.
///
/// # Examples
/// ```
/// use crossing_schedules::dist_array;
/// use crossing_schedules::plants::dist_array::is_canonical_dist_array;
/// assert!(is_canonical_dist_array(&dist_array![0, 1, 1, 0, 2]));
/// assert!(!is_canonical_dist_array(&dist_array![0, 2, 1, 0]));
/// ```
pub fn is_canonical_dist_array(xs: &DistArray) -> bool {
    if xs.is_empty() || xs[0] != 0 {
        return false;
    }
    let mut x_max = 0;
    for &x in xs.iter().skip(1) {
        if x > x_max + 1 {
            return false;
        }
        x_max = x_max.max(x);
    }
    true
}

/// Canonical with no two consecutive elements equal.
pub fn is_simple_dist_array(xs: &DistArray) -> bool {
    is_canonical_dist_array(xs) && xs.windows(2).all(|w| w[0] != w[1])
}

impl Deref for DistArray {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DistArray {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<usize>> for DistArray {
    fn from(v: Vec<usize>) -> Self {
        Self(v)
    }
}

impl From<DistArray> for Vec<usize> {
    fn from(xs: DistArray) -> Self {
        xs.0
    }
}

impl FromIterator<usize> for DistArray {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a usize> for DistArray {
    fn from_iter<I: IntoIterator<Item = &'a usize>>(iter: I) -> Self {
        Self(iter.into_iter().cloned().collect())
    }
}

/// First and last position of each label in `xs`.
///
/// Labels that do not occur get the empty marker `(n_loci, 0)`.
pub fn distribute_to_ranges(xs: &DistArray) -> Vec<(usize, usize)> {
    let mut ranges = vec![(xs.n_loci(), 0); xs.n_pop()];
    for (i, &x) in xs.iter().enumerate().rev() {
        ranges[x].0 = i;
    }
    for (i, &x) in xs.iter().enumerate() {
        ranges[x].1 = i;
    }
    ranges
}

/// Relabels `xs` by order of first appearance.
///
/// Returns the relabelled array and the mapping from old labels to new ones.
pub fn canonical_mapping(xs: &DistArray) -> (DistArray, Vec<Option<usize>>) {
    let mut mapping = vec![None; xs.n_pop()];
    let mut next = 0;
    let zs = xs
        .iter()
        .map(|&x| {
            *mapping[x].get_or_insert_with(|| {
                next += 1;
                next - 1
            })
        })
        .collect();
    (zs, mapping)
}

/// Relabels founders by order of first appearance.
pub fn canonical_dist_array(xs: &DistArray) -> DistArray {
    canonical_mapping(xs).0
}

/// Merges adjacent positions owned by the same founder, then relabels canonically.
pub fn simplify_dist_array(xs: &DistArray) -> DistArray {
    let merged: DistArray = xs
        .iter()
        .enumerate()
        .filter(|&(i, x)| i == 0 || *x != xs[i - 1])
        .map(|(_, &x)| x)
        .collect();
    canonical_dist_array(&merged)
}

/// The simplified array of `xs` together with, per position of the result, the union of the
/// spans of the positions merged into it, and the mapping from labels of `xs` to new labels.
pub fn simplify_dist_array_with_spans(
    xs: &DistArray,
    spans: &[(usize, usize)],
) -> (DistArray, Vec<(usize, usize)>, Vec<Option<usize>>) {
    let mut merged = Vec::with_capacity(xs.len());
    let mut merged_spans: Vec<(usize, usize)> = Vec::with_capacity(xs.len());
    for (i, (&x, &(s, e))) in xs.iter().zip(spans.iter()).enumerate() {
        match merged_spans.last_mut() {
            Some(last) if i > 0 && x == xs[i - 1] => last.1 = e,
            _ => {
                merged.push(x);
                merged_spans.push((s, e));
            }
        }
    }
    let (zs, mapping) = canonical_mapping(&DistArray(merged));
    (zs, merged_spans, mapping)
}

/// Finds the first pair `(gx, gy)` where the last locus of `gx` immediately precedes the first
/// locus of `gy`, so one crossing of the two founders yields a gamete covering both.
///
/// Returns the array with every `gy` relabelled to `gx`, along with `gx` and `gy`.
pub fn first_full_join(xs: &DistArray) -> Option<(DistArray, usize, usize)> {
    let ranges = distribute_to_ranges(xs);
    for (gy, &(sy, ey)) in ranges.iter().enumerate() {
        if sy > 0 && sy < xs.n_loci() && ranges[xs[sy - 1]].1 == sy - 1 {
            let gx = xs[sy - 1];
            let mut out = xs.clone();
            for i in sy..ey + 1 {
                if xs[i] == gy {
                    out[i] = gx;
                }
            }
            return Some((out, gx, gy));
        }
    }
    None
}

/// True if the positions of `zs[..=i]` labelled `g` switch source founder in `xs` more than
/// once, which a single crossover cannot produce.
pub fn requires_multipoint(zs: &DistArray, xs: &DistArray, g: usize, i: usize) -> bool {
    let mut swaps = -1;
    let mut prev_value = None;
    for (&gz, &gx) in zs.iter().take(i + 1).zip(xs.iter()) {
        if gz == g && Some(gx) != prev_value {
            prev_value = Some(gx);
            swaps += 1;
        }
        if swaps > 1 {
            return true;
        }
    }
    false
}

/// Creates the redistributions of `xs` reachable by crossing one pair of founders.
///
/// Returns tuples `(zs, gx, gy)` where `gx < gy` are the crossed founders. Positions owned by
/// `gx` or `gy` in `xs` are regrouped in `zs`; each group is one gamete of the crossing and is
/// labelled `gx`, `gy`, `n_pop`, `n_pop + 1`, ... in order of first appearance. Positions owned
/// by the other founders keep their labels.
pub fn generate_redistributions(xs: &DistArray) -> Vec<(DistArray, usize, usize)> {
    let n_loci = xs.n_loci();
    let n_pop = xs.n_pop();
    if n_pop < 2 {
        return vec![];
    }
    let mut zs = xs.clone();
    let mut available_gz_values: Vec<usize> = (n_pop - 2..n_pop + n_loci).collect();
    let mut out = Vec::new();

    // Backtracking for raw redistributions with gx and gy fixed
    #[allow(clippy::too_many_arguments)]
    fn bt(
        xs: &DistArray,
        out: &mut Vec<(DistArray, usize, usize)>,
        gx: usize,
        gy: usize,
        zs: &mut DistArray,
        i: usize,
        available_gz_values: &[usize],
        j_max: usize,
    ) {
        if i >= xs.len() {
            out.push((zs.clone(), gx, gy));
        } else if xs[i] != gx && xs[i] != gy {
            bt(xs, out, gx, gy, zs, i + 1, available_gz_values, j_max);
        } else {
            for (j, &gz) in available_gz_values.iter().take(j_max + 1).enumerate() {
                zs[i] = gz;
                if requires_multipoint(zs, xs, gz, i) {
                    continue;
                }
                let j_next = if j == j_max { j_max + 1 } else { j_max };
                bt(xs, out, gx, gy, zs, i + 1, available_gz_values, j_next);
            }
            zs[i] = xs[i];
        }
    }

    for gx in 0..n_pop - 1 {
        for gy in gx + 1..n_pop {
            zs.copy_from_slice(xs);
            available_gz_values[0] = gx;
            available_gz_values[1] = gy;
            bt(xs, &mut out, gx, gy, &mut zs, 0, &available_gz_values, 0);
        }
    }
    out
}

/// Returns true if each founder of `ys` owns a subset of the loci of some founder of `xs`.
pub fn dominates_gametewise(xs: &DistArray, ys: &DistArray) -> bool {
    if xs.len() != ys.len() {
        return false;
    }
    let mut d = vec![None; ys.n_pop()];
    for (&gx, &gy) in xs.iter().zip(ys.iter()) {
        match d[gy] {
            None => d[gy] = Some(gx),
            Some(g) if g != gx => return false,
            _ => {}
        }
    }
    true
}

/// Returns true if and only if `xs` is a subsequence of `ys`.
pub fn dominates_as_subsequence(xs: &DistArray, ys: &DistArray) -> bool {
    let nx = xs.len();
    let ny = ys.len();
    if nx > ny {
        return false;
    }
    if nx == ny {
        return xs == ys;
    }
    // dp[ix][iy] is the length of the longest common subsequence of xs[..ix] and ys[..iy]
    let mut dp = vec![vec![0; ny + 1]; nx + 1];
    for (ix, x) in xs.iter().enumerate() {
        for (iy, y) in ys.iter().enumerate() {
            dp[ix + 1][iy + 1] = (dp[ix][iy] + ((x == y) as usize))
                .max(dp[ix + 1][iy])
                .max(dp[ix][iy + 1])
        }
    }
    dp[nx][ny] == nx
}

/// Lower bound on the crossings, final selfing included, needed for `xs`.
///
/// A crossing lowers `n_segments + n_pop` by at most two and the goal `[0]` has value two, so
/// at least `ceil((n_segments + n_pop) / 2)` crossings are needed.
pub fn distribute_lower_bound(xs: &DistArray) -> usize {
    if xs.n_pop() <= 1 {
        return 0;
    }
    (xs.n_segments() + xs.n_pop() + 1) / 2
}

/// Crossings used by chaining the segments left to right and selfing the result.
pub fn distribute_upper_bound(xs: &DistArray) -> usize {
    if xs.n_pop() <= 1 {
        return 0;
    }
    xs.n_segments()
}

/// Splits `xs` into maximal position ranges `(s, e)` that no founder straddles.
///
/// The loci of each range can be combined independently of the rest of the array.
///
/// # Examples
/// ```
/// use crossing_schedules::dist_array;
/// use crossing_schedules::plants::dist_array::distribute_to_isolated_subproblems;
/// assert_eq!(
///     distribute_to_isolated_subproblems(&dist_array![0, 1, 0, 2, 3, 2]),
///     vec![(0, 2), (3, 5)]
/// );
/// ```
pub fn distribute_to_isolated_subproblems(xs: &DistArray) -> Vec<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = distribute_to_ranges(xs)
        .into_iter()
        .filter(|&(s, e)| s <= e)
        .collect();
    ranges.sort();
    let mut out: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for (s, e) in ranges {
        match out.last_mut() {
            Some(last) if last.1 > s => last.1 = last.1.max(e),
            _ => out.push((s, e)),
        }
    }
    out
}

/// Enumerates every simplified canonical DistArray with `n_loci` loci in lexicographic order.
pub struct DistArrayGenerator {
    n_loci: usize,
    xs: DistArray,
    xs_max: Vec<usize>,
    initialised: bool,
}

impl DistArrayGenerator {
    pub fn new(n_loci: usize) -> Self {
        Self {
            n_loci,
            xs: DistArray(vec![0; n_loci]),
            xs_max: vec![0; n_loci],
            initialised: false,
        }
    }
}

impl Iterator for DistArrayGenerator {
    type Item = DistArray;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.initialised {
            if self.n_loci == 0 {
                return None;
            }
            for i in 0..self.n_loci {
                self.xs[i] = i % 2;
                self.xs_max[i] = if i == 0 { 0 } else { 1 };
            }
            self.initialised = true;
            return Some(self.xs.clone());
        }
        for i in (1..self.n_loci).rev() {
            if self.xs[i] <= self.xs_max[i - 1] {
                self.xs[i] += 1 + (self.xs[i] + 1 == self.xs[i - 1]) as usize;
                self.xs_max[i] = self.xs_max[i - 1].max(self.xs[i]);
                for j in i + 1..self.n_loci {
                    self.xs_max[j] = self.xs_max[i];
                    self.xs[j] = if self.xs[j - 1] == 0 { 1 } else { 0 };
                }
                return Some(self.xs.clone());
            }
        }
        None
    }
}

/// Creates a DistArray from a list of labels.
///
/// # Examples
/// ```
/// use crossing_schedules::dist_array;
/// let d = dist_array![0, 1, 0, 2, 1];
/// assert_eq!(d.n_loci(), 5);
/// assert_eq!(d.n_pop(), 3);
/// ```
#[macro_export]
macro_rules! dist_array {
    ($($x:expr),* $(,)?) => {
        $crate::plants::dist_array::DistArray::from(vec![$($x),*])
    };
}
