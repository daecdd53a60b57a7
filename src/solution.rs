//! The crossing schedule shared by every builder and oracle.
//!
//! A `BaseSolution` stores the schedule as parallel arrays. Crossings come first, founders
//! follow and any padding sits at the end. Parent references are 1-based with `0` meaning none.

use crate::abstract_plants::*;
use crate::error::BreedingError;
use crate::plants::bit_array::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Node,
    Leaf,
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseSolution {
    pub tree_data: Vec<[Vec<u8>; 2]>,
    pub tree_type: Vec<NodeKind>,
    pub tree_left: Vec<usize>,
    pub tree_right: Vec<usize>,
    pub objective: usize,
}

impl BaseSolution {
    /// A schedule of `n_plants` padding entries to be filled in by index.
    pub fn with_nulls(n_plants: usize, n_loci: usize) -> Self {
        Self {
            tree_data: vec![[vec![0; n_loci], vec![0; n_loci]]; n_plants],
            tree_type: vec![NodeKind::Null; n_plants],
            tree_left: vec![0; n_plants],
            tree_right: vec![0; n_plants],
            objective: 0,
        }
    }

    /// The schedule made of a single founder.
    pub fn leaf(x: &SingleChromGenotype) -> Self {
        let mut sol = Self::with_nulls(1, x.n_loci());
        sol.set_leaf(0, x);
        sol
    }

    pub fn set_leaf(&mut self, i: usize, x: &SingleChromGenotype) {
        self.tree_data[i] = x.to_alleles();
        self.tree_type[i] = NodeKind::Leaf;
        self.tree_left[i] = 0;
        self.tree_right[i] = 0;
    }

    /// Stores the crossing `x` at `i` with 1-based parent references.
    pub fn set_node(&mut self, i: usize, x: &SingleChromGenotype, left: usize, right: usize) {
        self.tree_data[i] = x.to_alleles();
        self.tree_type[i] = NodeKind::Node;
        self.tree_left[i] = left;
        self.tree_right[i] = right;
    }

    /// Appends an entry and returns its 1-based reference.
    pub fn push(&mut self, data: [Vec<u8>; 2], kind: NodeKind, left: usize, right: usize) -> usize {
        self.tree_data.push(data);
        self.tree_type.push(kind);
        self.tree_left.push(left);
        self.tree_right.push(right);
        self.tree_type.len()
    }

    /// Converts the lineage of `x_star` into parallel arrays.
    ///
    /// Genotypes are visited breadth first from the root and deduplicated. The root takes index
    /// 0, crossings follow in visiting order and founders come after every crossing.
    pub fn from_lineage(x_star: &WGenS) -> Self {
        let mut seen: HashMap<SingleChromGenotype, usize> = HashMap::new();
        let mut order: Vec<WGenS> = vec![];
        let mut q: VecDeque<WGenS> = VecDeque::new();
        seen.insert(x_star.genotype().clone(), 0);
        order.push(x_star.clone());
        q.push_back(x_star.clone());
        while let Some(wz) = q.pop_front() {
            if let Some((wx, wy)) = wz.parents() {
                for w in [wx, wy] {
                    if !seen.contains_key(w.genotype()) {
                        seen.insert(w.genotype().clone(), order.len());
                        order.push(w.clone());
                        q.push_back(w);
                    }
                }
            }
        }

        let n_cross = order.iter().filter(|w| !w.is_leaf()).count();
        let mut index = vec![0; order.len()];
        let mut i_node = 0;
        let mut i_leaf = n_cross;
        for (k, w) in order.iter().enumerate() {
            if w.is_leaf() {
                index[k] = i_leaf;
                i_leaf += 1;
            } else {
                index[k] = i_node;
                i_node += 1;
            }
        }

        let mut sol = Self::with_nulls(order.len(), x_star.genotype().n_loci());
        for (k, w) in order.iter().enumerate() {
            match w.parents() {
                None => sol.set_leaf(index[k], w.genotype()),
                Some((wx, wy)) => {
                    let i_x = index[seen[wx.genotype()]];
                    let i_y = index[seen[wy.genotype()]];
                    sol.set_node(index[k], w.genotype(), i_x + 1, i_y + 1);
                }
            }
        }
        sol.objective = n_cross;
        sol
    }

    /// Widens every chromatid so that allele `p` covers the loci `spans[p].0..=spans[p].1`.
    ///
    /// `spans` must tile the new loci in order, as the spans of a simplified array do.
    pub fn expand_loci(&self, spans: &[(usize, usize)]) -> Self {
        let expand = |c: &Vec<u8>| -> Vec<u8> {
            spans
                .iter()
                .zip(c)
                .flat_map(|(&(s, e), &a)| std::iter::repeat(a).take(e + 1 - s))
                .collect()
        };
        Self {
            tree_data: self
                .tree_data
                .iter()
                .map(|[upper, lower]| [expand(upper), expand(lower)])
                .collect(),
            ..self.clone()
        }
    }

    pub fn n_plants(&self) -> usize {
        self.tree_type.len()
    }

    pub fn crossings(&self) -> usize {
        self.tree_type
            .iter()
            .filter(|&&kind| kind == NodeKind::Node)
            .count()
    }

    /// Length of the longest chain of crossings in the schedule.
    pub fn generations(&self) -> usize {
        let n = self.n_plants();
        let mut gens: Vec<Option<usize>> = vec![None; n];
        (0..n)
            .map(|i| self.generations_at(i, &mut gens, 0))
            .max()
            .unwrap_or(0)
    }

    fn generations_at(&self, i: usize, gens: &mut Vec<Option<usize>>, depth: usize) -> usize {
        if let Some(g) = gens[i] {
            return g;
        }
        let n = self.n_plants();
        let g = match self.tree_type[i] {
            NodeKind::Node if depth <= n => {
                let (l, r) = (self.tree_left[i], self.tree_right[i]);
                let gen_parent = |j: usize, gens: &mut Vec<Option<usize>>| {
                    if j == 0 || j > n {
                        0
                    } else {
                        self.generations_at(j - 1, gens, depth + 1)
                    }
                };
                let gen_l = gen_parent(l, gens);
                let gen_r = gen_parent(r, gens);
                gen_l.max(gen_r) + 1
            }
            _ => 0,
        };
        gens[i] = Some(g);
        g
    }

    /// Reorders the entries so that entry `k` of the result is entry `order[k]` of `self`,
    /// rewriting parent references to follow their targets.
    pub fn permute(&self, order: &[usize]) -> Result<Self, BreedingError> {
        let n = self.n_plants();
        let mut inverse = vec![None; n];
        let not_permutation = || invalid(format!("{:?} is not a permutation of 0..{}", order, n));
        if order.len() != n {
            return Err(not_permutation());
        }
        for (k, &i) in order.iter().enumerate() {
            if i >= n || inverse[i].is_some() {
                return Err(not_permutation());
            }
            inverse[i] = Some(k);
        }
        let remap = |r: usize| -> usize {
            match r {
                0 => 0,
                r => inverse.get(r - 1).copied().flatten().map_or(0, |k| k + 1),
            }
        };
        Ok(Self {
            tree_data: order.iter().map(|&i| self.tree_data[i].clone()).collect(),
            tree_type: order.iter().map(|&i| self.tree_type[i]).collect(),
            tree_left: order.iter().map(|&i| remap(self.tree_left[i])).collect(),
            tree_right: order.iter().map(|&i| remap(self.tree_right[i])).collect(),
            objective: self.objective,
        })
    }
}

/// True iff `parent` can produce `gx` by a single crossover.
pub fn crossable(parent: &SingleChromGenotype, gx: &SingleChromGamete) -> bool {
    parent.can_produce(gx)
}

fn invalid(msg: String) -> BreedingError {
    BreedingError::InvalidSolution(msg)
}

/// Returns a crossing that is its own ancestor, if any. Parents of the first `n_nodes` entries
/// must already be known to be in range.
fn find_cycle(sol: &BaseSolution, n_nodes: usize) -> Option<usize> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Fresh,
        OnPath,
        Done,
    }
    let mut marks = vec![Mark::Fresh; n_nodes];
    for root in 0..n_nodes {
        if marks[root] != Mark::Fresh {
            continue;
        }
        marks[root] = Mark::OnPath;
        let mut stack = vec![(root, 0)];
        while let Some((i, k)) = stack.pop() {
            if k == 2 {
                marks[i] = Mark::Done;
                continue;
            }
            stack.push((i, k + 1));
            let j = [sol.tree_left[i], sol.tree_right[i]][k] - 1;
            if j >= n_nodes {
                continue;
            }
            match marks[j] {
                Mark::OnPath => return Some(j),
                Mark::Fresh => {
                    marks[j] = Mark::OnPath;
                    stack.push((j, 0));
                }
                Mark::Done => {}
            }
        }
    }
    None
}

/// Checks the structure of `sol` and that every crossing is producible from its parents.
pub fn check_solution(sol: &BaseSolution, n_loci: usize) -> Result<(), BreedingError> {
    let n = sol.n_plants();
    if n == 0 {
        return Err(invalid("empty solution".to_string()));
    }
    if sol.tree_data.len() != n || sol.tree_left.len() != n || sol.tree_right.len() != n {
        return Err(invalid("arrays differ in length".to_string()));
    }

    let n_nodes = sol.crossings();
    let n_leaves = sol
        .tree_type
        .iter()
        .filter(|&&kind| kind == NodeKind::Leaf)
        .count();
    let n_used = n_nodes + n_leaves;
    for (i, &kind) in sol.tree_type.iter().enumerate() {
        let expected = if i < n_nodes {
            NodeKind::Node
        } else if i < n_used {
            NodeKind::Leaf
        } else {
            NodeKind::Null
        };
        if kind != expected {
            return Err(invalid(format!("entry {} is {:?}, expected {:?}", i, kind, expected)));
        }
    }
    if sol.objective != n_nodes {
        return Err(invalid(format!(
            "objective {} differs from the {} crossings",
            sol.objective, n_nodes
        )));
    }

    let mut plants = Vec::with_capacity(n_used);
    for (i, data) in sol.tree_data.iter().take(n_used).enumerate() {
        if data.iter().any(|c| c.len() != n_loci || c.iter().any(|&a| a > 1)) {
            return Err(invalid(format!("entry {} is not a genotype over {} loci", i, n_loci)));
        }
        plants.push(SingleChromGenotype::from_alleles(data)?);
    }

    for i in 0..n_used {
        let (l, r) = (sol.tree_left[i], sol.tree_right[i]);
        if i >= n_nodes {
            if l != 0 || r != 0 {
                return Err(invalid(format!("leaf {} has parents", i)));
            }
            continue;
        }
        if l == 0 || r == 0 || l > n_used || r > n_used || l == i + 1 || r == i + 1 {
            return Err(invalid(format!("node {} has parents ({}, {})", i, l, r)));
        }
        let z = &plants[i];
        let (x, y) = (&plants[l - 1], &plants[r - 1]);
        let ok = (crossable(x, &z.upper()) && crossable(y, &z.lower()))
            || (crossable(y, &z.upper()) && crossable(x, &z.lower()));
        if !ok {
            return Err(invalid(format!(
                "node {} ({}) cannot be produced from {} and {}",
                i, z, x, y
            )));
        }
    }

    if let Some(i) = find_cycle(sol, n_nodes) {
        return Err(invalid(format!("node {} is its own ancestor", i)));
    }

    let n_ideotypes = plants.iter().filter(|x| x.is_ideotype()).count();
    if n_ideotypes != 1 {
        return Err(invalid(format!("{} ideotypes in the solution", n_ideotypes)));
    }
    Ok(())
}
