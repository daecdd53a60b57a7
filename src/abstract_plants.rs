use crate::error::BreedingError;
use std::collections::HashSet;
use std::hash::Hash;
use std::rc::Rc;

pub trait Genotype<B: Gamete<Self>>: Sized + std::fmt::Debug {
    fn from_gametes(gx: &B, gy: &B) -> Result<Self, BreedingError>;
}

pub trait Gamete<A: Genotype<Self>>: Sized + std::fmt::Debug {}

/// A recombination operator taking a genotype to one of its gametes.
///
/// Single-point crossover is the only operator implemented; multi-point operators would be
/// further implementors of this trait.
pub trait Crosspoint<A: Genotype<B>, B: Gamete<A>, Data>: std::fmt::Debug {
    fn cross(&self, x: &A) -> Result<B, BreedingError>;

    fn crosspoints(data: &Data) -> Box<dyn std::iter::Iterator<Item = Self>>;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Allele {
    Z,
    O,
}

impl From<bool> for Allele {
    fn from(value: bool) -> Self {
        match value {
            true => Allele::O,
            false => Allele::Z,
        }
    }
}

impl From<Allele> for bool {
    fn from(value: Allele) -> Self {
        match value {
            Allele::Z => false,
            Allele::O => true,
        }
    }
}

/// One of the two homologous chromatids of a diploid genotype.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Chrom {
    Upper,
    Lower,
}

impl Chrom {
    pub fn other(self) -> Self {
        match self {
            Chrom::Upper => Chrom::Lower,
            Chrom::Lower => Chrom::Upper,
        }
    }
}

impl From<bool> for Chrom {
    fn from(value: bool) -> Self {
        match value {
            true => Chrom::Upper,
            false => Chrom::Lower,
        }
    }
}

pub trait Haploid {
    fn alleles(&self) -> Vec<Allele>;
}

pub trait Diploid<B: Haploid> {
    fn upper(&self) -> B;

    fn lower(&self) -> B;
}

pub trait Dominance<T> {
    fn dom(x: &T, y: &T) -> bool;
}

pub trait Feasible<Data>: Sized {
    fn is_feasible(data: &Data, pop: &[Self]) -> bool;
}

////////////////////////////
//  Lineage of a program  //
////////////////////////////

/// A genotype together with the pair of gametes it was created from.
///
/// Founders have no history and become leaves of a solution; every other genotype is a
/// crossing node whose parents are the producers of its two gametes.
#[derive(Debug, PartialEq, Eq)]
pub struct WGen<A, B> {
    head: Rc<WGenCell<A, B>>,
}

/// A gamete together with the genotype that produced it.
#[derive(Debug, PartialEq, Eq)]
pub struct WGam<A, B> {
    head: Rc<WGamCell<A, B>>,
}

#[derive(Debug, PartialEq, Eq)]
struct WGenCell<A, B> {
    genotype: A,
    history: Option<(Rc<WGamCell<A, B>>, Rc<WGamCell<A, B>>)>,
}

#[derive(Debug, PartialEq, Eq)]
struct WGamCell<A, B> {
    gamete: B,
    history: Rc<WGenCell<A, B>>,
}

impl<A, B> WGen<A, B> {
    pub fn new(x: A) -> Self {
        Self {
            head: Rc::new(WGenCell {
                genotype: x,
                history: None,
            }),
        }
    }

    pub fn genotype(&self) -> &A {
        &self.head.genotype
    }

    pub fn is_leaf(&self) -> bool {
        self.head.history.is_none()
    }

    pub fn history(&self) -> Option<(WGam<A, B>, WGam<A, B>)> {
        self.head
            .history
            .as_ref()
            .map(|(wgl, wgr)| (WGam { head: wgl.clone() }, WGam { head: wgr.clone() }))
    }

    /// The parent genotypes of a crossing, if any.
    pub fn parents(&self) -> Option<(WGen<A, B>, WGen<A, B>)> {
        self.history()
            .map(|(wgl, wgr)| (wgl.history(), wgr.history()))
    }

    pub fn from_gametes(wgl: &WGam<A, B>, wgr: &WGam<A, B>) -> Result<Self, BreedingError>
    where
        A: Genotype<B>,
        B: Gamete<A>,
    {
        Ok(Self {
            head: Rc::new(WGenCell {
                genotype: A::from_gametes(wgl.gamete(), wgr.gamete())?,
                history: Some((wgl.head.clone(), wgr.head.clone())),
            }),
        })
    }

    pub fn cross<K>(&self, k: K) -> Result<WGam<A, B>, BreedingError>
    where
        K: Fn(&A) -> Result<B, BreedingError>,
    {
        Ok(WGam {
            head: Rc::new(WGamCell {
                gamete: k(self.genotype())?,
                history: self.head.clone(),
            }),
        })
    }

    /// Length of the longest chain of crossings ending at this genotype.
    pub fn generations(&self) -> usize {
        match self.parents() {
            None => 0,
            Some((wx, wy)) => wx.generations().max(wy.generations()) + 1,
        }
    }

    /// Number of distinct crossing genotypes in the history of this genotype.
    pub fn crossings(&self) -> usize
    where
        A: Clone + Hash + Eq,
    {
        let mut seen: HashSet<A> = HashSet::new();
        let mut stack = vec![self.clone()];
        while let Some(wx) = stack.pop() {
            if let Some((wy, wz)) = wx.parents() {
                if seen.insert(wx.genotype().clone()) {
                    stack.push(wy);
                    stack.push(wz);
                }
            }
        }
        seen.len()
    }
}

impl<A, B> WGam<A, B> {
    pub fn new_from_genotype(gx: B, wx: &WGen<A, B>) -> Self {
        Self {
            head: Rc::new(WGamCell {
                gamete: gx,
                history: wx.head.clone(),
            }),
        }
    }

    pub fn gamete(&self) -> &B {
        &self.head.gamete
    }

    /// The genotype this gamete was produced by.
    pub fn history(&self) -> WGen<A, B> {
        WGen {
            head: self.head.history.clone(),
        }
    }
}

impl<A, B> Clone for WGen<A, B> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
        }
    }
}

impl<A, B> Clone for WGam<A, B> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
        }
    }
}
