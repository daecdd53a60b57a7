use crate::abstract_plants::*;
use crate::error::BreedingError;
use bit_vec::BitVec;
use rand::prelude::*;
use std::fmt;

#[derive(Debug, Clone, PartialEq, PartialOrd, Ord, Eq, Hash)]
pub struct SingleChromGamete {
    n_loci: usize,
    gamete: BitVec,
}

impl Haploid for SingleChromGamete {
    fn alleles(&self) -> Vec<Allele> {
        self.gamete.iter().map(Allele::from).collect()
    }
}

impl Gamete<SingleChromGenotype> for SingleChromGamete {}

fn parse_bits(s: &str) -> Result<BitVec, BreedingError> {
    s.chars()
        .map(|c| match c {
            '0' => Ok(false),
            '1' => Ok(true),
            _ => Err(BreedingError::InvalidInstance(format!(
                "invalid allele character {:?} in {:?}",
                c, s
            ))),
        })
        .collect()
}

impl SingleChromGamete {
    pub fn bool_array(v: &[bool]) -> Self {
        Self {
            n_loci: v.len(),
            gamete: v.iter().copied().collect(),
        }
    }

    pub fn from_str(s: &str) -> Result<Self, BreedingError> {
        Ok(Self {
            n_loci: s.len(),
            gamete: parse_bits(s)?,
        })
    }

    pub fn ideotype(n_loci: usize) -> Self {
        Self {
            n_loci,
            gamete: BitVec::from_elem(n_loci, true),
        }
    }

    pub fn n_loci(&self) -> usize {
        self.n_loci
    }

    pub fn bits(&self) -> &BitVec {
        &self.gamete
    }

    pub fn get(&self, locus: usize) -> Option<bool> {
        self.gamete.get(locus)
    }

    pub fn is_ideotype(&self) -> bool {
        self.gamete.all()
    }

    pub fn to_alleles(&self) -> Vec<u8> {
        self.gamete.iter().map(u8::from).collect()
    }
}

impl fmt::Display for SingleChromGamete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.gamete.iter() {
            write!(f, "{}", u8::from(b))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, PartialOrd, Ord, Eq, Hash)]
pub struct SingleChromGenotype {
    n_loci: usize,
    chrom1: BitVec,
    chrom2: BitVec,
}

impl SingleChromGenotype {
    pub fn new(v: Vec<(bool, bool)>) -> Self {
        Self {
            n_loci: v.len(),
            chrom1: BitVec::from_fn(v.len(), |i| v[i].0),
            chrom2: BitVec::from_fn(v.len(), |i| v[i].1),
        }
    }

    pub fn from_str(s1: &str, s2: &str) -> Result<Self, BreedingError> {
        BreedingError::check_arity(s1.len(), s2.len())?;
        Ok(Self {
            n_loci: s1.len(),
            chrom1: parse_bits(s1)?,
            chrom2: parse_bits(s2)?,
        })
    }

    /// Genotype with both chromatids equal to `gx`.
    pub fn homozygous(gx: &SingleChromGamete) -> Self {
        Self {
            n_loci: gx.n_loci,
            chrom1: gx.gamete.clone(),
            chrom2: gx.gamete.clone(),
        }
    }

    pub fn ideotype(n_loci: usize) -> Self {
        Self {
            n_loci,
            chrom1: BitVec::from_elem(n_loci, true),
            chrom2: BitVec::from_elem(n_loci, true),
        }
    }

    fn random_genotype<R>(rng: &mut R, n_loci: usize) -> Self
    where
        R: Rng + ?Sized,
    {
        Self {
            n_loci,
            chrom1: BitVec::from_fn(n_loci, |_| rng.gen()),
            chrom2: BitVec::from_fn(n_loci, |_| rng.gen()),
        }
    }

    /// Samples populations until one is feasible. Without founders no population over at
    /// least one locus is feasible, so `n_pop == 0` yields an empty population.
    pub fn init_pop_random<R>(rng: &mut R, n_loci: usize, n_pop: usize) -> Vec<SingleChromGenotype>
    where
        R: Rng + ?Sized,
    {
        if n_pop == 0 {
            return vec![];
        }
        loop {
            let pop_0: Vec<_> = (0..n_pop)
                .map(|_| SingleChromGenotype::random_genotype::<R>(rng, n_loci))
                .collect();
            if SingleChromGenotype::is_feasible(&n_loci, &pop_0) {
                return pop_0;
            }
        }
    }

    pub fn n_loci(&self) -> usize {
        self.n_loci
    }

    pub fn chromatid(&self, chrom: Chrom) -> &BitVec {
        match chrom {
            Chrom::Upper => &self.chrom1,
            Chrom::Lower => &self.chrom2,
        }
    }

    pub fn get(&self, chrom: Chrom, locus: usize) -> Option<bool> {
        self.chromatid(chrom).get(locus)
    }

    pub fn is_ideotype(&self) -> bool {
        self.chrom1.all() && self.chrom2.all()
    }

    pub fn is_homozygous(&self) -> bool {
        self.chrom1 == self.chrom2
    }

    /// Bits `[0, split]` from `start` and `(split, n_loci)` from the other chromatid.
    fn crossover_bits(&self, start: Chrom, split: usize) -> BitVec {
        let c1 = self.chromatid(start);
        let c2 = self.chromatid(start.other());
        BitVec::from_fn(self.n_loci, |i| if i <= split { c1[i] } else { c2[i] })
    }

    /// Every distinct gamete obtainable by one single-point crossover, in crosspoint order.
    pub fn gametes(&self) -> Vec<SingleChromGamete> {
        let mut out: Vec<SingleChromGamete> = Vec::with_capacity(2 * self.n_loci);
        for start in [Chrom::Upper, Chrom::Lower] {
            for split in 0..self.n_loci {
                let gx = SingleChromGamete {
                    n_loci: self.n_loci,
                    gamete: self.crossover_bits(start, split),
                };
                if !out.contains(&gx) {
                    out.push(gx);
                }
            }
        }
        out
    }

    /// True iff `gx` is one of the gametes of this genotype, that is, a matching prefix on one
    /// chromatid and a matching suffix on the other together span every locus.
    pub fn can_produce(&self, gx: &SingleChromGamete) -> bool {
        if gx.n_loci != self.n_loci {
            return false;
        }
        let prefix = |c: &BitVec| {
            c.iter()
                .zip(gx.gamete.iter())
                .take_while(|(a, b)| a == b)
                .count()
        };
        let suffix = |c: &BitVec| {
            c.iter()
                .rev()
                .zip(gx.gamete.iter().rev())
                .take_while(|(a, b)| a == b)
                .count()
        };
        prefix(&self.chrom1) + suffix(&self.chrom2) >= self.n_loci
            || prefix(&self.chrom2) + suffix(&self.chrom1) >= self.n_loci
    }

    pub fn to_alleles(&self) -> [Vec<u8>; 2] {
        [
            self.chrom1.iter().map(u8::from).collect(),
            self.chrom2.iter().map(u8::from).collect(),
        ]
    }

    pub fn from_alleles(data: &[Vec<u8>; 2]) -> Result<Self, BreedingError> {
        BreedingError::check_arity(data[0].len(), data[1].len())?;
        Ok(Self {
            n_loci: data[0].len(),
            chrom1: data[0].iter().map(|&a| a != 0).collect(),
            chrom2: data[1].iter().map(|&a| a != 0).collect(),
        })
    }
}

impl fmt::Display for SingleChromGenotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.upper(), self.lower())
    }
}

impl Diploid<SingleChromGamete> for SingleChromGenotype {
    fn upper(&self) -> SingleChromGamete {
        SingleChromGamete {
            n_loci: self.n_loci,
            gamete: self.chrom1.clone(),
        }
    }

    fn lower(&self) -> SingleChromGamete {
        SingleChromGamete {
            n_loci: self.n_loci,
            gamete: self.chrom2.clone(),
        }
    }
}

impl Genotype<SingleChromGamete> for SingleChromGenotype {
    fn from_gametes(gx: &SingleChromGamete, gy: &SingleChromGamete) -> Result<Self, BreedingError> {
        BreedingError::check_arity(gx.n_loci, gy.n_loci)?;
        Ok(Self {
            n_loci: gx.n_loci,
            chrom1: gx.gamete.clone(),
            chrom2: gy.gamete.clone(),
        })
    }
}

impl Feasible<usize> for SingleChromGenotype {
    fn is_feasible(n_loci: &usize, pop: &[Self]) -> bool {
        let mut total = BitVec::from_elem(*n_loci, false);
        for x in pop {
            if x.n_loci != *n_loci {
                return false;
            }
            total.or(&x.chrom1);
            total.or(&x.chrom2);
        }
        total.all()
    }
}

fn superset(x: &BitVec, y: &BitVec) -> bool {
    x.iter().zip(y.iter()).all(|(xi, yi)| xi >= yi)
}

pub struct DomGamete {}

impl Dominance<SingleChromGamete> for DomGamete {
    fn dom(x: &SingleChromGamete, y: &SingleChromGamete) -> bool {
        superset(&x.gamete, &y.gamete)
    }
}

/// Chromatid-wise weak dominance; upper is compared with upper and lower with lower.
pub struct DomGenotype {}

impl Dominance<SingleChromGenotype> for DomGenotype {
    fn dom(x: &SingleChromGenotype, y: &SingleChromGenotype) -> bool {
        superset(&x.chrom1, &y.chrom1) && superset(&x.chrom2, &y.chrom2)
    }
}

pub fn weak_dominates(
    x: &SingleChromGenotype,
    y: &SingleChromGenotype,
) -> Result<bool, BreedingError> {
    BreedingError::check_arity(x.n_loci, y.n_loci)?;
    Ok(DomGenotype::dom(x, y))
}

pub fn gamete_weak_dominates(
    gx: &SingleChromGamete,
    gy: &SingleChromGamete,
) -> Result<bool, BreedingError> {
    BreedingError::check_arity(gx.n_loci, gy.n_loci)?;
    Ok(DomGamete::dom(gx, gy))
}

/// Single-point crossover taking loci `[0, split_locus]` from `source_first` and the remaining
/// loci from the other chromatid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CrosspointBitVec {
    source_first: Chrom,
    split_locus: usize,
}

impl CrosspointBitVec {
    pub fn new(source_first: Chrom, split_locus: usize) -> Self {
        Self {
            source_first,
            split_locus,
        }
    }

    pub fn source_first(&self) -> Chrom {
        self.source_first
    }

    pub fn split_locus(&self) -> usize {
        self.split_locus
    }

    pub fn random_crosspoint_uniform(rng: &mut impl Rng, n_loci: usize) -> Self {
        Self {
            source_first: rng.gen::<bool>().into(),
            split_locus: rng.gen_range(0..n_loci),
        }
    }
}

impl Crosspoint<SingleChromGenotype, SingleChromGamete, usize> for CrosspointBitVec {
    fn cross(&self, x: &SingleChromGenotype) -> Result<SingleChromGamete, BreedingError> {
        if self.split_locus >= x.n_loci {
            return Err(BreedingError::InvalidCrosspoint {
                split: self.split_locus,
                n_loci: x.n_loci,
            });
        }
        Ok(SingleChromGamete {
            n_loci: x.n_loci,
            gamete: x.crossover_bits(self.source_first, self.split_locus),
        })
    }

    fn crosspoints(n_loci: &usize) -> Box<dyn std::iter::Iterator<Item = Self>> {
        let n_loci = *n_loci;
        Box::new(
            [Chrom::Upper, Chrom::Lower]
                .into_iter()
                .flat_map(move |source_first| {
                    (0..n_loci).map(move |split_locus| CrosspointBitVec {
                        source_first,
                        split_locus,
                    })
                }),
        )
    }
}

/// Lineage handles over bit-vector plants.
pub type WGenS = WGen<SingleChromGenotype, SingleChromGamete>;
pub type WGamS = WGam<SingleChromGenotype, SingleChromGamete>;
