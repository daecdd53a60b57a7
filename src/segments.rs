use crate::abstract_plants::*;
use crate::error::BreedingError;
use crate::plants::bit_array::*;

/// A run `[s, e]` of favourable alleles carried by `g`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<B> {
    pub s: usize,
    pub e: usize,
    pub g: B,
}

impl<B> Segment<B> {
    pub fn new(s: usize, e: usize, g: B) -> Self {
        Self { s, e, g }
    }

    pub fn start(&self) -> usize {
        self.s
    }

    pub fn end(&self) -> usize {
        self.e
    }

    pub fn gamete(&self) -> &B {
        &self.g
    }

    /// Replaces the carried gamete, keeping the span.
    pub fn with_gamete<C>(self, g: C) -> Segment<C> {
        Segment {
            s: self.s,
            e: self.e,
            g,
        }
    }
}

/// Maximal runs of favourable alleles in `gx`, sorted by start.
pub fn extract_segments<B>(gx: B) -> Vec<Segment<B>>
where
    B: Haploid + Clone,
{
    let alleles = gx.alleles();
    let n_loci = alleles.len();
    let mut out = vec![];
    let mut i = 0;
    let mut j = 0;
    while j < n_loci {
        if alleles[j] == Allele::Z {
            if i < j {
                out.push(Segment::new(i, j - 1, gx.clone()));
            }
            i = j + 1;
        }
        j += 1;
    }
    if i < j {
        out.push(Segment::new(i, j - 1, gx));
    }
    out
}

/// Merges the segments of the two chromatids of `x` into the segments obtainable from one
/// crossover of `x`.
///
/// Both lists must be sorted by start. Overlapping or adjacent segments from opposite chromatids
/// are joined through an actual crossover of `x` taking the earlier segment's chromatid up to
/// its end. Segments contained in another are dropped.
pub fn join_segments_across_chromatids(
    x: &SingleChromGenotype,
    segs_upper: &[Segment<SingleChromGamete>],
    segs_lower: &[Segment<SingleChromGamete>],
    n_loci: usize,
) -> Result<Vec<Segment<SingleChromGamete>>, BreedingError> {
    BreedingError::check_arity(n_loci, x.n_loci())?;
    let mut q = (segs_upper, segs_lower);
    let mut chrom = Chrom::Upper;

    let mut used_upper = vec![false; segs_upper.len()];
    let mut used_lower = vec![false; segs_lower.len()];
    let mut used1 = &mut used_upper;
    let mut used2 = &mut used_lower;

    let mut i = 0;
    let mut j = 0;

    let mut out = vec![];

    while i < q.0.len() && j < q.1.len() {
        let c1 = &q.0[i];
        let c2 = &q.1[j];
        let (s1, e1) = (c1.s, c1.e);
        let (s2, e2) = (c2.s, c2.e);

        if s1 > s2 || s1 == s2 && e1 < e2 {
            q = (q.1, q.0);
            (used1, used2) = (used2, used1);
            (i, j) = (j, i);
            chrom = chrom.other();
        } else if e1 >= e2 {
            j += 1;
        } else if e1 + 1 < s2 {
            if !used1[i] {
                out.push(c1.clone());
                used1[i] = true;
            }
            i += 1;
        } else {
            let gz = CrosspointBitVec::new(chrom, e1).cross(x)?;
            out.push(Segment::new(s1, e2, gz));
            used1[i] = true;
            used2[j] = true;
            if e2 == n_loci - 1 {
                i = q.0.len();
                j = q.1.len();
            } else {
                i += 1;
            }
        }
    }

    let leftover1 = q.0[i..]
        .iter()
        .zip(used1[i..].iter())
        .filter(|(_, used)| !**used)
        .map(|(c, _)| c.clone());
    let leftover2 = q.1[j..]
        .iter()
        .zip(used2[j..].iter())
        .filter(|(_, used)| !**used)
        .map(|(c, _)| c.clone());
    let mut out: Vec<_> = out.into_iter().chain(leftover1).chain(leftover2).collect();
    out.sort_by_key(|c| (c.s, usize::MAX - c.e));
    Ok(out)
}

/// Segments achievable by one crossover of `x`.
pub fn segments_from_genotype(
    x: &SingleChromGenotype,
) -> Result<Vec<Segment<SingleChromGamete>>, BreedingError> {
    let segs_upper = extract_segments(x.upper());
    let segs_lower = extract_segments(x.lower());
    join_segments_across_chromatids(x, &segs_upper, &segs_lower, x.n_loci())
}

/// Smallest set of segments covering every locus, sorted by start.
///
/// Keeps the furthest-reaching segment for each start, then repeatedly takes the
/// furthest-reaching segment that starts at or before the first uncovered locus.
pub fn minimum_segment_cover<B: Clone>(
    n_loci: usize,
    segments: impl IntoIterator<Item = Segment<B>>,
) -> Result<Vec<Segment<B>>, BreedingError> {
    let mut segment_pigeonholes: Vec<Option<Segment<B>>> = vec![None; n_loci];
    for c in segments {
        if c.s >= n_loci || c.e >= n_loci {
            continue;
        }
        let s = c.s;
        match &segment_pigeonholes[s] {
            Some(c_old) if c_old.e >= c.e => {}
            _ => segment_pigeonholes[s] = Some(c),
        }
    }

    let mut out = vec![];
    let mut next = 0;
    let mut s = 0;
    while next < n_loci {
        let mut best: Option<&Segment<B>> = None;
        while s < n_loci && s <= next {
            if let Some(c) = &segment_pigeonholes[s] {
                if best.map_or(true, |b| b.e < c.e) {
                    best = Some(c);
                }
            }
            s += 1;
        }
        match best {
            Some(c) if c.e >= next => {
                next = c.e + 1;
                out.push(c.clone());
            }
            _ => return Err(BreedingError::Uncoverable { locus: next }),
        }
    }
    Ok(out)
}
