use crate::error::BreedingError;
use crate::plants::bit_array::SingleChromGenotype;
use crate::plants::dist_array::{canonical_dist_array, DistArray};
use rand::prelude::*;

/// Reads a distribute array from its printed form, either `[0, 1, 0]` or `0 1 0`.
pub fn parse_dist_array(s: &str) -> Result<DistArray, BreedingError> {
    let body = s.trim().trim_start_matches('[').trim_end_matches(']');
    body.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            w.parse::<usize>()
                .map_err(|e| BreedingError::InvalidInstance(format!("label {:?}: {}", w, e)))
        })
        .collect()
}

/// Reads a distribute array and returns its number of loci and homozygous founders.
pub fn parse_homozygous(s: &str) -> Result<(usize, Vec<SingleChromGenotype>), BreedingError> {
    let xs = parse_dist_array(s)?;
    if xs.is_empty() {
        return Err(BreedingError::InvalidInstance(format!("no labels in {:?}", s)));
    }
    Ok((xs.n_loci(), xs.to_population()))
}

/// A canonical distribute array over `n_loci` loci with labels drawn uniformly from
/// `0..n_pop`.
pub fn random_distribute_instance<R>(rng: &mut R, n_loci: usize, n_pop: usize) -> DistArray
where
    R: Rng + ?Sized,
{
    let xs: DistArray = (0..n_loci).map(|_| rng.gen_range(0..n_pop.max(1))).collect();
    canonical_dist_array(&xs)
}
