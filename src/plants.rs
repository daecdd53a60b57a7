//! Concrete plant representations.

/// Single-chromosome diploid genotypes and gametes stored as bit vectors
pub mod bit_array;
/// Founder-per-locus arrays for homozygous, loci-partitioning populations
pub mod dist_array;
