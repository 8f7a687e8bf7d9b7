use std::hash::Hash;

use ahash::{AHashMap, RandomState};
use num::traits::{One, Pow};
use num::BigUint;
use once_cell::sync::Lazy;

pub type Weight = BigUint;
pub type Map<K, V> = AHashMap<K, V>;

// Fixed seeds so structural hashes agree between instances built apart.
static STRUCTURAL_HASHER: Lazy<RandomState> = Lazy::new(|| {
    RandomState::with_seeds(
        0x243f_6a88_85a3_08d3,
        0x1319_8a2e_0370_7344,
        0xa409_3822_299f_31d0,
        0x082e_fa98_ec4e_6c89,
    )
});

pub(crate) fn structural_hash<H: Hash + ?Sized>(value: &H) -> u64 {
    STRUCTURAL_HASHER.hash_one(value)
}

/// `C(n, k) * w^k` for every `k` in `0..=n`.
pub(crate) fn comb_row(n: usize, w: &Weight) -> Vec<Weight> {
    let mut row = Vec::with_capacity(n + 1);
    let mut binom = Weight::one();
    let mut power = Weight::one();
    for k in 0..=n {
        row.push(&binom * &power);
        binom = binom * Weight::from(n - k) / Weight::from(k + 1);
        power *= w;
    }
    row
}

pub(crate) fn pow(base: &Weight, exp: usize) -> Weight {
    Pow::pow(base, exp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comb_row_matches_binomial_expansion() {
        let row = comb_row(4, &Weight::from(2u32));
        let expected: Vec<Weight> = [1u32, 8, 24, 32, 16].into_iter().map(Weight::from).collect();
        assert_eq!(row, expected);
    }

    #[test]
    fn test_comb_row_zero_dice() {
        assert_eq!(comb_row(0, &Weight::from(7u32)), vec![Weight::one()]);
    }

    #[test]
    fn test_structural_hash_is_stable() {
        assert_eq!(structural_hash(&[1, 2, 3]), structural_hash(&vec![1, 2, 3][..]));
    }
}
