use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use num::traits::{One, Zero};
use num::Integer;
use once_cell::sync::OnceCell;

use crate::util::{structural_hash, Weight};
use crate::value::Outcome;

pub type Iter<'a, T> = std::iter::Zip<std::slice::Iter<'a, T>, std::slice::Iter<'a, Weight>>;

/// How the denominators of several weighted sources are combined when they
/// are merged into a single store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DenominatorMethod {
    /// Multiply all denominators together.
    Prod,
    /// Least common multiple of the denominators.
    Lcm,
    /// Least common multiple after cancelling each denominator against the
    /// weight it is applied with.
    #[default]
    LcmJoint,
    /// `LcmJoint`, then divide every weight by their greatest common divisor.
    Reduce,
}

/// Result of removing the extreme outcome of a store.
#[derive(Clone, Debug)]
pub struct Popped<T: Outcome> {
    pub rest: Option<Arc<Weights<T>>>,
    pub outcome: T,
    pub weight: Weight,
}

/// Immutable outcome to weight mapping, sorted by outcome.
#[derive(Debug)]
pub struct Weights<T: Outcome> {
    outcomes: Vec<T>,
    weights: Vec<Weight>,
    denominator: Weight,
    hash: u64,
    cweights: OnceCell<Vec<Weight>>,
    sweights: OnceCell<Vec<Weight>>,
    pop_min: OnceCell<Option<Popped<T>>>,
    pop_max: OnceCell<Option<Popped<T>>>,
}

impl<T: Outcome> Weights<T> {
    pub fn empty() -> Self {
        Self::from_sorted(Vec::new(), Vec::new())
    }

    pub fn from_map(map: BTreeMap<T, Weight>) -> Self {
        let (outcomes, weights) = map.into_iter().unzip();
        Self::from_sorted(outcomes, weights)
    }

    /// Merges duplicate outcomes by adding their weights.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, Weight)>,
    {
        let mut map = BTreeMap::new();
        for (outcome, weight) in pairs {
            *map.entry(outcome).or_insert_with(Weight::zero) += weight;
        }
        Self::from_map(map)
    }

    fn from_sorted(outcomes: Vec<T>, weights: Vec<Weight>) -> Self {
        let denominator = weights.iter().sum();
        let hash = structural_hash(&(&outcomes, &weights));
        Self {
            outcomes,
            weights,
            denominator,
            hash,
            cweights: OnceCell::new(),
            sweights: OnceCell::new(),
            pop_min: OnceCell::new(),
            pop_max: OnceCell::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[T] {
        &self.outcomes
    }

    pub fn weights(&self) -> &[Weight] {
        &self.weights
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.outcomes.iter().zip(self.weights.iter())
    }

    pub fn denominator(&self) -> &Weight {
        &self.denominator
    }

    pub fn min_outcome(&self) -> Option<&T> {
        self.outcomes.first()
    }

    pub fn max_outcome(&self) -> Option<&T> {
        self.outcomes.last()
    }

    pub fn has_zero_weights(&self) -> bool {
        self.weights.iter().any(Zero::is_zero)
    }

    pub fn weight(&self, outcome: &T) -> Weight {
        match self.outcomes.binary_search(outcome) {
            Ok(index) => self.weights[index].clone(),
            Err(_) => Weight::zero(),
        }
    }

    /// Running totals from the lowest outcome up, inclusive.
    pub fn cweights(&self) -> &[Weight] {
        self.cweights.get_or_init(|| {
            self.weights
                .iter()
                .scan(Weight::zero(), |acc, w| {
                    *acc += w;
                    Some(acc.clone())
                })
                .collect()
        })
    }

    /// Running totals from the highest outcome down, inclusive.
    pub fn sweights(&self) -> &[Weight] {
        self.sweights.get_or_init(|| {
            let mut result: Vec<Weight> = self
                .weights
                .iter()
                .rev()
                .scan(Weight::zero(), |acc, w| {
                    *acc += w;
                    Some(acc.clone())
                })
                .collect();
            result.reverse();
            result
        })
    }

    pub fn weight_le(&self, outcome: &T) -> Weight {
        let index = self.outcomes.partition_point(|o| o <= outcome);
        match index {
            0 => Weight::zero(),
            _ => self.cweights()[index - 1].clone(),
        }
    }

    pub fn weight_lt(&self, outcome: &T) -> Weight {
        let index = self.outcomes.partition_point(|o| o < outcome);
        match index {
            0 => Weight::zero(),
            _ => self.cweights()[index - 1].clone(),
        }
    }

    pub fn weight_ge(&self, outcome: &T) -> Weight {
        let index = self.outcomes.partition_point(|o| o < outcome);
        self.sweights().get(index).cloned().unwrap_or_default()
    }

    pub fn weight_gt(&self, outcome: &T) -> Weight {
        let index = self.outcomes.partition_point(|o| o <= outcome);
        self.sweights().get(index).cloned().unwrap_or_default()
    }

    pub fn pop_min(&self) -> Option<&Popped<T>> {
        self.pop_min
            .get_or_init(|| {
                let (outcome, weight) = self.iter().next()?;
                let rest = Self::from_sorted(self.outcomes[1..].to_vec(), self.weights[1..].to_vec());
                Some(Popped {
                    rest: (!rest.is_empty()).then(|| Arc::new(rest)),
                    outcome: outcome.clone(),
                    weight: weight.clone(),
                })
            })
            .as_ref()
    }

    pub fn pop_max(&self) -> Option<&Popped<T>> {
        self.pop_max
            .get_or_init(|| {
                let last = self.len().checked_sub(1)?;
                let rest = Self::from_sorted(self.outcomes[..last].to_vec(), self.weights[..last].to_vec());
                Some(Popped {
                    rest: (!rest.is_empty()).then(|| Arc::new(rest)),
                    outcome: self.outcomes[last].clone(),
                    weight: self.weights[last].clone(),
                })
            })
            .as_ref()
    }

    /// Divides all weights by their greatest common divisor.
    pub fn reduce(&self) -> Self {
        let gcd = self
            .weights
            .iter()
            .fold(Weight::zero(), |acc, w| acc.gcd(w));
        if gcd.is_zero() || gcd.is_one() {
            return Self::from_sorted(self.outcomes.clone(), self.weights.clone());
        }
        Self::from_sorted(
            self.outcomes.clone(),
            self.weights.iter().map(|w| w / &gcd).collect(),
        )
    }

    pub fn map<U, F>(&self, op: F) -> Weights<U>
    where
        U: Outcome,
        F: Fn(&T) -> U,
    {
        Weights::from_pairs(self.iter().map(|(o, w)| (op(o), w.clone())))
    }
}

impl<T: Outcome> Clone for Weights<T> {
    fn clone(&self) -> Self {
        Self::from_sorted(self.outcomes.clone(), self.weights.clone())
    }
}

impl<T: Outcome> PartialEq for Weights<T> {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.outcomes == other.outcomes && self.weights == other.weights
    }
}

impl<T: Outcome> Eq for Weights<T> {}

impl<T: Outcome> Hash for Weights<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

/// Merges weighted sub-stores into one mapping.
///
/// Each source is scaled so that its own denominator becomes the common
/// denominator chosen by `method`, times the weight it is applied with.
/// Sources with no outcomes contribute nothing.
pub fn merge<T: Outcome>(
    sources: &[(&Weights<T>, Weight)],
    method: DenominatorMethod,
) -> BTreeMap<T, Weight> {
    let live: Vec<_> = sources
        .iter()
        .filter(|(store, _)| !store.denominator().is_zero())
        .collect();

    let denominator = match method {
        DenominatorMethod::Prod => live
            .iter()
            .fold(Weight::one(), |acc, (store, _)| acc * store.denominator()),
        DenominatorMethod::Lcm => live
            .iter()
            .fold(Weight::one(), |acc, (store, _)| acc.lcm(store.denominator())),
        DenominatorMethod::LcmJoint | DenominatorMethod::Reduce => {
            live.iter().fold(Weight::one(), |acc, (store, w)| {
                let d = store.denominator();
                acc.lcm(&(d / d.gcd(w)))
            })
        }
    };

    let mut result = BTreeMap::new();
    for (store, w) in live {
        let factor = &denominator * w / store.denominator();
        for (outcome, weight) in store.iter() {
            *result.entry(outcome.clone()).or_insert_with(Weight::zero) += weight * &factor;
        }
    }
    // Zero-denominator sources may still carry zero-weight outcomes.
    for (store, _) in sources.iter().filter(|(store, _)| store.denominator().is_zero()) {
        for outcome in store.outcomes() {
            result.entry(outcome.clone()).or_insert_with(Weight::zero);
        }
    }

    if method == DenominatorMethod::Reduce {
        let gcd = result.values().fold(Weight::zero(), |acc, w| acc.gcd(w));
        if !gcd.is_zero() {
            result.values_mut().for_each(|w| *w /= &gcd);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(pairs: &[(i32, u32)]) -> Weights<i32> {
        Weights::from_pairs(pairs.iter().map(|&(o, w)| (o, Weight::from(w))))
    }

    #[test]
    fn test_duplicates_are_merged() {
        let s = store(&[(3, 1), (1, 2), (3, 4)]);
        assert_eq!(s.outcomes(), &[1, 3]);
        assert_eq!(s.weights(), &[Weight::from(2u32), Weight::from(5u32)]);
        assert_eq!(s.denominator(), &Weight::from(7u32));
    }

    #[test]
    fn test_cumulative_queries() {
        let s = store(&[(1, 1), (2, 2), (4, 3)]);
        assert_eq!(s.weight(&3), Weight::zero());
        assert_eq!(s.weight_le(&2), Weight::from(3u32));
        assert_eq!(s.weight_lt(&2), Weight::from(1u32));
        assert_eq!(s.weight_ge(&2), Weight::from(5u32));
        assert_eq!(s.weight_gt(&2), Weight::from(3u32));
        assert_eq!(s.weight_le(&0), Weight::zero());
        assert_eq!(s.weight_gt(&4), Weight::zero());
        assert_eq!(s.weight_ge(&3), Weight::from(3u32));
    }

    #[test]
    fn test_pop_extremes() {
        let s = store(&[(1, 1), (2, 2)]);
        let popped = s.pop_max().unwrap();
        assert_eq!(popped.outcome, 2);
        assert_eq!(popped.weight, Weight::from(2u32));
        let rest = popped.rest.as_ref().unwrap();
        assert_eq!(rest.outcomes(), &[1]);
        assert!(rest.pop_min().unwrap().rest.is_none());
        assert!(Weights::<i32>::empty().pop_max().is_none());
    }

    #[test]
    fn test_lcm_joint_denominator() {
        let dice: Vec<Weights<i32>> = [6, 8, 10, 12]
            .into_iter()
            .map(|n| store(&(1..=n).map(|o| (o, 1u32)).collect::<Vec<_>>()))
            .collect();
        let sources: Vec<_> = dice
            .iter()
            .zip([3u32, 4, 5, 6])
            .map(|(d, w)| (d, Weight::from(w)))
            .collect();
        let merged = merge(&sources, DenominatorMethod::LcmJoint);
        let total: Weight = merged.values().sum();
        assert_eq!(total, Weight::from(36u32));
    }

    #[test]
    fn test_equal_stores_hash_alike() {
        assert_eq!(store(&[(1, 1), (2, 1)]), store(&[(2, 1), (1, 1)]));
        assert_ne!(store(&[(1, 1)]), store(&[(1, 2)]));
    }
}
