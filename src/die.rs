use std::collections::BTreeMap;
use std::sync::Arc;

use itertools::Itertools;
use num::bigint::RandBigInt;
use num::rational::Ratio;
use num::traits::{One, Zero};
use num::ToPrimitive;
use rand::Rng;

use crate::error::{Error, Result};
use crate::util::{pow, Weight};
use crate::value::{ComputableOutcome, Outcome};
use crate::weights::{merge, DenominatorMethod, Iter, Weights};

/// A discrete distribution with exact integer weights.
///
/// Cloning is cheap: the underlying store is shared.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Die<T: Outcome>(Arc<Weights<T>>);

/// Heterogeneous input accepted by [`Die::from_args`].
#[derive(Clone, Debug)]
pub enum DieArg<T: Outcome> {
    Outcome(T),
    Die(Die<T>),
    /// Sub-arguments with an explicit weight each.
    Weighted(Vec<(DieArg<T>, i64)>),
    /// Sub-arguments with weight one each.
    Seq(Vec<DieArg<T>>),
}

impl<T: Outcome> Die<T> {
    /// One unit of weight per outcome; repeated outcomes accumulate.
    pub fn new<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Self::from_weights(outcomes.into_iter().map(|o| (o, 1u32)))
    }

    pub fn from_weights<I, W>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, W)>,
        W: Into<Weight>,
    {
        Self::from_store(Weights::from_pairs(
            pairs.into_iter().map(|(o, w)| (o, w.into())),
        ))
    }

    pub fn from_map(map: BTreeMap<T, Weight>) -> Self {
        Self::from_store(Weights::from_map(map))
    }

    /// Builds a die from outcomes, other dice and nested weighted groups.
    ///
    /// Every argument is first turned into a die of its own; the dice are then
    /// merged with `weights` (one each by default) under `method`.
    pub fn from_args(
        args: Vec<DieArg<T>>,
        weights: Option<Vec<i64>>,
        method: DenominatorMethod,
    ) -> Result<Self> {
        let weights = match weights {
            Some(weights) if weights.len() != args.len() => {
                return Err(Error::WeightCountMismatch {
                    expected: args.len(),
                    actual: weights.len(),
                });
            }
            Some(weights) => weights,
            None => vec![1; args.len()],
        };
        let weighted = args.into_iter().zip(weights).collect();
        Ok(Self(Self::arg_store(DieArg::Weighted(weighted), method)?))
    }

    fn arg_store(arg: DieArg<T>, method: DenominatorMethod) -> Result<Arc<Weights<T>>> {
        let pairs = match arg {
            DieArg::Outcome(outcome) => {
                return Ok(Arc::new(Weights::from_pairs([(outcome, Weight::one())])));
            }
            DieArg::Die(die) => return Ok(die.0),
            DieArg::Weighted(pairs) => pairs,
            DieArg::Seq(args) => args.into_iter().map(|a| (a, 1)).collect(),
        };
        let mut sources = Vec::with_capacity(pairs.len());
        for (sub, w) in pairs {
            let w = u64::try_from(w).map_err(|_| Error::NegativeWeight(w))?;
            sources.push((Self::arg_store(sub, method)?, Weight::from(w)));
        }
        let refs: Vec<_> = sources.iter().map(|(s, w)| (&**s, w.clone())).collect();
        Ok(Arc::new(Weights::from_map(merge(&refs, method))))
    }

    pub fn scalar(outcome: T) -> Self {
        Self::new([outcome])
    }

    /// The die with no outcomes.
    pub fn empty() -> Self {
        Self::from_store(Weights::empty())
    }

    pub(crate) fn from_store(store: Weights<T>) -> Self {
        Self(Arc::new(store))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn outcomes(&self) -> &[T] {
        self.0.outcomes()
    }

    pub fn weights(&self) -> &[Weight] {
        self.0.weights()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.0.iter()
    }

    pub fn denominator(&self) -> &Weight {
        self.0.denominator()
    }

    pub fn min_outcome(&self) -> Option<&T> {
        self.0.min_outcome()
    }

    pub fn max_outcome(&self) -> Option<&T> {
        self.0.max_outcome()
    }

    pub fn has_zero_weights(&self) -> bool {
        self.0.has_zero_weights()
    }

    pub fn weight(&self, outcome: &T) -> Weight {
        self.0.weight(outcome)
    }

    pub fn weight_le(&self, outcome: &T) -> Weight {
        self.0.weight_le(outcome)
    }

    pub fn weight_lt(&self, outcome: &T) -> Weight {
        self.0.weight_lt(outcome)
    }

    pub fn weight_ge(&self, outcome: &T) -> Weight {
        self.0.weight_ge(outcome)
    }

    pub fn weight_gt(&self, outcome: &T) -> Weight {
        self.0.weight_gt(outcome)
    }

    pub fn cweights(&self) -> &[Weight] {
        self.0.cweights()
    }

    pub fn sweights(&self) -> &[Weight] {
        self.0.sweights()
    }

    /// Removes the lowest outcome. The remaining die is `None` once empty.
    pub fn pop_min(&self) -> Option<(Option<Self>, T, Weight)> {
        let popped = self.0.pop_min()?;
        Some((
            popped.rest.clone().map(Self),
            popped.outcome.clone(),
            popped.weight.clone(),
        ))
    }

    /// Removes the highest outcome. The remaining die is `None` once empty.
    pub fn pop_max(&self) -> Option<(Option<Self>, T, Weight)> {
        let popped = self.0.pop_max()?;
        Some((
            popped.rest.clone().map(Self),
            popped.outcome.clone(),
            popped.weight.clone(),
        ))
    }

    #[must_use]
    pub fn reduce(&self) -> Self {
        Self::from_store(self.0.reduce())
    }

    /// Equality after reducing both dice, i.e. equal probabilities.
    pub fn equals(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.reduce() == other.reduce()
    }

    pub fn probability(&self, outcome: &T) -> f64 {
        self.ratio(&self.weight(outcome)).unwrap_or(0.0)
    }

    pub fn pmf(&self) -> Option<Vec<(T, f64)>> {
        self.iter()
            .map(|(o, w)| self.ratio(w).map(|p| (o.clone(), p)))
            .collect()
    }

    pub fn cdf(&self) -> Option<Vec<(T, f64)>> {
        self.outcomes()
            .iter()
            .zip(self.cweights())
            .map(|(o, w)| self.ratio(w).map(|p| (o.clone(), p)))
            .collect()
    }

    /// Probability of rolling each outcome or higher.
    pub fn sf(&self) -> Option<Vec<(T, f64)>> {
        self.outcomes()
            .iter()
            .zip(self.sweights())
            .map(|(o, w)| self.ratio(w).map(|p| (o.clone(), p)))
            .collect()
    }

    pub fn mode(&self) -> Vec<T> {
        self.iter()
            .max_set_by_key(|(_, w)| *w)
            .into_iter()
            .map(|(o, _)| o.clone())
            .collect()
    }

    fn ratio(&self, weight: &Weight) -> Option<f64> {
        if self.denominator().is_zero() {
            return None;
        }
        Ratio::new(weight.clone(), self.denominator().clone()).to_f64()
    }

    /// Draws one outcome. Returns `None` when the die has no weight.
    pub fn sample_rng<R>(&self, rng: &mut R) -> Option<T>
    where
        R: Rng + ?Sized,
    {
        if self.denominator().is_zero() {
            return None;
        }
        let roll = rng.gen_biguint_below(self.denominator());
        let index = self.cweights().partition_point(|c| c <= &roll);
        self.outcomes().get(index).cloned()
    }

    pub fn map<U, F>(&self, op: F) -> Die<U>
    where
        U: Outcome,
        F: Fn(&T) -> U,
    {
        Die::from_store(self.0.map(op))
    }

    /// Joint distribution of two independent dice through `op`.
    pub fn apply_two<U, V, F>(&self, other: &Die<U>, op: F) -> Die<V>
    where
        U: Outcome,
        V: Outcome,
        F: Fn(&T, &U) -> V,
    {
        let mut outcomes = BTreeMap::new();
        for (k1, w1) in self.iter() {
            for (k2, w2) in other.iter() {
                *outcomes.entry(op(k1, k2)).or_insert_with(Weight::zero) += w1 * w2;
            }
        }
        Die::from_map(outcomes)
    }

    /// Joint distribution of any number of independent dice through `op`,
    /// enumerating every combination of outcomes.
    pub fn apply<U, F>(dice: &[&Self], op: F) -> Die<U>
    where
        U: Outcome,
        F: Fn(&[T]) -> U,
    {
        let mut outcomes = BTreeMap::new();
        let mut key = Vec::with_capacity(dice.len());
        for p in dice.iter().map(|d| d.iter()).multi_cartesian_product() {
            let mut weight = Weight::one();
            key.clear();
            for (o, w) in p {
                key.push(o.clone());
                weight *= w;
            }
            *outcomes.entry(op(&key)).or_insert_with(Weight::zero) += weight;
        }
        Die::from_map(outcomes)
    }

    /// Rerolls the given outcomes.
    ///
    /// With `max_depth = None` the outcomes are removed entirely, and `None`
    /// is returned when nothing would ever stop the rerolling.
    pub fn reroll(&self, outcomes: &[T], max_depth: Option<usize>) -> Option<Self> {
        let rerolled = |o: &T| outcomes.contains(o);
        let stop: Weight = self
            .iter()
            .filter(|(o, _)| !rerolled(*o))
            .map(|(_, w)| w)
            .sum();
        let Some(depth) = max_depth else {
            if stop.is_zero() {
                return None;
            }
            return Some(Self::from_weights(
                self.iter()
                    .filter(|(o, _)| !rerolled(*o))
                    .map(|(o, w)| (o.clone(), w.clone())),
            ));
        };

        let total = self.denominator();
        let reroll_weight = total - &stop;
        let stop_factor: Weight = (0..=depth)
            .map(|i| pow(&reroll_weight, i) * pow(total, depth - i))
            .sum();
        let reroll_factor = pow(&reroll_weight, depth);
        Some(Self::from_weights(self.iter().map(|(o, w)| {
            let factor = if rerolled(o) { &reroll_factor } else { &stop_factor };
            (o.clone(), w * factor)
        })))
    }
}

impl<T: ComputableOutcome> Die<T> {
    pub fn mean(&self) -> Option<f64> {
        if self.denominator().is_zero() {
            return None;
        }
        self.iter()
            .map(|(o, w)| self.ratio(w).map(|p| o.compute() * p))
            .sum()
    }

    pub fn variance(&self) -> Option<f64> {
        let mean = self.mean()?;
        self.iter()
            .map(|(o, w)| self.ratio(w).map(|p| (o.compute() - mean).powi(2) * p))
            .sum()
    }

    pub fn stddev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }
}

impl Die<i32> {
    /// Every integer in `low..=high` with weight one.
    pub fn uniform(low: i32, high: i32) -> Self {
        Self::new(low..=high)
    }

    pub fn standard(sides: i32) -> Self {
        Self::uniform(1, sides)
    }
}
