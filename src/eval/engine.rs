use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use bon::Builder;
use itertools::Itertools;
use num::traits::{One, Zero};
use tracing::{debug, trace};

use super::Evaluator;
use crate::die::Die;
use crate::error::{Error, Result};
use crate::generator::{Generator, Order};
use crate::util::{Map, Weight};
use crate::value::Outcome;
use crate::DEFAULT_ORDER;

#[derive(Clone, Debug, Builder)]
pub struct EngineConfig {
    /// Used when nothing involved in an evaluation asks for an order.
    #[builder(default = DEFAULT_ORDER)]
    pub default_order: Order,
    /// Skip branch combinations whose weight is zero.
    #[builder(default = true)]
    pub skip_zero_weights: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

type Distribution<S> = Arc<Map<S, Weight>>;
type Generators<T> = Vec<Option<Generator<T>>>;

struct Memo<T: Outcome, S> {
    states: Map<(S, Generators<T>), Distribution<S>>,
    generators: Map<Generator<T>, Generator<T>>,
}

impl<T: Outcome, S> Memo<T, S> {
    /// Returns the canonical instance of a generator so that its cached
    /// decompositions are shared.
    fn intern(&mut self, generator: Generator<T>) -> Generator<T> {
        self.generators
            .entry(generator.clone())
            .or_insert(generator)
            .clone()
    }
}

/// Runs an [`Evaluator`] over generators, memoizing every subproblem.
///
/// The cache lives as long as this value and is keyed by structural equality
/// of the remaining generators, so repeated evaluations over equal pools are
/// answered from it.
pub struct CachedEvaluator<T: Outcome, E: Evaluator<T>> {
    evaluator: E,
    config: EngineConfig,
    memo: Mutex<Memo<T, E::State>>,
    _outcome: PhantomData<fn(T)>,
}

impl<T: Outcome, E: Evaluator<T>> CachedEvaluator<T, E> {
    pub fn new(evaluator: E) -> Self {
        Self::with_config(evaluator, EngineConfig::default())
    }

    pub fn with_config(evaluator: E, config: EngineConfig) -> Self {
        Self {
            evaluator,
            config,
            memo: Mutex::new(Memo {
                states: Map::default(),
                generators: Map::default(),
            }),
            _outcome: PhantomData,
        }
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache_len(&self) -> usize {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner).states.len()
    }

    pub fn clear_cache(&self) {
        let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        memo.states.clear();
        memo.generators.clear();
    }

    pub fn resolve_order(&self, generators: &[Generator<T>]) -> Result<Order> {
        let order = Order::merge_all(
            std::iter::once(self.evaluator.order()).chain(generators.iter().map(Generator::order)),
        )?;
        Ok(match (order, self.config.default_order) {
            (Order::Any, Order::Any) => Order::Ascending,
            (Order::Any, default) => default,
            (order, _) => order,
        })
    }

    /// Distribution of the final outcome over all joint results of the
    /// generators. Yields an empty die when every result is rerolled.
    pub fn evaluate(&self, generators: &[Generator<T>]) -> Result<Die<E::Output>> {
        if let Some(expected) = self.evaluator.arity() {
            if expected != generators.len() {
                return Err(Error::GeneratorCount {
                    expected,
                    actual: generators.len(),
                });
            }
        }
        let mut all = generators.to_vec();
        all.extend(self.evaluator.bound_generators());
        let order = self.resolve_order(&all)?;
        let initial = self.evaluator.initial_state(&all);
        debug!(generators = all.len(), ?order, "evaluating");

        let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        let live = all
            .iter()
            .map(|g| g.max_outcome().map(|_| memo.intern(g.clone())))
            .collect();
        let distribution = self.eval(&mut memo, order, &initial, live)?;
        let memo_len = memo.states.len();
        drop(memo);

        let mut outcomes = BTreeMap::new();
        for (state, weight) in distribution.iter() {
            if self.evaluator.reroll_state(state) {
                continue;
            }
            if let Some(outcome) = self.evaluator.final_outcome(state, &all) {
                *outcomes.entry(outcome).or_insert_with(Weight::zero) += weight;
            }
        }
        debug!(
            states = distribution.len(),
            outcomes = outcomes.len(),
            memo = memo_len,
            "evaluation finished"
        );
        Ok(Die::from_map(outcomes))
    }

    /// Distribution of states after folding every outcome of `generators`
    /// into `initial`.
    fn eval(
        &self,
        memo: &mut Memo<T, E::State>,
        order: Order,
        initial: &E::State,
        generators: Generators<T>,
    ) -> Result<Distribution<E::State>> {
        let key = (initial.clone(), generators);
        if let Some(hit) = memo.states.get(&key) {
            return Ok(hit.clone());
        }
        let generators = &key.1;

        // Ascending observation means the fold pops from the top.
        let from_top = order != Order::Descending;
        let extreme = |g: &Generator<T>| {
            if from_top {
                g.max_outcome().cloned()
            } else {
                g.min_outcome().cloned()
            }
        };
        let live = generators.iter().flatten().filter_map(extreme);
        let outcome = if from_top { live.max() } else { live.min() };
        let Some(outcome) = outcome else {
            let mut base = Map::default();
            base.insert(initial.clone(), Weight::one());
            let base = Arc::new(base);
            memo.states.insert(key, base.clone());
            return Ok(base);
        };

        let mut branch_lists = Vec::with_capacity(generators.len());
        for generator in generators {
            let list: Vec<(Option<Generator<T>>, Option<i64>, Weight)> = match generator {
                Some(g) if extreme(g).as_ref() == Some(&outcome) => {
                    let branches = if from_top { g.pop_max()? } else { g.pop_min()? };
                    branches
                        .into_iter()
                        .map(|b| (b.rest.map(|r| memo.intern(r)), Some(b.count), b.weight))
                        .collect()
                }
                other => vec![(other.clone(), None, Weight::one())],
            };
            branch_lists.push(list);
        }
        trace!(
            ?outcome,
            branches = branch_lists.iter().map(Vec::len).product::<usize>(),
            "memo miss"
        );

        let mut result = Map::default();
        for combo in branch_lists.iter().map(|l| l.iter()).multi_cartesian_product() {
            let weight: Weight = combo.iter().map(|(_, _, w)| w).product();
            if self.config.skip_zero_weights && weight.is_zero() {
                continue;
            }
            let rest = combo.iter().map(|(g, _, _)| g.clone()).collect();
            let counts: Vec<Option<i64>> = combo.iter().map(|(_, c, _)| *c).collect();
            let previous = self.eval(memo, order, initial, rest)?;
            for (state, w) in previous.iter() {
                if self.evaluator.reroll_state(state) {
                    continue;
                }
                let next = self.evaluator.next_state(state, &outcome, &counts)?;
                *result.entry(next).or_insert_with(Weight::zero) += w * &weight;
            }
        }

        let result = Arc::new(result);
        memo.states.insert(key, result.clone());
        Ok(result)
    }
}

impl<T: Outcome, E: Evaluator<T> + fmt::Debug> fmt::Debug for CachedEvaluator<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedEvaluator")
            .field("evaluator", &self.evaluator)
            .field("config", &self.config)
            .field("cached", &self.cache_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{d4, d6};
    use crate::eval::{CountEvaluator, SumEvaluator};

    /// Sums like [`SumEvaluator`] but rerolls once the total reaches `limit`.
    #[derive(Debug)]
    struct RerollAtLeast {
        limit: i32,
    }

    impl Evaluator<i32> for RerollAtLeast {
        type State = i32;
        type Output = i32;

        fn initial_state(&self, _generators: &[Generator<i32>]) -> i32 {
            0
        }

        fn next_state(&self, state: &i32, outcome: &i32, counts: &[Option<i64>]) -> Result<i32> {
            let count = crate::eval::total_count(counts) as i32;
            Ok(state + outcome * count)
        }

        fn final_outcome(&self, state: &i32, _generators: &[Generator<i32>]) -> Option<i32> {
            Some(*state)
        }

        fn reroll_state(&self, state: &i32) -> bool {
            *state >= self.limit
        }
    }

    #[test]
    fn test_sum_of_two_dice() {
        let engine = CachedEvaluator::new(SumEvaluator);
        let die = engine.evaluate(&[d6().pool(2).into()]).unwrap();
        assert_eq!(die, d6() + d6());
    }

    #[test]
    fn test_multiple_generators() {
        let engine = CachedEvaluator::new(SumEvaluator);
        let die = engine.evaluate(&[d6().pool(1).into(), d4().pool(1).into()]).unwrap();
        assert_eq!(die, d6() + d4());
    }

    #[test]
    fn test_order_does_not_change_sums() {
        let descending = EngineConfig::builder().default_order(Order::Descending).build();
        let a = CachedEvaluator::with_config(SumEvaluator, descending)
            .evaluate(&[d6().pool(3).into()])
            .unwrap();
        let b = CachedEvaluator::new(SumEvaluator).evaluate(&[d6().pool(3).into()]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_weight_branches_kept_when_configured() {
        let die = Die::from_weights([(1, 1u32), (2, 0)]);
        let keep = EngineConfig::builder().skip_zero_weights(false).build();
        let result = CachedEvaluator::with_config(CountEvaluator, keep)
            .evaluate(&[die.pool(1).into()])
            .unwrap();
        assert_eq!(result.weight(&1), Weight::one());
    }

    #[test]
    fn test_cache_is_reused() {
        let engine = CachedEvaluator::new(SumEvaluator);
        engine.evaluate(&[d6().pool(3).into()]).unwrap();
        let size = engine.cache_len();
        engine.evaluate(&[Die::standard(6).pool(3).into()]).unwrap();
        assert_eq!(engine.cache_len(), size);
        engine.clear_cache();
        assert_eq!(engine.cache_len(), 0);
    }

    #[test]
    fn test_rerolled_states_are_dropped() {
        let engine = CachedEvaluator::new(RerollAtLeast { limit: 12 });
        let die = engine.evaluate(&[d6().pool(2).into()]).unwrap();
        let brute: Vec<(i32, Weight)> = d6()
            .apply_two(&d6(), |a, b| a + b)
            .iter()
            .filter(|(total, _)| **total < 12)
            .map(|(total, w)| (*total, w.clone()))
            .collect();
        assert_eq!(die, Die::from_weights(brute));
        assert_eq!(
            die,
            Die::from_weights((2..=11).zip([1u32, 2, 3, 4, 5, 6, 5, 4, 3, 2]))
        );
        assert_eq!(die.denominator(), &Weight::from(35u32));
    }

    #[test]
    fn test_rerolling_everything_gives_empty_die() {
        let engine = CachedEvaluator::new(RerollAtLeast { limit: 0 });
        let die = engine.evaluate(&[d6().pool(2).into()]).unwrap();
        assert!(die.is_empty());
    }

    #[test]
    fn test_arity_is_checked() {
        let engine = CachedEvaluator::new(crate::eval::ComparisonEvaluator::subset());
        assert_eq!(
            engine.evaluate(&[d6().pool(1).into()]).unwrap_err(),
            Error::GeneratorCount {
                expected: 2,
                actual: 1
            }
        );
    }
}
