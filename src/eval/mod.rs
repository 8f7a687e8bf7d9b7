mod builtin;
mod compare;
mod engine;

use std::fmt::Debug;
use std::hash::Hash;

pub use builtin::{
    AllCountsEvaluator, CountEvaluator, ExpandEvaluator, HighestOutcomeAndCountEvaluator,
    LargestCountAndOutcomeEvaluator, LargestCountEvaluator, LargestStraightAndOutcomeEvaluator,
    LargestStraightEvaluator, SumEvaluator,
};
pub use compare::{Comparison, ComparisonEvaluator};
pub use engine::{CachedEvaluator, EngineConfig};

use crate::error::Result;
use crate::generator::{Generator, Order};
use crate::value::Outcome;

/// A fold over the outcomes of one or more generators.
///
/// The engine calls `next_state` once per outcome, in the order returned by
/// `order`, with one count per generator. A count of `None` means the outcome
/// does not occur in that generator at all, which is different from a count
/// of zero.
///
/// Evaluators must not carry mutable state of their own: results are cached
/// per [`CachedEvaluator`].
pub trait Evaluator<T: Outcome> {
    type State: Clone + Debug + Eq + Hash + Send + Sync;
    type Output: Outcome;

    fn initial_state(&self, generators: &[Generator<T>]) -> Self::State;

    fn next_state(
        &self,
        state: &Self::State,
        outcome: &T,
        counts: &[Option<i64>],
    ) -> Result<Self::State>;

    /// Maps a terminal state to an output outcome. `None` drops the state.
    fn final_outcome(&self, state: &Self::State, generators: &[Generator<T>]) -> Option<Self::Output>;

    /// States for which this returns `true` are discarded along with their
    /// weight, as if the whole roll were repeated.
    fn reroll_state(&self, _state: &Self::State) -> bool {
        false
    }

    fn order(&self) -> Order {
        Order::Any
    }

    /// Number of generators the caller has to supply, if fixed.
    fn arity(&self) -> Option<usize> {
        None
    }

    /// Generators appended after the caller's own.
    fn bound_generators(&self) -> Vec<Generator<T>> {
        Vec::new()
    }
}

/// Sum of the counts across generators, absent outcomes counting zero.
pub(crate) fn total_count(counts: &[Option<i64>]) -> i64 {
    counts.iter().flatten().sum()
}
