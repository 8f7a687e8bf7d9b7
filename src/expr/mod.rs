mod evaluator;
mod keep;
mod nodes;
mod overloading;

use std::fmt::Debug;

use dyn_clone::DynClone;
use num::ToPrimitive;

pub use evaluator::{Evaluation, ExpressionEvaluator};
pub use keep::Keep;
pub use nodes::{
    BoundGenerator, DisjointUnion, Difference, FloorDivCounts, Intersection, KeepCounts, MapCounts,
    MultiplyCounts, SymmetricDifference, Union, Unique, Variable,
};

use crate::deck::{Deal, Deck};
use crate::die::Die;
use crate::error::{Error, Result};
use crate::eval::{
    AllCountsEvaluator, Comparison, ComparisonEvaluator, CountEvaluator, Evaluator, ExpandEvaluator,
    HighestOutcomeAndCountEvaluator, LargestCountAndOutcomeEvaluator, LargestCountEvaluator,
    LargestStraightAndOutcomeEvaluator, LargestStraightEvaluator, SumEvaluator,
};
use crate::generator::{Generator, Order};
use crate::pool::Pool;
use crate::selector::Selector;
use crate::value::{NumericOutcome, Outcome};

/// Per-node state carried through the outcome fold.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExprState {
    Empty,
    Children(Vec<ExprState>),
    Keep { taken: usize, inner: Box<ExprState> },
}

/// A node that rewrites the count of each outcome before it reaches an
/// evaluator.
///
/// `bound` holds the counts of this node's own bound generators, in the
/// order of [`MultisetExpression::bound_generators`]; `free` holds the counts
/// of every free variable of the whole expression.
pub trait MultisetExpression<T: Outcome>: Debug + DynClone + Send + Sync {
    fn initial_state(&self) -> ExprState;

    fn next_state(
        &self,
        state: &ExprState,
        outcome: &T,
        bound: &[i64],
        free: &[i64],
    ) -> Result<(ExprState, i64)>;

    fn order(&self) -> Order;

    fn bound_generators(&self) -> Vec<Generator<T>>;

    fn bound_len(&self) -> usize;

    /// One past the highest variable index used.
    fn free_arity(&self) -> usize;
}

impl<T: Outcome> Clone for Box<dyn MultisetExpression<T>> {
    fn clone(&self) -> Self {
        dyn_clone::clone_box(&**self)
    }
}

/// An owned, type-erased expression tree.
#[derive(Clone, Debug)]
pub struct Expr<T: Outcome>(Box<dyn MultisetExpression<T>>);

/// Children of an n-ary node together with their bound-count offsets.
#[derive(Clone, Debug)]
pub(crate) struct Children<T: Outcome> {
    exprs: Vec<Expr<T>>,
    offsets: Vec<usize>,
    order: Order,
    free_arity: usize,
}

impl<T: Outcome> Children<T> {
    pub(crate) fn new(exprs: Vec<Expr<T>>) -> Result<Self> {
        let order = Order::merge_all(exprs.iter().map(Expr::order))?;
        let offsets = std::iter::once(0)
            .chain(exprs.iter().scan(0, |total, e| {
                *total += e.0.bound_len();
                Some(*total)
            }))
            .collect();
        let free_arity = exprs.iter().map(Expr::free_arity).max().unwrap_or(0);
        Ok(Self {
            exprs,
            offsets,
            order,
            free_arity,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.exprs.len()
    }

    pub(crate) fn order(&self) -> Order {
        self.order
    }

    pub(crate) fn free_arity(&self) -> usize {
        self.free_arity
    }

    pub(crate) fn bound_len(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    pub(crate) fn bound_generators(&self) -> Vec<Generator<T>> {
        self.exprs
            .iter()
            .flat_map(|e| e.0.bound_generators())
            .collect()
    }

    pub(crate) fn initial_state(&self) -> ExprState {
        ExprState::Children(self.exprs.iter().map(|e| e.0.initial_state()).collect())
    }

    /// Advances every child, returning the new states and one count per
    /// child.
    pub(crate) fn next_counts(
        &self,
        state: &ExprState,
        outcome: &T,
        bound: &[i64],
        free: &[i64],
    ) -> Result<(ExprState, Vec<i64>)> {
        let states = match state {
            ExprState::Children(states) => states.as_slice(),
            _ => &[],
        };
        let mut next = Vec::with_capacity(self.exprs.len());
        let mut counts = Vec::with_capacity(self.exprs.len());
        for (i, expr) in self.exprs.iter().enumerate() {
            let own = bound.get(self.offsets[i]..self.offsets[i + 1]).unwrap_or(&[]);
            let (s, c) = match states.get(i) {
                Some(s) => expr.0.next_state(s, outcome, own, free)?,
                None => expr.0.next_state(&expr.0.initial_state(), outcome, own, free)?,
            };
            next.push(s);
            counts.push(c);
        }
        Ok((ExprState::Children(next), counts))
    }
}

impl<T: Outcome> Expr<T> {
    pub fn new<E>(expression: E) -> Self
    where
        E: MultisetExpression<T> + 'static,
    {
        Self(Box::new(expression))
    }

    /// A placeholder to be filled in with a generator at evaluation time.
    pub fn variable(index: usize) -> Self {
        Self::new(Variable::new(index))
    }

    pub fn bound(generator: Generator<T>) -> Self {
        Self::new(BoundGenerator::new(generator))
    }

    pub fn fixed<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Deck::new(outcomes).deal_all().expr()
    }

    pub fn fixed_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (T, usize)>,
    {
        Deck::from_dups(counts).deal_all().expr()
    }

    pub fn order(&self) -> Order {
        self.0.order()
    }

    pub fn free_arity(&self) -> usize {
        self.0.free_arity()
    }

    pub fn bound_generators(&self) -> Vec<Generator<T>> {
        self.0.bound_generators()
    }

    pub(crate) fn inner(&self) -> &dyn MultisetExpression<T> {
        &*self.0
    }

    /// Count of each outcome is the larger of the two counts.
    pub fn union(self, other: impl Into<Self>) -> Result<Self> {
        Ok(Self::new(Union::new(vec![self, other.into()])?))
    }

    /// Count of each outcome is the sum of the two counts.
    pub fn disjoint_union(self, other: impl Into<Self>) -> Result<Self> {
        Ok(Self::new(DisjointUnion::new(vec![self, other.into()])?))
    }

    pub fn intersection(self, other: impl Into<Self>) -> Result<Self> {
        Ok(Self::new(Intersection::new(vec![self, other.into()])?))
    }

    /// Counts of `other` are subtracted, stopping at zero.
    pub fn difference(self, other: impl Into<Self>) -> Result<Self> {
        Ok(Self::new(Difference::new(vec![self, other.into()])?))
    }

    pub fn symmetric_difference(self, other: impl Into<Self>) -> Result<Self> {
        Ok(Self::new(SymmetricDifference::new(vec![self, other.into()])?))
    }

    #[must_use]
    pub fn multiply_counts(self, factor: i64) -> Self {
        Self::new(MultiplyCounts::new(self, factor))
    }

    /// Counts are divided by `divisor`, rounding towards negative infinity.
    pub fn floor_div_counts(self, divisor: i64) -> Result<Self> {
        if divisor == 0 {
            return Err(Error::ZeroDivisor);
        }
        Ok(Self::new(FloorDivCounts::new(self, divisor)))
    }

    /// Counts below `min_count` become zero.
    #[must_use]
    pub fn keep_counts(self, min_count: i64) -> Self {
        Self::new(KeepCounts::new(self, min_count))
    }

    #[must_use]
    pub fn unique(self) -> Self {
        self.unique_max(1)
    }

    /// Every count is capped at `max_count`.
    #[must_use]
    pub fn unique_max(self, max_count: i64) -> Self {
        Self::new(Unique::new(self, max_count))
    }

    /// Keeps the sorted elements picked by `selector`.
    ///
    /// Since the size of an expression is not known up front, explicit count
    /// lists need an ellipsis on one side and slices may not mix positive and
    /// negative bounds.
    pub fn keep(self, selector: Selector) -> Result<Self> {
        if selector == Selector::all() {
            return Ok(self);
        }
        Ok(Self::new(Keep::new(self, &selector)?))
    }

    pub fn keep_highest(self, n: usize) -> Result<Self> {
        self.keep(Selector::highest(n))
    }

    pub fn keep_lowest(self, n: usize) -> Result<Self> {
        self.keep(Selector::lowest(n))
    }

    /// Replaces the counts of `self` and `others` by `op(outcome, counts)`.
    pub fn map_counts<F>(self, others: Vec<Self>, op: F) -> Result<Self>
    where
        F: Fn(&T, &[i64]) -> i64 + Send + Sync + 'static,
    {
        let mut exprs = vec![self];
        exprs.extend(others);
        Ok(Self::new(MapCounts::new(exprs, op)?))
    }

    pub fn evaluate<E: Evaluator<T>>(self, evaluator: E) -> Result<Evaluation<T, E>> {
        Self::evaluate_all(vec![self], evaluator)
    }

    /// Attaches an evaluator taking one count per expression. The result is a
    /// die when every expression is fully bound, otherwise a reusable
    /// evaluator over the free variables.
    pub fn evaluate_all<E: Evaluator<T>>(exprs: Vec<Self>, evaluator: E) -> Result<Evaluation<T, E>> {
        ExpressionEvaluator::new(exprs, evaluator)?.into_evaluation()
    }

    fn evaluate_die<E: Evaluator<T>>(self, evaluator: E) -> Result<Die<E::Output>> {
        self.evaluate(evaluator)?.into_die()
    }

    pub fn expand(self) -> Result<Die<Vec<T>>> {
        self.evaluate_die(ExpandEvaluator)
    }

    pub fn count(self) -> Result<Die<i64>> {
        self.evaluate_die(CountEvaluator)
    }

    pub fn highest_outcome_and_count(self) -> Result<Die<Option<(T, i64)>>> {
        self.evaluate_die(HighestOutcomeAndCountEvaluator)
    }

    pub fn largest_count(self) -> Result<Die<i64>> {
        self.evaluate_die(LargestCountEvaluator)
    }

    pub fn largest_count_and_outcome(self) -> Result<Die<Option<(i64, T)>>> {
        self.evaluate_die(LargestCountAndOutcomeEvaluator)
    }

    pub fn all_counts(self, min_count: i64) -> Result<Die<Vec<i64>>> {
        self.evaluate_die(AllCountsEvaluator::new(min_count))
    }

    pub fn compare(self, other: impl Into<Self>, comparison: Comparison) -> Result<Die<bool>> {
        Self::evaluate_all(vec![self, other.into()], ComparisonEvaluator::new(comparison))?.into_die()
    }

    pub fn issubset(self, other: impl Into<Self>) -> Result<Die<bool>> {
        self.compare(other, Comparison::Subset)
    }

    pub fn issuperset(self, other: impl Into<Self>) -> Result<Die<bool>> {
        self.compare(other, Comparison::Superset)
    }

    pub fn isdisjoint(self, other: impl Into<Self>) -> Result<Die<bool>> {
        self.compare(other, Comparison::Disjoint)
    }
}

impl<T: NumericOutcome> Expr<T> {
    pub fn sum(self) -> Result<Die<T>> {
        self.evaluate_die(SumEvaluator)
    }
}

impl<T: Outcome + ToPrimitive> Expr<T> {
    pub fn largest_straight(self) -> Result<Die<i64>> {
        self.evaluate_die(LargestStraightEvaluator)
    }

    pub fn largest_straight_and_outcome(self) -> Result<Die<(i64, Option<T>)>> {
        self.evaluate_die(LargestStraightAndOutcomeEvaluator)
    }
}

impl<T: Outcome> From<Generator<T>> for Expr<T> {
    fn from(generator: Generator<T>) -> Self {
        Self::bound(generator)
    }
}

impl<T: Outcome> From<Pool<T>> for Expr<T> {
    fn from(pool: Pool<T>) -> Self {
        pool.expr()
    }
}

impl<T: Outcome> From<Deal<T>> for Expr<T> {
    fn from(deal: Deal<T>) -> Self {
        deal.expr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::d6;
    use crate::util::Weight;

    fn expanded(expr: Result<Expr<i32>>) -> Vec<i32> {
        let die = expr.unwrap().expand().unwrap();
        assert_eq!(die.len(), 1);
        die.outcomes()[0].clone()
    }

    #[test]
    fn test_fixed_multiset() {
        assert_eq!(expanded(Ok(Expr::fixed([3, 1, 2, 2]))), vec![1, 2, 2, 3]);
        assert_eq!(
            expanded(Ok(Expr::fixed_counts([(5, 2), (1, 1)]))),
            vec![1, 5, 5]
        );
    }

    #[test]
    fn test_negative_counts_clamp_in_expand() {
        let expr = Expr::fixed([1, 2]).multiply_counts(-1);
        assert_eq!(expanded(Ok(expr)), Vec::<i32>::new());
    }

    #[test]
    fn test_zero_divisor() {
        assert_eq!(
            Expr::fixed([1]).floor_div_counts(0).unwrap_err(),
            Error::ZeroDivisor
        );
    }

    #[test]
    fn test_unique_caps_counts() {
        assert_eq!(expanded(Ok(Expr::fixed([1, 2, 2, 2, 3]).unique())), vec![1, 2, 3]);
        assert_eq!(
            expanded(Ok(Expr::fixed([1, 2, 2, 2, 3]).unique_max(2))),
            vec![1, 2, 2, 3]
        );
    }

    #[test]
    fn test_map_counts() {
        let a = Expr::fixed([1, 2, 2]);
        let b = Expr::fixed([2, 3]);
        let expr = a.map_counts(vec![b], |outcome, counts| {
            if *outcome == 2 {
                counts.iter().product()
            } else {
                0
            }
        });
        assert_eq!(expanded(expr), vec![2, 2]);
    }

    #[test]
    fn test_pool_count_and_sum() {
        let expr = d6().pool(3).expr();
        assert_eq!(expr.clone().count().unwrap().outcomes(), &[3]);
        assert_eq!(expr.sum().unwrap(), d6().pool(3).sum().unwrap());
    }

    #[test]
    fn test_largest_count_and_outcome_of_fixed() {
        let die = Expr::fixed([4, 4, 1, 1, 2]).largest_count_and_outcome().unwrap();
        assert_eq!(die.outcomes(), &[Some((2, 4))]);
        assert_eq!(die.weight(&Some((2, 4))), Weight::from(1u32));
    }
}
