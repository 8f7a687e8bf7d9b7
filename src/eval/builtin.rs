use num::{NumCast, ToPrimitive};

use super::{total_count, Evaluator};
use crate::error::{Error, Result};
use crate::generator::{Generator, Order};
use crate::value::{NumericOutcome, Outcome};

/// Sum of every outcome times its count.
#[derive(Clone, Copy, Debug, Default)]
pub struct SumEvaluator;

impl<T: NumericOutcome> Evaluator<T> for SumEvaluator {
    type State = T;
    type Output = T;

    fn initial_state(&self, _generators: &[Generator<T>]) -> T {
        T::zero()
    }

    fn next_state(&self, state: &T, outcome: &T, counts: &[Option<i64>]) -> Result<T> {
        let count = total_count(counts);
        if count == 0 {
            return Ok(*state);
        }
        let factor = <T as NumCast>::from(count).ok_or_else(|| Error::Overflow(count.to_string()))?;
        Ok(*state + *outcome * factor)
    }

    fn final_outcome(&self, state: &T, _generators: &[Generator<T>]) -> Option<T> {
        Some(*state)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CountEvaluator;

impl<T: Outcome> Evaluator<T> for CountEvaluator {
    type State = i64;
    type Output = i64;

    fn initial_state(&self, _generators: &[Generator<T>]) -> i64 {
        0
    }

    fn next_state(&self, state: &i64, _outcome: &T, counts: &[Option<i64>]) -> Result<i64> {
        Ok(state + total_count(counts))
    }

    fn final_outcome(&self, state: &i64, _generators: &[Generator<T>]) -> Option<i64> {
        Some(*state)
    }
}

/// The whole multiset as a sorted list of outcomes. Negative counts are
/// treated as zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExpandEvaluator;

impl<T: Outcome> Evaluator<T> for ExpandEvaluator {
    type State = Vec<T>;
    type Output = Vec<T>;

    fn initial_state(&self, _generators: &[Generator<T>]) -> Vec<T> {
        Vec::new()
    }

    fn next_state(&self, state: &Vec<T>, outcome: &T, counts: &[Option<i64>]) -> Result<Vec<T>> {
        let count = usize::try_from(total_count(counts)).unwrap_or(0);
        let mut next = state.clone();
        next.extend(std::iter::repeat(outcome.clone()).take(count));
        Ok(next)
    }

    fn final_outcome(&self, state: &Vec<T>, _generators: &[Generator<T>]) -> Option<Vec<T>> {
        let mut result = state.clone();
        result.sort();
        Some(result)
    }
}

/// The highest outcome with a positive count, and that count.
#[derive(Clone, Copy, Debug, Default)]
pub struct HighestOutcomeAndCountEvaluator;

impl<T: Outcome> Evaluator<T> for HighestOutcomeAndCountEvaluator {
    type State = Option<(T, i64)>;
    type Output = Option<(T, i64)>;

    fn initial_state(&self, _generators: &[Generator<T>]) -> Self::State {
        None
    }

    fn next_state(&self, state: &Self::State, outcome: &T, counts: &[Option<i64>]) -> Result<Self::State> {
        let count = total_count(counts);
        match state {
            Some((highest, _)) if highest >= outcome || count <= 0 => Ok(state.clone()),
            None if count <= 0 => Ok(None),
            _ => Ok(Some((outcome.clone(), count))),
        }
    }

    fn final_outcome(&self, state: &Self::State, _generators: &[Generator<T>]) -> Option<Self::Output> {
        Some(state.clone())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LargestCountEvaluator;

impl<T: Outcome> Evaluator<T> for LargestCountEvaluator {
    type State = i64;
    type Output = i64;

    fn initial_state(&self, _generators: &[Generator<T>]) -> i64 {
        0
    }

    fn next_state(&self, state: &i64, _outcome: &T, counts: &[Option<i64>]) -> Result<i64> {
        Ok((*state).max(total_count(counts)))
    }

    fn final_outcome(&self, state: &i64, _generators: &[Generator<T>]) -> Option<i64> {
        Some(*state)
    }
}

/// The best matching set: largest count, ties broken by the higher outcome.
#[derive(Clone, Copy, Debug, Default)]
pub struct LargestCountAndOutcomeEvaluator;

impl<T: Outcome> Evaluator<T> for LargestCountAndOutcomeEvaluator {
    type State = Option<(i64, T)>;
    type Output = Option<(i64, T)>;

    fn initial_state(&self, _generators: &[Generator<T>]) -> Self::State {
        None
    }

    fn next_state(&self, state: &Self::State, outcome: &T, counts: &[Option<i64>]) -> Result<Self::State> {
        let candidate = Some((total_count(counts), outcome.clone()));
        Ok(state.clone().max(candidate))
    }

    fn final_outcome(&self, state: &Self::State, _generators: &[Generator<T>]) -> Option<Self::Output> {
        Some(state.clone())
    }
}

/// Every count that reaches `min_count`, sorted from largest to smallest.
#[derive(Clone, Copy, Debug)]
pub struct AllCountsEvaluator {
    min_count: i64,
}

impl AllCountsEvaluator {
    pub fn new(min_count: i64) -> Self {
        Self { min_count }
    }
}

impl Default for AllCountsEvaluator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<T: Outcome> Evaluator<T> for AllCountsEvaluator {
    type State = Vec<i64>;
    type Output = Vec<i64>;

    fn initial_state(&self, _generators: &[Generator<T>]) -> Vec<i64> {
        Vec::new()
    }

    fn next_state(&self, state: &Vec<i64>, _outcome: &T, counts: &[Option<i64>]) -> Result<Vec<i64>> {
        let count = total_count(counts);
        if count < self.min_count {
            return Ok(state.clone());
        }
        let mut next = state.clone();
        let position = next.partition_point(|&c| c > count);
        next.insert(position, count);
        Ok(next)
    }

    fn final_outcome(&self, state: &Vec<i64>, _generators: &[Generator<T>]) -> Option<Vec<i64>> {
        Some(state.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StraightState<T> {
    best: (i64, Option<T>),
    run: i64,
    last: Option<i64>,
}

fn advance_straight<T: Outcome + ToPrimitive>(
    state: &StraightState<T>,
    outcome: &T,
    counts: &[Option<i64>],
) -> Result<StraightState<T>> {
    let value = outcome
        .to_i64()
        .ok_or_else(|| Error::Overflow(format!("{outcome:?}")))?;
    let run = match total_count(counts) {
        c if c <= 0 => 0,
        _ if state.run > 0 && state.last == value.checked_sub(1) => state.run + 1,
        _ => 1,
    };
    let best = match run {
        0 => state.best.clone(),
        _ => state.best.clone().max((run, Some(outcome.clone()))),
    };
    Ok(StraightState {
        best,
        run,
        last: Some(value),
    })
}

fn initial_straight<T>() -> StraightState<T> {
    StraightState {
        best: (0, None),
        run: 0,
        last: None,
    }
}

/// Length of the longest run of consecutive integer outcomes that all have a
/// positive count.
#[derive(Clone, Copy, Debug, Default)]
pub struct LargestStraightEvaluator;

impl<T: Outcome + ToPrimitive> Evaluator<T> for LargestStraightEvaluator {
    type State = StraightState<T>;
    type Output = i64;

    fn initial_state(&self, _generators: &[Generator<T>]) -> Self::State {
        initial_straight()
    }

    fn next_state(&self, state: &Self::State, outcome: &T, counts: &[Option<i64>]) -> Result<Self::State> {
        advance_straight(state, outcome, counts)
    }

    fn final_outcome(&self, state: &Self::State, _generators: &[Generator<T>]) -> Option<i64> {
        Some(state.best.0)
    }

    fn order(&self) -> Order {
        Order::Ascending
    }
}

/// Like [`LargestStraightEvaluator`], also reporting the top outcome of the
/// longest straight. Ties go to the higher straight.
#[derive(Clone, Copy, Debug, Default)]
pub struct LargestStraightAndOutcomeEvaluator;

impl<T: Outcome + ToPrimitive> Evaluator<T> for LargestStraightAndOutcomeEvaluator {
    type State = StraightState<T>;
    type Output = (i64, Option<T>);

    fn initial_state(&self, _generators: &[Generator<T>]) -> Self::State {
        initial_straight()
    }

    fn next_state(&self, state: &Self::State, outcome: &T, counts: &[Option<i64>]) -> Result<Self::State> {
        advance_straight(state, outcome, counts)
    }

    fn final_outcome(&self, state: &Self::State, _generators: &[Generator<T>]) -> Option<Self::Output> {
        Some(state.best.clone())
    }

    fn order(&self) -> Order {
        Order::Ascending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::d6;
    use crate::eval::CachedEvaluator;
    use crate::util::Weight;
    use crate::Die;

    #[test]
    fn test_count_is_pool_size() {
        let die = CachedEvaluator::new(CountEvaluator)
            .evaluate(&[d6().pool(4).into()])
            .unwrap();
        assert_eq!(die.outcomes(), &[4]);
    }

    #[test]
    fn test_largest_count_of_two_dice() {
        let die = CachedEvaluator::new(LargestCountEvaluator)
            .evaluate(&[d6().pool(2).into()])
            .unwrap();
        assert_eq!(die.weight(&2), Weight::from(6u32));
        assert_eq!(die.weight(&1), Weight::from(30u32));
    }

    #[test]
    fn test_highest_outcome_and_count() {
        let die = CachedEvaluator::new(HighestOutcomeAndCountEvaluator)
            .evaluate(&[Die::standard(2).pool(2).into()])
            .unwrap();
        assert_eq!(die.weight(&Some((2, 2))), Weight::from(1u32));
        assert_eq!(die.weight(&Some((2, 1))), Weight::from(2u32));
        assert_eq!(die.weight(&Some((1, 2))), Weight::from(1u32));
    }

    #[test]
    fn test_largest_straight_skips_gaps() {
        let die = Die::new([1, 2, 4]);
        let result = CachedEvaluator::new(LargestStraightEvaluator)
            .evaluate(&[die.pool(3).into()])
            .unwrap();
        // Any roll showing both a 1 and a 2.
        assert_eq!(result.weight(&2), Weight::from(12u32));
        assert_eq!(result.weight(&1), Weight::from(15u32));
        assert_eq!(result.max_outcome(), Some(&2));
    }

    #[test]
    fn test_all_counts_sorted_descending() {
        let die = CachedEvaluator::new(AllCountsEvaluator::default())
            .evaluate(&[Die::standard(3).pool(3).into()])
            .unwrap();
        assert_eq!(die.weight(&vec![3]), Weight::from(3u32));
        assert_eq!(die.weight(&vec![2, 1]), Weight::from(18u32));
        assert_eq!(die.weight(&vec![1, 1, 1]), Weight::from(6u32));
    }
}
