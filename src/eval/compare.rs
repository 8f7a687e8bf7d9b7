use super::Evaluator;
use crate::error::Result;
use crate::generator::Generator;
use crate::value::Outcome;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Comparison {
    Subset,
    ProperSubset,
    Superset,
    ProperSuperset,
    Equal,
    NotEqual,
    Disjoint,
}

impl Comparison {
    /// Whether one outcome's counts are compatible with the relation, and
    /// whether they make it strict.
    fn check(self, left: i64, right: i64) -> (bool, bool) {
        match self {
            Self::Subset | Self::ProperSubset => (left <= right, left < right),
            Self::Superset | Self::ProperSuperset => (left >= right, left > right),
            Self::Equal | Self::NotEqual => (left == right, false),
            Self::Disjoint => (left <= 0 || right <= 0, false),
        }
    }

    fn conclude(self, all_ok: bool, any_strict: bool) -> bool {
        match self {
            Self::Subset | Self::Superset | Self::Equal | Self::Disjoint => all_ok,
            Self::ProperSubset | Self::ProperSuperset => all_ok && any_strict,
            Self::NotEqual => !all_ok,
        }
    }
}

/// Compares exactly two multisets outcome by outcome.
#[derive(Clone, Copy, Debug)]
pub struct ComparisonEvaluator {
    comparison: Comparison,
}

impl ComparisonEvaluator {
    pub fn new(comparison: Comparison) -> Self {
        Self { comparison }
    }

    pub fn subset() -> Self {
        Self::new(Comparison::Subset)
    }

    pub fn superset() -> Self {
        Self::new(Comparison::Superset)
    }

    pub fn disjoint() -> Self {
        Self::new(Comparison::Disjoint)
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }
}

impl<T: Outcome> Evaluator<T> for ComparisonEvaluator {
    /// `(every outcome compatible, some outcome strict)`
    type State = (bool, bool);
    type Output = bool;

    fn initial_state(&self, _generators: &[Generator<T>]) -> Self::State {
        (true, false)
    }

    fn next_state(&self, state: &Self::State, _outcome: &T, counts: &[Option<i64>]) -> Result<Self::State> {
        let left = counts.first().copied().flatten().unwrap_or(0);
        let right = counts.get(1).copied().flatten().unwrap_or(0);
        let (ok, strict) = self.comparison.check(left, right);
        Ok((state.0 && ok, state.1 || strict))
    }

    fn final_outcome(&self, state: &Self::State, _generators: &[Generator<T>]) -> Option<bool> {
        Some(self.comparison.conclude(state.0, state.1))
    }

    fn arity(&self) -> Option<usize> {
        Some(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Deck;
    use crate::eval::CachedEvaluator;
    use crate::util::Weight;

    fn compare(comparison: Comparison, left: &[i32], right: &[i32]) -> bool {
        let left = Deck::new(left.iter().copied()).deal(left.len()).unwrap();
        let right = Deck::new(right.iter().copied()).deal(right.len()).unwrap();
        let die = CachedEvaluator::new(ComparisonEvaluator::new(comparison))
            .evaluate(&[left.into(), right.into()])
            .unwrap();
        assert_eq!(die.len(), 1);
        die.weight(&true) == Weight::from(1u32)
    }

    #[test]
    fn test_fixed_multisets() {
        assert!(compare(Comparison::Subset, &[1, 2], &[1, 2, 2]));
        assert!(compare(Comparison::ProperSubset, &[1, 2], &[1, 2, 2]));
        assert!(!compare(Comparison::ProperSubset, &[1, 2], &[1, 2]));
        assert!(compare(Comparison::Superset, &[1, 2, 3], &[3]));
        assert!(compare(Comparison::Equal, &[2, 1], &[1, 2]));
        assert!(compare(Comparison::NotEqual, &[1], &[1, 1]));
        assert!(compare(Comparison::Disjoint, &[1, 3], &[2, 4]));
        assert!(!compare(Comparison::Disjoint, &[1, 3], &[3]));
    }
}
