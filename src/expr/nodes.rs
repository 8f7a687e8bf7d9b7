use std::fmt;
use std::sync::Arc;

use num::Integer;

use super::{Children, Expr, ExprState, MultisetExpression};
use crate::error::Result;
use crate::generator::{Generator, Order};
use crate::value::Outcome;

/// A free variable, filled in with a generator when the expression is
/// evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Variable {
    index: usize,
}

impl Variable {
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T: Outcome> MultisetExpression<T> for Variable {
    fn initial_state(&self) -> ExprState {
        ExprState::Empty
    }

    fn next_state(&self, _state: &ExprState, _outcome: &T, _bound: &[i64], free: &[i64]) -> Result<(ExprState, i64)> {
        Ok((ExprState::Empty, free.get(self.index).copied().unwrap_or(0)))
    }

    fn order(&self) -> Order {
        Order::Any
    }

    fn bound_generators(&self) -> Vec<Generator<T>> {
        Vec::new()
    }

    fn bound_len(&self) -> usize {
        0
    }

    fn free_arity(&self) -> usize {
        self.index + 1
    }
}

/// A generator fixed into the expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BoundGenerator<T: Outcome>(Generator<T>);

impl<T: Outcome> BoundGenerator<T> {
    pub fn new(generator: Generator<T>) -> Self {
        Self(generator)
    }
}

impl<T: Outcome> MultisetExpression<T> for BoundGenerator<T> {
    fn initial_state(&self) -> ExprState {
        ExprState::Empty
    }

    fn next_state(&self, _state: &ExprState, _outcome: &T, bound: &[i64], _free: &[i64]) -> Result<(ExprState, i64)> {
        Ok((ExprState::Empty, bound.first().copied().unwrap_or(0)))
    }

    fn order(&self) -> Order {
        self.0.order()
    }

    fn bound_generators(&self) -> Vec<Generator<T>> {
        vec![self.0.clone()]
    }

    fn bound_len(&self) -> usize {
        1
    }

    fn free_arity(&self) -> usize {
        0
    }
}

macro_rules! impl_combine {
    ($(#[$doc:meta])* $name:ident, |$counts:ident| $combine:expr) => {
        $(#[$doc])*
        #[derive(Clone, Debug)]
        pub struct $name<T: Outcome>(Children<T>);

        impl<T: Outcome> $name<T> {
            pub fn new(exprs: Vec<Expr<T>>) -> Result<Self> {
                Ok(Self(Children::new(exprs)?))
            }
        }

        impl<T: Outcome> MultisetExpression<T> for $name<T> {
            fn initial_state(&self) -> ExprState {
                self.0.initial_state()
            }

            fn next_state(
                &self,
                state: &ExprState,
                outcome: &T,
                bound: &[i64],
                free: &[i64],
            ) -> Result<(ExprState, i64)> {
                let (next, $counts) = self.0.next_counts(state, outcome, bound, free)?;
                Ok((next, $combine))
            }

            fn order(&self) -> Order {
                self.0.order()
            }

            fn bound_generators(&self) -> Vec<Generator<T>> {
                self.0.bound_generators()
            }

            fn bound_len(&self) -> usize {
                self.0.bound_len()
            }

            fn free_arity(&self) -> usize {
                self.0.free_arity()
            }
        }
    };
}

impl_combine!(
    /// Largest count among the children.
    Union,
    |counts| counts.iter().copied().max().unwrap_or(0)
);
impl_combine!(
    /// Sum of the children's counts.
    DisjointUnion,
    |counts| counts.iter().sum()
);
impl_combine!(
    /// Smallest count among the children.
    Intersection,
    |counts| counts.iter().copied().min().unwrap_or(0)
);
impl_combine!(
    /// First count minus the rest, never below zero.
    Difference,
    |counts| match counts.split_first() {
        Some((first, rest)) => (first - rest.iter().sum::<i64>()).max(0),
        None => 0,
    }
);
impl_combine!(
    SymmetricDifference,
    |counts| match counts.as_slice() {
        [a, b] => (a - b).abs(),
        [a] => *a,
        _ => 0,
    }
);

macro_rules! impl_transform {
    ($(#[$doc:meta])* $name:ident, |$count:ident, $arg:ident| $transform:expr) => {
        $(#[$doc])*
        #[derive(Clone, Debug)]
        pub struct $name<T: Outcome> {
            child: Expr<T>,
            arg: i64,
        }

        impl<T: Outcome> $name<T> {
            pub fn new(child: Expr<T>, arg: i64) -> Self {
                Self { child, arg }
            }
        }

        impl<T: Outcome> MultisetExpression<T> for $name<T> {
            fn initial_state(&self) -> ExprState {
                self.child.inner().initial_state()
            }

            fn next_state(
                &self,
                state: &ExprState,
                outcome: &T,
                bound: &[i64],
                free: &[i64],
            ) -> Result<(ExprState, i64)> {
                let (next, $count) = self.child.inner().next_state(state, outcome, bound, free)?;
                let $arg = self.arg;
                Ok((next, $transform))
            }

            fn order(&self) -> Order {
                self.child.order()
            }

            fn bound_generators(&self) -> Vec<Generator<T>> {
                self.child.bound_generators()
            }

            fn bound_len(&self) -> usize {
                self.child.inner().bound_len()
            }

            fn free_arity(&self) -> usize {
                self.child.free_arity()
            }
        }
    };
}

impl_transform!(MultiplyCounts, |count, factor| count * factor);
impl_transform!(
    /// Divides counts by a nonzero divisor, rounding down.
    FloorDivCounts,
    |count, divisor| Integer::div_floor(&count, &divisor)
);
impl_transform!(
    /// Zeroes every count below the threshold.
    KeepCounts,
    |count, min_count| if count >= min_count { count } else { 0 }
);
impl_transform!(
    /// Caps counts at a maximum.
    Unique,
    |count, max_count| count.min(max_count)
);

type CountOp<T> = Arc<dyn Fn(&T, &[i64]) -> i64 + Send + Sync>;

/// Replaces the counts of several expressions by an arbitrary function of
/// the outcome and those counts.
#[derive(Clone)]
pub struct MapCounts<T: Outcome> {
    children: Children<T>,
    op: CountOp<T>,
}

impl<T: Outcome> MapCounts<T> {
    pub fn new<F>(exprs: Vec<Expr<T>>, op: F) -> Result<Self>
    where
        F: Fn(&T, &[i64]) -> i64 + Send + Sync + 'static,
    {
        Ok(Self {
            children: Children::new(exprs)?,
            op: Arc::new(op),
        })
    }
}

impl<T: Outcome> fmt::Debug for MapCounts<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MapCounts")
            .field(&self.children.len())
            .finish()
    }
}

impl<T: Outcome> MultisetExpression<T> for MapCounts<T> {
    fn initial_state(&self) -> ExprState {
        self.children.initial_state()
    }

    fn next_state(&self, state: &ExprState, outcome: &T, bound: &[i64], free: &[i64]) -> Result<(ExprState, i64)> {
        let (next, counts) = self.children.next_counts(state, outcome, bound, free)?;
        Ok((next, (self.op)(outcome, &counts)))
    }

    fn order(&self) -> Order {
        self.children.order()
    }

    fn bound_generators(&self) -> Vec<Generator<T>> {
        self.children.bound_generators()
    }

    fn bound_len(&self) -> usize {
        self.children.bound_len()
    }

    fn free_arity(&self) -> usize {
        self.children.free_arity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(expr: &dyn MultisetExpression<i32>, bound: &[i64], free: &[i64]) -> i64 {
        expr.next_state(&expr.initial_state(), &1, bound, free).unwrap().1
    }

    #[test]
    fn test_combinations_use_matching_bound_slices() {
        let a: Expr<i32> = Expr::variable(0);
        let b: Expr<i32> = Expr::variable(1);
        let union = Union::new(vec![a.clone(), b.clone()]).unwrap();
        assert_eq!(step(&union, &[], &[3, 5]), 5);
        let difference = Difference::new(vec![a.clone(), b.clone()]).unwrap();
        assert_eq!(step(&difference, &[], &[3, 5]), 0);
        assert_eq!(step(&difference, &[], &[5, 3]), 2);
        let symmetric = SymmetricDifference::new(vec![a, b]).unwrap();
        assert_eq!(step(&symmetric, &[], &[3, 5]), 2);
    }

    #[test]
    fn test_floor_division_rounds_down() {
        let expr = FloorDivCounts::new(Expr::<i32>::variable(0), 2);
        assert_eq!(step(&expr, &[], &[3]), 1);
        assert_eq!(step(&expr, &[], &[-3]), -2);
    }

    #[test]
    fn test_free_arity_is_highest_index() {
        let expr: Expr<i32> = Expr::variable(0).disjoint_union(Expr::variable(2)).unwrap();
        assert_eq!(expr.free_arity(), 3);
    }
}
