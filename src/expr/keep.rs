use super::{Expr, ExprState, MultisetExpression};
use crate::error::{Error, Result};
use crate::generator::{Generator, Order};
use crate::selector::Selector;
use crate::value::Outcome;

/// Keeps elements of a child expression by sorted position.
///
/// Positions are consumed in the order outcomes are observed: `counts` gives
/// how many times each position is kept, and every position past the end of
/// `counts` is kept `tail` times.
#[derive(Clone, Debug)]
pub struct Keep<T: Outcome> {
    child: Expr<T>,
    counts: Vec<i64>,
    tail: i64,
    order: Order,
}

/// Unsigned position count from a selector bound.
fn positions(n: isize) -> usize {
    n.unsigned_abs()
}

impl<T: Outcome> Keep<T> {
    pub fn new(child: Expr<T>, selector: &Selector) -> Result<Self> {
        let (own, counts, tail) = plan(selector)?;
        let order = own.merge(child.order())?;
        Ok(Self {
            child,
            counts,
            tail,
            order,
        })
    }
}

/// Translates a selector into `(order, counts, tail)` without knowing the
/// size of the multiset.
fn plan(selector: &Selector) -> Result<(Order, Vec<i64>, i64)> {
    use Order::{Ascending, Descending};

    let plan = match selector {
        Selector::Index(n) if *n >= 0 => {
            let mut counts = vec![0; positions(*n)];
            counts.push(1);
            (Ascending, counts, 0)
        }
        Selector::Index(n) => {
            let mut counts = vec![0; positions(*n) - 1];
            counts.push(1);
            (Descending, counts, 0)
        }
        Selector::Slice { start, stop } => match (*start, *stop) {
            (None, None) => (Ascending, Vec::new(), 1),
            (None, Some(b)) if b >= 0 => (Ascending, vec![1; positions(b)], 0),
            (None, Some(b)) => (Descending, vec![0; positions(b)], 1),
            (Some(a), None) if a >= 0 => (Ascending, vec![0; positions(a)], 1),
            (Some(a), None) => (Descending, vec![1; positions(a)], 0),
            (Some(a), Some(b)) if a >= 0 && b >= 0 => {
                let mut counts = vec![0; positions(a)];
                counts.extend(std::iter::repeat(1).take(positions(b).saturating_sub(positions(a))));
                (Ascending, counts, 0)
            }
            (Some(a), Some(b)) if a < 0 && b < 0 => {
                // Seen from the top, [-a, -b) becomes positions b..a.
                let mut counts = vec![0; positions(b)];
                counts.extend(std::iter::repeat(1).take(positions(a).saturating_sub(positions(b))));
                (Descending, counts, 0)
            }
            _ => {
                return Err(Error::InvalidSelector(
                    "slice bounds of mixed sign need a known size",
                ))
            }
        },
        Selector::Counts(_) => {
            return Err(Error::InvalidSelector(
                "explicit counts need an ellipsis when the size is unknown",
            ))
        }
        Selector::Padded { prefix, suffix } if suffix.is_empty() => (Ascending, prefix.clone(), 0),
        Selector::Padded { prefix, suffix } if prefix.is_empty() => {
            (Descending, suffix.iter().rev().copied().collect(), 0)
        }
        Selector::Padded { .. } => {
            return Err(Error::InvalidSelector(
                "counts on both ends need a known size",
            ))
        }
    };
    Ok(plan)
}

impl<T: Outcome> MultisetExpression<T> for Keep<T> {
    fn initial_state(&self) -> ExprState {
        ExprState::Keep {
            taken: 0,
            inner: Box::new(self.child.inner().initial_state()),
        }
    }

    fn next_state(&self, state: &ExprState, outcome: &T, bound: &[i64], free: &[i64]) -> Result<(ExprState, i64)> {
        let (taken, inner) = match state {
            ExprState::Keep { taken, inner } => (*taken, &**inner),
            other => (0, other),
        };
        let (inner, count) = self.child.inner().next_state(inner, outcome, bound, free)?;
        let count = usize::try_from(count).map_err(|_| Error::NegativeKeepCount(count))?;
        let end = taken + count;
        let within = end.min(self.counts.len());
        let explicit: i64 = self.counts.get(taken.min(within)..within).unwrap_or(&[]).iter().sum();
        let beyond = end - taken.max(within);
        let kept = explicit + self.tail * beyond as i64;
        let next = ExprState::Keep {
            // Past the end of the explicit counts only the tail matters.
            taken: within,
            inner: Box::new(inner),
        };
        Ok((next, kept))
    }

    fn order(&self) -> Order {
        self.order
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

#[cfg(test)]
mod tests {
    use super::*;

    fn run(selector: Selector, counts: &[i64]) -> Vec<i64> {
        let keep = Keep::new(Expr::<i32>::variable(0), &selector).unwrap();
        let mut state = keep.initial_state();
        let mut kept = Vec::new();
        for &c in counts {
            let (next, k) = keep.next_state(&state, &0, &[], &[c]).unwrap();
            state = next;
            kept.push(k);
        }
        kept
    }

    #[test]
    fn test_plans() {
        assert_eq!(plan(&Selector::Index(1)).unwrap(), (Order::Ascending, vec![0, 1], 0));
        assert_eq!(plan(&Selector::Index(-1)).unwrap(), (Order::Descending, vec![1], 0));
        assert_eq!(
            plan(&Selector::Slice {
                start: Some(-3),
                stop: Some(-1)
            })
            .unwrap(),
            (Order::Descending, vec![0, 1, 1], 0)
        );
        assert_eq!(plan(&Selector::highest(2)).unwrap(), (Order::Descending, vec![1, 1], 0));
        assert!(plan(&Selector::Counts(vec![1, 0])).is_err());
        assert!(plan(&Selector::Slice {
            start: Some(1),
            stop: Some(-1)
        })
        .is_err());
    }

    #[test]
    fn test_counts_consume_positions() {
        // Second and third lowest of the observed elements.
        let selector = Selector::Slice {
            start: Some(1),
            stop: Some(3),
        };
        assert_eq!(run(selector, &[1, 3, 2]), vec![0, 2, 0]);
    }

    #[test]
    fn test_tail_keeps_the_rest() {
        let selector = Selector::Slice {
            start: Some(2),
            stop: None,
        };
        assert_eq!(run(selector, &[1, 0, 3, 2]), vec![0, 0, 2, 2]);
    }

    #[test]
    fn test_negative_count_is_rejected() {
        let keep = Keep::new(Expr::<i32>::variable(0), &Selector::lowest(1)).unwrap();
        assert_eq!(
            keep.next_state(&keep.initial_state(), &0, &[], &[-1]).unwrap_err(),
            Error::NegativeKeepCount(-1)
        );
    }
}
