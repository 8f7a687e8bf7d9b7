use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bon::bon;
use num::traits::Zero;
use once_cell::sync::OnceCell;

use crate::die::Die;
use crate::error::{Error, Result};
use crate::eval::{CachedEvaluator, SumEvaluator};
use crate::expr::Expr;
use crate::generator::{Generator, Order, PopBranch};
use crate::selector::Selector;
use crate::util::{comb_row, pow, structural_hash, Weight};
use crate::value::{NumericOutcome, Outcome};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Caps<T> {
    None,
    Min(Vec<T>),
    Max(Vec<T>),
}

#[derive(Debug)]
struct PoolInner<T: Outcome> {
    die: Die<T>,
    count_dice: Vec<i64>,
    caps: Caps<T>,
    hash: u64,
    pop_min: OnceCell<Vec<PopBranch<Pool<T>>>>,
    pop_max: OnceCell<Vec<PopBranch<Pool<T>>>>,
}

/// Dice of one kind rolled together, with a count for each sorted position.
///
/// Each position may additionally be capped: with `max_outcomes`, the die
/// at the `i`-th lowest position never rolls above the `i`-th cap. Caps only
/// ever apply on one side.
#[derive(Clone, Debug)]
pub struct Pool<T: Outcome>(Arc<PoolInner<T>>);

#[bon]
impl<T: Outcome> Pool<T> {
    #[builder]
    pub fn new(
        die: Die<T>,
        num_dice: Option<usize>,
        count_dice: Option<Selector>,
        min_outcomes: Option<Vec<T>>,
        max_outcomes: Option<Vec<T>>,
    ) -> Result<Self> {
        if min_outcomes.is_some() && max_outcomes.is_some() {
            return Err(Error::ConflictingCaps);
        }
        let mut size = num_dice;
        if let Some(n) = count_dice.as_ref().and_then(Selector::fixed_len) {
            agree(&mut size, n)?;
        }
        if let Some(caps) = min_outcomes.as_ref().or(max_outcomes.as_ref()) {
            agree(&mut size, caps.len())?;
        }
        let size = size.ok_or(Error::InvalidSelector("the number of dice is not determined"))?;
        let counts = count_dice.unwrap_or_else(Selector::all).counts(size)?;
        let caps = normalize_caps(&die, min_outcomes, max_outcomes);
        Ok(Self::from_parts(die, counts, caps))
    }
}

fn agree(size: &mut Option<usize>, n: usize) -> Result<()> {
    match *size {
        Some(s) if s != n => Err(Error::ConflictingPoolSize(s, n)),
        _ => {
            *size = Some(n);
            Ok(())
        }
    }
}

/// Drops caps that cannot bind and clips the rest to the die's range.
fn normalize_caps<T: Outcome>(die: &Die<T>, min: Option<Vec<T>>, max: Option<Vec<T>>) -> Caps<T> {
    let (Some(lo), Some(hi)) = (die.min_outcome(), die.max_outcome()) else {
        return Caps::None;
    };
    if let Some(mut caps) = min {
        if caps.iter().max().is_some_and(|m| m > lo) {
            caps.iter_mut().filter(|c| **c < *lo).for_each(|c| *c = lo.clone());
            caps.sort();
            return Caps::Min(caps);
        }
    }
    if let Some(mut caps) = max {
        if caps.iter().min().is_some_and(|m| m < hi) {
            caps.iter_mut().filter(|c| **c > *hi).for_each(|c| *c = hi.clone());
            caps.sort();
            return Caps::Max(caps);
        }
    }
    Caps::None
}

impl<T: Outcome> Pool<T> {
    fn from_parts(die: Die<T>, count_dice: Vec<i64>, caps: Caps<T>) -> Self {
        let hash = structural_hash(&(&die, &count_dice, &caps));
        Self(Arc::new(PoolInner {
            die,
            count_dice,
            caps,
            hash,
            pop_min: OnceCell::new(),
            pop_max: OnceCell::new(),
        }))
    }

    pub fn die(&self) -> &Die<T> {
        &self.0.die
    }

    /// Number of dice in the pool.
    pub fn size(&self) -> usize {
        self.0.count_dice.len()
    }

    pub fn count_dice(&self) -> &[i64] {
        &self.0.count_dice
    }

    pub fn min_outcomes(&self) -> Option<&[T]> {
        match &self.0.caps {
            Caps::Min(caps) => Some(caps),
            _ => None,
        }
    }

    pub fn max_outcomes(&self) -> Option<&[T]> {
        match &self.0.caps {
            Caps::Max(caps) => Some(caps),
            _ => None,
        }
    }

    pub fn order(&self) -> Order {
        match self.0.caps {
            Caps::None => Order::Any,
            Caps::Min(_) => Order::Descending,
            Caps::Max(_) => Order::Ascending,
        }
    }

    pub fn denominator(&self) -> Weight {
        let die = &self.0.die;
        match &self.0.caps {
            Caps::None => pow(die.denominator(), self.size()),
            Caps::Min(caps) => caps.iter().map(|c| die.weight_ge(c)).product(),
            Caps::Max(caps) => caps.iter().map(|c| die.weight_le(c)).product(),
        }
    }

    /// Replaces the count of every sorted position.
    ///
    /// An explicit count list may change the number of dice, unless the
    /// pool has outcome caps.
    pub fn select(&self, selector: Selector) -> Result<Self> {
        let size = match selector.fixed_len() {
            Some(n) if n != self.size() && self.0.caps != Caps::None => {
                return Err(Error::ResizeWithCaps);
            }
            Some(n) => n,
            None => self.size(),
        };
        let counts = selector.counts(size)?;
        Ok(Self::from_parts(self.0.die.clone(), counts, self.0.caps.clone()))
    }

    pub fn expr(&self) -> Expr<T> {
        Expr::bound(Generator::Pool(self.clone()))
    }

    /// Branches over how many dice roll the highest outcome.
    pub fn pop_max(&self) -> Result<&[PopBranch<Self>]> {
        if let Caps::Min(_) = self.0.caps {
            return Err(Error::PopDirection("max"));
        }
        Ok(self.0.pop_max.get_or_init(|| self.compute_pop_max()))
    }

    /// Branches over how many dice roll the lowest outcome.
    pub fn pop_min(&self) -> Result<&[PopBranch<Self>]> {
        if let Caps::Max(_) = self.0.caps {
            return Err(Error::PopDirection("min"));
        }
        Ok(self.0.pop_min.get_or_init(|| self.compute_pop_min()))
    }

    fn compute_pop_max(&self) -> Vec<PopBranch<Self>> {
        let inner = &*self.0;
        let Some((rest, outcome, weight)) = inner.die.pop_max() else {
            return Vec::new();
        };
        let n = self.size();
        let caps: &[T] = self.max_outcomes().unwrap_or(&[]);
        // Positions capped below the popped outcome sit at the low end.
        let unused = caps.partition_point(|c| c < &outcome);
        let num_possible = n - unused;

        let rest = match rest {
            Some(rest) if !rest.denominator().is_zero() => rest,
            rest => return vec![self.all_roll(rest, &weight, unused == 0)],
        };
        if inner.count_dice.iter().all(|&c| c == 0) {
            let weight = if caps.is_empty() {
                pow(inner.die.denominator(), n)
            } else {
                caps.iter().map(|c| inner.die.weight_le(c)).product()
            };
            return vec![PopBranch {
                rest: Some(Self::from_parts(rest, Vec::new(), Caps::None)),
                count: 0,
                weight,
            }];
        }

        let row = comb_row(num_possible, &weight);
        let mut branches = Vec::with_capacity(num_possible + 1);
        let mut count = 0;
        for (k, branch_weight) in row.into_iter().enumerate() {
            if k > 0 {
                if weight.is_zero() {
                    break;
                }
                count += inner.count_dice[n - k];
            }
            let rest_caps = match (unused, rest.max_outcome()) {
                (0, _) | (_, None) => Caps::None,
                (_, Some(top)) => {
                    let mut next = caps[..unused].to_vec();
                    next.extend(std::iter::repeat(top.clone()).take(num_possible - k));
                    Caps::Max(next)
                }
            };
            branches.push(PopBranch {
                rest: Some(Self::from_parts(
                    rest.clone(),
                    inner.count_dice[..n - k].to_vec(),
                    rest_caps,
                )),
                count,
                weight: branch_weight,
            });
        }
        branches
    }

    fn compute_pop_min(&self) -> Vec<PopBranch<Self>> {
        let inner = &*self.0;
        let Some((rest, outcome, weight)) = inner.die.pop_min() else {
            return Vec::new();
        };
        let n = self.size();
        let caps: Option<&[T]> = self.min_outcomes();
        // Positions capped above the popped outcome sit at the high end.
        let num_possible = caps.map_or(n, |caps| caps.partition_point(|c| c <= &outcome));
        let unused = n - num_possible;

        let rest = match rest {
            Some(rest) if !rest.denominator().is_zero() => rest,
            rest => return vec![self.all_roll(rest, &weight, unused == 0)],
        };
        if inner.count_dice.iter().all(|&c| c == 0) {
            let weight = match caps {
                None => pow(inner.die.denominator(), n),
                Some(caps) => caps.iter().map(|c| inner.die.weight_ge(c)).product(),
            };
            return vec![PopBranch {
                rest: Some(Self::from_parts(rest, Vec::new(), Caps::None)),
                count: 0,
                weight,
            }];
        }

        let row = comb_row(num_possible, &weight);
        let mut branches = Vec::with_capacity(num_possible + 1);
        let mut count = 0;
        for (k, branch_weight) in row.into_iter().enumerate() {
            if k > 0 {
                if weight.is_zero() {
                    break;
                }
                count += inner.count_dice[k - 1];
            }
            let rest_caps = match (caps, rest.min_outcome()) {
                (Some(caps), Some(bottom)) if unused > 0 => {
                    let mut next = vec![bottom.clone(); num_possible - k];
                    next.extend_from_slice(&caps[num_possible..]);
                    Caps::Min(next)
                }
                _ => Caps::None,
            };
            branches.push(PopBranch {
                rest: Some(Self::from_parts(rest.clone(), inner.count_dice[k..].to_vec(), rest_caps)),
                count,
                weight: branch_weight,
            });
        }
        branches
    }

    /// Every remaining die has to roll the popped outcome.
    fn all_roll(&self, rest: Option<Die<T>>, weight: &Weight, feasible: bool) -> PopBranch<Self> {
        let weight = if feasible { pow(weight, self.size()) } else { Weight::zero() };
        PopBranch {
            rest: rest.map(|r| Self::from_parts(r, Vec::new(), Caps::None)),
            count: self.0.count_dice.iter().sum(),
            weight,
        }
    }
}

impl<T: NumericOutcome> Pool<T> {
    /// Distribution of the sum of the counted dice.
    pub fn sum(&self) -> Result<Die<T>> {
        CachedEvaluator::new(SumEvaluator).evaluate(&[Generator::Pool(self.clone())])
    }
}

impl<T: Outcome> PartialEq for Pool<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.hash == other.0.hash
                && self.0.count_dice == other.0.count_dice
                && self.0.caps == other.0.caps
                && self.0.die == other.0.die)
    }
}

impl<T: Outcome> Eq for Pool<T> {}

impl<T: Outcome> Hash for Pool<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl<T: Outcome> Die<T> {
    /// A pool of `num_dice` copies of this die, each counted once.
    pub fn pool(&self, num_dice: usize) -> Pool<T> {
        Pool::from_parts(self.clone(), vec![1; num_dice], Caps::None)
    }
}

impl<T: NumericOutcome> Die<T> {
    /// Rolls `num_dice` of this die and sums the positions picked by
    /// `selector`.
    pub fn keep(&self, num_dice: usize, selector: Selector) -> Result<Die<T>> {
        self.pool(num_dice).select(selector)?.sum()
    }

    /// Sums the `keep` highest of `num_dice` dice after discarding the `drop`
    /// highest.
    pub fn keep_highest(&self, num_dice: usize, keep: usize, drop: usize) -> Result<Die<T>> {
        let counts = (0..num_dice)
            .map(|i| {
                let from_top = num_dice - 1 - i;
                i64::from(from_top >= drop && from_top < drop + keep)
            })
            .collect();
        self.keep(num_dice, Selector::Counts(counts))
    }

    /// Sums the `keep` lowest of `num_dice` dice after discarding the `drop`
    /// lowest.
    pub fn keep_lowest(&self, num_dice: usize, keep: usize, drop: usize) -> Result<Die<T>> {
        let counts = (0..num_dice)
            .map(|i| i64::from(i >= drop && i < drop + keep))
            .collect();
        self.keep(num_dice, Selector::Counts(counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{d4, d6};

    fn branch_mass(branches: &[PopBranch<Pool<i32>>]) -> Weight {
        branches
            .iter()
            .map(|b| match &b.rest {
                Some(rest) => &b.weight * rest.denominator(),
                None => b.weight.clone(),
            })
            .sum()
    }

    #[test]
    fn test_pop_max_conserves_mass() {
        let pool = d6().pool(3);
        let branches = pool.pop_max().unwrap();
        assert_eq!(branches.len(), 4);
        assert_eq!(branch_mass(branches), pool.denominator());
    }

    #[test]
    fn test_pop_min_conserves_mass() {
        let pool = d4().pool(4);
        let branches = pool.pop_min().unwrap();
        assert_eq!(branch_mass(branches), pool.denominator());
    }

    #[test]
    fn test_pop_max_counts_from_the_top() {
        let pool = d6().pool(3).select(Selector::Counts(vec![0, 1, 5])).unwrap();
        let counts: Vec<i64> = pool.pop_max().unwrap().iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![0, 5, 6, 6]);
    }

    #[test]
    fn test_pop_min_counts_from_the_bottom() {
        let pool = d6().pool(3).select(Selector::Counts(vec![2, 1, 0])).unwrap();
        let counts: Vec<i64> = pool.pop_min().unwrap().iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![0, 2, 3, 3]);
    }

    #[test]
    fn test_unselected_pool_collapses() {
        let pool = d6().pool(2).select(Selector::Counts(vec![0, 0])).unwrap();
        let branches = pool.pop_max().unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].weight, Weight::from(36u32));
        assert_eq!(branches[0].rest.as_ref().map(Pool::size), Some(0));
    }

    #[test]
    fn test_max_caps_conserve_mass() {
        let pool = Pool::builder()
            .die(d6())
            .max_outcomes(vec![6, 3])
            .build()
            .unwrap();
        assert_eq!(pool.max_outcomes(), Some(&[3, 6][..]));
        assert_eq!(pool.denominator(), Weight::from(18u32));
        let branches = pool.pop_max().unwrap();
        // Only the uncapped die can roll a six.
        assert_eq!(branches.len(), 2);
        assert_eq!(branch_mass(branches), pool.denominator());
        assert_eq!(pool.pop_min().unwrap_err(), Error::PopDirection("min"));
    }

    #[test]
    fn test_builder_errors() {
        let both = Pool::builder()
            .die(d6())
            .min_outcomes(vec![2])
            .max_outcomes(vec![5])
            .build();
        assert_eq!(both.unwrap_err(), Error::ConflictingCaps);

        let conflict = Pool::builder()
            .die(d6())
            .num_dice(3)
            .count_dice(Selector::Counts(vec![1, 1]))
            .build();
        assert_eq!(conflict.unwrap_err(), Error::ConflictingPoolSize(3, 2));
    }

    #[test]
    fn test_caps_that_cannot_bind_are_dropped() {
        let pool = Pool::builder()
            .die(d6())
            .max_outcomes(vec![6, 8])
            .build()
            .unwrap();
        assert_eq!(pool.max_outcomes(), None);
        assert_eq!(pool.order(), Order::Any);
        assert_eq!(pool, d6().pool(2));
    }

    #[test]
    fn test_resize_with_caps() {
        let pool = Pool::builder()
            .die(d6())
            .min_outcomes(vec![2, 4])
            .build()
            .unwrap();
        assert_eq!(
            pool.select(Selector::Counts(vec![1, 1, 1])).unwrap_err(),
            Error::ResizeWithCaps
        );
        assert_eq!(d6().pool(2).select(Selector::Counts(vec![1, 1, 1])).unwrap().size(), 3);
    }

    #[test]
    fn test_structurally_equal_pools() {
        let a = d6().pool(3);
        let b = Die::standard(6).pool(3);
        assert_eq!(a, b);
        assert_eq!(structural_hash(&a), structural_hash(&b));
        assert_ne!(a, d6().pool(2));
    }
}
