use crate::deck::Deal;
use crate::error::{Error, Result};
use crate::pool::Pool;
use crate::util::Weight;
use crate::value::Outcome;

/// The sequence in which an evaluator observes outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Order {
    Ascending,
    Descending,
    #[default]
    Any,
}

impl Order {
    pub fn merge(self, other: Self) -> Result<Self> {
        match (self, other) {
            (Self::Any, order) | (order, Self::Any) => Ok(order),
            (a, b) if a == b => Ok(a),
            (a, b) => Err(Error::ConflictingOrder(a, b)),
        }
    }

    pub fn merge_all<I>(orders: I) -> Result<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        orders.into_iter().try_fold(Self::Any, Self::merge)
    }
}

/// One way the extreme outcome of a generator can be drawn.
#[derive(Clone, Debug)]
pub struct PopBranch<G> {
    /// What is left afterwards, `None` once no outcomes remain.
    pub rest: Option<G>,
    /// Count contributed by the popped outcome.
    pub count: i64,
    pub weight: Weight,
}

impl<G> PopBranch<G> {
    pub fn map<H, F>(&self, op: F) -> PopBranch<H>
    where
        F: Fn(&G) -> H,
    {
        PopBranch {
            rest: self.rest.as_ref().map(op),
            count: self.count,
            weight: self.weight.clone(),
        }
    }
}

/// A source of multisets that can be decomposed one outcome at a time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Generator<T: Outcome> {
    Pool(Pool<T>),
    Deal(Deal<T>),
}

impl<T: Outcome> Generator<T> {
    pub fn min_outcome(&self) -> Option<&T> {
        match self {
            Self::Pool(pool) => pool.die().min_outcome(),
            Self::Deal(deal) => deal.deck().min_outcome(),
        }
    }

    pub fn max_outcome(&self) -> Option<&T> {
        match self {
            Self::Pool(pool) => pool.die().max_outcome(),
            Self::Deal(deal) => deal.deck().max_outcome(),
        }
    }

    /// Order forced by the way this generator can be decomposed.
    pub fn order(&self) -> Order {
        match self {
            Self::Pool(pool) => pool.order(),
            Self::Deal(_) => Order::Any,
        }
    }

    /// Total weight of all multisets this generator can produce.
    pub fn denominator(&self) -> Weight {
        match self {
            Self::Pool(pool) => pool.denominator(),
            Self::Deal(deal) => deal.denominator(),
        }
    }

    pub fn pop_min(&self) -> Result<Vec<PopBranch<Self>>> {
        match self {
            Self::Pool(pool) => Ok(pool.pop_min()?.iter().map(|b| b.map(|p| Self::Pool(p.clone()))).collect()),
            Self::Deal(deal) => Ok(deal.pop_min()?.iter().map(|b| b.map(|d| Self::Deal(d.clone()))).collect()),
        }
    }

    pub fn pop_max(&self) -> Result<Vec<PopBranch<Self>>> {
        match self {
            Self::Pool(pool) => Ok(pool.pop_max()?.iter().map(|b| b.map(|p| Self::Pool(p.clone()))).collect()),
            Self::Deal(deal) => Ok(deal.pop_max()?.iter().map(|b| b.map(|d| Self::Deal(d.clone()))).collect()),
        }
    }
}

impl<T: Outcome> From<Pool<T>> for Generator<T> {
    fn from(pool: Pool<T>) -> Self {
        Self::Pool(pool)
    }
}

impl<T: Outcome> From<Deal<T>> for Generator<T> {
    fn from(deal: Deal<T>) -> Self {
        Self::Deal(deal)
    }
}
