use thiserror::Error;

use crate::generator::Order;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("conflicting values for the number of dice: {0} and {1}")]
    ConflictingPoolSize(usize, usize),
    #[error("a pool cannot limit both min_outcomes and max_outcomes")]
    ConflictingCaps,
    #[error("the [] operator cannot change the size of a pool with outcome caps")]
    ResizeWithCaps,
    #[error("index {index} is out of range for a pool of {size} dice")]
    SelectorOutOfRange { index: isize, size: usize },
    #[error("invalid selector: {0}")]
    InvalidSelector(&'static str),
    #[error("hand size {hand_size} exceeds deck size {deck_size}")]
    HandSizeExceedsDeck { hand_size: usize, deck_size: usize },
    #[error("weights cannot be negative, got {0}")]
    NegativeWeight(i64),
    #[error("expected {expected} weights, got {actual}")]
    WeightCountMismatch { expected: usize, actual: usize },
    #[error("conflicting order requirements: {0:?} and {1:?}")]
    ConflictingOrder(Order, Order),
    #[error("cannot pop the {0} outcome of a pool capped on the other side")]
    PopDirection(&'static str),
    #[error("keep expression received negative count {0}")]
    NegativeKeepCount(i64),
    #[error("expression has {0} unbound variables")]
    UnboundVariables(usize),
    #[error("expected {expected} generators, got {actual}")]
    GeneratorCount { expected: usize, actual: usize },
    #[error("division by zero")]
    ZeroDivisor,
    #[error("{0} does not fit in the target type")]
    Overflow(String),
}

pub type Result<T> = core::result::Result<T, Error>;
