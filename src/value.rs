use std::fmt::Debug;
use std::hash::Hash;

pub type DefaultOutcome = i32;

/// Anything a die can roll or an evaluator can produce.
pub trait Outcome: Sized + Send + Sync + Debug + Clone + Eq + Ord + Hash + 'static {}

/// Outcomes that can be projected onto the real line for statistics.
pub trait ComputableOutcome: Outcome {
    fn compute(&self) -> f64;
}

macro_rules! impl_computable_outcome_from {
    ($typ:ty) => {
        impl $crate::value::ComputableOutcome for $typ {
            fn compute(&self) -> f64 {
                f64::from(*self)
            }
        }
    };
}

macro_rules! impl_computable_outcome_trunc {
    ($typ:ty) => {
        impl $crate::value::ComputableOutcome for $typ {
            fn compute(&self) -> f64 {
                *self as f64
            }
        }
    };
}

impl<T> Outcome for T where T: Sized + Send + Sync + Debug + Clone + Eq + Ord + Hash + 'static {}

impl_computable_outcome_from!(u8);
impl_computable_outcome_from!(u16);
impl_computable_outcome_from!(u32);
impl_computable_outcome_trunc!(u64);
impl_computable_outcome_trunc!(usize);
impl_computable_outcome_from!(i8);
impl_computable_outcome_from!(i16);
impl_computable_outcome_from!(i32);
impl_computable_outcome_trunc!(i64);
impl_computable_outcome_trunc!(isize);

impl ComputableOutcome for bool {
    fn compute(&self) -> f64 {
        f64::from(u8::from(*self))
    }
}

/// Outcomes that can be summed and scaled by an integer count.
pub trait NumericOutcome: Outcome + Copy + num::Num + num::NumCast {}

impl<T> NumericOutcome for T where T: Outcome + Copy + num::Num + num::NumCast {}
