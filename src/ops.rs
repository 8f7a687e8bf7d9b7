use std::ops::{Add, Neg, Sub};

use crate::value::Outcome;
use crate::Die;

impl<K: Outcome> Die<K> {
    /// Folds `count` independent copies of this die with `op`.
    pub fn repeat<F>(&self, count: usize, op: F) -> Self
    where
        F: Fn(&K, &K) -> K + Copy,
    {
        let mut result = self.clone();
        for _ in 1..count {
            result = result.apply_two(self, op);
        }
        result
    }

    pub fn max(&self, rhs: &Self) -> Self {
        self.apply_two(rhs, |x, y| x.max(y).clone())
    }

    pub fn min(&self, rhs: &Self) -> Self {
        self.apply_two(rhs, |x, y| x.min(y).clone())
    }

    pub fn max_of(&self, count: usize) -> Self {
        self.repeat(count, |x, y| x.max(y).clone())
    }

    pub fn min_of(&self, count: usize) -> Self {
        self.repeat(count, |x, y| x.min(y).clone())
    }
}

impl<K> Add<Die<K>> for Die<K>
where
    K: Outcome + Add<Output = K> + Copy,
{
    type Output = Die<K>;

    fn add(self, rhs: Die<K>) -> Self::Output {
        self.apply_two(&rhs, |x, y| *x + *y)
    }
}

impl<K> Add<&Die<K>> for &Die<K>
where
    K: Outcome + Add<Output = K> + Copy,
{
    type Output = Die<K>;

    fn add(self, rhs: &Die<K>) -> Self::Output {
        self.apply_two(rhs, |x, y| *x + *y)
    }
}

impl<K> Sub<Die<K>> for Die<K>
where
    K: Outcome + Sub<Output = K> + Copy,
{
    type Output = Die<K>;

    fn sub(self, rhs: Die<K>) -> Self::Output {
        self.apply_two(&rhs, |x, y| *x - *y)
    }
}

impl<K> Sub<&Die<K>> for &Die<K>
where
    K: Outcome + Sub<Output = K> + Copy,
{
    type Output = Die<K>;

    fn sub(self, rhs: &Die<K>) -> Self::Output {
        self.apply_two(rhs, |x, y| *x - *y)
    }
}

impl<K> Neg for Die<K>
where
    K: Outcome + Neg<Output = K> + Copy,
{
    type Output = Die<K>;

    fn neg(self) -> Self::Output {
        self.map(|x| -*x)
    }
}

macro_rules! impl_scalar_ops {
    ($typ:ty) => {
        impl Add<$typ> for Die<$typ> {
            type Output = Die<$typ>;

            fn add(self, rhs: $typ) -> Self::Output {
                self.map(|x| *x + rhs)
            }
        }

        impl Sub<$typ> for Die<$typ> {
            type Output = Die<$typ>;

            fn sub(self, rhs: $typ) -> Self::Output {
                self.map(|x| *x - rhs)
            }
        }
    };
}

impl_scalar_ops!(i8);
impl_scalar_ops!(i16);
impl_scalar_ops!(i32);
impl_scalar_ops!(i64);
impl_scalar_ops!(u8);
impl_scalar_ops!(u16);
impl_scalar_ops!(u32);
impl_scalar_ops!(u64);
