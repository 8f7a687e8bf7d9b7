use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Sub};

use super::Expr;
use crate::deck::Deal;
use crate::error::Result;
use crate::pool::Pool;
use crate::value::Outcome;

macro_rules! impl_set_ops {
    ($($lhs:ident),*) => {$(
        impl<T: Outcome, R: Into<Expr<T>>> BitOr<R> for $lhs<T> {
            type Output = Result<Expr<T>>;

            fn bitor(self, rhs: R) -> Self::Output {
                Expr::from(self).union(rhs)
            }
        }

        impl<T: Outcome, R: Into<Expr<T>>> BitAnd<R> for $lhs<T> {
            type Output = Result<Expr<T>>;

            fn bitand(self, rhs: R) -> Self::Output {
                Expr::from(self).intersection(rhs)
            }
        }

        impl<T: Outcome, R: Into<Expr<T>>> BitXor<R> for $lhs<T> {
            type Output = Result<Expr<T>>;

            fn bitxor(self, rhs: R) -> Self::Output {
                Expr::from(self).symmetric_difference(rhs)
            }
        }

        impl<T: Outcome, R: Into<Expr<T>>> Add<R> for $lhs<T> {
            type Output = Result<Expr<T>>;

            fn add(self, rhs: R) -> Self::Output {
                Expr::from(self).disjoint_union(rhs)
            }
        }

        impl<T: Outcome, R: Into<Expr<T>>> Sub<R> for $lhs<T> {
            type Output = Result<Expr<T>>;

            fn sub(self, rhs: R) -> Self::Output {
                Expr::from(self).difference(rhs)
            }
        }

        impl<T: Outcome> Mul<i64> for $lhs<T> {
            type Output = Expr<T>;

            fn mul(self, rhs: i64) -> Self::Output {
                Expr::from(self).multiply_counts(rhs)
            }
        }

        impl<T: Outcome> Div<i64> for $lhs<T> {
            type Output = Result<Expr<T>>;

            fn div(self, rhs: i64) -> Self::Output {
                Expr::from(self).floor_div_counts(rhs)
            }
        }
    )*};
}

impl_set_ops!(Expr, Pool, Deal);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::d6;

    #[test]
    fn test_operators_match_methods() {
        let a = Expr::fixed([1, 2, 2, 3]);
        let b = Expr::fixed([1, 2, 4]);
        let by_op = (a.clone() | b.clone()).unwrap().expand().unwrap();
        let by_method = a.union(b).unwrap().expand().unwrap();
        assert_eq!(by_op, by_method);
    }

    #[test]
    fn test_pool_operands() {
        let die = (d6().pool(2) + d6().pool(1)).unwrap().sum().unwrap();
        assert_eq!(die, d6().pool(3).sum().unwrap());
        let doubled = (d6().pool(1) * 2).sum().unwrap();
        assert_eq!(doubled, d6().map(|x| x * 2));
    }
}
