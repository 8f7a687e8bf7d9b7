use std::fmt;

use super::{Children, Expr, ExprState};
use crate::die::Die;
use crate::error::{Error, Result};
use crate::eval::{CachedEvaluator, Evaluator};
use crate::generator::{Generator, Order};
use crate::value::Outcome;

/// Feeds the counts produced by one or more expressions into an inner
/// evaluator.
///
/// Generators supplied at evaluation time fill the free variables; the
/// expressions' own bound generators follow them.
#[derive(Clone, Debug)]
pub struct ExpressionEvaluator<T: Outcome, E> {
    children: Children<T>,
    inner: E,
    order: Order,
}

impl<T: Outcome, E: Evaluator<T>> ExpressionEvaluator<T, E> {
    pub fn new(exprs: Vec<Expr<T>>, inner: E) -> Result<Self> {
        if let Some(expected) = inner.arity() {
            if expected != exprs.len() {
                return Err(Error::GeneratorCount {
                    expected,
                    actual: exprs.len(),
                });
            }
        }
        let children = Children::new(exprs)?;
        let order = children.order().merge(inner.order())?;
        Ok(Self {
            children,
            inner,
            order,
        })
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn free_arity(&self) -> usize {
        self.children.free_arity()
    }

    pub(crate) fn into_evaluation(self) -> Result<Evaluation<T, E>> {
        let engine = CachedEvaluator::new(self);
        match engine.evaluator().free_arity() {
            0 => Ok(Evaluation::Die(engine.evaluate(&[])?)),
            _ => Ok(Evaluation::Deferred(engine)),
        }
    }
}

impl<T: Outcome, E: Evaluator<T>> Evaluator<T> for ExpressionEvaluator<T, E> {
    type State = (ExprState, E::State);
    type Output = E::Output;

    fn initial_state(&self, generators: &[Generator<T>]) -> Self::State {
        (self.children.initial_state(), self.inner.initial_state(generators))
    }

    fn next_state(&self, state: &Self::State, outcome: &T, counts: &[Option<i64>]) -> Result<Self::State> {
        let counts: Vec<i64> = counts.iter().map(|c| c.unwrap_or(0)).collect();
        let split = self.free_arity().min(counts.len());
        let (free, bound) = counts.split_at(split);
        let (exprs, expr_counts) = self.children.next_counts(&state.0, outcome, bound, free)?;
        let expr_counts: Vec<Option<i64>> = expr_counts.into_iter().map(Some).collect();
        let inner = self.inner.next_state(&state.1, outcome, &expr_counts)?;
        Ok((exprs, inner))
    }

    fn final_outcome(&self, state: &Self::State, generators: &[Generator<T>]) -> Option<Self::Output> {
        self.inner.final_outcome(&state.1, generators)
    }

    fn reroll_state(&self, state: &Self::State) -> bool {
        self.inner.reroll_state(&state.1)
    }

    fn order(&self) -> Order {
        self.order
    }

    fn arity(&self) -> Option<usize> {
        Some(self.free_arity())
    }

    fn bound_generators(&self) -> Vec<Generator<T>> {
        let mut generators = self.children.bound_generators();
        generators.extend(self.inner.bound_generators());
        generators
    }
}

/// Result of attaching an evaluator to expressions.
pub enum Evaluation<T: Outcome, E: Evaluator<T>> {
    /// Every expression was fully bound.
    Die(Die<E::Output>),
    /// Free variables remain; call [`CachedEvaluator::evaluate`] with one
    /// generator per variable.
    Deferred(CachedEvaluator<T, ExpressionEvaluator<T, E>>),
}

impl<T: Outcome, E: Evaluator<T>> Evaluation<T, E> {
    pub fn into_die(self) -> Result<Die<E::Output>> {
        match self {
            Self::Die(die) => Ok(die),
            Self::Deferred(engine) => Err(Error::UnboundVariables(engine.evaluator().free_arity())),
        }
    }
}

impl<T: Outcome, E: Evaluator<T>> fmt::Debug for Evaluation<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Die(die) => f.debug_tuple("Die").field(die).finish(),
            Self::Deferred(engine) => f
                .debug_tuple("Deferred")
                .field(&engine.evaluator().free_arity())
                .finish(),
        }
    }
}
