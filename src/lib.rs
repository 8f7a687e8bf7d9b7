pub mod defs;
mod deck;
mod die;
pub mod error;
pub mod eval;
pub mod expr;
mod generator;
mod ops;
mod pool;
pub mod prelude;
mod selector;
mod util;
mod value;
mod weights;

pub use deck::{Deal, Deck};
pub use die::{Die, DieArg};
pub use error::{Error, Result};
pub use expr::{Evaluation, Expr, MultisetExpression};
pub use generator::{Generator, Order, PopBranch};
pub use pool::Pool;
pub use selector::Selector;
pub use util::Weight;
pub use value::{ComputableOutcome, DefaultOutcome, NumericOutcome, Outcome};
pub use weights::DenominatorMethod;

/// Observation order used when nothing in an evaluation asks for one.
const DEFAULT_ORDER: Order = Order::Ascending;
