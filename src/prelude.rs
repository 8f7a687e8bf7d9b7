pub use crate::defs::*;
pub use crate::eval::{CachedEvaluator, Comparison, EngineConfig, Evaluator};
pub use crate::{Deal, Deck, Die, Error, Evaluation, Expr, Order, Pool, Result, Selector};
