use dicepool::defs::{d4, d6};
use dicepool::eval::{Comparison, ComparisonEvaluator};
use dicepool::{Deck, Die, Error, Expr, Order, Pool, Weight};

fn a() -> Expr<i32> {
    Expr::fixed([1, 2, 2, 3])
}

fn b() -> Expr<i32> {
    Expr::fixed([1, 2, 4])
}

fn single(die: Die<Vec<i32>>) -> Vec<i32> {
    assert_eq!(die.len(), 1, "expected a deterministic result: {die:?}");
    die.outcomes()[0].clone()
}

fn expand(expr: dicepool::Result<Expr<i32>>) -> Vec<i32> {
    single(expr.unwrap().expand().unwrap())
}

#[test]
fn test_set_algebra_on_fixed_multisets() {
    assert_eq!(expand(a() + b()), vec![1, 1, 2, 2, 2, 3, 4]);
    assert_eq!(expand(a() | b()), vec![1, 2, 2, 3, 4]);
    assert_eq!(expand(a() & b()), vec![1, 2]);
    assert_eq!(expand(a() - b()), vec![2, 3]);
    assert_eq!(expand(a() ^ b()), vec![2, 3, 4]);
}

#[test]
fn test_count_transforms() {
    assert_eq!(expand(Ok(a() * 2)), vec![1, 1, 2, 2, 2, 2, 3, 3]);
    assert_eq!(expand(a() / 2), vec![2]);
    assert_eq!(expand(Ok(a().keep_counts(2))), vec![2, 2]);
    assert_eq!(expand(Ok(a().unique())), vec![1, 2, 3]);
    assert_eq!((a() / 0).unwrap_err(), Error::ZeroDivisor);
}

#[test]
fn test_set_algebra_on_deals() {
    let left = Deck::new([1, 2, 2, 3]).deal(4).unwrap();
    let right = Deck::new([1, 2, 4]).deal(3).unwrap();
    assert_eq!(expand(left.clone() + right.clone()), vec![1, 1, 2, 2, 2, 3, 4]);
    assert_eq!(expand(left.clone() | right.clone()), vec![1, 2, 2, 3, 4]);
    assert_eq!(expand(left.clone() & right.clone()), vec![1, 2]);
    assert_eq!(expand(left.clone() - right.clone()), vec![2, 3]);
    assert_eq!(expand(left ^ right), vec![2, 3, 4]);
}

#[test]
fn test_idempotent_operations() {
    assert_eq!(expand(a() | a()), single(a().expand().unwrap()));
    assert_eq!(expand(a() & a()), single(a().expand().unwrap()));
    assert_eq!(expand(a() - a()), Vec::<i32>::new());
}

#[test]
fn test_expand_pool() {
    let die = d4().pool(2).expr().expand().unwrap();
    assert_eq!(die.len(), 10);
    assert_eq!(die.weight(&vec![1, 1]), Weight::from(1u32));
    assert_eq!(die.weight(&vec![1, 2]), Weight::from(2u32));
    assert_eq!(die.denominator(), &Weight::from(16u32));
}

#[test]
fn test_builtin_evaluators() {
    let pool = d6().pool(2).expr();
    assert_eq!(pool.clone().count().unwrap().outcomes(), &[2]);
    let pairs = pool.clone().largest_count().unwrap();
    assert_eq!(pairs.weight(&2), Weight::from(6u32));
    let best = pool.highest_outcome_and_count().unwrap();
    assert_eq!(best.weight(&Some((6, 2))), Weight::from(1u32));
    assert_eq!(best.weight(&Some((6, 1))), Weight::from(10u32));

    let fixed = Expr::fixed([1, 3, 3, 5, 5, 5]);
    assert_eq!(fixed.clone().largest_count_and_outcome().unwrap(), Die::scalar(Some((3, 5))));
    assert_eq!(fixed.clone().all_counts(2).unwrap(), Die::scalar(vec![3, 2]));
    assert_eq!(fixed.largest_straight().unwrap(), Die::scalar(1));
    assert_eq!(
        Expr::fixed([2, 3, 4, 6]).largest_straight_and_outcome().unwrap(),
        Die::scalar((3, Some(4)))
    );
}

#[test]
fn test_comparisons() {
    let roll = d6().pool(1).expr();
    let subset = roll.clone().issubset(Expr::fixed(1..=6)).unwrap();
    assert_eq!(subset, Die::from_weights([(true, 6u32)]));
    let disjoint = roll.clone().isdisjoint(Expr::fixed([1, 2])).unwrap();
    assert_eq!(disjoint.weight(&true), Weight::from(4u32));
    assert_eq!(disjoint.weight(&false), Weight::from(2u32));
    let superset = Expr::fixed(1..=6).issuperset(roll.clone()).unwrap();
    assert_eq!(superset.outcomes(), &[true]);
    let equal = roll.compare(Expr::fixed([6]), Comparison::Equal).unwrap();
    assert_eq!(equal.weight(&true), Weight::from(1u32));
}

#[test]
fn test_arity_and_unbound_errors() {
    assert_eq!(
        Expr::evaluate_all(vec![a()], ComparisonEvaluator::subset()).unwrap_err(),
        Error::GeneratorCount {
            expected: 2,
            actual: 1
        }
    );
    assert_eq!(Expr::<i32>::variable(0).sum().unwrap_err(), Error::UnboundVariables(1));
}

#[test]
fn test_conflicting_orders() {
    let max_capped = Pool::builder().die(d6()).max_outcomes(vec![3]).build().unwrap();
    let min_capped = Pool::builder().die(d6()).min_outcomes(vec![3]).build().unwrap();
    assert_eq!(
        (max_capped | min_capped).unwrap_err(),
        Error::ConflictingOrder(Order::Ascending, Order::Descending)
    );
}

#[test]
fn test_map_counts_over_two_pools() {
    // Matches between two single dice.
    let matches = d6()
        .pool(1)
        .expr()
        .map_counts(vec![d6().pool(1).expr()], |_, counts| counts[0].min(counts[1]))
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(matches.weight(&1), Weight::from(6u32));
    assert_eq!(matches.weight(&0), Weight::from(30u32));
}
