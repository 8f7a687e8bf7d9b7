use std::hash::{Hash, Hasher};
use std::sync::Arc;

use num::integer::binomial;
use num::ToPrimitive;
use once_cell::sync::OnceCell;

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::generator::{Generator, PopBranch};
use crate::util::{structural_hash, Weight};
use crate::value::Outcome;
use crate::weights::{Iter, Weights};

/// A fixed multiset of cards, each outcome with a number of duplicates.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Deck<T: Outcome> {
    cards: Arc<Weights<T>>,
    size: usize,
}

impl<T: Outcome> Deck<T> {
    /// One card per item; repeated items become duplicates.
    pub fn new<I>(cards: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Self::from_dups(cards.into_iter().map(|c| (c, 1)))
    }

    pub fn from_dups<I>(dups: I) -> Self
    where
        I: IntoIterator<Item = (T, usize)>,
    {
        let mut size = 0;
        let cards = Weights::from_pairs(dups.into_iter().map(|(card, dup)| {
            size += dup;
            (card, Weight::from(dup))
        }));
        Self {
            cards: Arc::new(cards),
            size,
        }
    }

    /// Like [`Deck::from_dups`], rejecting negative duplicate counts.
    pub fn from_counts<I>(counts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (T, i64)>,
    {
        let dups = counts
            .into_iter()
            .map(|(card, n)| usize::try_from(n).map(|n| (card, n)).map_err(|_| Error::NegativeWeight(n)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_dups(dups))
    }

    /// Total number of cards.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of distinct outcomes.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn outcomes(&self) -> &[T] {
        self.cards.outcomes()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.cards.iter()
    }

    pub fn dups(&self, outcome: &T) -> Weight {
        self.cards.weight(outcome)
    }

    pub fn min_outcome(&self) -> Option<&T> {
        self.cards.min_outcome()
    }

    pub fn max_outcome(&self) -> Option<&T> {
        self.cards.max_outcome()
    }

    /// Draws `hand_size` cards without replacement.
    pub fn deal(&self, hand_size: usize) -> Result<Deal<T>> {
        if hand_size > self.size {
            return Err(Error::HandSizeExceedsDeck {
                hand_size,
                deck_size: self.size,
            });
        }
        Ok(Deal::from_parts(self.clone(), hand_size))
    }

    /// Deals every card, which always yields the deck itself.
    pub fn deal_all(&self) -> Deal<T> {
        Deal::from_parts(self.clone(), self.size)
    }

    fn pop(&self, max: bool) -> Result<Option<(Option<Self>, T, usize)>> {
        let popped = if max { self.cards.pop_max() } else { self.cards.pop_min() };
        let Some(popped) = popped else {
            return Ok(None);
        };
        let dup = popped
            .weight
            .to_usize()
            .ok_or_else(|| Error::Overflow(popped.weight.to_string()))?;
        let rest = popped.rest.clone().map(|cards| Self {
            cards,
            size: self.size - dup,
        });
        Ok(Some((rest, popped.outcome.clone(), dup)))
    }
}

#[derive(Debug)]
struct DealInner<T: Outcome> {
    deck: Deck<T>,
    hand_size: usize,
    hash: u64,
    pop_min: OnceCell<Vec<PopBranch<Deal<T>>>>,
    pop_max: OnceCell<Vec<PopBranch<Deal<T>>>>,
}

/// A hand of cards dealt from a [`Deck`].
#[derive(Clone, Debug)]
pub struct Deal<T: Outcome>(Arc<DealInner<T>>);

impl<T: Outcome> Deal<T> {
    fn from_parts(deck: Deck<T>, hand_size: usize) -> Self {
        let hash = structural_hash(&(&deck, hand_size));
        Self(Arc::new(DealInner {
            deck,
            hand_size,
            hash,
            pop_min: OnceCell::new(),
            pop_max: OnceCell::new(),
        }))
    }

    pub fn deck(&self) -> &Deck<T> {
        &self.0.deck
    }

    pub fn hand_size(&self) -> usize {
        self.0.hand_size
    }

    /// Number of distinct hands, `C(deck size, hand size)`.
    pub fn denominator(&self) -> Weight {
        binomial(Weight::from(self.0.deck.size()), Weight::from(self.0.hand_size))
    }

    pub fn expr(&self) -> Expr<T> {
        Expr::bound(Generator::Deal(self.clone()))
    }

    /// Branches over how many copies of the highest card end up in the hand.
    pub fn pop_max(&self) -> Result<&[PopBranch<Self>]> {
        self.0
            .pop_max
            .get_or_try_init(|| self.compute_pop(true))
            .map(Vec::as_slice)
    }

    /// Branches over how many copies of the lowest card end up in the hand.
    pub fn pop_min(&self) -> Result<&[PopBranch<Self>]> {
        self.0
            .pop_min
            .get_or_try_init(|| self.compute_pop(false))
            .map(Vec::as_slice)
    }

    fn compute_pop(&self, max: bool) -> Result<Vec<PopBranch<Self>>> {
        let deck = &self.0.deck;
        let hand = self.0.hand_size;
        let Some((rest, _, dup)) = deck.pop(max)? else {
            return Ok(Vec::new());
        };
        // Enough copies must be drawn to leave room for the other cards.
        let min_count = (dup + hand).saturating_sub(deck.size());
        let max_count = dup.min(hand);
        let mut branches = Vec::with_capacity(max_count + 1 - min_count);
        for count in min_count..=max_count {
            branches.push(PopBranch {
                rest: rest.clone().map(|d| Self::from_parts(d, hand - count)),
                count: i64::try_from(count).map_err(|_| Error::Overflow(count.to_string()))?,
                weight: binomial(Weight::from(dup), Weight::from(count)),
            });
        }
        Ok(branches)
    }
}

impl<T: Outcome> PartialEq for Deal<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.hash == other.0.hash
                && self.0.hand_size == other.0.hand_size
                && self.0.deck == other.0.deck)
    }
}

impl<T: Outcome> Eq for Deal<T> {}

impl<T: Outcome> Hash for Deal<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deck_counts_duplicates() {
        let deck = Deck::new([1, 2, 2, 3]);
        assert_eq!(deck.size(), 4);
        assert_eq!(deck.len(), 3);
        assert_eq!(deck.dups(&2), Weight::from(2u32));
    }

    #[test]
    fn test_hand_too_large() {
        let deck = Deck::new([1, 2, 3]);
        assert_eq!(
            deck.deal(4).unwrap_err(),
            Error::HandSizeExceedsDeck {
                hand_size: 4,
                deck_size: 3
            }
        );
    }

    #[test]
    fn test_negative_dups() {
        assert_eq!(Deck::from_counts([(1, 2), (2, -1)]).unwrap_err(), Error::NegativeWeight(-1));
    }

    #[test]
    fn test_pop_max_is_hypergeometric() {
        // Three aces in a ten card deck, hand of four.
        let deck = Deck::from_dups([(0, 7), (1, 3)]);
        let deal = deck.deal(4).unwrap();
        let branches = deal.pop_max().unwrap();
        let counts: Vec<i64> = branches.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![0, 1, 2, 3]);
        let total: Weight = branches
            .iter()
            .map(|b| &b.weight * b.rest.as_ref().map_or(Weight::from(1u32), Deal::denominator))
            .sum();
        assert_eq!(total, deal.denominator());
        assert_eq!(deal.denominator(), Weight::from(210u32));
    }

    #[test]
    fn test_forced_draws() {
        // Dealing the whole deck leaves a single branch per card.
        let deal = Deck::new([1, 2, 2]).deal(3).unwrap();
        let branches = deal.pop_min().unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].count, 1);
    }
}
