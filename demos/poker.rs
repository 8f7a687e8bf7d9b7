use dicepool::prelude::*;

fn main() -> Result<()> {
    let deck = Deck::from_dups((1..=13).map(|rank| (rank, 4)));
    let patterns = deck.deal(5)?.expr().all_counts(1)?;
    for (pattern, p) in patterns.pmf().unwrap_or_default() {
        println!("{pattern:?}: {p:.6}");
    }
    Ok(())
}
