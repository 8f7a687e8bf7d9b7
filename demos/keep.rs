use std::time::Instant;

use dicepool::prelude::*;

fn main() -> Result<()> {
    let start = Instant::now();
    let d = d6().keep_highest(4, 3, 0)?;
    let elapsed = (Instant::now() - start).as_millis();
    let mean = d.mean().unwrap_or(f64::NAN);
    println!("die = {d:?} mean = {mean} elapsed = {elapsed}");
    Ok(())
}
