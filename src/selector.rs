use crate::error::{Error, Result};

/// Which sorted positions of a multiset count, and how many times.
///
/// Positions are indexed in ascending order; negative indices count from the
/// highest position.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Selector {
    /// A single position counted once.
    Index(isize),
    /// A half-open range of positions, each counted once.
    Slice {
        start: Option<isize>,
        stop: Option<isize>,
    },
    /// One explicit count per position.
    Counts(Vec<i64>),
    /// Explicit counts for the lowest and highest positions; everything in
    /// between counts zero times.
    Padded { prefix: Vec<i64>, suffix: Vec<i64> },
}

impl Selector {
    pub fn all() -> Self {
        Self::Slice {
            start: None,
            stop: None,
        }
    }

    /// The `n` highest positions.
    pub fn highest(n: usize) -> Self {
        Self::Padded {
            prefix: Vec::new(),
            suffix: vec![1; n],
        }
    }

    /// The `n` lowest positions.
    pub fn lowest(n: usize) -> Self {
        Self::Padded {
            prefix: vec![1; n],
            suffix: Vec::new(),
        }
    }

    /// Number of positions this selector describes by itself, if any.
    pub fn fixed_len(&self) -> Option<usize> {
        match self {
            Self::Counts(counts) => Some(counts.len()),
            _ => None,
        }
    }

    /// Expands the selector into one count per position of a multiset of
    /// `size` elements.
    pub fn counts(&self, size: usize) -> Result<Vec<i64>> {
        match self {
            Self::Index(index) => {
                let position = resolve_index(*index, size).ok_or(Error::SelectorOutOfRange {
                    index: *index,
                    size,
                })?;
                let mut counts = vec![0; size];
                counts[position] = 1;
                Ok(counts)
            }
            Self::Slice { start, stop } => {
                let start = clamp_bound(*start, size, 0);
                let stop = clamp_bound(*stop, size, size);
                Ok((0..size)
                    .map(|i| i64::from(i >= start && i < stop))
                    .collect())
            }
            Self::Counts(counts) if counts.len() == size => Ok(counts.clone()),
            Self::Counts(_) => Err(Error::InvalidSelector(
                "number of counts does not match the number of dice",
            )),
            Self::Padded { prefix, suffix } => {
                if prefix.len() + suffix.len() > size {
                    return Err(Error::InvalidSelector(
                        "more explicit counts than dice around the ellipsis",
                    ));
                }
                let middle = size - prefix.len() - suffix.len();
                Ok(prefix
                    .iter()
                    .copied()
                    .chain(std::iter::repeat(0).take(middle))
                    .chain(suffix.iter().copied())
                    .collect())
            }
        }
    }
}

fn resolve_index(index: isize, size: usize) -> Option<usize> {
    let size = isize::try_from(size).ok()?;
    let position = if index < 0 { size + index } else { index };
    (0..size).contains(&position).then_some(position as usize)
}

fn clamp_bound(bound: Option<isize>, size: usize, default: usize) -> usize {
    match bound {
        None => default,
        Some(b) if b >= 0 => (b as usize).min(size),
        Some(b) => size.saturating_sub(b.unsigned_abs()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index() {
        assert_eq!(Selector::Index(-1).counts(3).unwrap(), vec![0, 0, 1]);
        assert_eq!(Selector::Index(0).counts(3).unwrap(), vec![1, 0, 0]);
        assert_eq!(
            Selector::Index(3).counts(3),
            Err(Error::SelectorOutOfRange { index: 3, size: 3 })
        );
    }

    #[test]
    fn test_slice() {
        let s = Selector::Slice {
            start: Some(1),
            stop: Some(-1),
        };
        assert_eq!(s.counts(4).unwrap(), vec![0, 1, 1, 0]);
        assert_eq!(Selector::all().counts(2).unwrap(), vec![1, 1]);
    }

    #[test]
    fn test_padded() {
        assert_eq!(Selector::highest(2).counts(4).unwrap(), vec![0, 0, 1, 1]);
        assert_eq!(Selector::lowest(1).counts(3).unwrap(), vec![1, 0, 0]);
        assert!(Selector::highest(3).counts(2).is_err());
    }
}
