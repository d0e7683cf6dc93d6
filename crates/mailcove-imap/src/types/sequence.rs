//! Message set addressing.
//!
//! A [`SequenceSet`] is an ordered list of entries, each a single number,
//! an inclusive span, an open-ended `n:*` tail, or the bare `*`. The same
//! type addresses sequence numbers and UIDs; which one it means is
//! decided by the command it rides on.

/// One comma-separated piece of a sequence set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeqEntry {
    /// A single message number.
    One(u32),
    /// An inclusive span.
    Span(u32, u32),
    /// Everything from a number to the end (`n:*`).
    After(u32),
    /// The highest message (`*`).
    Any,
}

impl std::fmt::Display for SeqEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::One(n) => write!(f, "{n}"),
            Self::Span(lo, hi) => write!(f, "{lo}:{hi}"),
            Self::After(n) => write!(f, "{n}:*"),
            Self::Any => f.write_str("*"),
        }
    }
}

/// A non-empty message set, printed exactly as it will hit the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSet(Vec<SeqEntry>);

impl SequenceSet {
    /// A single message number; zero is not addressable.
    #[must_use]
    pub fn single(n: u32) -> Option<Self> {
        (n > 0).then(|| Self(vec![SeqEntry::One(n)]))
    }

    /// An inclusive span; both ends must be non-zero.
    #[must_use]
    pub fn range(start: u32, end: u32) -> Option<Self> {
        (start > 0 && end > 0).then(|| Self(vec![SeqEntry::Span(start, end)]))
    }

    /// Everything from `start` to the end of the mailbox (`n:*`).
    #[must_use]
    pub fn from(start: u32) -> Option<Self> {
        (start > 0).then(|| Self(vec![SeqEntry::After(start)]))
    }

    /// The `*` set (the highest message).
    #[must_use]
    pub fn all() -> Self {
        Self(vec![SeqEntry::Any])
    }

    /// Parses a verbatim set like `1`, `1:10`, `3:*` or `1,5:9,12`.
    ///
    /// Returns `None` for empty input, whitespace, zeros, or anything
    /// else the grammar refuses.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }

        let mut entries = Vec::new();
        for piece in text.split(',') {
            let entry = match piece.split_once(':') {
                None if piece == "*" => SeqEntry::Any,
                None => SeqEntry::One(parse_nz(piece)?),
                Some((lo, "*")) => SeqEntry::After(parse_nz(lo)?),
                Some((lo, hi)) => SeqEntry::Span(parse_nz(lo)?, parse_nz(hi)?),
            };
            entries.push(entry);
        }
        Some(Self(entries))
    }

    /// Expands the set into plain message numbers, in entry order.
    ///
    /// Open-ended entries (`*`, `n:*`) have no client-side value, so the
    /// expansion is `None` whenever one is present. Descending spans are
    /// walked ascending, as servers treat them.
    #[must_use]
    pub fn expand(&self) -> Option<Vec<u32>> {
        let mut numbers = Vec::new();
        for entry in &self.0 {
            match *entry {
                SeqEntry::One(n) => numbers.push(n),
                SeqEntry::Span(lo, hi) => {
                    numbers.extend(lo.min(hi)..=lo.max(hi));
                }
                SeqEntry::After(_) | SeqEntry::Any => return None,
            }
        }
        Some(numbers)
    }
}

fn parse_nz(piece: &str) -> Option<u32> {
    // A leading '+' or whitespace would sneak past a plain `parse`
    if piece.is_empty() || !piece.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match piece.parse() {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(n),
    }
}

impl std::fmt::Display for SequenceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, entry) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            entry.fmt(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn constructors_refuse_zero() {
        assert!(SequenceSet::single(0).is_none());
        assert!(SequenceSet::range(0, 10).is_none());
        assert!(SequenceSet::range(1, 0).is_none());
        assert!(SequenceSet::from(0).is_none());
    }

    #[test]
    fn wire_spellings() {
        assert_eq!(SequenceSet::single(42).unwrap().to_string(), "42");
        assert_eq!(SequenceSet::range(1, 100).unwrap().to_string(), "1:100");
        assert_eq!(SequenceSet::from(50).unwrap().to_string(), "50:*");
        assert_eq!(SequenceSet::all().to_string(), "*");
    }

    #[test]
    fn parse_accepts_compound_sets() {
        assert_eq!(
            SequenceSet::parse("1,5:9,12").unwrap().to_string(),
            "1,5:9,12"
        );
        assert_eq!(SequenceSet::parse("3:*").unwrap().to_string(), "3:*");
        assert_eq!(SequenceSet::parse("*"), Some(SequenceSet::all()));
    }

    #[test]
    fn parse_refuses_malformed_input() {
        for bad in ["", "1 2", "a:b", "0", "1:", ":4", "1,,2", "+3", "5:0"] {
            assert!(SequenceSet::parse(bad).is_none(), "accepted {bad:?}");
        }
    }

    #[test]
    fn expansion_walks_entries_in_order() {
        assert_eq!(
            SequenceSet::parse("100:102,7").unwrap().expand(),
            Some(vec![100, 101, 102, 7])
        );
    }

    #[test]
    fn descending_spans_expand_ascending() {
        assert_eq!(
            SequenceSet::parse("9:7").unwrap().expand(),
            Some(vec![7, 8, 9])
        );
    }

    #[test]
    fn open_ended_sets_do_not_expand() {
        assert_eq!(SequenceSet::all().expand(), None);
        assert_eq!(SequenceSet::parse("3:*").unwrap().expand(), None);
        assert_eq!(SequenceSet::parse("1,3:*").unwrap().expand(), None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_display_round_trip(
                parts in proptest::collection::vec((1u32..10_000u32, 0u32..50u32), 1..6),
            ) {
                let text = parts
                    .iter()
                    .map(|(start, span)| if *span == 0 {
                        start.to_string()
                    } else {
                        format!("{start}:{}", start + span)
                    })
                    .collect::<Vec<_>>()
                    .join(",");

                let parsed = SequenceSet::parse(&text).unwrap();
                prop_assert_eq!(parsed.to_string(), text);
            }
        }
    }
}
