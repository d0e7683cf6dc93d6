//! Protocol identifiers.
//!
//! All four numeric identifiers are zero-free newtypes over the matching
//! `NonZero` width. `UidValidity` and `ModSeq` stay 64-bit end to end;
//! monotonic comparisons must never pass through a 32-bit intermediate.

use std::num::{NonZeroU32, NonZeroU64};

macro_rules! wire_id {
    ($(#[$doc:meta])* $name:ident: $raw:ty as $inner:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub $inner);

        impl $name {
            /// Wraps a raw value, rejecting zero.
            #[must_use]
            pub fn new(value: $raw) -> Option<Self> {
                <$inner>::new(value).map(Self)
            }

            /// Returns the raw value.
            #[must_use]
            pub fn get(self) -> $raw {
                self.0.get()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

wire_id! {
    /// 1-based position of a message in the selected mailbox.
    ///
    /// Ephemeral: every EXPUNGE renumbers the messages behind it.
    SeqNum: u32 as NonZeroU32
}

wire_id! {
    /// Per-mailbox persistent message identifier.
    ///
    /// Stable for as long as the mailbox keeps its UIDVALIDITY.
    Uid: u32 as NonZeroU32
}

wire_id! {
    /// Mailbox generation marker; a change voids every cached UID.
    UidValidity: u64 as NonZeroU64
}

wire_id! {
    /// Modification sequence (CONDSTORE/QRESYNC), monotone per mailbox.
    ModSeq: u64 as NonZeroU64
}

/// Command tag, echoed back on the matching completion line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(String);

impl Tag {
    /// Wraps a tag string.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The tag text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_an_identifier() {
        assert!(SeqNum::new(0).is_none());
        assert!(Uid::new(0).is_none());
        assert!(UidValidity::new(0).is_none());
        assert!(ModSeq::new(0).is_none());
    }

    #[test]
    fn values_round_trip() {
        assert_eq!(SeqNum::new(42).unwrap().get(), 42);
        assert_eq!(format!("{}", Uid::new(7).unwrap()), "7");
    }

    #[test]
    fn wide_identifiers_keep_64_bits() {
        let beyond_u32 = u64::from(u32::MAX) + 10;
        assert_eq!(UidValidity::new(beyond_u32).unwrap().get(), beyond_u32);
        assert_eq!(
            ModSeq::new(9_007_199_254_740_993).unwrap().get(),
            9_007_199_254_740_993
        );
    }

    #[test]
    fn identifiers_order() {
        assert!(Uid::new(100).unwrap() < Uid::new(200).unwrap());
        assert!(ModSeq::new(1).unwrap() < ModSeq::new(2).unwrap());
    }

    #[test]
    fn tag_round_trips() {
        let tag = Tag::new("C17");
        assert_eq!(tag.as_str(), "C17");
        assert_eq!(format!("{tag}"), "C17");
    }
}
