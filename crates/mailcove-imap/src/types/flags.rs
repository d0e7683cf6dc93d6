//! Message flags.

/// A message flag: one of the system flags, the `\*` wildcard from
/// PERMANENTFLAGS, or a server keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Flag {
    /// `\Seen`
    Seen,
    /// `\Answered`
    Answered,
    /// `\Flagged`
    Flagged,
    /// `\Deleted`
    Deleted,
    /// `\Draft`
    Draft,
    /// `\Recent`
    Recent,
    /// `\*`: any keyword may be stored permanently.
    Wildcard,
    /// Anything else, kept verbatim (`$Forwarded`, Gmail labels, ...).
    Keyword(String),
}

impl Flag {
    /// Parses a flag word as it appears on the wire.
    #[must_use]
    pub fn parse(word: &str) -> Self {
        let Some(name) = word.strip_prefix('\\') else {
            return Self::Keyword(word.to_string());
        };

        let system = [
            ("Seen", Self::Seen),
            ("Answered", Self::Answered),
            ("Flagged", Self::Flagged),
            ("Deleted", Self::Deleted),
            ("Draft", Self::Draft),
            ("Recent", Self::Recent),
            ("*", Self::Wildcard),
        ];
        system
            .into_iter()
            .find(|(known, _)| name.eq_ignore_ascii_case(known))
            .map_or_else(|| Self::Keyword(word.to_string()), |(_, flag)| flag)
    }

    /// The wire spelling.
    #[must_use]
    pub fn as_imap(&self) -> &str {
        match self {
            Self::Seen => "\\Seen",
            Self::Answered => "\\Answered",
            Self::Flagged => "\\Flagged",
            Self::Deleted => "\\Deleted",
            Self::Draft => "\\Draft",
            Self::Recent => "\\Recent",
            Self::Wildcard => "\\*",
            Self::Keyword(word) => word,
        }
    }
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_imap())
    }
}

/// A duplicate-free flag set, insertion-ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags(Vec<Flag>);

impl Flags {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from flags, dropping duplicates.
    #[must_use]
    pub fn from_vec(flags: Vec<Flag>) -> Self {
        let mut set = Self::new();
        for flag in flags {
            set.insert(flag);
        }
        set
    }

    /// Adds a flag; duplicates are ignored.
    pub fn insert(&mut self, flag: Flag) {
        if !self.0.contains(&flag) {
            self.0.push(flag);
        }
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, flag: &Flag) -> bool {
        self.0.contains(flag)
    }

    /// True when the set carries the `\*` wildcard.
    #[must_use]
    pub fn allows_any(&self) -> bool {
        self.contains(&Flag::Wildcard)
    }

    /// Shorthand for `\Seen` membership.
    #[must_use]
    pub fn is_seen(&self) -> bool {
        self.contains(&Flag::Seen)
    }

    /// Shorthand for `\Flagged` membership.
    #[must_use]
    pub fn is_flagged(&self) -> bool {
        self.contains(&Flag::Flagged)
    }

    /// Iterates the flags in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.0.iter()
    }

    /// Number of flags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no flags are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
