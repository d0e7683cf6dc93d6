//! Request vocabulary for the command builder.

use crate::types::{Flag, ModSeq, SequenceSet, UidValidity};

/// One counter a STATUS query can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAttribute {
    /// Total message count.
    Messages,
    /// Recent-message count.
    Recent,
    /// The UID the next delivery will get.
    UidNext,
    /// The mailbox generation marker.
    UidValidity,
    /// Unseen-message count.
    Unseen,
    /// The modification high-water mark (needs CONDSTORE).
    HighestModSeq,
}

impl StatusAttribute {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Messages => "MESSAGES",
            Self::Recent => "RECENT",
            Self::UidNext => "UIDNEXT",
            Self::UidValidity => "UIDVALIDITY",
            Self::Unseen => "UNSEEN",
            Self::HighestModSeq => "HIGHESTMODSEQ",
        }
    }
}

/// The item list a FETCH asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItems {
    /// The `ALL` macro: flags, date, size and envelope.
    All,
    /// The `FULL` macro: `ALL` plus the body tree.
    Full,
    /// The `FAST` macro: flags, date and size.
    Fast,
    /// An explicit attribute list.
    Items(Vec<FetchAttribute>),
}

/// One requestable FETCH attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// The flag set.
    Flags,
    /// Delivery timestamp.
    InternalDate,
    /// Wire size in octets.
    Rfc822Size,
    /// Header summary (envelope).
    Envelope,
    /// The body tree.
    BodyStructure,
    /// The persistent identifier.
    Uid,
    /// Body section.
    Body {
        /// Section specifier; `None` fetches the whole source.
        section: Option<String>,
        /// Peek (don't set \Seen).
        peek: bool,
        /// Partial fetch window `<start.max_length>`.
        partial: Option<(u32, u32)>,
    },
    /// BINARY section (RFC 3516); always fetched with peek.
    Binary {
        /// Section specifier.
        section: Option<String>,
        /// Partial fetch window.
        partial: Option<(u32, u32)>,
    },
    /// MODSEQ.
    ModSeq,
    /// EMAILID (OBJECTID).
    EmailId,
    /// THREADID (OBJECTID).
    ThreadId,
    /// X-GM-MSGID (Gmail).
    GmMsgId,
    /// X-GM-THRID (Gmail).
    GmThreadId,
    /// X-GM-LABELS (Gmail).
    GmLabels,
}

/// What a STORE command changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    /// Add flags (`+FLAGS`).
    Add,
    /// Remove flags (`-FLAGS`).
    Remove,
    /// Replace flags (`FLAGS`).
    Set,
}

impl StoreOperation {
    pub(crate) const fn prefix(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Remove => "-",
            Self::Set => "",
        }
    }
}

/// STORE payload: system flags or Gmail labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreItems {
    /// Regular message flags.
    Flags(Vec<Flag>),
    /// Gmail labels (`X-GM-LABELS`, requires X-GM-EXT-1).
    GmLabels(Vec<String>),
}

impl StoreItems {
    /// Returns true if there is nothing to store.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Flags(flags) => flags.is_empty(),
            Self::GmLabels(labels) => labels.is_empty(),
        }
    }
}

/// QRESYNC parameters appended to SELECT/EXAMINE (RFC 7162).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QresyncParams {
    /// Last known UIDVALIDITY.
    pub uid_validity: UidValidity,
    /// Last known HIGHESTMODSEQ.
    pub modseq: ModSeq,
    /// Optional set of known UIDs for VANISHED reporting.
    pub known_uids: Option<SequenceSet>,
}

impl QresyncParams {
    /// Creates minimal QRESYNC parameters.
    #[must_use]
    pub const fn new(uid_validity: UidValidity, modseq: ModSeq) -> Self {
        Self {
            uid_validity,
            modseq,
            known_uids: None,
        }
    }

    /// Adds known UIDs to the parameters.
    #[must_use]
    pub fn with_known_uids(mut self, uids: SequenceSet) -> Self {
        self.known_uids = Some(uids);
        self
    }
}

/// SEARCH criteria, one node of the attribute list the encoder emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// CHARSET prefix, emitted first when non-ASCII values are present.
    Charset(String),
    /// All messages.
    All,
    /// Messages with \Answered flag.
    Answered,
    /// Messages without \Answered flag.
    Unanswered,
    /// Messages with \Deleted flag.
    Deleted,
    /// Messages without \Deleted flag.
    Undeleted,
    /// Messages with \Draft flag.
    Draft,
    /// Messages without \Draft flag.
    Undraft,
    /// Messages with \Flagged flag.
    Flagged,
    /// Messages without \Flagged flag.
    Unflagged,
    /// Messages with \Seen flag.
    Seen,
    /// Messages without \Seen flag.
    Unseen,
    /// Recent messages not yet seen.
    New,
    /// Messages seen in a previous session.
    Old,
    /// Messages with \Recent flag.
    Recent,
    /// Verbatim sequence set.
    SequenceSet(String),
    /// Verbatim UID set.
    UidSet(String),
    /// Messages with the given keyword flag.
    Keyword(String),
    /// Messages without the given keyword flag.
    Unkeyword(String),
    /// Subject contains text.
    Subject(String),
    /// From contains text.
    From(String),
    /// To contains text.
    To(String),
    /// Cc contains text.
    Cc(String),
    /// Bcc contains text.
    Bcc(String),
    /// Body contains text.
    Body(String),
    /// Text in header or body.
    Text(String),
    /// Messages received on or after date (`dd-Mon-yyyy`).
    Since(String),
    /// Messages received before date (`dd-Mon-yyyy`).
    Before(String),
    /// Messages received on date (`dd-Mon-yyyy`).
    On(String),
    /// Messages older than the given number of seconds (WITHIN).
    Older(u64),
    /// Messages younger than the given number of seconds (WITHIN).
    Younger(u64),
    /// Larger than size.
    Larger(u32),
    /// Smaller than size.
    Smaller(u32),
    /// Header field contains value; empty value tests existence.
    Header(String, String),
    /// Messages with mod-sequence greater or equal (CONDSTORE).
    ModSeq(u64),
    /// EMAILID (OBJECTID).
    EmailId(String),
    /// THREADID (OBJECTID).
    ThreadId(String),
    /// X-GM-MSGID (Gmail).
    GmMsgId(String),
    /// X-GM-THRID (Gmail).
    GmThreadId(String),
    /// X-GM-RAW (Gmail raw search syntax).
    GmRaw(String),
    /// OR of two criteria.
    Or(Box<Self>, Box<Self>),
    /// NOT of criteria.
    Not(Box<Self>),
    /// Adjacent criteria (implicit AND).
    And(Vec<Self>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_operation_prefixes() {
        assert_eq!(StoreOperation::Add.prefix(), "+");
        assert_eq!(StoreOperation::Remove.prefix(), "-");
        assert_eq!(StoreOperation::Set.prefix(), "");
    }

    #[test]
    fn store_items_emptiness() {
        assert!(StoreItems::Flags(vec![]).is_empty());
        assert!(!StoreItems::Flags(vec![Flag::Seen]).is_empty());
        assert!(StoreItems::GmLabels(vec![]).is_empty());
    }

    #[test]
    fn status_attribute_names() {
        assert_eq!(StatusAttribute::Messages.as_str(), "MESSAGES");
        assert_eq!(StatusAttribute::HighestModSeq.as_str(), "HIGHESTMODSEQ");
    }
}
