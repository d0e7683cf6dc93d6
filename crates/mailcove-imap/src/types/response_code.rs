//! Response codes.

use super::{Capability, Flags, ModSeq, SeqNum, SequenceSet, Uid, UidValidity};

/// The bracketed machine-readable part of a status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// ALERT: text the user is supposed to actually see.
    Alert,
    /// CAPABILITY: the set, volunteered without a round-trip.
    Capability(Vec<Capability>),
    /// PARSE: the server choked on a stored message.
    Parse,
    /// PERMANENTFLAGS: what survives the session (`\*` = anything).
    PermanentFlags(Flags),
    /// READ-ONLY: the selection cannot be written.
    ReadOnly,
    /// READ-WRITE: the selection accepts changes.
    ReadWrite,
    /// TRYCREATE: the target is missing but creatable.
    TryCreate,
    /// UIDNEXT: the UID the next delivery will get.
    UidNext(Uid),
    /// UIDVALIDITY: the mailbox generation marker.
    UidValidity(UidValidity),
    /// UNSEEN: the first unseen message.
    Unseen(SeqNum),
    /// APPENDUID: where the appended message landed (RFC 4315).
    AppendUid {
        /// Destination generation marker.
        uidvalidity: UidValidity,
        /// The new message's UID.
        uid: Uid,
    },
    /// COPYUID: how source UIDs map to the destination (RFC 4315).
    CopyUid {
        /// Destination generation marker.
        uidvalidity: UidValidity,
        /// The copied UIDs, as the server listed them.
        source: SequenceSet,
        /// Their destination UIDs, position for position.
        dest: SequenceSet,
    },
    /// HIGHESTMODSEQ: the modification high-water mark (CONDSTORE).
    HighestModSeq(ModSeq),
    /// NOMODSEQ: this mailbox does not track mod-sequences.
    NoModSeq,
    /// MAILBOXID: Opaque mailbox identifier (RFC 8474).
    MailboxId(String),
    /// ALREADYEXISTS: CREATE target already exists (RFC 5530).
    AlreadyExists,
    /// NONEXISTENT: Target mailbox does not exist (RFC 5530).
    NonExistent,
    /// THROTTLED: Client exceeded a server rate limit.
    Throttled,
    /// CLOSED: Previously selected mailbox was closed (QRESYNC).
    Closed,
    /// Unknown response code.
    Unknown(String),
}

impl ResponseCode {
    /// Returns the code's wire atom, for error reporting.
    #[must_use]
    pub fn atom(&self) -> &str {
        match self {
            Self::Alert => "ALERT",
            Self::Capability(_) => "CAPABILITY",
            Self::Parse => "PARSE",
            Self::PermanentFlags(_) => "PERMANENTFLAGS",
            Self::ReadOnly => "READ-ONLY",
            Self::ReadWrite => "READ-WRITE",
            Self::TryCreate => "TRYCREATE",
            Self::UidNext(_) => "UIDNEXT",
            Self::UidValidity(_) => "UIDVALIDITY",
            Self::Unseen(_) => "UNSEEN",
            Self::AppendUid { .. } => "APPENDUID",
            Self::CopyUid { .. } => "COPYUID",
            Self::HighestModSeq(_) => "HIGHESTMODSEQ",
            Self::NoModSeq => "NOMODSEQ",
            Self::MailboxId(_) => "MAILBOXID",
            Self::AlreadyExists => "ALREADYEXISTS",
            Self::NonExistent => "NONEXISTENT",
            Self::Throttled => "THROTTLED",
            Self::Closed => "CLOSED",
            Self::Unknown(s) => s,
        }
    }
}
