//! Mailbox types.

use super::{Flags, ModSeq, SeqNum, Uid, UidValidity};

/// A mailbox name in its wire spelling (already modified-UTF-7 encoded
/// on pre-UTF8 connections).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox(String);

impl Mailbox {
    /// Wraps a wire-ready name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The inbox, under its canonical spelling.
    #[must_use]
    pub fn inbox() -> Self {
        Self::new("INBOX")
    }

    /// The wire spelling.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Live state of the currently selected mailbox.
///
/// Populated by SELECT/EXAMINE and kept consistent with server-pushed
/// EXISTS, EXPUNGE, VANISHED and FETCH responses. `uid_validity` never
/// changes within one selection; `highest_modseq` only moves upward.
#[derive(Debug, Clone, Default)]
pub struct SelectedMailbox {
    /// Unicode mailbox path.
    pub path: String,
    /// Hierarchy delimiter, when known from the folder listing.
    pub delimiter: Option<char>,
    /// Flags defined for this mailbox.
    pub flags: Flags,
    /// Flags that can be permanently stored (`\*` means any).
    pub permanent_flags: Flags,
    /// Number of messages in the mailbox.
    pub exists: u32,
    /// Number of recent messages.
    pub recent: u32,
    /// First unseen message sequence number.
    pub unseen: Option<SeqNum>,
    /// Next UID to be assigned.
    pub uid_next: Option<Uid>,
    /// UIDVALIDITY value.
    pub uid_validity: Option<UidValidity>,
    /// Highest mod-sequence; absent when the server sent NOMODSEQ.
    pub highest_modseq: Option<ModSeq>,
    /// Server declared the mailbox does not track mod-sequences.
    pub no_modseq: bool,
    /// Whether the mailbox was opened read-only (EXAMINE).
    pub read_only: bool,
    /// Opaque mailbox identifier (OBJECTID).
    pub mailbox_id: Option<String>,
    /// Special-use role, when known from the folder listing.
    pub special_use: Option<MailboxAttribute>,
}

impl SelectedMailbox {
    /// Creates a fresh record for a mailbox about to be selected.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Returns true if the given flag may be stored on messages here.
    ///
    /// Permitted when PERMANENTFLAGS contains `\*`, or the flag appears in
    /// either the permanent or the session flag list.
    #[must_use]
    pub fn allows_flag(&self, flag: &super::Flag) -> bool {
        self.permanent_flags.allows_any()
            || self.permanent_flags.contains(flag)
            || self.flags.contains(flag)
    }
}

/// STATUS command result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Unicode mailbox path.
    pub path: String,
    /// Number of messages.
    pub messages: Option<u32>,
    /// Number of recent messages.
    pub recent: Option<u32>,
    /// Next UID to be assigned.
    pub uid_next: Option<Uid>,
    /// UIDVALIDITY value.
    pub uid_validity: Option<UidValidity>,
    /// Number of unseen messages.
    pub unseen: Option<u32>,
    /// Highest mod-sequence (CONDSTORE).
    pub highest_modseq: Option<ModSeq>,
}

/// LIST/LSUB/XLIST response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResponse {
    /// Mailbox attributes.
    pub attributes: Vec<MailboxAttribute>,
    /// Hierarchy delimiter.
    pub delimiter: Option<char>,
    /// Mailbox name as listed on the wire.
    pub mailbox: Mailbox,
}

/// An entry in the folder tree assembled from LIST and LSUB.
#[derive(Debug, Clone, Default)]
pub struct Folder {
    /// Canonical unicode path.
    pub path: String,
    /// Path exactly as the server listed it (pre-decoding).
    pub path_as_listed: String,
    /// Last path segment.
    pub name: String,
    /// Parent path segments, outermost first.
    pub parent: Vec<String>,
    /// Hierarchy delimiter.
    pub delimiter: Option<char>,
    /// Attributes from the LIST response.
    pub attributes: Vec<MailboxAttribute>,
    /// Special-use role, from attributes or the name-match table.
    pub special_use: Option<MailboxAttribute>,
    /// Present in the LIST output.
    pub listed: bool,
    /// Present in the LSUB output (or forced for INBOX).
    pub subscribed: bool,
    /// STATUS values, when requested with the listing.
    pub status: Option<MailboxStatus>,
    /// STATUS error text for folders whose STATUS query failed.
    pub status_error: Option<String>,
}

/// One attribute word from a listing line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MailboxAttribute {
    /// Not selectable (a pure hierarchy node).
    NoSelect,
    /// Leaf folder.
    HasNoChildren,
    /// Has child folders.
    HasChildren,
    /// Flagged interesting by the server.
    Marked,
    /// Nothing new since last selection.
    Unmarked,
    // Folder roles (RFC 6154; \Inbox only ever comes from XLIST)
    /// The inbox role.
    Inbox,
    /// The virtual everything folder.
    All,
    /// Where archived mail goes.
    Archive,
    /// Where unfinished drafts live.
    Drafts,
    /// The virtual starred/flagged folder.
    Flagged,
    /// Where spam is quarantined.
    Junk,
    /// Where sent copies land.
    Sent,
    /// Where deleted mail waits.
    Trash,
    /// The priority folder (RFC 8457).
    Important,
    /// Carried by LIST-EXTENDED subscription output.
    Subscribed,
    /// Anything not modelled above, spelling preserved.
    Unknown(String),
}

impl MailboxAttribute {
    /// Parses one attribute word from a listing line.
    ///
    /// The leading backslash is tolerated but not required; unknown
    /// attributes keep their original spelling.
    #[must_use]
    pub fn parse(word: &str) -> Self {
        let name = word.strip_prefix('\\').unwrap_or(word);
        match name.to_ascii_lowercase().as_str() {
            "noselect" => Self::NoSelect,
            "hasnochildren" => Self::HasNoChildren,
            "haschildren" => Self::HasChildren,
            "marked" => Self::Marked,
            "unmarked" => Self::Unmarked,
            "inbox" => Self::Inbox,
            // RFC 6154 SPECIAL-USE (plus the pre-standard spellings)
            "all" | "allmail" => Self::All,
            "archive" => Self::Archive,
            "drafts" => Self::Drafts,
            "flagged" | "starred" => Self::Flagged,
            "junk" | "spam" => Self::Junk,
            "sent" => Self::Sent,
            "trash" => Self::Trash,
            // RFC 8457
            "important" => Self::Important,
            "subscribed" => Self::Subscribed,
            _ => Self::Unknown(word.to_string()),
        }
    }

    /// Returns true for the special-use role attributes.
    #[must_use]
    pub fn is_special_use(&self) -> bool {
        matches!(
            self,
            Self::Inbox
                | Self::All
                | Self::Archive
                | Self::Drafts
                | Self::Flagged
                | Self::Junk
                | Self::Sent
                | Self::Trash
                | Self::Important
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Flag;

    #[test]
    fn inbox_constant() {
        assert_eq!(Mailbox::inbox().as_str(), "INBOX");
    }

    #[test]
    fn selected_mailbox_defaults() {
        let mailbox = SelectedMailbox::new("INBOX");
        assert_eq!(mailbox.path, "INBOX");
        assert_eq!(mailbox.exists, 0);
        assert!(mailbox.uid_validity.is_none());
        assert!(!mailbox.read_only);
    }

    #[test]
    fn allows_flag_with_wildcard() {
        let mut mailbox = SelectedMailbox::new("INBOX");
        mailbox.permanent_flags.insert(Flag::Wildcard);
        assert!(mailbox.allows_flag(&Flag::Keyword("$Label1".to_string())));
    }

    #[test]
    fn allows_flag_from_session_flags() {
        let mut mailbox = SelectedMailbox::new("INBOX");
        mailbox.flags.insert(Flag::Seen);
        assert!(mailbox.allows_flag(&Flag::Seen));
        assert!(!mailbox.allows_flag(&Flag::Keyword("$Label1".to_string())));
    }

    #[test]
    fn parse_attributes() {
        assert_eq!(
            MailboxAttribute::parse("\\NoSelect"),
            MailboxAttribute::NoSelect
        );
        assert_eq!(MailboxAttribute::parse("\\Spam"), MailboxAttribute::Junk);
        assert_eq!(MailboxAttribute::parse("\\Inbox"), MailboxAttribute::Inbox);
        assert_eq!(
            MailboxAttribute::parse("\\Custom"),
            MailboxAttribute::Unknown("\\Custom".to_string())
        );
    }

    #[test]
    fn special_use_classification() {
        assert!(MailboxAttribute::Trash.is_special_use());
        assert!(MailboxAttribute::Inbox.is_special_use());
        assert!(!MailboxAttribute::NoSelect.is_special_use());
        assert!(!MailboxAttribute::Subscribed.is_special_use());
    }
}
