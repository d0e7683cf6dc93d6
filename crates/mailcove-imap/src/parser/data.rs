//! Parsed response data.
//!
//! One enum per layer: [`UntaggedResponse`] for server data lines,
//! [`FetchField`] for the pieces of a FETCH result, and plain structs for
//! the envelope and body tree. Status conditions (OK/NO/BAD/PREAUTH/BYE)
//! share a single variant since they only differ in their [`Status`].

use crate::types::{
    Capability, Flags, ListResponse, Mailbox, ModSeq, Namespaces, ResponseCode, SeqNum,
    SequenceSet, Status, Uid, UidValidity,
};

/// Which listing command produced a listing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
    /// LIST.
    List,
    /// LSUB.
    Lsub,
    /// XLIST (Gmail folder roles).
    Xlist,
}

/// One untagged server response.
#[derive(Debug, Clone, PartialEq)]
pub enum UntaggedResponse {
    /// A status condition: `* OK`, `* NO`, `* BAD`, `* PREAUTH`, `* BYE`.
    Condition {
        /// Which condition.
        status: Status,
        /// Bracketed response code, when present.
        code: Option<ResponseCode>,
        /// Free text after the code.
        text: String,
    },
    /// `* CAPABILITY ...`
    Capability(Vec<Capability>),
    /// A LIST/LSUB/XLIST line.
    Listing {
        /// The command family that produced it.
        source: ListSource,
        /// The folder entry.
        entry: ListResponse,
    },
    /// `* FLAGS (...)` for the selected mailbox.
    Flags(Flags),
    /// `* N EXISTS`
    Exists(u32),
    /// `* N RECENT`
    Recent(u32),
    /// `* N EXPUNGE`
    Expunge(SeqNum),
    /// `* VANISHED [(EARLIER)] uids` (QRESYNC).
    Vanished {
        /// Removals happened before this session (selection replay).
        earlier: bool,
        /// The removed UIDs, as the server listed them.
        uids: SequenceSet,
    },
    /// `* N FETCH (...)`
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// The returned data fields.
        fields: Vec<FetchField>,
    },
    /// `* SEARCH n n n ...`
    Search(Vec<u32>),
    /// `* STATUS mailbox (...)`
    Status {
        /// Mailbox, as listed on the wire.
        mailbox: Mailbox,
        /// Returned counters.
        items: Vec<StatusItem>,
    },
    /// `* ENABLED ...` (RFC 5161).
    Enabled(Vec<String>),
    /// `* NAMESPACE ...` (RFC 2342).
    Namespace(Namespaces),
    /// `* ID ...` (RFC 2971); `None` for `ID NIL`.
    Id(Option<Vec<(String, String)>>),
    /// `* QUOTA root (...)` (RFC 2087).
    Quota {
        /// Quota root name.
        root: String,
        /// Per-resource usage and limits.
        resources: Vec<QuotaResource>,
    },
    /// `* QUOTAROOT mailbox root*` (RFC 2087).
    QuotaRoot {
        /// Mailbox the roots apply to.
        mailbox: Mailbox,
        /// Quota root names.
        roots: Vec<String>,
    },
}

/// One field of a FETCH result.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchField {
    /// Message flags.
    Flags(Flags),
    /// Message UID.
    Uid(Uid),
    /// Internal date, verbatim.
    InternalDate(String),
    /// RFC822.SIZE.
    Size(u32),
    /// Envelope.
    Envelope(Box<Envelope>),
    /// Body structure tree.
    BodyStructure(Box<BodyStructure>),
    /// Content of one `BODY[...]` section.
    Section {
        /// Section specifier; `None` is the whole message.
        section: Option<String>,
        /// Origin offset of a partial fetch.
        origin: Option<u32>,
        /// The bytes, absent for NIL.
        data: Option<Vec<u8>>,
    },
    /// Decoded content of one `BINARY[...]` section (RFC 3516).
    Binary {
        /// Section specifier.
        section: Option<String>,
        /// The bytes, absent for NIL.
        data: Option<Vec<u8>>,
    },
    /// MODSEQ (CONDSTORE).
    ModSeq(ModSeq),
    /// EMAILID (OBJECTID, RFC 8474).
    EmailId(String),
    /// THREADID (OBJECTID, RFC 8474).
    ThreadId(String),
    /// X-GM-MSGID (Gmail).
    GmMsgId(u64),
    /// X-GM-THRID (Gmail).
    GmThreadId(u64),
    /// X-GM-LABELS (Gmail).
    GmLabels(Vec<String>),
}

/// Message envelope, field order as the wire delivers it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    /// Date header, verbatim.
    pub date: Option<String>,
    /// Subject header.
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<Address>,
    /// Sender addresses.
    pub sender: Vec<Address>,
    /// Reply-To addresses.
    pub reply_to: Vec<Address>,
    /// To addresses.
    pub to: Vec<Address>,
    /// Cc addresses.
    pub cc: Vec<Address>,
    /// Bcc addresses.
    pub bcc: Vec<Address>,
    /// In-Reply-To header.
    pub in_reply_to: Option<String>,
    /// Message-ID header.
    pub message_id: Option<String>,
}

/// One address from an envelope address list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Display name.
    pub name: Option<String>,
    /// Source route (obsolete, kept for wire fidelity).
    pub route: Option<String>,
    /// Local part.
    pub mailbox: Option<String>,
    /// Domain part.
    pub host: Option<String>,
}

impl Address {
    /// Joins local and domain part into `local@domain`.
    #[must_use]
    pub fn address(&self) -> Option<String> {
        Some(format!("{}@{}", self.mailbox.as_ref()?, self.host.as_ref()?))
    }
}

/// A node of the BODYSTRUCTURE tree.
///
/// Multiparts carry their children in `parts` with a `MULTIPART` media
/// type; leaves carry the content metadata. The optional extension data
/// (MD5, disposition, language, location) is not modelled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BodyStructure {
    /// Media type, uppercased (`TEXT`, `IMAGE`, `MULTIPART`, ...).
    pub media_type: String,
    /// Media subtype, uppercased.
    pub media_subtype: String,
    /// Body parameters (charset, name, boundary, ...).
    pub params: Vec<(String, String)>,
    /// Content-ID.
    pub id: Option<String>,
    /// Content-Description.
    pub description: Option<String>,
    /// Content-Transfer-Encoding.
    pub encoding: Option<String>,
    /// Size in octets; absent for multiparts.
    pub size: Option<u32>,
    /// Size in lines, for `TEXT` parts.
    pub lines: Option<u32>,
    /// Child parts of a multipart.
    pub parts: Vec<BodyStructure>,
}

impl BodyStructure {
    /// True for multipart nodes.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        !self.parts.is_empty()
    }
}

/// One counter from a STATUS response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusItem {
    /// MESSAGES.
    Messages(u32),
    /// RECENT.
    Recent(u32),
    /// UIDNEXT.
    UidNext(Uid),
    /// UIDVALIDITY.
    UidValidity(UidValidity),
    /// UNSEEN.
    Unseen(u32),
    /// HIGHESTMODSEQ (CONDSTORE).
    HighestModSeq(ModSeq),
}

/// One QUOTA resource line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaResource {
    /// Resource name (STORAGE, MESSAGE, ...).
    pub name: String,
    /// Current usage.
    pub usage: u64,
    /// Resource limit.
    pub limit: u64,
}

/// Convenience for matching a condition against the mailbox cache.
impl UntaggedResponse {
    /// Returns the response code of an OK condition, if any.
    #[must_use]
    pub fn ok_code(&self) -> Option<&ResponseCode> {
        match self {
            Self::Condition {
                status: Status::Ok,
                code: Some(code),
                ..
            } => Some(code),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn address_joins_both_parts() {
        let addr = Address {
            name: Some("Maintainer".to_string()),
            route: None,
            mailbox: Some("mail".to_string()),
            host: Some("example.org".to_string()),
        };
        assert_eq!(addr.address(), Some("mail@example.org".to_string()));

        let partial = Address {
            name: None,
            route: None,
            mailbox: Some("mail".to_string()),
            host: None,
        };
        assert_eq!(partial.address(), None);
    }

    #[test]
    fn body_structure_classifies_multiparts() {
        let leaf = BodyStructure {
            media_type: "TEXT".to_string(),
            media_subtype: "PLAIN".to_string(),
            size: Some(120),
            lines: Some(4),
            ..BodyStructure::default()
        };
        assert!(!leaf.is_multipart());

        let tree = BodyStructure {
            media_type: "MULTIPART".to_string(),
            media_subtype: "ALTERNATIVE".to_string(),
            parts: vec![leaf],
            ..BodyStructure::default()
        };
        assert!(tree.is_multipart());
    }

    #[test]
    fn ok_code_only_matches_ok_conditions() {
        let ok = UntaggedResponse::Condition {
            status: Status::Ok,
            code: Some(ResponseCode::ReadOnly),
            text: String::new(),
        };
        assert_eq!(ok.ok_code(), Some(&ResponseCode::ReadOnly));

        let no = UntaggedResponse::Condition {
            status: Status::No,
            code: Some(ResponseCode::ReadOnly),
            text: String::new(),
        };
        assert_eq!(no.ok_code(), None);
    }

    #[test]
    fn vanished_keeps_raw_uid_set() {
        let resp = UntaggedResponse::Vanished {
            earlier: true,
            uids: SequenceSet::parse("300:310,405").unwrap(),
        };
        if let UntaggedResponse::Vanished { earlier, uids } = resp {
            assert!(earlier);
            assert_eq!(uids.expand().unwrap().len(), 12);
        } else {
            panic!("expected Vanished");
        }
    }
}
