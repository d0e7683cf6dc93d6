//! IMAP command builder.
//!
//! This module provides types and serialization for IMAP commands.

mod serialize;
mod types;

use std::sync::atomic::{AtomicU32, Ordering};

use crate::types::{Flag, Mailbox, SequenceSet};

pub use serialize::{CommandSegment, CommandWriter};
pub use types::{
    FetchAttribute, FetchItems, QresyncParams, SearchCriteria, StatusAttribute, StoreItems,
    StoreOperation,
};

use serialize::{write_fetch_items, write_flag_list, write_search_criteria, write_store_items};

/// Hands out the per-command tags.
///
/// Tags only need to be unique within one connection; a prefix letter
/// plus a counter is plenty, and the counter doubles as a rough measure
/// of how many commands the connection has seen.
#[derive(Debug)]
pub struct TagGenerator {
    counter: AtomicU32,
    prefix: char,
}

impl TagGenerator {
    /// Creates a generator with the given prefix letter.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self {
            counter: AtomicU32::new(1),
            prefix,
        }
    }

    /// Returns the next tag.
    #[must_use]
    pub fn next(&self) -> String {
        format!(
            "{}{}",
            self.prefix,
            self.counter.fetch_add(1, Ordering::Relaxed)
        )
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('C')
    }
}

/// One client command, ready to serialise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Usable in any state
    /// Ask for the capability set.
    Capability,
    /// Do nothing (and collect any pending unsolicited data).
    Noop,
    /// End the session.
    Logout,
    /// Exchange implementation info (RFC 2971); `None` sends `ID NIL`.
    Id {
        /// Field-value pairs describing this client.
        parameters: Option<Vec<(String, String)>>,
    },

    // Before authentication
    /// Upgrade the transport to TLS.
    StartTls,
    /// Plaintext credentials.
    Login {
        /// Account name.
        username: String,
        /// Account secret.
        password: String,
    },
    /// SASL exchange.
    Authenticate {
        /// Mechanism name (PLAIN, LOGIN, XOAUTH2, ...).
        mechanism: String,
        /// Initial response, when SASL-IR lets it ride the command line.
        initial_response: Option<String>,
    },

    // After authentication
    /// Switch extensions on (RFC 5161).
    Enable {
        /// Extension names to request.
        capabilities: Vec<String>,
    },
    /// Start deflate framing (RFC 4978).
    Compress,
    /// Open a mailbox read-write.
    Select {
        /// Wire-encoded mailbox name.
        mailbox: Mailbox,
        /// Ask for CONDSTORE data with the selection.
        condstore: bool,
        /// Replay parameters for quick resynchronisation.
        qresync: Option<QresyncParams>,
    },
    /// Open a mailbox read-only.
    Examine {
        /// Wire-encoded mailbox name.
        mailbox: Mailbox,
        /// Replay parameters for quick resynchronisation.
        qresync: Option<QresyncParams>,
    },
    /// Make a mailbox.
    Create {
        /// Wire-encoded mailbox name.
        mailbox: Mailbox,
    },
    /// Remove a mailbox.
    Delete {
        /// Wire-encoded mailbox name.
        mailbox: Mailbox,
    },
    /// Rename a mailbox.
    Rename {
        /// Current name.
        from: Mailbox,
        /// New name.
        to: Mailbox,
    },
    /// Add a mailbox to the subscription list.
    Subscribe {
        /// Wire-encoded mailbox name.
        mailbox: Mailbox,
    },
    /// Drop a mailbox from the subscription list.
    Unsubscribe {
        /// Wire-encoded mailbox name.
        mailbox: Mailbox,
    },
    /// List folders, optionally with inline STATUS data.
    List {
        /// Reference prefix.
        reference: String,
        /// Match pattern.
        pattern: String,
        /// `RETURN (STATUS (...))` counters (needs LIST-STATUS).
        return_status: Option<Vec<StatusAttribute>>,
    },
    /// List subscribed folders.
    Lsub {
        /// Reference prefix.
        reference: String,
        /// Match pattern.
        pattern: String,
    },
    /// Gmail's role-tagged listing (pre-SPECIAL-USE).
    Xlist {
        /// Reference prefix.
        reference: String,
        /// Match pattern.
        pattern: String,
    },
    /// Discover the namespace layout.
    Namespace,
    /// Query counters without selecting.
    Status {
        /// Wire-encoded mailbox name.
        mailbox: Mailbox,
        /// Counters to request.
        items: Vec<StatusAttribute>,
    },
    /// Deliver a message into a mailbox.
    Append {
        /// Wire-encoded destination.
        mailbox: Mailbox,
        /// Flags for the new message.
        flags: Option<Vec<Flag>>,
        /// Delivery timestamp, pre-formatted.
        internal_date: Option<String>,
        /// Raw message source.
        message: Vec<u8>,
        /// Announce as literal8 (needs BINARY).
        literal8: bool,
    },
    /// Resolve a mailbox's quota roots (RFC 2087).
    GetQuotaRoot {
        /// Wire-encoded mailbox name.
        mailbox: Mailbox,
    },
    /// Read one quota root (RFC 2087).
    GetQuota {
        /// Root name.
        root: String,
    },

    // With a mailbox selected
    /// Expunge and deselect.
    Close,
    /// Deselect without expunging (RFC 3691).
    Unselect,
    /// Remove everything flagged \Deleted.
    Expunge,
    /// Remove only the given UIDs (RFC 4315).
    UidExpunge {
        /// The UIDs to remove.
        uids: SequenceSet,
    },
    /// Find messages.
    Search {
        /// Criteria, already in emission order.
        criteria: Vec<SearchCriteria>,
        /// Address by UID.
        uid: bool,
    },
    /// Read message data.
    Fetch {
        /// The addressed messages.
        sequence: SequenceSet,
        /// What to read.
        items: FetchItems,
        /// Address by UID.
        uid: bool,
        /// Only messages changed past this mod-sequence (CONDSTORE).
        changed_since: Option<u64>,
        /// Also report removals (QRESYNC, UID FETCH only).
        vanished: bool,
    },
    /// Change flags or labels.
    Store {
        /// The addressed messages.
        sequence: SequenceSet,
        /// Add, remove or set.
        operation: StoreOperation,
        /// The flags or Gmail labels to apply.
        items: StoreItems,
        /// Address by UID.
        uid: bool,
        /// Suppress the FETCH echo.
        silent: bool,
        /// Skip messages changed past this mod-sequence (CONDSTORE).
        unchanged_since: Option<u64>,
    },
    /// Copy messages elsewhere.
    Copy {
        /// The addressed messages.
        sequence: SequenceSet,
        /// Wire-encoded destination.
        mailbox: Mailbox,
        /// Address by UID.
        uid: bool,
    },
    /// Move messages elsewhere (RFC 6851).
    Move {
        /// The addressed messages.
        sequence: SequenceSet,
        /// Wire-encoded destination.
        mailbox: Mailbox,
        /// Address by UID.
        uid: bool,
    },
    /// Enter the push window (RFC 2177).
    Idle,
    /// Leave the push window.
    Done,
}

impl Command {
    /// Serializes the command into wire segments.
    ///
    /// Each segment ending in a synchronizing literal announcement must be
    /// followed by a `+` continuation from the server before the next
    /// segment is written. With `literal_plus` the whole command collapses
    /// into one segment.
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn serialize(&self, tag: &str, literal_plus: bool, utf8: bool) -> Vec<CommandSegment> {
        // DONE doesn't get a tag (it's sent during IDLE)
        let tag = if matches!(self, Self::Done) { "" } else { tag };
        let mut w = CommandWriter::new(tag, literal_plus, utf8);

        match self {
            Self::Capability => w.put(b"CAPABILITY"),
            Self::Noop => w.put(b"NOOP"),
            Self::Logout => w.put(b"LOGOUT"),
            Self::StartTls => w.put(b"STARTTLS"),
            Self::Compress => w.put(b"COMPRESS DEFLATE"),

            Self::Login { username, password } => {
                w.put(b"LOGIN ");
                w.put_astring(username);
                w.put(b" ");
                w.put_astring(password);
            }

            Self::Authenticate {
                mechanism,
                initial_response,
            } => {
                w.put(b"AUTHENTICATE ");
                w.put(mechanism.as_bytes());
                if let Some(resp) = initial_response {
                    w.put(b" ");
                    w.put(resp.as_bytes());
                }
            }

            Self::Id { parameters } => {
                w.put(b"ID ");
                if let Some(params) = parameters {
                    w.put(b"(");
                    for (i, (key, value)) in params.iter().enumerate() {
                        if i > 0 {
                            w.put(b" ");
                        }
                        w.put_astring(key);
                        w.put(b" ");
                        w.put_astring(value);
                    }
                    w.put(b")");
                } else {
                    w.put(b"NIL");
                }
            }

            Self::Enable { capabilities } => {
                w.put(b"ENABLE");
                for cap in capabilities {
                    w.put(b" ");
                    w.put(cap.as_bytes());
                }
            }

            Self::Select {
                mailbox,
                condstore,
                qresync,
            } => {
                w.put(b"SELECT ");
                w.put_astring(mailbox.as_str());
                if let Some(params) = qresync {
                    write_qresync_params(&mut w, params);
                } else if *condstore {
                    w.put(b" (CONDSTORE)");
                }
            }

            Self::Examine { mailbox, qresync } => {
                w.put(b"EXAMINE ");
                w.put_astring(mailbox.as_str());
                if let Some(params) = qresync {
                    write_qresync_params(&mut w, params);
                }
            }

            Self::Create { mailbox } => {
                w.put(b"CREATE ");
                w.put_astring(mailbox.as_str());
            }

            Self::Delete { mailbox } => {
                w.put(b"DELETE ");
                w.put_astring(mailbox.as_str());
            }

            Self::Rename { from, to } => {
                w.put(b"RENAME ");
                w.put_astring(from.as_str());
                w.put(b" ");
                w.put_astring(to.as_str());
            }

            Self::Subscribe { mailbox } => {
                w.put(b"SUBSCRIBE ");
                w.put_astring(mailbox.as_str());
            }

            Self::Unsubscribe { mailbox } => {
                w.put(b"UNSUBSCRIBE ");
                w.put_astring(mailbox.as_str());
            }

            Self::List {
                reference,
                pattern,
                return_status,
            } => {
                w.put(b"LIST ");
                w.put_astring(reference);
                w.put(b" ");
                w.put_astring(pattern);
                if let Some(items) = return_status {
                    w.put(b" RETURN (STATUS (");
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            w.put(b" ");
                        }
                        w.put(item.as_str().as_bytes());
                    }
                    w.put(b"))");
                }
            }

            Self::Lsub { reference, pattern } => {
                w.put(b"LSUB ");
                w.put_astring(reference);
                w.put(b" ");
                w.put_astring(pattern);
            }

            Self::Xlist { reference, pattern } => {
                w.put(b"XLIST ");
                w.put_astring(reference);
                w.put(b" ");
                w.put_astring(pattern);
            }

            Self::Namespace => w.put(b"NAMESPACE"),

            Self::Status { mailbox, items } => {
                w.put(b"STATUS ");
                w.put_astring(mailbox.as_str());
                w.put(b" (");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        w.put(b" ");
                    }
                    w.put(item.as_str().as_bytes());
                }
                w.put(b")");
            }

            Self::Append {
                mailbox,
                flags,
                internal_date,
                message,
                literal8,
            } => {
                w.put(b"APPEND ");
                w.put_astring(mailbox.as_str());
                if let Some(flags) = flags {
                    w.put(b" ");
                    write_flag_list(&mut w, flags);
                }
                if let Some(date) = internal_date {
                    w.put(b" \"");
                    w.put(date.as_bytes());
                    w.put(b"\"");
                }
                w.put(b" ");
                w.put_literal(message, *literal8);
            }

            Self::GetQuotaRoot { mailbox } => {
                w.put(b"GETQUOTAROOT ");
                w.put_astring(mailbox.as_str());
            }

            Self::GetQuota { root } => {
                w.put(b"GETQUOTA ");
                w.put_astring(root);
            }

            Self::Close => w.put(b"CLOSE"),
            Self::Unselect => w.put(b"UNSELECT"),
            Self::Expunge => w.put(b"EXPUNGE"),

            Self::UidExpunge { uids } => {
                w.put(b"UID EXPUNGE ");
                w.put(uids.to_string().as_bytes());
            }

            Self::Search { criteria, uid } => {
                if *uid {
                    w.put(b"UID ");
                }
                w.put(b"SEARCH");
                for c in criteria {
                    w.put(b" ");
                    write_search_criteria(&mut w, c);
                }
            }

            Self::Fetch {
                sequence,
                items,
                uid,
                changed_since,
                vanished,
            } => {
                if *uid {
                    w.put(b"UID ");
                }
                w.put(b"FETCH ");
                w.put(sequence.to_string().as_bytes());
                w.put(b" ");
                write_fetch_items(&mut w, items);
                if let Some(modseq) = changed_since {
                    w.put(format!(" (CHANGEDSINCE {modseq}").as_bytes());
                    if *vanished {
                        w.put(b" VANISHED");
                    }
                    w.put(b")");
                }
            }

            Self::Store {
                sequence,
                operation,
                items,
                uid,
                silent,
                unchanged_since,
            } => {
                if *uid {
                    w.put(b"UID ");
                }
                w.put(b"STORE ");
                w.put(sequence.to_string().as_bytes());
                w.put(b" ");
                if let Some(modseq) = unchanged_since {
                    w.put(format!("(UNCHANGEDSINCE {modseq}) ").as_bytes());
                }
                write_store_items(&mut w, *operation, items, *silent);
            }

            Self::Copy {
                sequence,
                mailbox,
                uid,
            } => {
                if *uid {
                    w.put(b"UID ");
                }
                w.put(b"COPY ");
                w.put(sequence.to_string().as_bytes());
                w.put(b" ");
                w.put_astring(mailbox.as_str());
            }

            Self::Move {
                sequence,
                mailbox,
                uid,
            } => {
                if *uid {
                    w.put(b"UID ");
                }
                w.put(b"MOVE ");
                w.put(sequence.to_string().as_bytes());
                w.put(b" ");
                w.put_astring(mailbox.as_str());
            }

            Self::Idle => w.put(b"IDLE"),
            Self::Done => w.put(b"DONE"),
        }

        w.finish()
    }

    /// Serializes a command known to contain no literals into one buffer.
    #[must_use]
    pub fn serialize_flat(&self, tag: &str) -> Vec<u8> {
        let mut out = Vec::new();
        for segment in self.serialize(tag, true, false) {
            out.extend_from_slice(&segment.bytes);
        }
        out
    }
}

fn write_qresync_params(w: &mut CommandWriter, params: &QresyncParams) {
    w.put(
        format!(
            " (QRESYNC ({} {}",
            params.uid_validity.get(),
            params.modseq.get()
        )
        .as_bytes(),
    );
    if let Some(uids) = &params.known_uids {
        w.put(b" ");
        w.put(uids.to_string().as_bytes());
    }
    w.put(b"))");
}
