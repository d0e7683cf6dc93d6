//! Mailbox path handling.
//!
//! Callers see unicode paths; the wire sees modified-UTF-7 (RFC 3501
//! § 5.1.3) until UTF8=ACCEPT is enabled. This module owns the boundary
//! conversion, the INBOX normalisation, the special-use name heuristics
//! and the folder sort order used by the listing operation.

use utf7_imap::{decode_utf7_imap, encode_utf7_imap};

use crate::types::{Folder, MailboxAttribute};

/// Normalises a caller-supplied path for the wire.
///
/// Strips a leading delimiter, maps any spelling of the inbox to `INBOX`,
/// and encodes to modified-UTF-7 unless the connection runs UTF8=ACCEPT.
#[must_use]
pub fn normalize_path(path: &str, delimiter: Option<char>, utf8: bool) -> String {
    let mut path = path.to_string();
    if let Some(delimiter) = delimiter
        && let Some(stripped) = path.strip_prefix(delimiter)
    {
        path = stripped.to_string();
    }

    if path.eq_ignore_ascii_case("INBOX") {
        return "INBOX".to_string();
    }

    if utf8 {
        path
    } else {
        encode_utf7_imap(path)
    }
}

/// Decodes a listed path back to unicode.
#[must_use]
pub fn decode_path(path: &str, utf8: bool) -> String {
    if path.eq_ignore_ascii_case("INBOX") {
        return "INBOX".to_string();
    }

    if utf8 {
        path.to_string()
    } else {
        decode_utf7_imap(path.to_string())
    }
}

/// Guesses a special-use role from a folder name.
///
/// Static lookup for servers that advertise neither SPECIAL-USE nor XLIST;
/// matches the localised names the big providers actually use.
#[must_use]
pub fn special_use_for_name(name: &str) -> Option<MailboxAttribute> {
    let lower = name.to_lowercase();
    match lower.as_str() {
        "sent" | "sent mail" | "sent items" | "sent messages" => Some(MailboxAttribute::Sent),
        "drafts" | "draft" => Some(MailboxAttribute::Drafts),
        "trash" | "deleted" | "deleted items" | "deleted messages" => Some(MailboxAttribute::Trash),
        "junk" | "spam" | "junk mail" | "bulk mail" => Some(MailboxAttribute::Junk),
        "archive" | "archives" => Some(MailboxAttribute::Archive),
        "all mail" | "all" => Some(MailboxAttribute::All),
        "starred" | "flagged" => Some(MailboxAttribute::Flagged),
        "important" => Some(MailboxAttribute::Important),
        _ => None,
    }
}

/// Fixed ordering of special-use roles for folder listings.
fn special_use_rank(attr: &MailboxAttribute) -> usize {
    match attr {
        MailboxAttribute::Inbox => 0,
        MailboxAttribute::Drafts => 1,
        MailboxAttribute::Sent => 2,
        MailboxAttribute::Junk => 3,
        MailboxAttribute::Trash => 4,
        MailboxAttribute::Archive => 5,
        MailboxAttribute::Flagged => 6,
        MailboxAttribute::All => 7,
        _ => 8,
    }
}

/// Sorts a folder listing in place.
///
/// Folders with a special-use role come first in a fixed priority order,
/// then the rest alphabetically by path; for a shared parent the shorter
/// path sorts first.
pub fn sort_folders(folders: &mut [Folder]) {
    folders.sort_by(|a, b| {
        let rank_a = a.special_use.as_ref().map_or(9, special_use_rank);
        let rank_b = b.special_use.as_ref().map_or(9, special_use_rank);

        rank_a
            .cmp(&rank_b)
            .then_with(|| a.path.to_lowercase().cmp(&b.path.to_lowercase()))
            .then_with(|| a.path.len().cmp(&b.path.len()))
    });
}

/// Splits a listed path into parent segments and leaf name.
#[must_use]
pub fn split_path(path: &str, delimiter: Option<char>) -> (Vec<String>, String) {
    let Some(delimiter) = delimiter else {
        return (Vec::new(), path.to_string());
    };

    let mut segments: Vec<String> = path.split(delimiter).map(str::to_string).collect();
    let name = segments.pop().unwrap_or_default();
    (segments, name)
}
