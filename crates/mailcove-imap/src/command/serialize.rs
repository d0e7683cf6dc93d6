//! Command serialization.
//!
//! IMAP commands are written as segments: every string that cannot travel
//! as an atom or quoted string becomes a literal, and the bytes up to and
//! including its `{N}\r\n` announcement form one segment. The client must
//! wait for a `+` continuation after each announcing segment before
//! writing the next, unless the server advertises LITERAL+.

use super::types::{
    FetchAttribute, FetchItems, SearchCriteria, StoreItems, StoreOperation,
};
use crate::types::Flag;

/// Strings longer than this always travel as literals.
const QUOTED_STRING_MAX: usize = 1024;

/// One contiguous chunk of a serialized command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSegment {
    /// Raw bytes to put on the wire.
    pub bytes: Vec<u8>,
    /// The segment ends with a synchronizing `{N}\r\n`; the next segment
    /// must not be written until the server sends `+`.
    pub awaits_continuation: bool,
}

/// Incremental command writer with literal segmentation.
pub struct CommandWriter {
    segments: Vec<CommandSegment>,
    current: Vec<u8>,
    /// LITERAL+ lets us skip the continuation round-trip.
    literal_plus: bool,
    /// UTF8=ACCEPT permits non-ASCII quoted strings.
    utf8: bool,
}

impl CommandWriter {
    /// Creates a writer for one command line.
    #[must_use]
    pub fn new(tag: &str, literal_plus: bool, utf8: bool) -> Self {
        let mut writer = Self {
            segments: Vec::new(),
            current: Vec::new(),
            literal_plus,
            utf8,
        };
        if !tag.is_empty() {
            writer.put(tag.as_bytes());
            writer.put(b" ");
        }
        writer
    }

    /// Appends raw bytes to the current segment.
    pub fn put(&mut self, bytes: &[u8]) {
        self.current.extend_from_slice(bytes);
    }

    /// Appends a string as atom, quoted string, or literal.
    pub fn put_astring(&mut self, s: &str) {
        if needs_literal(s, self.utf8) {
            self.put_literal(s.as_bytes(), false);
        } else if s.is_empty() || s.bytes().any(needs_quoting) {
            self.current.push(b'"');
            for b in s.bytes() {
                if b == b'"' || b == b'\\' {
                    self.current.push(b'\\');
                }
                self.current.push(b);
            }
            self.current.push(b'"');
        } else {
            self.current.extend_from_slice(s.as_bytes());
        }
    }

    /// Appends a literal: `{N}\r\n<payload>` (or `~{N}` for literal8).
    ///
    /// Cuts a segment boundary after the announcement so the caller can
    /// pause for the continuation.
    pub fn put_literal(&mut self, data: &[u8], literal8: bool) {
        if literal8 {
            self.current.push(b'~');
        }
        if self.literal_plus {
            self.current
                .extend_from_slice(format!("{{{}+}}\r\n", data.len()).as_bytes());
        } else {
            self.current
                .extend_from_slice(format!("{{{}}}\r\n", data.len()).as_bytes());
        }
        self.segments.push(CommandSegment {
            bytes: std::mem::take(&mut self.current),
            awaits_continuation: !self.literal_plus,
        });
        self.current.extend_from_slice(data);
    }

    /// Terminates the command line and returns the segments.
    #[must_use]
    pub fn finish(mut self) -> Vec<CommandSegment> {
        self.current.extend_from_slice(b"\r\n");
        self.segments.push(CommandSegment {
            bytes: self.current,
            awaits_continuation: false,
        });
        self.segments
    }
}

/// Returns true if the string must travel as a literal.
fn needs_literal(s: &str, utf8: bool) -> bool {
    s.bytes().any(|b| b == b'\r' || b == b'\n')
        || (!utf8 && s.bytes().any(|b| b > 0x7F))
        || s.len() > QUOTED_STRING_MAX
}

/// Returns true if the byte needs quoting.
const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*') || b < 0x20 || b == 0x7F
}

/// Writes a flag list: `(\Seen \Flagged)`.
pub fn write_flag_list(writer: &mut CommandWriter, flags: &[Flag]) {
    writer.put(b"(");
    for (i, flag) in flags.iter().enumerate() {
        if i > 0 {
            writer.put(b" ");
        }
        writer.put(flag.as_imap().as_bytes());
    }
    writer.put(b")");
}

/// Writes FETCH items.
pub fn write_fetch_items(writer: &mut CommandWriter, items: &FetchItems) {
    match items {
        FetchItems::All => writer.put(b"ALL"),
        FetchItems::Full => writer.put(b"FULL"),
        FetchItems::Fast => writer.put(b"FAST"),
        FetchItems::Items(attrs) => {
            if let [attr] = attrs.as_slice() {
                write_fetch_attribute(writer, attr);
            } else {
                writer.put(b"(");
                for (i, attr) in attrs.iter().enumerate() {
                    if i > 0 {
                        writer.put(b" ");
                    }
                    write_fetch_attribute(writer, attr);
                }
                writer.put(b")");
            }
        }
    }
}

/// Writes a single FETCH attribute.
pub fn write_fetch_attribute(writer: &mut CommandWriter, attr: &FetchAttribute) {
    match attr {
        FetchAttribute::Flags => writer.put(b"FLAGS"),
        FetchAttribute::InternalDate => writer.put(b"INTERNALDATE"),
        FetchAttribute::Rfc822Size => writer.put(b"RFC822.SIZE"),
        FetchAttribute::Envelope => writer.put(b"ENVELOPE"),
        FetchAttribute::BodyStructure => writer.put(b"BODYSTRUCTURE"),
        FetchAttribute::Uid => writer.put(b"UID"),
        FetchAttribute::ModSeq => writer.put(b"MODSEQ"),
        FetchAttribute::EmailId => writer.put(b"EMAILID"),
        FetchAttribute::ThreadId => writer.put(b"THREADID"),
        FetchAttribute::GmMsgId => writer.put(b"X-GM-MSGID"),
        FetchAttribute::GmThreadId => writer.put(b"X-GM-THRID"),
        FetchAttribute::GmLabels => writer.put(b"X-GM-LABELS"),
        FetchAttribute::Body {
            section,
            peek,
            partial,
        } => {
            if *peek {
                writer.put(b"BODY.PEEK[");
            } else {
                writer.put(b"BODY[");
            }
            if let Some(s) = section {
                writer.put(s.as_bytes());
            }
            writer.put(b"]");
            if let Some((start, len)) = partial {
                writer.put(format!("<{start}.{len}>").as_bytes());
            }
        }
        FetchAttribute::Binary { section, partial } => {
            writer.put(b"BINARY.PEEK[");
            if let Some(s) = section {
                writer.put(s.as_bytes());
            }
            writer.put(b"]");
            if let Some((start, len)) = partial {
                writer.put(format!("<{start}.{len}>").as_bytes());
            }
        }
    }
}

/// Writes a STORE item name and value list.
pub fn write_store_items(
    writer: &mut CommandWriter,
    operation: StoreOperation,
    items: &StoreItems,
    silent: bool,
) {
    writer.put(operation.prefix().as_bytes());
    match items {
        StoreItems::Flags(flags) => {
            writer.put(b"FLAGS");
            if silent {
                writer.put(b".SILENT");
            }
            writer.put(b" ");
            write_flag_list(writer, flags);
        }
        StoreItems::GmLabels(labels) => {
            // .SILENT is not applied for labels
            writer.put(b"X-GM-LABELS (");
            for (i, label) in labels.iter().enumerate() {
                if i > 0 {
                    writer.put(b" ");
                }
                writer.put_astring(label);
            }
            writer.put(b")");
        }
    }
}

/// Writes SEARCH criteria.
#[allow(clippy::too_many_lines)]
pub fn write_search_criteria(writer: &mut CommandWriter, criteria: &SearchCriteria) {
    match criteria {
        SearchCriteria::Charset(cs) => {
            writer.put(b"CHARSET ");
            writer.put(cs.as_bytes());
        }
        SearchCriteria::All => writer.put(b"ALL"),
        SearchCriteria::Answered => writer.put(b"ANSWERED"),
        SearchCriteria::Unanswered => writer.put(b"UNANSWERED"),
        SearchCriteria::Deleted => writer.put(b"DELETED"),
        SearchCriteria::Undeleted => writer.put(b"UNDELETED"),
        SearchCriteria::Draft => writer.put(b"DRAFT"),
        SearchCriteria::Undraft => writer.put(b"UNDRAFT"),
        SearchCriteria::Flagged => writer.put(b"FLAGGED"),
        SearchCriteria::Unflagged => writer.put(b"UNFLAGGED"),
        SearchCriteria::Seen => writer.put(b"SEEN"),
        SearchCriteria::Unseen => writer.put(b"UNSEEN"),
        SearchCriteria::New => writer.put(b"NEW"),
        SearchCriteria::Old => writer.put(b"OLD"),
        SearchCriteria::Recent => writer.put(b"RECENT"),
        SearchCriteria::SequenceSet(set) => writer.put(set.as_bytes()),
        SearchCriteria::UidSet(set) => {
            writer.put(b"UID ");
            writer.put(set.as_bytes());
        }
        SearchCriteria::Keyword(flag) => {
            writer.put(b"KEYWORD ");
            writer.put_astring(flag);
        }
        SearchCriteria::Unkeyword(flag) => {
            writer.put(b"UNKEYWORD ");
            writer.put_astring(flag);
        }
        SearchCriteria::Subject(s) => {
            writer.put(b"SUBJECT ");
            writer.put_astring(s);
        }
        SearchCriteria::From(s) => {
            writer.put(b"FROM ");
            writer.put_astring(s);
        }
        SearchCriteria::To(s) => {
            writer.put(b"TO ");
            writer.put_astring(s);
        }
        SearchCriteria::Cc(s) => {
            writer.put(b"CC ");
            writer.put_astring(s);
        }
        SearchCriteria::Bcc(s) => {
            writer.put(b"BCC ");
            writer.put_astring(s);
        }
        SearchCriteria::Body(s) => {
            writer.put(b"BODY ");
            writer.put_astring(s);
        }
        SearchCriteria::Text(s) => {
            writer.put(b"TEXT ");
            writer.put_astring(s);
        }
        SearchCriteria::Since(date) => {
            writer.put(b"SINCE ");
            writer.put(date.as_bytes());
        }
        SearchCriteria::Before(date) => {
            writer.put(b"BEFORE ");
            writer.put(date.as_bytes());
        }
        SearchCriteria::On(date) => {
            writer.put(b"ON ");
            writer.put(date.as_bytes());
        }
        SearchCriteria::Older(secs) => {
            writer.put(format!("OLDER {secs}").as_bytes());
        }
        SearchCriteria::Younger(secs) => {
            writer.put(format!("YOUNGER {secs}").as_bytes());
        }
        SearchCriteria::Larger(size) => {
            writer.put(format!("LARGER {size}").as_bytes());
        }
        SearchCriteria::Smaller(size) => {
            writer.put(format!("SMALLER {size}").as_bytes());
        }
        SearchCriteria::Header(name, value) => {
            writer.put(b"HEADER ");
            writer.put_astring(name);
            writer.put(b" ");
            writer.put_astring(value);
        }
        SearchCriteria::ModSeq(modseq) => {
            writer.put(format!("MODSEQ {modseq}").as_bytes());
        }
        SearchCriteria::EmailId(id) => {
            writer.put(b"EMAILID ");
            writer.put_astring(id);
        }
        SearchCriteria::ThreadId(id) => {
            writer.put(b"THREADID ");
            writer.put_astring(id);
        }
        SearchCriteria::GmMsgId(id) => {
            writer.put(b"X-GM-MSGID ");
            writer.put(id.as_bytes());
        }
        SearchCriteria::GmThreadId(id) => {
            writer.put(b"X-GM-THRID ");
            writer.put(id.as_bytes());
        }
        SearchCriteria::GmRaw(raw) => {
            writer.put(b"X-GM-RAW ");
            writer.put_astring(raw);
        }
        SearchCriteria::And(criteria) => {
            for (i, c) in criteria.iter().enumerate() {
                if i > 0 {
                    writer.put(b" ");
                }
                write_search_criteria(writer, c);
            }
        }
        SearchCriteria::Or(a, b) => {
            writer.put(b"OR ");
            write_search_operand(writer, a);
            writer.put(b" ");
            write_search_operand(writer, b);
        }
        SearchCriteria::Not(c) => {
            writer.put(b"NOT ");
            write_search_operand(writer, c);
        }
    }
}

/// Writes an OR/NOT operand, parenthesizing multi-key groups.
fn write_search_operand(writer: &mut CommandWriter, criteria: &SearchCriteria) {
    if matches!(criteria, SearchCriteria::And(items) if items.len() > 1) {
        writer.put(b"(");
        write_search_criteria(writer, criteria);
        writer.put(b")");
    } else {
        write_search_criteria(writer, criteria);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut CommandWriter)) -> Vec<CommandSegment> {
        let mut writer = CommandWriter::new("A1", false, false);
        f(&mut writer);
        writer.finish()
    }

    #[test]
    fn plain_command_is_one_segment() {
        let segments = render(|w| w.put(b"NOOP"));
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].bytes, b"A1 NOOP\r\n");
        assert!(!segments[0].awaits_continuation);
    }

    #[test]
    fn astring_atom() {
        let segments = render(|w| w.put_astring("INBOX"));
        assert_eq!(segments[0].bytes, b"A1 INBOX\r\n");
    }

    #[test]
    fn astring_quoted() {
        let segments = render(|w| w.put_astring("My Folder"));
        assert_eq!(segments[0].bytes, b"A1 \"My Folder\"\r\n");
    }

    #[test]
    fn astring_quoted_escapes() {
        let segments = render(|w| w.put_astring("a\"b\\c"));
        assert_eq!(segments[0].bytes, b"A1 \"a\\\"b\\\\c\"\r\n");
    }

    #[test]
    fn non_ascii_becomes_literal() {
        let segments = render(|w| w.put_astring("Entw\u{fc}rfe"));
        assert_eq!(segments.len(), 2);
        // "Entwürfe" is 9 bytes in UTF-8
        assert!(segments[0].bytes.ends_with(b"{9}\r\n"));
        assert!(segments[0].awaits_continuation);
        assert!(segments[1].bytes.starts_with("Entw\u{fc}rfe".as_bytes()));
    }

    #[test]
    fn non_ascii_quoted_when_utf8_accepted() {
        let mut writer = CommandWriter::new("A1", false, true);
        writer.put_astring("Entw\u{fc}rfe");
        let segments = writer.finish();
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn literal_plus_skips_continuation() {
        let mut writer = CommandWriter::new("A1", true, false);
        writer.put_literal(b"hello", false);
        let segments = writer.finish();
        assert_eq!(segments.len(), 2);
        assert!(segments[0].bytes.ends_with(b"{5+}\r\n"));
        assert!(!segments[0].awaits_continuation);
    }

    #[test]
    fn literal8_has_tilde_prefix() {
        let mut writer = CommandWriter::new("A1", false, false);
        writer.put_literal(b"\x00\x01", true);
        let segments = writer.finish();
        assert!(segments[0].bytes.ends_with(b"~{2}\r\n"));
    }

    #[test]
    fn crlf_in_value_forces_literal() {
        let segments = render(|w| w.put_astring("two\r\nlines"));
        assert_eq!(segments.len(), 2);
        assert!(segments[0].awaits_continuation);
    }

    #[test]
    fn or_criteria_nests() {
        let criteria = SearchCriteria::Or(
            Box::new(SearchCriteria::From("a".to_string())),
            Box::new(SearchCriteria::From("b".to_string())),
        );
        let segments = render(|w| write_search_criteria(w, &criteria));
        assert_eq!(segments[0].bytes, b"A1 OR FROM a FROM b\r\n");
    }

    #[test]
    fn store_items_silent_flags() {
        let items = StoreItems::Flags(vec![Flag::Deleted]);
        let segments = render(|w| write_store_items(w, StoreOperation::Add, &items, true));
        assert_eq!(segments[0].bytes, b"A1 +FLAGS.SILENT (\\Deleted)\r\n");
    }

    #[test]
    fn store_labels_never_silent() {
        let items = StoreItems::GmLabels(vec!["work".to_string()]);
        let segments = render(|w| write_store_items(w, StoreOperation::Set, &items, true));
        assert_eq!(segments[0].bytes, b"A1 X-GM-LABELS (work)\r\n");
    }

    #[test]
    fn fetch_body_partial_window() {
        let attr = FetchAttribute::Body {
            section: Some("1.2".to_string()),
            peek: true,
            partial: Some((0, 1024)),
        };
        let segments = render(|w| write_fetch_attribute(w, &attr));
        assert_eq!(segments[0].bytes, b"A1 BODY.PEEK[1.2]<0.1024>\r\n");
    }
}
