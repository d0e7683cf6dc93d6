//! FETCH field parsing.
//!
//! A FETCH result is a flat group of `name value` pairs, except that
//! section names smuggle their own bracket syntax (`BODY[1.2]<0>`).
//! Unknown fields are skipped whole so new server extensions cannot
//! break the walk.

use super::cursor::Cursor;
use super::data::{Address, BodyStructure, Envelope, FetchField};
use super::response::flag_group;
use crate::types::{ModSeq, Uid};
use crate::Result;

/// Parses the parenthesised field group of one FETCH line.
#[allow(clippy::too_many_lines)]
pub(super) fn fetch_fields(c: &mut Cursor<'_>) -> Result<Vec<FetchField>> {
    c.expect(b'(')?;
    let mut fields = Vec::new();

    loop {
        c.skip_sp();
        if c.eat(b')') {
            return Ok(fields);
        }

        let name = c.word()?.to_ascii_uppercase();
        match name.as_str() {
            "FLAGS" => {
                c.expect_sp()?;
                fields.push(FetchField::Flags(flag_group(c)?));
            }
            "UID" => {
                c.expect_sp()?;
                let uid = Uid::new(c.number32()?).ok_or_else(|| c.fail("UID of zero"))?;
                fields.push(FetchField::Uid(uid));
            }
            "RFC822.SIZE" => {
                c.expect_sp()?;
                fields.push(FetchField::Size(c.number32()?));
            }
            "INTERNALDATE" => {
                c.expect_sp()?;
                fields.push(FetchField::InternalDate(c.quoted()?));
            }
            "ENVELOPE" => {
                c.expect_sp()?;
                fields.push(FetchField::Envelope(Box::new(envelope(c)?)));
            }
            "BODYSTRUCTURE" => {
                c.expect_sp()?;
                fields.push(FetchField::BodyStructure(Box::new(body(c)?)));
            }
            "BODY" => {
                // BODY[section]<origin> carries content; a bare BODY is
                // the abbreviated structure tree
                if c.peek() == Some(b'[') {
                    let (section, origin) = section_spec(c)?;
                    c.expect_sp()?;
                    fields.push(FetchField::Section {
                        section,
                        origin,
                        data: c.nbytes()?,
                    });
                } else {
                    c.expect_sp()?;
                    fields.push(FetchField::BodyStructure(Box::new(body(c)?)));
                }
            }
            "RFC822" | "RFC822.HEADER" | "RFC822.TEXT" => {
                let section = name.strip_prefix("RFC822.").map(str::to_string);
                c.expect_sp()?;
                fields.push(FetchField::Section {
                    section,
                    origin: None,
                    data: c.nbytes()?,
                });
            }
            "BINARY" => {
                let (section, _) = section_spec(c)?;
                c.expect_sp()?;
                // Literal8 payloads carry a tilde before the brace
                c.eat(b'~');
                fields.push(FetchField::Binary {
                    section,
                    data: c.nbytes()?,
                });
            }
            "MODSEQ" => {
                c.expect_sp()?;
                c.expect(b'(')?;
                let modseq = ModSeq::new(c.number()?).ok_or_else(|| c.fail("MODSEQ of zero"))?;
                c.expect(b')')?;
                fields.push(FetchField::ModSeq(modseq));
            }
            "EMAILID" | "THREADID" => {
                c.expect_sp()?;
                c.expect(b'(')?;
                let id = c.astring()?;
                c.expect(b')')?;
                fields.push(if name == "EMAILID" {
                    FetchField::EmailId(id)
                } else {
                    FetchField::ThreadId(id)
                });
            }
            "X-GM-MSGID" => {
                c.expect_sp()?;
                fields.push(FetchField::GmMsgId(c.number()?));
            }
            "X-GM-THRID" => {
                c.expect_sp()?;
                fields.push(FetchField::GmThreadId(c.number()?));
            }
            "X-GM-LABELS" => {
                c.expect_sp()?;
                fields.push(FetchField::GmLabels(labels(c)?));
            }
            _ => {
                // Unmodelled field: drop its value and keep walking
                c.skip_sp();
                c.skip_value()?;
            }
        }
    }
}

/// `[section]` and an optional `<origin>` partial marker.
fn section_spec(c: &mut Cursor<'_>) -> Result<(Option<String>, Option<u32>)> {
    let mut section = None;
    if c.eat(b'[') {
        let mut inner = String::new();
        loop {
            match c.peek() {
                Some(b']') | None => break,
                Some(b) => {
                    inner.push(char::from(b));
                    c.eat(b);
                }
            }
        }
        c.expect(b']')?;
        if !inner.is_empty() {
            section = Some(inner);
        }
    }

    let mut origin = None;
    if c.eat(b'<') {
        origin = Some(c.number32()?);
        c.expect(b'>')?;
    }

    Ok((section, origin))
}

/// Gmail label list: atoms, quoted strings or literals.
fn labels(c: &mut Cursor<'_>) -> Result<Vec<String>> {
    c.expect(b'(')?;
    let mut labels = Vec::new();
    loop {
        c.skip_sp();
        if c.eat(b')') {
            return Ok(labels);
        }
        match c.peek() {
            Some(b'"') => labels.push(c.quoted()?),
            Some(b'{') => {
                let raw = c.literal()?;
                labels.push(String::from_utf8_lossy(&raw).into_owned());
            }
            _ => labels.push(c.flag_word()?),
        }
    }
}

/// The ten fixed envelope slots.
fn envelope(c: &mut Cursor<'_>) -> Result<Envelope> {
    c.expect(b'(')?;

    let date = c.nstring()?;
    c.expect_sp()?;
    let subject = c.nstring()?;
    c.expect_sp()?;
    let from = address_list(c)?;
    c.expect_sp()?;
    let sender = address_list(c)?;
    c.expect_sp()?;
    let reply_to = address_list(c)?;
    c.expect_sp()?;
    let to = address_list(c)?;
    c.expect_sp()?;
    let cc = address_list(c)?;
    c.expect_sp()?;
    let bcc = address_list(c)?;
    c.expect_sp()?;
    let in_reply_to = c.nstring()?;
    c.expect_sp()?;
    let message_id = c.nstring()?;

    c.expect(b')')?;
    Ok(Envelope {
        date,
        subject,
        from,
        sender,
        reply_to,
        to,
        cc,
        bcc,
        in_reply_to,
        message_id,
    })
}

/// NIL or a parenthesised run of `(name route mailbox host)` entries.
fn address_list(c: &mut Cursor<'_>) -> Result<Vec<Address>> {
    if c.peek() != Some(b'(') {
        c.nstring()?;
        return Ok(Vec::new());
    }

    c.expect(b'(')?;
    let mut addresses = Vec::new();
    loop {
        c.skip_sp();
        if c.eat(b')') {
            return Ok(addresses);
        }

        c.expect(b'(')?;
        let name = c.nstring()?;
        c.expect_sp()?;
        let route = c.nstring()?;
        c.expect_sp()?;
        let mailbox = c.nstring()?;
        c.expect_sp()?;
        let host = c.nstring()?;
        c.expect(b')')?;

        addresses.push(Address {
            name,
            route,
            mailbox,
            host,
        });
    }
}

/// One node of the BODYSTRUCTURE tree.
fn body(c: &mut Cursor<'_>) -> Result<BodyStructure> {
    c.expect(b'(')?;

    // Multiparts open straight into their first child part
    if c.peek() == Some(b'(') {
        let mut parts = Vec::new();
        while c.peek() == Some(b'(') {
            parts.push(body(c)?);
            c.skip_sp();
        }
        let subtype = c.nstring()?.unwrap_or_default().to_uppercase();
        c.skip_sp();
        c.skip_group()?;

        return Ok(BodyStructure {
            media_type: "MULTIPART".to_string(),
            media_subtype: subtype,
            parts,
            ..BodyStructure::default()
        });
    }

    let media_type = c.nstring()?.unwrap_or_default().to_uppercase();
    c.expect_sp()?;
    let media_subtype = c.nstring()?.unwrap_or_default().to_uppercase();
    c.expect_sp()?;
    let params = body_params(c)?;
    c.expect_sp()?;
    let id = c.nstring()?;
    c.expect_sp()?;
    let description = c.nstring()?;
    c.expect_sp()?;
    let encoding = c.nstring()?;
    c.expect_sp()?;
    let size = c.number32()?;

    // TEXT parts carry a line count after the size
    let mut lines = None;
    if media_type == "TEXT" && c.eat(b' ') {
        lines = Some(c.number32()?);
    }

    // Extension data (MD5, disposition, language, location) is dropped
    c.skip_sp();
    c.skip_group()?;

    Ok(BodyStructure {
        media_type,
        media_subtype,
        params,
        id,
        description,
        encoding,
        size: Some(size),
        lines,
        parts: Vec::new(),
    })
}

/// NIL or `(key value key value ...)`.
fn body_params(c: &mut Cursor<'_>) -> Result<Vec<(String, String)>> {
    if c.peek() != Some(b'(') {
        c.nstring()?;
        return Ok(Vec::new());
    }

    c.expect(b'(')?;
    let mut params = Vec::new();
    loop {
        c.skip_sp();
        if c.eat(b')') {
            return Ok(params);
        }
        let key = c.nstring()?.unwrap_or_default();
        c.expect_sp()?;
        let value = c.nstring()?.unwrap_or_default();
        params.push((key, value));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Flag;

    fn fields_of(input: &[u8]) -> Vec<FetchField> {
        let mut c = Cursor::new(input);
        fetch_fields(&mut c).unwrap()
    }

    #[test]
    fn uid_and_flags() {
        let fields = fields_of(b"(UID 123 FLAGS (\\Seen \\Flagged))");
        assert_eq!(fields[0], FetchField::Uid(Uid::new(123).unwrap()));
        let FetchField::Flags(flags) = &fields[1] else {
            panic!("expected flags");
        };
        assert!(flags.contains(&Flag::Flagged));
    }

    #[test]
    fn uid_zero_is_rejected() {
        let mut c = Cursor::new(b"(UID 0)");
        assert!(fetch_fields(&mut c).is_err());
    }

    #[test]
    fn modseq_keeps_64_bits() {
        let fields = fields_of(b"(MODSEQ (90071992547409931))");
        assert_eq!(
            fields[0],
            FetchField::ModSeq(ModSeq::new(90_071_992_547_409_931).unwrap())
        );
    }

    #[test]
    fn section_with_origin_and_literal() {
        let fields = fields_of(b"(BODY[1]<0> {5}\r\nhello)");
        assert_eq!(
            fields[0],
            FetchField::Section {
                section: Some("1".to_string()),
                origin: Some(0),
                data: Some(b"hello".to_vec()),
            }
        );
    }

    #[test]
    fn whole_message_section() {
        let fields = fields_of(b"(BODY[] {4}\r\nwire)");
        assert_eq!(
            fields[0],
            FetchField::Section {
                section: None,
                origin: None,
                data: Some(b"wire".to_vec()),
            }
        );
    }

    #[test]
    fn binary_with_literal8_marker() {
        let fields = fields_of(b"(BINARY[2] ~{4}\r\nabcd)");
        assert_eq!(
            fields[0],
            FetchField::Binary {
                section: Some("2".to_string()),
                data: Some(b"abcd".to_vec()),
            }
        );
    }

    #[test]
    fn envelope_slots() {
        let fields = fields_of(
            b"(ENVELOPE (\"date\" \"subject\" ((\"Ann\" NIL \"ann\" \"example.org\")) NIL NIL NIL NIL NIL \"reply-to\" \"<id@x>\"))",
        );
        let FetchField::Envelope(env) = &fields[0] else {
            panic!("expected envelope");
        };
        assert_eq!(env.subject.as_deref(), Some("subject"));
        assert_eq!(env.from[0].address(), Some("ann@example.org".to_string()));
        assert_eq!(env.message_id.as_deref(), Some("<id@x>"));
    }

    #[test]
    fn simple_body_structure() {
        let fields = fields_of(
            b"(BODYSTRUCTURE (\"TEXT\" \"PLAIN\" (\"CHARSET\" \"utf-8\") NIL NIL \"7BIT\" 120 4))",
        );
        let FetchField::BodyStructure(tree) = &fields[0] else {
            panic!("expected body structure");
        };
        assert!(!tree.is_multipart());
        assert_eq!(tree.media_type, "TEXT");
        assert_eq!(tree.params[0], ("CHARSET".to_string(), "utf-8".to_string()));
        assert_eq!(tree.size, Some(120));
        assert_eq!(tree.lines, Some(4));
    }

    #[test]
    fn multipart_body_structure() {
        let fields = fields_of(
            b"(BODYSTRUCTURE ((\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 10 1)(\"TEXT\" \"HTML\" NIL NIL NIL \"7BIT\" 20 1) \"ALTERNATIVE\"))",
        );
        let FetchField::BodyStructure(tree) = &fields[0] else {
            panic!("expected body structure");
        };
        assert!(tree.is_multipart());
        assert_eq!(tree.media_subtype, "ALTERNATIVE");
        assert_eq!(tree.parts.len(), 2);
        assert_eq!(tree.parts[1].media_subtype, "HTML");
    }

    #[test]
    fn gmail_fields() {
        let fields = fields_of(
            b"(X-GM-MSGID 1278455344230334865 X-GM-THRID 1278455344230334866 X-GM-LABELS (\\Inbox \"custom label\"))",
        );
        assert_eq!(fields[0], FetchField::GmMsgId(1_278_455_344_230_334_865));
        assert_eq!(fields[1], FetchField::GmThreadId(1_278_455_344_230_334_866));
        assert_eq!(
            fields[2],
            FetchField::GmLabels(vec!["\\Inbox".to_string(), "custom label".to_string()])
        );
    }

    #[test]
    fn objectid_fields() {
        let fields = fields_of(b"(EMAILID (M6d99ac) THREADID (T64b478))");
        assert_eq!(fields[0], FetchField::EmailId("M6d99ac".to_string()));
        assert_eq!(fields[1], FetchField::ThreadId("T64b478".to_string()));
    }

    #[test]
    fn unknown_fields_are_skipped() {
        let fields = fields_of(b"(X-WEIRD (a (b c)) UID 7)");
        assert_eq!(fields, vec![FetchField::Uid(Uid::new(7).unwrap())]);
    }
}
