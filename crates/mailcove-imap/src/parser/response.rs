//! Response parsing.
//!
//! One complete wire response (a line plus any literals it announced)
//! goes in; a [`Response`] comes out. Untagged data dispatches on the
//! first word: a number means message data, anything else is a keyword.

use super::cursor::Cursor;
use super::data::{ListSource, QuotaResource, StatusItem, UntaggedResponse};
use crate::types::{
    Capability, Flag, Flags, ListResponse, Mailbox, MailboxAttribute, ModSeq, NamespaceEntry,
    Namespaces, ResponseCode, SeqNum, SequenceSet, Status, Tag, Uid, UidValidity,
};
use crate::Result;

/// A parsed IMAP response.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Command completion, matched to a pending command by tag.
    Tagged {
        /// The command tag.
        tag: Tag,
        /// Completion status.
        status: Status,
        /// Bracketed response code, when present.
        code: Option<ResponseCode>,
        /// Free text.
        text: String,
    },
    /// Server data (`* ...`).
    Untagged(UntaggedResponse),
    /// Continuation prompt (`+ ...`).
    Continuation {
        /// Prompt text, often a base64 challenge.
        text: Option<String>,
    },
}

/// Entry point for response parsing.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one complete response.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::Parse`] on grammar violations; unknown
    /// untagged keywords are an error too, so callers can log and move on.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut c = Cursor::new(input);

        if c.eat(b'*') {
            c.expect_sp()?;
            return untagged(&mut c);
        }

        if c.eat(b'+') {
            c.skip_sp();
            let text = c.line();
            return Ok(Response::Continuation {
                text: (!text.is_empty()).then_some(text),
            });
        }

        let tag = c.word()?.to_string();
        c.expect_sp()?;
        let status = condition_status(&mut c)?;
        c.expect_sp()?;
        let (code, text) = resp_text(&mut c)?;

        Ok(Response::Tagged {
            tag: Tag::new(tag),
            status,
            code,
            text,
        })
    }
}

fn condition_status(c: &mut Cursor<'_>) -> Result<Status> {
    let word = c.word()?;
    condition_of(word).ok_or_else(|| c.fail(format!("not a status condition: {word}")))
}

fn condition_of(word: &str) -> Option<Status> {
    if word.eq_ignore_ascii_case("OK") {
        Some(Status::Ok)
    } else if word.eq_ignore_ascii_case("NO") {
        Some(Status::No)
    } else if word.eq_ignore_ascii_case("BAD") {
        Some(Status::Bad)
    } else if word.eq_ignore_ascii_case("PREAUTH") {
        Some(Status::PreAuth)
    } else if word.eq_ignore_ascii_case("BYE") {
        Some(Status::Bye)
    } else {
        None
    }
}

/// Response text: an optional `[code]` followed by free text.
fn resp_text(c: &mut Cursor<'_>) -> Result<(Option<ResponseCode>, String)> {
    let code = if c.peek() == Some(b'[') {
        Some(response_code(c)?)
    } else {
        None
    };
    c.skip_sp();
    Ok((code, c.line()))
}

#[allow(clippy::too_many_lines)]
fn untagged(c: &mut Cursor<'_>) -> Result<Response> {
    let word = c.word()?;

    // Message data leads with the number: `* 23 EXISTS`
    if word.bytes().all(|b| b.is_ascii_digit()) {
        let number: u32 = word
            .parse()
            .map_err(|_| c.fail("message number exceeds 32 bits"))?;
        return message_data(c, number);
    }

    if let Some(status) = condition_of(word) {
        c.expect_sp()?;
        let (code, text) = resp_text(c)?;
        return Ok(Response::Untagged(UntaggedResponse::Condition {
            status,
            code,
            text,
        }));
    }

    let keyword = word.to_ascii_uppercase();
    let data = match keyword.as_str() {
        "CAPABILITY" => UntaggedResponse::Capability(capability_words(c)?),
        "FLAGS" => {
            c.expect_sp()?;
            UntaggedResponse::Flags(flag_group(c)?)
        }
        "LIST" => listing(c, ListSource::List)?,
        "LSUB" => listing(c, ListSource::Lsub)?,
        "XLIST" => listing(c, ListSource::Xlist)?,
        "SEARCH" => {
            let mut hits = Vec::new();
            while !c.at_line_end() {
                c.expect_sp()?;
                if c.at_line_end() {
                    break;
                }
                hits.push(c.number32()?);
            }
            UntaggedResponse::Search(hits)
        }
        "STATUS" => {
            c.expect_sp()?;
            let mailbox = c.astring()?;
            c.expect_sp()?;
            UntaggedResponse::Status {
                mailbox: Mailbox::new(mailbox),
                items: status_items(c)?,
            }
        }
        "VANISHED" => {
            c.expect_sp()?;
            let mut earlier = false;
            if c.eat(b'(') {
                earlier = c.word()?.eq_ignore_ascii_case("EARLIER");
                c.expect(b')')?;
                c.expect_sp()?;
            }
            UntaggedResponse::Vanished {
                earlier,
                uids: sequence_set(c)?,
            }
        }
        "ENABLED" => {
            let mut extensions = Vec::new();
            while !c.at_line_end() {
                c.expect_sp()?;
                if c.at_line_end() {
                    break;
                }
                extensions.push(c.word()?.to_ascii_uppercase());
            }
            UntaggedResponse::Enabled(extensions)
        }
        "NAMESPACE" => {
            c.expect_sp()?;
            let personal = namespace_class(c)?;
            c.expect_sp()?;
            let other = namespace_class(c)?;
            c.expect_sp()?;
            let shared = namespace_class(c)?;
            UntaggedResponse::Namespace(Namespaces {
                personal,
                other,
                shared,
            })
        }
        "ID" => {
            c.expect_sp()?;
            UntaggedResponse::Id(id_fields(c)?)
        }
        "QUOTA" => {
            c.expect_sp()?;
            let root = c.astring()?;
            c.expect_sp()?;
            UntaggedResponse::Quota {
                root,
                resources: quota_resources(c)?,
            }
        }
        "QUOTAROOT" => {
            c.expect_sp()?;
            let mailbox = c.astring()?;
            let mut roots = Vec::new();
            while !c.at_line_end() {
                c.expect_sp()?;
                roots.push(c.astring()?);
            }
            UntaggedResponse::QuotaRoot {
                mailbox: Mailbox::new(mailbox),
                roots,
            }
        }
        _ => return Err(c.fail(format!("unknown untagged keyword: {keyword}"))),
    };

    Ok(Response::Untagged(data))
}

/// Message data: `N EXISTS` / `N RECENT` / `N EXPUNGE` / `N FETCH (...)`.
fn message_data(c: &mut Cursor<'_>, number: u32) -> Result<Response> {
    c.expect_sp()?;
    let keyword = c.word()?.to_ascii_uppercase();

    let data = match keyword.as_str() {
        "EXISTS" => UntaggedResponse::Exists(number),
        "RECENT" => UntaggedResponse::Recent(number),
        "EXPUNGE" => {
            let seq =
                SeqNum::new(number).ok_or_else(|| c.fail("EXPUNGE of sequence number zero"))?;
            UntaggedResponse::Expunge(seq)
        }
        "FETCH" => {
            let seq = SeqNum::new(number).ok_or_else(|| c.fail("FETCH of sequence number zero"))?;
            c.expect_sp()?;
            UntaggedResponse::Fetch {
                seq,
                fields: super::fetch::fetch_fields(c)?,
            }
        }
        _ => return Err(c.fail(format!("unknown message data: {keyword}"))),
    };

    Ok(Response::Untagged(data))
}

/// Remaining capability words on the line.
fn capability_words(c: &mut Cursor<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();
    while !c.at_line_end() {
        c.expect_sp()?;
        if c.at_line_end() {
            break;
        }
        caps.push(Capability::parse(c.word()?));
    }
    Ok(caps)
}

/// A parenthesised flag list.
pub(super) fn flag_group(c: &mut Cursor<'_>) -> Result<Flags> {
    c.expect(b'(')?;
    let mut flags = Flags::new();
    loop {
        c.skip_sp();
        if c.eat(b')') {
            return Ok(flags);
        }
        flags.insert(Flag::parse(&c.flag_word()?));
    }
}

/// A LIST-family line: `(attrs) delimiter mailbox`.
fn listing(c: &mut Cursor<'_>, source: ListSource) -> Result<UntaggedResponse> {
    c.expect_sp()?;
    c.expect(b'(')?;

    let mut attributes = Vec::new();
    loop {
        c.skip_sp();
        if c.eat(b')') {
            break;
        }
        attributes.push(MailboxAttribute::parse(&c.flag_word()?));
    }

    c.expect_sp()?;
    let delimiter = match c.peek() {
        Some(b'"') => c.quoted()?.chars().next(),
        _ => {
            if c.nstring()?.is_some() {
                return Err(c.fail("delimiter must be quoted or NIL"));
            }
            None
        }
    };

    c.expect_sp()?;
    let mailbox = c.astring()?;

    Ok(UntaggedResponse::Listing {
        source,
        entry: ListResponse {
            attributes,
            delimiter,
            mailbox: Mailbox::new(mailbox),
        },
    })
}

/// STATUS counters: `(NAME n NAME n ...)`.
fn status_items(c: &mut Cursor<'_>) -> Result<Vec<StatusItem>> {
    c.expect(b'(')?;
    let mut items = Vec::new();

    loop {
        c.skip_sp();
        if c.eat(b')') {
            return Ok(items);
        }

        let name = c.word()?.to_ascii_uppercase();
        c.expect_sp()?;

        let item = match name.as_str() {
            "MESSAGES" => Some(StatusItem::Messages(c.number32()?)),
            "RECENT" => Some(StatusItem::Recent(c.number32()?)),
            "UNSEEN" => Some(StatusItem::Unseen(c.number32()?)),
            "UIDNEXT" => Uid::new(c.number32()?).map(StatusItem::UidNext),
            "UIDVALIDITY" => UidValidity::new(c.number()?).map(StatusItem::UidValidity),
            "HIGHESTMODSEQ" => ModSeq::new(c.number()?).map(StatusItem::HighestModSeq),
            _ => {
                c.skip_value()?;
                None
            }
        };
        items.extend(item);
    }
}

/// One namespace class: NIL or `((prefix delimiter ext...) ...)`.
fn namespace_class(c: &mut Cursor<'_>) -> Result<Vec<NamespaceEntry>> {
    if c.peek() != Some(b'(') {
        if c.nstring()?.is_some() {
            return Err(c.fail("namespace class must be a list or NIL"));
        }
        return Ok(Vec::new());
    }

    c.expect(b'(')?;
    let mut entries = Vec::new();
    loop {
        c.skip_sp();
        if c.eat(b')') {
            return Ok(entries);
        }

        c.expect(b'(')?;
        let prefix = c.astring()?;
        c.expect_sp()?;
        let delimiter = match c.peek() {
            Some(b'"') => c.quoted()?.chars().next(),
            _ => {
                c.nstring()?;
                None
            }
        };
        // Namespace response extensions are not modelled
        c.skip_group()?;

        entries.push(NamespaceEntry { prefix, delimiter });
    }
}

/// ID fields: NIL or `(key value ...)`, keys lowercased and trimmed.
fn id_fields(c: &mut Cursor<'_>) -> Result<Option<Vec<(String, String)>>> {
    if c.peek() != Some(b'(') {
        c.nstring()?;
        return Ok(None);
    }

    c.expect(b'(')?;
    let mut fields = Vec::new();
    loop {
        c.skip_sp();
        if c.eat(b')') {
            return Ok(Some(fields));
        }
        let key = c.astring()?;
        c.expect_sp()?;
        let value = c.nstring()?.unwrap_or_default();
        fields.push((key.trim().to_lowercase(), value));
    }
}

/// QUOTA resources: `(NAME usage limit ...)`.
fn quota_resources(c: &mut Cursor<'_>) -> Result<Vec<QuotaResource>> {
    c.expect(b'(')?;
    let mut resources = Vec::new();
    loop {
        c.skip_sp();
        if c.eat(b')') {
            return Ok(resources);
        }
        let name = c.word()?.to_ascii_uppercase();
        c.expect_sp()?;
        let usage = c.number()?;
        c.expect_sp()?;
        let limit = c.number()?;
        resources.push(QuotaResource { name, usage, limit });
    }
}

/// A sequence-set word (`7`, `1:3`, `1,5:9`, `3:*`).
fn sequence_set(c: &mut Cursor<'_>) -> Result<SequenceSet> {
    let word = c.word()?;
    SequenceSet::parse(word).ok_or_else(|| c.fail(format!("bad sequence set: {word}")))
}

/// A bracketed response code.
#[allow(clippy::too_many_lines)]
fn response_code(c: &mut Cursor<'_>) -> Result<ResponseCode> {
    c.expect(b'[')?;
    let name = c.word()?.to_ascii_uppercase();

    let code = match name.as_str() {
        "ALERT" => ResponseCode::Alert,
        "PARSE" => ResponseCode::Parse,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "NOMODSEQ" => ResponseCode::NoModSeq,
        "ALREADYEXISTS" => ResponseCode::AlreadyExists,
        "NONEXISTENT" => ResponseCode::NonExistent,
        "THROTTLED" => ResponseCode::Throttled,
        "CLOSED" => ResponseCode::Closed,
        "UIDNEXT" => {
            c.expect_sp()?;
            let uid = Uid::new(c.number32()?).ok_or_else(|| c.fail("UIDNEXT of zero"))?;
            ResponseCode::UidNext(uid)
        }
        "UIDVALIDITY" => {
            c.expect_sp()?;
            let validity =
                UidValidity::new(c.number()?).ok_or_else(|| c.fail("UIDVALIDITY of zero"))?;
            ResponseCode::UidValidity(validity)
        }
        "UNSEEN" => {
            c.expect_sp()?;
            let seq = SeqNum::new(c.number32()?).ok_or_else(|| c.fail("UNSEEN of zero"))?;
            ResponseCode::Unseen(seq)
        }
        "HIGHESTMODSEQ" => {
            c.expect_sp()?;
            let modseq = ModSeq::new(c.number()?).ok_or_else(|| c.fail("HIGHESTMODSEQ of zero"))?;
            ResponseCode::HighestModSeq(modseq)
        }
        "PERMANENTFLAGS" => {
            c.expect_sp()?;
            ResponseCode::PermanentFlags(flag_group(c)?)
        }
        "CAPABILITY" => {
            let mut caps = Vec::new();
            while c.eat(b' ') {
                caps.push(Capability::parse(c.word()?));
            }
            ResponseCode::Capability(caps)
        }
        "APPENDUID" => {
            c.expect_sp()?;
            let validity =
                UidValidity::new(c.number()?).ok_or_else(|| c.fail("UIDVALIDITY of zero"))?;
            c.expect_sp()?;
            let uid = Uid::new(c.number32()?).ok_or_else(|| c.fail("APPENDUID of zero"))?;
            ResponseCode::AppendUid {
                uidvalidity: validity,
                uid,
            }
        }
        "COPYUID" => {
            c.expect_sp()?;
            let validity =
                UidValidity::new(c.number()?).ok_or_else(|| c.fail("UIDVALIDITY of zero"))?;
            c.expect_sp()?;
            let source = sequence_set(c)?;
            c.expect_sp()?;
            let dest = sequence_set(c)?;
            ResponseCode::CopyUid {
                uidvalidity: validity,
                source,
                dest,
            }
        }
        "MAILBOXID" => {
            c.expect_sp()?;
            c.expect(b'(')?;
            let id = c.astring()?;
            c.expect(b')')?;
            ResponseCode::MailboxId(id)
        }
        _ => ResponseCode::Unknown(name),
    };

    // Arguments of unmodelled codes are dropped along with the bracket
    while c.peek().is_some_and(|b| b != b']') {
        c.expect_sp()?;
        c.skip_value()?;
    }
    c.expect(b']')?;

    Ok(code)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::parser::FetchField;

    fn untagged_of(input: &[u8]) -> UntaggedResponse {
        match ResponseParser::parse(input).unwrap() {
            Response::Untagged(data) => data,
            other => panic!("expected untagged, got {other:?}"),
        }
    }

    #[test]
    fn greeting_condition() {
        let data = untagged_of(b"* OK IMAP4rev1 server ready\r\n");
        assert_eq!(
            data,
            UntaggedResponse::Condition {
                status: Status::Ok,
                code: None,
                text: "IMAP4rev1 server ready".to_string(),
            }
        );
    }

    #[test]
    fn tagged_completion() {
        let parsed = ResponseParser::parse(b"C7 OK LOGIN completed\r\n").unwrap();
        match parsed {
            Response::Tagged {
                tag, status, code, ..
            } => {
                assert_eq!(tag.as_str(), "C7");
                assert_eq!(status, Status::Ok);
                assert!(code.is_none());
            }
            other => panic!("expected tagged, got {other:?}"),
        }
    }

    #[test]
    fn continuation_with_and_without_text() {
        assert_eq!(
            ResponseParser::parse(b"+ Ready for literal\r\n").unwrap(),
            Response::Continuation {
                text: Some("Ready for literal".to_string())
            }
        );
        assert_eq!(
            ResponseParser::parse(b"+\r\n").unwrap(),
            Response::Continuation { text: None }
        );
    }

    #[test]
    fn capability_line() {
        let data = untagged_of(b"* CAPABILITY IMAP4rev1 IDLE NAMESPACE\r\n");
        let UntaggedResponse::Capability(caps) = data else {
            panic!("expected capabilities");
        };
        assert!(caps.contains(&Capability::Imap4Rev1));
        assert!(caps.contains(&Capability::Idle));
        assert!(caps.contains(&Capability::Namespace));
    }

    #[test]
    fn exists_and_expunge() {
        assert_eq!(untagged_of(b"* 23 EXISTS\r\n"), UntaggedResponse::Exists(23));
        assert_eq!(
            untagged_of(b"* 4 EXPUNGE\r\n"),
            UntaggedResponse::Expunge(SeqNum::new(4).unwrap())
        );
    }

    #[test]
    fn expunge_of_zero_is_rejected() {
        assert!(ResponseParser::parse(b"* 0 EXPUNGE\r\n").is_err());
    }

    #[test]
    fn flags_line() {
        let data = untagged_of(b"* FLAGS (\\Answered \\Flagged \\Deleted)\r\n");
        let UntaggedResponse::Flags(flags) = data else {
            panic!("expected flags");
        };
        assert!(flags.contains(&Flag::Answered));
        assert!(flags.contains(&Flag::Deleted));
    }

    #[test]
    fn permanent_flags_with_wildcard() {
        let data = untagged_of(b"* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Flags permitted.\r\n");
        let Some(ResponseCode::PermanentFlags(flags)) = data.ok_code() else {
            panic!("expected PERMANENTFLAGS");
        };
        assert!(flags.allows_any());
        assert!(flags.contains(&Flag::Deleted));
    }

    #[test]
    fn list_line() {
        let data = untagged_of(b"* LIST (\\HasChildren) \"/\" \"INBOX\"\r\n");
        let UntaggedResponse::Listing { source, entry } = data else {
            panic!("expected listing");
        };
        assert_eq!(source, ListSource::List);
        assert!(entry.attributes.contains(&MailboxAttribute::HasChildren));
        assert_eq!(entry.delimiter, Some('/'));
        assert_eq!(entry.mailbox.as_str(), "INBOX");
    }

    #[test]
    fn lsub_line_keeps_its_source() {
        let data = untagged_of(b"* LSUB () \"/\" \"Sent\"\r\n");
        assert!(matches!(
            data,
            UntaggedResponse::Listing {
                source: ListSource::Lsub,
                ..
            }
        ));
    }

    #[test]
    fn list_with_nil_delimiter() {
        let data = untagged_of(b"* LIST () NIL inbox-archive\r\n");
        let UntaggedResponse::Listing { entry, .. } = data else {
            panic!("expected listing");
        };
        assert_eq!(entry.delimiter, None);
    }

    #[test]
    fn search_hits() {
        assert_eq!(
            untagged_of(b"* SEARCH 1 2 3 5 8 13\r\n"),
            UntaggedResponse::Search(vec![1, 2, 3, 5, 8, 13])
        );
        assert_eq!(
            untagged_of(b"* SEARCH\r\n"),
            UntaggedResponse::Search(Vec::new())
        );
    }

    #[test]
    fn status_line() {
        let data = untagged_of(b"* STATUS INBOX (MESSAGES 5 UIDNEXT 201 UNSEEN 2)\r\n");
        let UntaggedResponse::Status { mailbox, items } = data else {
            panic!("expected status");
        };
        assert_eq!(mailbox.as_str(), "INBOX");
        assert!(items.contains(&StatusItem::Messages(5)));
        assert!(items.contains(&StatusItem::Unseen(2)));
    }

    #[test]
    fn uidvalidity_keeps_64_bits() {
        let data = untagged_of(b"* OK [UIDVALIDITY 9007199254740993] UIDs valid\r\n");
        assert_eq!(
            data.ok_code(),
            Some(&ResponseCode::UidValidity(
                UidValidity::new(9_007_199_254_740_993).unwrap()
            ))
        );
    }

    #[test]
    fn copyuid_code() {
        let parsed = ResponseParser::parse(b"C4 OK [COPYUID 12345 1:3 100:102] Done\r\n").unwrap();
        let Response::Tagged {
            code:
                Some(ResponseCode::CopyUid {
                    uidvalidity,
                    source,
                    dest,
                }),
            ..
        } = parsed
        else {
            panic!("expected COPYUID");
        };
        assert_eq!(uidvalidity.get(), 12_345);
        assert_eq!(source.expand().unwrap(), vec![1, 2, 3]);
        assert_eq!(dest.expand().unwrap(), vec![100, 101, 102]);
    }

    #[test]
    fn appenduid_code() {
        let parsed = ResponseParser::parse(b"C3 OK [APPENDUID 5 99] done\r\n").unwrap();
        let Response::Tagged {
            code: Some(ResponseCode::AppendUid { uidvalidity, uid }),
            ..
        } = parsed
        else {
            panic!("expected APPENDUID");
        };
        assert_eq!(uidvalidity.get(), 5);
        assert_eq!(uid.get(), 99);
    }

    #[test]
    fn unknown_code_with_arguments() {
        let parsed =
            ResponseParser::parse(b"* OK [BADCHARSET (US-ASCII \"UTF-8\")] what?\r\n").unwrap();
        let Response::Untagged(data) = parsed else {
            panic!("expected untagged");
        };
        assert_eq!(
            data.ok_code(),
            Some(&ResponseCode::Unknown("BADCHARSET".to_string()))
        );
    }

    #[test]
    fn throttled_no() {
        let parsed = ResponseParser::parse(b"C5 NO [THROTTLED] Too many requests\r\n").unwrap();
        let Response::Tagged { status, code, .. } = parsed else {
            panic!("expected tagged");
        };
        assert_eq!(status, Status::No);
        assert_eq!(code, Some(ResponseCode::Throttled));
    }

    #[test]
    fn vanished_earlier() {
        let data = untagged_of(b"* VANISHED (EARLIER) 300:310,405\r\n");
        let UntaggedResponse::Vanished { earlier, uids } = data else {
            panic!("expected vanished");
        };
        assert!(earlier);
        assert_eq!(uids.expand().unwrap().len(), 12);
    }

    #[test]
    fn enabled_extensions() {
        assert_eq!(
            untagged_of(b"* ENABLED CONDSTORE QRESYNC\r\n"),
            UntaggedResponse::Enabled(vec!["CONDSTORE".to_string(), "QRESYNC".to_string()])
        );
    }

    #[test]
    fn namespace_classes() {
        let data = untagged_of(b"* NAMESPACE ((\"\" \"/\")) NIL NIL\r\n");
        let UntaggedResponse::Namespace(ns) = data else {
            panic!("expected namespace");
        };
        assert_eq!(ns.personal.len(), 1);
        assert_eq!(ns.personal[0].prefix, "");
        assert_eq!(ns.personal[0].delimiter, Some('/'));
        assert!(ns.other.is_empty() && ns.shared.is_empty());
    }

    #[test]
    fn id_fields_lowercase_keys() {
        let data = untagged_of(b"* ID (\"Name\" \"Dovecot\" \"version\" \"2.3\")\r\n");
        assert_eq!(
            data,
            UntaggedResponse::Id(Some(vec![
                ("name".to_string(), "Dovecot".to_string()),
                ("version".to_string(), "2.3".to_string()),
            ]))
        );
        assert_eq!(untagged_of(b"* ID NIL\r\n"), UntaggedResponse::Id(None));
    }

    #[test]
    fn quota_resources_line() {
        let data = untagged_of(b"* QUOTA \"\" (STORAGE 10 512)\r\n");
        let UntaggedResponse::Quota { root, resources } = data else {
            panic!("expected quota");
        };
        assert_eq!(root, "");
        assert_eq!(resources[0].name, "STORAGE");
        assert_eq!(resources[0].usage, 10);
        assert_eq!(resources[0].limit, 512);
    }

    #[test]
    fn fetch_line_dispatches_fields() {
        let data = untagged_of(b"* 1 FETCH (FLAGS (\\Seen) UID 12345)\r\n");
        let UntaggedResponse::Fetch { seq, fields } = data else {
            panic!("expected fetch");
        };
        assert_eq!(seq.get(), 1);
        assert!(fields.contains(&FetchField::Uid(Uid::new(12_345).unwrap())));
        assert!(
            fields
                .iter()
                .any(|f| matches!(f, FetchField::Flags(flags) if flags.is_seen()))
        );
    }

    #[test]
    fn unknown_untagged_keyword_is_an_error() {
        assert!(ResponseParser::parse(b"* FNORD 1 2 3\r\n").is_err());
    }
}
