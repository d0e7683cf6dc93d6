//! Message operations on the selected mailbox.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{ExecResult, ImapClient};
use crate::command::{
    Command, FetchAttribute, FetchItems, SearchCriteria, StoreItems, StoreOperation,
};
use crate::parser::{Envelope, FetchField, Response, ResponseParser, UntaggedResponse};
use crate::search::{SearchContext, SearchQuery};
use crate::time::imap_date_time;
use crate::types::{
    Capability, Flag, Flags, Mailbox, ModSeq, ResponseCode, SeqNum, SequenceSet, Uid, UidValidity,
};
use crate::{Error, Result};

/// Sleep between throttled FETCH retries.
pub(crate) const THROTTLE_RESET: Duration = Duration::from_secs(5);

/// Give up after this many throttled retries.
const THROTTLE_ATTEMPTS: u32 = 3;

/// Partial body window `<start.max_length>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialRange {
    /// Byte offset to start from.
    pub start: u32,
    /// Maximum number of bytes to return.
    pub max_length: Option<u32>,
}

/// Which headers to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderFetch {
    /// The whole header section.
    All,
    /// Only the named fields.
    Fields(Vec<String>),
}

/// One body part to fetch, optionally windowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPartRequest {
    /// Part specifier, e.g. `1.2` or `2.MIME`.
    pub part: String,
    /// Partial window.
    pub range: Option<PartialRange>,
}

/// What to fetch for each message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct FetchQuery {
    /// UID (always included on the wire).
    pub uid: bool,
    /// Message flags.
    pub flags: bool,
    /// Envelope structure.
    pub envelope: bool,
    /// Body structure tree.
    pub body_structure: bool,
    /// Internal date.
    pub internal_date: bool,
    /// RFC822 size.
    pub size: bool,
    /// MODSEQ (CONDSTORE).
    pub modseq: bool,
    /// EMAILID / X-GM-MSGID.
    pub email_id: bool,
    /// THREADID / X-GM-THRID.
    pub thread_id: bool,
    /// Gmail labels.
    pub labels: bool,
    /// The ALL macro.
    pub all: bool,
    /// The FAST macro.
    pub fast: bool,
    /// The FULL macro.
    pub full: bool,
    /// Full message source, optionally windowed.
    pub source: bool,
    /// Window for the source fetch.
    pub source_range: Option<PartialRange>,
    /// Header section.
    pub headers: Option<HeaderFetch>,
    /// Individual body parts.
    pub body_parts: Vec<BodyPartRequest>,
    /// Use BINARY for body parts when the server supports it.
    pub binary: bool,
}

impl FetchQuery {
    /// A minimal query: UID and flags.
    #[must_use]
    pub fn uid_flags() -> Self {
        Self {
            uid: true,
            flags: true,
            ..Self::default()
        }
    }

    /// Builds the wire item list against the server's capabilities.
    fn to_items(&self, client: &ImapClient) -> FetchItems {
        if self.full {
            return FetchItems::Full;
        }
        if self.all {
            return FetchItems::All;
        }
        if self.fast {
            return FetchItems::Fast;
        }

        let binary_ok = self.binary
            && client.has_capability(&Capability::Binary)
            && !client.config.disable_binary;

        let mut attrs = vec![FetchAttribute::Uid];

        if self.flags {
            attrs.push(FetchAttribute::Flags);
        }
        if self.internal_date {
            attrs.push(FetchAttribute::InternalDate);
        }
        if self.size {
            attrs.push(FetchAttribute::Rfc822Size);
        }
        if self.envelope {
            attrs.push(FetchAttribute::Envelope);
        }
        if self.body_structure {
            attrs.push(FetchAttribute::BodyStructure);
        }
        if self.modseq && client.condstore_enabled() {
            attrs.push(FetchAttribute::ModSeq);
        }
        if self.email_id {
            if client.has_capability(&Capability::ObjectId) {
                attrs.push(FetchAttribute::EmailId);
            } else if client.has_capability(&Capability::XGmExt1) {
                attrs.push(FetchAttribute::GmMsgId);
            }
        }
        if self.thread_id {
            if client.has_capability(&Capability::ObjectId) {
                attrs.push(FetchAttribute::ThreadId);
            } else if client.has_capability(&Capability::XGmExt1) {
                attrs.push(FetchAttribute::GmThreadId);
            }
        }
        if self.labels && client.has_capability(&Capability::XGmExt1) {
            attrs.push(FetchAttribute::GmLabels);
        }

        if let Some(headers) = &self.headers {
            let section = match headers {
                HeaderFetch::All => "HEADER".to_string(),
                HeaderFetch::Fields(fields) => {
                    format!("HEADER.FIELDS ({})", fields.join(" ").to_uppercase())
                }
            };
            attrs.push(FetchAttribute::Body {
                section: Some(section),
                peek: true,
                partial: None,
            });
        }

        if self.source {
            attrs.push(FetchAttribute::Body {
                section: None,
                peek: true,
                partial: self
                    .source_range
                    .map(|r| (r.start, r.max_length.unwrap_or(u32::MAX))),
            });
        }

        for part in &self.body_parts {
            let partial = part.range.map(|r| (r.start, r.max_length.unwrap_or(u32::MAX)));
            if binary_ok {
                attrs.push(FetchAttribute::Binary {
                    section: Some(part.part.clone()),
                    partial,
                });
            } else {
                attrs.push(FetchAttribute::Body {
                    section: Some(part.part.clone()),
                    peek: true,
                    partial,
                });
            }
        }

        FetchItems::Items(attrs)
    }
}

/// Fetch behaviour switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Address messages by UID.
    pub uid: bool,
    /// Only return messages changed since this mod-sequence.
    pub changed_since: Option<ModSeq>,
}

/// One fetched message.
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    /// Sequence number.
    pub seq: SeqNum,
    /// UID, when fetched.
    pub uid: Option<Uid>,
    /// Raw fetch fields.
    pub fields: Vec<FetchField>,
}

impl FetchedMessage {
    fn from_untagged(seq: SeqNum, fields: Vec<FetchField>) -> Self {
        let uid = fields.iter().find_map(|field| match field {
            FetchField::Uid(uid) => Some(*uid),
            _ => None,
        });
        Self { seq, uid, fields }
    }

    /// Returns the flags, when fetched.
    #[must_use]
    pub fn flags(&self) -> Option<&Flags> {
        self.fields.iter().find_map(|field| match field {
            FetchField::Flags(flags) => Some(flags),
            _ => None,
        })
    }

    /// Returns the envelope, when fetched.
    #[must_use]
    pub fn envelope(&self) -> Option<&Envelope> {
        self.fields.iter().find_map(|field| match field {
            FetchField::Envelope(envelope) => Some(envelope.as_ref()),
            _ => None,
        })
    }

    /// Returns the RFC822 size, when fetched.
    #[must_use]
    pub fn size(&self) -> Option<u32> {
        self.fields.iter().find_map(|field| match field {
            FetchField::Size(size) => Some(*size),
            _ => None,
        })
    }

    /// Returns the MODSEQ, when fetched.
    #[must_use]
    pub fn modseq(&self) -> Option<ModSeq> {
        self.fields.iter().find_map(|field| match field {
            FetchField::ModSeq(modseq) => Some(*modseq),
            _ => None,
        })
    }

    /// Returns the body content for a section, when fetched.
    #[must_use]
    pub fn body_section(&self, section: Option<&str>) -> Option<&[u8]> {
        self.fields.iter().find_map(|field| match field {
            FetchField::Section {
                section: s, data, ..
            } if s.as_deref() == section => data.as_deref(),
            FetchField::Binary { section: s, data } if s.as_deref() == section => data.as_deref(),
            _ => None,
        })
    }
}

/// STORE behaviour switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    /// Address messages by UID.
    pub uid: bool,
    /// Suppress the untagged FETCH echo.
    pub silent: bool,
    /// Only apply to messages unchanged since this mod-sequence.
    pub unchanged_since: Option<ModSeq>,
}

/// COPY / MOVE result.
#[derive(Debug, Clone, Default)]
pub struct CopyResult {
    /// Source mailbox path.
    pub path: String,
    /// Destination mailbox path.
    pub destination: String,
    /// Destination UIDVALIDITY from COPYUID.
    pub uid_validity: Option<UidValidity>,
    /// Source UID to destination UID, when COPYUID was complete.
    pub uid_map: Option<BTreeMap<u32, u32>>,
}

/// APPEND result.
#[derive(Debug, Clone, Default)]
pub struct AppendResult {
    /// Destination mailbox path.
    pub destination: String,
    /// UIDVALIDITY from APPENDUID.
    pub uid_validity: Option<UidValidity>,
    /// New message UID, from APPENDUID or the follow-up search.
    pub uid: Option<Uid>,
    /// New message sequence number, when the destination was selected.
    pub seq: Option<u32>,
}

impl ImapClient {
    /// Fetches messages, collecting the results.
    pub async fn fetch(
        &mut self,
        range: &SequenceSet,
        query: &FetchQuery,
        options: &FetchOptions,
    ) -> Result<Vec<FetchedMessage>> {
        let mut messages = Vec::new();
        self.fetch_each(range, query, options, |message| messages.push(message))
            .await?;
        Ok(messages)
    }

    /// Fetches messages, invoking the callback as each FETCH arrives.
    ///
    /// The command does not complete until every untagged FETCH for the
    /// range has been consumed. A server THROTTLED rejection is retried
    /// up to three times with a fixed back-off.
    pub async fn fetch_each(
        &mut self,
        range: &SequenceSet,
        query: &FetchQuery,
        options: &FetchOptions,
        mut on_message: impl FnMut(FetchedMessage),
    ) -> Result<()> {
        if !self.state.is_selected() {
            return Err(Error::WrongState("FETCH requires a selected mailbox".to_string()));
        }

        let vanished = options.uid && options.changed_since.is_some() && self.qresync_enabled();
        let command = Command::Fetch {
            sequence: range.clone(),
            items: query.to_items(self),
            uid: options.uid,
            changed_since: options.changed_since.map(ModSeq::get),
            vanished,
        };

        let mut attempt = 0;
        loop {
            match self.fetch_once(&command, &mut on_message).await {
                Err(Error::Throttled { retry_after }) if attempt < THROTTLE_ATTEMPTS => {
                    attempt += 1;
                    tracing::warn!(attempt, ?retry_after, "fetch throttled, retrying");
                    tokio::time::sleep(retry_after).await;
                }
                other => return other,
            }
        }
    }

    /// One FETCH round-trip with streaming dispatch.
    async fn fetch_once(
        &mut self,
        command: &Command,
        on_message: &mut impl FnMut(FetchedMessage),
    ) -> Result<()> {
        let tag = self.tag_gen.next();
        let segments = command.serialize(&tag, true, self.utf8_enabled());
        for segment in &segments {
            self.stream.send(&segment.bytes).await?;
        }

        loop {
            let raw = self.read_wire().await?;
            match ResponseParser::parse(&raw) {
                Ok(Response::Untagged(UntaggedResponse::Fetch { seq, fields })) => {
                    let response = UntaggedResponse::Fetch {
                        seq,
                        fields: fields.clone(),
                    };
                    self.dispatch_untagged(&response);
                    on_message(FetchedMessage::from_untagged(seq, fields));
                }
                Ok(Response::Untagged(response)) => self.dispatch_untagged(&response),
                Ok(Response::Tagged {
                    tag: reply_tag,
                    status,
                    code,
                    text,
                }) if reply_tag.as_str() == tag => {
                    if let Some(code) = &code {
                        self.cache.apply_code(code);
                    }
                    return ExecResult {
                        status,
                        code,
                        text,
                        untagged: Vec::new(),
                    }
                    .into_result()
                    .map(|_| ());
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(?err, "ignoring unparseable response"),
            }
        }
    }

    /// Searches the selected mailbox.
    ///
    /// Returns a sorted, de-duplicated list of sequence numbers (or UIDs
    /// with `uid`). An empty query compiles to `SEARCH ALL`.
    pub async fn search(&mut self, query: &SearchQuery, uid: bool) -> Result<Vec<u32>> {
        if !self.state.is_selected() {
            return Err(Error::WrongState(
                "SEARCH requires a selected mailbox".to_string(),
            ));
        }

        let criteria = if query.is_all() {
            vec![SearchCriteria::All]
        } else {
            let context = SearchContext {
                capabilities: &self.capabilities,
                utf8_enabled: self.utf8_enabled(),
                mailbox: self.cache.mailbox(),
                now: self.clock.now(),
            };
            query.compile(&context)?
        };

        let result = self
            .exec(&Command::Search { criteria, uid })
            .await?
            .into_result()?;

        let mut ids: Vec<u32> = result
            .untagged
            .into_iter()
            .filter_map(|u| match u {
                UntaggedResponse::Search(ids) => Some(ids),
                _ => None,
            })
            .flatten()
            .collect();

        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// Changes flags (or Gmail labels) on a message range.
    ///
    /// Flags not permitted by the mailbox are filtered out for add/set;
    /// remove passes everything through. An add/remove whose list ends up
    /// empty does not touch the wire and resolves `false`; an empty set
    /// still runs (it clears the flags).
    pub async fn store(
        &mut self,
        range: &SequenceSet,
        operation: StoreOperation,
        items: StoreItems,
        options: &StoreOptions,
    ) -> Result<bool> {
        if !self.state.is_selected() {
            return Err(Error::WrongState(
                "STORE requires a selected mailbox".to_string(),
            ));
        }

        let items = match items {
            StoreItems::Flags(flags) => {
                let flags = if operation == StoreOperation::Remove {
                    flags
                } else {
                    self.filter_permitted_flags(flags)
                };
                if flags.is_empty() && operation != StoreOperation::Set {
                    return Ok(false);
                }
                StoreItems::Flags(flags)
            }
            StoreItems::GmLabels(labels) => {
                if !self.has_capability(&Capability::XGmExt1) {
                    return Err(Error::MissingServerExtension {
                        extension: "X-GM-EXT-1".to_string(),
                    });
                }
                StoreItems::GmLabels(labels)
            }
        };

        let unchanged_since = options
            .unchanged_since
            .filter(|_| self.condstore_enabled())
            .map(ModSeq::get);

        let result = self
            .exec(&Command::Store {
                sequence: range.clone(),
                operation,
                items,
                uid: options.uid,
                silent: options.silent,
                unchanged_since,
            })
            .await?
            .into_result()?;

        Ok(result.is_ok())
    }

    fn filter_permitted_flags(&self, flags: Vec<Flag>) -> Vec<Flag> {
        self.cache.mailbox().map_or(flags.clone(), |mailbox| {
            flags
                .iter()
                .filter(|flag| mailbox.allows_flag(flag))
                .cloned()
                .collect()
        })
    }

    /// Copies messages to another mailbox.
    ///
    /// Returns the COPYUID mapping when the server provides one and the
    /// source and destination sets expand to the same length.
    pub async fn copy(
        &mut self,
        range: &SequenceSet,
        destination: &str,
        uid: bool,
    ) -> Result<CopyResult> {
        if !self.state.is_selected() {
            return Err(Error::WrongState(
                "COPY requires a selected mailbox".to_string(),
            ));
        }

        let wire_destination = self.normalize(destination);
        let result = self
            .exec(&Command::Copy {
                sequence: range.clone(),
                mailbox: Mailbox::new(wire_destination),
                uid,
            })
            .await?
            .into_result()?;

        Ok(self.copy_result(destination, result.code.as_ref(), &result.untagged))
    }

    /// Moves messages to another mailbox.
    ///
    /// Uses MOVE when advertised; otherwise falls back to COPY plus a
    /// silent `+FLAGS \Deleted`, expunging the source range only when a
    /// targeted UID EXPUNGE is possible.
    pub async fn r#move(
        &mut self,
        range: &SequenceSet,
        destination: &str,
        uid: bool,
    ) -> Result<CopyResult> {
        if !self.state.is_selected() {
            return Err(Error::WrongState(
                "MOVE requires a selected mailbox".to_string(),
            ));
        }

        if self.has_capability(&Capability::Move) {
            let wire_destination = self.normalize(destination);
            let result = self
                .exec(&Command::Move {
                    sequence: range.clone(),
                    mailbox: Mailbox::new(wire_destination),
                    uid,
                })
                .await?
                .into_result()?;

            return Ok(self.copy_result(destination, result.code.as_ref(), &result.untagged));
        }

        // Fallback: COPY, mark \Deleted, expunge where we can do so
        // without collateral damage
        let copied = self.copy(range, destination, uid).await?;

        self.store(
            range,
            StoreOperation::Add,
            StoreItems::Flags(vec![Flag::Deleted]),
            &StoreOptions {
                uid,
                silent: true,
                unchanged_since: None,
            },
        )
        .await?;

        if uid && self.has_capability(&Capability::UidPlus) {
            self.expunge(Some(range), true).await?;
        }

        Ok(copied)
    }

    fn copy_result(
        &self,
        destination: &str,
        code: Option<&ResponseCode>,
        untagged: &[UntaggedResponse],
    ) -> CopyResult {
        let path = self
            .cache
            .mailbox()
            .map(|m| m.path.clone())
            .unwrap_or_default();

        let mut result = CopyResult {
            path,
            destination: destination.to_string(),
            uid_validity: None,
            uid_map: None,
        };

        // MOVE servers may put COPYUID on an untagged OK instead
        let copyuid = match code {
            Some(code @ ResponseCode::CopyUid { .. }) => Some(code.clone()),
            _ => None,
        }
        .or_else(|| {
            untagged.iter().find_map(|u| match u.ok_code() {
                Some(code @ ResponseCode::CopyUid { .. }) => Some(code.clone()),
                _ => None,
            })
        });

        if let Some(ResponseCode::CopyUid {
            uidvalidity,
            source,
            dest,
        }) = copyuid
        {
            result.uid_validity = Some(uidvalidity);
            if let (Some(source), Some(dest)) = (source.expand(), dest.expand())
                && source.len() == dest.len()
            {
                result.uid_map = Some(source.into_iter().zip(dest).collect());
            }
        }

        result
    }

    /// Expunges deleted messages.
    ///
    /// With `uid` and a range on a UIDPLUS server, only the given UIDs are
    /// expunged; otherwise the whole mailbox's deleted set is.
    pub async fn expunge(&mut self, range: Option<&SequenceSet>, uid: bool) -> Result<bool> {
        if !self.state.is_selected() {
            return Err(Error::WrongState(
                "EXPUNGE requires a selected mailbox".to_string(),
            ));
        }

        let command = match range {
            Some(range) if uid && self.has_capability(&Capability::UidPlus) => {
                Command::UidExpunge {
                    uids: range.clone(),
                }
            }
            _ => Command::Expunge,
        };

        let result = self.exec(&command).await?.into_result()?;
        Ok(result.is_ok())
    }

    /// Appends a message to a mailbox.
    ///
    /// Verifies the size against APPENDLIMIT before touching the wire and
    /// uses a literal8 when BINARY is available. When the destination is
    /// the selected mailbox, the new sequence number is discovered via
    /// NOOP and, lacking APPENDUID, the UID via a Message-ID search.
    pub async fn append(
        &mut self,
        destination: &str,
        message: &[u8],
        flags: Option<Vec<Flag>>,
        internal_date: Option<DateTime<Utc>>,
    ) -> Result<AppendResult> {
        if !self.state.is_authenticated() {
            return Err(Error::WrongState(
                "APPEND requires authentication".to_string(),
            ));
        }

        if let Some(limit) = self.append_limit()
            && message.len() as u64 > limit
        {
            return Err(Error::CommandRejected {
                code: Some(ResponseCode::Unknown("APPENDLIMIT".to_string())),
                text: format!("message exceeds APPENDLIMIT of {limit} bytes"),
            });
        }

        let into_selected = self
            .selected_mailbox()
            .is_some_and(|m| m.path.eq_ignore_ascii_case(destination));

        let flags = flags.map(|flags| {
            if into_selected {
                self.filter_permitted_flags(flags)
            } else {
                flags
            }
        });

        let literal8 =
            self.has_capability(&Capability::Binary) && !self.config.disable_binary;
        let wire_destination = self.normalize(destination);

        let result = self
            .exec(&Command::Append {
                mailbox: Mailbox::new(wire_destination),
                flags,
                internal_date: internal_date.map(imap_date_time),
                message: message.to_vec(),
                literal8,
            })
            .await?
            .into_result()?;

        let mut append = AppendResult {
            destination: destination.to_string(),
            ..AppendResult::default()
        };

        if let Some(ResponseCode::AppendUid { uidvalidity, uid }) = result.code {
            append.uid_validity = Some(uidvalidity);
            append.uid = Some(uid);
        }

        if into_selected {
            let saw_exists = result
                .untagged
                .iter()
                .any(|u| matches!(u, UntaggedResponse::Exists(_)));
            if !saw_exists {
                // The new message's sequence number is only knowable once
                // the server reports the grown mailbox
                let _ = self.noop().await?;
            }
            append.seq = self.cache.mailbox().map(|m| m.exists);

            if append.uid.is_none() {
                append.uid = self.locate_appended_uid(message).await;
            }
        }

        Ok(append)
    }

    /// Finds the UID of a just-appended message.
    ///
    /// Searches for the message's Message-ID header; without one, falls
    /// back to the highest UID in the mailbox.
    async fn locate_appended_uid(&mut self, message: &[u8]) -> Option<Uid> {
        if !self.state.is_selected() {
            return None;
        }

        let query = message_id_of(message).map_or_else(
            || SearchQuery {
                uid: Some("*".to_string()),
                ..SearchQuery::default()
            },
            |message_id| SearchQuery {
                header: vec![("Message-ID".to_string(), Some(message_id))],
                ..SearchQuery::default()
            },
        );

        match self.search(&query, true).await {
            Ok(uids) => uids.last().copied().and_then(Uid::new),
            Err(err) => {
                tracing::debug!(?err, "appended message UID search failed");
                None
            }
        }
    }
}

/// Extracts the Message-ID header value from raw message source.
fn message_id_of(message: &[u8]) -> Option<String> {
    let header_end = message
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .unwrap_or(message.len());
    let headers = String::from_utf8_lossy(&message[..header_end]);

    for line in headers.lines() {
        if let Some(value) = line
            .strip_prefix("Message-ID:")
            .or_else(|| line.strip_prefix("Message-Id:"))
            .or_else(|| line.strip_prefix("message-id:"))
        {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
