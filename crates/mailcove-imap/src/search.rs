//! Search-criteria compiler.
//!
//! Translates a declarative [`SearchQuery`] into the attribute list the
//! command encoder emits. Compilation is capability-aware: WITHIN, OBJECTID
//! and X-GM-EXT-1 change which atoms are produced, and keyword criteria are
//! filtered against the selected mailbox's permitted flags.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::command::SearchCriteria;
use crate::time::imap_date;
use crate::types::{Capability, Flag, SelectedMailbox};
use crate::{Error, Result};

/// A declarative search query.
///
/// Empty queries (the default) compile to `ALL`. Boolean pairs are
/// symmetric: `seen: Some(false)` emits `UNSEEN`, and `unseen: Some(false)`
/// emits `SEEN`.
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct SearchQuery {
    /// Match every message.
    pub all: bool,
    /// Messages with the \Seen flag (`Some(false)` negates).
    pub seen: Option<bool>,
    /// Messages without the \Seen flag.
    pub unseen: Option<bool>,
    /// Messages with the \Answered flag.
    pub answered: Option<bool>,
    /// Messages without the \Answered flag.
    pub unanswered: Option<bool>,
    /// Messages with the \Flagged flag.
    pub flagged: Option<bool>,
    /// Messages without the \Flagged flag.
    pub unflagged: Option<bool>,
    /// Messages with the \Deleted flag.
    pub deleted: Option<bool>,
    /// Messages without the \Deleted flag.
    pub undeleted: Option<bool>,
    /// Messages with the \Draft flag.
    pub draft: Option<bool>,
    /// Messages without the \Draft flag.
    pub undraft: Option<bool>,
    /// Recent messages not seen in any session.
    pub new: bool,
    /// Messages seen in a previous session.
    pub old: bool,
    /// Messages with the \Recent flag.
    pub recent: bool,
    /// From header contains.
    pub from: Option<String>,
    /// To header contains.
    pub to: Option<String>,
    /// Cc header contains.
    pub cc: Option<String>,
    /// Bcc header contains.
    pub bcc: Option<String>,
    /// Subject contains.
    pub subject: Option<String>,
    /// Body contains.
    pub body: Option<String>,
    /// Header or body contains.
    pub text: Option<String>,
    /// Received before this instant.
    pub before: Option<DateTime<Utc>>,
    /// Received on or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Received on this calendar day.
    pub on: Option<NaiveDate>,
    /// Larger than this many octets.
    pub larger: Option<u32>,
    /// Smaller than this many octets.
    pub smaller: Option<u32>,
    /// Modified since this mod-sequence (CONDSTORE).
    pub modseq: Option<u64>,
    /// Verbatim UID set.
    pub uid: Option<String>,
    /// Verbatim sequence set.
    pub seq: Option<String>,
    /// Messages carrying this keyword flag.
    pub keyword: Option<String>,
    /// Messages not carrying this keyword flag.
    pub unkeyword: Option<String>,
    /// Header name to value; `None` value tests header existence.
    pub header: Vec<(String, Option<String>)>,
    /// EMAILID / X-GM-MSGID lookup.
    pub email_id: Option<String>,
    /// THREADID / X-GM-THRID lookup.
    pub thread_id: Option<String>,
    /// Gmail raw search syntax (requires X-GM-EXT-1).
    pub gm_raw: Option<String>,
    /// OR of sub-queries, combined as a balanced binary tree.
    pub or: Vec<SearchQuery>,
    /// Negated sub-query.
    pub not: Option<Box<SearchQuery>>,
}

/// Capability and mailbox context a query is compiled against.
#[derive(Clone, Copy)]
pub struct SearchContext<'a> {
    /// Server capability set.
    pub capabilities: &'a [Capability],
    /// UTF8=ACCEPT has been enabled.
    pub utf8_enabled: bool,
    /// Selected mailbox, for keyword filtering.
    pub mailbox: Option<&'a SelectedMailbox>,
    /// Current time, for WITHIN offsets.
    pub now: DateTime<Utc>,
}

impl SearchContext<'_> {
    fn has(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }
}

impl SearchQuery {
    /// Creates an empty query matching all messages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the query matches everything.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self == &Self {
            all: self.all,
            ..Self::default()
        }
    }

    /// Compiles the query into the emitted attribute list.
    ///
    /// Prepends `CHARSET UTF-8` when any emitted value carries non-ASCII
    /// bytes and UTF8=ACCEPT is not enabled.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::MissingServerExtension`] for Gmail raw queries
    /// against servers without X-GM-EXT-1, and with [`Error::Protocol`] for
    /// malformed sequence sets.
    pub fn compile(&self, ctx: &SearchContext<'_>) -> Result<Vec<SearchCriteria>> {
        let mut criteria = self.compile_inner(ctx)?;

        if criteria.is_empty() {
            criteria.push(SearchCriteria::All);
        }

        if !ctx.utf8_enabled && criteria.iter().any(has_non_ascii) {
            criteria.insert(0, SearchCriteria::Charset("UTF-8".to_string()));
        }

        Ok(criteria)
    }

    #[allow(clippy::too_many_lines)]
    fn compile_inner(&self, ctx: &SearchContext<'_>) -> Result<Vec<SearchCriteria>> {
        let mut out = Vec::new();

        if self.all {
            out.push(SearchCriteria::All);
        }

        // Symmetric flag pairs: the negative form set to false flips back
        // to the positive atom.
        flag_pair(
            &mut out,
            self.seen,
            self.unseen,
            SearchCriteria::Seen,
            SearchCriteria::Unseen,
        );
        flag_pair(
            &mut out,
            self.answered,
            self.unanswered,
            SearchCriteria::Answered,
            SearchCriteria::Unanswered,
        );
        flag_pair(
            &mut out,
            self.flagged,
            self.unflagged,
            SearchCriteria::Flagged,
            SearchCriteria::Unflagged,
        );
        flag_pair(
            &mut out,
            self.deleted,
            self.undeleted,
            SearchCriteria::Deleted,
            SearchCriteria::Undeleted,
        );
        flag_pair(
            &mut out,
            self.draft,
            self.undraft,
            SearchCriteria::Draft,
            SearchCriteria::Undraft,
        );

        if self.new {
            out.push(SearchCriteria::New);
        }
        if self.old {
            out.push(SearchCriteria::Old);
        }
        if self.recent {
            out.push(SearchCriteria::Recent);
        }

        if let Some(value) = &self.from {
            out.push(SearchCriteria::From(value.clone()));
        }
        if let Some(value) = &self.to {
            out.push(SearchCriteria::To(value.clone()));
        }
        if let Some(value) = &self.cc {
            out.push(SearchCriteria::Cc(value.clone()));
        }
        if let Some(value) = &self.bcc {
            out.push(SearchCriteria::Bcc(value.clone()));
        }
        if let Some(value) = &self.subject {
            out.push(SearchCriteria::Subject(value.clone()));
        }
        if let Some(value) = &self.body {
            out.push(SearchCriteria::Body(value.clone()));
        }
        if let Some(value) = &self.text {
            out.push(SearchCriteria::Text(value.clone()));
        }

        self.compile_dates(ctx, &mut out);

        if let Some(size) = self.larger {
            out.push(SearchCriteria::Larger(size));
        }
        if let Some(size) = self.smaller {
            out.push(SearchCriteria::Smaller(size));
        }
        if let Some(modseq) = self.modseq {
            out.push(SearchCriteria::ModSeq(modseq));
        }

        if let Some(uid) = &self.uid {
            validate_sequence(uid)?;
            out.push(SearchCriteria::UidSet(uid.clone()));
        }
        if let Some(seq) = &self.seq {
            validate_sequence(seq)?;
            out.push(SearchCriteria::SequenceSet(seq.clone()));
        }

        if let Some(keyword) = &self.keyword
            && keyword_permitted(ctx, keyword)
        {
            out.push(SearchCriteria::Keyword(keyword.clone()));
        }
        if let Some(keyword) = &self.unkeyword
            && keyword_permitted(ctx, keyword)
        {
            out.push(SearchCriteria::Unkeyword(keyword.clone()));
        }

        for (name, value) in &self.header {
            out.push(SearchCriteria::Header(
                name.clone(),
                value.clone().unwrap_or_default(),
            ));
        }

        if let Some(id) = &self.email_id {
            if ctx.has(&Capability::ObjectId) {
                out.push(SearchCriteria::EmailId(id.clone()));
            } else if ctx.has(&Capability::XGmExt1) {
                out.push(SearchCriteria::GmMsgId(id.clone()));
            }
        }
        if let Some(id) = &self.thread_id {
            if ctx.has(&Capability::ObjectId) {
                out.push(SearchCriteria::ThreadId(id.clone()));
            } else if ctx.has(&Capability::XGmExt1) {
                out.push(SearchCriteria::GmThreadId(id.clone()));
            }
        }

        if let Some(raw) = &self.gm_raw {
            if !ctx.has(&Capability::XGmExt1) {
                return Err(Error::MissingServerExtension {
                    extension: "X-GM-EXT-1".to_string(),
                });
            }
            out.push(SearchCriteria::GmRaw(raw.clone()));
        }

        if let Some(inner) = &self.not {
            let compiled = inner.compile_inner(ctx)?;
            if let Some(criteria) = group(compiled) {
                out.push(SearchCriteria::Not(Box::new(criteria)));
            }
        }

        if !self.or.is_empty() {
            let mut operands = Vec::new();
            for sub in &self.or {
                if let Some(criteria) = group(sub.compile_inner(ctx)?) {
                    operands.push(criteria);
                }
            }
            if let Some(tree) = balanced_or(operands) {
                out.push(tree);
            }
        }

        Ok(out)
    }

    fn compile_dates(&self, ctx: &SearchContext<'_>, out: &mut Vec<SearchCriteria>) {
        let within = ctx.has(&Capability::Within);

        if let Some(before) = self.before {
            if within {
                let age = (ctx.now - before).num_seconds().max(0);
                #[allow(clippy::cast_sign_loss)]
                out.push(SearchCriteria::Older(age as u64));
            } else {
                // A mid-day cutoff has to cover the whole calendar day, or a
                // combined before+since range over the same day matches nothing
                let mut date = before.date_naive();
                if before.time() != NaiveTime::MIN {
                    date = date.succ_opt().unwrap_or(date);
                }
                out.push(SearchCriteria::Before(format_naive_date(date)));
            }
        }

        if let Some(since) = self.since {
            if within {
                let age = (ctx.now - since).num_seconds().max(0);
                #[allow(clippy::cast_sign_loss)]
                out.push(SearchCriteria::Younger(age as u64));
            } else {
                out.push(SearchCriteria::Since(imap_date(since)));
            }
        }

        if let Some(on) = self.on {
            out.push(SearchCriteria::On(format_naive_date(on)));
        }
    }
}

/// Emits one atom for a symmetric positive/negative flag pair.
fn flag_pair(
    out: &mut Vec<SearchCriteria>,
    positive: Option<bool>,
    negative: Option<bool>,
    positive_atom: SearchCriteria,
    negative_atom: SearchCriteria,
) {
    match positive {
        Some(true) => out.push(positive_atom.clone()),
        Some(false) => out.push(negative_atom.clone()),
        None => {}
    }
    match negative {
        Some(true) => out.push(negative_atom),
        Some(false) => out.push(positive_atom),
        None => {}
    }
}

/// Wraps a compiled sub-query into a single operand.
fn group(mut criteria: Vec<SearchCriteria>) -> Option<SearchCriteria> {
    match criteria.len() {
        0 => None,
        1 => criteria.pop(),
        _ => Some(SearchCriteria::And(criteria)),
    }
}

/// Builds a balanced binary OR tree by pairing adjacent operands until one
/// node remains. A single operand bypasses OR entirely.
fn balanced_or(mut operands: Vec<SearchCriteria>) -> Option<SearchCriteria> {
    if operands.is_empty() {
        return None;
    }

    while operands.len() > 1 {
        let mut next = Vec::with_capacity(operands.len().div_ceil(2));
        let mut iter = operands.into_iter();
        while let Some(left) = iter.next() {
            if let Some(right) = iter.next() {
                next.push(SearchCriteria::Or(Box::new(left), Box::new(right)));
            } else {
                next.push(left);
            }
        }
        operands = next;
    }

    operands.pop()
}

fn keyword_permitted(ctx: &SearchContext<'_>, keyword: &str) -> bool {
    ctx.mailbox.is_none_or(|mailbox| {
        mailbox.permanent_flags.allows_any()
            || mailbox.flags.contains(&Flag::parse(keyword))
            || mailbox.permanent_flags.contains(&Flag::parse(keyword))
    })
}

fn validate_sequence(value: &str) -> Result<()> {
    crate::types::SequenceSet::parse(value)
        .map(|_| ())
        .ok_or_else(|| Error::Protocol(format!("invalid sequence set in search query: {value}")))
}

fn format_naive_date(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}

fn has_non_ascii(criteria: &SearchCriteria) -> bool {
    match criteria {
        SearchCriteria::Subject(s)
        | SearchCriteria::From(s)
        | SearchCriteria::To(s)
        | SearchCriteria::Cc(s)
        | SearchCriteria::Bcc(s)
        | SearchCriteria::Body(s)
        | SearchCriteria::Text(s)
        | SearchCriteria::Keyword(s)
        | SearchCriteria::Unkeyword(s)
        | SearchCriteria::GmRaw(s) => !s.is_ascii(),
        SearchCriteria::Header(name, value) => !name.is_ascii() || !value.is_ascii(),
        SearchCriteria::Or(a, b) => has_non_ascii(a) || has_non_ascii(b),
        SearchCriteria::Not(inner) => has_non_ascii(inner),
        SearchCriteria::And(items) => items.iter().any(has_non_ascii),
        _ => false,
    }
}
