//! Selected-mailbox cache.
//!
//! Digests untagged responses into the [`SelectedMailbox`] record and
//! emits events. Invariants enforced here: `exists` is updated before the
//! event fires, HIGHESTMODSEQ only moves upward, and UIDVALIDITY is set
//! once per selection.

use crate::handler::{EventHandler, ExistsEvent, ExpungeEvent, FlagsEvent};
use crate::parser::{FetchField, UntaggedResponse};
use crate::types::{ResponseCode, SelectedMailbox, Uid};

/// Cache for the currently selected mailbox.
#[derive(Debug, Default)]
pub(crate) struct MailboxCache {
    mailbox: Option<SelectedMailbox>,
}

impl MailboxCache {
    /// Returns the selected mailbox, if any.
    pub fn mailbox(&self) -> Option<&SelectedMailbox> {
        self.mailbox.as_ref()
    }

    /// Returns the selected mailbox mutably, if any.
    pub fn mailbox_mut(&mut self) -> Option<&mut SelectedMailbox> {
        self.mailbox.as_mut()
    }

    /// Installs a fresh record for a mailbox being selected.
    pub fn open(&mut self, mailbox: SelectedMailbox) {
        self.mailbox = Some(mailbox);
    }

    /// Clears the cache, returning the previous record.
    pub fn close(&mut self) -> Option<SelectedMailbox> {
        self.mailbox.take()
    }

    /// Applies an untagged response, emitting events through the handler.
    pub fn apply(&mut self, response: &UntaggedResponse, handler: &mut dyn EventHandler) {
        match response {
            UntaggedResponse::Exists(count) => self.apply_exists(*count, handler),
            UntaggedResponse::Recent(count) => {
                if let Some(mailbox) = &mut self.mailbox {
                    mailbox.recent = *count;
                }
            }
            UntaggedResponse::Expunge(seq) => {
                let Some(mailbox) = &mut self.mailbox else {
                    return;
                };
                mailbox.exists = mailbox.exists.saturating_sub(1);
                handler.on_expunge(&ExpungeEvent {
                    path: mailbox.path.clone(),
                    seq: Some(*seq),
                    uid: None,
                    vanished: false,
                    earlier: false,
                });
            }
            UntaggedResponse::Vanished { earlier, uids } => {
                let Some(mailbox) = &self.mailbox else {
                    return;
                };
                let path = mailbox.path.clone();
                let uids = uids.expand().unwrap_or_default();
                if let Some(mailbox) = &mut self.mailbox
                    && !*earlier
                {
                    let removed = u32::try_from(uids.len()).unwrap_or(u32::MAX);
                    mailbox.exists = mailbox.exists.saturating_sub(removed);
                }
                for uid in uids {
                    let Some(uid) = Uid::new(uid) else { continue };
                    handler.on_expunge(&ExpungeEvent {
                        path: path.clone(),
                        seq: None,
                        uid: Some(uid),
                        vanished: true,
                        earlier: *earlier,
                    });
                }
            }
            UntaggedResponse::Fetch { seq, fields } => self.apply_fetch(*seq, fields, handler),
            UntaggedResponse::Flags(flags) => {
                if let Some(mailbox) = &mut self.mailbox {
                    mailbox.flags = flags.clone();
                }
            }
            UntaggedResponse::Condition { .. } => {
                if let Some(code) = response.ok_code() {
                    self.apply_code(code);
                }
            }
            _ => {}
        }
    }

    fn apply_exists(&mut self, count: u32, handler: &mut dyn EventHandler) {
        let Some(mailbox) = &mut self.mailbox else {
            return;
        };

        let prev_count = mailbox.exists;
        mailbox.exists = count;

        if count != prev_count {
            handler.on_exists(&ExistsEvent {
                path: mailbox.path.clone(),
                count,
                prev_count,
            });
        }
    }

    fn apply_fetch(
        &mut self,
        seq: crate::types::SeqNum,
        fields: &[FetchField],
        handler: &mut dyn EventHandler,
    ) {
        let Some(mailbox) = &mut self.mailbox else {
            return;
        };

        let mut flags = None;
        let mut uid = None;
        let mut modseq = None;

        for field in fields {
            match field {
                FetchField::Flags(f) => flags = Some(f.clone()),
                FetchField::Uid(u) => uid = Some(*u),
                FetchField::ModSeq(m) => modseq = Some(*m),
                _ => {}
            }
        }

        // A pushed MODSEQ above the cached high-water mark moves it up
        if let Some(modseq) = modseq
            && mailbox.highest_modseq.is_none_or(|current| modseq > current)
        {
            mailbox.highest_modseq = Some(modseq);
        }

        if let Some(flags) = flags {
            handler.on_flags(&FlagsEvent {
                path: mailbox.path.clone(),
                seq,
                uid,
                modseq,
                flags,
            });
        }
    }

    /// Applies a response code from an untagged OK.
    pub fn apply_code(&mut self, code: &ResponseCode) {
        let Some(mailbox) = &mut self.mailbox else {
            return;
        };

        match code {
            ResponseCode::UidValidity(validity) => mailbox.uid_validity = Some(*validity),
            ResponseCode::UidNext(uid) => mailbox.uid_next = Some(*uid),
            ResponseCode::Unseen(seq) => mailbox.unseen = Some(*seq),
            ResponseCode::PermanentFlags(flags) => mailbox.permanent_flags = flags.clone(),
            ResponseCode::HighestModSeq(modseq) => {
                // Monotone non-decreasing; stale values are discarded
                if mailbox.highest_modseq.is_none_or(|current| *modseq > current) {
                    mailbox.highest_modseq = Some(*modseq);
                }
            }
            ResponseCode::NoModSeq => {
                mailbox.no_modseq = true;
                mailbox.highest_modseq = None;
            }
            ResponseCode::MailboxId(id) => mailbox.mailbox_id = Some(id.clone()),
            ResponseCode::ReadOnly => mailbox.read_only = true,
            ResponseCode::ReadWrite => mailbox.read_only = false,
            _ => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::handler::{CollectingHandler, MailboxEvent};
    use crate::types::{Flag, Flags, ModSeq, SeqNum, SequenceSet, UidValidity};

    fn cache_with_inbox(exists: u32) -> MailboxCache {
        let mut cache = MailboxCache::default();
        let mut mailbox = SelectedMailbox::new("INBOX");
        mailbox.exists = exists;
        cache.open(mailbox);
        cache
    }

    #[test]
    fn exists_updates_before_event() {
        let mut cache = cache_with_inbox(10);
        let mut handler = CollectingHandler::new();

        cache.apply(&UntaggedResponse::Exists(11), &mut handler);

        assert_eq!(cache.mailbox().unwrap().exists, 11);
        assert_eq!(
            handler.events,
            vec![MailboxEvent::Exists(ExistsEvent {
                path: "INBOX".to_string(),
                count: 11,
                prev_count: 10,
            })]
        );
    }

    #[test]
    fn exists_with_same_count_is_silent() {
        let mut cache = cache_with_inbox(10);
        let mut handler = CollectingHandler::new();

        cache.apply(&UntaggedResponse::Exists(10), &mut handler);

        assert!(handler.events.is_empty());
        assert_eq!(cache.mailbox().unwrap().exists, 10);
    }

    #[test]
    fn expunge_emits_seq_event() {
        let mut cache = cache_with_inbox(5);
        let mut handler = CollectingHandler::new();

        cache.apply(
            &UntaggedResponse::Expunge(SeqNum::new(3).unwrap()),
            &mut handler,
        );

        assert_eq!(cache.mailbox().unwrap().exists, 4);
        if let MailboxEvent::Expunge(event) = &handler.events[0] {
            assert_eq!(event.seq, SeqNum::new(3));
            assert!(!event.vanished);
        } else {
            panic!("Expected expunge event");
        }
    }

    #[test]
    fn vanished_emits_per_uid_with_earlier() {
        let mut cache = cache_with_inbox(5);
        let mut handler = CollectingHandler::new();

        cache.apply(
            &UntaggedResponse::Vanished {
                earlier: true,
                uids: SequenceSet::parse("100:102").unwrap(),
            },
            &mut handler,
        );

        assert_eq!(handler.events.len(), 3);
        for event in &handler.events {
            if let MailboxEvent::Expunge(event) = event {
                assert!(event.vanished);
                assert!(event.earlier);
                assert!(event.uid.is_some());
            } else {
                panic!("Expected expunge event");
            }
        }
        // Selection-time replay does not shrink the current count
        assert_eq!(cache.mailbox().unwrap().exists, 5);
    }

    #[test]
    fn fetch_flags_emits_event_and_bumps_modseq() {
        let mut cache = cache_with_inbox(5);
        cache.mailbox_mut().unwrap().highest_modseq = ModSeq::new(100);
        let mut handler = CollectingHandler::new();

        cache.apply(
            &UntaggedResponse::Fetch {
                seq: SeqNum::new(2).unwrap(),
                fields: vec![
                    FetchField::Flags(Flags::from_vec(vec![Flag::Seen])),
                    FetchField::Uid(Uid::new(42).unwrap()),
                    FetchField::ModSeq(ModSeq::new(250).unwrap()),
                ],
            },
            &mut handler,
        );

        assert_eq!(cache.mailbox().unwrap().highest_modseq, ModSeq::new(250));
        if let MailboxEvent::Flags(event) = &handler.events[0] {
            assert_eq!(event.seq.get(), 2);
            assert_eq!(event.uid, Uid::new(42));
            assert_eq!(event.modseq, ModSeq::new(250));
            assert!(event.flags.is_seen());
        } else {
            panic!("Expected flags event");
        }
    }

    #[test]
    fn highest_modseq_never_decreases() {
        let mut cache = cache_with_inbox(5);
        cache.mailbox_mut().unwrap().highest_modseq = ModSeq::new(500);

        cache.apply_code(&ResponseCode::HighestModSeq(ModSeq::new(400).unwrap()));
        assert_eq!(cache.mailbox().unwrap().highest_modseq, ModSeq::new(500));

        cache.apply_code(&ResponseCode::HighestModSeq(ModSeq::new(600).unwrap()));
        assert_eq!(cache.mailbox().unwrap().highest_modseq, ModSeq::new(600));
    }

    #[test]
    fn nomodseq_clears_tracking() {
        let mut cache = cache_with_inbox(5);
        cache.mailbox_mut().unwrap().highest_modseq = ModSeq::new(500);

        cache.apply_code(&ResponseCode::NoModSeq);

        let mailbox = cache.mailbox().unwrap();
        assert!(mailbox.no_modseq);
        assert!(mailbox.highest_modseq.is_none());
    }

    #[test]
    fn select_codes_populate_mailbox() {
        let mut cache = cache_with_inbox(0);

        cache.apply_code(&ResponseCode::UidValidity(UidValidity::new(777).unwrap()));
        cache.apply_code(&ResponseCode::UidNext(Uid::new(101).unwrap()));
        cache.apply_code(&ResponseCode::MailboxId("F1234".to_string()));
        cache.apply_code(&ResponseCode::ReadOnly);

        let mailbox = cache.mailbox().unwrap();
        assert_eq!(mailbox.uid_validity, UidValidity::new(777));
        assert_eq!(mailbox.uid_next, Uid::new(101));
        assert_eq!(mailbox.mailbox_id.as_deref(), Some("F1234"));
        assert!(mailbox.read_only);
    }
}
