//! Event handler for mailbox and connection updates.
//!
//! IMAP servers push EXISTS, EXPUNGE, VANISHED and FETCH responses at any
//! time. The selected-mailbox cache digests them and emits events through
//! this trait, in the order the server produced them.

use crate::types::{Flags, ModSeq, SelectedMailbox, SeqNum, Uid};

/// Message-count change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistsEvent {
    /// Mailbox path.
    pub path: String,
    /// New message count.
    pub count: u32,
    /// Count before this update.
    pub prev_count: u32,
}

/// Message removal, by sequence number or (for VANISHED) by UID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpungeEvent {
    /// Mailbox path.
    pub path: String,
    /// Sequence number, for classic EXPUNGE.
    pub seq: Option<SeqNum>,
    /// UID, for VANISHED removals.
    pub uid: Option<Uid>,
    /// The removal arrived as a VANISHED response.
    pub vanished: bool,
    /// The removal happened before this session (QRESYNC replay).
    pub earlier: bool,
}

/// Flag change on a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagsEvent {
    /// Mailbox path.
    pub path: String,
    /// Message sequence number.
    pub seq: SeqNum,
    /// Message UID, when the server included it.
    pub uid: Option<Uid>,
    /// Modification sequence, when CONDSTORE is in play.
    pub modseq: Option<ModSeq>,
    /// The new flag set.
    pub flags: Flags,
}

/// Handler for server-pushed updates.
///
/// All methods have no-op defaults; implement the ones you care about.
pub trait EventHandler: Send {
    /// Called when the message count changes.
    fn on_exists(&mut self, event: &ExistsEvent) {
        let _ = event;
    }

    /// Called when a message is removed (EXPUNGE or VANISHED).
    fn on_expunge(&mut self, event: &ExpungeEvent) {
        let _ = event;
    }

    /// Called when a message's flags change.
    fn on_flags(&mut self, event: &FlagsEvent) {
        let _ = event;
    }

    /// Called after a mailbox is opened.
    fn on_mailbox_open(&mut self, mailbox: &SelectedMailbox) {
        let _ = mailbox;
    }

    /// Called after the selected mailbox is closed.
    fn on_mailbox_close(&mut self, mailbox: &SelectedMailbox) {
        let _ = mailbox;
    }

    /// Called when the server is closing the connection (BYE response).
    fn on_bye(&mut self, text: &str) {
        let _ = text;
    }

    /// Called when the server sends an ALERT response code.
    ///
    /// Per RFC 3501, ALERT text is meant to reach the user.
    fn on_alert(&mut self, text: &str) {
        let _ = text;
    }
}

/// A no-op handler that ignores all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl EventHandler for NoopHandler {}

/// A handler that logs updates using tracing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_exists(&mut self, event: &ExistsEvent) {
        tracing::debug!(path = %event.path, count = event.count, prev = event.prev_count, "EXISTS");
    }

    fn on_expunge(&mut self, event: &ExpungeEvent) {
        tracing::debug!(
            path = %event.path,
            seq = event.seq.map(SeqNum::get),
            uid = event.uid.map(Uid::get),
            vanished = event.vanished,
            "EXPUNGE"
        );
    }

    fn on_flags(&mut self, event: &FlagsEvent) {
        tracing::debug!(path = %event.path, seq = event.seq.get(), flags = ?event.flags, "FLAGS");
    }

    fn on_mailbox_open(&mut self, mailbox: &SelectedMailbox) {
        tracing::info!(path = %mailbox.path, exists = mailbox.exists, "mailbox open");
    }

    fn on_mailbox_close(&mut self, mailbox: &SelectedMailbox) {
        tracing::info!(path = %mailbox.path, "mailbox close");
    }

    fn on_bye(&mut self, text: &str) {
        tracing::info!(text, "BYE");
    }

    fn on_alert(&mut self, text: &str) {
        tracing::warn!(text, "ALERT");
    }
}

/// An event collected by [`CollectingHandler`].
#[derive(Debug, Clone, PartialEq)]
pub enum MailboxEvent {
    /// EXISTS update.
    Exists(ExistsEvent),
    /// EXPUNGE/VANISHED update.
    Expunge(ExpungeEvent),
    /// Flag update.
    Flags(FlagsEvent),
    /// Mailbox opened.
    MailboxOpen(String),
    /// Mailbox closed.
    MailboxClose(String),
    /// BYE received.
    Bye(String),
    /// ALERT received.
    Alert(String),
}

/// A handler that collects events for later processing.
///
/// Useful for testing or batch processing of events.
#[derive(Debug, Default, Clone)]
pub struct CollectingHandler {
    /// Collected events.
    pub events: Vec<MailboxEvent>,
}

impl CollectingHandler {
    /// Creates a new collecting handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes all collected events, leaving the handler empty.
    pub fn take(&mut self) -> Vec<MailboxEvent> {
        std::mem::take(&mut self.events)
    }
}

impl EventHandler for CollectingHandler {
    fn on_exists(&mut self, event: &ExistsEvent) {
        self.events.push(MailboxEvent::Exists(event.clone()));
    }

    fn on_expunge(&mut self, event: &ExpungeEvent) {
        self.events.push(MailboxEvent::Expunge(event.clone()));
    }

    fn on_flags(&mut self, event: &FlagsEvent) {
        self.events.push(MailboxEvent::Flags(event.clone()));
    }

    fn on_mailbox_open(&mut self, mailbox: &SelectedMailbox) {
        self.events
            .push(MailboxEvent::MailboxOpen(mailbox.path.clone()));
    }

    fn on_mailbox_close(&mut self, mailbox: &SelectedMailbox) {
        self.events
            .push(MailboxEvent::MailboxClose(mailbox.path.clone()));
    }

    fn on_bye(&mut self, text: &str) {
        self.events.push(MailboxEvent::Bye(text.to_string()));
    }

    fn on_alert(&mut self, text: &str) {
        self.events.push(MailboxEvent::Alert(text.to_string()));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn noop_handler_ignores_everything() {
        let mut handler = NoopHandler;
        handler.on_exists(&ExistsEvent {
            path: "INBOX".to_string(),
            count: 10,
            prev_count: 9,
        });
        handler.on_bye("goodbye");
        handler.on_alert("important!");
    }

    #[test]
    fn collecting_handler_keeps_order() {
        let mut handler = CollectingHandler::new();

        handler.on_exists(&ExistsEvent {
            path: "INBOX".to_string(),
            count: 50,
            prev_count: 49,
        });
        handler.on_expunge(&ExpungeEvent {
            path: "INBOX".to_string(),
            seq: SeqNum::new(3),
            uid: None,
            vanished: false,
            earlier: false,
        });
        handler.on_alert("Test alert");

        assert_eq!(handler.events.len(), 3);
        assert!(matches!(handler.events[0], MailboxEvent::Exists(_)));
        assert!(matches!(handler.events[1], MailboxEvent::Expunge(_)));
        assert_eq!(
            handler.events[2],
            MailboxEvent::Alert("Test alert".to_string())
        );

        let taken = handler.take();
        assert_eq!(taken.len(), 3);
        assert!(handler.events.is_empty());
    }
}
