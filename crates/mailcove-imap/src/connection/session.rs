//! Shared session with the mailbox lock.
//!
//! `Session` wraps the client in a fair async mutex so multiple tasks can
//! share one connection. Operations that need the selected mailbox take a
//! [`MailboxLock`]: a lease that pins the selection until released.
//! Concurrent lock requests queue FIFO (tokio's mutex is fair), and any
//! session operation preempts a running IDLE before taking the wire.

use std::future::{Future, poll_fn};
use std::ops::{Deref, DerefMut};
use std::pin::pin;
use std::sync::Arc;
use std::task::Poll;

use tokio::sync::{Mutex, Notify, OwnedMutexGuard};

use super::client::{IdleEvent, ImapClient, SelectOptions};
use crate::Result;

/// A shareable IMAP session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<ImapClient>>,
    /// Pre-check signal: wakes a running IDLE so the wire frees up.
    idle_wake: Arc<Notify>,
}

impl Session {
    /// Wraps a connected client.
    #[must_use]
    pub fn new(client: ImapClient) -> Self {
        Self {
            inner: Arc::new(Mutex::new(client)),
            idle_wake: Arc::new(Notify::new()),
        }
    }

    /// Acquires the client, preempting IDLE first.
    ///
    /// The returned guard holds the wire; drop it promptly.
    pub async fn client(&self) -> OwnedMutexGuard<ImapClient> {
        // A permit is stored if the idle loop isn't at its select yet, so
        // the wake-up cannot be lost
        self.idle_wake.notify_one();
        Arc::clone(&self.inner).lock_owned().await
    }

    /// Ensures `path` is selected and returns a lease over it.
    ///
    /// While the lease is held, other lock requests (including for other
    /// mailboxes) wait in FIFO order. Dropping the lease releases it;
    /// [`MailboxLock::release`] does the same explicitly and is idempotent
    /// by construction.
    pub async fn mailbox_lock(&self, path: &str, options: &SelectOptions) -> Result<MailboxLock> {
        let mut guard = self.client().await;

        let already_selected = guard
            .selected_mailbox()
            .is_some_and(|m| m.path.eq_ignore_ascii_case(path) && m.read_only == options.read_only);

        if !already_selected {
            guard.mailbox_open(path, options).await?;
        }

        let path = guard
            .selected_mailbox()
            .map(|m| m.path.clone())
            .unwrap_or_else(|| path.to_string());

        Ok(MailboxLock { guard, path })
    }

    /// Idles until another session operation preempts it.
    ///
    /// The idle window restarts every `max_idle_time` to keep the
    /// connection alive; servers without IDLE are polled with the
    /// configured fallback command. Returns when preempted or when the
    /// server ends the connection.
    pub async fn idle(&self) -> Result<()> {
        // Consume any permit left behind by operations that ran between
        // idle windows, so it cannot end this idle before it begins
        {
            let mut stale = pin!(self.idle_wake.notified());
            poll_fn(|cx| {
                let _ = stale.as_mut().poll(cx);
                Poll::Ready(())
            })
            .await;
        }

        loop {
            let mut guard = self.inner.clone().lock_owned().await;
            match guard.idle_cycle(&self.idle_wake).await? {
                IdleEvent::Restart => {
                    // Release the wire between windows so queued
                    // operations can cut in
                    drop(guard);
                    tokio::task::yield_now().await;
                }
                IdleEvent::Preempted | IdleEvent::Ended => return Ok(()),
            }
        }
    }

    /// Logs out and closes the connection.
    pub async fn logout(&self) -> Result<bool> {
        let mut guard = self.client().await;
        guard.logout().await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

/// A lease over the selected mailbox.
///
/// Derefs to the client, so all selected-state operations are available
/// while the lease is held.
pub struct MailboxLock {
    guard: OwnedMutexGuard<ImapClient>,
    path: String,
}

impl MailboxLock {
    /// The path this lease pins.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Releases the lease.
    pub fn release(self) {
        drop(self);
    }
}

impl Deref for MailboxLock {
    type Target = ImapClient;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for MailboxLock {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl std::fmt::Debug for MailboxLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxLock")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
