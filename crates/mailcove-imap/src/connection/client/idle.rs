//! IDLE support (RFC 2177), with a poll fallback for servers without it.

use std::time::Duration;

use tokio::sync::Notify;

use super::ImapClient;
use crate::command::{Command, StatusAttribute};
use crate::connection::config::MissingIdleCommand;
use crate::parser::{Response, ResponseParser};
use crate::types::{Capability, Status};
use crate::{Error, Result};

/// Why an idle window ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleEvent {
    /// Another operation wants the wire; the caller should stop idling.
    Preempted,
    /// `max_idle_time` elapsed; restart to keep the connection alive.
    Restart,
    /// The server ended the idle (tagged reply or shutdown).
    Ended,
}

impl ImapClient {
    /// Runs one idle window.
    ///
    /// Server pushes received while idling flow through the cache and the
    /// event handler. The window ends when `preempt` is notified (another
    /// operation wants the pipeline), when `max_idle_time` elapses, or
    /// when the server terminates the command; in the first two cases
    /// `DONE` is written and the tagged reply drained before returning.
    ///
    /// Without the IDLE capability, falls back to a single poll with the
    /// configured command followed by a preemptible sleep.
    pub async fn idle_cycle(&mut self, preempt: &Notify) -> Result<IdleEvent> {
        if !self.state.is_selected() {
            // IDLE outside the selected state is silently skipped
            return Ok(IdleEvent::Ended);
        }

        if self.has_capability(&Capability::Idle) {
            self.idle_native(preempt).await
        } else {
            self.idle_poll(preempt).await
        }
    }

    async fn idle_native(&mut self, preempt: &Notify) -> Result<IdleEvent> {
        let tag = self.tag_gen.next();
        let command = Command::Idle.serialize_flat(&tag);
        self.stream.send(&command).await?;

        // The server answers `+ idling`; anything tagged here is a
        // rejection
        loop {
            let raw = self.read_wire().await?;
            match ResponseParser::parse(&raw) {
                Ok(Response::Continuation { .. }) => break,
                Ok(Response::Tagged {
                    tag: reply_tag,
                    status,
                    text,
                    ..
                }) if reply_tag.as_str() == tag => {
                    return match status {
                        Status::Ok => Ok(IdleEvent::Ended),
                        _ => Err(Error::CommandRejected { code: None, text }),
                    };
                }
                Ok(Response::Untagged(response)) => self.dispatch_untagged(&response),
                Ok(Response::Tagged { .. }) => {}
                Err(err) => tracing::warn!(?err, "ignoring unparseable response"),
            }
        }

        enum Wake {
            Push(Result<Vec<u8>>),
            Preempt,
            Deadline,
        }

        let max_idle = self.config.max_idle_time;
        let deadline = tokio::time::sleep(max_idle);
        tokio::pin!(deadline);

        let outcome = loop {
            let wake = tokio::select! {
                raw = self.stream.read_response() => Wake::Push(raw),
                () = preempt.notified() => Wake::Preempt,
                () = &mut deadline => Wake::Deadline,
            };

            match wake {
                Wake::Push(raw) => match ResponseParser::parse(&raw?) {
                    Ok(Response::Untagged(response)) => {
                        self.dispatch_untagged(&response);
                        if self.state.is_logout() {
                            return Ok(IdleEvent::Ended);
                        }
                    }
                    Ok(Response::Tagged { tag: reply_tag, .. })
                        if reply_tag.as_str() == tag =>
                    {
                        // Server ended the idle on its own
                        return Ok(IdleEvent::Ended);
                    }
                    Ok(_) => {}
                    Err(err) => tracing::warn!(?err, "ignoring unparseable response"),
                },
                Wake::Preempt => break IdleEvent::Preempted,
                Wake::Deadline => break IdleEvent::Restart,
            }
        };

        // Leave the idle window: DONE, then drain to the tagged reply
        self.stream.send(b"DONE\r\n").await?;
        loop {
            let raw = self.read_wire().await?;
            match ResponseParser::parse(&raw) {
                Ok(Response::Tagged {
                    tag: reply_tag,
                    status,
                    text,
                    ..
                }) if reply_tag.as_str() == tag => {
                    if matches!(status, Status::No | Status::Bad) {
                        return Err(Error::CommandRejected { code: None, text });
                    }
                    return Ok(outcome);
                }
                Ok(Response::Untagged(response)) => self.dispatch_untagged(&response),
                Ok(_) => {}
                Err(err) => tracing::warn!(?err, "ignoring unparseable response"),
            }
        }
    }

    /// NOOP/STATUS/SELECT polling loop for servers without IDLE.
    async fn idle_poll(&mut self, preempt: &Notify) -> Result<IdleEvent> {
        let path = self
            .cache
            .mailbox()
            .map(|m| m.path.clone())
            .unwrap_or_default();

        match self.config.missing_idle_command {
            MissingIdleCommand::Noop => {
                self.noop().await?;
            }
            MissingIdleCommand::Status => {
                let _ = self
                    .status_inner(
                        &path,
                        &[StatusAttribute::Messages, StatusAttribute::UidNext],
                    )
                    .await;
            }
            MissingIdleCommand::Select => {
                let options = super::SelectOptions {
                    read_only: self.cache.mailbox().is_some_and(|m| m.read_only),
                    ..super::SelectOptions::default()
                };
                let _ = self.mailbox_open(&path, &options).await;
            }
        }

        // Poll at a fraction of the idle window so changes surface at a
        // comparable latency
        let interval = self.config.max_idle_time.min(Duration::from_secs(60));
        tokio::select! {
            () = tokio::time::sleep(interval) => Ok(IdleEvent::Restart),
            () = preempt.notified() => Ok(IdleEvent::Preempted),
        }
    }

    /// Idles until roughly `duration` has passed, restarting windows as
    /// needed. Server pushes flow through the event handler.
    pub async fn idle_for(&mut self, duration: Duration) -> Result<()> {
        let never = Notify::new();
        let deadline = tokio::time::Instant::now() + duration;

        while tokio::time::Instant::now() < deadline {
            match self.idle_cycle(&never).await? {
                IdleEvent::Restart => {}
                IdleEvent::Preempted | IdleEvent::Ended => break,
            }
        }
        Ok(())
    }
}
