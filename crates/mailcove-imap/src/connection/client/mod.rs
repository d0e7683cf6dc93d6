//! The IMAP client: connection core and command pipeline.
//!
//! One command holds the wire at a time (enforced by `&mut self`); the
//! [`exec`](ImapClient::exec) primitive serialises command segments,
//! drives the literal-synchronisation handshake, dispatches untagged
//! responses to the selected-mailbox cache, and resolves on the tagged
//! reply.

#![allow(clippy::missing_errors_doc)]

mod auth;
mod idle;
mod mailbox;
mod message;

pub use idle::IdleEvent;
pub use mailbox::{ListOptions, MailboxCreated, RenameResult, SelectOptions};
pub use message::{
    AppendResult, BodyPartRequest, CopyResult, FetchOptions, FetchQuery, FetchedMessage,
    HeaderFetch, PartialRange, StoreOptions,
};

use std::sync::Arc;

use crate::cache::MailboxCache;
use crate::command::{Command, TagGenerator};
use crate::connection::config::Config;
use crate::connection::state::ProtocolState;
use crate::connection::stream::{Dialer, ImapStream, TcpDialer, connect_transport};
use crate::connection::wire::WireStream;
use crate::handler::{EventHandler, NoopHandler};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::time::{Clock, SystemClock};
use crate::types::{
    Capability, Folder, Namespaces, ResponseCode, SelectedMailbox, Status,
};
use crate::{Error, Result};

/// Outcome of one executed command.
#[derive(Debug)]
pub(crate) struct ExecResult {
    /// Tagged response status.
    pub status: Status,
    /// Response code from the tagged reply.
    pub code: Option<ResponseCode>,
    /// Human-readable tagged text.
    pub text: String,
    /// Untagged responses received while the command was in flight.
    pub untagged: Vec<UntaggedResponse>,
}

impl ExecResult {
    /// Returns true if the command succeeded.
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Converts a NO/BAD into the matching error.
    pub fn into_result(self) -> Result<Self> {
        match self.status {
            Status::Ok | Status::PreAuth => Ok(self),
            Status::No if self.code == Some(ResponseCode::Throttled) => Err(Error::Throttled {
                retry_after: message::THROTTLE_RESET,
            }),
            Status::No | Status::Bad => Err(Error::CommandRejected {
                code: self.code,
                text: self.text,
            }),
            Status::Bye => Err(Error::Bye(self.text)),
        }
    }
}

/// An IMAP client connection.
///
/// Created with [`ImapClient::connect`]; operations become available as
/// the protocol state advances (NOT AUTHENTICATED → AUTHENTICATED →
/// SELECTED). Wrong-state calls are no-ops for best-effort operations and
/// errors for the rest.
pub struct ImapClient {
    pub(crate) stream: WireStream<ImapStream>,
    pub(crate) config: Config,
    pub(crate) state: ProtocolState,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) capabilities: Vec<Capability>,
    /// AUTH= mechanisms the server advertised before authentication.
    pub(crate) auth_capabilities: Vec<String>,
    /// Extensions switched on via ENABLE.
    pub(crate) enabled: Vec<String>,
    pub(crate) cache: MailboxCache,
    pub(crate) handler: Box<dyn EventHandler>,
    /// Folder tree from the last LIST, for delimiters and special-use.
    pub(crate) folders: Vec<Folder>,
    pub(crate) namespaces: Option<Namespaces>,
    pub(crate) server_info: Option<Vec<(String, String)>>,
    /// A state transition made the cached capability set stale.
    pub(crate) expect_capability_update: bool,
    pub(crate) encrypted: bool,
    pub(crate) compressed: bool,
    /// Wall clock, swappable for deterministic search-date tests.
    pub(crate) clock: Arc<dyn Clock>,
}

impl ImapClient {
    /// Connects using a plain TCP dialer and reads the server greeting.
    pub async fn connect(config: Config) -> Result<Self> {
        Self::connect_with(config, &TcpDialer).await
    }

    /// Connects through the given dialer and reads the server greeting.
    pub async fn connect_with(config: Config, dialer: &dyn Dialer) -> Result<Self> {
        let stream = connect_transport(&config, dialer).await?;
        Self::from_stream(config, stream).await
    }

    /// Builds a client over an already-established transport.
    ///
    /// Reads the server greeting: `OK` leaves the client unauthenticated,
    /// `PREAUTH` lands directly in the authenticated state, `BYE` fails.
    pub async fn from_stream(config: Config, stream: ImapStream) -> Result<Self> {
        let encrypted = stream.is_tls();
        let mut client = Self {
            stream: WireStream::new(stream),
            config,
            state: ProtocolState::NotAuthenticated,
            tag_gen: TagGenerator::default(),
            capabilities: Vec::new(),
            auth_capabilities: Vec::new(),
            enabled: Vec::new(),
            cache: MailboxCache::default(),
            handler: Box::new(NoopHandler),
            folders: Vec::new(),
            namespaces: None,
            server_info: None,
            expect_capability_update: false,
            encrypted,
            compressed: false,
            clock: Arc::new(SystemClock),
        };

        let greeting_timeout = client.config.greeting_timeout;
        let greeting = tokio::time::timeout(greeting_timeout, client.stream.read_response())
            .await
            .map_err(|_| Error::Timeout(greeting_timeout))??;

        match ResponseParser::parse(&greeting)? {
            Response::Untagged(UntaggedResponse::Condition { status, code, text }) => {
                match status {
                    Status::Ok => {}
                    Status::PreAuth => client.state = ProtocolState::Authenticated,
                    Status::Bye => return Err(Error::Bye(text)),
                    Status::No | Status::Bad => {
                        return Err(Error::Protocol(format!("greeting was {status:?}: {text}")));
                    }
                }
                if let Some(ResponseCode::Capability(caps)) = code {
                    client.install_capabilities(caps);
                } else {
                    client.expect_capability_update = true;
                }
            }
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        }

        tracing::debug!(host = %client.config.host, state = ?client.state, "greeting received");
        Ok(client)
    }

    /// Installs an event handler for server-pushed updates.
    pub fn set_handler(&mut self, handler: impl EventHandler + 'static) {
        self.handler = Box::new(handler);
    }

    /// Replaces the wall clock (deterministic WITHIN search offsets).
    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    /// Returns the current protocol state.
    #[must_use]
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Returns the cached capability set.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Returns the extensions enabled via ENABLE.
    #[must_use]
    pub fn enabled(&self) -> &[String] {
        &self.enabled
    }

    /// Returns the AUTH= mechanisms from the latest capability set.
    #[must_use]
    pub fn auth_capabilities(&self) -> &[String] {
        &self.auth_capabilities
    }

    /// Returns the currently selected mailbox, if any.
    #[must_use]
    pub fn selected_mailbox(&self) -> Option<&SelectedMailbox> {
        self.cache.mailbox()
    }

    /// Returns the server info from the last ID exchange.
    #[must_use]
    pub fn server_info(&self) -> Option<&[(String, String)]> {
        self.server_info.as_deref()
    }

    /// Returns the namespaces from the last NAMESPACE call.
    #[must_use]
    pub fn namespaces(&self) -> Option<&Namespaces> {
        self.namespaces.as_ref()
    }

    /// Returns the folder tree from the last LIST call.
    #[must_use]
    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    /// Checks if the server has a specific capability.
    #[must_use]
    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Returns true if the server supports the given AUTH= mechanism.
    #[must_use]
    pub fn supports_auth(&self, mechanism: &str) -> bool {
        self.capabilities
            .iter()
            .any(|c| matches!(c, Capability::Auth(m) if m.eq_ignore_ascii_case(mechanism)))
    }

    /// Returns the advertised APPENDLIMIT, if any.
    #[must_use]
    pub fn append_limit(&self) -> Option<u64> {
        self.capabilities.iter().find_map(|c| match c {
            Capability::AppendLimit(limit) => *limit,
            _ => None,
        })
    }

    /// Returns true if UTF8=ACCEPT has been enabled.
    #[must_use]
    pub fn utf8_enabled(&self) -> bool {
        self.enabled.iter().any(|e| e == "UTF8=ACCEPT")
    }

    /// Returns true if QRESYNC has been enabled.
    #[must_use]
    pub fn qresync_enabled(&self) -> bool {
        self.enabled.iter().any(|e| e == "QRESYNC")
    }

    /// Returns true if CONDSTORE is usable (enabled or advertised).
    #[must_use]
    pub fn condstore_enabled(&self) -> bool {
        self.enabled.iter().any(|e| e == "CONDSTORE")
            || self.has_capability(&Capability::CondStore)
    }

    /// Returns true if the transport is encrypted.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Normalises a caller path for the wire.
    pub(crate) fn normalize(&self, path: &str) -> String {
        crate::paths::normalize_path(path, self.delimiter_hint(), self.utf8_enabled())
    }

    /// Best known hierarchy delimiter.
    pub(crate) fn delimiter_hint(&self) -> Option<char> {
        self.cache
            .mailbox()
            .and_then(|m| m.delimiter)
            .or_else(|| self.folders.iter().find_map(|f| f.delimiter))
    }

    // === Command pipeline ===

    /// Executes a command with no continuation handling beyond literals.
    pub(crate) async fn exec(&mut self, command: &Command) -> Result<ExecResult> {
        self.exec_with(command, |_| None).await
    }

    /// Executes a command, driving literal synchronisation and invoking
    /// `on_continuation` for non-literal `+` prompts (AUTHENTICATE).
    ///
    /// Untagged responses are dispatched to the mailbox cache as they
    /// arrive and collected for the caller; the tagged reply resolves the
    /// command.
    pub(crate) async fn exec_with<F>(
        &mut self,
        command: &Command,
        mut on_continuation: F,
    ) -> Result<ExecResult>
    where
        F: FnMut(&str) -> Option<Vec<u8>>,
    {
        if self.state.is_logout() {
            return Err(Error::NoConnection("connection is logged out".to_string()));
        }

        let tag = self.tag_gen.next();
        let literal_plus = self.has_capability(&Capability::LiteralPlus);
        let utf8 = self.utf8_enabled();
        let segments = command.serialize(&tag, literal_plus, utf8);

        let mut untagged = Vec::new();

        for segment in &segments {
            self.write_wire(&segment.bytes).await?;

            if segment.awaits_continuation {
                // Literal handshake: the payload may only follow a `+`;
                // a tagged NO/BAD aborts the whole command
                loop {
                    let raw = self.read_wire().await?;
                    match ResponseParser::parse(&raw) {
                        Ok(Response::Continuation { .. }) => break,
                        Ok(Response::Tagged {
                            tag: reply_tag,
                            status,
                            code,
                            text,
                        }) if reply_tag.as_str() == tag => {
                            return ExecResult {
                                status,
                                code,
                                text,
                                untagged,
                            }
                            .into_result();
                        }
                        Ok(Response::Untagged(response)) => {
                            self.dispatch_untagged(&response);
                            untagged.push(response);
                        }
                        Ok(Response::Tagged { .. }) => {}
                        Err(err) => {
                            tracing::warn!(?err, "ignoring unparseable response");
                        }
                    }
                }
            }
        }

        loop {
            let raw = self.read_wire().await?;
            match ResponseParser::parse(&raw) {
                Ok(Response::Tagged {
                    tag: reply_tag,
                    status,
                    code,
                    text,
                }) if reply_tag.as_str() == tag => {
                    if let Some(code) = &code {
                        if let ResponseCode::Capability(caps) = code {
                            self.install_capabilities(caps.clone());
                        }
                        // Tagged codes can carry mailbox state too
                        // (HIGHESTMODSEQ after EXPUNGE, READ-ONLY, ...)
                        self.cache.apply_code(code);
                    }
                    return Ok(ExecResult {
                        status,
                        code,
                        text,
                        untagged,
                    });
                }
                Ok(Response::Tagged { tag: other, .. }) => {
                    tracing::warn!(tag = %other, "tagged response for unknown command");
                }
                Ok(Response::Untagged(response)) => {
                    self.dispatch_untagged(&response);
                    untagged.push(response);
                }
                Ok(Response::Continuation { text }) => {
                    let reply = on_continuation(text.as_deref().unwrap_or_default())
                        .unwrap_or_else(|| b"\r\n".to_vec());
                    self.write_wire(&reply).await?;
                }
                Err(err) => {
                    tracing::warn!(?err, "ignoring unparseable response");
                }
            }
        }
    }

    /// Routes an untagged response to the cache and connection state.
    pub(crate) fn dispatch_untagged(&mut self, response: &UntaggedResponse) {
        if let UntaggedResponse::Capability(caps) = response {
            self.install_capabilities(caps.clone());
            return;
        }

        if let UntaggedResponse::Condition { status, code, text } = response {
            if *status == Status::Bye {
                tracing::info!(text, "server closed the connection");
                self.handler.on_bye(text);
                self.state = ProtocolState::Logout;
                return;
            }
            match code {
                Some(ResponseCode::Capability(caps)) => {
                    self.install_capabilities(caps.clone());
                }
                Some(ResponseCode::Alert) => self.handler.on_alert(text),
                _ => {}
            }
        }

        self.cache.apply(response, self.handler.as_mut());
    }

    pub(crate) fn install_capabilities(&mut self, caps: Vec<Capability>) {
        self.auth_capabilities = caps
            .iter()
            .filter_map(|c| match c {
                Capability::Auth(m) => Some(m.clone()),
                _ => None,
            })
            .collect();
        self.capabilities = caps;
        self.expect_capability_update = false;
    }

    async fn write_wire(&mut self, bytes: &[u8]) -> Result<()> {
        if self.config.log_raw {
            tracing::trace!(data = %String::from_utf8_lossy(bytes).trim_end(), "C:");
        }
        match self.stream.send(bytes).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.teardown();
                Err(err)
            }
        }
    }

    pub(crate) async fn read_wire(&mut self) -> Result<Vec<u8>> {
        let timeout = self.config.socket_timeout;
        match tokio::time::timeout(timeout, self.stream.read_response()).await {
            Ok(Ok(bytes)) => {
                if self.config.log_raw {
                    tracing::trace!(data = %String::from_utf8_lossy(&bytes).trim_end(), "S:");
                }
                Ok(bytes)
            }
            Ok(Err(err)) => {
                self.teardown();
                Err(err)
            }
            Err(_) => {
                self.teardown();
                Err(Error::Timeout(timeout))
            }
        }
    }

    /// Tears the transport down; queued work fails with `NoConnection`.
    pub(crate) fn teardown(&mut self) {
        self.state = ProtocolState::Logout;
        self.stream = WireStream::new(ImapStream::Closed);
    }

    /// Swaps the transport out for an upgrade (STARTTLS, COMPRESS).
    pub(crate) fn take_transport(&mut self) -> ImapStream {
        std::mem::replace(&mut self.stream, WireStream::new(ImapStream::Closed)).into_inner()
    }

    pub(crate) fn restore_transport(&mut self, stream: ImapStream) {
        self.stream = WireStream::new(stream);
    }

    // === Any-state operations ===

    /// Returns the capability set, probing the server when the cache is
    /// stale (empty, or invalidated by STARTTLS/login/COMPRESS).
    pub async fn capability(&mut self) -> Result<Vec<Capability>> {
        if !self.capabilities.is_empty() && !self.expect_capability_update {
            return Ok(self.capabilities.clone());
        }

        self.refresh_capabilities().await;
        Ok(self.capabilities.clone())
    }

    /// Probes CAPABILITY, best-effort.
    pub(crate) async fn refresh_capabilities(&mut self) -> bool {
        match self.exec(&Command::Capability).await {
            Ok(result) if result.is_ok() => {
                self.expect_capability_update = false;
                true
            }
            Ok(_) => false,
            Err(err) => {
                tracing::warn!(?err, "capability refresh failed");
                false
            }
        }
    }

    /// Sends NOOP. Returns true on OK; errors are swallowed.
    pub async fn noop(&mut self) -> Result<bool> {
        match self.exec(&Command::Noop).await {
            Ok(result) => Ok(result.is_ok()),
            Err(Error::NoConnection(_)) => Ok(false),
            Err(err) => {
                tracing::debug!(?err, "noop failed");
                Ok(false)
            }
        }
    }

    /// Exchanges client/server identification (RFC 2971).
    ///
    /// Returns `Ok(None)` when the server lacks the ID capability. Keys in
    /// the returned map are lowercased and trimmed.
    pub async fn id(&mut self) -> Result<Option<Vec<(String, String)>>> {
        if !self.has_capability(&Capability::Id) {
            return Ok(None);
        }

        let parameters = self.config.client_info.clone();
        let result = self
            .exec(&Command::Id { parameters })
            .await?
            .into_result()?;

        let info = result.untagged.into_iter().find_map(|u| match u {
            UntaggedResponse::Id(pairs) => pairs,
            _ => None,
        });

        self.server_info.clone_from(&info);
        Ok(info)
    }

    /// Logs out and closes the transport.
    ///
    /// Resolves truthily even when the transport is already gone.
    pub async fn logout(&mut self) -> Result<bool> {
        if self.state.is_logout() {
            return Ok(true);
        }

        if let Err(err) = self.exec(&Command::Logout).await {
            tracing::debug!(?err, "logout failed, closing anyway");
        }
        self.teardown();
        Ok(true)
    }

    /// Force-closes the connection without a LOGOUT round-trip.
    pub fn close_connection(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for ImapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapClient")
            .field("host", &self.config.host)
            .field("state", &self.state)
            .field("capabilities", &self.capabilities.len())
            .field("selected", &self.cache.mailbox().map(|m| m.path.clone()))
            .finish_non_exhaustive()
    }
}
