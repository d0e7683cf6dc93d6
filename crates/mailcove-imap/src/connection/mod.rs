//! IMAP connection management.
//!
//! This module provides connection handling for IMAP servers, including:
//! - Configuration (host, port, security mode, timers)
//! - Dialer seam, TLS/plaintext/deflate stream stack
//! - Wire framing for logical responses
//! - The client itself (operations layer) and IDLE
//! - A shareable session with the mailbox lock

mod client;
mod config;
mod session;
mod state;
mod stream;
mod wire;

pub use client::{
    AppendResult, BodyPartRequest, CopyResult, FetchOptions, FetchQuery, FetchedMessage,
    HeaderFetch, IdleEvent, ImapClient, ListOptions, MailboxCreated, PartialRange, RenameResult,
    SelectOptions, StoreOptions,
};
pub use config::{AuthConfig, Config, ConfigBuilder, MissingIdleCommand, Security};
pub use session::{MailboxLock, Session};
pub use state::ProtocolState;
pub use stream::{BoxedConn, Connection, Dialer, ImapStream, TcpDialer, create_tls_connector};
pub use wire::WireStream;
