//! # mailcove-imap
//!
//! An IMAP4rev1 client library (RFC 3501) with the extensions modern
//! servers expect: IDLE, CONDSTORE/QRESYNC, UIDPLUS, ENABLE, COMPRESS,
//! BINARY, OBJECTID, SPECIAL-USE and the Gmail additions.
//!
//! ## Features
//!
//! - **Command pipeline**: one primitive drives tagged commands, the
//!   literal-synchronisation handshake, and untagged dispatch
//! - **Selected-mailbox cache**: EXISTS/EXPUNGE/VANISHED/FETCH pushes keep
//!   the mailbox record consistent and surface as events
//! - **Search compiler**: declarative queries become capability-aware
//!   SEARCH programs with balanced OR trees
//! - **TLS via rustls**: implicit TLS or STARTTLS, without OpenSSL
//! - **DEFLATE transport compression** (RFC 4978)
//! - **SASL**: LOGIN, AUTH=PLAIN, AUTH=LOGIN, XOAUTH2, OAUTHBEARER
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailcove_imap::{AuthConfig, Config, FetchQuery, FetchOptions, ImapClient, SequenceSet};
//!
//! #[tokio::main]
//! async fn main() -> mailcove_imap::Result<()> {
//!     // Connect with implicit TLS
//!     let config = Config::builder("imap.example.com")
//!         .auth(AuthConfig::password("user@example.com", "password"))
//!         .build();
//!     let mut client = ImapClient::connect(config).await?;
//!
//!     // Authenticate with the negotiated mechanism
//!     let auth = AuthConfig::password("user@example.com", "password");
//!     client.authenticate(&auth).await?;
//!
//!     // Open INBOX and fetch flags for the first ten messages
//!     client.mailbox_open("INBOX", &Default::default()).await?;
//!     let range = SequenceSet::range(1, 10).ok_or_else(|| {
//!         mailcove_imap::Error::Protocol("empty range".into())
//!     })?;
//!     let messages = client
//!         .fetch(&range, &FetchQuery::uid_flags(), &FetchOptions::default())
//!         .await?;
//!     for message in &messages {
//!         println!("{}: {:?}", message.seq, message.flags());
//!     }
//!
//!     client.logout().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! The protocol moves through four states; each operation checks its
//! precondition before touching the wire:
//!
//! ```text
//! NOT AUTHENTICATED ── login()/authenticate() ──→ AUTHENTICATED
//! AUTHENTICATED ── mailbox_open() ──→ SELECTED
//! SELECTED ── close()/unselect() ──→ AUTHENTICATED
//! any ── logout() / BYE / transport loss ──→ LOGOUT
//! ```
//!
//! ## Modules
//!
//! - [`command`]: IMAP command builders and serialisation
//! - [`connection`]: transport, client, session and mailbox lock
//! - [`parser`]: sans-I/O response parser
//! - [`search`]: the search-criteria compiler
//! - [`types`]: core IMAP types (flags, mailboxes, sequences, ...)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cache;
pub mod command;
pub mod connection;
mod error;
pub mod handler;
pub mod parser;
pub mod paths;
pub mod search;
pub mod time;
pub mod types;

pub use command::{
    Command, FetchAttribute, FetchItems, SearchCriteria, StatusAttribute, StoreItems,
    StoreOperation, TagGenerator,
};
pub use connection::{
    AppendResult, AuthConfig, BodyPartRequest, Config, ConfigBuilder, CopyResult, Dialer,
    FetchOptions, FetchQuery, FetchedMessage, HeaderFetch, ImapClient, ImapStream, ListOptions,
    MailboxCreated, MailboxLock, MissingIdleCommand, PartialRange, ProtocolState, RenameResult,
    SelectOptions, Security, Session, StoreOptions, TcpDialer, WireStream,
};
pub use error::{Error, Result};
pub use handler::{
    CollectingHandler, EventHandler, ExistsEvent, ExpungeEvent, FlagsEvent, LoggingHandler,
    MailboxEvent, NoopHandler,
};
pub use parser::{FetchField, Response, ResponseParser, UntaggedResponse};
pub use search::{SearchContext, SearchQuery};
pub use types::{
    Capability, Flag, Flags, Folder, ListResponse, Mailbox, MailboxAttribute, MailboxStatus,
    ModSeq, Namespaces, ResponseCode, SelectedMailbox, SeqNum, SequenceSet, Status, Tag, Uid,
    UidValidity,
};

/// IMAP protocol version supported.
pub const IMAP_VERSION: &str = "IMAP4rev1";
