//! The failure taxonomy.

use std::time::Duration;

use thiserror::Error;

use crate::types::ResponseCode;

/// Everything that can go wrong while driving a connection.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport failed underneath us.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The TLS layer refused the handshake or the traffic.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The configured server name is not a valid TLS name.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Response grammar violation.
    #[error("Parse error at byte {at}: {reason}")]
    Parse {
        /// Byte offset where parsing stopped.
        at: usize,
        /// What the parser expected or found.
        reason: String,
    },

    /// The server refused the credentials.
    #[error("Authentication failed: {text}")]
    AuthenticationFailed {
        /// Response code from the server's NO, if any.
        code: Option<ResponseCode>,
        /// Decoded `OAuth2` error payload, if the server sent one.
        oauth_error: Option<mailcove_sasl::OAuthError>,
        /// Human-readable response text.
        text: String,
    },

    /// None of the server's SASL mechanisms can be used with the
    /// configured credentials.
    #[error("No supported authentication mechanism")]
    UnsupportedAuthMechanism,

    /// Server rejected a command with NO or BAD.
    #[error("Command rejected: {text}")]
    CommandRejected {
        /// Response code extracted from the first bracketed section.
        code: Option<ResponseCode>,
        /// Human-readable response text.
        text: String,
    },

    /// The server announced it is hanging up.
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// Operation requires a capability the server does not advertise.
    #[error("Server is missing extension: {extension}")]
    MissingServerExtension {
        /// The missing capability name.
        extension: String,
    },

    /// Server asked the client to slow down.
    #[error("Throttled by server, retry after {retry_after:?}")]
    Throttled {
        /// How long to wait before retrying.
        retry_after: Duration,
    },

    /// Mailbox does not exist (corroborated by LIST).
    #[error("Mailbox not found: {0}")]
    NotFound(String),

    /// One of the connection timers expired.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The operation is not legal in the current protocol state.
    #[error("Invalid state: {0}")]
    WrongState(String),

    /// Transport is gone.
    #[error("No connection: {0}")]
    NoConnection(String),

    /// The server broke protocol in a way worth surfacing.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Shorthand result over [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
