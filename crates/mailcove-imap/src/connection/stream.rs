//! Transport stack.
//!
//! The transport starts as whatever the dialer produced, gets upgraded in
//! place by STARTTLS, and may finally be wrapped in raw-deflate framing by
//! COMPRESS=DEFLATE. Proxy support plugs in through the [`Dialer`] trait;
//! the client never sees anything but a bidirectional byte stream.

#![allow(clippy::missing_errors_doc)]

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_compression::tokio::bufread::DeflateDecoder;
use async_compression::tokio::write::DeflateEncoder;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, BufReader, ReadBuf, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::{Error, Result};

/// Marker trait for transports the client can drive.
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Connection for T {}

/// A boxed bidirectional byte stream.
pub type BoxedConn = Box<dyn Connection>;

/// Produces the underlying byte stream for a connection.
///
/// The default implementation is a plain TCP dial; proxy dialers (HTTP
/// CONNECT, SOCKS) implement the same contract externally.
pub trait Dialer: Send + Sync {
    /// Opens a byte stream to `host:port`.
    fn dial<'a>(
        &'a self,
        host: &'a str,
        port: u16,
    ) -> Pin<Box<dyn Future<Output = io::Result<BoxedConn>> + Send + 'a>>;
}

/// Plain TCP dialer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    fn dial<'a>(
        &'a self,
        host: &'a str,
        port: u16,
    ) -> Pin<Box<dyn Future<Output = io::Result<BoxedConn>> + Send + 'a>> {
        Box::pin(async move {
            let stream = TcpStream::connect((host, port)).await?;
            Ok(Box::new(stream) as BoxedConn)
        })
    }
}

/// A stream that can be plaintext, TLS, or deflate-compressed.
pub enum ImapStream {
    /// Plaintext stream.
    Plain(BoxedConn),
    /// TLS on top (boxed; the handshake state is big).
    Tls(Box<TlsStream<BoxedConn>>),
    /// Raw-deflate framing over a previous stream (COMPRESS=DEFLATE).
    Deflate(Box<DeflateStream>),
    /// Torn down; all I/O fails with `NotConnected`.
    Closed,
}

/// Inflate-on-read, deflate-on-write wrapper.
pub struct DeflateStream {
    reader: DeflateDecoder<BufReader<ReadHalf<ImapStream>>>,
    writer: DeflateEncoder<WriteHalf<ImapStream>>,
    /// Whether the wrapped stream was TLS at compression time.
    encrypted: bool,
}

impl ImapStream {
    /// Wraps a freshly dialed plaintext transport.
    #[must_use]
    pub fn plain(stream: BoxedConn) -> Self {
        Self::Plain(stream)
    }

    /// Upgrades a plaintext stream to TLS (STARTTLS).
    pub async fn upgrade_to_tls(self, servername: &str) -> Result<Self> {
        match self {
            Self::Plain(conn) => {
                let connector = create_tls_connector();
                let server_name = ServerName::try_from(servername.to_string())?;
                let tls = connector.connect(server_name, conn).await?;
                Ok(Self::Tls(Box::new(tls)))
            }
            _ => Err(Error::WrongState("stream is already encrypted".to_string())),
        }
    }

    /// Wraps the stream in raw-deflate framing (COMPRESS=DEFLATE).
    #[must_use]
    pub fn compress(self) -> Self {
        let encrypted = self.is_tls();
        let (read_half, write_half) = tokio::io::split(self);
        Self::Deflate(Box::new(DeflateStream {
            reader: DeflateDecoder::new(BufReader::new(read_half)),
            writer: DeflateEncoder::new(write_half),
            encrypted,
        }))
    }

    /// Returns true if TLS sits somewhere in the stream stack.
    #[must_use]
    pub fn is_tls(&self) -> bool {
        match self {
            Self::Tls(_) => true,
            Self::Deflate(stream) => stream.encrypted,
            Self::Plain(_) | Self::Closed => false,
        }
    }

    /// Returns true if deflate framing is active.
    #[must_use]
    pub const fn is_compressed(&self) -> bool {
        matches!(self, Self::Deflate(_))
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection closed")
}

impl AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Deflate(stream) => Pin::new(&mut stream.reader).poll_read(cx, buf),
            Self::Closed => Poll::Ready(Err(closed_error())),
        }
    }
}

impl AsyncWrite for ImapStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Deflate(stream) => Pin::new(&mut stream.writer).poll_write(cx, buf),
            Self::Closed => Poll::Ready(Err(closed_error())),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
            Self::Deflate(stream) => Pin::new(&mut stream.writer).poll_flush(cx),
            Self::Closed => Poll::Ready(Err(closed_error())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Deflate(stream) => Pin::new(&mut stream.writer).poll_shutdown(cx),
            Self::Closed => Poll::Ready(Ok(())),
        }
    }
}

/// Creates a TLS connector with the webpki root certificates.
#[must_use]
pub fn create_tls_connector() -> TlsConnector {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

/// Dials the configured endpoint and applies implicit TLS when requested.
pub async fn connect_transport(
    config: &super::Config,
    dialer: &dyn Dialer,
) -> Result<ImapStream> {
    let conn = tokio::time::timeout(
        config.connection_timeout,
        dialer.dial(&config.host, config.port),
    )
    .await
    .map_err(|_| Error::Timeout(config.connection_timeout))??;

    match config.security {
        super::Security::Implicit => {
            let connector = create_tls_connector();
            let server_name = ServerName::try_from(config.tls_servername().to_string())?;
            let tls = connector.connect(server_name, conn).await?;
            Ok(ImapStream::Tls(Box::new(tls)))
        }
        super::Security::None | super::Security::StartTls => Ok(ImapStream::Plain(conn)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_stream_reports_not_tls() {
        assert!(!ImapStream::Closed.is_tls());
        assert!(!ImapStream::Closed.is_compressed());
    }

    #[test]
    fn tls_connector_builds() {
        let _connector = create_tls_connector();
    }
}
