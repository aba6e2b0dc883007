//! Driving the opening handshake over a transport.
//!
//! Both drivers bound the whole exchange by the handshake timeout and shut
//! the transport down before returning any error.

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use url::Url;

use crate::buffer::{Buffer, ByteBuffer, read_from_async};
use crate::config::{Config, Limits};
use crate::error::{Error, Result};
use crate::protocol::handshake::{
    ClientRequest, HandshakeRequest, HandshakeResponse, HttpRequest, Rejection, find_head_end,
};

/// Bytes requested from the transport per read while looking for the end
/// of the head.
const HEAD_READ_CHUNK: usize = 1024;

/// Read one HTTP head (through the blank line) into `buf` and return it.
///
/// Bytes that arrive after the head stay readable in `buf`: they are the
/// first frame bytes of the connection.
///
/// # Errors
///
/// - `Error::HandshakeTooLarge` once the head outgrows
///   `limits.max_handshake_size`
/// - `Error::Io` if the stream ends first, or from the transport
pub async fn read_http_head<S>(
    stream: &mut S,
    buf: &mut ByteBuffer,
    limits: &Limits,
) -> Result<Vec<u8>>
where
    S: AsyncRead + Unpin + ?Sized,
{
    loop {
        if let Some(end) = find_head_end(buf.readable_slice()) {
            limits.check_handshake_size(end)?;
            return buf.read_bytes(end);
        }
        // No blank line yet, so the head is longer than what is buffered.
        limits.check_handshake_size(buf.readable_bytes() + 1)?;
        buf.ensure_writable(HEAD_READ_CHUNK);
        let room = buf.writable_bytes().min(HEAD_READ_CHUNK);
        if read_from_async(buf, stream, room).await? == 0 {
            return Err(Error::Io("stream ended during the opening handshake".into()));
        }
    }
}

/// Bound `exchange` by the handshake timeout.
async fn within<T>(limit: Duration, exchange: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, exchange)
        .await
        .unwrap_or_else(|_| {
            Err(Error::Timeout(format!(
                "opening handshake took longer than {limit:?}"
            )))
        })
}

/// Shut `stream` down after a failed handshake and hand `err` back.
async fn abandon<S>(stream: &mut S, err: Error) -> Error
where
    S: AsyncWrite + Unpin + ?Sized,
{
    log::warn!("opening handshake failed: {err}");
    if let Err(shutdown) = stream.shutdown().await {
        log::debug!("shutting down transport after failed handshake: {shutdown}");
    }
    err
}

async fn client_exchange<S>(
    stream: &mut S,
    buf: &mut ByteBuffer,
    request: &ClientRequest,
    limits: &Limits,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    stream.write_all(&request.to_bytes()).await?;
    stream.flush().await?;
    let head = read_http_head(stream, buf, limits).await?;
    HandshakeResponse::parse(&head)?.verify(&request.key)
}

/// Send the upgrade request for `url` and verify the server's answer.
///
/// Returns the read buffer, holding any frame bytes the server sent right
/// behind its response.
///
/// # Errors
///
/// - `Error::HandshakeRejected` if the server answers with a status other
///   than 101
/// - `Error::InvalidHandshake` for a malformed response or accept mismatch
/// - `Error::Timeout` if the exchange exceeds the handshake timeout
/// - request construction errors of [`ClientRequest::new`]
pub async fn client_handshake<S>(
    stream: &mut S,
    url: &Url,
    origin: Option<&str>,
    config: &Config,
) -> Result<ByteBuffer>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let request = match ClientRequest::new(url, origin) {
        Ok(request) => request,
        Err(err) => return Err(abandon(stream, err).await),
    };
    let mut buf = ByteBuffer::new(config.read_buffer_size);
    let exchange = client_exchange(stream, &mut buf, &request, &config.limits);
    let result = within(config.timeouts.handshake, exchange).await;
    match result {
        Ok(()) => {
            log::debug!("client handshake with {url} complete");
            Ok(buf)
        }
        Err(err) => Err(abandon(stream, err).await),
    }
}

async fn server_exchange<S>(
    stream: &mut S,
    buf: &mut ByteBuffer,
    config: &Config,
) -> Result<HandshakeRequest>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let head = read_http_head(stream, buf, &config.limits).await?;
    let validated = match HttpRequest::parse(&head) {
        Ok(request) => HandshakeRequest::from_http(&request, config.allowed_origins.as_deref()),
        Err(err) => Err(Rejection::new(400, err.to_string())),
    };
    match validated {
        Ok(request) => {
            let response = HandshakeResponse::accepting(&request);
            stream.write_all(&response.to_bytes()).await?;
            stream.flush().await?;
            Ok(request)
        }
        Err(rejection) => {
            log::debug!(
                "rejecting upgrade request with {}: {}",
                rejection.status,
                rejection.reason
            );
            stream.write_all(&rejection.to_bytes()).await?;
            stream.flush().await?;
            Err(Error::from(rejection))
        }
    }
}

/// Read an upgrade request and answer it.
///
/// Invalid requests are answered with the matching HTTP error (400, 403 or
/// 405) before the transport is shut down. Returns the validated request
/// and the read buffer, holding any frame bytes the client sent right
/// behind its request.
///
/// # Errors
///
/// - `Error::HandshakeRejected` carrying the status sent to the client
/// - `Error::HandshakeTooLarge`, `Error::Timeout` or `Error::Io` while
///   reading the request
pub async fn server_handshake<S>(
    stream: &mut S,
    config: &Config,
) -> Result<(HandshakeRequest, ByteBuffer)>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let mut buf = ByteBuffer::new(config.read_buffer_size);
    let exchange = server_exchange(stream, &mut buf, config);
    let result = within(config.timeouts.handshake, exchange).await;
    match result {
        Ok(request) => {
            log::debug!("server handshake for {} complete", request.path);
            Ok((request, buf))
        }
        Err(err) => Err(abandon(stream, err).await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, duplex};

    use crate::config::Timeouts;

    #[tokio::test]
    async fn test_read_http_head_keeps_trailing_bytes() {
        let mut wire: &[u8] = b"HTTP/1.1 101 Switching Protocols\r\n\r\n\x81\x02hi";
        let mut buf = ByteBuffer::new(8);
        let head = read_http_head(&mut wire, &mut buf, &Limits::default())
            .await
            .unwrap();
        assert!(head.ends_with(b"\r\n\r\n"));
        assert_eq!(buf.readable_slice(), b"\x81\x02hi");
    }

    #[tokio::test]
    async fn test_read_http_head_enforces_limit() {
        let mut wire: &[u8] = b"GET / HTTP/1.1\r\nX-Padding: aaaaaaaaaaaaaaaaaaaa\r\n\r\n";
        let mut buf = ByteBuffer::new(8);
        let limits = Limits {
            max_handshake_size: 16,
            ..Limits::default()
        };
        assert!(matches!(
            read_http_head(&mut wire, &mut buf, &limits).await,
            Err(Error::HandshakeTooLarge { max: 16, .. })
        ));
    }

    #[tokio::test]
    async fn test_read_http_head_eof() {
        let mut wire: &[u8] = b"GET / HTTP/1.1\r\n";
        let mut buf = ByteBuffer::new(8);
        assert!(matches!(
            read_http_head(&mut wire, &mut buf, &Limits::default()).await,
            Err(Error::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_client_and_server_handshake() {
        let (mut client_io, mut server_io) = duplex(4096);
        let config = Config::default();
        let server_config = config.clone();
        let server =
            tokio::spawn(async move { server_handshake(&mut server_io, &server_config).await });

        let url = Url::parse("ws://localhost:9001/echo").unwrap();
        let buf = client_handshake(&mut client_io, &url, None, &config)
            .await
            .unwrap();
        assert_eq!(buf.readable_bytes(), 0);

        let (request, _) = server.await.unwrap().unwrap();
        assert_eq!(request.path, "/echo");
        assert_eq!(request.host, "localhost:9001");
        assert_eq!(request.origin.as_deref(), Some("http://localhost:9001"));
    }

    #[tokio::test]
    async fn test_server_rejects_bad_request() {
        let (mut client_io, mut server_io) = duplex(4096);
        let config = Config::server();
        let server = tokio::spawn(async move { server_handshake(&mut server_io, &config).await });

        client_io
            .write_all(b"POST / HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut response = Vec::new();
        client_io.read_to_end(&mut response).await.unwrap();
        assert!(response.starts_with(b"HTTP/1.1 405 "));
        assert!(matches!(
            server.await.unwrap(),
            Err(Error::HandshakeRejected { status: 405 })
        ));
    }

    #[tokio::test]
    async fn test_client_sees_rejection() {
        let (mut client_io, mut server_io) = duplex(4096);
        let config = Config::client().with_allowed_origins(vec!["http://trusted".into()]);
        let server_config = config.clone();
        tokio::spawn(async move { server_handshake(&mut server_io, &server_config).await });

        let url = Url::parse("ws://localhost/").unwrap();
        let result = client_handshake(&mut client_io, &url, Some("http://evil"), &config).await;
        assert_eq!(result.unwrap_err(), Error::HandshakeRejected { status: 403 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_timeout_shuts_transport_down() {
        let (mut client_io, mut server_io) = duplex(4096);
        let config = Config::client().with_timeouts(Timeouts {
            handshake: Duration::from_secs(1),
            ..Timeouts::default()
        });
        let url = Url::parse("ws://localhost/").unwrap();
        let result = client_handshake(&mut client_io, &url, None, &config).await;
        assert!(matches!(result, Err(Error::Timeout(_))));

        // The request was sent, then the write side was shut down.
        let mut seen = Vec::new();
        server_io.read_to_end(&mut seen).await.unwrap();
        assert!(seen.starts_with(b"GET / HTTP/1.1\r\n"));
    }
}
