//! Opening handshake (RFC 6455 §4).
//!
//! Everything in this module works on a complete HTTP head held in memory.
//! Moving the head across a transport is the job of
//! `connection::upgrade`.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};
use url::Url;

use crate::error::{Error, Result};

/// GUID appended to the client key before hashing (RFC 6455 §1.3).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The only protocol version this crate speaks.
pub const WS_VERSION: &str = "13";

/// Headers that may appear at most once in a handshake.
const SECURITY_HEADERS: &[&str] = &[
    "host",
    "upgrade",
    "connection",
    "origin",
    "sec-websocket-key",
    "sec-websocket-version",
    "sec-websocket-accept",
];

type Headers = Vec<(String, String)>;

/// Offset just past the blank line ending an HTTP head, if `data` holds one.
#[must_use]
pub fn find_head_end(data: &[u8]) -> Option<usize> {
    data.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// Split a head into its start line and the header lines after it.
fn split_head(head: &[u8]) -> Result<(&str, std::str::Split<'_, &'static str>)> {
    let text = std::str::from_utf8(head)
        .map_err(|_| Error::InvalidHandshake("HTTP head is not valid UTF-8".into()))?;
    let mut lines = text.split("\r\n");
    let start = lines
        .next()
        .filter(|line| !line.is_empty())
        .ok_or_else(|| Error::InvalidHandshake("empty HTTP head".into()))?;
    Ok((start, lines))
}

/// Parse header lines up to the first blank line.
///
/// Names are lowercased and values trimmed. A duplicated security header is
/// refused, since two `Sec-WebSocket-Key` lines leave the accept value
/// ambiguous.
fn parse_headers<'a, I>(lines: I) -> Result<Headers>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers: Headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::InvalidHandshake(format!("malformed header line: {line}")))?;
        let name = name.trim().to_ascii_lowercase();
        if SECURITY_HEADERS.contains(&name.as_str()) && find_header(&headers, &name).is_some() {
            return Err(Error::InvalidHandshake(format!("duplicate header: {name}")));
        }
        headers.push((name, value.trim().to_string()));
    }
    Ok(headers)
}

fn find_header<'h>(headers: &'h Headers, name: &str) -> Option<&'h str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Whether a comma separated header value lists `token`, ignoring case.
fn has_token(value: &str, token: &str) -> bool {
    value
        .split(',')
        .any(|item| item.trim().eq_ignore_ascii_case(token))
}

/// Refuse header values that would break the HTTP framing.
fn validate_header_value(header: &str, value: &str) -> Result<()> {
    if value.contains('\r') || value.contains('\n') {
        return Err(Error::InvalidHeaderValue {
            header: header.to_string(),
            reason: "contains CR or LF characters".to_string(),
        });
    }
    Ok(())
}

/// A fresh `Sec-WebSocket-Key`: 16 random bytes, base64 encoded.
///
/// # Errors
///
/// Returns `Error::Random` if the operating system random source fails.
pub fn generate_key() -> Result<String> {
    let mut nonce = [0u8; 16];
    getrandom::getrandom(&mut nonce)?;
    Ok(BASE64.encode(nonce))
}

/// The `Sec-WebSocket-Accept` value for a client key:
/// `base64(SHA-1(key + GUID))`.
///
/// ```
/// use wsframe::protocol::handshake::compute_accept_key;
///
/// assert_eq!(
///     compute_accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
///     "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
/// );
/// ```
#[must_use]
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Check an `Origin` value against an allow-list.
///
/// # Errors
///
/// Returns `Error::OriginNotAllowed` if `origin` is absent or not listed.
pub fn validate_origin(origin: Option<&str>, allowed: &[String]) -> Result<()> {
    match origin {
        Some(origin) if allowed.iter().any(|a| a == origin) => Ok(()),
        Some(origin) => Err(Error::OriginNotAllowed {
            origin: origin.to_string(),
        }),
        None => Err(Error::OriginNotAllowed {
            origin: "(none)".to_string(),
        }),
    }
}

/// The GET upgrade request a client sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRequest {
    /// `Host` value, with the port when it is not the scheme default.
    pub host: String,
    /// Request target: path plus query.
    pub path: String,
    pub origin: String,
    pub key: String,
}

impl ClientRequest {
    /// Build a request for `url` with a fresh random key.
    ///
    /// Without an explicit `origin`, `http://<host>` is sent.
    ///
    /// # Errors
    ///
    /// - `Error::UnsupportedScheme` unless the scheme is `ws` or `wss`
    /// - `Error::InvalidUrl` if the URL has no host
    /// - `Error::InvalidHeaderValue` if `origin` contains CR or LF
    /// - `Error::Random` if no key can be generated
    pub fn new(url: &Url, origin: Option<&str>) -> Result<Self> {
        Self::with_key(url, origin, generate_key()?)
    }

    /// Like [`ClientRequest::new`] with a caller-chosen key.
    ///
    /// # Errors
    ///
    /// As [`ClientRequest::new`], minus the random source failure.
    pub fn with_key(url: &Url, origin: Option<&str>, key: impl Into<String>) -> Result<Self> {
        match url.scheme() {
            "ws" | "wss" => {}
            other => return Err(Error::UnsupportedScheme(other.to_string())),
        }
        let host_name = url
            .host_str()
            .ok_or_else(|| Error::InvalidUrl(format!("{url} has no host")))?;
        let host = match url.port() {
            Some(port) => format!("{host_name}:{port}"),
            None => host_name.to_string(),
        };

        let mut path = url.path().to_string();
        if path.is_empty() {
            path.push('/');
        }
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        let origin = origin.map_or_else(|| format!("http://{host}"), str::to_string);
        validate_header_value("Origin", &origin)?;
        let key = key.into();
        validate_header_value("Sec-WebSocket-Key", &key)?;

        Ok(Self {
            host,
            path,
            origin,
            key,
        })
    }

    /// Serialize the request head.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "GET {} HTTP/1.1\r\n\
             Host: {}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {}\r\n\
             Sec-WebSocket-Version: {WS_VERSION}\r\n\
             Origin: {}\r\n\
             \r\n",
            self.path, self.host, self.key, self.origin
        )
        .into_bytes()
    }
}

/// An HTTP response head: the server's answer to an upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub status: u16,
    pub reason: String,
    headers: Headers,
}

impl HandshakeResponse {
    /// The 101 response accepting `request`.
    #[must_use]
    pub fn accepting(request: &HandshakeRequest) -> Self {
        Self {
            status: 101,
            reason: "Switching Protocols".to_string(),
            headers: vec![
                ("Upgrade".to_string(), "websocket".to_string()),
                ("Connection".to_string(), "Upgrade".to_string()),
                (
                    "Sec-WebSocket-Accept".to_string(),
                    compute_accept_key(&request.key),
                ),
            ],
        }
    }

    /// Parse a response head.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHandshake` for a malformed status line or
    /// header block.
    pub fn parse(head: &[u8]) -> Result<Self> {
        let (status_line, lines) = split_head(head)?;
        let mut parts = status_line.splitn(3, ' ');
        let version = parts.next().unwrap_or_default();
        if !version.starts_with("HTTP/1.") {
            return Err(Error::InvalidHandshake(format!(
                "unsupported HTTP version: {version}"
            )));
        }
        let status = parts
            .next()
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| Error::InvalidHandshake(format!("bad status line: {status_line}")))?;
        let reason = parts.next().unwrap_or_default().to_string();

        Ok(Self {
            status,
            reason,
            headers: parse_headers(lines)?,
        })
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Check that this response completes a handshake started with `key`.
    ///
    /// # Errors
    ///
    /// - `Error::HandshakeRejected` if the status is not 101
    /// - `Error::InvalidHandshake` for a wrong `Upgrade`, `Connection` or
    ///   `Sec-WebSocket-Accept` header
    pub fn verify(&self, key: &str) -> Result<()> {
        if self.status != 101 {
            return Err(Error::HandshakeRejected {
                status: self.status,
            });
        }
        if !self
            .header("upgrade")
            .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
        {
            return Err(Error::InvalidHandshake(
                "response Upgrade header is not websocket".into(),
            ));
        }
        if !self
            .header("connection")
            .is_some_and(|v| has_token(v, "upgrade"))
        {
            return Err(Error::InvalidHandshake(
                "response Connection header does not contain upgrade".into(),
            ));
        }
        let expected = compute_accept_key(key);
        match self.header("sec-websocket-accept") {
            Some(accept) if accept == expected => Ok(()),
            Some(accept) => Err(Error::InvalidHandshake(format!(
                "Sec-WebSocket-Accept mismatch: expected {expected}, got {accept}"
            ))),
            None => Err(Error::InvalidHandshake(
                "missing Sec-WebSocket-Accept header".into(),
            )),
        }
    }

    /// Serialize the response head.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = format!("HTTP/1.1 {} {}\r\n", self.status, self.reason);
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.into_bytes()
    }
}

/// An HTTP request head as received by a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub version: String,
    headers: Headers,
}

impl HttpRequest {
    /// Parse a request head.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHandshake` for a malformed request line or
    /// header block.
    pub fn parse(head: &[u8]) -> Result<Self> {
        let (request_line, lines) = split_head(head)?;
        let parts: Vec<&str> = request_line.split_whitespace().collect();
        let [method, path, version] = parts[..] else {
            return Err(Error::InvalidHandshake(format!(
                "bad request line: {request_line}"
            )));
        };
        if !version.starts_with("HTTP/1.") {
            return Err(Error::InvalidHandshake(format!(
                "unsupported HTTP version: {version}"
            )));
        }
        Ok(Self {
            method: method.to_string(),
            path: path.to_string(),
            version: version.to_string(),
            headers: parse_headers(lines)?,
        })
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An upgrade request that passed every server-side check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    pub path: String,
    pub host: String,
    pub key: String,
    pub origin: Option<String>,
}

impl HandshakeRequest {
    /// Validate `request` as a WebSocket upgrade.
    ///
    /// `allowed_origins`, when given, is the exact list of acceptable
    /// `Origin` values. Subprotocol and extension headers are ignored.
    ///
    /// # Errors
    ///
    /// A [`Rejection`] describing the HTTP error to answer with: 405 for a
    /// method other than GET, 403 for a refused origin, 400 for everything
    /// else.
    pub fn from_http(
        request: &HttpRequest,
        allowed_origins: Option<&[String]>,
    ) -> std::result::Result<Self, Rejection> {
        if request.method != "GET" {
            return Err(
                Rejection::new(405, "upgrade requests must use GET").with_header("Allow", "GET")
            );
        }
        if !request
            .header("upgrade")
            .is_some_and(|v| has_token(v, "websocket"))
        {
            return Err(Rejection::new(400, "missing or invalid Upgrade header"));
        }
        if !request
            .header("connection")
            .is_some_and(|v| has_token(v, "upgrade"))
        {
            return Err(Rejection::new(400, "missing or invalid Connection header"));
        }
        let key = request
            .header("sec-websocket-key")
            .ok_or_else(|| Rejection::new(400, "missing Sec-WebSocket-Key header"))?;
        if !BASE64.decode(key).is_ok_and(|nonce| nonce.len() == 16) {
            return Err(Rejection::new(400, "Sec-WebSocket-Key is not a 16-byte nonce"));
        }
        if request.header("sec-websocket-version") != Some(WS_VERSION) {
            return Err(Rejection::new(400, "unsupported WebSocket version")
                .with_header("Sec-WebSocket-Version", WS_VERSION));
        }
        let host = request
            .header("host")
            .ok_or_else(|| Rejection::new(400, "missing Host header"))?;

        let origin = request.header("origin");
        if let Some(allowed) = allowed_origins {
            validate_origin(origin, allowed).map_err(|err| Rejection::new(403, err.to_string()))?;
        }

        Ok(Self {
            path: request.path.clone(),
            host: host.to_string(),
            key: key.to_string(),
            origin: origin.map(str::to_string),
        })
    }
}

/// An HTTP error response refusing an upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: u16,
    /// Plain text body explaining the refusal.
    pub reason: String,
    /// Extra headers, e.g. the supported `Sec-WebSocket-Version`.
    pub headers: Vec<(String, String)>,
}

impl Rejection {
    #[must_use]
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn status_text(&self) -> &'static str {
        match self.status {
            400 => "Bad Request",
            403 => "Forbidden",
            405 => "Method Not Allowed",
            _ => "Error",
        }
    }

    /// Serialize the full response, body included.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = format!("HTTP/1.1 {} {}\r\n", self.status, self.status_text());
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("Connection: close\r\n");
        out.push_str("Content-Type: text/plain\r\n");
        out.push_str(&format!("Content-Length: {}\r\n\r\n", self.reason.len()));
        out.push_str(&self.reason);
        out.into_bytes()
    }
}

impl From<Rejection> for Error {
    fn from(rejection: Rejection) -> Self {
        Error::HandshakeRejected {
            status: rejection.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";

    fn upgrade_request(extra: &str) -> Vec<u8> {
        format!(
            "GET /chat HTTP/1.1\r\n\
             Host: server.example.com\r\n\
             Upgrade: websocket\r\n\
             Connection: keep-alive, Upgrade\r\n\
             Sec-WebSocket-Key: {SAMPLE_KEY}\r\n\
             {extra}\
             \r\n"
        )
        .into_bytes()
    }

    fn validate(head: &[u8]) -> std::result::Result<HandshakeRequest, Rejection> {
        HandshakeRequest::from_http(&HttpRequest::parse(head).unwrap(), None)
    }

    #[test]
    fn test_compute_accept_key_rfc_example() {
        assert_eq!(compute_accept_key(SAMPLE_KEY), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn test_generate_key_is_16_byte_nonce() {
        let key = generate_key().unwrap();
        assert_eq!(BASE64.decode(&key).unwrap().len(), 16);
        assert_ne!(key, generate_key().unwrap());
    }

    #[test]
    fn test_find_head_end() {
        assert_eq!(find_head_end(b"GET / HTTP/1.1\r\n\r\nrest"), Some(18));
        assert_eq!(find_head_end(b"GET / HTTP/1.1\r\n"), None);
    }

    #[test]
    fn test_client_request_bytes() {
        let url = Url::parse("ws://example.com:9000/chat?room=1").unwrap();
        let request = ClientRequest::with_key(&url, None, SAMPLE_KEY).unwrap();
        assert_eq!(request.host, "example.com:9000");
        assert_eq!(request.path, "/chat?room=1");
        assert_eq!(request.origin, "http://example.com:9000");

        let text = String::from_utf8(request.to_bytes()).unwrap();
        assert!(text.starts_with("GET /chat?room=1 HTTP/1.1\r\n"));
        assert!(text.contains("Host: example.com:9000\r\n"));
        assert!(text.contains("Upgrade: websocket\r\n"));
        assert!(text.contains("Connection: Upgrade\r\n"));
        assert!(text.contains("Sec-WebSocket-Version: 13\r\n"));
        assert!(text.contains(&format!("Sec-WebSocket-Key: {SAMPLE_KEY}\r\n")));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_client_request_default_port_and_origin() {
        let url = Url::parse("ws://example.com").unwrap();
        let request = ClientRequest::with_key(&url, Some("https://app.example"), "k").unwrap();
        assert_eq!(request.host, "example.com");
        assert_eq!(request.path, "/");
        assert_eq!(request.origin, "https://app.example");
    }

    #[test]
    fn test_client_request_rejects_bad_input() {
        let http = Url::parse("http://example.com").unwrap();
        assert_eq!(
            ClientRequest::with_key(&http, None, "k"),
            Err(Error::UnsupportedScheme("http".into()))
        );
        let url = Url::parse("ws://example.com").unwrap();
        assert!(matches!(
            ClientRequest::with_key(&url, Some("evil\r\nX: y"), "k"),
            Err(Error::InvalidHeaderValue { .. })
        ));
    }

    #[test]
    fn test_server_accepts_and_client_verifies() {
        let request = validate(&upgrade_request("Sec-WebSocket-Version: 13\r\n")).unwrap();
        assert_eq!(request.path, "/chat");
        assert_eq!(request.host, "server.example.com");

        let bytes = HandshakeResponse::accepting(&request).to_bytes();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(text.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));

        let response = HandshakeResponse::parse(&bytes).unwrap();
        assert_eq!(response.status, 101);
        assert!(response.verify(SAMPLE_KEY).is_ok());
    }

    #[test]
    fn test_verify_is_case_insensitive() {
        let head = b"HTTP/1.1 101 Switching Protocols\r\n\
                     upgrade: WebSocket\r\n\
                     CONNECTION: upgrade\r\n\
                     sec-websocket-accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n";
        let response = HandshakeResponse::parse(head).unwrap();
        assert!(response.verify(SAMPLE_KEY).is_ok());
    }

    #[test]
    fn test_verify_failures() {
        let rejected = HandshakeResponse::parse(b"HTTP/1.1 403 Forbidden\r\n\r\n").unwrap();
        assert_eq!(
            rejected.verify(SAMPLE_KEY),
            Err(Error::HandshakeRejected { status: 403 })
        );

        let wrong_accept = HandshakeResponse::parse(
            b"HTTP/1.1 101 Switching Protocols\r\n\
              Upgrade: websocket\r\n\
              Connection: Upgrade\r\n\
              Sec-WebSocket-Accept: bm9wZQ==\r\n\r\n",
        )
        .unwrap();
        assert!(matches!(
            wrong_accept.verify(SAMPLE_KEY),
            Err(Error::InvalidHandshake(_))
        ));

        let no_upgrade = HandshakeResponse::parse(
            b"HTTP/1.1 101 Switching Protocols\r\n\
              Connection: Upgrade\r\n\
              Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n",
        )
        .unwrap();
        assert!(matches!(
            no_upgrade.verify(SAMPLE_KEY),
            Err(Error::InvalidHandshake(_))
        ));
    }

    #[test]
    fn test_reject_non_get() {
        let head = b"POST /chat HTTP/1.1\r\nHost: a\r\n\r\n";
        let rejection = validate(head).unwrap_err();
        assert_eq!(rejection.status, 405);
        let text = String::from_utf8(rejection.to_bytes()).unwrap();
        assert!(text.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
    }

    #[test]
    fn test_reject_missing_headers() {
        let head = b"GET / HTTP/1.1\r\nHost: a\r\nConnection: Upgrade\r\n\r\n";
        assert_eq!(validate(head).unwrap_err().status, 400);

        let head = b"GET / HTTP/1.1\r\nHost: a\r\nUpgrade: websocket\r\n\r\n";
        assert_eq!(validate(head).unwrap_err().status, 400);

        let head = b"GET / HTTP/1.1\r\nHost: a\r\nUpgrade: websocket\r\n\
                     Connection: Upgrade\r\nSec-WebSocket-Version: 13\r\n\r\n";
        assert_eq!(validate(head).unwrap_err().status, 400);
    }

    #[test]
    fn test_reject_wrong_version_advertises_13() {
        let rejection = validate(&upgrade_request("Sec-WebSocket-Version: 8\r\n")).unwrap_err();
        assert_eq!(rejection.status, 400);
        let text = String::from_utf8(rejection.to_bytes()).unwrap();
        assert!(text.contains("Sec-WebSocket-Version: 13\r\n"));

        let missing = validate(&upgrade_request("")).unwrap_err();
        assert_eq!(missing.status, 400);
    }

    #[test]
    fn test_reject_malformed_key() {
        let head = b"GET / HTTP/1.1\r\nHost: a\r\nUpgrade: websocket\r\n\
                     Connection: Upgrade\r\nSec-WebSocket-Key: c2hvcnQ=\r\n\
                     Sec-WebSocket-Version: 13\r\n\r\n";
        assert_eq!(validate(head).unwrap_err().status, 400);
    }

    #[test]
    fn test_origin_allow_list() {
        let head = upgrade_request("Sec-WebSocket-Version: 13\r\nOrigin: http://good.example\r\n");
        let request = HttpRequest::parse(&head).unwrap();
        let allowed = vec!["http://good.example".to_string()];
        let accepted = HandshakeRequest::from_http(&request, Some(&allowed)).unwrap();
        assert_eq!(accepted.origin.as_deref(), Some("http://good.example"));

        let other = vec!["http://other.example".to_string()];
        let rejection = HandshakeRequest::from_http(&request, Some(&other)).unwrap_err();
        assert_eq!(rejection.status, 403);
        assert_eq!(
            Error::from(rejection),
            Error::HandshakeRejected { status: 403 }
        );
    }

    #[test]
    fn test_duplicate_security_header_rejected() {
        let head = b"GET / HTTP/1.1\r\nHost: a\r\nHost: b\r\n\r\n";
        assert!(matches!(
            HttpRequest::parse(head),
            Err(Error::InvalidHandshake(_))
        ));
    }

    #[test]
    fn test_malformed_heads() {
        assert!(HttpRequest::parse(b"\r\n\r\n").is_err());
        assert!(HttpRequest::parse(b"GET /\r\n\r\n").is_err());
        assert!(HttpRequest::parse(b"GET / SPDY/3\r\n\r\n").is_err());
        assert!(HandshakeResponse::parse(b"HTTP/1.1 abc\r\n\r\n").is_err());
        assert!(HttpRequest::parse(&[0xFF, 0xFE, b'\r', b'\n', b'\r', b'\n']).is_err());
    }
}
