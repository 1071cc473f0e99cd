//! Blocking HTTP/1.1 framing for the symptom API
//!
//! One request per connection, always answered with `Connection: close`.
//! Bodies are read only for POST/PUT/PATCH, need a Content-Length and may
//! not exceed [`MAX_BODY_SIZE`]. Chunked uploads are refused.

use serde::Serialize;
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};

const MAX_HEAD_SIZE: usize = 32 * 1024;
const MAX_HEADERS: usize = 64;

/// Largest accepted request body
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Why a request could not be framed
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("connection closed before the request was complete")]
    Truncated,
    #[error("request head exceeds {MAX_HEAD_SIZE} bytes")]
    HeadTooLarge,
    #[error("malformed request: {0}")]
    Malformed(#[from] httparse::Error),
    #[error("invalid Content-Length")]
    BadLength,
    #[error("{0} request without Content-Length")]
    LengthRequired(String),
    #[error("chunked request bodies are not accepted")]
    Chunked,
    #[error("request body exceeds {MAX_BODY_SIZE} bytes")]
    BodyTooLarge,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl FrameError {
    pub fn status(&self) -> u16 {
        match self {
            Self::HeadTooLarge | Self::BodyTooLarge => 413,
            Self::LengthRequired(_) => 411,
            _ => 400,
        }
    }
}

#[derive(Debug)]
pub struct Request {
    pub method: String,
    /// Target path with any query string removed
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn json(status: u16, value: &impl Serialize) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: serde_json::to_vec(value).unwrap_or_default(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        405 => "Method Not Allowed",
        411 => "Length Required",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Read one request. `Ok(None)` means the peer went away without sending
/// anything.
pub fn read_request(stream: &mut impl Read) -> Result<Option<Request>, FrameError> {
    let mut reader = BufReader::new(stream);
    let Some(head) = read_head(&mut reader)? else {
        return Ok(None);
    };
    parse(&head, &mut reader).map(Some)
}

/// Collect header lines up to and including the blank line
fn read_head(reader: &mut impl BufRead) -> Result<Option<Vec<u8>>, FrameError> {
    let mut head = Vec::with_capacity(1024);
    loop {
        let start = head.len();
        let budget = (MAX_HEAD_SIZE + 1 - head.len()) as u64;
        let read = match reader.by_ref().take(budget).read_until(b'\n', &mut head) {
            Ok(read) => read,
            Err(_) if head.is_empty() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if read == 0 {
            return if head.is_empty() {
                Ok(None)
            } else {
                Err(FrameError::Truncated)
            };
        }
        if head.len() > MAX_HEAD_SIZE {
            return Err(FrameError::HeadTooLarge);
        }
        if matches!(&head[start..], b"\r\n" | b"\n") {
            return Ok(Some(head));
        }
    }
}

fn parse(head: &[u8], body: &mut impl Read) -> Result<Request, FrameError> {
    let mut slots = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Request::new(&mut slots);
    if parsed.parse(head)?.is_partial() {
        return Err(FrameError::Truncated);
    }

    let method = parsed.method.unwrap_or_default().to_string();
    let target = parsed.path.unwrap_or("/");
    let path = target.split('?').next().unwrap_or(target).to_string();
    let headers: Vec<(String, String)> = parsed
        .headers
        .iter()
        .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
        .collect();

    let mut request = Request {
        method,
        path,
        headers,
        body: Vec::new(),
    };

    if request
        .header("Transfer-Encoding")
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"))
    {
        return Err(FrameError::Chunked);
    }
    if !matches!(request.method.as_str(), "POST" | "PUT" | "PATCH") {
        return Ok(request);
    }

    let length: usize = request
        .header("Content-Length")
        .ok_or_else(|| FrameError::LengthRequired(request.method.clone()))?
        .trim()
        .parse()
        .map_err(|_| FrameError::BadLength)?;
    if length > MAX_BODY_SIZE {
        return Err(FrameError::BodyTooLarge);
    }

    request.body = vec![0; length];
    body.read_exact(&mut request.body).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => FrameError::Truncated,
        _ => FrameError::Io(e),
    })?;
    Ok(request)
}

/// Serialize a response in one write
pub fn write_response(stream: &mut impl Write, response: &Response) -> io::Result<()> {
    let mut out = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        reason(response.status),
        response.body.len()
    )
    .into_bytes();
    for (name, value) in &response.headers {
        out.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&response.body);

    stream.write_all(&out)?;
    stream.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn frame(raw: &[u8]) -> Result<Request, FrameError> {
        read_request(&mut Cursor::new(raw.to_vec())).map(|r| r.expect("request bytes present"))
    }

    #[test]
    fn test_get_drops_query_string() {
        let req = frame(b"GET /api/sessions/abc?verbose=1 HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/api/sessions/abc");
        assert_eq!(req.header("host"), Some("localhost"));
        assert!(req.body.is_empty());
    }

    #[test]
    fn test_post_reads_exact_body() {
        let body = r#"{"query":"sore throat"}"#;
        let raw = format!(
            "POST /api/retrieve HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}trailing",
            body.len(),
            body
        );
        let req = frame(raw.as_bytes()).unwrap();
        assert_eq!(req.path, "/api/retrieve");
        assert_eq!(req.body, body.as_bytes());
    }

    #[test]
    fn test_short_body_is_truncated() {
        let err = frame(b"POST /api/sessions HTTP/1.1\r\nContent-Length: 10\r\n\r\n{}").unwrap_err();
        assert!(matches!(err, FrameError::Truncated));
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_rejected_requests() {
        let chunked =
            frame(b"POST /api/retrieve HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n").unwrap_err();
        assert!(matches!(chunked, FrameError::Chunked));

        let unframed = frame(b"POST /api/sessions HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap_err();
        assert!(unframed.to_string().contains("Content-Length"));
        assert_eq!(unframed.status(), 411);

        let garbled = frame(b"POST /api/sessions HTTP/1.1\r\nContent-Length: lots\r\n\r\n").unwrap_err();
        assert!(matches!(garbled, FrameError::BadLength));
    }

    #[test]
    fn test_size_limits() {
        let huge_head = format!("GET / HTTP/1.1\r\nX-Big: {}\r\n\r\n", "A".repeat(MAX_HEAD_SIZE));
        let err = frame(huge_head.as_bytes()).unwrap_err();
        assert!(matches!(err, FrameError::HeadTooLarge));
        assert_eq!(err.status(), 413);

        let huge_body = format!(
            "POST /api/retrieve HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
            MAX_BODY_SIZE + 1
        );
        assert!(matches!(
            frame(huge_body.as_bytes()).unwrap_err(),
            FrameError::BodyTooLarge
        ));
    }

    #[test]
    fn test_silent_peer() {
        assert!(read_request(&mut Cursor::new(Vec::<u8>::new())).unwrap().is_none());
        assert!(matches!(
            read_request(&mut Cursor::new(b"GET / HTTP/1.1\r\n".to_vec())),
            Err(FrameError::Truncated)
        ));
    }

    #[test]
    fn test_write_response() {
        let resp = Response::json(503, &serde_json::json!({})).with_header("X-Frame-Options", "DENY");
        let mut buf = Vec::new();
        write_response(&mut buf, &resp).unwrap();

        let output = String::from_utf8(buf).unwrap();
        assert!(output.starts_with("HTTP/1.1 503 Service Unavailable\r\n"));
        assert!(output.contains("Content-Length: 2\r\n"));
        assert!(output.contains("Connection: close\r\n"));
        assert!(output.contains("Content-Type: application/json\r\n"));
        assert!(output.ends_with("\r\n\r\n{}"));
    }
}
