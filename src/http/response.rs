use crate::http::{
    codec,
    headers::Headers,
    types::{StatusCode, HTTP_11},
};
use std::{
    borrow::Cow,
    fmt,
    io::{self, Write},
};

/// Producer for a streaming body. Called once with the output sink.
pub type StreamProducer = Box<dyn FnOnce(&mut dyn Write) -> io::Result<()> + Send>;

/// The body of a [`Response`]: either held in memory or produced on demand.
pub(crate) enum Body {
    Buffered(Vec<u8>),
    Streaming(StreamProducer),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Buffered(bytes) => f.debug_tuple("Buffered").field(&bytes.len()).finish(),
            Body::Streaming(_) => f.write_str("Streaming(..)"),
        }
    }
}

/// HTTP response representation.
///
/// # Wire format
///
/// ```text
/// [VERSION] SP [STATUS] SP [REASON] CRLF
/// [NAME] ":" SP [VALUE] CRLF
/// CRLF
/// [BODY]
/// ```
///
/// Header names are written as `Title-Case`. A `Content-Length` is injected
/// when none was set.
///
/// # Bodies
///
/// A body is either buffered ([`set_body`](Self::set_body),
/// [`set_binary_body`](Self::set_binary_body)) or streamed
/// ([`set_streaming`](Self::set_streaming)). Setting one replaces the other.
///
/// # Examples
/// ```
/// use reactor_web::Response;
///
/// let response = Response::json_response(r#"{"status":"ok"}"#);
/// let bytes = response.to_bytes().unwrap();
///
/// assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\n"));
/// assert!(bytes.ends_with(b"\r\n\r\n{\"status\":\"ok\"}"));
/// ```
#[derive(Debug)]
pub struct Response {
    pub status_code: u16,
    pub reason_phrase: String,
    pub version: String,
    pub headers: Headers,
    body: Body,
    is_binary: bool,
}

impl Default for Response {
    #[inline]
    fn default() -> Self {
        Self::with_status(StatusCode::Ok)
    }
}

impl Response {
    /// Creates an empty `HTTP/1.1` response with any status line.
    #[inline]
    pub fn new<R: Into<String>>(status_code: u16, reason_phrase: R) -> Self {
        Self {
            status_code,
            reason_phrase: reason_phrase.into(),
            version: HTTP_11.to_string(),
            headers: Headers::new(),
            body: Body::Buffered(Vec::new()),
            is_binary: false,
        }
    }

    #[inline]
    pub fn with_status(status: StatusCode) -> Self {
        Self::new(status.as_u16(), status.reason())
    }

    // FACTORIES

    /// `200 OK`. A non-empty body is sent as `text/plain`.
    pub fn ok<B: Into<Vec<u8>>>(body: B) -> Self {
        let response = Self::with_status(StatusCode::Ok);
        let body = body.into();
        if body.is_empty() {
            response
        } else {
            response.set_body(body, "text/plain")
        }
    }

    #[inline]
    pub fn json_response<B: Into<Vec<u8>>>(json: B) -> Self {
        Self::with_status(StatusCode::Ok).set_body(json, "application/json")
    }

    #[inline]
    pub fn html_response<B: Into<Vec<u8>>>(html: B) -> Self {
        Self::with_status(StatusCode::Ok).set_body(html, "text/html")
    }

    #[inline]
    pub fn binary_response<B: Into<Vec<u8>>>(bytes: B) -> Self {
        Self::with_status(StatusCode::Ok).set_binary_body(bytes, "application/octet-stream")
    }

    /// `404 Not Found` naming the missing resource.
    #[inline]
    pub fn not_found(resource: &str) -> Self {
        Self::with_status(StatusCode::NotFound).set_body(
            format!("The requested resource '{resource}' was not found."),
            "text/html",
        )
    }

    #[inline]
    pub fn server_error(message: &str) -> Self {
        Self::with_status(StatusCode::InternalServerError)
            .set_body(format!("Server error '{message}'"), "text/html")
    }

    #[inline]
    pub fn bad_request(message: &str) -> Self {
        Self::with_status(StatusCode::BadRequest)
            .set_body(format!("Bad request: '{message}'"), "text/html")
    }

    #[inline]
    pub fn switching_protocols() -> Self {
        Self::with_status(StatusCode::SwitchingProtocols)
    }

    // HEADERS

    #[inline]
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.has(name)
    }

    /// Returns the header value or `""` when absent.
    #[inline]
    pub fn get_header(&self, name: &str) -> &str {
        self.headers.get(name)
    }

    #[inline]
    pub fn set_header<V: Into<String>>(&mut self, name: &str, value: V) -> &mut Self {
        self.headers.set(name, value);
        self
    }

    // BODY

    /// Replaces the body and sets `Content-Type` and `Content-Length`.
    pub fn set_body<B: Into<Vec<u8>>>(mut self, content: B, content_type: &str) -> Self {
        self.put_body(content.into(), content_type);
        self.is_binary = false;
        self
    }

    /// Same as [`set_body`](Self::set_body) and marks the response as binary.
    pub fn set_binary_body<B: Into<Vec<u8>>>(mut self, content: B, content_type: &str) -> Self {
        self.put_body(content.into(), content_type);
        self.is_binary = true;
        self
    }

    /// Streams the body from `producer` when the response is written.
    ///
    /// `content_length` is sent as is; the producer is expected to write
    /// exactly that many bytes.
    ///
    /// # Examples
    /// ```
    /// use reactor_web::Response;
    /// use std::io::Write;
    ///
    /// let response = Response::ok("").set_streaming(
    ///     |out: &mut dyn Write| out.write_all(b"chunk of data"),
    ///     13,
    ///     "text/plain",
    /// );
    ///
    /// assert!(response.is_streaming());
    /// assert!(response.body().is_empty());
    /// assert!(response.to_bytes().unwrap().ends_with(b"\r\n\r\nchunk of data"));
    /// ```
    pub fn set_streaming<F>(mut self, producer: F, content_length: usize, content_type: &str) -> Self
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()> + Send + 'static,
    {
        self.body = Body::Streaming(Box::new(producer));
        self.is_binary = false;
        self.headers.set("content-type", content_type);
        self.headers.set("content-length", content_length.to_string());
        self
    }

    #[inline]
    fn put_body(&mut self, content: Vec<u8>, content_type: &str) {
        self.headers.set("content-type", content_type);
        self.headers.set("content-length", content.len().to_string());
        self.body = Body::Buffered(content);
    }

    #[inline]
    pub fn is_streaming(&self) -> bool {
        matches!(self.body, Body::Streaming(_))
    }

    #[inline]
    pub fn is_binary(&self) -> bool {
        self.is_binary
    }

    /// The buffered body; empty for streaming responses.
    #[inline]
    pub fn body(&self) -> &[u8] {
        match &self.body {
            Body::Buffered(bytes) => bytes,
            Body::Streaming(_) => &[],
        }
    }

    /// Buffered body as text, replacing invalid UTF-8.
    #[inline]
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.body())
    }

    // WIRE

    /// Writes the whole response to `out`.
    ///
    /// The head is written in one call. A streaming body never touches the
    /// buffer: the producer runs once, synchronously, against `out`.
    pub fn write_to<W: Write>(self, out: &mut W) -> io::Result<()> {
        let mut head = Vec::with_capacity(128);
        let status = self.status_code.to_string();
        let content_length = match &self.body {
            Body::Buffered(bytes) => Some(bytes.len()),
            Body::Streaming(_) => None,
        };
        codec::write_head(
            &mut head,
            [&self.version, &status, &self.reason_phrase],
            &self.headers,
            content_length,
        );

        match self.body {
            Body::Buffered(bytes) => {
                head.extend_from_slice(&bytes);
                out.write_all(&head)?;
            }
            Body::Streaming(producer) => {
                out.write_all(&head)?;
                producer(out)?;
            }
        }
        out.flush()
    }

    /// Serializes the response into a new buffer.
    pub fn to_bytes(self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Parses a response received by a client.
    ///
    /// The reason phrase keeps its inner spaces. A status that is not a
    /// number becomes `0`. Body framing matches [`Request::parse`](crate::Request::parse).
    pub fn parse(raw: &[u8]) -> Self {
        let message = codec::parse(raw);
        let [version, status, reason_phrase] = codec::tokens::<3>(&message.start_line);

        Self {
            status_code: status.parse().unwrap_or(0),
            reason_phrase,
            version,
            headers: message.headers,
            body: Body::Buffered(message.body.to_vec()),
            is_binary: false,
        }
    }
}
