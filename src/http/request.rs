use crate::http::{
    codec,
    headers::Headers,
    query,
    types::HTTP_11,
};
use std::borrow::Cow;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP request representation.
///
/// Produced by [`Request::parse`] on the server side and by the `create_*`
/// builders on the client side.
///
/// # Wire format
///
/// ```text
/// [METHOD] SP [PATH] SP [VERSION] CRLF
/// [NAME] ":" [VALUE] CRLF
/// CRLF
/// [BODY]
/// ```
///
/// Parsing is lenient and never fails:
/// - missing start line tokens leave the field empty,
/// - header names are stored lowercase, values are trimmed,
/// - a line starting with a space or tab continues the previous header,
/// - the body is framed by `Content-Length` when it parses, otherwise it is
///   the rest of the input minus one trailing newline.
///
/// # Examples
/// ```
/// use reactor_web::Request;
///
/// let request = Request::parse(b"GET /items HTTP/1.1\r\nHOST: localhost\r\n\r\n");
///
/// assert_eq!(request.method, "GET");
/// assert_eq!(request.path, "/items");
/// assert_eq!(request.get_header("Host"), "localhost");
/// assert!(request.body.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub version: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Request {
    pub fn parse(raw: &[u8]) -> Self {
        let message = codec::parse(raw);
        let [method, path, version] = codec::tokens::<3>(&message.start_line);

        Self {
            method,
            path,
            version,
            headers: message.headers,
            body: message.body.to_vec(),
        }
    }

    /// Serializes the request.
    ///
    /// `Content-Length` is added only when the body is non-empty and the
    /// header is not already set.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.body.len());
        let content_length = (!self.body.is_empty()).then_some(self.body.len());

        codec::write_head(
            &mut out,
            [&self.method, &self.path, &self.version],
            &self.headers,
            content_length,
        );
        out.extend_from_slice(&self.body);
        out
    }

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
    pub fn set_header<V: Into<String>>(&mut self, name: &str, value: V) {
        self.headers.set(name, value);
    }

    /// Body as text, replacing invalid UTF-8.
    #[inline]
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    // BUILDERS

    fn with_target(method: &str, path: String) -> Self {
        let mut request = Self {
            method: method.to_string(),
            path,
            version: HTTP_11.to_string(),
            ..Self::default()
        };
        request.set_header("host", "localhost");
        request
    }

    fn with_params<I, K, V>(method: &str, uri: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let query = query::build_query(params);
        let path = if query.is_empty() {
            uri.to_string()
        } else {
            format!("{uri}?{query}")
        };
        Self::with_target(method, path)
    }

    fn without_body(method: &str, path: String) -> Self {
        let mut request = Self::with_target(method, path);
        request.set_header("content-length", "0");
        request
    }

    fn with_body<B: Into<Vec<u8>>>(method: &str, uri: &str, body: B, content_type: &str) -> Self {
        let mut request = Self::with_target(method, uri.to_string());
        request.body = body.into();
        request.set_header("content-type", content_type);
        request.set_header("content-length", request.body.len().to_string());
        request
    }

    /// `GET uri?k=v&...` with `Host: localhost`.
    ///
    /// A key or value containing a space or `+` is percent-encoded.
    ///
    /// # Examples
    /// ```
    /// use reactor_web::Request;
    ///
    /// let request = Request::create_get("/items", [("page", "1"), ("q", "c++")]);
    /// assert_eq!(request.path, "/items?page=1&q=c%2B%2B");
    ///
    /// let request = Request::create_get("/index.html", [] as [(&str, &str); 0]);
    /// assert_eq!(request.to_bytes(), b"GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n");
    /// ```
    pub fn create_get<I, K, V>(uri: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::with_params("GET", uri, params)
    }

    /// `DELETE` with the same query handling as [`create_get`](Self::create_get)
    /// and `Content-Length: 0`. Spaces in `uri` are encoded.
    pub fn create_delete<I, K, V>(uri: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut request = Self::with_params("DELETE", &query::percent_encode_spaces(uri), params);
        request.set_header("content-length", "0");
        request
    }

    /// `POST` without a body.
    #[inline]
    pub fn create_post(uri: &str) -> Self {
        Self::without_body("POST", uri.to_string())
    }

    /// `POST` with an `application/x-www-form-urlencoded` body.
    ///
    /// Every key and value is percent-encoded.
    pub fn create_post_form<I, K, V>(uri: &str, form: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::with_body("POST", uri, query::build_form(form), FORM_CONTENT_TYPE)
    }

    /// `POST` with `body` sent verbatim.
    #[inline]
    pub fn create_post_body<B: Into<Vec<u8>>>(uri: &str, body: B, content_type: &str) -> Self {
        Self::with_body("POST", uri, body, content_type)
    }

    /// `PUT` without a body.
    #[inline]
    pub fn create_put(uri: &str) -> Self {
        Self::without_body("PUT", uri.to_string())
    }

    /// `PUT` with an `application/x-www-form-urlencoded` body.
    pub fn create_put_form<I, K, V>(uri: &str, form: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::with_body("PUT", uri, query::build_form(form), FORM_CONTENT_TYPE)
    }

    /// `PUT` with `body` sent verbatim.
    #[inline]
    pub fn create_put_body<B: Into<Vec<u8>>>(uri: &str, body: B, content_type: &str) -> Self {
        Self::with_body("PUT", uri, body, content_type)
    }
}

#[cfg(test)]
mod request_tests {
    use super::*;

    const NO_PARAMS: [(&str, &str); 0] = [];

    #[test]
    fn parse_lenient() {
        #[rustfmt::skip]
        let cases: [(&[u8], [&str; 3]); 6] = [
            (b"GET /index.html HTTP/1.1\r\n\r\n",  ["GET", "/index.html", "HTTP/1.1"]),
            (b"POST /submit HTTP/1.0\n\n",         ["POST", "/submit", "HTTP/1.0"]),
            (b"GET /only\r\n\r\n",                 ["GET", "/only", ""]),
            (b"BROKEN\r\n\r\n",                    ["BROKEN", "", ""]),
            (b"\r\n\r\n",                          ["", "", ""]),
            (b"",                                  ["", "", ""]),
        ];

        for (raw, [method, path, version]) in cases {
            let request = Request::parse(raw);
            assert_eq!(request.method, method);
            assert_eq!(request.path, path);
            assert_eq!(request.version, version);
        }
    }

    #[test]
    fn parse_full_request() {
        let raw = b"POST /api/users HTTP/1.1\r\n\
            Host: localhost\r\n\
            Content-Type: application/json\r\n\
            Content-Length: 15\r\n\
            \r\n\
            {\"name\":\"John\"}\r\n";
        let request = Request::parse(raw);

        assert_eq!(request.method, "POST");
        assert_eq!(request.headers.len(), 3);
        assert_eq!(request.get_header("CONTENT-TYPE"), "application/json");
        assert_eq!(request.body_text(), "{\"name\":\"John\"}");
    }

    #[test]
    fn header_access() {
        let mut request = Request::default();
        request.set_header("Content-Type", "text/html");

        assert!(request.has_header("CONTENT-TYPE"));
        assert_eq!(request.get_header("content-type"), "text/html");
        assert_eq!(request.get_header("x-missing"), "");
    }

    #[test]
    fn round_trip() {
        let mut request = Request::create_post_body("/api/messages", "Hello\r\nWorld", "text/plain");
        request.set_header("Authorization", "Bearer token123");
        request.set_header("X-Custom-Header", "custom-value");

        let bytes = request.to_bytes();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("Authorization: Bearer token123\r\n"));
        assert!(text.contains("X-Custom-Header: custom-value\r\n"));
        assert!(text.contains("Content-Length: 12\r\n"));

        assert_eq!(Request::parse(&bytes), request);
    }

    #[test]
    fn serialize_get() {
        let request = Request::create_get("/index.html", NO_PARAMS);

        assert_eq!(request.get_header("host"), "localhost");
        assert_eq!(request.version, "HTTP/1.1");
        assert_eq!(
            request.to_bytes(),
            b"GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n"
        );
    }

    #[test]
    fn get_with_params() {
        let request = Request::create_get("/items", [("page", "1"), ("limit", "10")]);
        assert!(request.path.starts_with("/items?"));
        assert!(request.path.contains("page=1"));
        assert!(request.path.contains("limit=10"));
        assert!(request.path.contains('&'));

        let request = Request::create_get("/api/search", [("search", "hello world"), ("tag", "c++")]);
        assert_eq!(request.path, "/api/search?search=hello%20world&tag=c%2B%2B");
        assert!(request.body.is_empty());
        assert!(!request.has_header("content-length"));
    }

    #[test]
    fn bodyless_builders() {
        #[rustfmt::skip]
        let cases = [
            (Request::create_post("/api/ping"),                       "POST",   "/api/ping"),
            (Request::create_put("/api/products/123/activate"),       "PUT",    "/api/products/123/activate"),
            (Request::create_delete("/api/products/123", NO_PARAMS),  "DELETE", "/api/products/123"),
            (Request::create_delete("/api/files/report with spaces.pdf", NO_PARAMS),
                                                                      "DELETE", "/api/files/report%20with%20spaces.pdf"),
        ];

        for (request, method, path) in cases {
            assert_eq!(request.method, method);
            assert_eq!(request.path, path);
            assert_eq!(request.version, "HTTP/1.1");
            assert_eq!(request.get_header("host"), "localhost");
            assert_eq!(request.get_header("content-length"), "0");
            assert!(request.body.is_empty());
        }
    }

    #[test]
    fn delete_with_params() {
        let request = Request::create_delete(
            "/api/posts/101",
            [("reason", "duplicate content"), ("tag", "temp & draft")],
        );

        assert!(request.path.starts_with("/api/posts/101?"));
        assert!(request.path.contains("reason=duplicate%20content"));
        assert!(request.path.contains("tag=temp%20%26%20draft"));
        assert!(request.body.is_empty());
    }

    #[test]
    fn form_builders() {
        let form = [
            ("search", "hello world"),
            ("tags", "c++, programming"),
            ("special", "!@#$%^&*()"),
        ];

        for request in [
            Request::create_post_form("/api/search", form),
            Request::create_put_form("/api/search", form),
        ] {
            let body = request.body_text();
            assert_eq!(request.get_header("content-type"), FORM_CONTENT_TYPE);
            assert_eq!(request.get_header("content-length"), body.len().to_string());
            assert!(body.contains("search=hello%20world"));
            assert!(body.contains("tags=c%2B%2B%2C%20programming"));
            assert!(body.contains("special=%21%40%23%24%25%5E%26%2A%28%29"));
        }
    }

    #[test]
    fn body_builders() {
        let json = r#"{"name":"John","age":30}"#;
        let request = Request::create_post_body("/api/users", json, "application/json");
        assert_eq!(request.method, "POST");
        assert_eq!(request.get_header("content-type"), "application/json");
        assert_eq!(request.get_header("content-length"), json.len().to_string());
        assert_eq!(request.body, json.as_bytes());

        let binary: Vec<u8> = (0..20).collect();
        let request = Request::create_put_body("/api/upload", binary.clone(), "application/octet-stream");
        assert_eq!(request.method, "PUT");
        assert_eq!(request.get_header("content-length"), "20");
        assert_eq!(request.body, binary);
    }
}
