//! Wire format shared by requests and responses.
//!
//! ```text
//! START-LINE CRLF
//! Name: value CRLF
//!     folded continuation CRLF
//! CRLF
//! body
//! ```
//!
//! Parsing is lenient: it never fails. Missing start line tokens are left
//! empty, header lines without a colon are skipped, and a truncated message
//! simply yields fewer headers or a shorter body.

use crate::http::headers::Headers;
use memchr::memchr;
use std::borrow::Cow;

/// A message split into its parts, borrowing the body from the input.
#[derive(Debug)]
pub(crate) struct Message<'a> {
    pub start_line: Cow<'a, str>,
    pub headers: Headers,
    pub body: &'a [u8],
}

/// Splits `raw` into start line, headers and body.
///
/// Body framing:
/// - with a parsable `content-length`, the body is at most that many bytes,
///   whatever follows is ignored;
/// - otherwise the body is the rest of the input with one trailing CRLF or LF
///   removed. This keeps compatibility with peers that terminate a body with a
///   newline, at the cost of eating one that belongs to the body.
pub(crate) fn parse(raw: &[u8]) -> Message<'_> {
    let mut lines = Lines { raw, pos: 0 };

    let start_line = lines.next().map(text).unwrap_or_default();
    let mut headers = Headers::new();
    let mut last_name: Option<String> = None;
    let mut complete = false;

    while let Some(line) = lines.next() {
        if line.is_empty() {
            complete = true;
            break;
        }

        if matches!(line[0], b' ' | b'\t') {
            if let Some(value) = last_name.as_deref().and_then(|name| headers.get_mut(name)) {
                let folded = trim(&line[1..]);
                if !folded.is_empty() {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(&text(folded));
                }
            }
            continue;
        }

        let Some(colon) = memchr(b':', line) else {
            continue;
        };

        let name = text(&line[..colon]).to_ascii_lowercase();
        headers.set(&name, text(trim(&line[colon + 1..])));
        last_name = Some(name);
    }

    let body = if complete {
        frame_body(&raw[lines.pos..], headers.content_length())
    } else {
        &[]
    };

    Message {
        start_line,
        headers,
        body,
    }
}

#[inline]
fn frame_body(rest: &[u8], content_length: Option<usize>) -> &[u8] {
    match content_length {
        Some(len) => &rest[..len.min(rest.len())],
        None => rest
            .strip_suffix(b"\r\n")
            .or_else(|| rest.strip_suffix(b"\n"))
            .unwrap_or(rest),
    }
}

/// Splits a start line on whitespace into at most `N` tokens.
///
/// The last token keeps the rest of the line, so a reason phrase may contain
/// spaces. Missing tokens are empty.
pub(crate) fn tokens<const N: usize>(line: &str) -> [String; N] {
    let mut result: [String; N] = std::array::from_fn(|_| String::new());
    let mut rest = line.trim_start();

    for (i, slot) in result.iter_mut().enumerate() {
        if rest.is_empty() {
            break;
        }
        if i + 1 == N {
            *slot = rest.trim_end().to_string();
            break;
        }

        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        *slot = rest[..end].to_string();
        rest = rest[end..].trim_start();
    }

    result
}

/// Writes `a b c\r\n`, the headers and the blank line.
pub(crate) fn write_head(
    out: &mut Vec<u8>,
    start_line: [&str; 3],
    headers: &Headers,
    content_length: Option<usize>,
) {
    out.extend_from_slice(start_line[0].as_bytes());
    out.push(b' ');
    out.extend_from_slice(start_line[1].as_bytes());
    out.push(b' ');
    out.extend_from_slice(start_line[2].as_bytes());
    out.extend_from_slice(b"\r\n");
    headers.write_to(out, content_length);
    out.extend_from_slice(b"\r\n");
}

/// Lines terminated by LF, with one trailing CR removed.
struct Lines<'a> {
    raw: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.raw.get(self.pos..).filter(|rest| !rest.is_empty())?;

        let line = match memchr(b'\n', rest) {
            Some(end) => {
                self.pos += end + 1;
                &rest[..end]
            }
            None => {
                self.pos = self.raw.len();
                rest
            }
        };

        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }
}

#[inline]
fn trim(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !matches!(b, b' ' | b'\t'))
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !matches!(b, b' ' | b'\t'))
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[inline]
fn text(bytes: &[u8]) -> Cow<'_, str> {
    match simdutf8::basic::from_utf8(bytes) {
        Ok(value) => Cow::Borrowed(value),
        Err(_) => String::from_utf8_lossy(bytes),
    }
}
