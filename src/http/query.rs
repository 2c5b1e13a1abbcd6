//! Query string and form body helpers.
//!
//! The encoder is deliberately narrow: only the characters
//! `space + ! @ # $ % ^ & < > * ( ) ,` are escaped, every other byte passes
//! through unchanged. It is not a full RFC 3986 encoder.

use memchr::memchr;
use std::fmt::Write;

#[inline(always)]
const fn is_reserved(ch: char) -> bool {
    matches!(
        ch,
        ' ' | '+' | '!' | '@' | '#' | '$' | '%' | '^' | '&' | '<' | '>' | '*' | '(' | ')' | ','
    )
}

fn encode_with(value: &str, reserved: impl Fn(char) -> bool) -> String {
    let mut result = String::with_capacity(value.len());
    for ch in value.chars() {
        if reserved(ch) {
            // Writing into a String cannot fail
            let _ = write!(result, "%{:02X}", ch as u32);
        } else {
            result.push(ch);
        }
    }
    result
}

/// Escapes the reserved set as uppercase `%XX`.
///
/// # Examples
/// ```
/// use reactor_web::query::percent_encode;
///
/// assert_eq!(percent_encode("hello world"), "hello%20world");
/// assert_eq!(percent_encode("c++"), "c%2B%2B");
/// assert_eq!(percent_encode("plain"), "plain");
/// ```
#[inline]
pub fn percent_encode(value: &str) -> String {
    encode_with(value, is_reserved)
}

/// Escapes spaces only.
#[inline]
pub fn percent_encode_spaces(value: &str) -> String {
    encode_with(value, |ch| ch == ' ')
}

#[inline]
fn encode_if_needed(value: &str) -> String {
    if value.contains([' ', '+']) {
        percent_encode(value)
    } else {
        value.to_string()
    }
}

/// Builds `k=v&k2=v2` for a request target.
///
/// A key or value is escaped only when it contains a space or a `+`.
/// Pairs are emitted in iteration order.
pub fn build_query<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    join(params, encode_if_needed)
}

/// Builds an `application/x-www-form-urlencoded` body.
///
/// Every key and value is escaped.
pub fn build_form<I, K, V>(form: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    join(form, percent_encode)
}

fn join<I, K, V>(pairs: I, encode: fn(&str) -> String) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut result = String::new();
    for (key, value) in pairs {
        if !result.is_empty() {
            result.push('&');
        }
        result.push_str(&encode(key.as_ref()));
        result.push('=');
        result.push_str(&encode(value.as_ref()));
    }
    result
}

/// Splits a request target into its path and query parts.
///
/// # Examples
/// ```
/// use reactor_web::query::split_target;
///
/// assert_eq!(split_target("/items?page=1"), ("/items", Some("page=1")));
/// assert_eq!(split_target("/items"), ("/items", None));
/// ```
#[inline]
pub fn split_target(target: &str) -> (&str, Option<&str>) {
    match memchr(b'?', target.as_bytes()) {
        Some(index) => (&target[..index], Some(&target[index + 1..])),
        None => (target, None),
    }
}

/// Iterates the `key=value` pairs of a query string without decoding them.
///
/// Empty segments are skipped and a segment without `=` yields an empty value.
///
/// # Examples
/// ```
/// use reactor_web::query::pairs;
///
/// let params: Vec<_> = pairs("page=1&debug&&limit=").collect();
/// assert_eq!(params, [("page", "1"), ("debug", ""), ("limit", "")]);
/// ```
pub fn pairs(query: &str) -> impl Iterator<Item = (&str, &str)> {
    query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match memchr(b'=', segment.as_bytes()) {
            Some(index) => (&segment[..index], &segment[index + 1..]),
            None => (segment, ""),
        })
}

#[cfg(test)]
mod query_tests {
    use super::*;

    #[test]
    fn encode() {
        #[rustfmt::skip]
        let cases = [
            ("hello world",      "hello%20world"),
            ("c++",              "c%2B%2B"),
            ("c++, programming", "c%2B%2B%2C%20programming"),
            ("!@#$%^&*()",       "%21%40%23%24%25%5E%26%2A%28%29"),
            ("<tag>",            "%3Ctag%3E"),
            ("safe-value_1.~/",  "safe-value_1.~/"),
            ("héllo wörld",      "héllo%20wörld"),
            ("",                 ""),
        ];

        for (value, expected) in cases {
            assert_eq!(percent_encode(value), expected, "value: {value:?}");
        }
    }

    #[test]
    fn encode_spaces() {
        #[rustfmt::skip]
        let cases = [
            ("/api/files/report with spaces.pdf", "/api/files/report%20with%20spaces.pdf"),
            ("/a+b&c",                            "/a+b&c"),
        ];

        for (value, expected) in cases {
            assert_eq!(percent_encode_spaces(value), expected);
        }
    }

    #[test]
    fn query_only_escapes_when_needed() {
        #[rustfmt::skip]
        let cases: [(&[(&str, &str)], &str); 4] = [
            (&[("page", "1"), ("limit", "10")],   "page=1&limit=10"),
            (&[("q", "a&b")],                     "q=a&b"),
            (&[("q", "rust lang")],               "q=rust%20lang"),
            (&[("tag", "temp & draft")],          "tag=temp%20%26%20draft"),
        ];

        for (params, expected) in cases {
            assert_eq!(build_query(params.iter().copied()), expected);
        }
    }

    #[test]
    fn form_always_escapes() {
        let form = [("name", "John Doe"), ("skills", "c++, programming")];
        assert_eq!(
            build_form(form),
            "name=John%20Doe&skills=c%2B%2B%2C%20programming"
        );
        assert_eq!(build_form(Vec::<(String, String)>::new()), "");
    }

    #[test]
    fn target_parts() {
        #[rustfmt::skip]
        let cases = [
            ("/items?page=1&limit=10", "/items", Some("page=1&limit=10")),
            ("/items?",                "/items", Some("")),
            ("/items",                 "/items", None),
            ("",                       "",       None),
        ];

        for (target, path, query) in cases {
            assert_eq!(split_target(target), (path, query));
        }

        let params: Vec<_> = pairs("a=1&=x&b&&c=3=4").collect();
        assert_eq!(params, [("a", "1"), ("", "x"), ("b", ""), ("c", "3=4")]);
    }
}
