//! Core HTTP protocol types and utilities

/// Protocol version written by every builder and factory.
pub const HTTP_11: &str = "HTTP/1.1";

/// Formats a lowercase header name for the wire.
///
/// The first letter of the name and the first letter after every `-` are
/// capitalized, everything else is left unchanged: `content-type` becomes
/// `Content-Type`.
#[inline]
pub fn format_header_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut capitalize = true;

    for ch in name.chars() {
        if capitalize && ch.is_ascii_alphabetic() {
            result.push(ch.to_ascii_uppercase());
            capitalize = false;
        } else {
            capitalize |= ch == '-';
            result.push(ch);
        }
    }

    result
}

// STATUS CODE

macro_rules! set_status_codes {
    ($(
        $(#[$docs:meta])+
        $name:ident = ($num:literal, $str:literal);
    )+) => {
        /// HTTP status codes
        ///
        /// The codes the response factories produce. Any other code is
        /// available through [`Response::new`](crate::Response::new).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StatusCode { $(
            #[doc = concat!(stringify!($num), " ", $str)]
            $(#[$docs])+
            $name = $num,
        )+ }

        impl StatusCode {
            #[inline]
            pub const fn as_u16(&self) -> u16 {
                *self as u16
            }

            #[inline]
            pub const fn reason(&self) -> &'static str {
                match self { $(
                    StatusCode::$name => $str,
                )+ }
            }

            #[inline]
            pub const fn from_u16(code: u16) -> Option<Self> {
                match code { $(
                    $num => Some(StatusCode::$name),
                )+
                    _ => None,
                }
            }
        }
    };
}

set_status_codes! {
    /// [[RFC9110, Section 15.2.2](https://datatracker.ietf.org/doc/html/rfc9110#section-15.2.2)]
    SwitchingProtocols = (101, "Switching Protocols");

    /// [[RFC9110, Section 15.3.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.3.1)]
    Ok = (200, "OK");

    /// [[RFC9110, Section 15.5.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.1)]
    BadRequest = (400, "Bad Request");
    /// [[RFC9110, Section 15.5.5](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.5)]
    NotFound = (404, "Not Found");

    /// [[RFC9110, Section 15.6.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.6.1)]
    InternalServerError = (500, "Internal Server Error");
}

#[cfg(test)]
mod types_tests {
    use super::*;

    #[test]
    fn header_name_casing() {
        #[rustfmt::skip]
        let cases = [
            ("content-type",      "Content-Type"),
            ("host",              "Host"),
            ("x-custom-header",   "X-Custom-Header"),
            ("content-length",    "Content-Length"),
            ("x--double",         "X--Double"),
            ("-leading",          "-Leading"),
            ("www-authenticate",  "Www-Authenticate"),
            ("x-1st-thing",       "X-1St-Thing"),
            ("ALREADY-Upper",     "ALREADY-Upper"),
            ("",                  ""),
        ];

        for (name, expected) in cases {
            assert_eq!(format_header_name(name), expected, "name: {name:?}");
        }
    }

    #[test]
    fn status_codes() {
        #[rustfmt::skip]
        let cases = [
            (StatusCode::SwitchingProtocols,  101, "Switching Protocols"),
            (StatusCode::Ok,                  200, "OK"),
            (StatusCode::BadRequest,          400, "Bad Request"),
            (StatusCode::NotFound,            404, "Not Found"),
            (StatusCode::InternalServerError, 500, "Internal Server Error"),
        ];

        for (status, code, reason) in cases {
            assert_eq!(status.as_u16(), code);
            assert_eq!(status.reason(), reason);
            assert_eq!(StatusCode::from_u16(code), Some(status));
        }

        for code in [201, 403, 418, 503] {
            assert_eq!(StatusCode::from_u16(code), None);
        }
    }
}
