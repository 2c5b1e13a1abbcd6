use std::io;
use thiserror::Error;

/// Errors surfaced to the caller of the server, router and client.
///
/// Failures that happen on the reactor thread while serving connections are
/// never returned through this type: they are logged and the loop continues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("port number must be above 1023, got {0}")]
    InvalidPort(u16),

    #[error("route {method} {path} is already registered")]
    DuplicateRoute { method: String, path: String },

    #[error("failed to resolve hostname: {0}")]
    Resolve(String),

    #[error("client is not connected")]
    NotConnected,

    #[error("timed out waiting for a response")]
    Timeout,

    #[error("connection closed before a response arrived")]
    ConnectionClosed,

    #[error("listening socket is already closed")]
    ListenerClosed,

    #[error("server is not running")]
    Stopped,

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
}

impl Error {
    #[inline]
    pub(crate) fn io(context: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Io { context, source }
    }

    #[inline]
    pub(crate) fn duplicate_route<M: ToString, P: ToString>(method: M, path: P) -> Self {
        Self::DuplicateRoute {
            method: method.to_string(),
            path: path.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
