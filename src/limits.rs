//! Server and client configuration limits and timeouts
//!
//! Every value has a working default, so most programs only override the
//! one or two fields they care about.
//!
//! # Examples
//!
//! ```no_run
//! use reactor_web::{HttpServer, Response, limits::ServerLimits};
//! use std::time::Duration;
//!
//! let mut server = HttpServer::builder()
//!     .port(8080)
//!     .limits(ServerLimits {
//!         poll_timeout: Duration::from_millis(20), // Faster shutdown reaction
//!         read_buffer_size: 16 * 1024,             // Larger single-read requests
//!         ..ServerLimits::default()
//!     })
//!     .build()
//!     .unwrap();
//!
//! server.get("/", |_: &_| Response::ok("Hello world!")).unwrap();
//! server.start().unwrap();
//! server.wait();
//! ```

use std::{path::PathBuf, time::Duration};

/// Controls the reactor loop and the listening socket.
///
/// # Reactor cycle
/// ```text
///   [-----------------]
///   [ Rebuild fd set  ] <==========================================\\
///   [-----------------]                                           ||
///          ||                                                     ||
///          \/                                                     ||
///   /-----------------\   Timeout   [----------------------]      ||
///   | poll(fds, wait) | ==========> [ Check running flag   ] =====//
///   \-----------------/             [----------------------]      ||
///          || Ready                                               ||
///          \/                                                     ||
///   [----------------------------------------------]              ||
///   [ NewConnection -> ControlCommand -> ClientData ]             ||
///   [----------------------------------------------]              ||
///          ||                                                     ||
///          \/                                                     ||
///   [-------------------------]                                   ||
///   [ Dispatch queue in order ] ===================================//
///   [-------------------------]
/// ```
#[derive(Debug, Clone)]
pub struct ServerLimits {
    /// Maximum time a single readiness wait may block (default: `100 ms`)
    ///
    /// Bounds how long [`stop`](crate::HttpServer::stop) waits for the reactor
    /// to notice a cleared running flag when nothing else wakes it.
    pub poll_timeout: Duration,

    /// Size of the buffer used for the single read per readiness event (default: `4096`)
    ///
    /// A request is read with exactly one call. Anything beyond this size is
    /// not part of the parsed request.
    pub read_buffer_size: usize,

    /// Backlog passed to `listen(2)` (default: `128`)
    pub listen_backlog: i32,

    /// Maximum duration of a blocking response write (default: `3 seconds`)
    ///
    /// Applied to every accepted socket. A client that stops reading is
    /// disconnected once this expires.
    pub socket_write_timeout: Duration,

    /// How long [`start`](crate::HttpServer::start) waits for the reactor
    /// thread to report that it entered its loop (default: `1 second`)
    pub start_timeout: Duration,

    /// Append lifecycle lines to this file (default: `None`)
    ///
    /// Lines look like `[2025-01-31 12:00:00] New client connected from 127.0.0.1 with fd: 7`.
    /// Failing to open the file disables file logging, it never fails the server.
    pub log_file: Option<PathBuf>,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(100),
            read_buffer_size: 4096,
            listen_backlog: 128,
            socket_write_timeout: Duration::from_secs(3),
            start_timeout: Duration::from_secs(1),
            log_file: None,

            _priv: (),
        }
    }
}

impl ServerLimits {
    #[inline]
    pub(crate) fn poll_timeout_ms(&self) -> i32 {
        self.poll_timeout.as_millis().min(i32::MAX as u128) as i32
    }
}

/// Limits for [`HttpClient`](crate::HttpClient)
#[derive(Debug, Clone)]
pub struct ClientLimits {
    /// Maximum time to establish the connection (default: `5 seconds`)
    pub connect_timeout: Duration,

    /// Maximum time between reads while waiting for a response (default: `5 seconds`)
    ///
    /// When it expires the request fails with [`Error::Timeout`](crate::Error::Timeout).
    pub response_timeout: Duration,

    /// Size of each read chunk (default: `4096`)
    pub read_buffer_size: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ClientLimits {
    #[inline(always)]
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(5),
            read_buffer_size: 4096,

            _priv: (),
        }
    }
}
