//! reactor_web - Single-reactor HTTP/1.1 server engine built on raw stream sockets
//!
//! One thread multiplexes every client connection with `poll(2)`: it rebuilds
//! a readiness set, waits with a bounded timeout, turns ready descriptors into
//! events and drains them in order. Requests are routed by exact method and
//! path to handlers registered on the server.
//!
//! # Protocol Support
//!
//! - **HTTP/1.1 subset**: request and status lines, `Name: value` headers with
//!   folding, bodies framed by `Content-Length` or by the end of the read
//! - **One request per readiness event**: each event is served with a single
//!   bounded read; no pipelining, no chunked encoding, no TLS
//!
//! # Characteristics
//!
//! - **Single reactor thread** - accept, read, route and write all happen on it
//! - **Cooperative shutdown** - a running flag checked after every bounded wait
//! - **Owned descriptors** - every socket lives in a [`SocketGuard`] and is closed exactly once
//! - **Streaming responses** - a body can be produced on demand straight into the socket
//! - **Contained failures** - a panicking handler answers `500`, the loop keeps going
//!
//! # Examples
//!
//! Quick start:
//! ```no_run
//! use reactor_web::{HttpServer, Request, Response};
//!
//! let mut server = HttpServer::new(8080).unwrap();
//! server.get("/", |_: &Request| Response::ok("Hello World!")).unwrap();
//!
//! server.start().unwrap();
//! server.wait();
//! ```
//! Handlers with state, streaming and control commands:
//! ```no_run
//! use reactor_web::{Handler, HttpServer, Request, Response};
//! use std::{io::Write, sync::atomic::{AtomicUsize, Ordering}};
//!
//! struct Hits(AtomicUsize);
//!
//! impl Handler for Hits {
//!     fn handle(&self, _: &Request) -> Response {
//!         Response::ok(self.0.fetch_add(1, Ordering::Relaxed).to_string())
//!     }
//! }
//!
//! let mut server = HttpServer::new(8080).unwrap();
//! server.get("/hits", Hits(AtomicUsize::new(0))).unwrap();
//! server.get("/stream", |_: &Request| {
//!     Response::default().set_streaming(|out: &mut dyn Write| out.write_all(b"chunk"), 5, "text/plain")
//! }).unwrap();
//!
//! server.start().unwrap();
//!
//! let control = server.control();
//! std::thread::spawn(move || {
//!     for line in std::io::stdin().lines().map_while(Result::ok) {
//!         if control.send(line).is_err() {
//!             break;
//!         }
//!     }
//! });
//! server.wait();
//! ```
//!
//! # Platform
//!
//! Unix only: the reactor polls raw descriptors.

pub(crate) mod http {
    pub(crate) mod codec;
    pub(crate) mod headers;
    pub mod query;
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod types;
}
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod event;
    pub(crate) mod fd_set;
    pub(crate) mod reactor;
    pub(crate) mod router;
    pub(crate) mod server_impl;
    pub(crate) mod session;
    pub(crate) mod socket_guard;
}
pub(crate) mod client;
pub(crate) mod errors;
pub mod limits;
pub mod log;

pub use crate::{
    client::HttpClient,
    errors::{Error, Result},
    http::{
        headers::Headers,
        query,
        request::Request,
        response::{Response, StreamProducer},
        types::{format_header_name, StatusCode, HTTP_11},
    },
    log::FileLog,
    server::{
        event::{dispatch, Event, EventHandler, EventQueue, EventType},
        fd_set::{poll, FdSet},
        router::Handler,
        server_impl::{ControlHandle, HttpServer, HttpServerBuilder},
        session::{ConnectionId, Session, SessionRegistry},
        socket_guard::SocketGuard,
    },
};
