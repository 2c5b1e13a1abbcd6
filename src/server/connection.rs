use crate::{
    http::{request::Request, response::Response},
    server::{
        event::panic_message,
        router::Router,
        session::{ConnectionId, SessionRegistry},
    },
};
use std::{
    io::{self, Read},
    panic::{self, AssertUnwindSafe},
    sync::{Mutex, PoisonError},
};

/// Result of serving one readiness event on a connection.
#[derive(Debug)]
pub(crate) enum Served {
    /// A response was written.
    Responded { method: String, path: String, status: u16 },
    /// The peer closed, the read failed, the session is gone, or a streaming
    /// producer panicked mid-response.
    Closed,
    /// The response could not be written. The session is marked inactive
    /// and disconnected on the next tick.
    WriteFailed(io::Error),
}

/// Read, parse, route and answer one request on connection `id`.
///
/// The registry is locked only around socket I/O, never while a handler runs.
pub(crate) fn serve(
    sessions: &SessionRegistry,
    router: &Mutex<Router>,
    id: ConnectionId,
    buf: &mut [u8],
) -> Served {
    let request = sessions.with_session(id, |session| {
        session.touch();
        session.socket_mut().and_then(|socket| read_request(socket, buf))
    });
    let Some(Some(request)) = request else {
        return Served::Closed;
    };

    let response = respond(router, &request);
    let status = response.status_code;

    // Streaming producers run under the registry lock and must not unwind through it
    let written = sessions.with_session(id, |session| match session.socket_mut() {
        Some(socket) => panic::catch_unwind(AssertUnwindSafe(move || writer::write_response(socket, response)))
            .map_err(|payload| panic_message(payload.as_ref()).to_string()),
        None => Ok(Err(io::ErrorKind::NotConnected.into())),
    });

    match written {
        Some(Ok(Ok(()))) => Served::Responded {
            method: request.method,
            path: request.path,
            status,
        },
        Some(Ok(Err(err))) => Served::WriteFailed(err),
        Some(Err(message)) => {
            // The head may already be out, so the connection cannot be reused
            tracing::error!(fd = id, path = %request.path, panic = %message, "response producer panicked");
            Served::Closed
        }
        None => Served::Closed,
    }
}

/// One bounded read parsed as a request. `None` means the peer is gone.
#[inline]
pub(crate) fn read_request<R: Read>(stream: &mut R, buf: &mut [u8]) -> Option<Request> {
    match stream.read(buf) {
        Ok(0) => None,
        Ok(len) => Some(Request::parse(&buf[..len])),
        Err(err) => {
            tracing::debug!(error = %err, "read failed");
            None
        }
    }
}

/// Routes `request`. A panicking handler yields `500 Internal Server Error`.
pub(crate) fn respond(router: &Mutex<Router>, request: &Request) -> Response {
    let router = router.lock().unwrap_or_else(PoisonError::into_inner);

    match panic::catch_unwind(AssertUnwindSafe(|| router.route(request))) {
        Ok(response) => response,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(method = %request.method, path = %request.path, panic = message, "handler panicked");
            Response::server_error(message)
        }
    }
}

pub(crate) mod writer {
    use crate::http::response::Response;
    use std::io::{self, BufWriter, Write};

    /// Writes `response` through a buffer so the head and a buffered body go
    /// out in as few syscalls as possible.
    #[inline]
    pub(crate) fn write_response<W: Write>(stream: &mut W, response: Response) -> io::Result<()> {
        let mut out = BufWriter::new(stream);
        response.write_to(&mut out)?;
        out.flush()
    }
}
