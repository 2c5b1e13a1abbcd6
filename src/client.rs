use crate::{
    errors::{Error, Result},
    http::{request::Request, response::Response},
    limits::ClientLimits,
    server::socket_guard::SocketGuard,
};
use socket2::{Domain, Protocol, Socket, Type};
use std::{
    io::{self, Read, Write},
    net::{SocketAddr, ToSocketAddrs},
};

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Synchronous HTTP/1.1 client, mostly used to exercise a running server.
///
/// # Examples
///
/// ```no_run
/// use reactor_web::{HttpClient, Request};
///
/// let mut client = HttpClient::new("localhost", 8080).unwrap();
/// client.connect().unwrap();
///
/// let response = client.send_request(&Request::create_get("/test", [("page", "1")])).unwrap();
/// println!("{} {}", response.status_code, response.body_text());
/// ```
#[derive(Debug)]
pub struct HttpClient {
    hostname: String,
    port: u16,
    address: SocketAddr,
    socket: Option<SocketGuard>,
    limits: ClientLimits,
}

impl HttpClient {
    /// Resolves `hostname` with default limits. Does not connect.
    #[inline]
    pub fn new(hostname: &str, port: u16) -> Result<Self> {
        Self::with_limits(hostname, port, ClientLimits::default())
    }

    /// Resolves `hostname`, preferring an IPv4 address. Does not connect.
    pub fn with_limits(hostname: &str, port: u16, limits: ClientLimits) -> Result<Self> {
        let resolved: Vec<SocketAddr> = (hostname, port)
            .to_socket_addrs()
            .map_err(|_| Error::Resolve(hostname.to_string()))?
            .collect();

        let address = resolved
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| resolved.first())
            .copied()
            .ok_or_else(|| Error::Resolve(hostname.to_string()))?;

        Ok(Self {
            hostname: hostname.to_string(),
            port,
            address,
            socket: None,
            limits,
        })
    }

    /// Opens the connection, replacing any previous one.
    ///
    /// A failure leaves the client disconnected; calling it again retries.
    pub fn connect(&mut self) -> Result<()> {
        self.disconnect();

        let socket = Socket::new(Domain::for_address(self.address), Type::STREAM, Some(Protocol::TCP))
            .map_err(Error::io("create socket"))?;
        socket
            .connect_timeout(&self.address.into(), self.limits.connect_timeout)
            .map_err(Error::io("connect"))?;

        tracing::debug!(host = %self.hostname, port = self.port, "client connected");
        self.socket = Some(SocketGuard::new(socket));
        Ok(())
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    /// Closes the connection if one is open.
    #[inline]
    pub fn disconnect(&mut self) {
        self.socket = None;
    }

    /// Sends `request` and reads until the end of the response head.
    ///
    /// Reading stops at the first read that brings the accumulated bytes past
    /// `\r\n\r\n`. A body that arrives in a later segment is not awaited, so a
    /// large body may be cut short.
    pub fn send_request(&mut self, request: &Request) -> Result<Response> {
        let read_timeout = self.limits.response_timeout;
        let chunk_size = self.limits.read_buffer_size.max(1);
        let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;

        socket
            .write_all(&request.to_bytes())
            .and_then(|()| socket.flush())
            .map_err(Error::io("send request"))?;

        if let Some(inner) = socket.socket() {
            inner
                .set_read_timeout(Some(read_timeout))
                .map_err(Error::io("set read timeout"))?;
        }

        let raw = read_head(socket, chunk_size)?;
        Ok(Response::parse(&raw))
    }
}

/// Accumulates reads until the header terminator shows up.
fn read_head<R: Read>(stream: &mut R, chunk_size: usize) -> Result<Vec<u8>> {
    let mut raw = Vec::with_capacity(chunk_size);
    let mut chunk = vec![0; chunk_size];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => return Err(Error::ConnectionClosed),
            Ok(len) => {
                raw.extend_from_slice(&chunk[..len]);
                if memchr::memmem::find(&raw, HEADER_TERMINATOR).is_some() {
                    return Ok(raw);
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Err(Error::Timeout)
            }
            Err(err) => return Err(Error::io("receive response")(err)),
        }
    }
}
