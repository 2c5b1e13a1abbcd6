use crate::{
    errors::{Error, Result},
    limits::ServerLimits,
    log::FileLog,
    server::{
        reactor::Reactor,
        router::{Handler, Router},
        session::SessionRegistry,
        socket_guard::SocketGuard,
    },
};
use crossbeam::channel::{self, Receiver, Sender};
use socket2::{Domain, Protocol, Socket, Type};
use std::{
    io::{self, Write},
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
};

/// State touched by both the caller's thread and the reactor thread.
#[derive(Debug)]
pub(crate) struct Shared {
    running: AtomicBool,
    pub(crate) sessions: SessionRegistry,
    pub(crate) router: Mutex<Router>,
    pub(crate) log: FileLog,
}

impl Shared {
    #[inline]
    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }
}

/// Sending half of the reactor's control input.
#[derive(Debug)]
struct Control {
    commands: Sender<String>,
    waker: Socket,
}

impl Control {
    /// Makes the reactor's readiness wait return.
    #[inline]
    fn wake(&self) {
        match (&self.waker).write(&[1]) {
            Ok(_) => {}
            // A full buffer already guarantees a wake-up
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
            Err(err) => tracing::debug!(error = %err, "failed to wake reactor"),
        }
    }
}

/// Injects control commands into a server's reactor.
///
/// Obtained from [`HttpServer::control`]. Cheap to clone and safe to move to
/// another thread, for example one that forwards lines read from stdin.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    control: Arc<Control>,
}

impl ControlHandle {
    /// Queues `command` and wakes the reactor.
    ///
    /// `"quit"` stops the server, other commands are ignored. Surrounding
    /// whitespace is trimmed. Fails with [`Error::Stopped`] once the reactor
    /// has exited.
    pub fn send<C: Into<String>>(&self, command: C) -> Result<()> {
        self.control
            .commands
            .send(command.into())
            .map_err(|_| Error::Stopped)?;
        self.control.wake();
        Ok(())
    }
}

/// Single-reactor HTTP/1.1 server.
///
/// Construction binds the listening socket, [`start`](Self::start) begins
/// listening and spawns the reactor thread, [`stop`](Self::stop) shuts it
/// down. Routes can be registered before or after starting.
///
/// # Lifecycle
/// ```text
///  new() ──> bound ──start()──> running ──stop() / "quit"──> stopped
///                                  ^                            |
///                                  └──── start() fails ─────────┘
/// ```
/// A stopped server cannot be started again: its listening socket is closed.
///
/// # Examples
///
/// ```no_run
/// use reactor_web::{HttpServer, Request, Response};
///
/// let mut server = HttpServer::new(8080).unwrap();
/// server.get("/test", |_: &Request| Response::ok("ok")).unwrap();
/// server.post("/echo", |req: &Request| {
///     Response::default().set_body(req.body.clone(), req.get_header("content-type"))
/// }).unwrap();
///
/// server.start().unwrap();
/// server.control().send("quit").unwrap();
/// server.wait();
/// ```
#[derive(Debug)]
pub struct HttpServer {
    port: u16,
    limits: ServerLimits,
    shared: Arc<Shared>,
    control: ControlHandle,

    listener: Option<SocketGuard>,
    control_input: Option<(Socket, Receiver<String>)>,
    reactor: Option<JoinHandle<()>>,
}

impl HttpServer {
    /// Binds `0.0.0.0:port` with default limits.
    ///
    /// Ports up to 1023 are rejected with [`Error::InvalidPort`].
    #[inline]
    pub fn new(port: u16) -> Result<Self> {
        Self::with_limits(port, ServerLimits::default())
    }

    /// Creates a builder with the default port `8080` and default limits.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use reactor_web::{HttpServer, limits::ServerLimits};
    /// use std::time::Duration;
    ///
    /// let server = HttpServer::builder()
    ///     .port(9000)
    ///     .limits(ServerLimits {
    ///         poll_timeout: Duration::from_millis(50),
    ///         ..ServerLimits::default()
    ///     })
    ///     .build()
    ///     .unwrap();
    /// ```
    #[inline]
    pub fn builder() -> HttpServerBuilder {
        HttpServerBuilder {
            port: 8080,
            limits: ServerLimits::default(),
        }
    }

    /// Binds `0.0.0.0:port` with `limits`.
    ///
    /// The socket gets `SO_REUSEADDR` and is non-blocking, but does not
    /// listen until [`start`](Self::start).
    pub fn with_limits(port: u16, limits: ServerLimits) -> Result<Self> {
        if port <= 1023 {
            return Err(Error::InvalidPort(port));
        }

        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
            .map_err(Error::io("create socket"))?;
        socket
            .set_reuse_address(true)
            .map_err(Error::io("set SO_REUSEADDR"))?;
        socket
            .set_nonblocking(true)
            .map_err(Error::io("set non-blocking"))?;
        socket
            .bind(&SocketAddr::from(([0, 0, 0, 0], port)).into())
            .map_err(Error::io("bind"))?;
        let listener = SocketGuard::new(socket);

        let (waker, waker_input) =
            Socket::pair(Domain::UNIX, Type::STREAM, None).map_err(Error::io("create control input"))?;
        waker.set_nonblocking(true).map_err(Error::io("set non-blocking"))?;
        waker_input
            .set_nonblocking(true)
            .map_err(Error::io("set non-blocking"))?;
        let (commands, commands_input) = channel::unbounded();

        let log = match &limits.log_file {
            Some(path) => FileLog::open(path),
            None => FileLog::disabled(),
        };
        log.write(&format!("Server on port {port} created"));
        tracing::debug!(port, fd = listener.get(), "listener bound");

        Ok(Self {
            port,
            limits,
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                sessions: SessionRegistry::new(),
                router: Mutex::new(Router::new()),
                log,
            }),
            control: ControlHandle {
                control: Arc::new(Control { commands, waker }),
            },

            listener: Some(listener),
            control_input: Some((waker_input, commands_input)),
            reactor: None,
        })
    }

    // ROUTES

    /// Adds a route for an exact `method` and `path`.
    ///
    /// Fails with [`Error::DuplicateRoute`] when the pair already exists; the
    /// existing route is kept. Handlers run while the route table is locked,
    /// so a handler must not register routes itself.
    pub fn register_route<H: Handler>(&self, method: &str, path: &str, handler: H) -> Result<()> {
        self.shared
            .router
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .register(method, path, handler)?;

        tracing::debug!(%method, %path, "route registered");
        Ok(())
    }

    #[inline]
    pub fn get<H: Handler>(&self, path: &str, handler: H) -> Result<()> {
        self.register_route("GET", path, handler)
    }

    #[inline]
    pub fn post<H: Handler>(&self, path: &str, handler: H) -> Result<()> {
        self.register_route("POST", path, handler)
    }

    #[inline]
    pub fn put<H: Handler>(&self, path: &str, handler: H) -> Result<()> {
        self.register_route("PUT", path, handler)
    }

    #[inline]
    pub fn delete<H: Handler>(&self, path: &str, handler: H) -> Result<()> {
        self.register_route("DELETE", path, handler)
    }

    /// Number of registered routes.
    #[inline]
    pub fn route_count(&self) -> usize {
        self.shared
            .router
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    // LIFECYCLE

    /// Starts listening and spawns the reactor thread.
    ///
    /// Returns once the reactor reports that its loop is running, or after
    /// [`ServerLimits::start_timeout`]. Calling it on a running server does
    /// nothing. A server that was stopped fails with [`Error::ListenerClosed`].
    pub fn start(&mut self) -> Result<()> {
        if self.reactor.is_some() {
            return Ok(());
        }

        self.listener
            .as_ref()
            .and_then(SocketGuard::socket)
            .ok_or(Error::ListenerClosed)?
            .listen(self.limits.listen_backlog)
            .map_err(Error::io("listen"))?;

        let (Some(listener), Some((waker_input, commands))) =
            (self.listener.take(), self.control_input.take())
        else {
            return Err(Error::ListenerClosed);
        };

        self.shared.set_running(true);
        let reactor = Reactor::new(
            listener,
            waker_input,
            commands,
            Arc::clone(&self.shared),
            self.limits.clone(),
        );
        let (started, on_started) = channel::bounded(1);

        let spawned = thread::Builder::new()
            .name(format!("reactor-{}", self.port))
            .spawn(move || reactor.run(started));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                self.shared.set_running(false);
                return Err(Error::io("spawn reactor thread")(err));
            }
        };
        self.reactor = Some(handle);

        if on_started.recv_timeout(self.limits.start_timeout).is_err() {
            tracing::warn!(port = self.port, "reactor did not report start in time");
        }

        tracing::info!(port = self.port, "server started");
        self.shared
            .log
            .write(&format!("Server on port {} started", self.port));
        Ok(())
    }

    /// Stops the reactor and closes every connection.
    ///
    /// Clears the running flag, wakes the reactor, joins its thread, then
    /// drops all sessions. Calling it on a stopped server does nothing.
    pub fn stop(&mut self) {
        let Some(handle) = self.reactor.take() else {
            return;
        };

        self.shared.set_running(false);
        self.control.control.wake();
        self.teardown(handle);
    }

    /// Blocks until the reactor exits on its own, for example after a `quit`
    /// command, then closes every connection.
    pub fn wait(&mut self) {
        if let Some(handle) = self.reactor.take() {
            self.teardown(handle);
        }
    }

    fn teardown(&mut self, handle: JoinHandle<()>) {
        if handle.join().is_err() {
            tracing::error!(port = self.port, "reactor thread panicked");
        }
        self.shared.set_running(false);
        self.shared.sessions.clear();

        tracing::info!(port = self.port, "server stopped");
        self.shared.log.write("Server shutting down");
    }

    // INTROSPECTION

    /// Whether the reactor loop is running.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.reactor.is_some() && self.shared.is_running()
    }

    /// Number of connected clients.
    #[inline]
    pub fn client_count(&self) -> usize {
        self.shared.sessions.count()
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// A handle for sending control commands to the reactor.
    #[inline]
    pub fn control(&self) -> ControlHandle {
        self.control.clone()
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builder for [`HttpServer`]. See [`HttpServer::builder`].
#[derive(Debug, Clone)]
pub struct HttpServerBuilder {
    port: u16,
    limits: ServerLimits,
}

impl HttpServerBuilder {
    #[inline]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[inline]
    pub fn limits(mut self, limits: ServerLimits) -> Self {
        self.limits = limits;
        self
    }

    #[inline]
    pub fn build(self) -> Result<HttpServer> {
        HttpServer::with_limits(self.port, self.limits)
    }
}

#[cfg(test)]
mod server_tests {
    use super::*;
    use crate::{Request, Response};
    use std::{net::TcpListener, time::Duration};

    fn free_port() -> u16 {
        TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
    }

    fn fast_limits() -> ServerLimits {
        ServerLimits {
            poll_timeout: Duration::from_millis(10),
            ..ServerLimits::default()
        }
    }

    #[test]
    fn rejects_privileged_ports() {
        for port in [0, 80, 443, 1023] {
            assert!(matches!(HttpServer::new(port), Err(Error::InvalidPort(p)) if p == port));
        }
    }

    #[test]
    fn lifecycle() {
        let mut server = HttpServer::with_limits(free_port(), fast_limits()).unwrap();
        assert!(!server.is_running());

        // Stopping a server that never started is a no-op
        server.stop();

        server.start().unwrap();
        assert!(server.is_running());
        server.start().unwrap();
        assert!(server.is_running());

        server.stop();
        assert!(!server.is_running());
        server.stop();

        assert!(matches!(server.start(), Err(Error::ListenerClosed)));
    }

    #[test]
    fn quit_command_stops_reactor() {
        let mut server = HttpServer::with_limits(free_port(), fast_limits()).unwrap();
        let control = server.control();
        server.start().unwrap();

        control.send("status").unwrap();
        control.send(" quit\n").unwrap();
        server.wait();

        assert!(!server.is_running());
        assert!(matches!(control.send("quit"), Err(Error::Stopped)));
    }

    #[test]
    fn routes_before_and_after_start() {
        let mut server = HttpServer::with_limits(free_port(), fast_limits()).unwrap();
        server.get("/a", |_: &Request| Response::ok("a")).unwrap();
        server.start().unwrap();
        server.post("/b", |_: &Request| Response::ok("b")).unwrap();

        assert!(matches!(
            server.get("/a", |_: &Request| Response::ok("again")),
            Err(Error::DuplicateRoute { .. })
        ));
        assert_eq!(server.route_count(), 2);
    }

    #[test]
    fn writes_lifecycle_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.log");
        let port = free_port();

        let mut server = HttpServer::with_limits(
            port,
            ServerLimits {
                log_file: Some(path.clone()),
                ..fast_limits()
            },
        )
        .unwrap();
        server.start().unwrap();
        server.stop();

        let log = std::fs::read_to_string(&path).unwrap();
        assert!(log.contains(&format!("Server on port {port} created")));
        assert!(log.contains(&format!("Server on port {port} started")));
        assert!(log.contains("Server shutting down"));
    }
}
