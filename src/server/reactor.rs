use crate::{
    limits::ServerLimits,
    server::{
        connection::{self, Served},
        event::{self, Event, EventHandler, EventQueue},
        fd_set::{self, FdSet},
        server_impl::Shared,
        session::{ConnectionId, Session},
        socket_guard::SocketGuard,
    },
};
use crossbeam::channel::{Receiver, Sender};
use socket2::Socket;
use std::{
    io::{self, Read},
    os::fd::{AsRawFd, RawFd},
    sync::Arc,
};

/// Control command that stops the loop.
pub(crate) const QUIT: &str = "quit";

/// The poll-dispatch loop. Owns the listener and the readiness set; runs on
/// its own thread until the shared running flag clears.
pub(crate) struct Reactor {
    listener: SocketGuard,
    waker: Socket,
    commands: Receiver<String>,
    shared: Arc<Shared>,
    limits: ServerLimits,

    fd_set: FdSet,
    watched: Vec<ConnectionId>,
    stale: Vec<ConnectionId>,
    queue: EventQueue,
    read_buf: Vec<u8>,
}

impl Reactor {
    pub(crate) fn new(
        listener: SocketGuard,
        waker: Socket,
        commands: Receiver<String>,
        shared: Arc<Shared>,
        limits: ServerLimits,
    ) -> Self {
        Self {
            read_buf: vec![0; limits.read_buffer_size.max(1)],
            listener,
            waker,
            commands,
            shared,
            limits,

            fd_set: FdSet::new(),
            watched: Vec::new(),
            stale: Vec::new(),
            queue: EventQueue::new(),
        }
    }

    pub(crate) fn run(mut self, started: Sender<()>) {
        tracing::debug!(fd = self.listener.get(), "reactor loop started");
        let _ = started.send(());

        while self.shared.is_running() {
            if let Err(err) = self.tick() {
                tracing::error!(error = %err, "readiness wait failed, stopping reactor");
                self.shared.set_running(false);
            }
        }

        tracing::debug!(fd = self.listener.get(), "reactor loop finished");
    }

    /// One cycle: rebuild the set, wait, collect events, drain them in order.
    ///
    /// Sessions marked inactive are not watched; they are disconnected after
    /// the events the wait reported.
    fn tick(&mut self) -> io::Result<()> {
        self.rebuild();

        match fd_set::poll(&mut self.fd_set, self.limits.poll_timeout_ms()) {
            Ok(0) => {}
            Ok(_) => self.collect(),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }

        for id in self.stale.drain(..) {
            self.queue.push(Event::client_disconnect(id));
        }

        while let Some(event) = self.queue.pop() {
            if !self.shared.is_running() {
                self.queue.clear();
                break;
            }
            event::dispatch(self, &event);
        }
        Ok(())
    }

    fn rebuild(&mut self) {
        (self.watched, self.stale) = self.shared.sessions.ids_by_activity();
        self.watched.sort_unstable();

        self.fd_set.clear();
        self.fd_set.add(self.listener.get());
        self.fd_set.add(self.waker.as_raw_fd());
        for id in &self.watched {
            self.fd_set.add(*id);
        }
    }

    /// Events in fixed order: new connection, control commands, client data.
    fn collect(&mut self) {
        if self.fd_set.contains_ready(self.listener.get()) {
            self.queue.push(Event::new_connection());
        }

        if self.fd_set.contains_ready(self.waker.as_raw_fd()) {
            self.drain_waker();
            for command in self.commands.try_iter() {
                self.queue.push(Event::control_command(command.trim()));
            }
        }

        for id in &self.watched {
            if self.fd_set.contains_ready(*id) {
                self.queue.push(Event::client_data(*id));
            }
        }
    }

    fn drain_waker(&mut self) {
        let mut buf = [0; 64];
        loop {
            match self.waker.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    }

    fn accept(&mut self) -> io::Result<(SocketGuard, String)> {
        let listener = self
            .listener
            .socket()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        let (socket, address) = listener.accept()?;

        socket.set_nonblocking(false)?;
        socket.set_write_timeout(Some(self.limits.socket_write_timeout))?;

        let peer = address
            .as_socket()
            .map_or_else(|| "unknown".to_string(), |addr| addr.ip().to_string());
        Ok((SocketGuard::new(socket), peer))
    }
}

impl EventHandler for Reactor {
    fn on_new_connection(&mut self) -> io::Result<()> {
        let (socket, peer) = match self.accept() {
            Ok(accepted) => accepted,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                tracing::debug!("accept would block");
                return Ok(());
            }
            Err(err) => {
                self.shared.log.write("Failed to accept new client connection");
                return Err(err);
            }
        };

        let fd: RawFd = socket.get();
        if let Some(stale) = self.shared.sessions.add(Session::with_socket(socket, peer.as_str())) {
            tracing::warn!(fd, peer = stale.peer_address(), "replaced stale session");
        }
        self.fd_set.add(fd);

        tracing::info!(fd, %peer, "client connected");
        self.shared
            .log
            .write(&format!("New client connected from {peer} with fd: {fd}"));
        Ok(())
    }

    fn on_client_data(&mut self, id: ConnectionId) -> io::Result<()> {
        match connection::serve(&self.shared.sessions, &self.shared.router, id, &mut self.read_buf) {
            Served::Responded {
                method,
                path,
                status,
            } => {
                tracing::debug!(fd = id, %method, %path, status, "request served");
                Ok(())
            }
            Served::Closed => self.on_client_disconnect(id),
            Served::WriteFailed(err) => {
                tracing::warn!(fd = id, error = %err, "failed to write response");
                self.shared.sessions.with_session(id, |session| session.set_active(false));
                Ok(())
            }
        }
    }

    fn on_client_disconnect(&mut self, id: ConnectionId) -> io::Result<()> {
        self.fd_set.remove(id);
        if let Some(session) = self.shared.sessions.remove(id) {
            tracing::info!(fd = id, peer = session.peer_address(), "client disconnected");
            self.shared.log.write(&format!("Client disconnected: {id}"));
        }
        Ok(())
    }

    fn on_control_command(&mut self, command: &str) -> io::Result<()> {
        if command == QUIT {
            tracing::info!("quit command received");
            self.shared.log.write("Server terminated by user");
            self.shared.set_running(false);
        } else {
            tracing::debug!(command, "ignoring control command");
        }
        Ok(())
    }
}
