use socket2::Socket;
use std::{
    fmt,
    io::{self, Read, Write},
    os::fd::{AsRawFd, IntoRawFd, RawFd},
};

/// Exclusive owner of one socket descriptor.
///
/// The descriptor is closed exactly once: when the guard is dropped, unless
/// [`release`](Self::release) handed it off first. The guard is move-only.
pub struct SocketGuard {
    socket: Option<Socket>,
}

impl SocketGuard {
    #[inline]
    pub fn new(socket: Socket) -> Self {
        Self {
            socket: Some(socket),
        }
    }

    /// The raw descriptor, or `-1` once released.
    #[inline]
    pub fn get(&self) -> RawFd {
        self.socket.as_ref().map_or(-1, AsRawFd::as_raw_fd)
    }

    #[inline]
    pub fn socket(&self) -> Option<&Socket> {
        self.socket.as_ref()
    }

    /// Gives up ownership without closing. The caller now owns the descriptor.
    #[inline]
    pub fn release(&mut self) -> Option<RawFd> {
        self.socket.take().map(IntoRawFd::into_raw_fd)
    }

    #[inline]
    fn armed(&mut self) -> io::Result<&mut Socket> {
        self.socket
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))
    }
}

impl Read for SocketGuard {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.armed()?.read(buf)
    }
}

impl Write for SocketGuard {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.armed()?.write(buf)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.armed()?.flush()
    }
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        if let Some(socket) = self.socket.take() {
            tracing::trace!(fd = socket.as_raw_fd(), "closing socket");
        }
    }
}

impl fmt::Debug for SocketGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketGuard").field("fd", &self.get()).finish()
    }
}
