use std::{fmt, io, os::fd::RawFd};

const READY: libc::c_short = libc::POLLIN | libc::POLLHUP | libc::POLLERR | libc::POLLNVAL;

/// Descriptors watched for input by one readiness wait.
///
/// Backed by a `pollfd` array. [`max`](Self::max) is kept exact across
/// removals for consumers that need a `select`-style upper bound.
///
/// # Examples
/// ```
/// use reactor_web::FdSet;
///
/// let mut set = FdSet::new();
/// set.add(3);
/// set.add(5);
/// set.add(7);
/// set.remove(7);
/// assert_eq!(set.max(), 5);
///
/// set.clear();
/// assert_eq!(set.max(), 0);
/// assert!(!set.contains_ready(3));
/// ```
#[derive(Default)]
pub struct FdSet {
    entries: Vec<libc::pollfd>,
    max: RawFd,
}

impl FdSet {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Watches `fd` for input. Adding a watched descriptor again is a no-op.
    pub fn add(&mut self, fd: RawFd) {
        if fd < 0 || self.contains(fd) {
            return;
        }

        self.entries.push(libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        });
        self.max = self.max.max(fd);
    }

    pub fn remove(&mut self, fd: RawFd) {
        self.entries.retain(|entry| entry.fd != fd);
        if fd == self.max {
            self.max = self.entries.iter().map(|entry| entry.fd).max().unwrap_or(0);
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
        self.max = 0;
    }

    #[inline]
    pub fn contains(&self, fd: RawFd) -> bool {
        self.entries.iter().any(|entry| entry.fd == fd)
    }

    /// Whether the last [`poll`] reported `fd` as readable, hung up or failed.
    #[inline]
    pub fn contains_ready(&self, fd: RawFd) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.fd == fd && entry.revents & READY != 0)
    }

    /// Largest watched descriptor, `0` when empty.
    #[inline]
    pub fn max(&self) -> RawFd {
        self.max
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The underlying `pollfd` array.
    #[inline]
    pub fn as_raw_mut(&mut self) -> &mut [libc::pollfd] {
        &mut self.entries
    }
}

impl fmt::Debug for FdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FdSet")
            .field("fds", &self.entries.iter().map(|entry| entry.fd).collect::<Vec<_>>())
            .field("max", &self.max)
            .finish()
    }
}

/// Waits until a descriptor in `set` is ready or `timeout_ms` elapses.
///
/// Returns the number of ready descriptors, `0` on timeout. Readiness from a
/// previous call is discarded first.
pub fn poll(set: &mut FdSet, timeout_ms: i32) -> io::Result<usize> {
    let entries = set.as_raw_mut();
    for entry in entries.iter_mut() {
        entry.revents = 0;
    }

    // SAFETY: `entries` is a valid, exclusively borrowed `pollfd` array of the given length.
    let ready = unsafe {
        libc::poll(
            entries.as_mut_ptr(),
            entries.len() as libc::nfds_t,
            timeout_ms,
        )
    };

    if ready < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ready as usize)
    }
}
