use crate::server::socket_guard::SocketGuard;
use std::{
    collections::HashMap,
    os::fd::RawFd,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Instant,
};

/// Identifies a connection. It is the connection's socket descriptor.
pub type ConnectionId = RawFd;

/// Server-side state of one accepted connection.
///
/// A session owns its socket: removing it from the registry closes the
/// connection.
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    peer_address: String,
    created_at: Instant,
    last_activity: Instant,
    active: bool,
    socket: Option<SocketGuard>,
}

impl Session {
    /// A session without a socket, identified by `id`.
    pub fn new<P: Into<String>>(id: ConnectionId, peer_address: P) -> Self {
        let now = Instant::now();
        Self {
            id,
            peer_address: peer_address.into(),
            created_at: now,
            last_activity: now,
            active: true,
            socket: None,
        }
    }

    /// A session owning `socket`, identified by its descriptor.
    pub fn with_socket<P: Into<String>>(socket: SocketGuard, peer_address: P) -> Self {
        let mut session = Self::new(socket.get(), peer_address);
        session.socket = Some(socket);
        session
    }

    #[inline]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    #[inline]
    pub fn peer_address(&self) -> &str {
        &self.peer_address
    }

    #[inline]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    #[inline]
    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    #[inline]
    pub(crate) fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    #[inline]
    pub(crate) fn socket_mut(&mut self) -> Option<&mut SocketGuard> {
        self.socket.as_mut()
    }
}

/// Thread-safe map from [`ConnectionId`] to [`Session`].
///
/// Every operation takes one lock over the whole map. A lock poisoned by a
/// panicking thread is recovered, the map itself is never left half-updated.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ConnectionId, Session>>,
}

impl SessionRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `session`, returning the one it replaced, if any.
    #[inline]
    pub fn add(&self, session: Session) -> Option<Session> {
        self.lock().insert(session.id, session)
    }

    #[inline]
    pub fn remove(&self, id: ConnectionId) -> Option<Session> {
        self.lock().remove(&id)
    }

    #[inline]
    pub fn has(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// A snapshot of the registered ids, in no particular order.
    #[inline]
    pub fn all_ids(&self) -> Vec<ConnectionId> {
        self.lock().keys().copied().collect()
    }

    /// Snapshot of the registered ids split into `(active, inactive)`.
    pub(crate) fn ids_by_activity(&self) -> (Vec<ConnectionId>, Vec<ConnectionId>) {
        let mut active = Vec::new();
        let mut inactive = Vec::new();
        for session in self.lock().values() {
            match session.active {
                true => active.push(session.id),
                false => inactive.push(session.id),
            }
        }
        (active, inactive)
    }

    /// Drops every session, closing their sockets.
    pub fn clear(&self) {
        let drained: Vec<Session> = self.lock().drain().map(|(_, session)| session).collect();
        drop(drained);
    }

    /// Runs `f` on the session under the registry lock.
    #[inline]
    pub(crate) fn with_session<R>(&self, id: ConnectionId, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        self.lock().get_mut(&id).map(f)
    }
}

#[cfg(test)]
mod session_tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn new_session() {
        let session = Session::new(5, "127.0.0.1");

        assert_eq!(session.id(), 5);
        assert_eq!(session.peer_address(), "127.0.0.1");
        assert!(session.is_active());
        assert_eq!(session.created_at(), session.last_activity());
    }

    #[test]
    fn registry_operations() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.count(), 0);

        assert!(registry.add(Session::new(5, "127.0.0.1")).is_none());
        assert!(registry.add(Session::new(6, "10.0.0.2")).is_none());
        assert!(registry.add(Session::new(5, "10.0.0.3")).is_some());

        assert_eq!(registry.count(), 2);
        assert!(registry.has(5));
        assert!(!registry.has(7));

        let mut ids = registry.all_ids();
        ids.sort_unstable();
        assert_eq!(ids, [5, 6]);

        let peer = registry.with_session(5, |session| {
            session.set_active(false);
            session.peer_address().to_string()
        });
        assert_eq!(peer.as_deref(), Some("10.0.0.3"));
        assert_eq!(registry.with_session(7, |_| ()), None);

        let removed = registry.remove(5).unwrap();
        assert!(!removed.is_active());
        assert!(registry.remove(5).is_none());

        registry.clear();
        assert_eq!(registry.count(), 0);
        assert!(registry.all_ids().is_empty());
    }

    #[test]
    fn split_by_activity() {
        let registry = SessionRegistry::new();
        for id in [3, 4, 5] {
            registry.add(Session::new(id, "127.0.0.1"));
        }
        registry.with_session(4, |session| session.set_active(false));

        let (mut active, inactive) = registry.ids_by_activity();
        active.sort_unstable();
        assert_eq!(active, [3, 5]);
        assert_eq!(inactive, [4]);
        assert_eq!(registry.count(), 3);
    }

    #[test]
    fn snapshot_is_detached() {
        let registry = SessionRegistry::new();
        registry.add(Session::new(1, "a"));
        registry.add(Session::new(2, "b"));

        let ids = registry.all_ids();
        registry.clear();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn concurrent_add_remove() {
        let registry = Arc::new(SessionRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for i in 0..500 {
                        let id = worker * 1000 + i;
                        registry.add(Session::new(id, "127.0.0.1"));
                        assert!(registry.count() >= 1);
                        if i % 2 == 0 {
                            registry.remove(id);
                        }
                        let _ = registry.all_ids();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.count(), 8 * 250);
        assert_eq!(registry.all_ids().len(), registry.count());
    }

    #[test]
    fn survives_poisoned_lock() {
        let registry = Arc::new(SessionRegistry::new());
        registry.add(Session::new(1, "a"));

        let poisoner = Arc::clone(&registry);
        let _ = thread::spawn(move || {
            poisoner.with_session(1, |_| panic!("handler failure"));
        })
        .join();

        assert!(registry.has(1));
        registry.add(Session::new(2, "b"));
        assert_eq!(registry.count(), 2);
    }
}
