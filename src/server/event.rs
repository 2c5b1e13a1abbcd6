use crate::server::session::ConnectionId;
use std::{
    any::Any,
    collections::VecDeque,
    io,
    panic::{self, AssertUnwindSafe},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    NewConnection,
    ClientData,
    ClientDisconnect,
    ControlCommand,
}

/// One readiness notification, consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventType,
    /// The ready connection, `-1` for listener and control events.
    pub connection_id: ConnectionId,
    /// Command text for [`EventType::ControlCommand`], empty otherwise.
    pub payload: String,
}

impl Event {
    #[inline]
    pub fn new_connection() -> Self {
        Self {
            kind: EventType::NewConnection,
            connection_id: -1,
            payload: String::new(),
        }
    }

    #[inline]
    pub fn client_data(id: ConnectionId) -> Self {
        Self {
            kind: EventType::ClientData,
            connection_id: id,
            payload: String::new(),
        }
    }

    #[inline]
    pub fn client_disconnect(id: ConnectionId) -> Self {
        Self {
            kind: EventType::ClientDisconnect,
            connection_id: id,
            payload: String::new(),
        }
    }

    #[inline]
    pub fn control_command<S: Into<String>>(command: S) -> Self {
        Self {
            kind: EventType::ControlCommand,
            connection_id: -1,
            payload: command.into(),
        }
    }
}

/// FIFO of the events discovered by one readiness wait.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

/// What to do with each kind of event.
pub trait EventHandler {
    fn on_new_connection(&mut self) -> io::Result<()>;

    fn on_client_data(&mut self, id: ConnectionId) -> io::Result<()>;

    fn on_client_disconnect(&mut self, id: ConnectionId) -> io::Result<()>;

    fn on_control_command(&mut self, command: &str) -> io::Result<()>;
}

/// Hands `event` to the matching `handler` method.
///
/// Errors and panics stop at this boundary: they are logged and `false` is
/// returned, so one bad event never takes down the loop.
pub fn dispatch<H: EventHandler + ?Sized>(handler: &mut H, event: &Event) -> bool {
    let result = panic::catch_unwind(AssertUnwindSafe(|| match event.kind {
        EventType::NewConnection => handler.on_new_connection(),
        EventType::ClientData => handler.on_client_data(event.connection_id),
        EventType::ClientDisconnect => handler.on_client_disconnect(event.connection_id),
        EventType::ControlCommand => handler.on_control_command(&event.payload),
    }));

    match result {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            tracing::warn!(kind = ?event.kind, fd = event.connection_id, error = %err, "event failed");
            false
        }
        Err(payload) => {
            tracing::error!(
                kind = ?event.kind,
                fd = event.connection_id,
                panic = panic_message(payload.as_ref()),
                "event handler panicked"
            );
            false
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod event_tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<String>,
    }

    impl EventHandler for Recorder {
        fn on_new_connection(&mut self) -> io::Result<()> {
            self.seen.push("accept".into());
            Ok(())
        }

        fn on_client_data(&mut self, id: ConnectionId) -> io::Result<()> {
            if id == 13 {
                panic!("bad client");
            }
            self.seen.push(format!("data {id}"));
            Ok(())
        }

        fn on_client_disconnect(&mut self, id: ConnectionId) -> io::Result<()> {
            self.seen.push(format!("close {id}"));
            Err(io::Error::new(io::ErrorKind::Other, "already closed"))
        }

        fn on_control_command(&mut self, command: &str) -> io::Result<()> {
            self.seen.push(format!("cmd {command}"));
            Ok(())
        }
    }

    #[test]
    fn fifo_order() {
        let mut queue = EventQueue::new();
        queue.push(Event::new_connection());
        queue.push(Event::control_command("status"));
        queue.push(Event::client_data(7));
        queue.push(Event::client_data(8));
        assert_eq!(queue.len(), 4);

        let mut handler = Recorder::default();
        while let Some(event) = queue.pop() {
            assert!(dispatch(&mut handler, &event));
        }

        assert!(queue.is_empty());
        assert_eq!(handler.seen, ["accept", "cmd status", "data 7", "data 8"]);
    }

    #[test]
    fn failures_stay_at_the_boundary() {
        let mut handler = Recorder::default();

        #[rustfmt::skip]
        let cases = [
            (Event::client_data(13),       false),
            (Event::client_disconnect(9),  false),
            (Event::client_data(4),        true),
        ];

        for (event, expected) in cases {
            assert_eq!(dispatch(&mut handler, &event), expected, "{event:?}");
        }
        assert_eq!(handler.seen, ["close 9", "data 4"]);
    }

    #[test]
    fn panic_messages() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
