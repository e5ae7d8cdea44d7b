//! Connection registry and room index.
//!
//! Tracks every live WebSocket connection, the identity bound to it,
//! and the rooms it subscribes to. The registry is an explicit service
//! injected into the relay (and mocked by nothing: tests drive the real
//! thing with in-memory channels), replacing ambient per-socket state.
//!
//! Rooms are broadcast addresses: `server:<id>` for every connection of
//! a chat server's members, `user:<id>` for every device of one user.
//! The `user:<id>` room doubles as the user-to-connections index, so
//! looking up a user's live connections is a map read, not a scan.
//!
//! Structural changes to one connection (bind, unregister) only ever
//! happen from that connection's own handler task, so the registry
//! needs no coordination beyond the sharded maps themselves. Delivery
//! helpers never hold a connection guard and a room guard at the same
//! time.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::infrastructure::metrics;

use super::events::ServerEvent;

/// Identifier of one live WebSocket connection.
pub type ConnectionId = Uuid;

/// A broadcast address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// All live connections of a chat server's members
    Server(i64),

    /// All live connections (devices) of one user
    User(i64),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Server(id) => write!(f, "server:{}", id),
            Room::User(id) => write!(f, "user:{}", id),
        }
    }
}

/// Per-connection state held by the registry.
struct ConnectionEntry {
    /// Identity bound by `join`; `None` until then
    user_id: Option<i64>,

    /// Rooms this connection is currently subscribed to
    rooms: HashSet<Room>,

    /// Outbound path into the connection's socket task
    sender: mpsc::UnboundedSender<ServerEvent>,
}

/// Registry of live connections and their room subscriptions.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    rooms: DashMap<Room, HashSet<ConnectionId>>,
    bound_count: AtomicUsize,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
            bound_count: AtomicUsize::new(0),
        }
    }

    /// Register a new, unbound connection. Called on transport connect.
    pub fn register(&self, sender: mpsc::UnboundedSender<ServerEvent>) -> ConnectionId {
        let id = Uuid::new_v4();
        self.connections.insert(
            id,
            ConnectionEntry {
                user_id: None,
                rooms: HashSet::new(),
                sender,
            },
        );
        self.publish_gauges();
        id
    }

    /// Bind an identity and replace the connection's room set.
    ///
    /// Idempotent: a repeated `join` (a client retrying after a lost
    /// ack, or re-asserting a new server list) drops the previous
    /// subscriptions and installs the new set. Returns `false` if the
    /// connection is no longer registered.
    pub fn bind(&self, conn: ConnectionId, user_id: i64, rooms: Vec<Room>) -> bool {
        let new_rooms: HashSet<Room> = rooms.into_iter().collect();

        let (old_rooms, was_bound) = {
            let Some(mut entry) = self.connections.get_mut(&conn) else {
                return false;
            };
            let old = std::mem::replace(&mut entry.rooms, new_rooms.clone());
            let was_bound = entry.user_id.replace(user_id).is_some();
            (old, was_bound)
        };

        for room in old_rooms.difference(&new_rooms) {
            self.remove_from_room(*room, conn);
        }
        for room in &new_rooms {
            self.rooms.entry(*room).or_default().insert(conn);
        }

        if !was_bound {
            self.bound_count.fetch_add(1, Ordering::Relaxed);
        }
        self.publish_gauges();
        true
    }

    /// Remove a connection and every room index entry pointing at it.
    /// Called on transport disconnect; delivery to it is impossible
    /// afterwards.
    pub fn unregister(&self, conn: ConnectionId) {
        let Some((_, entry)) = self.connections.remove(&conn) else {
            return;
        };
        for room in &entry.rooms {
            self.remove_from_room(*room, conn);
        }
        if entry.user_id.is_some() {
            self.bound_count.fetch_sub(1, Ordering::Relaxed);
        }
        self.publish_gauges();
    }

    /// The identity bound to a connection, if `join` has happened.
    pub fn bound_user(&self, conn: ConnectionId) -> Option<i64> {
        self.connections.get(&conn).and_then(|e| e.user_id)
    }

    /// Whether the connection is subscribed to the given room.
    pub fn in_room(&self, conn: ConnectionId, room: Room) -> bool {
        self.connections
            .get(&conn)
            .map(|e| e.rooms.contains(&room))
            .unwrap_or(false)
    }

    /// All live connections bound to a user, in no particular order.
    pub fn connections_for_user(&self, user_id: i64) -> Vec<ConnectionId> {
        self.rooms
            .get(&Room::User(user_id))
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Deliver an event to one connection. Returns `false` if the
    /// connection is gone or its socket task has stopped receiving.
    pub fn send_to_connection(&self, conn: ConnectionId, event: ServerEvent) -> bool {
        match self.connections.get(&conn) {
            Some(entry) => entry.sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Deliver an event to every connection in a room, exactly once per
    /// connection. Returns how many live connections were reached;
    /// closed receivers are skipped (their entries are pruned when the
    /// socket task unregisters).
    pub fn send_to_room(&self, room: Room, event: &ServerEvent) -> usize {
        let members: Vec<ConnectionId> = match self.rooms.get(&room) {
            Some(members) => members.iter().copied().collect(),
            None => return 0,
        };

        let mut reached = 0;
        for conn in members {
            if self.send_to_connection(conn, event.clone()) {
                reached += 1;
            }
        }
        reached
    }

    /// Deliver an event to every device of a user.
    pub fn send_to_user(&self, user_id: i64, event: &ServerEvent) -> usize {
        self.send_to_room(Room::User(user_id), event)
    }

    /// Number of live connections, bound or not.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of connections with a bound identity.
    pub fn bound_connection_count(&self) -> usize {
        self.bound_count.load(Ordering::Relaxed)
    }

    /// Number of rooms with at least one subscriber.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn remove_from_room(&self, room: Room, conn: ConnectionId) {
        if let Some(mut members) = self.rooms.get_mut(&room) {
            members.remove(&conn);
            if members.is_empty() {
                drop(members);
                // Prune only when still empty; a concurrent subscriber
                // re-creates the entry harmlessly otherwise
                self.rooms.remove_if(&room, |_, members| members.is_empty());
            }
        }
    }

    fn publish_gauges(&self) {
        metrics::set_websocket_connections(self.connection_count(), self.bound_connection_count());
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::websocket::events::{ErrorPayload, ServerEvent};
    use pretty_assertions::assert_eq;

    fn probe_event(text: &str) -> ServerEvent {
        ServerEvent::Error(ErrorPayload {
            message: text.into(),
        })
    }

    fn connect(
        registry: &ConnectionRegistry,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (registry.register(tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_register_starts_unbound() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = connect(&registry);

        assert_eq!(registry.bound_user(conn), None);
        assert_eq!(registry.connection_count(), 1);
        assert_eq!(registry.bound_connection_count(), 0);
    }

    #[test]
    fn test_bind_subscribes_rooms_and_indexes_user() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = connect(&registry);

        assert!(registry.bind(conn, 42, vec![Room::User(42), Room::Server(1)]));

        assert_eq!(registry.bound_user(conn), Some(42));
        assert!(registry.in_room(conn, Room::User(42)));
        assert!(registry.in_room(conn, Room::Server(1)));
        assert_eq!(registry.connections_for_user(42), vec![conn]);
        assert_eq!(registry.bound_connection_count(), 1);
    }

    #[test]
    fn test_rebind_replaces_room_set() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = connect(&registry);

        registry.bind(conn, 42, vec![Room::User(42), Room::Server(1)]);
        registry.bind(conn, 42, vec![Room::User(42), Room::Server(2)]);

        assert!(!registry.in_room(conn, Room::Server(1)));
        assert!(registry.in_room(conn, Room::Server(2)));
        assert_eq!(registry.send_to_room(Room::Server(1), &probe_event("x")), 0);
        // Still exactly one bound connection after the rebind
        assert_eq!(registry.bound_connection_count(), 1);
    }

    #[test]
    fn test_rebind_to_different_user_moves_index() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = connect(&registry);

        registry.bind(conn, 42, vec![Room::User(42)]);
        registry.bind(conn, 43, vec![Room::User(43)]);

        assert_eq!(registry.bound_user(conn), Some(43));
        assert!(registry.connections_for_user(42).is_empty());
        assert_eq!(registry.connections_for_user(43), vec![conn]);
    }

    #[test]
    fn test_unregister_removes_every_index_entry() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = connect(&registry);
        registry.bind(conn, 42, vec![Room::User(42), Room::Server(1)]);

        registry.unregister(conn);

        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.bound_connection_count(), 0);
        assert_eq!(registry.room_count(), 0);
        assert!(registry.connections_for_user(42).is_empty());
        assert!(!registry.send_to_connection(conn, probe_event("late")));
    }

    #[test]
    fn test_send_to_room_reaches_each_member_once() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = connect(&registry);
        let (b, mut rx_b) = connect(&registry);
        let (c, mut rx_c) = connect(&registry);
        registry.bind(a, 1, vec![Room::User(1), Room::Server(9)]);
        registry.bind(b, 2, vec![Room::User(2), Room::Server(9)]);
        registry.bind(c, 3, vec![Room::User(3)]);

        let reached = registry.send_to_room(Room::Server(9), &probe_event("hi"));

        assert_eq!(reached, 2);
        assert_eq!(drain(&mut rx_a).len(), 1);
        assert_eq!(drain(&mut rx_b).len(), 1);
        assert_eq!(drain(&mut rx_c).len(), 0);
    }

    #[test]
    fn test_send_to_user_covers_every_device() {
        let registry = ConnectionRegistry::new();
        let (tab, mut rx_tab) = connect(&registry);
        let (phone, mut rx_phone) = connect(&registry);
        registry.bind(tab, 42, vec![Room::User(42)]);
        registry.bind(phone, 42, vec![Room::User(42)]);

        let reached = registry.send_to_user(42, &probe_event("ring"));

        assert_eq!(reached, 2);
        assert_eq!(drain(&mut rx_tab).len(), 1);
        assert_eq!(drain(&mut rx_phone).len(), 1);
    }

    #[test]
    fn test_send_to_offline_user_reaches_nobody() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.send_to_user(404, &probe_event("ring")), 0);
    }

    #[test]
    fn test_closed_receiver_is_skipped() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = connect(&registry);
        let (b, rx_b) = connect(&registry);
        registry.bind(a, 1, vec![Room::User(1), Room::Server(9)]);
        registry.bind(b, 2, vec![Room::User(2), Room::Server(9)]);

        // Socket task died without unregistering yet
        drop(rx_b);

        let reached = registry.send_to_room(Room::Server(9), &probe_event("hi"));
        assert_eq!(reached, 1);
        assert_eq!(drain(&mut rx_a).len(), 1);
    }

    #[test]
    fn test_room_display_forms() {
        assert_eq!(Room::Server(7).to_string(), "server:7");
        assert_eq!(Room::User(42).to_string(), "user:42");
    }
}
