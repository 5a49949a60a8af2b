//! Multi-session routing.
//!
//! The registry stands between a transport layer and the game engine: it
//! maps connection ids to (session, player) routes, feeds intents to the
//! right `GameSession`, and expands each `Outgoing` into per-connection
//! deliveries. It never inspects game state beyond what the session
//! exposes, and sessions never learn about connections.
//!
//! Joining is a lobby concern and needs a session id, so it is a direct
//! method rather than an `Intent`; everything after that flows through
//! `dispatch`. Rejected intents come back as a private `Event::Error` to
//! the offending connection only.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{GameRng, PlayerId};
use crate::session::{
    Audience, Event, GameSession, Intent, Outgoing, SessionConfig, SessionSnapshot,
};

/// Transport-assigned identifier for one client connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Create a new connection ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn #{}", self.0)
    }
}

/// Registry-unique session identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u32);

impl SessionId {
    /// Create a new session ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session #{}", self.0)
    }
}

/// One event addressed to one connection, ready for the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub to: ConnectionId,
    pub event: Event,
}

/// Where a connection's intents go.
#[derive(Clone, Copy, Debug)]
struct Route {
    session: SessionId,
    player: PlayerId,
}

/// All live sessions and the connections seated in them.
#[derive(Debug)]
pub struct SessionRegistry {
    config: SessionConfig,
    /// Master rng; each session gets an independent fork.
    rng: GameRng,
    sessions: FxHashMap<SessionId, GameSession>,
    members: FxHashMap<SessionId, Vec<(ConnectionId, PlayerId)>>,
    routes: FxHashMap<ConnectionId, Route>,
    next_session: u32,
}

impl SessionRegistry {
    /// Create an empty registry. `config` applies to every session it opens.
    #[must_use]
    pub fn new(config: SessionConfig, rng: GameRng) -> Self {
        Self {
            config,
            rng,
            sessions: FxHashMap::default(),
            members: FxHashMap::default(),
            routes: FxHashMap::default(),
            next_session: 0,
        }
    }

    /// Open a fresh session and return its id.
    ///
    /// Sessions also open implicitly on first `join`; this is for
    /// transports that hand out ids before anyone is seated.
    pub fn open_session(&mut self) -> SessionId {
        loop {
            let id = SessionId::new(self.next_session);
            self.next_session += 1;
            if !self.sessions.contains_key(&id) {
                self.sessions
                    .insert(id, GameSession::new(self.config, self.rng.fork()));
                self.members.insert(id, Vec::new());
                tracing::info!(session = %id, "session opened");
                return id;
            }
        }
    }

    /// Number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Read access to a session, if it is still live.
    #[must_use]
    pub fn session(&self, id: SessionId) -> Option<&GameSession> {
        self.sessions.get(&id)
    }

    /// Seat a connection in a session under the given display name.
    ///
    /// An unknown session id opens the session, so the first member of a
    /// room creates it.
    pub fn join(&mut self, conn: ConnectionId, session: SessionId, name: &str) -> Vec<Delivery> {
        if self.routes.contains_key(&conn) {
            return Self::reject(conn, "already seated in a session");
        }
        if !self.sessions.contains_key(&session) {
            tracing::info!(session = %session, "session opened");
            self.sessions
                .insert(session, GameSession::new(self.config, self.rng.fork()));
            self.members.insert(session, Vec::new());
        }
        let Some(game) = self.sessions.get_mut(&session) else {
            return Self::reject(conn, "no such session");
        };

        match game.join(name) {
            Ok((player, out)) => {
                self.routes.insert(conn, Route { session, player });
                if let Some(members) = self.members.get_mut(&session) {
                    members.push((conn, player));
                }
                tracing::debug!(%conn, %session, player = %player, "connection seated");
                self.fan_out(session, &out)
            }
            Err(err) => Self::reject(conn, &err.to_string()),
        }
    }

    /// Route one intent from a connection to its session.
    ///
    /// Returns the deliveries the transport should send; a rejected intent
    /// yields a single private error delivery.
    pub fn dispatch(&mut self, conn: ConnectionId, intent: Intent) -> Vec<Delivery> {
        let Some(route) = self.routes.get(&conn).copied() else {
            return Self::reject(conn, "not seated in a session");
        };
        if matches!(intent, Intent::Leave) {
            return self.disconnect(conn);
        }
        let Some(game) = self.sessions.get_mut(&route.session) else {
            return Self::reject(conn, "no such session");
        };

        let result = match intent {
            Intent::Join { .. } => return Self::reject(conn, "already seated in a session"),
            Intent::Start => game.start(route.player),
            Intent::Draw { source } => game.draw(route.player, source),
            Intent::Meld { groups } => game.meld(route.player, &groups),
            Intent::Extend { meld, cards } => game.extend(route.player, meld, &cards),
            Intent::Steal { meld, card } => game.steal(route.player, meld, card),
            Intent::Discard { card } => game.discard(route.player, card),
            Intent::Leave => unreachable!("handled above"),
        };

        match result {
            Ok(out) => self.fan_out(route.session, &out),
            Err(err) => Self::reject(conn, &err.to_string()),
        }
    }

    /// Remove a connection, folding its player out of the game.
    ///
    /// The session is torn down once its last member is gone.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Vec<Delivery> {
        let Some(route) = self.routes.remove(&conn) else {
            return Vec::new();
        };
        if let Some(members) = self.members.get_mut(&route.session) {
            members.retain(|(c, _)| *c != conn);
        }

        let mut deliveries = Vec::new();
        if let Some(game) = self.sessions.get_mut(&route.session) {
            if let Ok(out) = game.leave(route.player) {
                deliveries = self.fan_out(route.session, &out);
            }
            if self
                .members
                .get(&route.session)
                .map_or(true, Vec::is_empty)
            {
                self.sessions.remove(&route.session);
                self.members.remove(&route.session);
                tracing::info!(session = %route.session, "session closed");
            }
        }
        deliveries
    }

    /// A full per-viewer snapshot for a seated connection.
    #[must_use]
    pub fn snapshot(&self, conn: ConnectionId) -> Option<SessionSnapshot> {
        let route = self.routes.get(&conn)?;
        let game = self.sessions.get(&route.session)?;
        Some(game.snapshot(Some(route.player)))
    }

    /// Expand session events into per-connection deliveries.
    fn fan_out(&self, session: SessionId, out: &[Outgoing]) -> Vec<Delivery> {
        let Some(members) = self.members.get(&session) else {
            return Vec::new();
        };
        let mut deliveries = Vec::new();
        for outgoing in out {
            match outgoing.audience {
                Audience::Player(player) => {
                    for (conn, _) in members.iter().filter(|(_, p)| *p == player) {
                        deliveries.push(Delivery {
                            to: *conn,
                            event: outgoing.event.clone(),
                        });
                    }
                }
                Audience::Everyone => {
                    for (conn, _) in members {
                        deliveries.push(Delivery {
                            to: *conn,
                            event: outgoing.event.clone(),
                        });
                    }
                }
            }
        }
        deliveries
    }

    fn reject(conn: ConnectionId, reason: &str) -> Vec<Delivery> {
        vec![Delivery {
            to: conn,
            event: Event::Error {
                reason: reason.to_string(),
            },
        }]
    }
}
