//! Joined players and their kinematic state.
//!
//! A [`Session`] exists from a successful join until its connection goes
//! away. Usernames are unique among live sessions and are released on
//! leave.

use std::collections::BTreeMap;

use blockyard_net::{ConnectionId, InputState, PlayerPose, Position, Rotation};
use blockyard_physics::{MoveKeys, PlayerBody, PlayerInput};
use glam::{Vec2, Vec3};
use rustc_hash::FxHashMap;

/// Reasons a join request is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Username taken")]
    NameTaken(String),

    #[error("Username must not be empty")]
    EmptyName,

    #[error("Connection already joined as '{0}'")]
    AlreadyJoined(String),
}

/// One joined player.
#[derive(Debug, Clone)]
pub struct Session {
    pub username: String,
    pub connection: ConnectionId,
    pub body: PlayerBody,
    /// Latest input received; applied every tick until replaced.
    pub input: PlayerInput,
}

impl Session {
    /// Wire representation of the player's position and look direction.
    pub fn pose(&self) -> PlayerPose {
        let p = self.body.position;
        PlayerPose {
            pos: Position { x: p.x, y: p.y, z: p.z },
            rot: Rotation {
                x: self.body.pitch,
                y: self.body.yaw,
            },
        }
    }
}

/// Convert a decoded wire input into the physics representation.
pub fn player_input(state: &InputState) -> PlayerInput {
    PlayerInput {
        keys: MoveKeys::from_key_states(state.key_states()),
        mouse: Vec2::new(state.mouse_movement.x, state.mouse_movement.y),
        jump: state.jump,
    }
}

/// All live sessions, iterated in connection order.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<ConnectionId, Session>,
    names: FxHashMap<String, ConnectionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `username` for `connection` with a body at `spawn`.
    pub fn join(&mut self, connection: ConnectionId, username: &str, spawn: Vec3) -> Result<&Session, JoinError> {
        if let Some(existing) = self.sessions.get(&connection) {
            return Err(JoinError::AlreadyJoined(existing.username.clone()));
        }
        if username.is_empty() {
            return Err(JoinError::EmptyName);
        }
        if self.names.contains_key(username) {
            return Err(JoinError::NameTaken(username.to_string()));
        }

        self.names.insert(username.to_string(), connection);
        let session = self.sessions.entry(connection).or_insert(Session {
            username: username.to_string(),
            connection,
            body: PlayerBody::spawn(spawn),
            input: PlayerInput::default(),
        });
        Ok(session)
    }

    /// Remove the session for `connection`, freeing its username.
    pub fn leave(&mut self, connection: ConnectionId) -> Option<Session> {
        let session = self.sessions.remove(&connection)?;
        self.names.remove(&session.username);
        Some(session)
    }

    /// Replace the buffered input. Returns `false` if `connection` has not joined.
    pub fn set_input(&mut self, connection: ConnectionId, input: PlayerInput) -> bool {
        match self.sessions.get_mut(&connection) {
            Some(session) => {
                session.input = input;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, connection: ConnectionId) -> Option<&Session> {
        self.sessions.get(&connection)
    }

    pub fn is_joined(&self, connection: ConnectionId) -> bool {
        self.sessions.contains_key(&connection)
    }

    pub fn connection_for(&self, username: &str) -> Option<ConnectionId> {
        self.names.get(username).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.values_mut()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Pose of every session whose connection passes `include`, keyed by
    /// username.
    pub fn poses(&self, include: impl Fn(ConnectionId) -> bool) -> BTreeMap<String, PlayerPose> {
        self.sessions
            .values()
            .filter(|s| include(s.connection))
            .map(|s| (s.username.clone(), s.pose()))
            .collect()
    }
}
