//! Room registry: creates, tracks, and routes players to rooms.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tagrush_protocol::{PlayerId, RoomId, RoomListEntry};

use crate::room::spawn_room;
use crate::{PlayerSender, RoomConfig, RoomError, RoomHandle};

/// Counter for generating unique room IDs.
static NEXT_ROOM_ID: AtomicU64 = AtomicU64::new(1);

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

struct RegisteredRoom {
    name: String,
    handle: RoomHandle,
}

/// Every live room, plus which room each player is in.
///
/// The registry holds no game state; that lives in each room's actor.
/// A room is removed the moment its last member leaves, so every room
/// listed here has at least one member except between `create_room` and
/// the first join.
pub struct RoomRegistry {
    rooms: HashMap<RoomId, RegisteredRoom>,

    /// A player is in at most one room at a time.
    player_rooms: HashMap<PlayerId, RoomId>,

    config: RoomConfig,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            config: config.validated(),
        }
    }

    /// Spawns an empty room and returns its ID.
    pub fn create_room(&mut self, name: impl Into<String>) -> RoomId {
        let room_id = RoomId(NEXT_ROOM_ID.fetch_add(1, Ordering::Relaxed));
        let name = name.into();
        let handle = spawn_room(
            room_id,
            name.clone(),
            self.config.clone(),
            DEFAULT_CHANNEL_SIZE,
        );
        tracing::info!(%room_id, %name, "room created");
        self.rooms.insert(room_id, RegisteredRoom { name, handle });
        room_id
    }

    /// `None` means the room no longer exists.
    pub fn lookup(&self, room_id: RoomId) -> Option<RoomHandle> {
        self.rooms.get(&room_id).map(|room| room.handle.clone())
    }

    /// Every room's id and name, in no particular order.
    pub fn list_rooms(&self) -> Vec<RoomListEntry> {
        self.rooms
            .iter()
            .map(|(id, room)| RoomListEntry {
                id: *id,
                name: room.name.clone(),
            })
            .collect()
    }

    /// Adds a player to a room and records the membership.
    pub async fn join_room(
        &mut self,
        player_id: PlayerId,
        room_id: RoomId,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        if let Some(current) = self.player_rooms.get(&player_id) {
            return Err(RoomError::AlreadyInRoom(player_id, *current));
        }

        let handle = self
            .rooms
            .get(&room_id)
            .map(|room| room.handle.clone())
            .ok_or(RoomError::NotFound(room_id))?;

        handle.join(player_id, sender).await?;
        self.player_rooms.insert(player_id, room_id);
        Ok(())
    }

    /// Creates a room named `name` and joins the player to it.
    ///
    /// If the join fails the fresh room is torn down again, so a failed
    /// call leaves no empty room behind.
    pub async fn create_and_join(
        &mut self,
        player_id: PlayerId,
        name: impl Into<String>,
        sender: PlayerSender,
    ) -> Result<RoomId, RoomError> {
        if let Some(current) = self.player_rooms.get(&player_id) {
            return Err(RoomError::AlreadyInRoom(player_id, *current));
        }

        let room_id = self.create_room(name);
        if let Err(e) = self.join_room(player_id, room_id, sender).await {
            self.destroy_if_empty(room_id).await;
            return Err(e);
        }
        Ok(room_id)
    }

    /// Removes the player from whatever room it is in and destroys that
    /// room if it is now empty. Returns the room the player left.
    ///
    /// Safe to call for a player in no room.
    pub async fn leave_all(&mut self, player_id: PlayerId) -> Option<RoomId> {
        let room_id = self.player_rooms.remove(&player_id)?;

        if let Some(handle) = self.lookup(room_id) {
            match handle.leave(player_id).await {
                Ok(remaining) => {
                    tracing::debug!(%room_id, %player_id, remaining, "left room");
                }
                Err(e) => {
                    tracing::debug!(%room_id, %player_id, error = %e, "leave ignored");
                }
            }
        }

        self.destroy_if_empty(room_id).await;
        Some(room_id)
    }

    /// Removes and shuts down the room if it has no members.
    ///
    /// Idempotent: unknown rooms and occupied rooms are left alone.
    /// A room whose actor no longer answers is treated as empty.
    pub async fn destroy_if_empty(&mut self, room_id: RoomId) -> bool {
        let Some(handle) = self.lookup(room_id) else {
            return false;
        };

        let empty = match handle.get_info().await {
            Ok(info) => info.player_count == 0,
            Err(_) => true,
        };
        if !empty {
            return false;
        }

        self.rooms.remove(&room_id);
        self.player_rooms.retain(|_, rid| *rid != room_id);
        let _ = handle.shutdown().await;
        tracing::info!(%room_id, "room destroyed");
        true
    }

    /// Returns the room ID a player is currently in, if any.
    pub fn player_room(&self, player_id: PlayerId) -> Option<RoomId> {
        self.player_rooms.get(&player_id).copied()
    }

    /// Handle to the room a player is currently in.
    pub fn room_for(&self, player_id: PlayerId) -> Option<RoomHandle> {
        self.player_room(player_id)
            .and_then(|room_id| self.lookup(room_id))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().copied().collect()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
