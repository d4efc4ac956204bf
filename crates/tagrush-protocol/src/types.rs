//! Wire types for Tagrush.
//!
//! Everything in this module crosses the network: identifiers, player
//! state, and the two message families (client → server and
//! server → client). The JSON shapes are what browser clients consume,
//! so the serde attributes here are part of the public contract.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier for a connected player.
///
/// Assigned by the server when a connection is accepted and stable for
/// the lifetime of that connection. Serialized as a plain number, so
/// `PlayerId(42)` is `42` on the wire and `"42"` when used as a JSON
/// object key. Decoding accepts either form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdVisitor).map(PlayerId)
    }
}

/// Opaque identifier for a room. Same wire form as [`PlayerId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

impl<'de> Deserialize<'de> for RoomId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdVisitor).map(RoomId)
    }
}

/// Reads an id from a number or a numeric string. Map keys arrive as
/// strings once serde has buffered an internally tagged message.
struct IdVisitor;

impl Visitor<'_> for IdVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer id or a string holding one")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
        v.parse()
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

// ---------------------------------------------------------------------------
// Player state
// ---------------------------------------------------------------------------

/// A point in arena coordinates (meters).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Where every player stands before the first round spawns them.
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Full public state of one player, including its id.
///
/// Used in the `startGame` reply and in `PlayerMoved` relays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub x: f64,
    pub y: f64,
    pub score: i32,
    #[serde(rename = "isIt")]
    pub is_it: bool,
}

/// Per-player entry of a round broadcast. The id is the map key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub x: f64,
    pub y: f64,
    pub score: i32,
    #[serde(rename = "isIt")]
    pub is_it: bool,
}

impl From<&PlayerState> for PlayerSnapshot {
    fn from(state: &PlayerState) -> Self {
        Self {
            x: state.x,
            y: state.y,
            score: state.score,
            is_it: state.is_it,
        }
    }
}

/// A room as shown in the lobby list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomListEntry {
    pub id: RoomId,
    pub name: String,
}

/// How the game ended, from the recipient's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Won,
    Lost,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Events a client can send.
///
/// Adjacently tagged with camelCase variant names, matching the event
/// names browser clients already use:
///
/// ```text
/// { "type": "moved", "data": { "x": 12.5, "y": 40.0 } }
/// { "type": "ready" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// "I'm in the waiting room."
    Ready,

    /// "Reset the room and start a game." Replied to via the ack.
    StartGame,

    /// "I moved here." Relayed to everyone else in the room.
    Moved { x: f64, y: f64 },

    /// "The round ended by collision."
    ///
    /// `id` is the chaser the client believes made the catch. `round` is
    /// the round number from the last `RoundStarted` the client saw;
    /// reports for any other round are discarded as stale.
    Collide {
        id: PlayerId,
        #[serde(default)]
        round: Option<u64>,
    },

    /// "Which rooms exist?" Replied to via the ack.
    GetRoomNames,

    /// "Create a room with this name and put me in it."
    CreateRoom { name: String },

    /// "Put me in this room."
    JoinRoom { room_id: RoomId },

    /// "Take me out of my room."
    LeaveRoom,

    /// Keep-alive. Echoed back with the server clock.
    Heartbeat { client_time: u64 },
}

/// A client message plus an optional acknowledgement id.
///
/// When `ack` is present, the server answers with exactly one
/// [`ServerMessage::Reply`] (or [`ServerMessage::Error`]) carrying the
/// same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    pub message: ClientMessage,
}

impl ClientEnvelope {
    pub fn new(message: ClientMessage) -> Self {
        Self { ack: None, message }
    }

    pub fn with_ack(ack: u64, message: ClientMessage) -> Self {
        Self {
            ack: Some(ack),
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Payload of an acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Reply {
    /// Answer to `startGame`: the requester's own state and everyone else's.
    StartGame {
        me: PlayerState,
        others: Vec<PlayerState>,
    },

    /// Answer to `getRoomNames`.
    RoomNames { rooms: Vec<RoomListEntry> },

    /// Answer to `createRoom`.
    RoomCreated { room_id: RoomId },

    /// Answer to `joinRoom`.
    Joined { room_id: RoomId },
}

/// Messages the server pushes to a client.
///
/// Internally tagged: `{ "type": "InitGame" }`,
/// `{ "type": "GameOver", "outcome": "won", "winner": 3 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// First message on every connection: the id the server assigned.
    Welcome { player_id: PlayerId },

    /// The room has both players; clients should load the game scene.
    InitGame,

    /// Acknowledgement of a client message that carried an `ack` id.
    Reply { ack: u64, reply: Reply },

    /// Another player in the room moved.
    PlayerMoved(PlayerState),

    /// A new round began: fresh spawns, roles and scores for everyone.
    RoundStarted {
        round: u64,
        players: BTreeMap<PlayerId, PlayerSnapshot>,
    },

    /// Terminal outcome of the game, personalized per recipient.
    GameOver { outcome: Outcome, winner: PlayerId },

    /// Echo of a client heartbeat.
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// A request failed. `code` follows HTTP conventions (404 = no such
    /// room, 409 = conflicting membership).
    Error {
        code: u16,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ack: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_numbers() {
        assert_eq!(serde_json::to_string(&PlayerId(42)).unwrap(), "42");
        assert_eq!(serde_json::to_string(&RoomId(9)).unwrap(), "9");
    }

    #[test]
    fn test_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
        assert_eq!(RoomId(3).to_string(), "R-3");
    }

    #[test]
    fn test_player_state_uses_is_it_camel_case() {
        let state = PlayerState {
            id: PlayerId(1),
            x: 8.0,
            y: 120.0,
            score: -2,
            is_it: true,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["isIt"], true);
        assert_eq!(json["score"], -2);
        assert!(json.get("is_it").is_none());
    }

    #[test]
    fn test_client_message_moved_shape() {
        let json = r#"{ "message": { "type": "moved", "data": { "x": 1.5, "y": 2 } } }"#;
        let env: ClientEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(env.ack, None);
        assert_eq!(env.message, ClientMessage::Moved { x: 1.5, y: 2.0 });
    }

    #[test]
    fn test_client_message_unit_variant_without_data() {
        let json = r#"{ "ack": 4, "message": { "type": "startGame" } }"#;
        let env: ClientEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(env.ack, Some(4));
        assert_eq!(env.message, ClientMessage::StartGame);
    }

    #[test]
    fn test_collide_round_is_optional() {
        let json = r#"{ "type": "collide", "data": { "id": 5 } }"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Collide {
                id: PlayerId(5),
                round: None
            }
        );
    }

    #[test]
    fn test_client_message_event_names() {
        let json = serde_json::to_value(ClientMessage::GetRoomNames).unwrap();
        assert_eq!(json["type"], "getRoomNames");
        let json = serde_json::to_value(ClientMessage::JoinRoom {
            room_id: RoomId(2),
        })
        .unwrap();
        assert_eq!(json["type"], "joinRoom");
        assert_eq!(json["data"]["room_id"], 2);
    }

    #[test]
    fn test_unknown_client_event_is_rejected() {
        let json = r#"{ "message": { "type": "teleport", "data": {} } }"#;
        assert!(serde_json::from_str::<ClientEnvelope>(json).is_err());
    }

    #[test]
    fn test_round_started_keys_players_by_id() {
        let mut players = BTreeMap::new();
        players.insert(
            PlayerId(3),
            PlayerSnapshot {
                x: 120.0,
                y: 8.0,
                score: 1,
                is_it: false,
            },
        );
        let msg = ServerMessage::RoundStarted { round: 2, players };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "RoundStarted");
        assert_eq!(json["round"], 2);
        assert_eq!(json["players"]["3"]["x"], 120.0);
        assert_eq!(json["players"]["3"]["isIt"], false);
    }

    #[test]
    fn test_round_started_decodes_back() {
        let mut players = BTreeMap::new();
        for (id, is_it) in [(1, true), (12, false)] {
            players.insert(
                PlayerId(id),
                PlayerSnapshot {
                    x: 8.0,
                    y: 8.0,
                    score: 0,
                    is_it,
                },
            );
        }
        let msg = ServerMessage::RoundStarted { round: 4, players };
        let text = serde_json::to_string(&msg).unwrap();
        let back: ServerMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_ids_decode_from_number_or_string() {
        assert_eq!(serde_json::from_str::<PlayerId>("5").unwrap(), PlayerId(5));
        assert_eq!(serde_json::from_str::<PlayerId>(r#""5""#).unwrap(), PlayerId(5));
        assert_eq!(serde_json::from_str::<RoomId>(r#""17""#).unwrap(), RoomId(17));
        assert!(serde_json::from_str::<PlayerId>("-1").is_err());
        assert!(serde_json::from_str::<PlayerId>(r#""five""#).is_err());
        assert!(serde_json::from_str::<RoomId>("1.5").is_err());
    }

    #[test]
    fn test_player_moved_flattens_state() {
        let msg = ServerMessage::PlayerMoved(PlayerState {
            id: PlayerId(2),
            x: 3.0,
            y: 4.0,
            score: 0,
            is_it: false,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "PlayerMoved");
        assert_eq!(json["id"], 2);
        assert_eq!(json["y"], 4.0);
    }

    #[test]
    fn test_game_over_outcome_is_lowercase() {
        let msg = ServerMessage::GameOver {
            outcome: Outcome::Lost,
            winner: PlayerId(1),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["outcome"], "lost");
        assert_eq!(json["winner"], 1);
    }

    #[test]
    fn test_reply_nests_its_own_tag() {
        let msg = ServerMessage::Reply {
            ack: 11,
            reply: Reply::RoomNames {
                rooms: vec![RoomListEntry {
                    id: RoomId(1),
                    name: "Arena".into(),
                }],
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Reply");
        assert_eq!(json["ack"], 11);
        assert_eq!(json["reply"]["type"], "RoomNames");
        assert_eq!(json["reply"]["rooms"][0]["name"], "Arena");
    }

    #[test]
    fn test_error_omits_missing_ack() {
        let msg = ServerMessage::Error {
            code: 404,
            message: "room R-9 not found".into(),
            ack: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["code"], 404);
        assert!(json.get("ack").is_none());
    }
}
