//! Per-connection handler: greeting, message routing, and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Assign a `PlayerId` and send `Welcome`
//!   2. Start the writer task
//!   3. Loop: receive envelopes → dispatch to the registry or the room
//!   4. On close or idle timeout, leave whatever room the player is in

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tagrush_protocol::{
    ClientEnvelope, ClientMessage, Codec, PlayerId, Position, Reply, ServerMessage,
};
use tagrush_room::{PlayerSender, RoomError, RoomHandle};
use tagrush_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::TagrushError;
use crate::server::ServerState;

/// Drop guard that removes the player from its room when the handler
/// exits, including on panic. `Drop` is synchronous, so the async
/// cleanup runs in a fire-and-forget task.
struct MembershipGuard<C: Codec> {
    player_id: PlayerId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for MembershipGuard<C> {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let left = state.rooms.lock().await.leave_all(player_id).await;
            tracing::debug!(%player_id, room = ?left, "connection cleanup done");
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), TagrushError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let player_id = PlayerId(conn_id.into_inner());
    tracing::info!(%conn_id, %player_id, peer = %conn.peer_addr(), "player connected");

    // Nothing else can be queued yet, so the greeting goes out first.
    let welcome = state.codec.encode(&ServerMessage::Welcome { player_id })?;
    conn.send(&welcome).await?;

    let (outbound, inbox) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(Arc::clone(&conn), Arc::clone(&state), inbox));

    let _guard = MembershipGuard {
        player_id,
        state: Arc::clone(&state),
    };

    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%player_id, "connection timed out");
                break;
            }
        };

        let envelope: ClientEnvelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "dropping malformed frame");
                continue;
            }
        };

        let session = Session {
            player_id,
            state: state.as_ref(),
            outbound: &outbound,
            ack: envelope.ack,
        };
        session.dispatch(envelope.message).await;
    }

    writer.abort();
    // _guard drops on return → leave_all fires.
    match conn.close().await {
        Err(e) if !e.is_closed() => Err(e.into()),
        _ => Ok(()),
    }
}

/// Encodes everything addressed to this player and writes it out.
///
/// Replies from the handler and pushes from the room share this one
/// queue, so the client sees them in the order they were produced.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut inbox: mpsc::UnboundedReceiver<ServerMessage>,
) {
    while let Some(msg) = inbox.recv().await {
        let bytes = match state.codec.encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(conn_id = %conn.id(), error = %e, "failed to encode message");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            if e.is_closed() {
                tracing::debug!(conn_id = %conn.id(), "peer gone, stopping writer");
            } else {
                tracing::warn!(conn_id = %conn.id(), error = %e, "send failed, stopping writer");
            }
            break;
        }
    }
}

/// One inbound message being handled on behalf of a player.
struct Session<'a, C: Codec> {
    player_id: PlayerId,
    state: &'a ServerState<C>,
    outbound: &'a PlayerSender,
    ack: Option<u64>,
}

impl<C: Codec> Session<'_, C> {
    async fn dispatch(&self, msg: ClientMessage) {
        let player_id = self.player_id;

        match msg {
            ClientMessage::Ready => {
                if let Some(room) = self.room().await {
                    self.report(room.ready(player_id).await);
                }
            }

            ClientMessage::StartGame => {
                let Some(room) = self.room().await else {
                    return;
                };
                match room.start_game(player_id).await {
                    Ok(start) => self.reply(Reply::StartGame {
                        me: start.me,
                        others: start.others,
                    }),
                    Err(e) => self.error(&e),
                }
            }

            ClientMessage::Moved { x, y } => {
                if let Some(room) = self.room().await {
                    self.report(room.moved(player_id, Position::new(x, y)).await);
                }
            }

            ClientMessage::Collide { id, round } => {
                if let Some(room) = self.room().await {
                    self.report(room.collide(player_id, id, round).await);
                }
            }

            ClientMessage::GetRoomNames => {
                let rooms = self.state.rooms.lock().await.list_rooms();
                self.reply(Reply::RoomNames { rooms });
            }

            ClientMessage::CreateRoom { name } => {
                let result = self
                    .state
                    .rooms
                    .lock()
                    .await
                    .create_and_join(player_id, name, self.outbound.clone())
                    .await;
                match result {
                    Ok(room_id) => self.reply(Reply::RoomCreated { room_id }),
                    Err(e) => self.error(&e),
                }
            }

            ClientMessage::JoinRoom { room_id } => {
                let result = self
                    .state
                    .rooms
                    .lock()
                    .await
                    .join_room(player_id, room_id, self.outbound.clone())
                    .await;
                match result {
                    Ok(()) => self.reply(Reply::Joined { room_id }),
                    Err(e) => self.error(&e),
                }
            }

            ClientMessage::LeaveRoom => {
                self.state.rooms.lock().await.leave_all(player_id).await;
            }

            ClientMessage::Heartbeat { client_time } => {
                self.push(ServerMessage::HeartbeatAck {
                    client_time,
                    server_time: unix_millis(),
                });
            }
        }
    }

    /// The player's current room. `None` (not in a room, or the room just
    /// emptied) makes in-game events no-ops.
    async fn room(&self) -> Option<RoomHandle> {
        // The registry lock is released before the room is contacted.
        let room = self.state.rooms.lock().await.room_for(self.player_id);
        if room.is_none() {
            tracing::debug!(player_id = %self.player_id, "game event outside a room, ignoring");
        }
        room
    }

    /// Answers the request if the client asked for an acknowledgement.
    fn reply(&self, reply: Reply) {
        if let Some(ack) = self.ack {
            self.push(ServerMessage::Reply { ack, reply });
        }
    }

    fn error(&self, e: &RoomError) {
        tracing::debug!(player_id = %self.player_id, error = %e, "request failed");
        self.push(ServerMessage::Error {
            code: e.status_code(),
            message: e.to_string(),
            ack: self.ack,
        });
    }

    /// A room that stopped between lookup and send is a race, not a
    /// client error.
    fn report(&self, result: Result<(), RoomError>) {
        if let Err(e) = result {
            tracing::debug!(player_id = %self.player_id, error = %e, "room unavailable");
        }
    }

    fn push(&self, msg: ServerMessage) {
        let _ = self.outbound.send(msg);
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
