//! WebSocket server and connection handling.

use crate::config::ServerConfig;
use crate::hub::{Hub, ParticipantId};
use crate::protocol::{ClientMessage, ServerMessage};
use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Bind the configured address and serve connections until the listener fails.
pub async fn run_server(config: &ServerConfig, hub: Arc<Hub>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    info!("Othello server listening on {}", config.addr);

    serve(listener, hub).await
}

/// Accept connections on an already bound listener.
pub async fn serve(listener: TcpListener, hub: Arc<Hub>) -> anyhow::Result<()> {
    while let Ok((stream, peer_addr)) = listener.accept().await {
        let hub = Arc::clone(&hub);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, hub).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    hub: Arc<Hub>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let participant_id = Uuid::new_v4();

    // Everything for this socket goes through the hub-owned sender; the writer
    // stops once the hub drops it.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode {} message: {}", msg.kind(), e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    if hub.on_connect(participant_id, tx).is_err() {
        // The rejection notice is already queued; let the writer flush it and close
        let _ = send_task.await;
        info!("Closed rejected connection from {}", addr);
        return Ok(());
    }

    debug!("{} player(s) in session", hub.participant_count());

    let mut resigned = false;

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    if !handle_message(participant_id, client_msg, &hub) {
                        resigned = true;
                        break;
                    }
                }
                Err(e) => warn!("Invalid message from {}: {} ({})", participant_id, text, e),
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", participant_id);
                break;
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", participant_id, e);
                break;
            }
            _ => {}
        }
    }

    if resigned {
        // The dispatcher deregisters us after delivering the result, which
        // closes the outbox and lets the writer finish.
        let _ = send_task.await;
    } else {
        hub.on_disconnect(participant_id);
        send_task.abort();
    }

    info!(
        "Connection closed for {} (session {:?})",
        participant_id,
        hub.status()
    );
    Ok(())
}

/// Handle a client message. Returns `false` once the player has left the game.
fn handle_message(participant_id: ParticipantId, msg: ClientMessage, hub: &Hub) -> bool {
    match msg {
        ClientMessage::Move { index } => {
            if let Err(e) = hub.on_move(participant_id, index) {
                debug!("Move {} from {} not applied: {}", index, participant_id, e);
            }
            true
        }

        ClientMessage::Chat { chat_message } => {
            if let Err(e) = hub.on_chat(participant_id, chat_message) {
                warn!("Dropping chat from {}: {}", participant_id, e);
            }
            true
        }

        ClientMessage::Resign => {
            if let Err(e) = hub.on_resign(participant_id) {
                warn!("Resignation from {} ignored: {}", participant_id, e);
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use othello_core::{Board, Cell, Color};
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn start_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (hub, dispatcher) = Hub::new();
        tokio::spawn(dispatcher.run());
        tokio::spawn(serve(listener, hub));
        addr
    }

    async fn connect(addr: SocketAddr) -> Client {
        let (ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
        ws
    }

    async fn recv(ws: &mut Client) -> ServerMessage {
        loop {
            let frame = timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for a message")
                .expect("connection ended")
                .expect("websocket error");
            if let Message::Text(text) = frame {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    async fn send(ws: &mut Client, json: &str) {
        ws.send(Message::Text(json.to_string().into())).await.unwrap();
    }

    #[tokio::test]
    async fn test_full_session_over_websocket() {
        let addr = start_server().await;

        let mut black = connect(addr).await;
        assert_eq!(
            recv(&mut black).await,
            ServerMessage::Color {
                color: Color::Black
            }
        );

        let mut white = connect(addr).await;
        assert_eq!(
            recv(&mut white).await,
            ServerMessage::Color {
                color: Color::White
            }
        );
        for ws in [&mut black, &mut white] {
            match recv(ws).await {
                ServerMessage::Start {
                    board,
                    current_player,
                    ..
                } => {
                    assert_eq!(board, Board::standard());
                    assert_eq!(current_player, Color::Black);
                }
                other => panic!("expected start, got {:?}", other),
            }
        }

        // A third player is turned away
        let mut extra = connect(addr).await;
        assert!(matches!(recv(&mut extra).await, ServerMessage::Error { .. }));

        send(&mut black, r#"{"type":"move","move":19}"#).await;
        for ws in [&mut black, &mut white] {
            match recv(ws).await {
                ServerMessage::Update {
                    board,
                    current_player,
                } => {
                    assert_eq!(board.get(19), Some(Cell::Black));
                    assert_eq!(board.get(27), Some(Cell::Black));
                    assert_eq!(current_player, Color::White);
                }
                other => panic!("expected update, got {:?}", other),
            }
        }

        send(&mut white, r#"{"type":"chat","chatMessage":"nice"}"#).await;
        let chat = ServerMessage::Chat {
            chat_message: "nice".to_string(),
            color: Color::White,
        };
        assert_eq!(recv(&mut black).await, chat);
        assert_eq!(recv(&mut white).await, chat);

        send(&mut black, r#"{"type":"resign"}"#).await;
        let winner = ServerMessage::Winner {
            message: "White wins by resignation!".to_string(),
        };
        assert_eq!(recv(&mut black).await, winner);
        assert_eq!(recv(&mut white).await, winner);
        assert!(matches!(recv(&mut white).await, ServerMessage::Error { .. }));
    }

    #[tokio::test]
    async fn test_garbage_frames_are_ignored() {
        let addr = start_server().await;

        let mut black = connect(addr).await;
        recv(&mut black).await;
        send(&mut black, "not json").await;
        send(&mut black, r#"{"type":"chat","chatMessage":"still here"}"#).await;

        assert_eq!(
            recv(&mut black).await,
            ServerMessage::Chat {
                chat_message: "still here".to_string(),
                color: Color::Black,
            }
        );
    }
}
