use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, info, warn};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct Viewer {
    pub player_id: Option<String>,
}

/// What a client may send: a line of chat, optionally into a talk channel.
#[derive(Debug, Serialize, Deserialize)]
struct IncomingChat {
    content: String,
    talk: Option<String>,
}

#[derive(Debug, Serialize)]
struct SocketError {
    message_type: &'static str,
    content: String,
}

pub async fn handler(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Query(viewer): Query<Viewer>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, channel, viewer.player_id))
}

pub async fn handle_socket(ws: WebSocket, state: AppState, channel: String, viewer: Option<String>) {
    info!(%channel, ?viewer, "websocket connected");
    let messenger = state.messenger_for(&channel).await;
    let (mut sender, mut receiver) = ws.split();
    let mut rx = messenger.subscribe();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<String>();

    let send_messenger = messenger.clone();
    let send_viewer = viewer.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let text = tokio::select! {
                received = rx.recv() => match received {
                    Ok(message) => {
                        if !send_messenger.is_visible_to(&message, send_viewer.as_deref()).await {
                            continue;
                        }
                        match serde_json::to_string(&message) {
                            Ok(text) => text,
                            Err(e) => {
                                warn!("could not encode chat message: {}", e);
                                continue;
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "websocket subscriber lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                Some(text) = reply_rx.recv() => text,
            };
            if let Err(e) = sender.send(Message::Text(text)).await {
                debug!("websocket send failed: {}", e);
                break;
            }
        }
    });

    let recv_channel = channel.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let Message::Text(text) = msg else {
                continue;
            };
            let result = match (&viewer, serde_json::from_str::<IncomingChat>(&text)) {
                (None, _) => Err("anonymous viewers can't speak".to_string()),
                (_, Err(e)) => Err(format!("malformed message: {}", e)),
                (Some(player), Ok(chat)) => messenger
                    .say(player, chat.content, chat.talk)
                    .await
                    .map_err(|e| e.to_string()),
            };
            if let Err(content) = result {
                debug!(channel = %recv_channel, "rejected websocket message: {}", content);
                let error = SocketError {
                    message_type: "error",
                    content,
                };
                if let Ok(text) = serde_json::to_string(&error) {
                    if reply_tx.send(text).is_err() {
                        break;
                    }
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => receive_task.abort(),
        _ = &mut receive_task => send_task.abort(),
    }
    info!(%channel, "websocket closed");
}
