//! WebSocket subscription to team events

use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Extension;
use ctf_platform_models::Actor;
use tracing::debug;

pub async fn subscribe(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| forward_events(socket, state, actor))
}

/// Forward hub events to the socket until either side goes away
async fn forward_events(mut socket: WebSocket, state: AppState, actor: Actor) {
    let mut rx = state.events.subscribe(actor.user_id, actor.team_id).await;
    debug!(user_id = %actor.user_id, "Event stream attached");

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                let Ok(payload) = serde_json::to_string(&event) else { continue };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }

    state.events.unsubscribe(actor.user_id).await;
    debug!(user_id = %actor.user_id, "Event stream detached");
}
