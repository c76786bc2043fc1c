//! WebSocket Connection Handler
//!
//! Drives one connection: `hello`, identity handshake, `ready`, then the
//! event loop until the client leaves or stops sending heartbeats.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use futures::{stream::SplitStream, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};
use uuid::Uuid;

use super::gateway::Gateway;
use super::messages::{ClientFrame, ServerFrame};
use super::session::ConnectionState;
use crate::application::dto::IdentifyRequest;
use crate::application::services::{ConnectionContext, HandshakeCredentials, InboundEvent};
use crate::config::WebSocketSettings;
use crate::infrastructure::metrics;
use crate::startup::AppState;

/// Grace period on top of the heartbeat interval
const HEARTBEAT_GRACE: Duration = Duration::from_secs(10);

/// Upgrade request query string
#[derive(Debug, Default, Deserialize)]
pub struct GatewayQuery {
    pub token: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Response {
    let credentials = HandshakeCredentials {
        auth_token: None,
        query_token: query.token,
        header_token: bearer.map(|TypedHeader(auth)| auth.token().to_string()),
    };

    ws.max_message_size(state.settings.websocket.max_message_size)
        .max_frame_size(state.settings.websocket.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state, credentials))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, mut credentials: HandshakeCredentials) {
    let connection_id = Uuid::new_v4().to_string();
    let mut connection_state = ConnectionState::new(connection_id.clone());

    tracing::debug!(connection_id = %connection_id, "New WebSocket connection");

    // Split socket for concurrent read/write
    let (mut sender, mut receiver) = socket.split();

    // Create channel for outgoing frames
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    let hello = ServerFrame::hello(&connection_id, state.gateway.heartbeat_interval());
    let hello = match serde_json::to_string(&hello) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode hello");
            return;
        }
    };
    if let Err(e) = sender.send(Message::Text(hello.into())).await {
        tracing::debug!(error = %e, "Failed to send hello");
        return;
    }

    // Spawn task to forward frames from channel to WebSocket
    let sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!("Failed to serialize frame: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Wait for identify; any other first frame is handled after the handshake
    let identify_timeout = identify_wait(&credentials, &state.settings.websocket);
    let pending = match timeout(identify_timeout, next_frame(&mut receiver)).await {
        Ok(Handshake::Closed) => {
            tracing::debug!(connection_id = %connection_id, "Connection closed before identify");
            sender_task.abort();
            return;
        }
        Ok(Handshake::Frame(frame)) if frame.event == "identify" => {
            connection_state.heartbeat();
            let identify: IdentifyRequest = serde_json::from_value(frame.data).unwrap_or_default();
            credentials.auth_token = identify.token;
            None
        }
        Ok(Handshake::Frame(frame)) => {
            connection_state.heartbeat();
            Some(frame)
        }
        Err(_) => {
            tracing::debug!(connection_id = %connection_id, "Identify timeout");
            None
        }
    };

    let ctx = match state.lifecycle.connect(&connection_id, &credentials).await {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!(connection_id = %connection_id, error = %e, "Failed to register connection");
            sender_task.abort();
            return;
        }
    };

    state
        .gateway
        .attach(&connection_id, ctx.identity.is_authenticated(), tx.clone());
    report_connections(&state.gateway);

    let _ = tx.send(ServerFrame::ready(
        &connection_id,
        ctx.user_id(),
        ctx.identity.reject_reason(),
    ));

    tracing::info!(
        connection_id = %connection_id,
        user_id = ?ctx.user_id(),
        authenticated = ctx.identity.is_authenticated(),
        "Connection ready"
    );

    if let Some(frame) = pending {
        dispatch(frame, &ctx, &state, &tx).await;
    }

    let heartbeat_timeout =
        Duration::from_millis(state.gateway.heartbeat_interval()) + HEARTBEAT_GRACE;
    let mut heartbeat_check = interval(heartbeat_timeout);
    heartbeat_check.tick().await; // Skip first immediate tick

    // Main message loop
    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        connection_state.heartbeat();
                        match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(frame) => dispatch(frame, &ctx, &state, &tx).await,
                            Err(e) => tracing::debug!(
                                connection_id = %connection_id,
                                error = %e,
                                "Invalid frame"
                            ),
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        // Pong is handled automatically by axum
                        connection_state.heartbeat();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(connection_id = %connection_id, "Connection closed");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }

            _ = heartbeat_check.tick() => {
                if !connection_state.is_alive(heartbeat_timeout) {
                    tracing::info!(
                        connection_id = %connection_id,
                        "Heartbeat timeout, closing connection"
                    );
                    break;
                }
            }
        }
    }

    // Cleanup
    state.gateway.detach(&connection_id);
    report_connections(&state.gateway);
    state.lifecycle.disconnect(&ctx).await;
    sender_task.abort();

    tracing::info!(
        connection_id = %connection_id,
        user_id = ?ctx.user_id(),
        frames = connection_state.frames_received,
        "Connection closed"
    );
}

/// How long to hold the connection for an identify frame. A token on the
/// upgrade request only needs a short grace for an overriding identify.
fn identify_wait(credentials: &HandshakeCredentials, settings: &WebSocketSettings) -> Duration {
    let full = Duration::from_secs(settings.identify_timeout_secs);
    if credentials.has_upgrade_credential() {
        full.min(Duration::from_millis(settings.identify_grace_ms))
    } else {
        full
    }
}

enum Handshake {
    Frame(ClientFrame),
    Closed,
}

/// First decodable client frame, skipping anything else.
async fn next_frame(receiver: &mut SplitStream<WebSocket>) -> Handshake {
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Ok(frame) = serde_json::from_str::<ClientFrame>(&text) {
                    return Handshake::Frame(frame);
                }
            }
            Ok(Message::Close(_)) | Err(_) => return Handshake::Closed,
            _ => continue,
        }
    }
    Handshake::Closed
}

/// Handle one client frame inline, preserving per-connection order.
async fn dispatch(
    frame: ClientFrame,
    ctx: &ConnectionContext,
    state: &AppState,
    tx: &mpsc::UnboundedSender<ServerFrame>,
) {
    let event = InboundEvent::parse(&frame.event, frame.data);
    let reply = state.lifecycle.handle(ctx, event).await;

    if let (Some(ack), Some(data)) = (frame.ack, reply) {
        let _ = tx.send(ServerFrame::Ack { ack, data });
    }
}

fn report_connections(gateway: &Gateway) {
    metrics::set_websocket_connections(
        gateway.connection_count() as i64,
        gateway.authenticated_count() as i64,
    );
}
