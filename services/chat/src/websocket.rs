use std::time::Duration;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use tokio::time::Instant;
use uuid::Uuid;

use campusmentor_auth::{authenticate, AuthUser};
use campusmentor_common::AppError;
use campusmentor_database::ConversationView;

use crate::{
    message_service::MessageService,
    models::{ClientFrame, ServerFrame, WebSocketQuery},
    AppState,
};

type WsSender = SplitSink<WebSocket, WsMessage>;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WebSocketQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    // Browsers cannot set headers on the upgrade request
    let user = authenticate(&state, &params.token).await?;

    if user.user_id == params.with {
        return Err(AppError::Validation("Cannot open a conversation with yourself".to_string()));
    }

    let connection_count = state.connection_manager.connection_count(user.user_id);
    if connection_count >= state.config.websocket.max_connections_per_user {
        return Err(AppError::RateLimited(
            "Maximum connections per user exceeded".to_string(),
        ));
    }

    let other_user_id = params.with;
    Ok(ws.on_upgrade(move |socket| handle_websocket(socket, user, other_user_id, state)))
}

async fn handle_websocket(socket: WebSocket, user: AuthUser, other_user_id: Uuid, state: AppState) {
    let user_id = user.user_id;
    let _guard = state.connection_manager.register(user_id);
    let service = MessageService::new(&state);

    tracing::info!(user_id = %user_id, other_user_id = %other_user_id, "WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading history so nothing falls between the two
    let live = state.connection_manager.subscribe(user_id, other_user_id);
    tokio::pin!(live);

    let mut view = match service.conversation(user_id, other_user_id).await {
        Ok(history) => ConversationView::with_history(user_id, other_user_id, history),
        Err(e) => {
            tracing::error!("Failed to load conversation history: {}", e);
            let _ = send_frame(&mut sender, &error_frame(&e)).await;
            return;
        }
    };

    let history = ServerFrame::History {
        messages: view.messages().to_vec(),
    };
    if send_frame(&mut sender, &history).await.is_err() {
        return;
    }

    let heartbeat = Duration::from_secs(state.config.websocket.heartbeat_interval_seconds.max(1));
    let mut heartbeat_timer = tokio::time::interval(heartbeat);
    heartbeat_timer.tick().await;
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        last_seen = Instant::now();

                        let frame = match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(ClientFrame::Send { content }) => {
                                match service.send_message(user_id, other_user_id, &content).await {
                                    // The live copy of this message is dropped by the view
                                    Ok(message) if view.insert(message.clone()) => Some(ServerFrame::Message { message }),
                                    Ok(_) => None,
                                    Err(e) => Some(error_frame(&e)),
                                }
                            }
                            Ok(ClientFrame::Ping) => Some(ServerFrame::Pong),
                            Err(e) => Some(ServerFrame::Error {
                                code: "INVALID_FRAME".to_string(),
                                message: e.to_string(),
                            }),
                        };

                        if let Some(frame) = frame {
                            if send_frame(&mut sender, &frame).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => {
                        last_seen = Instant::now();
                    }
                    Some(Ok(WsMessage::Binary(_))) => {}
                    Some(Ok(WsMessage::Close(_))) | None => {
                        tracing::info!(user_id = %user_id, "WebSocket connection closed by client");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(user_id = %user_id, "WebSocket error: {}", e);
                        break;
                    }
                }
            }

            Some(message) = live.next() => {
                if view.insert(message.clone())
                    && send_frame(&mut sender, &ServerFrame::Message { message }).await.is_err()
                {
                    break;
                }
            }

            _ = heartbeat_timer.tick() => {
                if last_seen.elapsed() > heartbeat * 2 {
                    tracing::warn!(user_id = %user_id, "Client not responding to heartbeat, closing connection");
                    break;
                }
                if sender.send(WsMessage::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!(user_id = %user_id, "WebSocket connection closed");
}

fn error_frame(error: &AppError) -> ServerFrame {
    ServerFrame::Error {
        code: error.error_code().to_string(),
        message: error.public_message(),
    }
}

async fn send_frame(sender: &mut WsSender, frame: &ServerFrame) -> Result<(), axum::Error> {
    match serde_json::to_string(frame) {
        Ok(text) => sender.send(WsMessage::Text(text)).await,
        Err(e) => {
            tracing::error!("Failed to serialize frame: {}", e);
            Ok(())
        }
    }
}
