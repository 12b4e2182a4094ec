//! WebSocket-Transport – `GET /socket?userId=<kennung>`
//!
//! Die Kennung kommt aus dem Query-Parameter, danach ist jede Text- oder
//! Binaer-Nachricht genau ein Ereignis im JSON-Umschlag. Ausgehende
//! Ereignisse werden als Text-Nachrichten gesendet.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use ringline_protocol::Handshake;
use tokio::sync::watch;

use crate::lifecycle::{ConnectionLifecycle, Fortsetzung};

/// Pfad des WebSocket-Endpunkts
pub const WS_PFAD: &str = "/socket";

#[derive(Clone)]
struct WsState {
    lifecycle: ConnectionLifecycle,
    shutdown_rx: watch::Receiver<bool>,
}

/// Router mit dem WebSocket-Endpunkt
pub fn ws_router(lifecycle: ConnectionLifecycle, shutdown_rx: watch::Receiver<bool>) -> Router {
    Router::new().route(WS_PFAD, get(ws_handler)).with_state(WsState {
        lifecycle,
        shutdown_rx,
    })
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(handshake): Query<Handshake>,
    State(state): State<WsState>,
) -> Response {
    let Ok(platz) = state.lifecycle.kapazitaet_pruefen() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "Server ist voll").into_response();
    };

    // Schlaegt das Upgrade fehl, wird die Closure verworfen und der Platz frei
    ws.on_upgrade(move |socket| async move {
        socket_verarbeiten(socket, handshake, state).await;
        drop(platz);
    })
}

async fn socket_verarbeiten(socket: WebSocket, handshake: Handshake, state: WsState) {
    let WsState {
        lifecycle,
        mut shutdown_rx,
    } = state;
    let (mut sender, mut receiver) = socket.split();
    let (ctx, mut sende_rx) = lifecycle.verbunden(&handshake);

    loop {
        tokio::select! {
            nachricht = receiver.next() => {
                let daten = match nachricht {
                    Some(Ok(Message::Text(text))) => text.into_bytes(),
                    Some(Ok(Message::Binary(bytes))) => bytes,
                    Some(Ok(Message::Close(_))) | None => break,
                    // Ping/Pong beantwortet axum selbst
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::warn!(verbindung = %ctx.verbindung, fehler = %e, "WebSocket-Lesefehler");
                        break;
                    }
                };
                if lifecycle.rohdaten_verarbeiten(&ctx, &daten) == Fortsetzung::Trennen {
                    break;
                }
            }

            Some(ereignis) = sende_rx.recv() => {
                let text = match ereignis.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(ereignis = ereignis.name(), fehler = %e, "Serialisierung fehlgeschlagen");
                        continue;
                    }
                };
                if let Err(e) = sender.send(Message::Text(text)).await {
                    tracing::warn!(verbindung = %ctx.verbindung, fehler = %e, "WebSocket-Senden fehlgeschlagen");
                    break;
                }
            }

            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }

    lifecycle.getrennt(&ctx);
}
