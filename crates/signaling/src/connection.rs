//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task.
//!
//! ## Ablauf
//! ```text
//! Handshake-Frame {"userId": ..} -> Registrierung -> Ereignis-Schleife -> Abmeldung
//! ```
//!
//! Die Schleife wartet gleichzeitig auf eingehende Frames, auf Ereignisse
//! aus der eigenen Send-Queue und auf das Shutdown-Signal.

use futures_util::{SinkExt, StreamExt};
use ringline_protocol::{wire::FrameCodec, Handshake};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::Framed;

use crate::error::{SignalingError, SignalingResult};
use crate::lifecycle::{ConnectionLifecycle, Fortsetzung};

/// Verarbeitet eine einzelne TCP-Verbindung
pub struct ClientConnection {
    lifecycle: ConnectionLifecycle,
    peer_addr: SocketAddr,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(lifecycle: ConnectionLifecycle, peer_addr: SocketAddr) -> Self {
        Self {
            lifecycle,
            peer_addr,
        }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung getrennt wird oder ein Shutdown-Signal
    /// eingeht. Presence wird in jedem Fall wieder abgemeldet.
    pub async fn verarbeiten(self, stream: TcpStream, mut shutdown_rx: watch::Receiver<bool>) {
        let peer_addr = self.peer_addr;
        let config = self.lifecycle.state().config.clone();

        tracing::debug!(peer = %peer_addr, "Neue TCP-Verbindung");

        let mut framed = Framed::new(stream, FrameCodec::with_max_size(config.max_frame_groesse));

        let handshake =
            match tokio::time::timeout(config.handshake_timeout(), handshake_lesen(&mut framed))
                .await
            {
                Ok(Ok(hs)) => hs,
                Ok(Err(e)) => {
                    tracing::warn!(peer = %peer_addr, fehler = %e, "Handshake fehlgeschlagen");
                    return;
                }
                Err(_) => {
                    let fehler = SignalingError::Timeout;
                    tracing::warn!(peer = %peer_addr, fehler = %fehler, "Kein Handshake");
                    return;
                }
            };

        let (ctx, mut sende_rx) = self.lifecycle.verbunden(&handshake);

        loop {
            tokio::select! {
                // Eingehendes Ereignis vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(daten)) => {
                            if self.lifecycle.rohdaten_verarbeiten(&ctx, &daten) == Fortsetzung::Trennen {
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(peer = %peer_addr, fehler = %e, "Frame-Lesefehler");
                            break;
                        }
                        None => {
                            tracing::debug!(peer = %peer_addr, "Verbindung vom Client geschlossen");
                            break;
                        }
                    }
                }

                // Ausgehendes Ereignis aus der Send-Queue
                Some(ereignis) = sende_rx.recv() => {
                    if let Err(e) = framed.send(&ereignis).await {
                        tracing::warn!(
                            peer = %peer_addr,
                            ereignis = ereignis.name(),
                            fehler = %e,
                            "Senden fehlgeschlagen"
                        );
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::debug!(peer = %peer_addr, "Shutdown, Verbindung wird geschlossen");
                        break;
                    }
                }
            }
        }

        self.lifecycle.getrennt(&ctx);
    }
}

/// Liest den ersten Frame als Handshake
async fn handshake_lesen(framed: &mut Framed<TcpStream, FrameCodec>) -> SignalingResult<Handshake> {
    match framed.next().await {
        Some(Ok(daten)) => {
            let handshake: Handshake = serde_json::from_slice(&daten)
                .map_err(ringline_protocol::ProtocolError::from)?;
            Ok(handshake)
        }
        Some(Err(e)) => Err(e.into()),
        None => Err(SignalingError::VerbindungGetrennt),
    }
}
