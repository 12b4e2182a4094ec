//! Verbindungs-Lebenszyklus – gemeinsam fuer TCP und WebSocket
//!
//! Beide Transporte liefern dieselben drei Ereignisse: Verbindung steht
//! (mit Handshake), Nutzlast empfangen, Verbindung weg. Die Reihenfolge
//! der Registrierung ist fest:
//!
//! 1. Send-Queue im Broadcaster anlegen
//! 2. Kennung in der Presence-Registry eintragen (verteilt die Liste,
//!    auch an die neue Verbindung selbst)
//!
//! Beim Trennen umgekehrt: erst Queue entfernen, dann Kennung abmelden.

use ringline_core::ConnectionId;
use ringline_protocol::{ClientEvent, Handshake, ServerEvent};
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit};

use crate::coordinator::ConnectionContext;
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;

/// Wie es nach einem Ereignis weitergeht
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fortsetzung {
    Weiter,
    Trennen,
}

/// Transport-unabhaengige Verbindungslogik
#[derive(Clone)]
pub struct ConnectionLifecycle {
    state: Arc<SignalingState>,
}

impl ConnectionLifecycle {
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Zugriff auf den geteilten Zustand
    pub fn state(&self) -> &Arc<SignalingState> {
        &self.state
    }

    /// Reserviert einen Verbindungsplatz beim Annehmen eines Sockets
    ///
    /// Der Platz ist belegt solange das Permit lebt. Der Verbindungs-Task
    /// haelt es vom Accept bis nach `getrennt`, also auch waehrend des
    /// Handshakes.
    pub fn kapazitaet_pruefen(&self) -> SignalingResult<OwnedSemaphorePermit> {
        Arc::clone(&self.state.verbindungs_plaetze)
            .try_acquire_owned()
            .map_err(|_| {
                tracing::warn!(
                    max = self.state.config.max_verbindungen,
                    "Server voll, Verbindung abgelehnt"
                );
                SignalingError::ServerVoll
            })
    }

    /// Verbindung steht: Queue anlegen und Kennung registrieren
    pub fn verbunden(
        &self,
        handshake: &Handshake,
    ) -> (ConnectionContext, mpsc::Receiver<ServerEvent>) {
        let ctx = ConnectionContext::neu(ConnectionId::new(), handshake.identifier().cloned());
        let rx = self.state.broadcaster.verbindung_registrieren(ctx.verbindung);

        match &ctx.user_id {
            Some(user_id) => {
                tracing::info!(user_id = %user_id, verbindung = %ctx.verbindung, "Benutzer verbunden");
                self.state.koordinator.anmelden(&ctx);
            }
            None => {
                tracing::info!(verbindung = %ctx.verbindung, "Verbindung ohne Kennung");
            }
        }
        (ctx, rx)
    }

    /// Rohe Nutzlast verarbeiten; nicht parsbare Ereignisse werden verworfen
    pub fn rohdaten_verarbeiten(&self, ctx: &ConnectionContext, daten: &[u8]) -> Fortsetzung {
        match ClientEvent::from_slice(daten) {
            Ok(ereignis) => self.ereignis_verarbeiten(ctx, ereignis),
            Err(e) => {
                tracing::warn!(
                    verbindung = %ctx.verbindung,
                    fehler = %e,
                    "Ungueltiges Ereignis ignoriert"
                );
                Fortsetzung::Weiter
            }
        }
    }

    /// Geparstes Ereignis verarbeiten
    pub fn ereignis_verarbeiten(&self, ctx: &ConnectionContext, ereignis: ClientEvent) -> Fortsetzung {
        if matches!(ereignis, ClientEvent::Disconnect) {
            tracing::debug!(verbindung = %ctx.verbindung, "Client meldet sich ab");
            return Fortsetzung::Trennen;
        }
        self.state.koordinator.verarbeiten(ctx, ereignis);
        Fortsetzung::Weiter
    }

    /// Verbindung weg: Queue entfernen, Kennung abmelden
    pub fn getrennt(&self, ctx: &ConnectionContext) {
        self.state.broadcaster.verbindung_entfernen(&ctx.verbindung);
        let abgemeldet = self.state.koordinator.abmelden(ctx);
        tracing::info!(
            user_id = ?ctx.user_id,
            verbindung = %ctx.verbindung,
            abgemeldet,
            "Verbindung getrennt"
        );
    }
}
