//! Event-Broadcaster – Sendet Ereignisse an verbundene Clients
//!
//! Der EventBroadcaster verwaltet die Send-Queues aller offenen Verbindungen,
//! auch solcher ohne Benutzer-Kennung. Zugestellt wird nicht-blockierend:
//! ist eine Queue voll oder geschlossen, wird das Ereignis verworfen.
//!
//! ## Selektives Broadcasting
//! - An eine Verbindung: `an_verbindung_senden`
//! - An alle Verbindungen: `an_alle_senden`

use dashmap::DashMap;
use ringline_core::ConnectionId;
use ringline_protocol::ServerEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Standardgroesse der Send-Queue pro Verbindung
pub const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub verbindung: ConnectionId,
    pub tx: mpsc::Sender<ServerEvent>,
}

impl ClientSender {
    /// Sendet ein Ereignis nicht-blockierend an die Verbindung
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, ereignis: ServerEvent) -> bool {
        match self.tx.try_send(ereignis) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(verworfen)) => {
                tracing::warn!(
                    verbindung = %self.verbindung,
                    ereignis = verworfen.name(),
                    "Send-Queue voll – Ereignis verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(verbindung = %self.verbindung, "Send-Queue geschlossen (Verbindung getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Broadcaster fuer alle offenen Verbindungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    /// Send-Queues, indiziert nach Verbindung
    verbindungen: DashMap<ConnectionId, ClientSender>,
    /// Kapazitaet neuer Send-Queues
    queue_groesse: usize,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster mit Standard-Queuegroesse
    pub fn neu() -> Self {
        Self::mit_queue_groesse(SEND_QUEUE_GROESSE)
    }

    /// Erstellt einen EventBroadcaster mit eigener Queuegroesse
    pub fn mit_queue_groesse(queue_groesse: usize) -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                verbindungen: DashMap::new(),
                queue_groesse: queue_groesse.max(1),
            }),
        }
    }

    /// Registriert eine Verbindung und gibt ihre Empfangs-Queue zurueck
    ///
    /// Der Verbindungs-Task liest aus dieser Queue und schreibt in den Transport.
    pub fn verbindung_registrieren(&self, verbindung: ConnectionId) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(self.inner.queue_groesse);
        self.inner
            .verbindungen
            .insert(verbindung, ClientSender { verbindung, tx });
        tracing::debug!(verbindung = %verbindung, "Verbindung im Broadcaster registriert");
        rx
    }

    /// Entfernt eine Verbindung aus dem Broadcaster
    pub fn verbindung_entfernen(&self, verbindung: &ConnectionId) {
        if self.inner.verbindungen.remove(verbindung).is_some() {
            tracing::debug!(verbindung = %verbindung, "Verbindung aus Broadcaster entfernt");
        }
    }

    /// Sendet ein Ereignis an eine einzelne Verbindung
    ///
    /// Gibt `true` zurueck wenn die Verbindung gefunden und das Ereignis eingereiht wurde.
    pub fn an_verbindung_senden(&self, verbindung: &ConnectionId, ereignis: ServerEvent) -> bool {
        match self.inner.verbindungen.get(verbindung) {
            Some(sender) => sender.senden(ereignis),
            None => {
                tracing::debug!(verbindung = %verbindung, "Senden an unbekannte Verbindung");
                false
            }
        }
    }

    /// Sendet ein Ereignis an alle offenen Verbindungen
    ///
    /// Gibt die Anzahl der erfolgreichen Sendungen zurueck.
    pub fn an_alle_senden(&self, ereignis: ServerEvent) -> usize {
        let mut gesendet = 0;
        self.inner.verbindungen.iter().for_each(|entry| {
            if entry.value().senden(ereignis.clone()) {
                gesendet += 1;
            }
        });
        gesendet
    }

    /// Gibt die Anzahl der offenen Verbindungen zurueck
    pub fn verbindungs_anzahl(&self) -> usize {
        self.inner.verbindungen.len()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn verbindung_registrieren_und_senden() {
        let broadcaster = EventBroadcaster::neu();
        let conn = ConnectionId::new();

        let mut rx = broadcaster.verbindung_registrieren(conn);
        assert_eq!(broadcaster.verbindungs_anzahl(), 1);

        assert!(broadcaster.an_verbindung_senden(&conn, ServerEvent::CallEnded));
        let empfangen = rx.try_recv().expect("Ereignis muss vorhanden sein");
        assert_eq!(empfangen, ServerEvent::CallEnded);
    }

    #[tokio::test]
    async fn an_alle_senden() {
        let broadcaster = EventBroadcaster::neu();

        let mut receivers: Vec<_> = (0..5)
            .map(|_| broadcaster.verbindung_registrieren(ConnectionId::new()))
            .collect();

        let gesendet = broadcaster.an_alle_senden(ServerEvent::online_users(vec![]));
        assert_eq!(gesendet, 5);

        for rx in &mut receivers {
            assert!(rx.try_recv().is_ok());
        }
    }

    #[test]
    fn senden_an_unbekannte_verbindung() {
        let broadcaster = EventBroadcaster::neu();
        assert!(!broadcaster.an_verbindung_senden(&ConnectionId::new(), ServerEvent::CallEnded));
    }

    #[test]
    fn volle_queue_verwirft() {
        let broadcaster = EventBroadcaster::mit_queue_groesse(1);
        let conn = ConnectionId::new();
        let _rx = broadcaster.verbindung_registrieren(conn);

        assert!(broadcaster.an_verbindung_senden(&conn, ServerEvent::CallEnded));
        assert!(!broadcaster.an_verbindung_senden(&conn, ServerEvent::CallRejected));
    }

    #[test]
    fn geschlossene_queue_verwirft() {
        let broadcaster = EventBroadcaster::neu();
        let conn = ConnectionId::new();
        drop(broadcaster.verbindung_registrieren(conn));

        assert!(!broadcaster.an_verbindung_senden(&conn, ServerEvent::CallEnded));
    }

    #[test]
    fn verbindung_entfernen() {
        let broadcaster = EventBroadcaster::neu();
        let conn = ConnectionId::new();
        let _rx = broadcaster.verbindung_registrieren(conn);
        assert_eq!(broadcaster.verbindungs_anzahl(), 1);

        broadcaster.verbindung_entfernen(&conn);
        assert!(!broadcaster.an_verbindung_senden(&conn, ServerEvent::CallEnded));
        assert_eq!(broadcaster.verbindungs_anzahl(), 0);
    }
}
