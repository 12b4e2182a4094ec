//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt Broadcaster und Koordinator als Arc-Referenzen, die sicher
//! zwischen tokio-Tasks und beiden Transporten geteilt werden.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::broadcast::{EventBroadcaster, SEND_QUEUE_GROESSE};
use crate::coordinator::CallCoordinator;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale gleichzeitige Verbindungen (beide Transporte zusammen)
    pub max_verbindungen: usize,
    /// Kapazitaet der Send-Queue pro Verbindung
    pub sende_queue_groesse: usize,
    /// Maximale Frame-Groesse fuer TCP in Bytes
    pub max_frame_groesse: usize,
    /// Frist fuer den Handshake-Frame bei TCP in Sekunden
    pub handshake_timeout_sek: u64,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_verbindungen: 1024,
            sende_queue_groesse: SEND_QUEUE_GROESSE,
            max_frame_groesse: ringline_protocol::wire::DEFAULT_MAX_FRAME_SIZE,
            handshake_timeout_sek: 10,
        }
    }
}

impl SignalingConfig {
    /// Handshake-Frist als Duration
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_sek)
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Signaling-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Event-Broadcaster (Send-Queues aller offenen Verbindungen)
    pub broadcaster: EventBroadcaster,
    /// Presence und Anrufstatus
    pub koordinator: CallCoordinator,
    /// Freie Verbindungsplaetze, ein Permit pro angenommenem Socket
    pub verbindungs_plaetze: Arc<Semaphore>,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_time: Instant,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig) -> Arc<Self> {
        let broadcaster = EventBroadcaster::mit_queue_groesse(config.sende_queue_groesse);
        let verbindungs_plaetze = Arc::new(Semaphore::new(config.max_verbindungen));
        Arc::new(Self {
            config: Arc::new(config),
            koordinator: CallCoordinator::neu(broadcaster.clone()),
            broadcaster,
            verbindungs_plaetze,
            start_time: Instant::now(),
        })
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
