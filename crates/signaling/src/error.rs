//! Fehlertypen fuer den Signaling-Service

use ringline_protocol::ProtocolError;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
///
/// Betrifft immer nur eine einzelne Verbindung. Fehler im Anrufablauf
/// (Ziel nicht erreichbar, besetzt) sind keine Fehler, sondern Ereignisse
/// an den Absender.
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Protokollfehler (ungueltiges Frame, ungueltiges JSON)
    #[error("Protokollfehler: {0}")]
    Protokoll(#[from] ProtocolError),

    /// Verbindung wurde vor Abschluss des Handshakes getrennt
    #[error("Verbindung getrennt")]
    VerbindungGetrennt,

    /// Kein Handshake innerhalb der Frist
    #[error("Timeout")]
    Timeout,

    /// Server hat die maximale Anzahl Verbindungen erreicht
    #[error("Server ist voll")]
    ServerVoll,
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
