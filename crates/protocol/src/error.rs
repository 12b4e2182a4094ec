//! Fehlertypen fuer Protokoll und Wire-Format

use thiserror::Error;

/// Fehler beim Lesen, Schreiben oder Parsen von Ereignissen
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// IO-Fehler der darunterliegenden Verbindung
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Frame ueberschreitet die konfigurierte Maximalgroesse
    #[error("Frame zu gross: {groesse} Bytes (Maximum: {maximum} Bytes)")]
    FrameZuGross { groesse: usize, maximum: usize },

    /// Ungueltiges JSON, unbekanntes Ereignis oder fehlendes Pflichtfeld
    #[error("Ungueltiges Ereignis: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Gibt true zurueck wenn die Verbindung nach dem Fehler weiterlaufen kann
    ///
    /// Nur fehlerhafte Ereignisse sind harmlos; IO- und Frame-Fehler
    /// lassen den Stream in einem unbekannten Zustand zurueck.
    pub fn ist_ignorierbar(&self) -> bool {
        matches!(self, Self::Json(_))
    }
}
