//! Gemeinsame Identifikationstypen fuer Ringline
//!
//! Beide IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Benutzer-Kennung und Verbindungs-Handle zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Anwendungsseitige Benutzer-Kennung
///
/// Opaker String, vom Client beim Verbindungsaufbau mitgeliefert. Wird
/// weder validiert noch authentifiziert (geschieht vorgelagert).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Erstellt eine UserId aus einer beliebigen Zeichenkette
    pub fn new(kennung: impl Into<String>) -> Self {
        Self(kennung.into())
    }

    /// Gibt die Kennung als &str zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Gibt den inneren String zurueck
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle auf eine einzelne Transport-Verbindung
///
/// Reiner Lookup-Schluessel. Die Verbindung selbst gehoert dem Transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_eindeutig() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b, "Zwei neue ConnectionIds muessen verschieden sein");
    }

    #[test]
    fn connection_id_display() {
        let id = ConnectionId(Uuid::nil());
        assert!(id.to_string().starts_with("conn:"));
    }

    #[test]
    fn user_id_serialisiert_als_einfacher_string() {
        let uid = UserId::from("u1");
        assert_eq!(serde_json::to_string(&uid).unwrap(), "\"u1\"");
        let zurueck: UserId = serde_json::from_str("\"u1\"").unwrap();
        assert_eq!(zurueck, uid);
    }

    #[test]
    fn user_id_display_ohne_praefix() {
        assert_eq!(UserId::new("alice").to_string(), "alice");
    }
}
