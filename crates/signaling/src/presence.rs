//! Presence-Registry – Wer ist gerade erreichbar?
//!
//! Ordnet jeder Benutzer-Kennung das Handle ihrer aktuellen Verbindung zu.
//! Einzige Quelle fuer die Frage "ist dieser Benutzer erreichbar".
//!
//! Die Registry selbst ist nicht thread-safe. Sie lebt zusammen mit der
//! `CallStateTable` hinter dem Mutex des `CallCoordinator`, damit
//! Lese-dann-Schreib-Sequenzen ueber beide Tabellen atomar bleiben.

use ringline_core::{ConnectionId, UserId};
use std::collections::HashMap;

/// Zuordnung Kennung -> aktive Verbindung
///
/// Hoechstens ein Eintrag pro Kennung. Eine neue Verbindung mit derselben
/// Kennung ueberschreibt den alten Eintrag; die alte Verbindung bleibt
/// offen, ist aber nicht mehr adressierbar.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    eintraege: HashMap<UserId, ConnectionId>,
}

impl PresenceRegistry {
    /// Erstellt eine leere Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert (oder ueberschreibt) die Verbindung einer Kennung
    ///
    /// Gibt die verdraengte Verbindung zurueck, falls vorhanden.
    pub fn registrieren(&mut self, user_id: UserId, verbindung: ConnectionId) -> Option<ConnectionId> {
        self.eintraege
            .insert(user_id, verbindung)
            .filter(|alt| *alt != verbindung)
    }

    /// Entfernt die Zuordnung einer Kennung (no-op falls unbekannt)
    pub fn abmelden(&mut self, user_id: &UserId) -> Option<ConnectionId> {
        self.eintraege.remove(user_id)
    }

    /// Entfernt die Zuordnung nur, wenn sie noch auf `verbindung` zeigt
    ///
    /// Gibt `true` zurueck wenn ein Eintrag entfernt wurde.
    pub fn abmelden_wenn(&mut self, user_id: &UserId, verbindung: ConnectionId) -> bool {
        match self.eintraege.get(user_id) {
            Some(aktuell) if *aktuell == verbindung => {
                self.eintraege.remove(user_id);
                true
            }
            _ => false,
        }
    }

    /// Gibt die aktuelle Verbindung einer Kennung zurueck
    pub fn nachschlagen(&self, user_id: &UserId) -> Option<ConnectionId> {
        self.eintraege.get(user_id).copied()
    }

    /// Snapshot aller erreichbaren Kennungen, sortiert
    pub fn online_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.eintraege.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Anzahl der erreichbaren Kennungen
    pub fn online_anzahl(&self) -> usize {
        self.eintraege.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registrieren_und_nachschlagen() {
        let mut reg = PresenceRegistry::neu();
        let conn = ConnectionId::new();

        assert!(reg.registrieren(UserId::from("u1"), conn).is_none());
        assert_eq!(reg.nachschlagen(&UserId::from("u1")), Some(conn));
        assert_eq!(reg.online_anzahl(), 1);
        assert_eq!(reg.nachschlagen(&UserId::from("u2")), None);
    }

    #[test]
    fn neue_verbindung_verdraengt_alte() {
        let mut reg = PresenceRegistry::neu();
        let alt = ConnectionId::new();
        let neu = ConnectionId::new();

        reg.registrieren(UserId::from("u1"), alt);
        assert_eq!(reg.registrieren(UserId::from("u1"), neu), Some(alt));
        assert_eq!(reg.nachschlagen(&UserId::from("u1")), Some(neu));
        assert_eq!(reg.online_anzahl(), 1);
    }

    #[test]
    fn erneutes_registrieren_derselben_verbindung_verdraengt_nichts() {
        let mut reg = PresenceRegistry::neu();
        let conn = ConnectionId::new();
        reg.registrieren(UserId::from("u1"), conn);
        assert!(reg.registrieren(UserId::from("u1"), conn).is_none());
    }

    #[test]
    fn abmelden_ist_idempotent() {
        let mut reg = PresenceRegistry::neu();
        let conn = ConnectionId::new();
        reg.registrieren(UserId::from("u1"), conn);

        assert_eq!(reg.abmelden(&UserId::from("u1")), Some(conn));
        assert_eq!(reg.abmelden(&UserId::from("u1")), None);
        assert_eq!(reg.nachschlagen(&UserId::from("u1")), None);
    }

    #[test]
    fn abmelden_wenn_ignoriert_verdraengte_verbindung() {
        let mut reg = PresenceRegistry::neu();
        let alt = ConnectionId::new();
        let neu = ConnectionId::new();
        reg.registrieren(UserId::from("u1"), alt);
        reg.registrieren(UserId::from("u1"), neu);

        assert!(!reg.abmelden_wenn(&UserId::from("u1"), alt));
        assert_eq!(reg.nachschlagen(&UserId::from("u1")), Some(neu));

        assert!(reg.abmelden_wenn(&UserId::from("u1"), neu));
        assert_eq!(reg.nachschlagen(&UserId::from("u1")), None);
    }

    #[test]
    fn nachschlagen_liefert_immer_die_letzte_registrierung() {
        let mut reg = PresenceRegistry::neu();
        let uid = UserId::from("u1");
        let mut letzte = None;

        for runde in 0..20 {
            if runde % 3 == 2 {
                reg.abmelden(&uid);
                letzte = None;
            } else {
                let conn = ConnectionId::new();
                reg.registrieren(uid.clone(), conn);
                letzte = Some(conn);
            }
            assert_eq!(reg.nachschlagen(&uid), letzte);
        }
    }

    #[test]
    fn online_ids_sortiert() {
        let mut reg = PresenceRegistry::neu();
        for name in ["carol", "alice", "bob"] {
            reg.registrieren(UserId::from(name), ConnectionId::new());
        }
        let namen: Vec<String> = reg.online_ids().into_iter().map(UserId::into_inner).collect();
        assert_eq!(namen, ["alice", "bob", "carol"]);
    }
}
