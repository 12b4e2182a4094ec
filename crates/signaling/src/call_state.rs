//! Anrufstatus – Wer telefoniert gerade?
//!
//! Ein Flag pro Kennung, kein Sitzungsobjekt. Zwei aufeinanderfolgende
//! Anrufe derselben Kennung sind nicht unterscheidbar.

use ringline_core::UserId;
use std::collections::HashMap;

/// Zuordnung Kennung -> "im Anruf"
///
/// Unbekannte Kennungen gelten als nicht im Anruf. Das Flag wird nicht
/// gegen die Presence-Registry geprueft.
#[derive(Debug, Default)]
pub struct CallStateTable {
    flags: HashMap<UserId, bool>,
}

impl CallStateTable {
    /// Erstellt eine leere Tabelle
    pub fn neu() -> Self {
        Self::default()
    }

    /// Setzt das Flag einer Kennung
    pub fn im_anruf_setzen(&mut self, user_id: UserId, wert: bool) {
        self.flags.insert(user_id, wert);
    }

    /// Gibt das Flag zurueck, `false` fuer unbekannte Kennungen
    pub fn ist_im_anruf(&self, user_id: &UserId) -> bool {
        self.flags.get(user_id).copied().unwrap_or(false)
    }

    /// Entfernt den Eintrag vollstaendig (beim Trennen)
    pub fn entfernen(&mut self, user_id: &UserId) {
        self.flags.remove(user_id);
    }

    /// Anzahl der Kennungen mit gesetztem Flag
    pub fn aktive_anzahl(&self) -> usize {
        self.flags.values().filter(|im_anruf| **im_anruf).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbekannt_ist_nicht_im_anruf() {
        let table = CallStateTable::neu();
        assert!(!table.ist_im_anruf(&UserId::from("niemand")));
    }

    #[test]
    fn setzen_und_zuruecksetzen() {
        let mut table = CallStateTable::neu();
        let uid = UserId::from("u1");

        table.im_anruf_setzen(uid.clone(), true);
        assert!(table.ist_im_anruf(&uid));
        assert_eq!(table.aktive_anzahl(), 1);

        table.im_anruf_setzen(uid.clone(), false);
        assert!(!table.ist_im_anruf(&uid));
        assert_eq!(table.aktive_anzahl(), 0);
    }

    #[test]
    fn entfernen_loescht_gesetztes_flag() {
        let mut table = CallStateTable::neu();
        let uid = UserId::from("u1");
        table.im_anruf_setzen(uid.clone(), true);

        table.entfernen(&uid);
        assert!(!table.ist_im_anruf(&uid));
        // zweites Entfernen ist ein no-op
        table.entfernen(&uid);
    }
}
