//! Anruf-Koordinator – Zustandsmaschine des Signalings
//!
//! Nimmt eingehende Ereignisse einer Verbindung entgegen, prueft sie gegen
//! Presence-Registry und Anrufstatus und leitet Ereignisse an die
//! Zielverbindung weiter.
//!
//! ## Zustandsmaschine (pro Kennung, abgeleitet aus den Flags)
//! ```text
//! Idle --callUser--> Ringing --answerCall--> Active
//!   ^                   |                      |
//!   +--- rejectCall ----+                      |
//!   +--- endCall / disconnect -----------------+
//! ```
//!
//! ## Weiterleitung
//! Jedes Routing-Ereignis hat dieselbe Form: Ziel aufloesen, bei Erfolg
//! an das Ziel senden, sonst ein `<Verb>Failed` an den Absender. Ein nicht
//! erreichbares Ziel ist nie ein Fehler fuer den Rest des Systems.
//!
//! ## Nebenlaeufigkeit
//! Registry und Anrufstatus liegen gemeinsam hinter EINEM Mutex. Jede
//! Operation haelt ihn fuer ihre gesamte Lese-dann-Schreib-Sequenz, auch
//! waehrend die Ereignisse eingereiht werden (`try_send`, blockiert nie).

use parking_lot::Mutex;
use ringline_core::{ConnectionId, UserId};
use ringline_protocol::events::{
    AnswerCallRequest, CallAccepted, CallUserRequest, IceCandidateRelay, IceCandidateRequest,
    IncomingCall, TargetRequest,
};
use ringline_protocol::{ClientEvent, ServerEvent};

use crate::broadcast::EventBroadcaster;
use crate::call_state::CallStateTable;
use crate::presence::PresenceRegistry;

// ---------------------------------------------------------------------------
// Verbindungskontext
// ---------------------------------------------------------------------------

/// Informationen ueber die Verbindung, von der ein Ereignis stammt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionContext {
    /// Handle der Verbindung
    pub verbindung: ConnectionId,
    /// Kennung aus dem Handshake (None wenn anonym)
    pub user_id: Option<UserId>,
}

impl ConnectionContext {
    pub fn neu(verbindung: ConnectionId, user_id: Option<UserId>) -> Self {
        Self { verbindung, user_id }
    }
}

// ---------------------------------------------------------------------------
// Weiterleitungs-Verben
// ---------------------------------------------------------------------------

/// Ereignisse die an ein aufloesbares Ziel gebunden sind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Anruf,
    Antwort,
    Ablehnung,
    Kandidat,
    Besetzt,
}

impl Verb {
    /// Das Ereignis an den Absender, wenn das Ziel nicht erreichbar ist
    fn fehlschlag(self) -> ServerEvent {
        match self {
            Self::Anruf => ServerEvent::call_failed("User is not available."),
            Self::Antwort => ServerEvent::call_answer_failed("Call recipient not found."),
            Self::Ablehnung => ServerEvent::call_reject_failed("Call recipient not found."),
            Self::Kandidat => ServerEvent::ice_candidate_failed("User not available."),
            Self::Besetzt => ServerEvent::busy_failed("User not available."),
        }
    }
}

/// Nachricht an anonyme Anrufer
const ANRUFER_UNBEKANNT: &str = "Caller is not identified.";

/// Nachricht im `userBusy` des `busy`-Ereignisses
const BESETZT_NACHRICHT: &str = "User is busy.";

// ---------------------------------------------------------------------------
// CallCoordinator
// ---------------------------------------------------------------------------

/// Geteilter Zustand hinter dem Koordinator-Mutex
#[derive(Debug, Default)]
struct Tabellen {
    presence: PresenceRegistry,
    anrufe: CallStateTable,
}

/// Koordiniert Presence und Anrufablauf aller Verbindungen
pub struct CallCoordinator {
    tabellen: Mutex<Tabellen>,
    broadcaster: EventBroadcaster,
}

impl CallCoordinator {
    /// Erstellt einen neuen Koordinator, der ueber `broadcaster` zustellt
    pub fn neu(broadcaster: EventBroadcaster) -> Self {
        Self {
            tabellen: Mutex::new(Tabellen::default()),
            broadcaster,
        }
    }

    // -----------------------------------------------------------------------
    // Verbindungs-Lebenszyklus
    // -----------------------------------------------------------------------

    /// Registriert die Kennung einer neuen Verbindung
    ///
    /// Setzt den Anrufstatus zurueck und verteilt die neue Presence-Liste.
    /// Anonyme Verbindungen werden ignoriert.
    pub fn anmelden(&self, ctx: &ConnectionContext) {
        let Some(user_id) = &ctx.user_id else {
            return;
        };

        let mut tabellen = self.tabellen.lock();
        if let Some(verdraengt) = tabellen.presence.registrieren(user_id.clone(), ctx.verbindung) {
            tracing::info!(
                user_id = %user_id,
                alt = %verdraengt,
                neu = %ctx.verbindung,
                "Kennung auf neue Verbindung umgezogen, alte Verbindung bleibt offen"
            );
        }
        tabellen.anrufe.im_anruf_setzen(user_id.clone(), false);
        self.presence_verteilen(&tabellen);
    }

    /// Entfernt die Kennung einer getrennten Verbindung
    ///
    /// Nur wenn die Kennung noch auf diese Verbindung zeigt. Bewusste
    /// Abweichung vom bedingungslosen Loeschen: eine verdraengte Verbindung
    /// raeumt Eintrag und Anrufstatus ihres Nachfolgers nicht ab, der
    /// Nachfolger bleibt erreichbar.
    /// Gibt `true` zurueck wenn Presence und Anrufstatus bereinigt wurden.
    pub fn abmelden(&self, ctx: &ConnectionContext) -> bool {
        let Some(user_id) = &ctx.user_id else {
            return false;
        };

        let mut tabellen = self.tabellen.lock();
        if !tabellen.presence.abmelden_wenn(user_id, ctx.verbindung) {
            tracing::debug!(
                user_id = %user_id,
                verbindung = %ctx.verbindung,
                "Verdraengte Verbindung getrennt, Eintrag bleibt"
            );
            return false;
        }
        tabellen.anrufe.entfernen(user_id);
        self.presence_verteilen(&tabellen);
        true
    }

    // -----------------------------------------------------------------------
    // Ereignis-Dispatch
    // -----------------------------------------------------------------------

    /// Verarbeitet ein eingehendes Ereignis einer Verbindung
    ///
    /// `disconnect` wird vom Transport behandelt und hier ignoriert.
    pub fn verarbeiten(&self, ctx: &ConnectionContext, ereignis: ClientEvent) {
        tracing::trace!(
            verbindung = %ctx.verbindung,
            ereignis = ereignis.name(),
            "Ereignis empfangen"
        );

        match ereignis {
            ClientEvent::CallUser(req) => self.anrufen(ctx, req),
            ClientEvent::AnswerCall(req) => self.annehmen(ctx, req),
            ClientEvent::RejectCall(req) => self.ablehnen(ctx, req),
            ClientEvent::IceCandidate(req) => self.kandidat_weiterleiten(ctx, req),
            ClientEvent::EndCall(req) => self.beenden(ctx, req),
            ClientEvent::Busy(req) => self.besetzt_melden(ctx, req),
            ClientEvent::Disconnect => {}
        }
    }

    /// `callUser`: Anruf starten
    pub fn anrufen(&self, ctx: &ConnectionContext, req: CallUserRequest) {
        let Some(anrufer) = ctx.user_id.clone() else {
            tracing::warn!(verbindung = %ctx.verbindung, "Anruf von Verbindung ohne Kennung");
            self.an_absender(ctx, ServerEvent::call_failed(ANRUFER_UNBEKANNT));
            return;
        };

        let mut tabellen = self.tabellen.lock();
        let Some(ziel) = tabellen.presence.nachschlagen(&req.receiver_id) else {
            self.an_absender(ctx, Verb::Anruf.fehlschlag());
            tracing::debug!(von = %anrufer, an = %req.receiver_id, "Anrufziel nicht erreichbar");
            return;
        };

        if tabellen.anrufe.ist_im_anruf(&req.receiver_id) {
            self.an_absender(ctx, ServerEvent::user_busy());
            tracing::info!(von = %anrufer, an = %req.receiver_id, "Ziel besetzt");
            return;
        }

        tabellen.anrufe.im_anruf_setzen(anrufer.clone(), true);
        tabellen.anrufe.im_anruf_setzen(req.receiver_id.clone(), true);

        tracing::info!(von = %anrufer, an = %req.receiver_id, "Anruf gestartet");
        self.broadcaster.an_verbindung_senden(
            &ziel,
            ServerEvent::IncomingCall(IncomingCall {
                signal_data: req.signal_data,
                from: anrufer,
                call_type: req.call_type,
            }),
        );
    }

    /// `answerCall`: Antwort an den Anrufer weiterleiten
    pub fn annehmen(&self, ctx: &ConnectionContext, req: AnswerCallRequest) {
        let tabellen = self.tabellen.lock();
        let ereignis = ServerEvent::CallAccepted(CallAccepted {
            signal_data: req.signal_data,
        });
        if self.weiterleiten(&tabellen, ctx, Verb::Antwort, &req.to, ereignis) {
            tracing::info!(von = ?ctx.user_id, an = %req.to, "Anruf angenommen");
        }
    }

    /// `rejectCall`: Ablehnung weiterleiten, beide Flags zuruecksetzen
    pub fn ablehnen(&self, ctx: &ConnectionContext, req: TargetRequest) {
        let mut tabellen = self.tabellen.lock();
        if !self.weiterleiten(&tabellen, ctx, Verb::Ablehnung, &req.to, ServerEvent::CallRejected)
        {
            return;
        }

        tabellen.anrufe.im_anruf_setzen(req.to.clone(), false);
        if let Some(absender) = &ctx.user_id {
            tabellen.anrufe.im_anruf_setzen(absender.clone(), false);
        }
        tracing::info!(von = ?ctx.user_id, an = %req.to, "Anruf abgelehnt");
    }

    /// `iceCandidate`: Kandidat an die Gegenstelle weiterleiten
    pub fn kandidat_weiterleiten(&self, ctx: &ConnectionContext, req: IceCandidateRequest) {
        let tabellen = self.tabellen.lock();
        let ereignis = ServerEvent::IceCandidate(IceCandidateRelay {
            candidate: req.candidate,
        });
        if self.weiterleiten(&tabellen, ctx, Verb::Kandidat, &req.to, ereignis) {
            tracing::debug!(von = ?ctx.user_id, an = %req.to, "ICE-Kandidat weitergeleitet");
        }
    }

    /// `endCall`: beide Seiten benachrichtigen, beide Flags zuruecksetzen
    ///
    /// Best-effort: der Absender bekommt `callEnded` auch wenn das Ziel
    /// nicht erreichbar ist.
    pub fn beenden(&self, ctx: &ConnectionContext, req: TargetRequest) {
        let mut tabellen = self.tabellen.lock();
        if let Some(ziel) = tabellen.presence.nachschlagen(&req.to) {
            self.broadcaster
                .an_verbindung_senden(&ziel, ServerEvent::CallEnded);
        }
        self.an_absender(ctx, ServerEvent::CallEnded);

        tabellen.anrufe.im_anruf_setzen(req.to.clone(), false);
        if let Some(absender) = &ctx.user_id {
            tabellen.anrufe.im_anruf_setzen(absender.clone(), false);
        }
        tracing::info!(von = ?ctx.user_id, an = %req.to, "Anruf beendet");
    }

    /// `busy`: der Angerufene meldet dem Anrufer "besetzt"
    pub fn besetzt_melden(&self, ctx: &ConnectionContext, req: TargetRequest) {
        let tabellen = self.tabellen.lock();
        let ereignis = ServerEvent::user_busy_with(BESETZT_NACHRICHT);
        if self.weiterleiten(&tabellen, ctx, Verb::Besetzt, &req.to, ereignis) {
            tracing::info!(von = ?ctx.user_id, an = %req.to, "Besetzt gemeldet");
        }
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    /// Snapshot aller erreichbaren Kennungen, sortiert
    pub fn online_ids(&self) -> Vec<UserId> {
        self.tabellen.lock().presence.online_ids()
    }

    /// Anzahl der erreichbaren Kennungen
    pub fn online_anzahl(&self) -> usize {
        self.tabellen.lock().presence.online_anzahl()
    }

    /// Aktuelle Verbindung einer Kennung
    pub fn verbindung_von(&self, user_id: &UserId) -> Option<ConnectionId> {
        self.tabellen.lock().presence.nachschlagen(user_id)
    }

    /// Anrufstatus einer Kennung
    pub fn ist_im_anruf(&self, user_id: &UserId) -> bool {
        self.tabellen.lock().anrufe.ist_im_anruf(user_id)
    }

    /// Anzahl der Kennungen, die gerade im Anruf sind
    pub fn anrufe_aktiv(&self) -> usize {
        self.tabellen.lock().anrufe.aktive_anzahl()
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    /// Ziel aufloesen und zustellen, sonst Fehlschlag an den Absender
    ///
    /// Gibt `true` zurueck wenn das Ziel erreichbar war.
    fn weiterleiten(
        &self,
        tabellen: &Tabellen,
        ctx: &ConnectionContext,
        verb: Verb,
        ziel: &UserId,
        ereignis: ServerEvent,
    ) -> bool {
        match tabellen.presence.nachschlagen(ziel) {
            Some(verbindung) => {
                self.broadcaster.an_verbindung_senden(&verbindung, ereignis);
                true
            }
            None => {
                tracing::debug!(von = ?ctx.user_id, an = %ziel, "Ziel nicht erreichbar");
                self.an_absender(ctx, verb.fehlschlag());
                false
            }
        }
    }

    /// Antwort an die Verbindung, von der das Ereignis kam
    ///
    /// Fehlschlaege werden auf `info` protokolliert, alles andere auf `debug`.
    fn an_absender(&self, ctx: &ConnectionContext, ereignis: ServerEvent) {
        if ereignis.is_failure() {
            tracing::info!(
                user_id = ?ctx.user_id,
                verbindung = %ctx.verbindung,
                ereignis = ereignis.name(),
                "Fehlschlag an Absender"
            );
        } else {
            tracing::debug!(
                verbindung = %ctx.verbindung,
                ereignis = ereignis.name(),
                "Antwort an Absender"
            );
        }
        self.broadcaster.an_verbindung_senden(&ctx.verbindung, ereignis);
    }

    /// Aktuelle Presence-Liste an alle offenen Verbindungen
    fn presence_verteilen(&self, tabellen: &Tabellen) {
        let ids = tabellen.presence.online_ids();
        tracing::debug!(online = ids.len(), "Presence-Liste wird verteilt");
        self.broadcaster.an_alle_senden(ServerEvent::online_users(ids));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
