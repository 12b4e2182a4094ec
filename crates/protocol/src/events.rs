//! Signaling-Ereignisse
//!
//! Definiert alle Ereignisse die zwischen Client und Relay ausgetauscht
//! werden, sowie den Handshake beim Verbindungsaufbau.
//!
//! ## Design
//! - Umschlag `{"event": <name>, "data": <payload>}`, `data` entfaellt bei
//!   Ereignissen ohne Nutzlast
//! - Feldnamen in camelCase
//! - Signaling-Payloads, Call-Typ und ICE-Kandidaten sind opake JSON-Werte,
//!   das Relay reicht sie unveraendert durch

use ringline_core::UserId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// Handshake beim Verbindungsaufbau
///
/// Bei WebSocket-Verbindungen kommt die Kennung aus dem Query-Parameter
/// `userId`, bei TCP aus dem ersten Frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl Handshake {
    /// Handshake mit Benutzer-Kennung
    pub fn with_user(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    /// Handshake ohne Kennung
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Gibt die Kennung zurueck, leere Kennungen zaehlen als fehlend
    pub fn identifier(&self) -> Option<&UserId> {
        self.user_id.as_ref().filter(|id| !id.as_str().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Client -> Relay
// ---------------------------------------------------------------------------

/// Anruf starten
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallUserRequest {
    pub receiver_id: UserId,
    #[serde(default, alias = "signalingPayload")]
    pub signal_data: Value,
    #[serde(default)]
    pub call_type: Value,
}

/// Anruf annehmen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerCallRequest {
    pub to: UserId,
    #[serde(default, alias = "signalingPayload")]
    pub signal_data: Value,
}

/// ICE-Kandidat an die Gegenstelle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceCandidateRequest {
    pub to: UserId,
    #[serde(default)]
    pub candidate: Value,
}

/// Ereignis das nur ein Ziel benennt (Ablehnen, Beenden, Besetzt)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRequest {
    pub to: UserId,
}

/// Alle Ereignisse die ein Client senden kann
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    CallUser(CallUserRequest),
    AnswerCall(AnswerCallRequest),
    RejectCall(TargetRequest),
    IceCandidate(IceCandidateRequest),
    EndCall(TargetRequest),
    Busy(TargetRequest),
    /// Client trennt die Verbindung aktiv
    Disconnect,
}

impl ClientEvent {
    /// Ereignisname wie auf dem Draht
    pub fn name(&self) -> &'static str {
        match self {
            Self::CallUser(_) => "callUser",
            Self::AnswerCall(_) => "answerCall",
            Self::RejectCall(_) => "rejectCall",
            Self::IceCandidate(_) => "iceCandidate",
            Self::EndCall(_) => "endCall",
            Self::Busy(_) => "busy",
            Self::Disconnect => "disconnect",
        }
    }

    /// Deserialisiert ein Ereignis aus JSON-Bytes
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Serialisiert das Ereignis als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Relay -> Client
// ---------------------------------------------------------------------------

/// Eingehender Anruf beim Angerufenen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingCall {
    pub signal_data: Value,
    pub from: UserId,
    pub call_type: Value,
}

/// Antwort des Angerufenen an den Anrufer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAccepted {
    pub signal_data: Value,
}

/// Weitergeleiteter ICE-Kandidat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceCandidateRelay {
    pub candidate: Value,
}

/// Besetzt-Hinweis, die Nachricht ist optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyNotice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Nutzlast aller `*Failed`-Ereignisse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureMessage {
    pub message: String,
}

/// Alle Ereignisse die das Relay an Clients sendet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Aktuelle Liste aller erreichbaren Kennungen (an alle)
    GetOnlineUsers(Vec<UserId>),
    IncomingCall(IncomingCall),
    CallAccepted(CallAccepted),
    CallRejected,
    IceCandidate(IceCandidateRelay),
    CallEnded,
    UserBusy(BusyNotice),

    // Fehlschlaege, gehen nur an den Absender
    CallFailed(FailureMessage),
    CallAnswerFailed(FailureMessage),
    CallRejectFailed(FailureMessage),
    IceCandidateFailed(FailureMessage),
    BusyFailed(FailureMessage),
}

impl ServerEvent {
    /// Erstellt die Presence-Liste
    pub fn online_users(ids: Vec<UserId>) -> Self {
        Self::GetOnlineUsers(ids)
    }

    /// Besetzt ohne Nachricht (Ziel ist bereits im Anruf)
    pub fn user_busy() -> Self {
        Self::UserBusy(BusyNotice::default())
    }

    /// Besetzt mit Nachricht (Gegenstelle meldet aktiv "besetzt")
    pub fn user_busy_with(message: impl Into<String>) -> Self {
        Self::UserBusy(BusyNotice {
            message: Some(message.into()),
        })
    }

    pub fn call_failed(message: impl Into<String>) -> Self {
        Self::CallFailed(FailureMessage {
            message: message.into(),
        })
    }

    pub fn call_answer_failed(message: impl Into<String>) -> Self {
        Self::CallAnswerFailed(FailureMessage {
            message: message.into(),
        })
    }

    pub fn call_reject_failed(message: impl Into<String>) -> Self {
        Self::CallRejectFailed(FailureMessage {
            message: message.into(),
        })
    }

    pub fn ice_candidate_failed(message: impl Into<String>) -> Self {
        Self::IceCandidateFailed(FailureMessage {
            message: message.into(),
        })
    }

    pub fn busy_failed(message: impl Into<String>) -> Self {
        Self::BusyFailed(FailureMessage {
            message: message.into(),
        })
    }

    /// Ereignisname wie auf dem Draht
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetOnlineUsers(_) => "getOnlineUsers",
            Self::IncomingCall(_) => "incomingCall",
            Self::CallAccepted(_) => "callAccepted",
            Self::CallRejected => "callRejected",
            Self::IceCandidate(_) => "iceCandidate",
            Self::CallEnded => "callEnded",
            Self::UserBusy(_) => "userBusy",
            Self::CallFailed(_) => "callFailed",
            Self::CallAnswerFailed(_) => "callAnswerFailed",
            Self::CallRejectFailed(_) => "callRejectFailed",
            Self::IceCandidateFailed(_) => "iceCandidateFailed",
            Self::BusyFailed(_) => "busyFailed",
        }
    }

    /// Gibt true zurueck fuer die `*Failed`-Ereignisse
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::CallFailed(_)
                | Self::CallAnswerFailed(_)
                | Self::CallRejectFailed(_)
                | Self::IceCandidateFailed(_)
                | Self::BusyFailed(_)
        )
    }

    /// Serialisiert das Ereignis als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert ein Ereignis aus JSON-Bytes
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: Value) -> serde_json::Result<ClientEvent> {
        ClientEvent::from_slice(v.to_string().as_bytes())
    }

    #[test]
    fn call_user_aus_draht_format() {
        let event = parse(json!({
            "event": "callUser",
            "data": {
                "receiverId": "u2",
                "signalData": {"type": "offer", "sdp": "v=0"},
                "callType": "video"
            }
        }))
        .unwrap();

        match event {
            ClientEvent::CallUser(req) => {
                assert_eq!(req.receiver_id, UserId::from("u2"));
                assert_eq!(req.signal_data["type"], "offer");
                assert_eq!(req.call_type, json!("video"));
            }
            anders => panic!("Erwartet CallUser, erhalten {anders:?}"),
        }
    }

    #[test]
    fn signaling_payload_als_alias() {
        let event = parse(json!({
            "event": "answerCall",
            "data": {"to": "u1", "signalingPayload": {"sdp": "x"}}
        }))
        .unwrap();
        let ClientEvent::AnswerCall(req) = event else {
            panic!("Erwartet AnswerCall");
        };
        assert_eq!(req.signal_data, json!({"sdp": "x"}));
    }

    #[test]
    fn fehlende_opake_felder_werden_null() {
        let event = parse(json!({"event": "callUser", "data": {"receiverId": "u2"}})).unwrap();
        let ClientEvent::CallUser(req) = event else {
            panic!("Erwartet CallUser");
        };
        assert!(req.signal_data.is_null());
        assert!(req.call_type.is_null());
    }

    #[test]
    fn fehlendes_ziel_ist_fehler() {
        assert!(parse(json!({"event": "rejectCall", "data": {}})).is_err());
        assert!(parse(json!({"event": "callUser", "data": {"signalData": 1}})).is_err());
        assert!(parse(json!({"event": "endCall"})).is_err());
    }

    #[test]
    fn unbekanntes_ereignis_ist_fehler() {
        assert!(parse(json!({"event": "hangUpEverything", "data": {"to": "u1"}})).is_err());
        assert!(ClientEvent::from_slice(b"kein json").is_err());
    }

    #[test]
    fn disconnect_ohne_daten() {
        let event = parse(json!({"event": "disconnect"})).unwrap();
        assert_eq!(event, ClientEvent::Disconnect);
        assert_eq!(event.name(), "disconnect");
    }

    #[test]
    fn ereignisse_ohne_nutzlast_haben_kein_data_feld() {
        let json: Value = serde_json::from_str(&ServerEvent::CallEnded.to_json().unwrap()).unwrap();
        assert_eq!(json, json!({"event": "callEnded"}));

        let json: Value =
            serde_json::from_str(&ServerEvent::CallRejected.to_json().unwrap()).unwrap();
        assert_eq!(json, json!({"event": "callRejected"}));
    }

    #[test]
    fn incoming_call_draht_format() {
        let event = ServerEvent::IncomingCall(IncomingCall {
            signal_data: json!({"sdp": "offer"}),
            from: UserId::from("u1"),
            call_type: json!("video"),
        });
        let json: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            json!({
                "event": "incomingCall",
                "data": {"signalData": {"sdp": "offer"}, "from": "u1", "callType": "video"}
            })
        );
    }

    #[test]
    fn online_users_als_liste() {
        let event = ServerEvent::online_users(vec![UserId::from("a"), UserId::from("b")]);
        let json: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json, json!({"event": "getOnlineUsers", "data": ["a", "b"]}));
    }

    #[test]
    fn user_busy_nachricht_optional() {
        let ohne: Value = serde_json::from_str(&ServerEvent::user_busy().to_json().unwrap()).unwrap();
        assert_eq!(ohne, json!({"event": "userBusy", "data": {}}));

        let mit: Value = serde_json::from_str(
            &ServerEvent::user_busy_with("User is busy.").to_json().unwrap(),
        )
        .unwrap();
        assert_eq!(mit["data"]["message"], "User is busy.");
    }

    #[test]
    fn fehler_ereignisse_tragen_nachricht() {
        let event = ServerEvent::ice_candidate_failed("User not available.");
        assert!(event.is_failure());
        assert_eq!(event.name(), "iceCandidateFailed");
        let json: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["data"]["message"], "User not available.");
        assert!(!ServerEvent::CallEnded.is_failure());
    }

    #[test]
    fn handshake_leere_kennung_zaehlt_als_fehlend() {
        let hs: Handshake = serde_json::from_str(r#"{"userId": ""}"#).unwrap();
        assert!(hs.identifier().is_none());

        let hs: Handshake = serde_json::from_str("{}").unwrap();
        assert_eq!(hs, Handshake::anonymous());

        let hs: Handshake = serde_json::from_str(r#"{"userId": "u7"}"#).unwrap();
        assert_eq!(hs.identifier(), Some(&UserId::from("u7")));
    }
}
