//! ringline-signaling – Presence und Anruf-Koordination
//!
//! Dieser Crate implementiert das Signaling-Relay fuer Ringline. Er weiss
//! wer erreichbar ist, wer gerade telefoniert, und leitet die Ereignisse
//! des Verbindungsaufbaus (Offer/Answer, ICE-Kandidaten, Ablehnung,
//! Auflegen) an die Gegenstelle weiter. Medien laufen nie ueber das Relay.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)      WebSocket (ws_router, GET /socket)
//!     |  ClientConnection pro Task        |  ein Task pro Socket
//!     +---------------+-------------------+
//!                     v
//!            ConnectionLifecycle  (Handshake, Parsen, Trennen)
//!                     |
//!                     v
//!             CallCoordinator
//!                 +-- PresenceRegistry  (Kennung -> Verbindung)
//!                 +-- CallStateTable    (Kennung -> im Anruf)
//!                     |
//!                     v
//!             EventBroadcaster (Send-Queue pro Verbindung)
//! ```

pub mod broadcast;
pub mod call_state;
pub mod connection;
pub mod coordinator;
pub mod error;
pub mod lifecycle;
pub mod presence;
pub mod server_state;
pub mod tcp;
pub mod ws;

// Bequeme Re-Exporte
pub use broadcast::EventBroadcaster;
pub use call_state::CallStateTable;
pub use connection::ClientConnection;
pub use coordinator::{CallCoordinator, ConnectionContext};
pub use error::{SignalingError, SignalingResult};
pub use lifecycle::{ConnectionLifecycle, Fortsetzung};
pub use presence::PresenceRegistry;
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::SignalingServer;
pub use ws::ws_router;
