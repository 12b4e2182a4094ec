//! ringline-protocol – Ereignis- und Wire-Format-Definitionen
//!
//! Dieses Crate definiert alle Ereignisse die zwischen Client und Relay
//! ausgetauscht werden, den Verbindungs-Handshake und das Frame-Format
//! fuer TCP-Verbindungen.

pub mod error;
pub mod events;
pub mod wire;

pub use error::ProtocolError;
pub use events::{ClientEvent, Handshake, ServerEvent};
pub use wire::FrameCodec;
