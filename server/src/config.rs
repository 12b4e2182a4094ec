//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use ringline_signaling::SignalingConfig;
use serde::{Deserialize, Serialize};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Signaling-Einstellungen (Limits, Queues)
    pub signaling: SignalingEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers (nur fuer Logs)
    pub name: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Ringline Relay".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer HTTP/WebSocket und TCP
    pub bind_adresse: String,
    /// Port fuer HTTP und WebSocket (`PORT` ueberschreibt)
    pub http_port: u16,
    /// Port fuer das TCP-Signaling
    pub tcp_port: u16,
    /// TCP-Transport starten
    pub tcp_aktiviert: bool,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            http_port: 8080,
            tcp_port: 9987,
            tcp_aktiviert: true,
        }
    }
}

/// Signaling-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingEinstellungen {
    /// Maximale gleichzeitige Verbindungen (TCP und WebSocket zusammen)
    pub max_verbindungen: usize,
    /// Kapazitaet der Send-Queue pro Verbindung
    pub sende_queue_groesse: usize,
    /// Maximale TCP-Frame-Groesse in Bytes
    pub max_frame_groesse: usize,
    /// Frist fuer den TCP-Handshake in Sekunden
    pub handshake_timeout_sek: u64,
}

impl Default for SignalingEinstellungen {
    fn default() -> Self {
        let basis = SignalingConfig::default();
        Self {
            max_verbindungen: basis.max_verbindungen,
            sende_queue_groesse: basis.sende_queue_groesse,
            max_frame_groesse: basis.max_frame_groesse,
            handshake_timeout_sek: basis.handshake_timeout_sek,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    /// Die Umgebungsvariable `PORT` ueberschreibt `netzwerk.http_port`.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let mut config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str::<Self>(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };

        if let Ok(port) = std::env::var("PORT") {
            config.port_ueberschreiben(&port)?;
        }
        Ok(config)
    }

    /// Setzt den HTTP-Port aus einem Text (Wert von `PORT`)
    pub fn port_ueberschreiben(&mut self, port: &str) -> anyhow::Result<()> {
        self.netzwerk.http_port = port
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Ungueltiger Wert fuer PORT '{port}': {e}"))?;
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse fuer HTTP/WebSocket zurueck
    pub fn http_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.http_port)
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }

    /// Konfiguration fuer den Signaling-Kern
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            max_verbindungen: self.signaling.max_verbindungen,
            sende_queue_groesse: self.signaling.sende_queue_groesse,
            max_frame_groesse: self.signaling.max_frame_groesse,
            handshake_timeout_sek: self.signaling.handshake_timeout_sek,
        }
    }
}
