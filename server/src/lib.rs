//! ringline-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;
pub mod http;

use anyhow::{Context, Result};
use config::ServerConfig;
use ringline_signaling::{SignalingServer, SignalingState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Signaling-Zustand anlegen
    /// 2. TCP-Listener starten (falls aktiviert)
    /// 3. HTTP/WebSocket-Server starten
    /// 4. Auf Ctrl-C warten, dann alle Verbindungen schliessen
    pub async fn starten(self) -> Result<()> {
        tracing::info!(
            server_name = %self.config.server.name,
            http = %self.config.http_bind_adresse(),
            tcp = %self.config.tcp_bind_adresse(),
            tcp_aktiviert = self.config.netzwerk.tcp_aktiviert,
            "Server startet"
        );

        let state = SignalingState::neu(self.config.signaling_config());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tcp_task = if self.config.netzwerk.tcp_aktiviert {
            let addr: SocketAddr = self
                .config
                .tcp_bind_adresse()
                .parse()
                .with_context(|| format!("Ungueltige TCP-Adresse '{}'", self.config.tcp_bind_adresse()))?;
            let tcp = SignalingServer::binden(Arc::clone(&state), addr)
                .await
                .with_context(|| format!("TCP-Port {addr} konnte nicht gebunden werden"))?;
            Some(tokio::spawn(tcp.starten(shutdown_rx.clone())))
        } else {
            None
        };

        let http_addr = self.config.http_bind_adresse();
        let listener = tokio::net::TcpListener::bind(&http_addr)
            .await
            .with_context(|| format!("HTTP-Port {http_addr} konnte nicht gebunden werden"))?;
        tracing::info!(adresse = %http_addr, "HTTP/WebSocket-Server gestartet");

        let app = http::router(Arc::clone(&state), shutdown_rx);
        let signal_tx = shutdown_tx.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => tracing::info!("Shutdown-Signal empfangen, Server wird beendet"),
                    Err(e) => tracing::error!(fehler = %e, "Ctrl-C-Handler fehlgeschlagen"),
                }
                let _ = signal_tx.send(true);
            })
            .await
            .context("HTTP-Server abgebrochen")?;

        let _ = shutdown_tx.send(true);
        if let Some(task) = tcp_task {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(fehler = %e, "TCP-Server mit Fehler beendet"),
                Err(e) => tracing::error!(fehler = %e, "TCP-Task abgebrochen"),
            }
        }

        tracing::info!(uptime_sek = state.uptime_sek(), "Server beendet");
        Ok(())
    }
}
