//! Memdemo server binary: loads config, wires the engine factory,
//! session manager, background sweeper, and HTTP gateway together.

use clap::{Parser, Subcommand};
use memdemo_engine::{EngineCredential, OpenAiEngineFactory};
use memdemo_gateway::build_router;
use memdemo_session::{PoolConfig, SessionManager, SessionStore, Sweeper, SystemClock};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "memdemo", about = "Memdemo — memory-augmented chat demo backend")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "memdemo.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the demo API server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Deserialize, Default)]
struct MemdemoConfig {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    openai: OpenAiConfig,
    #[serde(default)]
    limits: LimitsConfig,
}

#[derive(Deserialize)]
struct ServerConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Deserialize)]
struct OpenAiConfig {
    /// Server-side API key for server-tier sessions. The
    /// `OPENAI_API_KEY` environment variable takes precedence.
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default = "default_chat_model")]
    chat_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            chat_model: default_chat_model(),
        }
    }
}

#[derive(Deserialize)]
struct LimitsConfig {
    #[serde(default = "default_max_sessions")]
    max_sessions: usize,
    #[serde(default = "default_session_ttl_secs")]
    session_ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    sweep_interval_secs: u64,
    #[serde(default = "default_engine_timeout_secs")]
    engine_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            session_ttl_secs: default_session_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            engine_timeout_secs: default_engine_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_sessions() -> usize {
    8
}
fn default_session_ttl_secs() -> u64 {
    5 * 60
}
fn default_sweep_interval_secs() -> u64 {
    60
}
fn default_engine_timeout_secs() -> u64 {
    60
}

fn server_credential(config: &OpenAiConfig) -> Option<EngineCredential> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .or_else(|| config.api_key.clone().filter(|k| !k.is_empty()))?;
    let base_url = std::env::var("OPENAI_BASE_URL")
        .ok()
        .filter(|u| !u.is_empty())
        .or_else(|| config.base_url.clone());
    let mut credential = EngineCredential::new(api_key);
    if let Some(base_url) = base_url {
        credential = credential.with_base_url(base_url);
    }
    Some(credential)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();

    // A missing config file falls back to defaults; the API key can
    // arrive via the environment instead.
    let config: MemdemoConfig = if cli.config.exists() {
        let config_str = tokio::fs::read_to_string(&cli.config).await.map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", cli.config.display(), e)
        })?;
        toml::from_str(&config_str)?
    } else {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
        MemdemoConfig::default()
    };

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);

            let credential = server_credential(&config.openai);
            if credential.is_none() {
                warn!("No server API key configured; server-tier sessions will be rejected");
            }

            let store = Arc::new(SessionStore::new(
                PoolConfig {
                    max_sessions: config.limits.max_sessions,
                    session_ttl: Duration::from_secs(config.limits.session_ttl_secs),
                },
                Arc::new(SystemClock),
            ));
            let factory = Arc::new(OpenAiEngineFactory::new(config.openai.chat_model.clone()));
            let manager = Arc::new(
                SessionManager::new(store.clone(), factory, credential)
                    .with_engine_timeout(Duration::from_secs(config.limits.engine_timeout_secs)),
            );

            let sweeper = Sweeper::start(
                store,
                Duration::from_secs(config.limits.sweep_interval_secs),
            );

            let app = build_router(manager);
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            info!(
                addr = %addr,
                max_sessions = config.limits.max_sessions,
                session_ttl_secs = config.limits.session_ttl_secs,
                "Memdemo API listening"
            );

            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await?;

            sweeper.stop().await;
            info!("Memdemo API shut down");
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: MemdemoConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.limits.max_sessions, 8);
        assert_eq!(config.limits.session_ttl_secs, 300);
        assert_eq!(config.openai.chat_model, "gpt-4o-mini");
    }

    #[test]
    fn partial_config_overrides_selected_fields() {
        let config: MemdemoConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [limits]
            max_sessions = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.limits.max_sessions, 2);
        assert_eq!(config.limits.sweep_interval_secs, 60);
    }

    #[test]
    fn credential_prefers_config_when_env_absent() {
        let openai = OpenAiConfig {
            api_key: Some("file-key".to_string()),
            base_url: Some("https://example.test".to_string()),
            chat_model: default_chat_model(),
        };
        // Only meaningful when OPENAI_API_KEY is not set in the test env.
        if std::env::var("OPENAI_API_KEY").is_err() {
            let credential = server_credential(&openai).unwrap();
            assert_eq!(credential.api_key, "file-key");
            assert_eq!(credential.base_url.as_deref(), Some("https://example.test"));
        }
    }
}
