use crate::quota::turn_limit;
use crate::session::{ChatReply, CreatedSession, PoolStatus, SessionStatus};
use crate::store::SessionStore;
use memdemo_core::{DemoError, DemoResult, KeyMode};
use memdemo_engine::{parse_context, EngineCredential, EngineFactory};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(60);

/// Parameters for creating a session.
#[derive(Debug, Clone)]
pub struct CreateParams {
    /// Contact identity of the caller (e.g. email).
    pub owner: String,
    /// Credential tier the session runs on.
    pub key_mode: KeyMode,
    /// Caller-supplied credential; required iff `key_mode` is
    /// [`KeyMode::BringOwnKey`].
    pub credential: Option<EngineCredential>,
    /// Free-form context text the engine is bootstrapped from.
    pub context_text: String,
}

/// The session lifecycle API: create, chat, status, delete.
///
/// Composes admission control, quota policy, and the session store,
/// and delegates the actual answering to the engine behind a boundary
/// timeout. All engine calls run without the store lock held.
pub struct SessionManager {
    store: Arc<SessionStore>,
    factory: Arc<dyn EngineFactory>,
    server_credential: Option<EngineCredential>,
    engine_timeout: Duration,
}

impl SessionManager {
    /// Creates a manager over the given store and engine factory.
    ///
    /// `server_credential` backs [`KeyMode::ServerKey`] sessions; when
    /// absent, every server-tier create fails with
    /// [`DemoError::Misconfigured`].
    pub fn new(
        store: Arc<SessionStore>,
        factory: Arc<dyn EngineFactory>,
        server_credential: Option<EngineCredential>,
    ) -> Self {
        Self {
            store,
            factory,
            server_credential,
            engine_timeout: DEFAULT_ENGINE_TIMEOUT,
        }
    }

    /// Overrides the boundary timeout applied to engine calls.
    pub fn with_engine_timeout(mut self, timeout: Duration) -> Self {
        self.engine_timeout = timeout;
        self
    }

    /// The store this manager operates on (the sweeper shares it).
    pub fn store(&self) -> Arc<SessionStore> {
        self.store.clone()
    }

    fn resolve_credential(&self, params: &CreateParams) -> DemoResult<EngineCredential> {
        match params.key_mode {
            KeyMode::BringOwnKey => match &params.credential {
                Some(credential) if !credential.api_key.is_empty() => Ok(credential.clone()),
                _ => Err(DemoError::InvalidRequest(
                    "API key required for BYOK mode".to_string(),
                )),
            },
            KeyMode::ServerKey => self.server_credential.clone().ok_or_else(|| {
                error!("Server API key not configured; rejecting server-tier session");
                DemoError::Misconfigured("server API key not configured".to_string())
            }),
        }
    }

    /// Creates a session: validate, admit, bootstrap the engine, insert.
    ///
    /// The engine bootstrap runs against a reserved pool slot, outside
    /// the store lock; if it fails, times out, or this future is
    /// dropped mid-bootstrap, the permit is dropped and the slot
    /// returns to the pool with nothing inserted.
    pub async fn create(&self, params: CreateParams) -> DemoResult<CreatedSession> {
        let credential = self.resolve_credential(&params)?;
        let limit = turn_limit(params.key_mode);
        let dialogues = parse_context(&params.context_text);

        let permit = self.store.try_admit().await?;

        let bootstrap = tokio::time::timeout(
            self.engine_timeout,
            self.factory.bootstrap(&credential, dialogues),
        )
        .await;

        let engine = match bootstrap {
            Ok(Ok(engine)) => engine,
            Ok(Err(err)) => {
                warn!(owner = %params.owner, error = %err, "Engine bootstrap failed");
                drop(permit);
                return Err(err);
            }
            Err(_elapsed) => {
                warn!(owner = %params.owner, "Engine bootstrap timed out");
                drop(permit);
                return Err(DemoError::Engine("engine bootstrap timed out".to_string()));
            }
        };

        Ok(self
            .store
            .insert(permit, params.owner, params.key_mode, limit, engine)
            .await)
    }

    /// Runs one chat exchange against a session's engine.
    ///
    /// The turn is committed only after the engine answers; a failed
    /// or timed-out delegate call never consumes a turn. Commit
    /// re-validates the record since it may have expired or been
    /// deleted while the engine call ran.
    pub async fn chat(&self, id: Uuid, message: &str) -> DemoResult<ChatReply> {
        let engine = self.store.begin_chat(id).await?;

        let answer = match tokio::time::timeout(self.engine_timeout, engine.ask(message)).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(err)) => {
                warn!(session_id = %id, error = %err, "Engine call failed");
                return Err(err);
            }
            Err(_elapsed) => {
                warn!(session_id = %id, "Engine call timed out");
                return Err(DemoError::Engine("engine call timed out".to_string()));
            }
        };

        let status = self.store.commit_turn(id).await?;
        Ok(ChatReply {
            response: answer,
            turn_count: status.turn_count,
            turn_limit: status.turn_limit,
            remaining_secs: status.remaining_secs,
        })
    }

    /// Read-only session projection; removes the record if it turns
    /// out to be expired.
    pub async fn status(&self, id: Uuid) -> DemoResult<SessionStatus> {
        self.store.status(id).await
    }

    /// Deletes a session. Idempotent and infallible: deleting an
    /// absent id silently succeeds, since callers may race a delete
    /// against an expiry sweep.
    pub async fn delete(&self, id: Uuid) {
        if !self.store.remove(id).await {
            info!(session_id = %id, "Delete for absent session (no-op)");
        }
    }

    /// Pool occupancy snapshot, sweeping expired sessions first.
    pub async fn pool_status(&self) -> PoolStatus {
        self.store.pool_status().await
    }
}
