//! The debate session store.
//!
//! Owns every persisted record family:
//!
//! - `debate:session:<id>` — the encrypted [`DebateSession`]
//! - `debate:engine:<id>`  — the encrypted [`EngineState`]
//! - `debate:usage:<id>`   — the encrypted [`DebateUsage`]
//! - `debate:share:<code>` — plain share-code → debate-id mapping
//!
//! All three record families are sealed before they reach the backend;
//! engine state embeds provider identities that would reveal the hidden
//! assignment, so nothing leaves process memory in the clear. A blob
//! that fails to open is treated as absent and purged.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use da_domain::error::{Error, Result};
use da_domain::session::{DebateSession, PublicSession};
use da_domain::state::EngineState;
use da_domain::usage::DebateUsage;

use crate::backend::{MemoryBackend, StoreBackend};
use crate::crypto::SessionCrypto;

fn session_key(id: &str) -> String {
    format!("debate:session:{id}")
}

fn engine_key(id: &str) -> String {
    format!("debate:engine:{id}")
}

fn usage_key(id: &str) -> String {
    format!("debate:usage:{id}")
}

fn share_key(code: &str) -> String {
    format!("debate:share:{code}")
}

fn share_reverse_key(id: &str) -> String {
    format!("debate:shareid:{id}")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct SessionStore {
    backend: Arc<dyn StoreBackend>,
    crypto: SessionCrypto,
    /// Serializes read-modify-write updates.
    update_lock: tokio::sync::Mutex<()>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn StoreBackend>, secret: &str) -> Result<Self> {
        let crypto = SessionCrypto::new(secret)?;
        tracing::info!(key_fingerprint = crypto.fingerprint(), "session store ready");
        Ok(Self {
            backend,
            crypto,
            update_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Store over the in-process backend.
    pub fn in_memory(secret: &str) -> Result<Self> {
        Self::new(Arc::new(MemoryBackend::new()), secret)
    }

    // ── Sealed record plumbing ─────────────────────────────────────

    fn seal<T: Serialize>(&self, value: &T) -> Result<String> {
        let plaintext = serde_json::to_vec(value)?;
        self.crypto.seal(&plaintext)
    }

    /// Open a sealed record; a blob that fails decryption or
    /// deserialization is purged and reported absent.
    async fn open_or_purge<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(blob) = self.backend.get(key).await? else {
            return Ok(None);
        };

        let opened = self
            .crypto
            .open(&blob)
            .and_then(|plain| serde_json::from_slice(&plain).map_err(Error::Json));

        match opened {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "corrupted record purged");
                let _ = self.backend.delete(key).await;
                Ok(None)
            }
        }
    }

    // ── Sessions ───────────────────────────────────────────────────

    pub async fn put_session(&self, session: &DebateSession) -> Result<()> {
        let blob = self.seal(session)?;
        self.backend
            .put(&session_key(&session.id), blob, session.expires_at)
            .await
    }

    pub async fn get_session(&self, id: &str) -> Result<Option<DebateSession>> {
        let Some(session) = self.open_or_purge::<DebateSession>(&session_key(id)).await? else {
            return Ok(None);
        };
        // Backends with native TTL already reaped this; the accessor
        // check covers backends that did not.
        if session.is_expired(Utc::now()) {
            let _ = self.backend.delete(&session_key(id)).await;
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Read-modify-write a session under the update lock.
    pub async fn update_session<F>(&self, id: &str, mutate: F) -> Result<DebateSession>
    where
        F: FnOnce(&mut DebateSession),
    {
        let _guard = self.update_lock.lock().await;
        let mut session = self
            .get_session(id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        mutate(&mut session);
        session.updated_at = Utc::now();
        self.put_session(&session).await?;
        Ok(session)
    }

    /// Delete a session and its companion records.
    pub async fn delete_session(&self, id: &str) -> Result<bool> {
        let existed = self.backend.delete(&session_key(id)).await?;
        let _ = self.backend.delete(&engine_key(id)).await;
        let _ = self.backend.delete(&usage_key(id)).await;
        Ok(existed)
    }

    /// The only pre-completion client shape.
    pub fn to_public(&self, session: &DebateSession) -> PublicSession {
        session.to_public()
    }

    // ── Engine state ───────────────────────────────────────────────

    pub async fn put_engine_state(
        &self,
        state: &EngineState,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let blob = self.seal(state)?;
        self.backend
            .put(&engine_key(&state.session_id), blob, expires_at)
            .await
    }

    pub async fn get_engine_state(&self, id: &str) -> Result<Option<EngineState>> {
        self.open_or_purge(&engine_key(id)).await
    }

    // ── Usage ──────────────────────────────────────────────────────

    pub async fn put_usage(&self, usage: &DebateUsage, expires_at: DateTime<Utc>) -> Result<()> {
        let blob = self.seal(usage)?;
        self.backend
            .put(&usage_key(&usage.session_id), blob, expires_at)
            .await
    }

    pub async fn get_usage(&self, id: &str) -> Result<Option<DebateUsage>> {
        self.open_or_purge(&usage_key(id)).await
    }

    // ── Share codes ────────────────────────────────────────────────

    pub async fn put_share(
        &self,
        code: &str,
        debate_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.backend
            .put(&share_key(code), debate_id.to_string(), expires_at)
            .await?;
        self.backend
            .put(&share_reverse_key(debate_id), code.to_string(), expires_at)
            .await
    }

    pub async fn get_share(&self, code: &str) -> Result<Option<String>> {
        self.backend.get(&share_key(code)).await
    }

    /// The share code already minted for a debate, if any.
    pub async fn get_share_code(&self, debate_id: &str) -> Result<Option<String>> {
        self.backend.get(&share_reverse_key(debate_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use da_domain::ids::generate_debate_id;
    use da_domain::session::{DebateFormat, SessionStatus};

    const SECRET: &str = "an-adequately-long-process-secret-value";

    fn store() -> SessionStore {
        SessionStore::in_memory(SECRET).unwrap()
    }

    fn session() -> DebateSession {
        DebateSession::new(
            generate_debate_id(),
            "Should voting be mandatory in national elections?".into(),
            4,
            DebateFormat::Standard,
            vec![],
            Duration::hours(24),
        )
    }

    #[tokio::test]
    async fn put_get_round_trip_preserves_everything() {
        let store = store();
        let original = session();
        store.put_session(&original).await.unwrap();

        let loaded = store.get_session(&original.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, original.id);
        assert_eq!(loaded.topic, original.topic);
        assert_eq!(loaded.assignment, original.assignment);
        assert_eq!(loaded.expires_at, original.expires_at);
    }

    #[tokio::test]
    async fn missing_session_reads_as_none() {
        assert!(store()
            .get_session("db_AAAAAAAAAAAAAAAA")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn expired_session_reads_as_none() {
        let store = store();
        let mut s = session();
        s.expires_at = Utc::now() - Duration::seconds(1);
        store.put_session(&s).await.unwrap();
        assert!(store.get_session(&s.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_mutates_and_bumps_timestamp() {
        let store = store();
        let s = session();
        store.put_session(&s).await.unwrap();

        let updated = store
            .update_session(&s.id, |sess| sess.status = SessionStatus::Active)
            .await
            .unwrap();
        assert_eq!(updated.status, SessionStatus::Active);
        assert!(updated.updated_at >= s.updated_at);

        let reloaded = store.get_session(&s.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn update_of_missing_session_is_not_found() {
        let err = store()
            .update_session("db_AAAAAAAAAAAAAAAA", |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn corrupted_blob_is_purged_and_absent() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SessionStore::new(backend.clone(), SECRET).unwrap();
        let s = session();

        backend
            .put(
                &session_key(&s.id),
                "definitely-not-a-sealed-blob".into(),
                s.expires_at,
            )
            .await
            .unwrap();

        assert!(store.get_session(&s.id).await.unwrap().is_none());
        assert!(backend.get(&session_key(&s.id)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stored_blob_is_not_plaintext() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SessionStore::new(backend.clone(), SECRET).unwrap();
        let s = session();
        store.put_session(&s).await.unwrap();

        let raw = backend.get(&session_key(&s.id)).await.unwrap().unwrap();
        assert!(!raw.contains(&s.topic));
        assert!(!raw.contains("chatgpt_model"));
        assert!(!raw.contains("grok_model"));
    }

    #[tokio::test]
    async fn engine_and_usage_records_round_trip() {
        let store = store();
        let s = session();
        let state = EngineState::new(s.id.clone(), vec![]);
        let usage = DebateUsage::new(s.id.clone(), 100_000);

        store.put_engine_state(&state, s.expires_at).await.unwrap();
        store.put_usage(&usage, s.expires_at).await.unwrap();

        let state2 = store.get_engine_state(&s.id).await.unwrap().unwrap();
        let usage2 = store.get_usage(&s.id).await.unwrap().unwrap();
        assert_eq!(state2.session_id, s.id);
        assert_eq!(usage2.budget_tokens, 100_000);
    }

    #[tokio::test]
    async fn delete_removes_companion_records() {
        let store = store();
        let s = session();
        store.put_session(&s).await.unwrap();
        store
            .put_engine_state(&EngineState::new(s.id.clone(), vec![]), s.expires_at)
            .await
            .unwrap();

        assert!(store.delete_session(&s.id).await.unwrap());
        assert!(store.get_session(&s.id).await.unwrap().is_none());
        assert!(store.get_engine_state(&s.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn share_codes_map_to_debate_ids() {
        let store = store();
        let s = session();
        store
            .put_share("AbCd2345", &s.id, s.expires_at)
            .await
            .unwrap();
        assert_eq!(
            store.get_share("AbCd2345").await.unwrap(),
            Some(s.id.clone())
        );
        assert_eq!(
            store.get_share_code(&s.id).await.unwrap(),
            Some("AbCd2345".into())
        );
        assert_eq!(store.get_share("zzzzzz").await.unwrap(), None);
    }
}
