//! Signed-in state.
//!
//! A single [`SessionStore`] is chosen at startup; [`AuthSession`] is then
//! passed explicitly to every operation that needs a token or passenger id.

mod file;
mod memory;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use fleetguard_transit::PassengerIdentifier;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, IntoEnumIterator};

use crate::config::{SessionBackend, SessionConfig};
use crate::error::{CoreError, Result};

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

/// String key-value storage for session data
pub trait SessionStore: Send + Sync {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>>;

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    fn remove<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    fn clear<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Keys the client writes into the session store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, AsRefStr, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum SessionKey {
    AuthToken,
    Passenger,
}

/// Build the configured store.
pub fn open_session_store(config: &SessionConfig) -> Arc<dyn SessionStore> {
    match config.backend {
        SessionBackend::Memory => Arc::new(MemorySessionStore::default()),
        SessionBackend::File => Arc::new(FileSessionStore::new(config.path.clone())),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerProfile {
    pub id: PassengerIdentifier,
    pub first_name: String,
    pub last_name: String,
}

impl PassengerProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthSession {
    token: String,
    passenger: PassengerProfile,
}

impl AuthSession {
    pub fn new(token: impl Into<String>, passenger: PassengerProfile) -> Self {
        Self {
            token: token.into(),
            passenger,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn passenger(&self) -> &PassengerProfile {
        &self.passenger
    }

    /// Persist the session so [`AuthSession::restore`] finds it later.
    pub async fn sign_in(&self, store: &dyn SessionStore) -> Result<()> {
        let profile = serde_json::to_string(&self.passenger)
            .map_err(|e| CoreError::Session(e.to_string()))?;

        store.set(SessionKey::AuthToken.as_ref(), self.token.clone()).await?;
        store.set(SessionKey::Passenger.as_ref(), profile).await?;
        tracing::debug!(passenger = %self.passenger.id, "session stored");
        Ok(())
    }

    /// Load the stored session. A partial or unreadable entry wipes the
    /// session keys and yields `None`.
    pub async fn restore(store: &dyn SessionStore) -> Result<Option<Self>> {
        let token = store.get(SessionKey::AuthToken.as_ref()).await?;
        let profile = store.get(SessionKey::Passenger.as_ref()).await?;

        let (token, profile) = match (token, profile) {
            (None, None) => return Ok(None),
            (Some(token), Some(profile)) if !token.is_empty() => (token, profile),
            _ => {
                tracing::warn!("incomplete session data, clearing");
                Self::sign_out(store).await?;
                return Ok(None);
            }
        };

        match serde_json::from_str::<PassengerProfile>(&profile) {
            Ok(passenger) => Ok(Some(Self { token, passenger })),
            Err(e) => {
                tracing::warn!("corrupt passenger data, clearing session: {e}");
                Self::sign_out(store).await?;
                Ok(None)
            }
        }
    }

    pub async fn sign_out(store: &dyn SessionStore) -> Result<()> {
        for key in SessionKey::iter() {
            store.remove(key.as_ref()).await?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn for_tests(token: &str, passenger_id: &str) -> Self {
        Self::new(
            token,
            PassengerProfile {
                id: PassengerIdentifier::new(passenger_id),
                first_name: "Ana".into(),
                last_name: "Ruiz".into(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_keys() {
        assert_eq!(SessionKey::AuthToken.as_ref(), "authToken");
        assert_eq!(SessionKey::Passenger.as_ref(), "passenger");
    }

    #[tokio::test]
    async fn test_sign_in_then_restore() {
        let store = MemorySessionStore::default();
        let session = AuthSession::for_tests("jwt", "41");

        session.sign_in(&store).await.unwrap();
        let restored = AuthSession::restore(&store).await.unwrap();

        assert_eq!(restored, Some(session));
    }

    #[tokio::test]
    async fn test_restore_without_session() {
        let store = MemorySessionStore::default();
        assert_eq!(AuthSession::restore(&store).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_profile_clears_session() {
        let store = MemorySessionStore::default();
        store.set("authToken", "jwt".into()).await.unwrap();
        store.set("passenger", "{not json".into()).await.unwrap();

        assert_eq!(AuthSession::restore(&store).await.unwrap(), None);
        assert_eq!(store.get("authToken").await.unwrap(), None);
        assert_eq!(store.get("passenger").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_token_without_profile_clears_session() {
        let store = MemorySessionStore::default();
        store.set("authToken", "jwt".into()).await.unwrap();

        assert_eq!(AuthSession::restore(&store).await.unwrap(), None);
        assert_eq!(store.get("authToken").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sign_out_keeps_unrelated_keys() {
        let store = MemorySessionStore::default();
        store.set("theme", "dark".into()).await.unwrap();
        AuthSession::for_tests("jwt", "41").sign_in(&store).await.unwrap();

        AuthSession::sign_out(&store).await.unwrap();

        assert_eq!(AuthSession::restore(&store).await.unwrap(), None);
        assert_eq!(store.get("theme").await.unwrap().as_deref(), Some("dark"));
    }

    #[tokio::test]
    async fn test_open_memory_store() {
        let store = open_session_store(&SessionConfig::default());
        store.set("k", "v".into()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
