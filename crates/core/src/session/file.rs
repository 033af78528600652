use std::collections::BTreeMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use futures_util::FutureExt;
use tokio::sync::Mutex;

use super::SessionStore;
use crate::error::{CoreError, Result};

/// Session data persisted as a JSON object in a single file.
///
/// Every write rewrites the whole file through a sibling temp file and a
/// rename, so a crash leaves either the old or the new contents.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

type Entries = BTreeMap<String, String>;

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Entries> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => {
                return Err(CoreError::Session(format!(
                    "failure reading {}: {e}",
                    self.path.display()
                )));
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "discarding unreadable session file: {e}");
                Ok(Entries::new())
            }
        }
    }

    async fn save(&self, entries: &Entries) -> Result<()> {
        let io_err = |e: std::io::Error| {
            CoreError::Session(format!("failure writing {}: {e}", self.path.display()))
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let json = serde_json::to_vec_pretty(entries).map_err(|e| CoreError::Session(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }

    async fn update(&self, f: impl FnOnce(&mut Entries) + Send) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        f(&mut entries);
        self.save(&entries).await
    }
}

impl SessionStore for FileSessionStore {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
        async move {
            let _guard = self.lock.lock().await;
            Ok(self.load().await?.remove(key))
        }
        .boxed()
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        async move {
            self.update(|entries| {
                entries.insert(key.to_owned(), value);
            })
            .await
        }
        .boxed()
    }

    fn remove<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        async move {
            self.update(|entries| {
                entries.remove(key);
            })
            .await
        }
        .boxed()
    }

    fn clear<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        async move {
            let _guard = self.lock.lock().await;
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(CoreError::Session(format!(
                    "failure removing {}: {e}",
                    self.path.display()
                ))),
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AuthSession;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("fleetguard-session-{}", std::process::id()))
            .join(name)
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let path = scratch("reopen.json");
        let store = FileSessionStore::new(&path);
        store.set("authToken", "jwt".into()).await.unwrap();
        drop(store);

        let reopened = FileSessionStore::new(&path);
        assert_eq!(reopened.get("authToken").await.unwrap().as_deref(), Some("jwt"));

        reopened.clear().await.unwrap();
        assert!(!path.exists());
        assert_eq!(reopened.get("authToken").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let store = FileSessionStore::new(scratch("absent.json"));
        assert_eq!(store.get("anything").await.unwrap(), None);
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_unreadable_file_is_treated_as_empty() {
        let path = scratch("garbage.json");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, b"\x00garbage").await.unwrap();

        let store = FileSessionStore::new(&path);
        assert_eq!(AuthSession::restore(&store).await.unwrap(), None);

        store.set("k", "v".into()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_auth_session_round_trip_on_disk() {
        let path = scratch("auth.json");
        let store = FileSessionStore::new(&path);
        let session = AuthSession::for_tests("jwt", "41");

        session.sign_in(&store).await.unwrap();
        let restored = AuthSession::restore(&FileSessionStore::new(&path)).await.unwrap();
        assert_eq!(restored, Some(session));

        store.clear().await.unwrap();
    }
}
