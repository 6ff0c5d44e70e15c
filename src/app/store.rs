use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::fs;

use crate::settings::Settings;

/// Fixed key the saved-profiles collection lives under.
pub const STORAGE_KEY: &str = "reformat_profiles";

/// The collection of named settings snapshots, the only state that outlives a session.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Unreadable or corrupt storage yields an empty collection.
    async fn load(&self) -> Vec<Settings>;

    /// Replaces the whole collection.
    async fn save(&self, profiles: &[Settings]) -> anyhow::Result<()>;

    /// Snapshots `settings` under the trimmed `name`, appends it to `existing`
    /// and overwrites the stored collection. Returns the collection as written.
    async fn append_snapshot(
        &self,
        existing: &[Settings],
        settings: &Settings,
        name: &str,
    ) -> Result<Vec<Settings>, SaveProfileError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SaveProfileError::EmptyName);
        }
        let mut updated = existing.to_vec();
        updated.push(settings.snapshot(name));
        self.save(&updated).await.map_err(SaveProfileError::Write)?;
        tracing::info!(name, saved = updated.len(), "profile saved");
        Ok(updated)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SaveProfileError {
    #[error("profile name must not be empty")]
    EmptyName,

    #[error("save profiles: {0:#}")]
    Write(anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct LocalFsProfileStore {
    base_dir: PathBuf,
}

impl LocalFsProfileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.base_dir.join(format!("{STORAGE_KEY}.json"))
    }
}

#[async_trait]
impl ProfileStore for LocalFsProfileStore {
    async fn load(&self) -> Vec<Settings> {
        let path = self.path();
        match read_profiles(&path).await {
            Ok(Some(profiles)) => profiles,
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %format!("{err:#}"), "discarding unreadable saved profiles");
                Vec::new()
            }
        }
    }

    async fn save(&self, profiles: &[Settings]) -> anyhow::Result<()> {
        let path = self.path();
        replace_profiles(&path, profiles)
            .await
            .with_context(|| format!("write saved profiles: {}", path.display()))
    }
}

/// Keeps the collection in memory; for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: Mutex<Vec<Settings>>,
}

impl InMemoryProfileStore {
    pub fn new(profiles: Vec<Settings>) -> Self {
        Self {
            profiles: Mutex::new(profiles),
        }
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn load(&self) -> Vec<Settings> {
        match self.profiles.lock() {
            Ok(profiles) => profiles.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    async fn save(&self, profiles: &[Settings]) -> anyhow::Result<()> {
        let mut guard = self
            .profiles
            .lock()
            .map_err(|_| anyhow::anyhow!("profile store lock poisoned"))?;
        *guard = profiles.to_vec();
        Ok(())
    }
}

async fn read_profiles(path: &Path) -> anyhow::Result<Option<Vec<Settings>>> {
    match fs::read(path).await {
        Ok(raw) => serde_json::from_slice(&raw)
            .map(Some)
            .context("decode saved profiles"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(anyhow::Error::new(err).context("read saved profiles")),
    }
}

// Stages the collection next to `path` and renames it into place; readers see
// either the previous collection or the new one.
async fn replace_profiles(path: &Path, profiles: &[Settings]) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create data dir: {}", dir.display()))?;
    }

    let staged = path.with_file_name(format!(
        "{STORAGE_KEY}.json.{}.tmp",
        uuid::Uuid::new_v4().simple()
    ));
    let body = serde_json::to_vec_pretty(profiles).context("encode saved profiles")?;
    fs::write(&staged, body)
        .await
        .with_context(|| format!("stage saved profiles: {}", staged.display()))?;
    if let Err(err) = fs::rename(&staged, path).await {
        let _ = fs::remove_file(&staged).await;
        return Err(anyhow::Error::new(err).context(format!("replace {}", path.display())));
    }
    Ok(())
}
