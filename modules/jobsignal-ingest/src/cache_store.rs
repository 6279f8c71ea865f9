// File-backed snapshot of the latest run.
//
// Writes go to a temp file in the target directory and are renamed into
// place, so readers see either the previous document or the new one.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use jobsignal_common::{Config, JobsCache};

#[derive(Debug, Clone)]
pub struct CacheStore {
    primary: PathBuf,
    fallback: PathBuf,
}

impl CacheStore {
    pub fn new(primary: impl Into<PathBuf>, fallback: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.cache_path, &config.cache_fallback_path)
    }

    pub fn primary(&self) -> &Path {
        &self.primary
    }

    pub fn fallback(&self) -> &Path {
        &self.fallback
    }

    /// Latest readable snapshot. When both locations hold one, the newer wins,
    /// so a run that could only reach the fallback is still served. `None`
    /// means cold start.
    pub async fn read(&self) -> Option<JobsCache> {
        let (primary, fallback) = tokio::join!(read_document(&self.primary), read_document(&self.fallback));
        match (primary, fallback) {
            (Some(p), Some(f)) if f.generated_at > p.generated_at => Some(f),
            (Some(p), _) => Some(p),
            (None, f) => f,
        }
    }

    /// Persist `cache`, falling back to the secondary path when the primary is
    /// unwritable. Returns the path written.
    pub async fn write(&self, cache: &JobsCache) -> Result<PathBuf> {
        let body = serde_json::to_vec_pretty(cache).context("Failed to serialize jobs cache")?;

        match write_atomic(self.primary.clone(), body.clone()).await {
            Ok(()) => Ok(self.primary.clone()),
            Err(e) => {
                warn!(
                    path = %self.primary.display(),
                    error = %e,
                    "Primary cache path unwritable, using fallback"
                );
                write_atomic(self.fallback.clone(), body)
                    .await
                    .with_context(|| format!("Failed to write cache to {}", self.fallback.display()))?;
                Ok(self.fallback.clone())
            }
        }
    }
}

async fn read_document(path: &Path) -> Option<JobsCache> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "cache: unreadable");
            return None;
        }
    };
    match serde_json::from_slice(&raw) {
        Ok(cache) => Some(cache),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cache: unparseable document ignored");
            None
        }
    }
}

async fn write_atomic(path: PathBuf, body: Vec<u8>) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(&body).context("Failed to write cache body")?;
        tmp.as_file().sync_all().context("Failed to flush cache body")?;
        tmp.persist(&path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to move cache into {}", path.display()))?;
        Ok(())
    })
    .await
    .context("Cache write task panicked")?
}
