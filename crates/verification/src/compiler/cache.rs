//! Shared cache of compiler binaries.
//!
//! Every `(backend, version)` pair owns one `OnceCell`. Concurrent requests for a version
//! that is not cached yet wait on the same cell, so only one download runs. A failed
//! download leaves the cell empty and the next request retries it.

use super::Backend;
use crate::result::CompilerError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;

const BINARIES_URL: &str = "https://binaries.soliditylang.org";

/// Retrieves a compiler build and returns its local path.
#[async_trait]
pub trait BinaryFetcher: Send + Sync {
    async fn fetch(&self, backend: Backend, version: &str) -> Result<PathBuf, CompilerError>;
}

type CacheKey = (Backend, String);

pub struct CompilerCache<F> {
    fetcher: F,
    entries: Mutex<HashMap<CacheKey, Arc<OnceCell<PathBuf>>>>,
}

impl<F: BinaryFetcher> CompilerCache<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Local path of the requested build, fetching it at most once.
    pub async fn get(&self, backend: Backend, version: &str) -> Result<PathBuf, CompilerError> {
        let cell = {
            let mut entries = self.entries.lock();
            entries
                .entry((backend, version.to_string()))
                .or_default()
                .clone()
        };
        cell.get_or_try_init(|| async {
            tracing::info!("fetching {} solc {}", backend, version);
            self.fetcher.fetch(backend, version).await
        })
        .await
        .cloned()
    }
}

/// Downloads builds from the official binaries mirror into a local directory.
pub struct HttpFetcher {
    client: reqwest::Client,
    root: PathBuf,
    platform: &'static str,
}

impl HttpFetcher {
    pub fn new(root: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            root,
            platform: native_platform(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn location(&self, backend: Backend, version: &str) -> (String, PathBuf) {
        match backend {
            Backend::Native => {
                let name = format!("solc-{}-v{}", self.platform, version);
                (
                    format!("{BINARIES_URL}/{}/{name}", self.platform),
                    self.root.join(&name),
                )
            }
            Backend::Alternate => {
                let name = format!("soljson-v{version}.js");
                (format!("{BINARIES_URL}/bin/{name}"), self.root.join(&name))
            }
        }
    }
}

fn native_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macosx-amd64"
    } else if cfg!(target_os = "windows") {
        "windows-amd64"
    } else {
        "linux-amd64"
    }
}

#[async_trait]
impl BinaryFetcher for HttpFetcher {
    async fn fetch(&self, backend: Backend, version: &str) -> Result<PathBuf, CompilerError> {
        let (url, path) = self.location(backend, version);
        if tokio::fs::try_exists(&path).await? {
            tracing::debug!("using cached {}", path.display());
            return Ok(path);
        }
        tokio::fs::create_dir_all(&self.root).await?;

        let download = |source| CompilerError::Download {
            version: version.to_string(),
            source,
        };
        let response = self.client.get(&url).send().await.map_err(download)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CompilerError::NotPublished {
                version: version.to_string(),
            });
        }
        let bytes = response
            .error_for_status()
            .map_err(download)?
            .bytes()
            .await
            .map_err(download)?;

        // Write next to the target and rename so readers never see a partial file.
        let partial = path.with_extension("part");
        let mut file = tokio::fs::File::create(&partial).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);
        make_executable(&partial).await?;
        tokio::fs::rename(&partial, &path).await?;

        tracing::info!("downloaded {} ({} bytes)", url, bytes.len());
        Ok(path)
    }
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
