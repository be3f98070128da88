use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// PageStoreError
#[derive(Debug, thiserror::Error)]
pub enum PageStoreError {
    #[error("invalid page name: {0}")]
    InvalidName(String),

    #[error("page {0} not found")]
    NotFound(String),

    #[error("page {page} is not valid JSON: {source}")]
    Corrupt {
        page: String,
        source: serde_json::Error,
    },

    #[error("i/o error on page content: {0}")]
    Io(#[from] std::io::Error),
}

/// PageStore
///
/// JSON documents backing the static site pages (home, about, iso, ...), one
/// `<name>.json` file per page under the content directory.
#[derive(Clone)]
pub struct PageStore {
    root: Arc<PathBuf>,
}

/// Lowercase letters, digits and hyphens only, so a name can never leave the
/// content directory.
pub fn is_valid_page_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

impl PageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, page: &str) -> Result<PathBuf, PageStoreError> {
        if !is_valid_page_name(page) {
            return Err(PageStoreError::InvalidName(page.to_string()));
        }
        Ok(self.root.join(format!("{page}.json")))
    }

    /// Names of every stored page, sorted.
    pub async fn list(&self) -> Result<Vec<String>, PageStoreError> {
        let mut entries = match tokio::fs::read_dir(self.root.as_path()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if is_valid_page_name(name) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub async fn read(&self, page: &str) -> Result<Value, PageStoreError> {
        let path = self.path_for(page)?;
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PageStoreError::NotFound(page.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw).map_err(|source| PageStoreError::Corrupt {
            page: page.to_string(),
            source,
        })
    }

    /// write
    ///
    /// Writes to a sibling temp file and renames it over the target, so readers
    /// see either the old or the new document, never a partial one.
    pub async fn write(&self, page: &str, content: &Value) -> Result<(), PageStoreError> {
        let path = self.path_for(page)?;
        tokio::fs::create_dir_all(self.root.as_path()).await?;

        let body = serde_json::to_vec_pretty(content).map_err(|source| PageStoreError::Corrupt {
            page: page.to_string(),
            source,
        })?;

        let tmp = self.root.join(format!(".{page}.{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::info!(page, path = %path.display(), "page content written");
        Ok(())
    }
}
