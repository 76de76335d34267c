//! JsonFileStore - ストレージキーごとに JSON ファイル 1 つ
//!
//! `<dir>/<key>.json` にキュー全体を書き込みます。
//! 書き込みは一時ファイル → rename で行い、途中で落ちても壊れたファイルを残さない。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::{QueuedRequest, StoreError};
use crate::ports::QueueStore;

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// `key` is the storage key (e.g. `@sync_queue`); characters that are not
    /// safe in a file name are replaced with `_`.
    pub fn new(dir: impl Into<PathBuf>, key: &str) -> Self {
        let file_name = format!("{}.json", sanitize_key(key));
        Self {
            path: dir.into().join(file_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '@' | '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl QueueStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<QueuedRequest>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(queue) => Ok(queue),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "stored sync queue is corrupt, starting empty"
                );
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, queue: &[QueuedRequest]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(queue)?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
