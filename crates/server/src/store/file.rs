//! Local file mirror: one `<dir>/<node>.json` document per node.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;

use super::{node_key, RemoteStore, StoreError};

#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn node_path(&self, path: &str) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(format!("{}.json", node_key(path)?)))
    }
}

#[async_trait]
impl RemoteStore for FileStore {
    async fn read_node(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let file = self.node_path(path)?;
        let bytes = match fs::read(&file).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::ReadFailed(format!("{}: {e}", file.display()))),
        };
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::ReadFailed(format!("{}: {e}", file.display())))?;
        Ok((!value.is_null()).then_some(value))
    }

    async fn write_node(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        let file = self.node_path(path)?;
        let write_err = |e: std::io::Error| StoreError::WriteFailed(format!("{}: {e}", file.display()));

        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        let bytes = serde_json::to_vec(value)
            .map_err(|e| StoreError::WriteFailed(format!("{}: {e}", file.display())))?;

        // Write beside the target, then rename over it so readers only ever
        // see a complete document.
        let tmp = file.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&tmp, &bytes).await.map_err(write_err)?;
        if let Err(e) = fs::rename(&tmp, &file).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }
        Ok(())
    }
}
