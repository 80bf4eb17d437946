use std::{
    io::ErrorKind,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use fs4::tokio::AsyncFileExt;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, warn};

/// A JSON array file of `T`. Entries that can't be parsed are dropped with a warning instead of
/// failing the whole load, because the files are meant to be edited by hand as well.
pub struct JsonStore<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonStore<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Vec<T>> {
        let Some(values) = read_json_file::<serde_json::Value>(&self.path).await? else {
            return Ok(vec![]);
        };

        let serde_json::Value::Array(values) = values else {
            bail!("Store {:?} doesn't contain a JSON array", self.path);
        };

        let mut records = Vec::with_capacity(values.len());
        for value in values {
            match serde_json::from_value::<T>(value.clone()) {
                Ok(v) => records.push(v),
                Err(e) => {
                    warn!(
                        "During parsing in path {:?} found illegal record {}: {e}",
                        self.path, value
                    )
                }
            }
        }
        debug!("Loaded {} records from {:?}", records.len(), self.path);
        Ok(records)
    }

    pub async fn save(&self, records: &[T]) -> Result<()> {
        write_json_file(&self.path, &records).await?;
        debug!("Saved {} records into {:?}", records.len(), self.path);
        Ok(())
    }
}

/// Reads a whole JSON document. A missing or empty file is `None`.
pub async fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    async fn extract(path: &Path) -> std::result::Result<Vec<u8>, std::io::Error> {
        let mut file = File::open(path).await?;
        file.lock_shared()?;
        let mut buffer = Vec::new();
        let result = file.read_to_end(&mut buffer).await;
        file.unlock_async().await?;
        result?;
        Ok(buffer)
    }

    let buffer = match extract(path).await {
        Ok(buffer) => buffer,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {path:?}")),
    };

    if buffer.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value = serde_json::from_slice(&buffer)
        .with_context(|| format!("Failed to parse JSON in {path:?}"))?;
    Ok(Some(value))
}

/// Rewrites a whole JSON document. The file is truncated only after the exclusive lock is held.
pub async fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {parent:?}"))?;
    }

    let mut buffer = serde_json::to_vec_pretty(value)?;
    buffer.push(b'\n');

    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .await
        .with_context(|| format!("Failed to open {path:?}"))?;

    // Semi-safe acquire-release for a file
    file.lock_exclusive()?;
    let result = async {
        file.set_len(0).await?;
        file.rewind().await?;
        file.write_all(&buffer).await?;
        file.flush().await
    }
    .await;
    file.unlock_async().await?;
    result.with_context(|| format!("Failed to write {path:?}"))
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    use super::{read_json_file, JsonStore};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        name: String,
        value: u32,
    }

    #[tokio::test]
    async fn missing_file_is_empty_store() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::<Entry>::new(dir.path().join("missing.json"));
        assert!(store.load().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn save_then_load() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::<Entry>::new(dir.path().join("nested").join("entries.json"));
        let entries = vec![
            Entry {
                name: "a".into(),
                value: 1,
            },
            Entry {
                name: "b".into(),
                value: 2,
            },
        ];
        store.save(&entries).await?;
        assert_eq!(store.load().await?, entries);

        // Rewriting with fewer records must not leave a tail of the previous content.
        store.save(&entries[..1]).await?;
        assert_eq!(store.load().await?, entries[..1]);
        Ok(())
    }

    #[tokio::test]
    async fn illegal_records_are_skipped() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("entries.json");
        std::fs::write(
            &path,
            r#"[{"name": "ok", "value": 1}, {"name": 5}, {"name": "fine", "value": 2}]"#,
        )?;
        let store = JsonStore::<Entry>::new(path);
        let loaded = store.load().await?;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].name, "fine");
        Ok(())
    }

    #[tokio::test]
    async fn non_array_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("entries.json");
        std::fs::write(&path, r#"{"name": "ok", "value": 1}"#)?;
        let store = JsonStore::<Entry>::new(path);
        assert!(store.load().await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn whitespace_document_reads_as_none() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("doc.json");
        std::fs::write(&path, "  \n")?;
        assert!(read_json_file::<Entry>(&path).await?.is_none());
        Ok(())
    }
}
