use std::{
    io::ErrorKind,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use fs4::tokio::AsyncFileExt;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, warn};

/// A CSV file with a header row, one `T` per row.
pub struct CsvStore<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> CsvStore<T> {
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
        let buffer = match read_locked(&self.path).await {
            Ok(buffer) => buffer,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {:?}", self.path)),
        };

        let mut reader = csv::Reader::from_reader(buffer.as_slice());
        let mut records = vec![];
        for (row, record) in reader.deserialize::<T>().enumerate() {
            match record {
                Ok(v) => records.push(v),
                // Row numbers are 1-based and skip the header.
                Err(e) => warn!("Skipping illegal row {} in {:?}: {e}", row + 2, self.path),
            }
        }
        debug!("Loaded {} rows from {:?}", records.len(), self.path);
        Ok(records)
    }

    /// Appends one row, writing the header first when the file is new or empty.
    pub async fn append(&self, record: &T) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = File::options()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open {:?}", self.path))?;

        file.lock_exclusive()?;
        let result = async {
            let is_empty = file.seek(std::io::SeekFrom::End(0)).await? == 0;
            let mut writer = csv::WriterBuilder::new()
                .has_headers(is_empty)
                .from_writer(vec![]);
            writer.serialize(record)?;
            let buffer = writer.into_inner().map_err(|e| e.into_error())?;
            file.write_all(&buffer).await?;
            file.flush().await?;
            anyhow::Ok(())
        }
        .await;
        file.unlock_async().await?;
        result.with_context(|| format!("Failed to append to {:?}", self.path))
    }
}

async fn read_locked(path: &Path) -> std::result::Result<Vec<u8>, std::io::Error> {
    let mut file = File::open(path).await?;
    file.lock_shared()?;
    let mut buffer = Vec::new();
    let result = file.read_to_end(&mut buffer).await;
    file.unlock_async().await?;
    result?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    use super::CsvStore;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        date: String,
        amount: f64,
        note: Option<String>,
    }

    #[tokio::test]
    async fn header_is_written_once() -> Result<()> {
        let dir = tempdir()?;
        let store = CsvStore::<Row>::new(dir.path().join("rows.csv"));
        store
            .append(&Row {
                date: "2024-01-01".into(),
                amount: 1.5,
                note: None,
            })
            .await?;
        store
            .append(&Row {
                date: "2024-01-02".into(),
                amount: 2.0,
                note: Some("lunch".into()),
            })
            .await?;

        let content = std::fs::read_to_string(store.path())?;
        assert_eq!(content.lines().next(), Some("date,amount,note"));
        assert_eq!(content.lines().count(), 3);

        let rows = store.load().await?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].note, None);
        assert_eq!(rows[1].note.as_deref(), Some("lunch"));
        Ok(())
    }

    #[tokio::test]
    async fn illegal_rows_are_skipped() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "date,amount,note\n2024-01-01,abc,\n2024-01-02,3.25,\n")?;
        let rows = CsvStore::<Row>::new(path).load().await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, 3.25);
        Ok(())
    }
}
