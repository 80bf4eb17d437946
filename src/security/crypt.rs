//! In-place file encryption.
//!
//! Encrypted files start with a small header followed by XChaCha20-Poly1305 ciphertext:
//!
//! | bytes | content                                   |
//! |-------|-------------------------------------------|
//! | 6     | magic `DBKENC`                            |
//! | 1     | format version, currently 1               |
//! | 1     | key mode, 0 for a key file, 1 for password |
//! | 16    | Argon2 salt, password mode only           |
//! | 24    | nonce                                     |
//!
//! Key files hold 32 random bytes encoded as URL-safe base64.

use std::{
    ffi::OsString,
    fmt::Display,
    future::Future,
    io,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use argon2::Argon2;
use base64::{prelude::BASE64_URL_SAFE, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use futures::{stream, StreamExt};
use rand::RngCore;
use tokio::fs;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::{config::EncryptionConfig, error::DaybookError};

pub const KEY_FILE_NAME: &str = "key.key";

const MAGIC: &[u8; 6] = b"DBKENC";
const FORMAT_VERSION: u8 = 1;
const MODE_KEY_FILE: u8 = 0;
const MODE_PASSWORD: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;
const BACKUP_SUFFIX: &str = ".backup";
/// Files processed at the same time by the batch operations.
const BATCH_CONCURRENCY: usize = 4;

/// Where the encryption key comes from.
pub enum KeySource {
    KeyFile([u8; 32]),
    /// A key is derived for every file from the password and the salt stored in its header.
    Password(String),
}

/// Writes a new key file, or loads the existing one instead of overwriting it.
pub async fn generate_key(path: &Path) -> Result<[u8; 32]> {
    if fs::try_exists(path).await? {
        warn!("Key file already exists at {path:?}. Using existing key.");
        return load_key(path).await;
    }

    let mut key = [0u8; 32];
    rand::rng().fill_bytes(&mut key);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, BASE64_URL_SAFE.encode(key))
        .await
        .map_err(|e| DaybookError::KeyManagement(format!("cannot write key file {path:?}: {e}")))?;
    info!("Generated new encryption key at {path:?}");
    Ok(key)
}

pub async fn load_key(path: &Path) -> Result<[u8; 32]> {
    let content = fs::read_to_string(path).await.map_err(|e| {
        DaybookError::KeyManagement(format!("encryption key not found at {path:?}: {e}"))
    })?;
    let decoded = BASE64_URL_SAFE
        .decode(content.trim())
        .map_err(|_| DaybookError::KeyManagement(format!("invalid key format in {path:?}")))?;
    let key = <[u8; 32]>::try_from(decoded.as_slice())
        .map_err(|_| DaybookError::KeyManagement(format!("invalid key length in {path:?}")))?;
    info!("Loaded encryption key from {path:?}");
    Ok(key)
}

/// Argon2 is slow on purpose, so it runs on the blocking pool.
async fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; 32]> {
    let password = password.to_owned();
    let salt = salt.to_vec();
    tokio::task::spawn_blocking(move || {
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(password.as_bytes(), &salt, &mut key)
            .map_err(|e| DaybookError::KeyManagement(format!("failed to derive key: {e}")))?;
        anyhow::Ok(key)
    })
    .await?
}

impl KeySource {
    fn mode(&self) -> u8 {
        match self {
            KeySource::KeyFile(_) => MODE_KEY_FILE,
            KeySource::Password(_) => MODE_PASSWORD,
        }
    }

    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(plaintext.len() + 64);
        output.extend_from_slice(MAGIC);
        output.push(FORMAT_VERSION);
        output.push(self.mode());

        let key = match self {
            KeySource::KeyFile(key) => *key,
            KeySource::Password(password) => {
                let mut salt = [0u8; SALT_LEN];
                rand::rng().fill_bytes(&mut salt);
                output.extend_from_slice(&salt);
                derive_key(password, &salt).await?
            }
        };

        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);
        output.extend_from_slice(&nonce);

        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key));
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| anyhow!("failed to encrypt payload"))?;
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    /// Fails for anything that isn't a file encrypted with this key.
    async fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let not_ours = || anyhow!("File is not encrypted or uses a different key");

        let rest = data.strip_prefix(MAGIC.as_slice()).ok_or_else(not_ours)?;
        let [version, mode, rest @ ..] = rest else {
            return Err(not_ours());
        };
        if *version != FORMAT_VERSION || *mode != self.mode() {
            return Err(not_ours());
        }

        let (key, rest) = match self {
            KeySource::KeyFile(key) => (*key, rest),
            KeySource::Password(password) => {
                if rest.len() < SALT_LEN {
                    return Err(not_ours());
                }
                let (salt, rest) = rest.split_at(SALT_LEN);
                (derive_key(password, salt).await?, rest)
            }
        };
        if rest.len() < NONCE_LEN {
            return Err(not_ours());
        }
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

        XChaCha20Poly1305::new(Key::from_slice(&key))
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| not_ours())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Success,
    Skipped,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
    pub message: String,
}

impl FileOutcome {
    fn new(path: &Path, status: FileStatus, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct CollectedFiles {
    pub supported: Vec<PathBuf>,
    pub unsupported: Vec<PathBuf>,
    pub errors: Vec<String>,
}

fn has_allowed_extension(path: &Path, allowed_extensions: &[String]) -> bool {
    let Some(extension) = path.extension() else {
        return false;
    };
    let extension = format!(".{}", extension.to_string_lossy().to_lowercase());
    allowed_extensions
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
}

/// Classifies files by extension. Directories are walked recursively.
pub fn collect_supported_files(paths: &[PathBuf], allowed_extensions: &[String]) -> CollectedFiles {
    let mut collected = CollectedFiles::default();
    let classify = |path: PathBuf, collected: &mut CollectedFiles| {
        if has_allowed_extension(&path, allowed_extensions) {
            collected.supported.push(path);
        } else {
            collected.unsupported.push(path);
        }
    };

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(false) {
                match entry {
                    Ok(entry) if entry.file_type().is_file() => {
                        classify(entry.into_path(), &mut collected)
                    }
                    Ok(_) => (),
                    Err(e) => collected
                        .errors
                        .push(format!("Error processing {path:?}: {e}")),
                }
            }
        } else if path.is_file() {
            classify(path.clone(), &mut collected);
        } else if path.exists() {
            collected
                .errors
                .push(format!("Path is not a file or directory: {path:?}"));
        } else {
            collected
                .errors
                .push(format!("Path does not exist: {path:?}"));
        }
    }
    collected
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Encryption,
    Decryption,
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Encryption => write!(f, "Encryption"),
            Operation::Decryption => write!(f, "Decryption"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Completed,
    CompletedWithWarnings,
    CompletedWithErrors,
}

impl Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::Completed => write!(f, "COMPLETED"),
            OperationStatus::CompletedWithWarnings => write!(f, "COMPLETED WITH WARNINGS"),
            OperationStatus::CompletedWithErrors => write!(f, "COMPLETED WITH ERRORS"),
        }
    }
}

#[derive(Debug)]
pub struct BatchReport {
    pub operation: Operation,
    pub supported_count: usize,
    pub unsupported: Vec<PathBuf>,
    pub path_errors: Vec<String>,
    pub results: Vec<FileOutcome>,
    pub status: OperationStatus,
}

impl BatchReport {
    fn count(&self, status: FileStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn successful(&self) -> usize {
        self.count(FileStatus::Success)
    }

    pub fn skipped(&self) -> usize {
        self.count(FileStatus::Skipped)
    }

    pub fn errors(&self) -> usize {
        self.count(FileStatus::Error)
    }
}

pub struct FileCrypt {
    key: KeySource,
    max_file_size: u64,
    allowed_extensions: Vec<String>,
}

impl FileCrypt {
    pub fn new(key: KeySource, config: &EncryptionConfig) -> Self {
        Self {
            key,
            max_file_size: config.max_file_size,
            allowed_extensions: config.allowed_extensions.clone(),
        }
    }

    /// Reads a file that is about to be rewritten, or explains why it can't be.
    async fn read_writable(&self, path: &Path) -> Result<Vec<u8>, String> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| format!("Cannot access file: {e}"))?;
        if metadata.permissions().readonly() {
            return Err("Insufficient file permissions (need read/write access)".into());
        }
        if metadata.len() > self.max_file_size {
            return Err(format!(
                "File too large (max {}MB)",
                self.max_file_size / (1024 * 1024)
            ));
        }
        fs::read(path)
            .await
            .map_err(|e| format!("Cannot read file: {e}"))
    }

    pub async fn encrypt_file(&self, path: &Path) -> FileOutcome {
        let content = match self.read_writable(path).await {
            Ok(content) => content,
            Err(message) => return FileOutcome::new(path, FileStatus::Error, message),
        };
        if content.is_empty() {
            return FileOutcome::new(path, FileStatus::Skipped, "File is empty");
        }
        if self.key.decrypt(&content).await.is_ok() {
            return FileOutcome::new(path, FileStatus::Skipped, "File already encrypted");
        }

        let result = match self.key.encrypt(&content).await {
            Ok(encrypted) => replace_contents(path, &encrypted).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                info!("Encrypted: {path:?}");
                FileOutcome::new(path, FileStatus::Success, "File encrypted successfully")
            }
            Err(e) => {
                error!("Error encrypting {path:?}: {e:?}");
                FileOutcome::new(path, FileStatus::Error, format!("Encryption failed: {e}"))
            }
        }
    }

    pub async fn decrypt_file(&self, path: &Path) -> FileOutcome {
        let content = match self.read_writable(path).await {
            Ok(content) => content,
            Err(message) => return FileOutcome::new(path, FileStatus::Error, message),
        };
        if content.is_empty() {
            return FileOutcome::new(path, FileStatus::Error, "File is empty");
        }
        let decrypted = match self.key.decrypt(&content).await {
            Ok(decrypted) => decrypted,
            Err(e) => return FileOutcome::new(path, FileStatus::Error, e.to_string()),
        };

        match replace_contents(path, &decrypted).await {
            Ok(()) => {
                info!("Decrypted: {path:?}");
                FileOutcome::new(path, FileStatus::Success, "File decrypted successfully")
            }
            Err(e) => {
                error!("Error decrypting {path:?}: {e:?}");
                FileOutcome::new(path, FileStatus::Error, format!("Decryption failed: {e}"))
            }
        }
    }

    pub async fn encrypt_files(&self, paths: &[PathBuf]) -> BatchReport {
        self.run_batch(Operation::Encryption, paths).await
    }

    pub async fn decrypt_files(&self, paths: &[PathBuf]) -> BatchReport {
        self.run_batch(Operation::Decryption, paths).await
    }

    async fn run_batch(&self, operation: Operation, paths: &[PathBuf]) -> BatchReport {
        info!("{operation} operation started for {} paths", paths.len());
        let collected = collect_supported_files(paths, &self.allowed_extensions);

        let results = stream::iter(collected.supported.iter())
            .map(|path| async move {
                match operation {
                    Operation::Encryption => self.encrypt_file(path).await,
                    Operation::Decryption => self.decrypt_file(path).await,
                }
            })
            .buffered(BATCH_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        let mut report = BatchReport {
            operation,
            supported_count: collected.supported.len(),
            unsupported: collected.unsupported,
            path_errors: collected.errors,
            results,
            status: OperationStatus::Completed,
        };
        report.status = if report.errors() > 0 || !report.path_errors.is_empty() {
            OperationStatus::CompletedWithErrors
        } else if report.skipped() > 0 || report.supported_count == 0 {
            OperationStatus::CompletedWithWarnings
        } else {
            OperationStatus::Completed
        };
        info!("{operation} operation {}", report.status);
        report
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut backup = OsString::from(path.as_os_str());
    backup.push(BACKUP_SUFFIX);
    PathBuf::from(backup)
}

async fn replace_contents(path: &Path, contents: &[u8]) -> Result<()> {
    replace_with(path, fs::write(path, contents)).await
}

/// Runs `write` over a file keeping a `.backup` copy for its duration. The copy is put back when
/// the write fails and removed in every case.
async fn replace_with(path: &Path, write: impl Future<Output = io::Result<()>>) -> Result<()> {
    let backup = backup_path(path);
    let backed_up = match fs::copy(path, &backup).await {
        Ok(_) => true,
        Err(e) => {
            warn!("Could not create backup for {path:?}: {e}");
            false
        }
    };

    let result = write
        .await
        .with_context(|| format!("Failed to write {path:?}"));

    if result.is_err() && backed_up {
        if let Err(e) = fs::rename(&backup, path).await {
            error!("Failed to restore backup for {path:?}: {e}");
        }
    }
    if fs::try_exists(&backup).await.unwrap_or(false) {
        if let Err(e) = fs::remove_file(&backup).await {
            warn!("Failed to remove backup {backup:?}: {e}");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use anyhow::Result;
    use tempfile::tempdir;

    use crate::{config::EncryptionConfig, error::DaybookError};

    use super::{
        backup_path, collect_supported_files, generate_key, load_key, replace_with, FileCrypt,
        FileStatus, KeySource, OperationStatus, KEY_FILE_NAME,
    };

    const CONTENT: &[u8] = b"quarterly numbers, do not share";

    async fn key_file_crypt(dir: &std::path::Path) -> Result<FileCrypt> {
        let key = generate_key(&dir.join(KEY_FILE_NAME)).await?;
        Ok(FileCrypt::new(
            KeySource::KeyFile(key),
            &EncryptionConfig::default(),
        ))
    }

    #[tokio::test]
    async fn encrypt_then_decrypt_restores_content() -> Result<()> {
        let dir = tempdir()?;
        let crypt = key_file_crypt(dir.path()).await?;
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, CONTENT)?;

        let encrypted = crypt.encrypt_file(&file).await;
        assert_eq!(encrypted.status, FileStatus::Success);
        let on_disk = std::fs::read(&file)?;
        assert_ne!(on_disk, CONTENT);
        assert!(on_disk.starts_with(b"DBKENC"));
        assert!(!backup_path(&file).exists());

        let decrypted = crypt.decrypt_file(&file).await;
        assert_eq!(decrypted.status, FileStatus::Success);
        assert_eq!(std::fs::read(&file)?, CONTENT);
        assert!(!backup_path(&file).exists());
        Ok(())
    }

    #[tokio::test]
    async fn failed_write_restores_original() -> Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("ledger.txt");
        std::fs::write(&file, CONTENT)?;

        let result = replace_with(&file, async {
            std::fs::write(&file, b"half written")?;
            Err(std::io::Error::other("disk full"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read(&file)?, CONTENT);
        assert!(!backup_path(&file).exists());
        Ok(())
    }

    #[tokio::test]
    async fn password_mode_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("photo.png");
        std::fs::write(&file, CONTENT)?;
        let crypt = FileCrypt::new(
            KeySource::Password("correct horse".into()),
            &EncryptionConfig::default(),
        );

        assert_eq!(crypt.encrypt_file(&file).await.status, FileStatus::Success);

        let wrong = FileCrypt::new(
            KeySource::Password("battery staple".into()),
            &EncryptionConfig::default(),
        );
        assert_eq!(wrong.decrypt_file(&file).await.status, FileStatus::Error);

        assert_eq!(crypt.decrypt_file(&file).await.status, FileStatus::Success);
        assert_eq!(std::fs::read(&file)?, CONTENT);
        Ok(())
    }

    #[tokio::test]
    async fn special_files_are_skipped_or_rejected() -> Result<()> {
        let dir = tempdir()?;
        let crypt = key_file_crypt(dir.path()).await?;

        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, b"")?;
        assert_eq!(crypt.encrypt_file(&empty).await.status, FileStatus::Skipped);
        assert_eq!(crypt.decrypt_file(&empty).await.status, FileStatus::Error);

        let twice = dir.path().join("twice.txt");
        std::fs::write(&twice, CONTENT)?;
        crypt.encrypt_file(&twice).await;
        let again = crypt.encrypt_file(&twice).await;
        assert_eq!(again.status, FileStatus::Skipped);
        assert_eq!(again.message, "File already encrypted");

        let plain = dir.path().join("plain.txt");
        std::fs::write(&plain, CONTENT)?;
        let outcome = crypt.decrypt_file(&plain).await;
        assert_eq!(outcome.status, FileStatus::Error);
        assert_eq!(std::fs::read(&plain)?, CONTENT);

        let small_limit = FileCrypt::new(
            KeySource::KeyFile([7; 32]),
            &EncryptionConfig {
                max_file_size: 4,
                ..EncryptionConfig::default()
            },
        );
        let outcome = small_limit.encrypt_file(&plain).await;
        assert_eq!(outcome.status, FileStatus::Error);
        assert!(outcome.message.starts_with("File too large"));
        Ok(())
    }

    #[tokio::test]
    async fn existing_key_is_reused_and_bad_keys_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(KEY_FILE_NAME);
        let first = generate_key(&path).await?;
        let second = generate_key(&path).await?;
        assert_eq!(first, second);
        assert_eq!(load_key(&path).await?, first);

        std::fs::write(&path, "not a key")?;
        let err = load_key(&path).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DaybookError>(),
            Some(DaybookError::KeyManagement(_))
        ));
        assert!(load_key(&dir.path().join("missing.key")).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn files_are_collected_by_extension() -> Result<()> {
        let dir = tempdir()?;
        std::fs::create_dir(dir.path().join("nested"))?;
        std::fs::write(dir.path().join("a.PDF"), CONTENT)?;
        std::fs::write(dir.path().join("nested/b.txt"), CONTENT)?;
        std::fs::write(dir.path().join("nested/c.rs"), CONTENT)?;
        let missing = dir.path().join("missing");

        let collected = collect_supported_files(
            &[dir.path().to_path_buf(), missing],
            &EncryptionConfig::default().allowed_extensions,
        );
        let mut supported = collected
            .supported
            .iter()
            .filter_map(|p| p.file_name())
            .map(|p| p.to_string_lossy().to_string())
            .collect::<Vec<_>>();
        supported.sort();
        assert_eq!(supported, vec!["a.PDF", "b.txt"]);
        assert_eq!(collected.unsupported.len(), 1);
        assert_eq!(collected.errors.len(), 1);
        assert!(collected.errors[0].starts_with("Path does not exist"));
        Ok(())
    }

    #[tokio::test]
    async fn batch_continues_after_failures() -> Result<()> {
        let dir = tempdir()?;
        let crypt = key_file_crypt(dir.path()).await?;
        let good = dir.path().join("good.txt");
        let empty = dir.path().join("empty.txt");
        std::fs::write(&good, CONTENT)?;
        std::fs::write(&empty, b"")?;
        let paths = vec![good.clone(), empty, PathBuf::from("/definitely/missing.txt")];

        let report = crypt.encrypt_files(&paths).await;
        assert_eq!(report.supported_count, 2);
        assert_eq!(report.successful(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.path_errors.len(), 1);
        assert_eq!(report.status, OperationStatus::CompletedWithErrors);

        let report = crypt.decrypt_files(&[good.clone()]).await;
        assert_eq!(report.status, OperationStatus::Completed);
        assert_eq!(std::fs::read(&good)?, CONTENT);
        Ok(())
    }
}
