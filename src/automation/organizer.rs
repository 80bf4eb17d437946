use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::ValueEnum;
use tracing::{debug, warn};

pub const NO_EXTENSION_FOLDER: &str = "no_extension";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrganizeBy {
    /// Lower-cased extension without the dot.
    Extension,
    /// Month of the last modification, `YYYY-MM`.
    Date,
}

#[derive(Debug, Default, PartialEq)]
pub struct OrganizeReport {
    /// File name and the folder it was moved into.
    pub moved: Vec<(String, String)>,
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Default, PartialEq)]
pub struct RenameReport {
    pub renamed: Vec<(String, String)>,
    pub failed: Vec<(String, String)>,
}

fn extension_folder(path: &Path) -> String {
    path.extension()
        .map(|v| v.to_string_lossy().to_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| NO_EXTENSION_FOLDER.to_string())
}

async fn date_folder(path: &Path) -> Result<String> {
    let modified = tokio::fs::metadata(path).await?.modified()?;
    Ok(DateTime::<Local>::from(modified).format("%Y-%m").to_string())
}

async fn ensure_dir(dir: &Path) -> Result<()> {
    if !tokio::fs::try_exists(dir).await? {
        bail!("Directory {dir:?} does not exist");
    }
    Ok(())
}

/// Moves every regular file directly inside `dir` into a sub folder. Nested directories are left
/// alone; a file that can't be moved is reported and the rest carry on.
pub async fn organize(dir: &Path, by: OrganizeBy) -> Result<OrganizeReport> {
    ensure_dir(dir).await?;

    let mut files = vec![];
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list {dir:?}"))?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let mut report = OrganizeReport::default();
    for path in files {
        let name = path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default();
        let moved = async {
            let folder = match by {
                OrganizeBy::Extension => extension_folder(&path),
                OrganizeBy::Date => date_folder(&path).await?,
            };
            let destination = dir.join(&folder);
            tokio::fs::create_dir_all(&destination).await?;
            let target = destination.join(&name);
            if tokio::fs::try_exists(&target).await? {
                bail!("{folder}/{name} already exists");
            }
            tokio::fs::rename(&path, target).await?;
            anyhow::Ok(folder)
        }
        .await;

        match moved {
            Ok(folder) => {
                debug!("Moved {name} to {folder}");
                report.moved.push((name, folder));
            }
            Err(e) => {
                warn!("Failed to move {name}: {e:?}");
                report.failed.push((name, e.to_string()));
            }
        }
    }
    Ok(report)
}

/// Renames every entry directly inside `dir` whose name contains `old`, replacing all of its
/// occurrences with `new`.
pub async fn rename_matching(dir: &Path, old: &str, new: &str) -> Result<RenameReport> {
    if old.is_empty() {
        bail!("Pattern to replace cannot be empty");
    }
    ensure_dir(dir).await?;

    let mut names = vec![];
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list {dir:?}"))?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.contains(old) {
            names.push(name);
        }
    }
    names.sort();

    let mut report = RenameReport::default();
    for name in names {
        let renamed = name.replace(old, new);
        let target: PathBuf = dir.join(&renamed);
        let result = if tokio::fs::try_exists(&target).await? {
            Err(anyhow::anyhow!("{renamed} already exists"))
        } else {
            tokio::fs::rename(dir.join(&name), &target)
                .await
                .map_err(anyhow::Error::from)
        };

        match result {
            Ok(()) => report.renamed.push((name, renamed)),
            Err(e) => {
                warn!("Failed to rename {name}: {e:?}");
                report.failed.push((name, e.to_string()));
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::Result;
    use chrono::{DateTime, Local};
    use tempfile::tempdir;

    use super::{organize, rename_matching, OrganizeBy, NO_EXTENSION_FOLDER};

    #[tokio::test]
    async fn organize_by_extension() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("report.PDF"), "a")?;
        fs::write(dir.path().join("notes.txt"), "b")?;
        fs::write(dir.path().join("Makefile"), "c")?;
        fs::create_dir(dir.path().join("nested"))?;
        fs::write(dir.path().join("nested").join("inner.txt"), "d")?;

        let report = organize(dir.path(), OrganizeBy::Extension).await?;
        assert_eq!(report.moved.len(), 3);
        assert!(report.failed.is_empty());
        assert!(dir.path().join("pdf").join("report.PDF").is_file());
        assert!(dir.path().join("txt").join("notes.txt").is_file());
        assert!(dir.path().join(NO_EXTENSION_FOLDER).join("Makefile").is_file());
        assert!(dir.path().join("nested").join("inner.txt").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn organize_keeps_existing_files() -> Result<()> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("txt"))?;
        fs::write(dir.path().join("txt").join("a.txt"), "old")?;
        fs::write(dir.path().join("a.txt"), "new")?;

        let report = organize(dir.path(), OrganizeBy::Extension).await?;
        assert!(report.moved.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "a.txt");
        assert_eq!(fs::read_to_string(dir.path().join("txt").join("a.txt"))?, "old");
        assert_eq!(fs::read_to_string(dir.path().join("a.txt"))?, "new");
        Ok(())
    }

    #[tokio::test]
    async fn organize_by_modification_month() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("photo.jpg");
        fs::write(&path, "a")?;
        let month = DateTime::<Local>::from(fs::metadata(&path)?.modified()?)
            .format("%Y-%m")
            .to_string();

        let report = organize(dir.path(), OrganizeBy::Date).await?;
        assert_eq!(report.moved, vec![("photo.jpg".to_string(), month.clone())]);
        assert!(dir.path().join(month).join("photo.jpg").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        assert!(organize("/definitely/not/here".as_ref(), OrganizeBy::Extension)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn rename_replaces_every_occurrence() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("draft_draft.txt"), "a")?;
        fs::write(dir.path().join("final.txt"), "b")?;
        fs::write(dir.path().join("draft.md"), "c")?;
        fs::write(dir.path().join("v2.md"), "taken")?;

        let report = rename_matching(dir.path(), "draft", "v2").await?;
        assert_eq!(
            report.renamed,
            vec![("draft_draft.txt".to_string(), "v2_v2.txt".to_string())]
        );
        assert_eq!(report.failed.len(), 1);
        assert!(dir.path().join("v2_v2.txt").is_file());
        assert!(dir.path().join("final.txt").is_file());
        assert_eq!(fs::read_to_string(dir.path().join("v2.md"))?, "taken");
        Ok(())
    }
}
