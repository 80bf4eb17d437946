use std::{
    env, io,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};

pub const APPLICATION_DIR_NAME: &str = "daybook";

/// Resolves the directory holding every store, the config file and the logs. An explicit
/// directory wins; otherwise $XDG_STATE_HOME or $HOME/.local/state is used (%APPDATA% on
/// Windows). The directory is created if it doesn't exist yet.
pub fn resolve_application_path(explicit: Option<&Path>) -> Result<PathBuf> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => default_application_path()?,
    };

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => {
            Err(v).with_context(|| format!("Failed to create application directory {path:?}"))
        }
    }
}

fn default_application_path() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let mut path = PathBuf::from(
            env::var("APPDATA").map_err(|_| anyhow!("APPDATA should be present on Windows"))?,
        );
        path.push(APPLICATION_DIR_NAME);
        Ok(path)
    }
    #[cfg(not(windows))]
    {
        let mut path = env::var("XDG_STATE_HOME")
            .map(PathBuf::from)
            .or_else(|_| {
                env::var("HOME").map(|home| {
                    let mut path = PathBuf::from(home);
                    path.push(".local/state");
                    path
                })
            })
            .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))?;
        path.push(APPLICATION_DIR_NAME);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::resolve_application_path;

    #[test]
    fn explicit_directory_is_created() -> Result<()> {
        let dir = tempdir()?;
        let nested = dir.path().join("a").join("b");
        let resolved = resolve_application_path(Some(&nested))?;
        assert_eq!(resolved, nested);
        assert!(nested.is_dir());
        Ok(())
    }
}
