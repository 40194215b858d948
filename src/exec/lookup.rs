// src/exec/lookup.rs

//! Resolve a command token to an absolute executable path.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Why a command token could not be resolved.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("exec: no command")]
    Empty,

    #[error("executable file not found in $PATH")]
    NotFound,

    #[error("file is not an executable")]
    NotExecutable,

    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Resolve `token` the way a shell would.
///
/// - A token containing `/` names a file directly; it is made absolute
///   against the current directory and must be an executable file.
/// - Otherwise every non-empty entry of `search_path` is tried in order and
///   the first executable regular file wins.
pub fn lookup_command(token: &str, search_path: Option<&OsStr>) -> Result<PathBuf, LookupError> {
    if token.is_empty() {
        return Err(LookupError::Empty);
    }

    if token.contains('/') {
        let path = std::path::absolute(token)?;
        let meta = std::fs::metadata(&path)?;
        if meta.is_file() && is_executable(&path) {
            return Ok(path);
        }
        return Err(LookupError::NotExecutable);
    }

    let Some(search_path) = search_path else {
        return Err(LookupError::NotFound);
    };

    for dir in std::env::split_paths(search_path) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let candidate = dir.join(token);
        if candidate.is_file() && is_executable(&candidate) {
            return Ok(std::path::absolute(candidate)?);
        }
    }

    Err(LookupError::NotFound)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use tempfile::TempDir;

    use super::*;

    fn write_file(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn finds_executable_in_search_path() {
        let dir = TempDir::new().unwrap();
        let tool = write_file(dir.path(), "tool", 0o755);

        let found = lookup_command("tool", Some(dir.path().as_os_str())).unwrap();
        assert_eq!(found, tool);
        assert!(found.is_absolute());
    }

    #[test]
    fn skips_non_executable_candidates() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write_file(first.path(), "tool", 0o644);
        let wanted = write_file(second.path(), "tool", 0o755);

        let path = std::env::join_paths([first.path(), second.path()]).unwrap();
        assert_eq!(lookup_command("tool", Some(&path)).unwrap(), wanted);
    }

    #[test]
    fn missing_command_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = lookup_command("definitely-not-a-real-command-xyz", Some(dir.path().as_os_str()))
            .unwrap_err();
        assert!(matches!(err, LookupError::NotFound));
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(matches!(lookup_command("", None), Err(LookupError::Empty)));
    }

    #[test]
    fn path_tokens_bypass_the_search_path() {
        let dir = TempDir::new().unwrap();
        let tool = write_file(dir.path(), "direct", 0o755);
        let token = tool.to_str().unwrap();

        assert_eq!(lookup_command(token, None).unwrap(), tool);

        let plain = write_file(dir.path(), "plain", 0o644);
        assert!(matches!(
            lookup_command(plain.to_str().unwrap(), None),
            Err(LookupError::NotExecutable)
        ));

        let missing = dir.path().join("missing");
        assert!(matches!(
            lookup_command(missing.to_str().unwrap(), None),
            Err(LookupError::Io(_))
        ));
    }
}
