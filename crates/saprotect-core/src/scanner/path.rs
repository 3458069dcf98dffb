use crate::error::Error;
use std::env;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Make `target` absolute against the working directory and fold away `.`
/// and `..` components lexically. Symlinks are not resolved, so the stored
/// path is the one the operator named.
pub fn absolute_target(target: &Path) -> io::Result<PathBuf> {
    let joined = if target.is_absolute() {
        target.to_path_buf()
    } else {
        env::current_dir()?.join(target)
    };
    Ok(normalize(&joined))
}

pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    result.components().next_back(),
                    Some(Component::RootDir) | Some(Component::Prefix(_)) | None
                ) {
                    result.pop();
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Base name stored alongside each record; informational only.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Record key for `path`. Names that are not valid UTF-8 are refused rather
/// than lossily converted, since two distinct names would share one key.
pub fn path_key(path: &Path) -> Result<String, Error> {
    path.to_str()
        .map(str::to_owned)
        .ok_or_else(|| Error::NonUtf8Path(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_dots() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/../x")), PathBuf::from("/x"));
    }

    #[test]
    fn test_absolute_target_joins_cwd() {
        let cwd = env::current_dir().unwrap();
        assert_eq!(absolute_target(Path::new("some/file.txt")).unwrap(), cwd.join("some/file.txt"));
        assert_eq!(absolute_target(Path::new("/etc/hosts")).unwrap(), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn test_file_name_of() {
        assert_eq!(file_name_of(Path::new("/x/y/a.txt")), "a.txt");
        assert_eq!(file_name_of(Path::new("/")), "");
    }

    #[test]
    fn test_path_key_keeps_utf8_paths() {
        assert_eq!(path_key(Path::new("/x/é.txt")).unwrap(), "/x/é.txt");
    }

    #[cfg(unix)]
    #[test]
    fn test_path_key_refuses_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let first = Path::new(OsStr::from_bytes(b"/x/a\xfe"));
        let second = Path::new(OsStr::from_bytes(b"/x/a\xff"));
        assert!(matches!(path_key(first), Err(Error::NonUtf8Path(_))));
        assert!(matches!(path_key(second), Err(Error::NonUtf8Path(_))));
    }
}
