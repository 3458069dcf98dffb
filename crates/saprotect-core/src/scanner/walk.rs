use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::error;
use walkdir::WalkDir;

/// One step of a target walk: a regular file to visit, or an entry that could
/// not be read (permissions, broken symlink, symlink loop).
#[derive(Debug)]
pub enum WalkItem {
    File(PathBuf),
    Unreadable { path: PathBuf, error: String },
}

pub fn compile_ignore_patterns(ignore_globs: &[String]) -> Vec<Pattern> {
    ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}

/// Visit every regular file under `target`, following symlinks. A file target
/// yields exactly itself. Entries matching an ignore pattern are pruned, and
/// so is everything beneath an ignored directory.
pub fn walk_files<'a>(
    target: &Path,
    ignore_patterns: &'a [Pattern],
) -> impl Iterator<Item = WalkItem> + 'a {
    WalkDir::new(target)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            !ignore_patterns
                .iter()
                .any(|pattern| pattern.matches_path(entry.path()))
        })
        .filter_map(|entry_result| match entry_result {
            Ok(entry) if entry.file_type().is_file() => {
                Some(WalkItem::File(entry.into_path()))
            }
            Ok(_) => None,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                Some(WalkItem::Unreadable {
                    path,
                    error: err.to_string(),
                })
            }
        })
}
