/// Shared directory walk — "one decision per direct child".
///
/// Every operation starts here: validate the root, then pull regular files
/// one at a time from a `jwalk` iterator restricted to depth 1. The walker
/// runs serially and sorted by name and never descends through links, so
/// per-file processing order is deterministic and the caller may move or
/// delete the yielded file before asking for the next one.
use crate::error::{FailureKind, ItemFailure, TidyError};
use crate::model::DirectoryEntry;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Check that `dir` exists, is a directory and can be listed.
pub fn ensure_directory(dir: &Path) -> Result<(), TidyError> {
    let meta = fs::metadata(dir).map_err(|e| TidyError::from_io(dir, e))?;
    if !meta.is_dir() {
        return Err(TidyError::NotADirectory(dir.to_path_buf()));
    }
    // Opening the listing surfaces permission problems before any work starts.
    fs::read_dir(dir).map_err(|e| TidyError::from_io(dir, e))?;
    Ok(())
}

/// Lazy sequence of the regular files directly inside a directory.
///
/// Yields `Err(ItemFailure)` for children that could not be inspected; the
/// caller records these and keeps going.
pub struct TopLevelFiles {
    root: PathBuf,
    inner: Box<dyn Iterator<Item = Result<DirectoryEntry, ItemFailure>>>,
}

impl TopLevelFiles {
    /// The directory being walked.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Iterator for TopLevelFiles {
    type Item = Result<DirectoryEntry, ItemFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Start walking the regular files of `dir`, sorted by file name.
///
/// A symlink counts when its target is a regular file; the entry then
/// carries the target's size and modification time. Directories, links to
/// directories, dangling links and special files are skipped silently.
pub fn top_level_files(dir: &Path) -> Result<TopLevelFiles, TidyError> {
    ensure_directory(dir)?;

    let root = dir.to_path_buf();
    let walker = jwalk::WalkDir::new(&root)
        .min_depth(1)
        .max_depth(1)
        .sort(true)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::Serial);

    let fallback = root.clone();
    let inner = walker.into_iter().filter_map(move |entry_result| {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| fallback.clone());
                return Some(Err(ItemFailure::new(
                    path,
                    FailureKind::Io,
                    err.to_string(),
                )));
            }
        };

        let file_type = entry.file_type();
        if !file_type.is_file() && !file_type.is_symlink() {
            return None;
        }

        // Re-stat at the moment of use: the listing may be stale by the time
        // the caller reaches this entry.
        let path = entry.path();
        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.file_type().is_file() => {
                Some(Ok(DirectoryEntry::from_metadata(path, &meta)))
            }
            Ok(meta) if meta.file_type().is_symlink() => linked_file(path),
            Ok(_) => None,
            Err(err) => Some(Err(ItemFailure::from_io(path, &err))),
        }
    });

    Ok(TopLevelFiles {
        root,
        inner: Box::new(inner),
    })
}

/// Follow a top-level symlink and keep it only if it resolves to a file.
fn linked_file(path: PathBuf) -> Option<Result<DirectoryEntry, ItemFailure>> {
    match fs::metadata(&path) {
        Ok(target) if target.is_file() => Some(Ok(DirectoryEntry::from_metadata(path, &target))),
        Ok(_) => None,
        Err(err) => {
            debug!("Skipping dangling link {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(dir: &Path) -> Vec<String> {
        top_level_files(dir)
            .unwrap()
            .map(|r| r.unwrap().name.to_string())
            .collect()
    }

    #[test]
    fn missing_directory_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(matches!(
            ensure_directory(&missing),
            Err(TidyError::NotFound(p)) if p == missing
        ));
    }

    #[test]
    fn file_root_is_not_a_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.txt");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            top_level_files(&file),
            Err(TidyError::NotADirectory(_))
        ));
    }

    #[test]
    fn yields_only_regular_files_sorted_by_name() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.txt"), b"b").unwrap();
        fs::write(tmp.path().join("a.csv"), b"a").unwrap();
        fs::write(tmp.path().join(".hidden"), b"h").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub").join("nested.txt"), b"n").unwrap();

        assert_eq!(names(tmp.path()), vec![".hidden", "a.csv", "b.txt"]);
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        assert!(names(tmp.path()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn links_to_files_count_but_other_links_do_not() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        let dir = tmp.path().join("dir");
        fs::create_dir(&data).unwrap();
        fs::create_dir(&dir).unwrap();
        fs::write(data.join("real.txt"), b"twelve bytes").unwrap();
        fs::write(dir.join("plain.txt"), b"p").unwrap();
        symlink(data.join("real.txt"), dir.join("linked.txt")).unwrap();
        symlink(&data, dir.join("to_dir")).unwrap();
        symlink(data.join("gone.txt"), dir.join("dangling.txt")).unwrap();

        assert_eq!(names(&dir), vec!["linked.txt", "plain.txt"]);

        let linked = top_level_files(&dir).unwrap().next().unwrap().unwrap();
        assert_eq!(linked.path, dir.join("linked.txt"));
        assert_eq!(linked.size, 12, "size comes from the link target");
    }

    #[test]
    fn entries_carry_size_and_mtime() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.bin"), vec![0u8; 42]).unwrap();
        let mut files = top_level_files(tmp.path()).unwrap();
        assert_eq!(files.root(), tmp.path());
        let entry = files.next().unwrap().unwrap();
        assert_eq!(entry.size, 42);
        assert!(entry.modified.is_some());
        assert_eq!(entry.path, tmp.path().join("a.bin"));
    }
}
