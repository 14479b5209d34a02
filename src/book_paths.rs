//! Purpose: Shared data-directory and book-name path resolution helpers.
//! Exports: `default_data_dir` and `resolve_named_book_path`.
//! Role: Keep CLI and API-client path semantics aligned from one source.
//! Invariants: Default data directory is `$DIALDEX_DIR`, else `~/.dialdex/books`.
//! Invariants: Named book refs must not contain path separators.

use std::path::{Path, PathBuf};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum BookNameResolveError {
    ContainsPathSeparator,
}

pub(crate) fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("DIALDEX_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".dialdex").join("books")
}

pub(crate) fn resolve_named_book_path(
    name: &str,
    data_dir: &Path,
) -> Result<PathBuf, BookNameResolveError> {
    if name.contains('/') {
        return Err(BookNameResolveError::ContainsPathSeparator);
    }
    if name.ends_with(".dialdex") {
        return Ok(data_dir.join(name));
    }
    Ok(data_dir.join(format!("{name}.dialdex")))
}

#[cfg(test)]
mod tests {
    use super::{BookNameResolveError, resolve_named_book_path};
    use std::path::PathBuf;

    #[test]
    fn named_book_gets_extension() {
        let dir = PathBuf::from(".scratch/books");
        let path = resolve_named_book_path("home", &dir).expect("path");
        assert_eq!(path, PathBuf::from(".scratch/books/home.dialdex"));
    }

    #[test]
    fn named_book_keeps_suffix() {
        let dir = PathBuf::from(".scratch/books");
        let path = resolve_named_book_path("home.dialdex", &dir).expect("path");
        assert_eq!(path, PathBuf::from(".scratch/books/home.dialdex"));
    }

    #[test]
    fn named_book_rejects_slash() {
        let dir = PathBuf::from(".scratch/books");
        let err = resolve_named_book_path("foo/bar", &dir).expect_err("err");
        assert_eq!(err, BookNameResolveError::ContainsPathSeparator);
    }
}
