//! Purpose: Define the public API client surface for local book resolution.
//! Exports: `BookRef`, `LocalClient`, `StoreState`, and local person operations.
//! Role: Stable boundary for the CLI and server; mirrors CLI resolution rules.
//! Invariants: Named book refs resolve under the client's data directory.
//! Invariants: Operations pass through to `Book`; no caching of documents.

use crate::book_paths::{BookNameResolveError, default_data_dir, resolve_named_book_path};
use crate::core::book::Book;
use crate::core::error::{Error, ErrorKind};
use crate::core::person::{ContactFields, Person, PersonId};
use std::path::{Path, PathBuf};

pub type ApiResult<T> = Result<T, Error>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BookRef {
    Name(String),
    Path(PathBuf),
}

impl BookRef {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn describe(&self) -> String {
        match self {
            BookRef::Name(name) => name.clone(),
            BookRef::Path(path) => path.to_string_lossy().to_string(),
        }
    }

    fn resolve(&self, data_dir: &Path) -> ApiResult<PathBuf> {
        match self {
            BookRef::Name(name) => resolve_named_book_path(name, data_dir)
                .map_err(map_book_name_resolve_error),
            BookRef::Path(path) => Ok(path.clone()),
        }
    }
}

/// Reachability summary for the health endpoint. `ready` covers a readable
/// book file and a book that does not exist yet.
#[derive(Clone, Debug)]
pub struct StoreState {
    pub path: PathBuf,
    pub ready: bool,
    pub detail: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LocalClient {
    data_dir: PathBuf,
}

impl LocalClient {
    pub fn new() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn open_book(&self, book_ref: &BookRef) -> ApiResult<Book> {
        let path = book_ref.resolve(&self.data_dir)?;
        Ok(Book::at(path))
    }

    pub fn list_persons(&self, book_ref: &BookRef) -> ApiResult<Vec<Person>> {
        self.open_book(book_ref)?.list()
    }

    pub fn get_person(&self, book_ref: &BookRef, id: &PersonId) -> ApiResult<Person> {
        self.open_book(book_ref)?.get(id)
    }

    pub fn create_person(&self, book_ref: &BookRef, fields: ContactFields) -> ApiResult<Person> {
        self.open_book(book_ref)?.insert(fields)
    }

    pub fn update_person(
        &self,
        book_ref: &BookRef,
        id: &PersonId,
        fields: ContactFields,
    ) -> ApiResult<Person> {
        self.open_book(book_ref)?.update(id, fields)
    }

    pub fn delete_person(&self, book_ref: &BookRef, id: &PersonId) -> ApiResult<()> {
        self.open_book(book_ref)?.remove(id)
    }

    pub fn count_persons(&self, book_ref: &BookRef) -> ApiResult<usize> {
        self.open_book(book_ref)?.count()
    }

    pub fn store_state(&self, book_ref: &BookRef) -> ApiResult<StoreState> {
        let book = self.open_book(book_ref)?;
        let state = match book.probe() {
            Ok(()) => StoreState {
                path: book.path().to_path_buf(),
                ready: true,
                detail: None,
            },
            Err(err) => StoreState {
                path: book.path().to_path_buf(),
                ready: false,
                detail: err.message().map(str::to_string),
            },
        };
        Ok(state)
    }
}

impl Default for LocalClient {
    fn default() -> Self {
        Self::new()
    }
}

fn map_book_name_resolve_error(err: BookNameResolveError) -> Error {
    match err {
        BookNameResolveError::ContainsPathSeparator => {
            Error::new(ErrorKind::Usage).with_message("book name must not contain path separators")
        }
    }
}
