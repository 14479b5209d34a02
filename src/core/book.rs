//! Purpose: File-backed JSON document store for one phonebook.
//! Exports: `Book`.
//! Role: Persistence collaborator; owns locking, durability, and the
//! entity-level constraints (non-empty fields, unique names).
//! Invariants: Every read-modify-write holds the exclusive sidecar lock, so
//! the unique-name index cannot race with a concurrent insert or rename.
//! Invariants: The data file is replaced atomically (temp + rename); a
//! missing file reads as an empty book.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind};
use crate::core::person::{ContactFields, Person, PersonId};

#[derive(Clone, Debug)]
pub struct Book {
    path: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BookDoc {
    persons: Vec<Person>,
}

impl Book {
    /// Bind a book to its data file. No I/O happens until an operation runs.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> Result<Vec<Person>, Error> {
        let _guard = self.lock_shared()?;
        Ok(self.load()?.persons)
    }

    pub fn count(&self) -> Result<usize, Error> {
        let _guard = self.lock_shared()?;
        Ok(self.load()?.persons.len())
    }

    pub fn get(&self, id: &PersonId) -> Result<Person, Error> {
        let _guard = self.lock_shared()?;
        let doc = self.load()?;
        doc.persons
            .into_iter()
            .find(|person| &person.id == id)
            .ok_or_else(|| self.missing(id))
    }

    pub fn insert(&self, fields: ContactFields) -> Result<Person, Error> {
        fields.validate()?;
        let _guard = self.lock_exclusive()?;
        let mut doc = self.load()?;
        if doc.persons.iter().any(|person| person.name == fields.name) {
            return Err(self.name_taken(&fields.name));
        }
        let person = Person {
            id: PersonId::generate()?,
            name: fields.name,
            number: fields.number,
        };
        doc.persons.push(person.clone());
        self.persist(&doc)?;
        Ok(person)
    }

    pub fn update(&self, id: &PersonId, fields: ContactFields) -> Result<Person, Error> {
        fields.validate()?;
        let _guard = self.lock_exclusive()?;
        let mut doc = self.load()?;
        // Missing ids miss before the uniqueness check runs; a ghost id must
        // not turn into a name conflict.
        let position = doc
            .persons
            .iter()
            .position(|person| &person.id == id)
            .ok_or_else(|| self.missing(id))?;
        if doc
            .persons
            .iter()
            .any(|person| person.name == fields.name && &person.id != id)
        {
            return Err(self.name_taken(&fields.name));
        }
        let person = &mut doc.persons[position];
        person.name = fields.name;
        person.number = fields.number;
        let updated = person.clone();
        self.persist(&doc)?;
        Ok(updated)
    }

    pub fn remove(&self, id: &PersonId) -> Result<(), Error> {
        let _guard = self.lock_exclusive()?;
        let mut doc = self.load()?;
        let before = doc.persons.len();
        doc.persons.retain(|person| &person.id != id);
        if doc.persons.len() == before {
            return Err(self.missing(id));
        }
        self.persist(&doc)
    }

    /// Metadata-only reachability probe for the health endpoint. Never reads
    /// stored documents; a missing file is reachable (created on first write).
    pub fn probe(&self) -> Result<(), Error> {
        match std::fs::metadata(&self.path) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::new(map_io_error_kind(&err))
                .with_message("book file is not accessible")
                .with_path(&self.path)
                .with_source(err)),
        }
    }

    fn load(&self) -> Result<BookDoc, Error> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(BookDoc::default());
            }
            Err(err) => {
                return Err(Error::new(map_io_error_kind(&err))
                    .with_message("failed to read book file")
                    .with_path(&self.path)
                    .with_source(err));
            }
        };
        serde_json::from_str(&raw).map_err(|err| {
            let detail = if err.is_data() {
                "book file has an unexpected shape"
            } else {
                "book file is not valid JSON"
            };
            Error::new(ErrorKind::Corrupt)
                .with_message(detail)
                .with_path(&self.path)
                .with_source(err)
        })
    }

    fn persist(&self, doc: &BookDoc) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to create book directory")
                    .with_path(parent)
                    .with_source(err)
            })?;
        }
        let payload = serde_json::to_vec_pretty(doc).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode book document")
                .with_source(err)
        })?;
        let tmp_path = sidecar_path(&self.path, "tmp");
        let mut tmp = File::create(&tmp_path).map_err(|err| {
            Error::new(map_io_error_kind(&err))
                .with_message("failed to create temp book file")
                .with_path(&tmp_path)
                .with_source(err)
        })?;
        tmp.write_all(&payload)
            .and_then(|()| tmp.sync_all())
            .map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to write temp book file")
                    .with_path(&tmp_path)
                    .with_source(err)
            })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to replace book file")
                .with_path(&self.path)
                .with_source(err)
        })
    }

    fn lock_shared(&self) -> Result<BookLock, Error> {
        let file = self.open_lock_file()?;
        file.lock_shared().map_err(|err| {
            Error::new(lock_error_kind(&err))
                .with_message("failed to lock book")
                .with_path(&self.path)
                .with_source(err)
        })?;
        Ok(BookLock { file })
    }

    fn lock_exclusive(&self) -> Result<BookLock, Error> {
        let file = self.open_lock_file()?;
        file.lock_exclusive().map_err(|err| {
            Error::new(lock_error_kind(&err))
                .with_message("failed to lock book")
                .with_path(&self.path)
                .with_source(err)
        })?;
        Ok(BookLock { file })
    }

    // The lock lives on a sidecar file that is never replaced, so the
    // temp+rename swap of the data file cannot strand a waiter on a dead
    // inode.
    fn open_lock_file(&self) -> Result<File, Error> {
        let lock_path = sidecar_path(&self.path, "lock");
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to create book directory")
                    .with_path(parent)
                    .with_source(err)
            })?;
        }
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|err| {
                Error::new(map_io_error_kind(&err))
                    .with_message("failed to open book lock file")
                    .with_path(&lock_path)
                    .with_source(err)
            })
    }

    fn missing(&self, id: &PersonId) -> Error {
        Error::new(ErrorKind::NotFound)
            .with_message("person not found")
            .with_path(&self.path)
            .with_hint(format!("No person with id {id} in this book."))
    }

    fn name_taken(&self, name: &str) -> Error {
        Error::new(ErrorKind::AlreadyExists)
            .with_message("name already exists")
            .with_path(&self.path)
            .with_hint(format!("A person named {name:?} is already listed."))
    }
}

struct BookLock {
    file: File,
}

impl Drop for BookLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn lock_error_kind(err: &io::Error) -> ErrorKind {
    match err.kind() {
        io::ErrorKind::WouldBlock => ErrorKind::Busy,
        _ => ErrorKind::Io,
    }
}

fn map_io_error_kind(err: &io::Error) -> ErrorKind {
    match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        _ => ErrorKind::Io,
    }
}
