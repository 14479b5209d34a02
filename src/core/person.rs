//! Purpose: Phonebook domain entity and identifier handling.
//! Exports: `Person`, `PersonId`, `ContactFields`.
//! Role: Shared document shape for the store, the HTTP surface, and the CLI.
//! Invariants: Identifiers are exactly 24 lowercase hex characters.
//! Invariants: `name` and `number` are literally non-empty; whitespace-only
//! values are accepted.

use crate::core::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ID_LEN: usize = 24;

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PersonId(String);

impl PersonId {
    /// Parse an identifier from request input. Anything that is not exactly
    /// 24 lowercase hex characters is a malformed reference, distinct from a
    /// well-formed identifier that matches no record.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let well_formed = raw.len() == ID_LEN
            && raw
                .bytes()
                .all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte));
        if !well_formed {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("malformed person id")
                .with_hint("Person ids are 24 lowercase hex characters."));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn generate() -> Result<Self, Error> {
        let mut bytes = [0u8; ID_LEN / 2];
        getrandom::fill(&mut bytes).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to generate person id")
                .with_source(err)
        })?;
        let mut out = String::with_capacity(ID_LEN);
        for byte in bytes {
            out.push_str(&format!("{byte:02x}"));
        }
        Ok(Self(out))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub number: String,
}

/// The mutable fields of a person. Entity-level constraints are re-checked on
/// every save, at update time exactly as at creation time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContactFields {
    pub name: String,
    pub number: String,
}

impl ContactFields {
    pub fn new(name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(Error::new(ErrorKind::Invalid).with_message("name must not be empty"));
        }
        if self.number.is_empty() {
            return Err(Error::new(ErrorKind::Invalid).with_message("number must not be empty"));
        }
        Ok(())
    }
}
