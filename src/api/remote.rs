//! Purpose: Provide an HTTP client for the dialdex phonebook API.
//! Exports: `RemoteClient`.
//! Role: Transport client that mirrors local person operations remotely.
//! Invariants: Error envelopes round-trip the server's `ErrorKind` verbatim.
//! Invariants: A server always serves exactly one book; refs stay server-side.

use crate::core::error::{Error, ErrorKind};
use crate::core::person::{ContactFields, Person, PersonId};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

type ApiResult<T> = Result<T, Error>;

#[derive(Clone, Debug)]
pub struct RemoteClient {
    base_url: Url,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct PersonEnvelope {
    person: Person,
}

#[derive(Deserialize)]
struct PersonsEnvelope {
    persons: Vec<Person>,
}

#[derive(Deserialize)]
struct HealthEnvelope {
    status: String,
    store: StoreStatus,
}

#[derive(Deserialize)]
struct StoreStatus {
    state: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: RemoteError,
}

#[derive(Deserialize)]
struct RemoteError {
    kind: String,
    message: Option<String>,
    hint: Option<String>,
}

#[derive(Serialize)]
struct ContactPayload<'a> {
    name: &'a str,
    number: &'a str,
}

/// Liveness summary as reported by `GET /health`.
#[derive(Clone, Debug)]
pub struct RemoteHealth {
    pub status: String,
    pub store_state: String,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let agent = ureq::AgentBuilder::new().build();
        Ok(Self { base_url, agent })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn list_persons(&self) -> ApiResult<Vec<Person>> {
        let url = build_url(&self.base_url, &["api", "persons"])?;
        let envelope: PersonsEnvelope = self.request_json::<(), _>("GET", &url, None)?;
        Ok(envelope.persons)
    }

    pub fn get_person(&self, id: &PersonId) -> ApiResult<Person> {
        let url = build_url(&self.base_url, &["api", "persons", id.as_str()])?;
        let envelope: PersonEnvelope = self.request_json::<(), _>("GET", &url, None)?;
        Ok(envelope.person)
    }

    pub fn create_person(&self, fields: &ContactFields) -> ApiResult<Person> {
        let url = build_url(&self.base_url, &["api", "persons"])?;
        let payload = ContactPayload {
            name: &fields.name,
            number: &fields.number,
        };
        let envelope: PersonEnvelope = self.request_json("POST", &url, Some(&payload))?;
        Ok(envelope.person)
    }

    pub fn update_person(&self, id: &PersonId, fields: &ContactFields) -> ApiResult<Person> {
        let url = build_url(&self.base_url, &["api", "persons", id.as_str()])?;
        let payload = ContactPayload {
            name: &fields.name,
            number: &fields.number,
        };
        let envelope: PersonEnvelope = self.request_json("PUT", &url, Some(&payload))?;
        Ok(envelope.person)
    }

    pub fn delete_person(&self, id: &PersonId) -> ApiResult<()> {
        let url = build_url(&self.base_url, &["api", "persons", id.as_str()])?;
        let response = self.request("DELETE", &url).call();
        match response {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp)),
            Err(ureq::Error::Transport(err)) => Err(transport_error(err)),
        }
    }

    pub fn info(&self) -> ApiResult<String> {
        let url = build_url(&self.base_url, &["info"])?;
        let response = self.request("GET", &url).call();
        match response {
            Ok(resp) => resp.into_string().map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read info response")
                    .with_source(err)
            }),
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp)),
            Err(ureq::Error::Transport(err)) => Err(transport_error(err)),
        }
    }

    pub fn health(&self) -> ApiResult<RemoteHealth> {
        let url = build_url(&self.base_url, &["health"])?;
        let envelope: HealthEnvelope = self.request_json::<(), _>("GET", &url, None)?;
        Ok(RemoteHealth {
            status: envelope.status,
            store_state: envelope.store.state,
        })
    }

    fn request_json<T, R>(&self, method: &str, url: &Url, body: Option<&T>) -> ApiResult<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let request = self.request(method, url).set("Accept", "application/json");
        let response = match body {
            None => request.call(),
            Some(body) => {
                let payload = serde_json::to_string(body).map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to encode request json")
                        .with_source(err)
                })?;
                request
                    .set("Content-Type", "application/json")
                    .send_string(&payload)
            }
        };

        match response {
            Ok(resp) => read_json_response(resp),
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp)),
            Err(ureq::Error::Transport(err)) => Err(transport_error(err)),
        }
    }

    fn request(&self, method: &str, url: &Url) -> ureq::Request {
        self.agent.request(method, url.as_str())
    }
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid server url")
            .with_source(err)
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("server url must use http or https")
            .with_hint("Use a base url like http://127.0.0.1:4151."));
    }
    Ok(url)
}

fn build_url(base: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base.clone();
    {
        let mut parts = url.path_segments_mut().map_err(|()| {
            Error::new(ErrorKind::Usage).with_message("server url cannot carry paths")
        })?;
        parts.pop_if_empty();
        for segment in segments {
            parts.push(segment);
        }
    }
    Ok(url)
}

fn read_json_response<R: DeserializeOwned>(resp: ureq::Response) -> ApiResult<R> {
    let body = resp.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("unexpected response payload")
            .with_source(err)
    })
}

fn parse_error_response(code: u16, resp: ureq::Response) -> Error {
    let body = match resp.into_string() {
        Ok(body) => body,
        Err(err) => {
            return Error::new(ErrorKind::Io)
                .with_message(format!("server returned status {code}"))
                .with_source(err);
        }
    };
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => {
            let mut err = Error::new(kind_from_str(&envelope.error.kind));
            if let Some(message) = envelope.error.message {
                err = err.with_message(message);
            }
            if let Some(hint) = envelope.error.hint {
                err = err.with_hint(hint);
            }
            err
        }
        Err(_) => Error::new(ErrorKind::Internal)
            .with_message(format!("server returned status {code} with an unexpected payload")),
    }
}

fn transport_error(err: ureq::Transport) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("request failed")
        .with_source(err)
}

fn kind_from_str(kind: &str) -> ErrorKind {
    match kind {
        "Usage" => ErrorKind::Usage,
        "Invalid" => ErrorKind::Invalid,
        "NotFound" => ErrorKind::NotFound,
        "AlreadyExists" => ErrorKind::AlreadyExists,
        "Busy" => ErrorKind::Busy,
        "Corrupt" => ErrorKind::Corrupt,
        "Io" => ErrorKind::Io,
        _ => ErrorKind::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, RemoteClient, build_url, kind_from_str, normalize_base_url};

    #[test]
    fn base_url_requires_http_scheme() {
        let err = RemoteClient::new("ftp://example").expect_err("scheme");
        assert_eq!(err.kind(), ErrorKind::Usage);

        RemoteClient::new("http://127.0.0.1:4151").expect("http ok");
    }

    #[test]
    fn urls_join_path_segments() {
        let base = normalize_base_url("http://127.0.0.1:4151".to_string()).expect("base");
        let url = build_url(&base, &["api", "persons", "abc"]).expect("url");
        assert_eq!(url.as_str(), "http://127.0.0.1:4151/api/persons/abc");
    }

    #[test]
    fn unknown_error_kinds_fall_back_to_internal() {
        assert_eq!(kind_from_str("NotFound"), ErrorKind::NotFound);
        assert_eq!(kind_from_str("Gremlins"), ErrorKind::Internal);
    }
}
