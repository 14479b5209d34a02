//! Purpose: Hold top-level CLI command dispatch for `dialdex`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Output envelopes match the server's (`persons`/`person` keys).
//! Invariants: Local and remote targets produce identical error kinds.

use std::io;
use std::net::SocketAddr;

use clap::CommandFactory;
use serde_json::json;
use time::format_description::well_known::Rfc3339;

use dialdex::api::{
    BookRef, ContactFields, Error, ErrorKind, LocalClient, Person, PersonId, RemoteClient,
};
use dialdex::serve;

use super::{Cli, Command, RunOutcome};

const DEFAULT_BOOK: &str = "home";
const DEFAULT_PORT: u16 = 4151;

enum Target {
    Local { client: LocalClient, book: BookRef },
    Remote(RemoteClient),
}

pub(super) fn dispatch_command(cli: Cli) -> Result<RunOutcome, Error> {
    let Cli {
        dir,
        book,
        server,
        command,
    } = cli;

    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "dialdex", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Serve {
            bind,
            max_body_bytes,
        } => {
            if server.is_some() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("serve does not support --server")
                    .with_hint("The serve command starts a server; point --server at one instead."));
            }
            let config = serve::ServeConfig {
                bind: resolve_bind(bind.as_deref())?,
                data_dir: dir,
                book: book.unwrap_or_else(|| DEFAULT_BOOK.to_string()),
                max_body_bytes,
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(RunOutcome::ok())
        }
        Command::List => {
            let persons = match resolve_target(dir, book, server)? {
                Target::Local { client, book } => client.list_persons(&book)?,
                Target::Remote(client) => client.list_persons()?,
            };
            emit_json(&json!({ "persons": persons }));
            Ok(RunOutcome::ok())
        }
        Command::Add { name, number } => {
            let fields = contact_fields(name, number)?;
            let person = match resolve_target(dir, book, server)? {
                Target::Local { client, book } => client.create_person(&book, fields)?,
                Target::Remote(client) => client.create_person(&fields)?,
            };
            emit_person(&person);
            Ok(RunOutcome::ok())
        }
        Command::Get { id } => {
            let id = PersonId::parse(&id)?;
            let person = match resolve_target(dir, book, server)? {
                Target::Local { client, book } => client.get_person(&book, &id)?,
                Target::Remote(client) => client.get_person(&id)?,
            };
            emit_person(&person);
            Ok(RunOutcome::ok())
        }
        Command::Update { id, name, number } => {
            let id = PersonId::parse(&id)?;
            let fields = contact_fields(name, number)?;
            let person = match resolve_target(dir, book, server)? {
                Target::Local { client, book } => client.update_person(&book, &id, fields)?,
                Target::Remote(client) => client.update_person(&id, &fields)?,
            };
            emit_person(&person);
            Ok(RunOutcome::ok())
        }
        Command::Remove { id } => {
            let id = PersonId::parse(&id)?;
            match resolve_target(dir, book, server)? {
                Target::Local { client, book } => client.delete_person(&book, &id)?,
                Target::Remote(client) => client.delete_person(&id)?,
            }
            emit_json(&json!({ "removed": { "id": id.as_str() } }));
            Ok(RunOutcome::ok())
        }
        Command::Info => {
            let summary = match resolve_target(dir, book, server)? {
                Target::Local { client, book } => {
                    let count = client.count_persons(&book)?;
                    format!("Phonebook has info for {count} people\n{}\n", rfc3339_now()?)
                }
                Target::Remote(client) => client.info()?,
            };
            print!("{summary}");
            Ok(RunOutcome::ok())
        }
    }
}

fn resolve_target(
    dir: Option<std::path::PathBuf>,
    book: Option<String>,
    server: Option<String>,
) -> Result<Target, Error> {
    match server {
        Some(server) => {
            if dir.is_some() || book.is_some() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("--dir and --book do not apply to remote commands")
                    .with_hint("The server chooses its own book; drop the local flags."));
            }
            Ok(Target::Remote(RemoteClient::new(server)?))
        }
        None => {
            let mut client = LocalClient::new();
            if let Some(dir) = dir {
                client = client.with_data_dir(dir);
            }
            let book = BookRef::name(book.unwrap_or_else(|| DEFAULT_BOOK.to_string()));
            Ok(Target::Local { client, book })
        }
    }
}

/// Same required-field check the HTTP handlers run: empty values are a usage
/// error before the store ever sees the request.
fn contact_fields(name: String, number: String) -> Result<ContactFields, Error> {
    if name.is_empty() || number.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("name and number are required"));
    }
    Ok(ContactFields::new(name, number))
}

fn resolve_bind(bind: Option<&str>) -> Result<SocketAddr, Error> {
    if let Some(bind) = bind {
        return bind.parse().map_err(|_| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid bind address")
                .with_hint("Use a host:port value like 127.0.0.1:4151.")
        });
    }
    let port = match std::env::var("PORT") {
        Ok(raw) => raw.parse::<u16>().map_err(|_| {
            Error::new(ErrorKind::Usage)
                .with_message("PORT must be a port number")
                .with_hint("Unset PORT or use a value like 4151.")
        })?,
        Err(_) => DEFAULT_PORT,
    };
    Ok(SocketAddr::from(([127, 0, 0, 1], port)))
}

fn rfc3339_now() -> Result<String, Error> {
    time::OffsetDateTime::now_utc().format(&Rfc3339).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to format timestamp")
            .with_source(err)
    })
}

fn emit_person(person: &Person) {
    emit_json(&json!({ "person": person }));
}

fn emit_json(value: &serde_json::Value) {
    println!("{value}");
}
