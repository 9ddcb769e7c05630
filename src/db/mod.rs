pub mod event;
pub mod ticket;

use std::str::FromStr as _;

use derive_more::Display;

use crate::config;

use tokio_postgres::{error::SqlState, tls::NoTlsStream, NoTls, Socket};

pub use tokio_postgres::Error;

pub use self::{event::Event, ticket::Ticket};

pub type Connection = tokio_postgres::Connection<Socket, NoTlsStream>;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

pub async fn connect(
    config: config::Db,
) -> Result<(Client, Connection), Error> {
    let mut pg_config = tokio_postgres::Config::from_str(&config.url)?;
    pg_config.connect_timeout(config.connect_timeout);
    pg_config
        .connect(NoTls)
        .await
        .map(|(client, connection)| (Client(client), connection))
}

pub struct Client(tokio_postgres::Client);

impl Client {
    /// Creates the tables and constraints if they don't exist yet.
    pub async fn migrate(&self) -> Result<(), Error> {
        self.0.batch_execute(SCHEMA).await
    }
}

/// Whether the statement was rejected by a `UNIQUE` constraint.
pub fn is_unique_violation(err: &Error) -> bool {
    err.code() == Some(&SqlState::UNIQUE_VIOLATION)
}

/// Whether the statement referenced a missing row through a foreign key.
pub fn is_foreign_key_violation(err: &Error) -> bool {
    err.code() == Some(&SqlState::FOREIGN_KEY_VIOLATION)
}

/// Identifier that isn't a positive 32-bit integer.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[display("identifier must be a positive integer")]
pub struct InvalidId;

fn positive_id(value: i64) -> Result<i32, InvalidId> {
    i32::try_from(value)
        .ok()
        .filter(|id| *id > 0)
        .ok_or(InvalidId)
}

fn parse_positive_id(raw: &str) -> Result<i32, InvalidId> {
    // `i64::from_str` would accept a leading `+`.
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InvalidId);
    }
    raw.parse::<i64>().map_err(|_| InvalidId).and_then(positive_id)
}
