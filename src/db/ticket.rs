use std::{error::Error as StdError, str::FromStr};

use derive_more::Display;
use serde::{Deserialize, Serialize};
use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Error, Row,
};

use super::{event, parse_positive_id, Client, InvalidId};

#[derive(Clone, Debug)]
pub struct Ticket {
    pub id: Id,
    pub owner: String,
    pub code: String,
    pub event_id: event::Id,
    pub used: bool,
}

/// Ticket that isn't stored yet. Always starts unused.
#[derive(Clone, Debug, PartialEq)]
pub struct New {
    pub owner: String,
    pub code: String,
    pub event_id: event::Id,
}

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize,
)]
pub struct Id(i32);

impl FromStr for Id {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_positive_id(s).map(Self)
    }
}

impl FromSql<'_> for Id {
    accepts!(INT4);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        i32::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for Id {
    accepts!(INT4);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

fn from_row(row: Row) -> Ticket {
    Ticket {
        id: row.get("id"),
        owner: row.get("owner"),
        code: row.get("code"),
        event_id: row.get("event_id"),
        used: row.get("used"),
    }
}

impl Client {
    pub async fn get_tickets_by_event(
        &self,
        event_id: event::Id,
    ) -> Result<Vec<Ticket>, Error> {
        const SQL: &str = "SELECT id, owner, code, event_id, used \
                           FROM tickets \
                           WHERE event_id = $1 \
                           ORDER BY id";
        Ok(self
            .0
            .query(SQL, &[&event_id])
            .await?
            .into_iter()
            .map(from_row)
            .collect())
    }

    pub async fn get_ticket_by_id(
        &self,
        id: Id,
    ) -> Result<Option<Ticket>, Error> {
        const SQL: &str = "SELECT id, owner, code, event_id, used \
                           FROM tickets \
                           WHERE id = $1";
        Ok(self.0.query_opt(SQL, &[&id]).await?.map(from_row))
    }

    /// Stores a new ticket, returning [`None`] if the event already has a
    /// ticket with the same code.
    pub async fn insert_ticket(
        &self,
        ticket: &New,
    ) -> Result<Option<Ticket>, Error> {
        const SQL: &str = "\
            INSERT INTO tickets (owner, code, event_id) \
            VALUES ($1, $2, $3) \
            ON CONFLICT (code, event_id) DO NOTHING \
            RETURNING id, owner, code, event_id, used";
        Ok(self
            .0
            .query_opt(SQL, &[&ticket.owner, &ticket.code, &ticket.event_id])
            .await?
            .map(from_row))
    }

    /// Flips the ticket to used. Returns `false` if it was already used (or
    /// doesn't exist), so two concurrent redemptions can't both succeed.
    pub async fn mark_ticket_used(&self, id: Id) -> Result<bool, Error> {
        const SQL: &str = "\
            UPDATE tickets \
            SET used = TRUE \
            WHERE id = $1 AND NOT used";
        Ok(self.0.execute(SQL, &[&id]).await? == 1)
    }
}
