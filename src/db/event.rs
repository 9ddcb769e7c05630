use std::{error::Error as StdError, str::FromStr};

use derive_more::Display;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Error, Row,
};

use super::{parse_positive_id, positive_id, Client, InvalidId};

#[derive(Clone, Debug)]
pub struct Event {
    pub id: Id,
    pub name: String,
    pub date: OffsetDateTime,
}

impl Event {
    /// Whether the event is no longer strictly in the future at `now`.
    pub fn has_passed(&self, now: OffsetDateTime) -> bool {
        self.date <= now
    }
}

/// Contents of an event that isn't stored yet, or replaces a stored one.
#[derive(Clone, Debug, PartialEq)]
pub struct New {
    pub name: String,
    pub date: OffsetDateTime,
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

impl TryFrom<i64> for Id {
    type Error = InvalidId;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        positive_id(value).map(Self)
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

fn from_row(row: Row) -> Event {
    Event {
        id: row.get("id"),
        name: row.get("name"),
        date: row.get("date"),
    }
}

impl Client {
    pub async fn get_events(&self) -> Result<Vec<Event>, Error> {
        const SQL: &str = "SELECT id, name, date \
                           FROM events \
                           ORDER BY id";
        Ok(self
            .0
            .query(SQL, &[])
            .await?
            .into_iter()
            .map(from_row)
            .collect())
    }

    pub async fn get_event_by_id(
        &self,
        id: Id,
    ) -> Result<Option<Event>, Error> {
        const SQL: &str = "SELECT id, name, date \
                           FROM events \
                           WHERE id = $1";
        Ok(self.0.query_opt(SQL, &[&id]).await?.map(from_row))
    }

    /// Stores a new event, returning [`None`] if one with the same name and
    /// date already exists.
    pub async fn insert_event(
        &self,
        event: &New,
    ) -> Result<Option<Event>, Error> {
        const SQL: &str = "\
            INSERT INTO events (name, date) \
            VALUES ($1, $2) \
            ON CONFLICT (name, date) DO NOTHING \
            RETURNING id, name, date";
        Ok(self
            .0
            .query_opt(SQL, &[&event.name, &event.date])
            .await?
            .map(from_row))
    }

    /// Replaces the name and date of the event, returning [`None`] if it
    /// doesn't exist.
    ///
    /// Colliding with another event fails with a unique violation, see
    /// [`super::is_unique_violation`].
    pub async fn update_event(
        &self,
        id: Id,
        event: &New,
    ) -> Result<Option<Event>, Error> {
        const SQL: &str = "\
            UPDATE events \
            SET name = $2, \
                date = $3 \
            WHERE id = $1 \
            RETURNING id, name, date";
        Ok(self
            .0
            .query_opt(SQL, &[&id, &event.name, &event.date])
            .await?
            .map(from_row))
    }
}
