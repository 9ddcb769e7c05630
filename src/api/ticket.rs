use serde::{Deserialize, Serialize};

use crate::{api::validation, db};

pub use crate::db::ticket::Id;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Id,
    pub owner: String,
    pub code: String,
    pub event_id: db::event::Id,
    pub used: bool,
}

impl From<db::Ticket> for Ticket {
    fn from(ticket: db::Ticket) -> Self {
        Self {
            id: ticket.id,
            owner: ticket.owner,
            code: ticket.code,
            event_id: ticket.event_id,
            used: ticket.used,
        }
    }
}

/// Body of `POST /tickets`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Input {
    pub owner: String,
    pub code: String,
    pub event_id: i64,
}

impl Input {
    pub fn validate(self) -> Result<db::ticket::New, validation::Error> {
        Ok(db::ticket::New {
            owner: validation::non_empty("owner", self.owner)?,
            code: validation::non_empty("code", self.code)?,
            event_id: db::event::Id::try_from(self.event_id)
                .map_err(|_| validation::Error::InvalidId("eventId"))?,
        })
    }
}
