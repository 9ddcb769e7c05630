use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{api::validation, db};

pub use crate::db::event::Id;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Event {
    pub id: Id,
    pub name: String,
    #[serde(with = "crate::api::date")]
    pub date: OffsetDateTime,
}

impl From<db::Event> for Event {
    fn from(event: db::Event) -> Self {
        Self {
            id: event.id,
            name: event.name,
            date: event.date,
        }
    }
}

/// Body of `POST /events` and `PUT /events/:id`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Input {
    pub name: String,
    pub date: String,
}

impl Input {
    pub fn validate(self) -> Result<db::event::New, validation::Error> {
        Ok(db::event::New {
            name: validation::non_empty("name", self.name)?,
            date: validation::date("date", &self.date)?,
        })
    }
}
