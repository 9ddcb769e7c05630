use derive_more::Display;
use time::OffsetDateTime;

/// Payload field that doesn't satisfy its schema.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Error {
    #[display("`{_0}` must be a non-empty string")]
    Empty(&'static str),

    #[display("`{_0}` must be a valid date")]
    InvalidDate(&'static str),

    #[display("`{_0}` must be a positive integer")]
    InvalidId(&'static str),
}

pub fn non_empty(field: &'static str, value: String) -> Result<String, Error> {
    if value.is_empty() {
        return Err(Error::Empty(field));
    }
    Ok(value)
}

pub fn date(field: &'static str, value: &str) -> Result<OffsetDateTime, Error> {
    crate::api::date::parse(value).ok_or(Error::InvalidDate(field))
}
