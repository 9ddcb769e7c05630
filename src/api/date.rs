//! Event dates on the wire.
//!
//! Rendered as UTC with millisecond precision (`2999-01-01T00:00:00.000Z`).
//! Accepted as RFC 3339 timestamps with any offset, or as bare calendar
//! dates meaning midnight UTC.

use serde::{de, ser, Deserialize as _, Deserializer, Serializer};
use time::{
    error, format_description::well_known::Rfc3339,
    macros::format_description, Date, OffsetDateTime,
};

/// Parses a date as accepted in request payloads.
///
/// Sub-millisecond precision is dropped, so a parsed date always renders
/// back to the value it compares equal to.
pub fn parse(raw: &str) -> Option<OffsetDateTime> {
    let date = OffsetDateTime::parse(raw, &Rfc3339).ok().or_else(|| {
        Date::parse(raw, format_description!("[year]-[month]-[day]"))
            .ok()
            .map(|d| d.midnight().assume_utc())
    })?;
    let date = to_utc(date).ok()?;
    date.replace_millisecond(date.millisecond()).ok()
}

/// Renders a date in UTC, if it's representable there.
pub fn render(date: OffsetDateTime) -> Option<String> {
    to_utc(date)
        .ok()?
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .ok()
}

// `OffsetDateTime::to_offset` panics when the result leaves the supported
// year range; going through the timestamp reports it instead.
fn to_utc(
    date: OffsetDateTime,
) -> Result<OffsetDateTime, error::ComponentRange> {
    OffsetDateTime::from_unix_timestamp_nanos(date.unix_timestamp_nanos())
}

pub fn serialize<S: Serializer>(
    date: &OffsetDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let rendered = render(*date).ok_or_else(|| {
        <S::Error as ser::Error>::custom("date out of range")
    })?;
    serializer.serialize_str(&rendered)
}

pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<OffsetDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| de::Error::custom("invalid date"))
}
