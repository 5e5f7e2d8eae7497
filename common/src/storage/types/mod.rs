use std::fmt;

use chrono::{DateTime, Utc};
use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize,
};
use surrealdb::sql::{Id, Thing};

pub mod document;
pub mod message;

pub trait StoredObject: for<'de> Deserialize<'de> {
    fn table_name() -> &'static str;
}

/// Engine-assigned integer key of a record. Strictly increasing and never
/// reused within one datastore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(pub i64);

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordKey {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

struct RecordKeyVisitor;

impl<'de> Visitor<'de> for RecordKeyVisitor {
    type Value = RecordKey;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an integer or a Thing with a numeric id")
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(RecordKey(value))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        i64::try_from(value)
            .map(RecordKey)
            .map_err(|_| E::custom(format!("record key {value} out of range")))
    }

    fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
    where
        A: de::MapAccess<'de>,
    {
        let thing = Thing::deserialize(de::value::MapAccessDeserializer::new(map))?;
        match thing.id {
            Id::Number(value) => Ok(RecordKey(value)),
            other => Err(de::Error::custom(format!(
                "expected a numeric record id on {}, got {}",
                thing.tb, other
            ))),
        }
    }
}

pub fn deserialize_record_key<'de, D>(deserializer: D) -> Result<RecordKey, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(RecordKeyVisitor)
}

pub fn deserialize_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let dt = surrealdb::sql::Datetime::deserialize(deserializer)?;
    Ok(DateTime::<Utc>::from(dt))
}
