//! BSON datetime encodings for optional and repeated timestamps, matching
//! `chrono_datetime_as_bson_datetime` used for the required ones.

use chrono::{DateTime, Utc};
use mongodb::bson;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod optional {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.map(bson::DateTime::from_chrono).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(Option::<bson::DateTime>::deserialize(deserializer)?.map(|d| d.to_chrono()))
    }
}

pub mod many {
    use super::*;

    pub fn serialize<S: Serializer>(
        values: &[DateTime<Utc>],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        values
            .iter()
            .copied()
            .map(bson::DateTime::from_chrono)
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<DateTime<Utc>>, D::Error> {
        Ok(Vec::<bson::DateTime>::deserialize(deserializer)?
            .into_iter()
            .map(|d| d.to_chrono())
            .collect())
    }
}
