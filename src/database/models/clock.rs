//! Serde helpers for time-of-day fields: accept `HH:MM` or `HH:MM:SS`, always
//! emit `HH:MM:SS`.

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serializer, de::Error};

use crate::database::document::{TIME_FORMAT, parse_clock};

pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&time.format(TIME_FORMAT))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_clock(&text).ok_or_else(|| D::Error::custom(format!("invalid time of day `{}`", text)))
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => super::serialize(time, serializer),
            None => serializer.serialize_none(),
        }
    }

    /// Null and blank strings are absent.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(text) if text.trim().is_empty() => Ok(None),
            Some(text) => parse_clock(&text)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid time of day `{}`", text))),
        }
    }
}
