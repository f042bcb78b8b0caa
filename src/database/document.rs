//! Conversion between typed records and stored documents.
//!
//! Documents only hold JSON scalars, so dates, times and datetimes are written as
//! strings and recognised again on the way back by their shape:
//!
//! * a string containing both `T` and `:` is tried as an ISO-8601 datetime,
//! * otherwise a 10 character string containing `-` is tried as `YYYY-MM-DD`,
//! * otherwise an 8 character string containing `:` is tried as `HH:MM:SS`.
//!
//! A string that has the shape but does not parse is kept as text.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Timelike, Utc};
use serde_json::{Number, Value};
use thiserror::Error;

use crate::database::store::Document;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
const CLOCK_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

pub type Record = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<Utc>),
    Map(Record),
    List(Vec<FieldValue>),
}

impl FieldValue {
    fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "a boolean",
            FieldValue::Number(_) => "a number",
            FieldValue::Text(_) => "a string",
            FieldValue::Date(_) => "a date",
            FieldValue::Time(_) => "a time",
            FieldValue::DateTime(_) => "a datetime",
            FieldValue::Map(_) => "a mapping",
            FieldValue::List(_) => "a sequence",
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<NaiveTime> for FieldValue {
    fn from(value: NaiveTime) -> Self {
        FieldValue::Time(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl From<Record> for FieldValue {
    fn from(value: Record) -> Self {
        FieldValue::Map(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Record -> storage mapping. Total over every record.
pub fn encode(record: &Record) -> Document {
    record
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect()
}

pub fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(flag) => Value::Bool(*flag),
        FieldValue::Number(number) => Value::Number(number.clone()),
        FieldValue::Text(text) => Value::String(text.clone()),
        FieldValue::Date(date) => Value::String(date.format(DATE_FORMAT).to_string()),
        FieldValue::Time(time) => Value::String(time.format(TIME_FORMAT).to_string()),
        FieldValue::DateTime(datetime) => {
            Value::String(datetime.to_rfc3339_opts(SecondsFormat::AutoSi, false))
        }
        FieldValue::Map(record) => Value::Object(encode(record)),
        FieldValue::List(items) => Value::Array(items.iter().map(encode_value).collect()),
    }
}

/// Storage mapping -> record.
pub fn decode(document: Document) -> Record {
    document
        .into_iter()
        .map(|(key, value)| (key, decode_value(value)))
        .collect()
}

fn decode_value(value: Value) -> FieldValue {
    match value {
        Value::String(text) => decode_text(text),
        Value::Object(document) => FieldValue::Map(decode(document)),
        // Only mappings inside a sequence are walked; other elements stay raw.
        Value::Array(items) => FieldValue::List(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(document) => FieldValue::Map(decode(document)),
                    other => raw(other),
                })
                .collect(),
        ),
        other => raw(other),
    }
}

fn raw(value: Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Bool(flag) => FieldValue::Bool(flag),
        Value::Number(number) => FieldValue::Number(number),
        Value::String(text) => FieldValue::Text(text),
        Value::Array(items) => FieldValue::List(items.into_iter().map(raw).collect()),
        Value::Object(document) => FieldValue::Map(
            document
                .into_iter()
                .map(|(key, value)| (key, raw(value)))
                .collect(),
        ),
    }
}

pub fn decode_text(text: String) -> FieldValue {
    let parsed = if text.contains('T') && text.contains(':') {
        parse_datetime(&text).map(FieldValue::DateTime)
    } else if text.contains('-') && text.chars().count() == 10 {
        NaiveDate::parse_from_str(&text, DATE_FORMAT)
            .ok()
            .map(FieldValue::Date)
    } else if text.contains(':') && text.chars().count() == 8 {
        NaiveTime::parse_from_str(&text, TIME_FORMAT)
            .ok()
            .map(FieldValue::Time)
    } else {
        None
    };

    parsed.unwrap_or(FieldValue::Text(text))
}

/// Lenient time-of-day parse for client input: `HH:MM`, `HH:MM:SS` or with a
/// fraction, truncated to whole seconds.
pub fn parse_clock(text: &str) -> Option<NaiveTime> {
    CLOCK_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text.trim(), format).ok())
        .map(whole_seconds)
}

pub fn whole_seconds(time: NaiveTime) -> NaiveTime {
    time.with_nanosecond(0).unwrap_or(time)
}

/// Offset-qualified values are converted to UTC; naive ones are taken as UTC.
fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.with_timezone(&Utc));
    }

    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("missing field `{0}`")]
    Missing(String),

    #[error("field `{field}` should be {expected}, found {found}")]
    WrongType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("field `{field}`: {message}")]
    Invalid { field: String, message: String },
}

/// Consumes a decoded record field by field while building a model.
#[derive(Debug)]
pub struct Fields {
    record: Record,
}

impl Fields {
    pub fn new(record: Record) -> Self {
        Self { record }
    }

    /// Takes the first present key of `keys`; later keys are legacy spellings.
    fn take(&mut self, keys: &[&str]) -> Option<(String, FieldValue)> {
        keys.iter()
            .find_map(|key| self.record.remove_entry(*key))
    }

    fn require(&mut self, keys: &[&str]) -> Result<(String, FieldValue), RecordError> {
        self.take(keys)
            .ok_or_else(|| RecordError::Missing(keys[0].to_string()))
    }

    /// Free text. A value that the decoder mistook for a temporal one is turned
    /// back into its stored string.
    pub fn text(&mut self, keys: &[&str]) -> Result<String, RecordError> {
        match self.require(keys)? {
            (_, FieldValue::Text(text)) => Ok(text),
            (
                field,
                value @ (FieldValue::Date(_) | FieldValue::Time(_) | FieldValue::DateTime(_)),
            ) => match encode_value(&value) {
                Value::String(text) => Ok(text),
                _ => Err(wrong_type(field, "a string", &value)),
            },
            (field, other) => Err(wrong_type(field, "a string", &other)),
        }
    }

    /// Missing or null flags are false.
    pub fn flag(&mut self, keys: &[&str]) -> Result<bool, RecordError> {
        match self.take(keys) {
            None | Some((_, FieldValue::Null)) => Ok(false),
            Some((_, FieldValue::Bool(flag))) => Ok(flag),
            Some((field, other)) => Err(wrong_type(field, "a boolean", &other)),
        }
    }

    pub fn required_flag(&mut self, keys: &[&str]) -> Result<bool, RecordError> {
        match self.require(keys)? {
            (_, FieldValue::Bool(flag)) => Ok(flag),
            (field, other) => Err(wrong_type(field, "a boolean", &other)),
        }
    }

    pub fn number(&mut self, keys: &[&str]) -> Result<f64, RecordError> {
        match self.require(keys)? {
            (field, FieldValue::Number(number)) => number.as_f64().ok_or(RecordError::Invalid {
                field,
                message: format!("{} is not representable", number),
            }),
            (field, other) => Err(wrong_type(field, "a number", &other)),
        }
    }

    pub fn date(&mut self, keys: &[&str]) -> Result<NaiveDate, RecordError> {
        match self.require(keys)? {
            (_, FieldValue::Date(date)) => Ok(date),
            (field, other) => Err(wrong_type(field, "a date", &other)),
        }
    }

    pub fn time(&mut self, keys: &[&str]) -> Result<NaiveTime, RecordError> {
        match self.require(keys)? {
            (_, FieldValue::Time(time)) => Ok(time),
            (field, other) => Err(wrong_type(field, "a time", &other)),
        }
    }

    /// Also accepts the short `HH:MM` text some clients stored; blank is absent.
    pub fn optional_time(&mut self, keys: &[&str]) -> Result<Option<NaiveTime>, RecordError> {
        match self.take(keys) {
            None | Some((_, FieldValue::Null)) => Ok(None),
            Some((_, FieldValue::Time(time))) => Ok(Some(time)),
            Some((_, FieldValue::Text(text))) if text.trim().is_empty() => Ok(None),
            Some((field, FieldValue::Text(text))) => {
                parse_clock(&text).map(Some).ok_or_else(|| RecordError::Invalid {
                    field,
                    message: format!("`{}` is not a time of day", text),
                })
            }
            Some((field, other)) => Err(wrong_type(field, "a time", &other)),
        }
    }

    /// Text parsed into a closed enumeration.
    pub fn parsed<T>(&mut self, keys: &[&str]) -> Result<T, RecordError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let text = self.text(keys)?;
        text.parse().map_err(|error: T::Err| RecordError::Invalid {
            field: keys[0].to_string(),
            message: error.to_string(),
        })
    }

    pub fn datetime(&mut self, keys: &[&str]) -> Result<DateTime<Utc>, RecordError> {
        match self.require(keys)? {
            (_, FieldValue::DateTime(datetime)) => Ok(datetime),
            (field, other) => Err(wrong_type(field, "a datetime", &other)),
        }
    }

    /// A missing sequence is empty.
    pub fn list(&mut self, keys: &[&str]) -> Result<Vec<FieldValue>, RecordError> {
        match self.take(keys) {
            None | Some((_, FieldValue::Null)) => Ok(Vec::new()),
            Some((_, FieldValue::List(items))) => Ok(items),
            Some((field, other)) => Err(wrong_type(field, "a sequence", &other)),
        }
    }
}

fn wrong_type(field: String, expected: &'static str, found: &FieldValue) -> RecordError {
    RecordError::WrongType {
        field,
        expected,
        found: found.kind(),
    }
}
