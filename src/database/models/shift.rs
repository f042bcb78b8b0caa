use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::clock;
use super::incident::Incident;
use crate::database::document::{DATE_FORMAT, FieldValue, Fields, Record, RecordError};
use crate::error::AppError;

/// One guard's work period at one location, with its incident log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    pub date: NaiveDate,
    pub location_name: String,
    pub guard_name: String,
    #[serde(with = "clock")]
    pub start_time: NaiveTime,
    #[serde(with = "clock")]
    pub end_time: NaiveTime,
    /// In the order they were logged.
    #[serde(default)]
    pub incidents: Vec<Incident>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftInput {
    pub date: NaiveDate,
    #[serde(alias = "object_name")]
    pub location_name: String,
    pub guard_name: String,
    #[serde(with = "clock")]
    pub start_time: NaiveTime,
    #[serde(with = "clock")]
    pub end_time: NaiveTime,
}

/// Partial update; absent or null fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShiftUpdate {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default, alias = "object_name")]
    pub location_name: Option<String>,
    #[serde(default)]
    pub guard_name: Option<String>,
    #[serde(default, with = "clock::option")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "clock::option")]
    pub end_time: Option<NaiveTime>,
}

fn required_text(field: &str, value: String) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} must not be blank", field)));
    }
    Ok(trimmed.to_string())
}

impl ShiftInput {
    pub fn validate(self) -> Result<Self, AppError> {
        Ok(Self {
            location_name: required_text("location_name", self.location_name)?,
            guard_name: required_text("guard_name", self.guard_name)?,
            ..self
        })
    }
}

impl ShiftUpdate {
    pub fn validate(self) -> Result<Self, AppError> {
        if self.is_empty() {
            return Err(AppError::Validation(
                "Update must change at least one field".to_string(),
            ));
        }

        Ok(Self {
            location_name: self
                .location_name
                .map(|name| required_text("location_name", name))
                .transpose()?,
            guard_name: self
                .guard_name
                .map(|name| required_text("guard_name", name))
                .transpose()?,
            ..self
        })
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.location_name.is_none()
            && self.guard_name.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
    }

    /// Only the fields present in the update.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        if let Some(date) = self.date {
            record.insert("date".to_string(), date.into());
        }
        if let Some(location_name) = &self.location_name {
            record.insert("location_name".to_string(), location_name.as_str().into());
        }
        if let Some(guard_name) = &self.guard_name {
            record.insert("guard_name".to_string(), guard_name.as_str().into());
        }
        if let Some(start_time) = self.start_time {
            record.insert("start_time".to_string(), start_time.into());
        }
        if let Some(end_time) = self.end_time {
            record.insert("end_time".to_string(), end_time.into());
        }
        record
    }

    pub fn apply(&self, shift: &mut Shift) {
        if let Some(date) = self.date {
            shift.date = date;
        }
        if let Some(location_name) = &self.location_name {
            shift.location_name = location_name.clone();
        }
        if let Some(guard_name) = &self.guard_name {
            shift.guard_name = guard_name.clone();
        }
        if let Some(start_time) = self.start_time {
            shift.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            shift.end_time = end_time;
        }
    }
}

impl Shift {
    pub fn new(input: ShiftInput, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date: input.date,
            location_name: input.location_name,
            guard_name: input.guard_name,
            start_time: input.start_time,
            end_time: input.end_time,
            incidents: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// `now`, but never earlier than `created_at`.
    pub fn next_updated_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.max(self.created_at)
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("id".to_string(), self.id.as_str().into());
        record.insert("date".to_string(), self.date.into());
        record.insert("location_name".to_string(), self.location_name.as_str().into());
        record.insert("guard_name".to_string(), self.guard_name.as_str().into());
        record.insert("start_time".to_string(), self.start_time.into());
        record.insert("end_time".to_string(), self.end_time.into());
        record.insert(
            "incidents".to_string(),
            FieldValue::List(
                self.incidents
                    .iter()
                    .map(|incident| FieldValue::Map(incident.to_record()))
                    .collect(),
            ),
        );
        record.insert("created_at".to_string(), self.created_at.into());
        record.insert("updated_at".to_string(), self.updated_at.into());
        record
    }

    pub fn from_record(record: Record) -> Result<Self, RecordError> {
        let mut fields = Fields::new(record);

        let incidents = fields
            .list(&["incidents"])?
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                FieldValue::Map(incident) => Incident::from_record(incident),
                _ => Err(RecordError::Invalid {
                    field: format!("incidents[{}]", index),
                    message: "incident is not a mapping".to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Shift {
            id: fields.text(&["id"])?,
            date: fields.date(&["date"])?,
            location_name: fields.text(&["location_name", "object_name"])?,
            guard_name: fields.text(&["guard_name"])?,
            start_time: fields.time(&["start_time"])?,
            end_time: fields.time(&["end_time"])?,
            incidents,
            created_at: fields.datetime(&["created_at"])?,
            updated_at: fields.datetime(&["updated_at"])?,
        })
    }
}

/// The calendar month `[first day, first day of next month)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl MonthRange {
    /// `None` when the month is outside 1..=12 or the year is out of range.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = if month == 12 {
            NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Exclusive.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Bounds in stored form, for string range filters.
    pub fn bounds(&self) -> (String, String) {
        (
            self.start.format(DATE_FORMAT).to_string(),
            self.end.format(DATE_FORMAT).to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::document::{decode, encode};
    use crate::database::models::{GeneralIncident, IncidentDetails};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn input() -> ShiftInput {
        ShiftInput {
            date: NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
            location_name: "Rimi Kristiine".to_string(),
            guard_name: "Mari Tamm".to_string(),
            start_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        }
    }

    #[test]
    fn december_rolls_over_to_next_year() {
        let range = MonthRange::new(2024, 12).unwrap();

        assert_eq!(range.start(), NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(range.end(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 12, 20).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        assert_eq!(
            range.bounds(),
            ("2024-12-01".to_string(), "2025-01-01".to_string())
        );
    }

    #[test]
    fn month_out_of_range_is_rejected() {
        assert!(MonthRange::new(2024, 0).is_none());
        assert!(MonthRange::new(2024, 13).is_none());
        assert_eq!(
            MonthRange::new(2024, 2).unwrap().end(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn input_accepts_legacy_name_and_short_times() {
        let parsed: ShiftInput = serde_json::from_value(json!({
            "date": "2024-12-20",
            "object_name": "Rimi Kristiine",
            "guard_name": "Mari Tamm",
            "start_time": "22:00",
            "end_time": "06:00:00",
        }))
        .unwrap();

        assert_eq!(parsed, input());
    }

    #[test]
    fn blank_names_fail_validation() {
        let mut blank = input();
        blank.guard_name = "   ".to_string();
        assert!(matches!(blank.validate(), Err(AppError::Validation(_))));

        let mut padded = input();
        padded.location_name = "  Rimi Kristiine ".to_string();
        assert_eq!(padded.validate().unwrap().location_name, "Rimi Kristiine");
    }

    #[test]
    fn input_rejects_bad_types() {
        for payload in [
            json!({ "date": "20.12.2024", "location_name": "a", "guard_name": "b",
                    "start_time": "22:00", "end_time": "06:00" }),
            json!({ "date": "2024-12-20", "location_name": "a", "guard_name": "b",
                    "start_time": "late", "end_time": "06:00" }),
            json!({ "date": "2024-12-20", "guard_name": "b",
                    "start_time": "22:00", "end_time": "06:00" }),
        ] {
            assert!(serde_json::from_value::<ShiftInput>(payload).is_err());
        }
    }

    #[test]
    fn update_touches_only_present_fields() {
        let mut shift = Shift::new(input(), Utc::now());
        let before = shift.clone();
        let update: ShiftUpdate =
            serde_json::from_value(json!({ "guard_name": "Jaan", "end_time": null })).unwrap();
        let update = update.validate().unwrap();

        update.apply(&mut shift);

        assert_eq!(shift.guard_name, "Jaan");
        assert_eq!(
            Shift {
                guard_name: before.guard_name.clone(),
                ..shift.clone()
            },
            before
        );
        assert_eq!(
            Value::Object(encode(&update.to_record())),
            json!({ "guard_name": "Jaan" })
        );
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(matches!(
            ShiftUpdate::default().validate(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn updated_at_never_precedes_created_at() {
        let created = Utc.with_ymd_and_hms(2024, 12, 20, 12, 0, 0).unwrap();
        let shift = Shift::new(input(), created);

        let earlier = created - chrono::Duration::seconds(5);
        assert_eq!(shift.next_updated_at(earlier), created);

        let later = created + chrono::Duration::seconds(5);
        assert_eq!(shift.next_updated_at(later), later);
    }

    #[test]
    fn stored_shift_converts_back() {
        let mut shift = Shift::new(input(), Utc::now());
        shift.incidents.push(Incident::new(
            IncidentDetails::General(GeneralIncident {
                description: "Alarm test".to_string(),
                patrol_called: false,
                ambulance_called: false,
                incident_time: None,
            }),
            Utc::now(),
        ));

        let document = encode(&shift.to_record());
        assert_eq!(document["date"], json!("2024-12-20"));
        assert_eq!(document["start_time"], json!("22:00:00"));

        assert_eq!(Shift::from_record(decode(document)).unwrap(), shift);
    }

    #[test]
    fn legacy_document_is_read() {
        let Value::Object(document) = json!({
            "id": "5b0c4c7e-0000-4000-8000-000000000000",
            "date": "2024-11-02",
            "object_name": "Selver",
            "guard_name": "Jaan",
            "start_time": "08:00:00",
            "end_time": "20:00:00",
            "incidents": [],
            "created_at": "2024-11-02T07:55:00.000001",
            "updated_at": "2024-11-02T07:55:00.000001",
        }) else {
            unreachable!()
        };

        let shift = Shift::from_record(decode(document)).unwrap();

        assert_eq!(shift.location_name, "Selver");
        assert_eq!(shift.date, NaiveDate::from_ymd_opt(2024, 11, 2).unwrap());
        assert!(shift.incidents.is_empty());
    }

    #[test]
    fn document_missing_a_field_is_rejected() {
        let mut record = Shift::new(input(), Utc::now()).to_record();
        record.remove("start_time");

        assert_eq!(
            Shift::from_record(record),
            Err(RecordError::Missing("start_time".to_string()))
        );
    }

    #[test]
    fn serialized_shift_uses_wire_formats() {
        let created = Utc.with_ymd_and_hms(2024, 12, 20, 12, 0, 0).unwrap();
        let mut shift = Shift::new(input(), created);
        shift.id = "fixed".to_string();

        assert_eq!(
            serde_json::to_value(&shift).unwrap(),
            json!({
                "id": "fixed",
                "date": "2024-12-20",
                "location_name": "Rimi Kristiine",
                "guard_name": "Mari Tamm",
                "start_time": "22:00:00",
                "end_time": "06:00:00",
                "incidents": [],
                "created_at": "2024-12-20T12:00:00Z",
                "updated_at": "2024-12-20T12:00:00Z",
            })
        );
    }
}
