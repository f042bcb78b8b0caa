use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::clock;
use super::macros::string_enum;
use crate::database::document::{FieldValue, Fields, Record, RecordError};
use crate::error::AppError;

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum IncidentKind {
        General => "general",
        Theft => "theft",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Gender {
        Male => "male" | "mees",
        Female => "female" | "naine",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TheftOutcome {
        Released => "released" | "vabastatud",
        PaidAndReleased => "paid_and_released" | "paid-and-released" | "maksis_vabastatud",
        PoliceInvolved => "police_involved" | "police-involved" | "politsei",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralIncident {
    pub description: String,
    #[serde(default, alias = "g4s_patrol_called")]
    pub patrol_called: bool,
    #[serde(default)]
    pub ambulance_called: bool,
    /// Time of day reported by the guard, separate from the server timestamp.
    #[serde(
        default,
        with = "clock::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub incident_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TheftIncident {
    pub description: String,
    #[serde(default, alias = "g4s_patrol_called")]
    pub patrol_called: bool,
    #[serde(default)]
    pub ambulance_called: bool,
    #[serde(default)]
    pub theft_prevented: bool,
    pub gender: Gender,
    pub amount: f64,
    pub special_tools_used: bool,
    pub outcome: TheftOutcome,
    #[serde(
        default,
        with = "clock::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub incident_time: Option<NaiveTime>,
}

/// What a client reports; the server adds the timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IncidentDetails {
    General(GeneralIncident),
    Theft(TheftIncident),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    #[serde(flatten)]
    pub details: IncidentDetails,
    pub timestamp: DateTime<Utc>,
}

impl IncidentDetails {
    /// Accepts the bare incident or the `{shift_id, incident_data}` wrapper.
    /// The `type` tag is matched case-insensitively, like the other enumerations.
    pub fn from_payload(payload: Value) -> Result<Self, AppError> {
        let mut data = match payload {
            Value::Object(mut wrapper) if wrapper.contains_key("incident_data") => {
                wrapper.remove("incident_data").unwrap_or(Value::Null)
            }
            other => other,
        };

        if let Some(tag) = data.get_mut("type") {
            if let Some(kind) = tag.as_str().and_then(|kind| kind.parse::<IncidentKind>().ok()) {
                *tag = Value::String(kind.as_str().to_string());
            }
        }

        let details: IncidentDetails = serde_json::from_value(data)
            .map_err(|e| AppError::Validation(format!("Invalid incident: {}", e)))?;
        details.validate()?;

        Ok(details)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.description().trim().is_empty() {
            return Err(AppError::Validation(
                "Incident description is required".to_string(),
            ));
        }

        if let IncidentDetails::Theft(theft) = self {
            if !theft.amount.is_finite() || theft.amount < 0.0 {
                return Err(AppError::Validation(format!(
                    "Theft amount must be a non-negative number, got {}",
                    theft.amount
                )));
            }
        }

        Ok(())
    }

    pub fn kind(&self) -> IncidentKind {
        match self {
            IncidentDetails::General(_) => IncidentKind::General,
            IncidentDetails::Theft(_) => IncidentKind::Theft,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            IncidentDetails::General(general) => &general.description,
            IncidentDetails::Theft(theft) => &theft.description,
        }
    }
}

impl Incident {
    pub fn new(details: IncidentDetails, timestamp: DateTime<Utc>) -> Self {
        Self { details, timestamp }
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("type".to_string(), self.details.kind().as_str().into());

        let incident_time = match &self.details {
            IncidentDetails::General(general) => {
                record.insert("description".to_string(), general.description.as_str().into());
                record.insert("patrol_called".to_string(), general.patrol_called.into());
                record.insert("ambulance_called".to_string(), general.ambulance_called.into());
                general.incident_time
            }
            IncidentDetails::Theft(theft) => {
                record.insert("description".to_string(), theft.description.as_str().into());
                record.insert("patrol_called".to_string(), theft.patrol_called.into());
                record.insert("ambulance_called".to_string(), theft.ambulance_called.into());
                record.insert("theft_prevented".to_string(), theft.theft_prevented.into());
                record.insert("gender".to_string(), theft.gender.as_str().into());
                record.insert(
                    "amount".to_string(),
                    Number::from_f64(theft.amount).map_or(FieldValue::Null, FieldValue::Number),
                );
                record.insert(
                    "special_tools_used".to_string(),
                    theft.special_tools_used.into(),
                );
                record.insert("outcome".to_string(), theft.outcome.as_str().into());
                theft.incident_time
            }
        };

        if let Some(time) = incident_time {
            record.insert("incident_time".to_string(), time.into());
        }
        record.insert("timestamp".to_string(), self.timestamp.into());

        record
    }

    pub fn from_record(record: Record) -> Result<Self, RecordError> {
        let mut fields = Fields::new(record);

        let kind: IncidentKind = fields.parsed(&["type"])?;
        let description = fields.text(&["description"])?;
        let patrol_called = fields.flag(&["patrol_called", "g4s_patrol_called"])?;
        let ambulance_called = fields.flag(&["ambulance_called"])?;
        let incident_time = fields.optional_time(&["incident_time"])?;

        let details = match kind {
            IncidentKind::General => IncidentDetails::General(GeneralIncident {
                description,
                patrol_called,
                ambulance_called,
                incident_time,
            }),
            IncidentKind::Theft => IncidentDetails::Theft(TheftIncident {
                description,
                patrol_called,
                ambulance_called,
                theft_prevented: fields.flag(&["theft_prevented"])?,
                gender: fields.parsed(&["gender"])?,
                amount: fields.number(&["amount"])?,
                special_tools_used: fields.required_flag(&["special_tools_used"])?,
                outcome: fields.parsed(&["outcome"])?,
                incident_time,
            }),
        };

        Ok(Incident {
            details,
            timestamp: fields.datetime(&["timestamp"])?,
        })
    }
}
