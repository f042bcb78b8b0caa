use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::database::document::{FieldValue, decode, encode, encode_value};
use crate::database::models::{
    Incident, IncidentDetails, MonthRange, Shift, ShiftInput, ShiftUpdate,
};
use crate::database::store::{Document, DocumentCollection, Filter, StoreError, StoreResult, Update};

const INCIDENTS_FIELD: &str = "incidents";

/// Result of an operation addressing one incident by position.
#[derive(Debug, Clone, PartialEq)]
pub enum IncidentChange<T> {
    Done(T),
    ShiftMissing,
    IndexMissing,
}

/// Shift persistence on top of a document collection. Records are encoded on the
/// way in and decoded on the way out.
#[derive(Clone)]
pub struct ShiftRepository {
    collection: Arc<dyn DocumentCollection>,
}

fn hydrate(document: Document) -> StoreResult<Shift> {
    let id = document
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("<unknown>")
        .to_string();

    Shift::from_record(decode(document))
        .map_err(|e| StoreError::Malformed(format!("shift {}: {}", id, e)))
}

/// Listings skip documents that no longer decode.
fn hydrate_listing(documents: Vec<Document>) -> Vec<Shift> {
    documents
        .into_iter()
        .filter_map(|document| match hydrate(document) {
            Ok(shift) => Some(shift),
            Err(e) => {
                log::warn!("Skipping undecodable shift in listing: {}", e);
                None
            }
        })
        .collect()
}

fn incident_value(incident: &Incident) -> Value {
    encode_value(&FieldValue::Map(incident.to_record()))
}

impl ShiftRepository {
    pub fn new(collection: Arc<dyn DocumentCollection>) -> Self {
        Self { collection }
    }

    pub async fn create_shift(&self, input: ShiftInput) -> StoreResult<Shift> {
        let shift = Shift::new(input, Utc::now());

        self.collection.insert_one(encode(&shift.to_record())).await?;

        log::debug!("Stored shift {}", shift.id);
        Ok(shift)
    }

    pub async fn get_shifts(&self) -> StoreResult<Vec<Shift>> {
        let documents = self.collection.find(&Filter::All).await?;
        Ok(hydrate_listing(documents))
    }

    pub async fn find_by_id(&self, id: &str) -> StoreResult<Option<Shift>> {
        let document = self.collection.find_one(&Filter::by_id(id)).await?;
        document.map(hydrate).transpose()
    }

    pub async fn update_shift(&self, id: &str, update: ShiftUpdate) -> StoreResult<Option<Shift>> {
        let Some(shift) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let mut fields = update.to_record();
        fields.insert(
            "updated_at".to_string(),
            shift.next_updated_at(Utc::now()).into(),
        );

        let matched = self
            .collection
            .update_one(&Filter::by_id(id), &Update::Set(encode(&fields)))
            .await?;
        if matched == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    pub async fn delete_shift(&self, id: &str) -> StoreResult<bool> {
        let deleted = self.collection.delete_one(&Filter::by_id(id)).await?;
        Ok(deleted > 0)
    }

    /// Appends with a server-assigned timestamp. `None` when the shift is absent.
    pub async fn add_incident(
        &self,
        shift_id: &str,
        details: IncidentDetails,
    ) -> StoreResult<Option<Incident>> {
        let incident = Incident::new(details, Utc::now());

        let matched = self
            .collection
            .update_one(
                &Filter::by_id(shift_id),
                &Update::Push {
                    field: INCIDENTS_FIELD.to_string(),
                    value: incident_value(&incident),
                },
            )
            .await?;

        Ok((matched > 0).then_some(incident))
    }

    /// Replaces the incident at `index`, keeping its original timestamp.
    pub async fn replace_incident(
        &self,
        shift_id: &str,
        index: usize,
        details: IncidentDetails,
    ) -> StoreResult<IncidentChange<Incident>> {
        let Some(shift) = self.find_by_id(shift_id).await? else {
            return Ok(IncidentChange::ShiftMissing);
        };
        let Some(current) = shift.incidents.get(index) else {
            return Ok(IncidentChange::IndexMissing);
        };

        let incident = Incident::new(details, current.timestamp);
        let matched = self
            .collection
            .update_one(
                &Filter::by_id(shift_id),
                &Update::ReplaceAt {
                    field: INCIDENTS_FIELD.to_string(),
                    index,
                    value: incident_value(&incident),
                },
            )
            .await?;

        Ok(if matched > 0 {
            IncidentChange::Done(incident)
        } else {
            self.diagnose_miss(shift_id).await?
        })
    }

    /// Positional pull; the store only applies it while the index exists.
    pub async fn remove_incident(
        &self,
        shift_id: &str,
        index: usize,
    ) -> StoreResult<IncidentChange<()>> {
        let matched = self
            .collection
            .update_one(
                &Filter::by_id(shift_id),
                &Update::PullAt {
                    field: INCIDENTS_FIELD.to_string(),
                    index,
                },
            )
            .await?;

        if matched > 0 {
            return Ok(IncidentChange::Done(()));
        }
        self.diagnose_miss(shift_id).await
    }

    pub async fn get_shifts_by_month(&self, month: MonthRange) -> StoreResult<Vec<Shift>> {
        let (gte, lt) = month.bounds();
        let documents = self
            .collection
            .find(&Filter::Range {
                field: "date".to_string(),
                gte,
                lt,
            })
            .await?;

        Ok(hydrate_listing(documents))
    }

    async fn diagnose_miss<T>(&self, shift_id: &str) -> StoreResult<IncidentChange<T>> {
        let exists = self
            .collection
            .find_one(&Filter::by_id(shift_id))
            .await?
            .is_some();

        Ok(if exists {
            IncidentChange::IndexMissing
        } else {
            IncidentChange::ShiftMissing
        })
    }
}
