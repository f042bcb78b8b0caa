use actix_web::{HttpResponse, web};
use serde_json::Value;

use crate::database::models::IncidentDetails;
use crate::database::repositories::{IncidentChange, ShiftRepository};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::middleware::RequestId;

/// Negative positions never exist; they are routed to the out-of-range path.
fn position(index: i64) -> usize {
    usize::try_from(index).unwrap_or(usize::MAX)
}

fn resolve<T>(change: IncidentChange<T>) -> Result<T, AppError> {
    match change {
        IncidentChange::Done(value) => Ok(value),
        IncidentChange::ShiftMissing => Err(AppError::shift_not_found()),
        IncidentChange::IndexMissing => Err(AppError::incident_not_found()),
    }
}

pub async fn add_incident(
    shift_repo: web::Data<ShiftRepository>,
    path: web::Path<String>,
    payload: web::Json<Value>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    let shift_id = path.into_inner();
    let details = IncidentDetails::from_payload(payload.into_inner())?;

    let incident = shift_repo
        .add_incident(&shift_id, details)
        .await?
        .ok_or_else(AppError::shift_not_found)?;

    log::info!(
        "[{}] {} incident logged on shift {}",
        request_id,
        incident.details.kind(),
        shift_id
    );

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        Some(incident),
        "Incident added successfully",
    )))
}

pub async fn update_incident(
    shift_repo: web::Data<ShiftRepository>,
    path: web::Path<(String, i64)>,
    payload: web::Json<Value>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    let (shift_id, index) = path.into_inner();
    let details = IncidentDetails::from_payload(payload.into_inner())?;

    let incident = resolve(
        shift_repo
            .replace_incident(&shift_id, position(index), details)
            .await?,
    )?;

    log::info!(
        "[{}] Incident {} on shift {} updated",
        request_id,
        index,
        shift_id
    );

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        Some(incident),
        "Incident updated successfully",
    )))
}

pub async fn remove_incident(
    shift_repo: web::Data<ShiftRepository>,
    path: web::Path<(String, i64)>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    let (shift_id, index) = path.into_inner();

    resolve(shift_repo.remove_incident(&shift_id, position(index)).await?)?;

    log::info!(
        "[{}] Incident {} removed from shift {}",
        request_id,
        index,
        shift_id
    );

    Ok(HttpResponse::Ok().json(ApiResponse::message("Incident removed successfully")))
}
