use actix_web::{HttpResponse, web};

use crate::database::models::{MonthRange, ShiftInput, ShiftUpdate};
use crate::database::repositories::ShiftRepository;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::middleware::RequestId;

pub async fn create_shift(
    shift_repo: web::Data<ShiftRepository>,
    input: web::Json<ShiftInput>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    let input = input.into_inner().validate()?;

    let shift = shift_repo.create_shift(input).await.map_err(|e| {
        log::error!("[{}] Failed to create shift: {}", request_id, e);
        AppError::BadRequest("Failed to create shift".to_string())
    })?;

    log::info!(
        "[{}] Shift {} created ({} at {} on {})",
        request_id,
        shift.id,
        shift.guard_name,
        shift.location_name,
        shift.date
    );

    Ok(HttpResponse::Ok().json(shift))
}

pub async fn get_shifts(shift_repo: web::Data<ShiftRepository>) -> Result<HttpResponse, AppError> {
    let shifts = shift_repo.get_shifts().await?;

    Ok(HttpResponse::Ok().json(shifts))
}

pub async fn get_shift(
    shift_repo: web::Data<ShiftRepository>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let shift_id = path.into_inner();

    let shift = shift_repo
        .find_by_id(&shift_id)
        .await?
        .ok_or_else(AppError::shift_not_found)?;

    Ok(HttpResponse::Ok().json(shift))
}

pub async fn update_shift(
    shift_repo: web::Data<ShiftRepository>,
    path: web::Path<String>,
    input: web::Json<ShiftUpdate>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    let shift_id = path.into_inner();
    let update = input.into_inner().validate()?;

    let shift = shift_repo
        .update_shift(&shift_id, update)
        .await?
        .ok_or_else(AppError::shift_not_found)?;

    log::info!("[{}] Shift {} updated", request_id, shift.id);

    Ok(HttpResponse::Ok().json(shift))
}

pub async fn delete_shift(
    shift_repo: web::Data<ShiftRepository>,
    path: web::Path<String>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    let shift_id = path.into_inner();

    if !shift_repo.delete_shift(&shift_id).await? {
        return Err(AppError::shift_not_found());
    }

    log::info!("[{}] Shift {} deleted", request_id, shift_id);

    Ok(HttpResponse::Ok().json(ApiResponse::message("Shift deleted successfully")))
}

pub async fn get_shifts_by_month(
    shift_repo: web::Data<ShiftRepository>,
    path: web::Path<(i32, u32)>,
) -> Result<HttpResponse, AppError> {
    let (year, month) = path.into_inner();

    let range = MonthRange::new(year, month).ok_or_else(|| {
        AppError::Validation(format!(
            "Invalid month {}-{}: month must be between 1 and 12",
            year, month
        ))
    })?;

    let shifts = shift_repo.get_shifts_by_month(range).await?;

    Ok(HttpResponse::Ok().json(shifts))
}
