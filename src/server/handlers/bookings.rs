use axum::extract::{Extension, Json, Path, Query};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{BookingFilters, DynAPI, Page};
use crate::auth::Principal;
use crate::entities::{Booking, BookingDraft, BookingPatch};
use crate::error::Error;
use crate::policy::BookingProjection;

#[derive(Serialize, Deserialize)]
pub struct CancelParams {
    reason: Option<String>,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    principal: Principal,
    Json(params): Json<BookingDraft>,
) -> Result<Json<Booking>, Error> {
    let booking = api.create_booking(principal, params).await?;

    Ok(booking.into())
}

pub async fn list(
    Extension(api): Extension<DynAPI>,
    principal: Principal,
    Query(filters): Query<BookingFilters>,
) -> Result<Json<Page<BookingProjection>>, Error> {
    let page = api.list_bookings(principal, filters).await?;

    Ok(page.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    principal: Principal,
    Path(uuid): Path<Uuid>,
) -> Result<Json<BookingProjection>, Error> {
    let projection = api.find_booking(principal, uuid).await?;

    Ok(projection.into())
}

pub async fn update(
    Extension(api): Extension<DynAPI>,
    principal: Principal,
    Path(uuid): Path<Uuid>,
    Json(patch): Json<BookingPatch>,
) -> Result<Json<Booking>, Error> {
    let booking = api.update_booking(principal, uuid, patch).await?;

    Ok(booking.into())
}

pub async fn publish(
    Extension(api): Extension<DynAPI>,
    principal: Principal,
    Path(uuid): Path<Uuid>,
) -> Result<Json<Booking>, Error> {
    let booking = api.publish_booking(principal, uuid).await?;

    Ok(booking.into())
}

pub async fn cancel(
    Extension(api): Extension<DynAPI>,
    principal: Principal,
    Path(uuid): Path<Uuid>,
    Json(params): Json<CancelParams>,
) -> Result<Json<Booking>, Error> {
    let booking = api.cancel_booking(principal, uuid, params.reason).await?;

    Ok(booking.into())
}

pub async fn start_transit(
    Extension(api): Extension<DynAPI>,
    principal: Principal,
    Path(uuid): Path<Uuid>,
) -> Result<Json<BookingProjection>, Error> {
    let projection = api.start_transit(principal, uuid).await?;

    Ok(projection.into())
}

pub async fn mark_delivered(
    Extension(api): Extension<DynAPI>,
    principal: Principal,
    Path(uuid): Path<Uuid>,
) -> Result<Json<BookingProjection>, Error> {
    let projection = api.mark_delivered(principal, uuid).await?;

    Ok(projection.into())
}

pub async fn complete(
    Extension(api): Extension<DynAPI>,
    principal: Principal,
    Path(uuid): Path<Uuid>,
) -> Result<Json<Booking>, Error> {
    let booking = api.complete_booking(principal, uuid).await?;

    Ok(booking.into())
}
