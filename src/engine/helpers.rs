use super::Database;

use sqlx::postgres::PgRow;
use sqlx::{types::Json, Executor, Row, Transaction};
use uuid::Uuid;

use crate::{
    entities::{bid, Bid, Booking},
    error::{not_found_error, unexpected_error, Error},
};

#[tracing::instrument(skip(tx))]
pub async fn next_booking_id(tx: &mut Transaction<'_, Database>) -> Result<i64, Error> {
    let row = tx
        .fetch_one(sqlx::query(
            "SELECT nextval(pg_get_serial_sequence('bookings', 'id')) AS id",
        ))
        .await?;

    Ok(row.try_get("id")?)
}

#[tracing::instrument(skip(tx))]
pub async fn next_bid_id(tx: &mut Transaction<'_, Database>) -> Result<i64, Error> {
    let row = tx
        .fetch_one(sqlx::query(
            "SELECT nextval(pg_get_serial_sequence('bids', 'id')) AS id",
        ))
        .await?;

    Ok(row.try_get("id")?)
}

#[tracing::instrument(skip(tx))]
pub async fn fetch_booking_for_update(
    tx: &mut Transaction<'_, Database>,
    uuid: &Uuid,
) -> Result<Booking, Error> {
    let Json(booking): Json<Booking> = tx
        .fetch_optional(
            sqlx::query("SELECT data FROM bookings WHERE uuid = $1 FOR UPDATE").bind(uuid),
        )
        .await?
        .ok_or_else(|| not_found_error())?
        .try_get("data")?;

    Ok(booking)
}

#[tracing::instrument(skip(tx))]
pub async fn fetch_booking_by_id_for_update(
    tx: &mut Transaction<'_, Database>,
    id: i64,
) -> Result<Booking, Error> {
    let Json(booking): Json<Booking> = tx
        .fetch_optional(sqlx::query("SELECT data FROM bookings WHERE id = $1 FOR UPDATE").bind(id))
        .await?
        .ok_or_else(|| not_found_error())?
        .try_get("data")?;

    Ok(booking)
}

#[tracing::instrument(skip(tx))]
pub async fn insert_booking(
    tx: &mut Transaction<'_, Database>,
    booking: &Booking,
) -> Result<(), Error> {
    tx.execute(
        sqlx::query(
            "INSERT INTO bookings (id, uuid, status, shipper_org_id, data) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(booking.id)
        .bind(&booking.uuid)
        .bind(booking.status.name())
        .bind(&booking.shipper_org_id)
        .bind(Json(booking)),
    )
    .await?;

    Ok(())
}

#[tracing::instrument(skip(tx))]
pub async fn update_booking(
    tx: &mut Transaction<'_, Database>,
    booking: &Booking,
) -> Result<(), Error> {
    tx.execute(
        sqlx::query("UPDATE bookings SET status = $2, data = $3 WHERE id = $1")
            .bind(booking.id)
            .bind(booking.status.name())
            .bind(Json(booking)),
    )
    .await?;

    Ok(())
}

pub fn bid_from_row(row: &PgRow) -> Result<Bid, Error> {
    let status_name: String = row.try_get("status")?;
    let status = bid::Status::from_name(&status_name).ok_or_else(|| unexpected_error())?;

    Ok(Bid {
        id: row.try_get("id")?,
        booking_id: row.try_get("booking_id")?,
        carrier_user_id: row.try_get("carrier_user_id")?,
        carrier_org_id: row.try_get("carrier_org_id")?,
        total_price: row.try_get("total_price")?,
        platform_charge: row.try_get("platform_charge")?,
        carrier_net_amount: row.try_get("carrier_net_amount")?,
        platform_charge_percentage: row.try_get("platform_charge_percentage")?,
        message: row.try_get("message")?,
        status,
        valid_until: row.try_get("valid_until")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        responded_at: row.try_get("responded_at")?,
    })
}

#[tracing::instrument(skip(tx))]
pub async fn fetch_bid_for_update(
    tx: &mut Transaction<'_, Database>,
    id: i64,
) -> Result<Bid, Error> {
    let row = tx
        .fetch_optional(sqlx::query("SELECT * FROM bids WHERE id = $1 FOR UPDATE").bind(id))
        .await?
        .ok_or_else(|| not_found_error())?;

    bid_from_row(&row)
}

#[tracing::instrument(skip(tx))]
pub async fn insert_bid(tx: &mut Transaction<'_, Database>, bid: &Bid) -> Result<(), Error> {
    tx.execute(
        sqlx::query(
            "INSERT INTO bids (id, booking_id, carrier_user_id, carrier_org_id, total_price, \
             platform_charge, carrier_net_amount, platform_charge_percentage, message, status, \
             valid_until, created_at, updated_at, responded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(bid.id)
        .bind(bid.booking_id)
        .bind(&bid.carrier_user_id)
        .bind(&bid.carrier_org_id)
        .bind(bid.total_price)
        .bind(bid.platform_charge)
        .bind(bid.carrier_net_amount)
        .bind(bid.platform_charge_percentage)
        .bind(&bid.message)
        .bind(bid.status.name())
        .bind(bid.valid_until)
        .bind(bid.created_at)
        .bind(bid.updated_at)
        .bind(bid.responded_at),
    )
    .await?;

    Ok(())
}

/// The priced figures are computed once at submission and never change;
/// only the lifecycle columns are written here.
#[tracing::instrument(skip(tx))]
pub async fn update_bid(tx: &mut Transaction<'_, Database>, bid: &Bid) -> Result<(), Error> {
    tx.execute(
        sqlx::query(
            "UPDATE bids SET status = $2, updated_at = $3, responded_at = $4 WHERE id = $1",
        )
        .bind(bid.id)
        .bind(bid.status.name())
        .bind(bid.updated_at)
        .bind(bid.responded_at),
    )
    .await?;

    Ok(())
}

#[tracing::instrument(skip(tx))]
pub async fn count_pending_bids(
    tx: &mut Transaction<'_, Database>,
    booking_id: i64,
) -> Result<i64, Error> {
    let row = tx
        .fetch_one(
            sqlx::query(
                "SELECT COUNT(*) AS pending FROM bids WHERE booking_id = $1 AND status = 'pending'",
            )
            .bind(booking_id),
        )
        .await?;

    Ok(row.try_get("pending")?)
}
