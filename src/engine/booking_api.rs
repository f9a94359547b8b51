use super::helpers::{
    fetch_bid_for_update, fetch_booking_for_update, insert_booking, next_booking_id,
    update_booking,
};
use super::Engine;

use async_trait::async_trait;
use sqlx::{types::Json, Acquire, Executor, Row};
use uuid::Uuid;

use crate::{
    api::{BookingAPI, BookingFilters, Page},
    auth::{Platform, Principal},
    entities::{Booking, BookingDraft, BookingPatch},
    error::{invalid_transition_error, not_found_error, Error},
    policy::{self, BookingProjection, CarrierBooking, RowScope, View},
};

#[async_trait]
impl BookingAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn create_booking(
        &self,
        principal: Principal,
        draft: BookingDraft,
    ) -> Result<Booking, Error> {
        self.authorize(principal.clone(), "create_booking", Platform::default())?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let id = next_booking_id(&mut tx).await?;
        let booking = Booking::new(id, principal.user_id, principal.org_id, draft);

        insert_booking(&mut tx, &booking).await?;

        tx.commit().await?;

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn update_booking(
        &self,
        principal: Principal,
        uuid: Uuid,
        patch: BookingPatch,
    ) -> Result<Booking, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut booking = fetch_booking_for_update(&mut tx, &uuid).await?;

        self.authorize(principal.clone(), "update", booking.clone())?;

        booking.apply_patch(patch)?;

        update_booking(&mut tx, &booking).await?;

        tx.commit().await?;

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn publish_booking(&self, principal: Principal, uuid: Uuid) -> Result<Booking, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut booking = fetch_booking_for_update(&mut tx, &uuid).await?;

        self.authorize(principal.clone(), "publish", booking.clone())?;

        booking.publish()?;

        update_booking(&mut tx, &booking).await?;

        tx.commit().await?;

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_booking(
        &self,
        principal: Principal,
        uuid: Uuid,
        reason: Option<String>,
    ) -> Result<Booking, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut booking = fetch_booking_for_update(&mut tx, &uuid).await?;

        self.authorize(principal.clone(), "cancel", booking.clone())?;

        booking.cancel(reason)?;

        // pending tenders die with the booking, in the same commit
        tx.execute(
            sqlx::query(
                "UPDATE bids SET status = 'rejected', responded_at = now(), updated_at = now() \
                 WHERE booking_id = $1 AND status = 'pending'",
            )
            .bind(booking.id),
        )
        .await?;

        update_booking(&mut tx, &booking).await?;

        tx.commit().await?;

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn find_booking(
        &self,
        principal: Principal,
        uuid: Uuid,
    ) -> Result<BookingProjection, Error> {
        let mut conn = self.pool.acquire().await?;

        let row = conn
            .fetch_optional(
                sqlx::query("SELECT id, status, shipper_org_id FROM bookings WHERE uuid = $1")
                    .bind(&uuid),
            )
            .await?
            .ok_or_else(|| not_found_error())?;

        let id: i64 = row.try_get("id")?;
        let status: String = row.try_get("status")?;
        let shipper_org_id: Uuid = row.try_get("shipper_org_id")?;

        let org_has_bid = if principal.can_act_as_carrier() {
            conn.fetch_optional(
                sqlx::query("SELECT 1 FROM bids WHERE booking_id = $1 AND carrier_org_id = $2")
                    .bind(id)
                    .bind(&principal.org_id),
            )
            .await?
            .is_some()
        } else {
            false
        };

        match policy::view_for(&principal, &shipper_org_id, &status, org_has_bid) {
            Some(View::Shipper) => {
                let Json(booking): Json<Booking> = conn
                    .fetch_one(sqlx::query("SELECT data FROM bookings WHERE id = $1").bind(id))
                    .await?
                    .try_get("data")?;

                Ok(BookingProjection::Shipper(booking))
            }
            Some(View::Carrier) => {
                let query = format!(
                    "SELECT {} AS data FROM bookings WHERE id = $1",
                    policy::CARRIER_DATA_EXPR
                );

                let Json(projected): Json<CarrierBooking> = conn
                    .fetch_one(sqlx::query(&query).bind(id))
                    .await?
                    .try_get("data")?;

                Ok(BookingProjection::Carrier(projected))
            }
            None => Err(not_found_error()),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn list_bookings(
        &self,
        principal: Principal,
        filters: BookingFilters,
    ) -> Result<Page<BookingProjection>, Error> {
        let mut conn = self.pool.acquire().await?;

        let per_page = filters.per_page();
        let offset = filters.offset();
        let page = filters.page.max(1);
        let status = filters.status.clone();

        match policy::row_scope(&principal) {
            RowScope::OwnedByOrg { org_id } => {
                let total: i64 = conn
                    .fetch_one(
                        sqlx::query(
                            "SELECT COUNT(*) AS total FROM bookings \
                             WHERE shipper_org_id = $1 AND ($2::varchar IS NULL OR status = $2)",
                        )
                        .bind(&org_id)
                        .bind(&status),
                    )
                    .await?
                    .try_get("total")?;

                let rows = conn
                    .fetch_all(
                        sqlx::query(
                            "SELECT data FROM bookings \
                             WHERE shipper_org_id = $1 AND ($2::varchar IS NULL OR status = $2) \
                             ORDER BY id DESC LIMIT $3 OFFSET $4",
                        )
                        .bind(&org_id)
                        .bind(&status)
                        .bind(per_page)
                        .bind(offset),
                    )
                    .await?;

                let mut items = Vec::with_capacity(rows.len());
                for row in rows.iter() {
                    let Json(booking): Json<Booking> = row.try_get("data")?;
                    items.push(BookingProjection::Shipper(booking));
                }

                Ok(Page {
                    items,
                    total,
                    page,
                    per_page,
                })
            }
            RowScope::Marketplace => {
                let total: i64 = conn
                    .fetch_one(
                        sqlx::query(
                            "SELECT COUNT(*) AS total FROM bookings \
                             WHERE status IN ('open', 'in_bidding') \
                             AND ($1::varchar IS NULL OR status = $1)",
                        )
                        .bind(&status),
                    )
                    .await?
                    .try_get("total")?;

                let query = format!(
                    "SELECT {} AS data FROM bookings \
                     WHERE status IN ('open', 'in_bidding') \
                     AND ($1::varchar IS NULL OR status = $1) \
                     ORDER BY id DESC LIMIT $2 OFFSET $3",
                    policy::CARRIER_DATA_EXPR
                );

                let rows = conn
                    .fetch_all(
                        sqlx::query(&query)
                            .bind(&status)
                            .bind(per_page)
                            .bind(offset),
                    )
                    .await?;

                let mut items = Vec::with_capacity(rows.len());
                for row in rows.iter() {
                    let Json(projected): Json<CarrierBooking> = row.try_get("data")?;
                    items.push(BookingProjection::Carrier(projected));
                }

                Ok(Page {
                    items,
                    total,
                    page,
                    per_page,
                })
            }
            RowScope::MarketplaceAndOwned { org_id } => {
                let total: i64 = conn
                    .fetch_one(
                        sqlx::query(
                            "SELECT COUNT(*) AS total FROM bookings \
                             WHERE (shipper_org_id = $1 OR status IN ('open', 'in_bidding')) \
                             AND ($2::varchar IS NULL OR status = $2)",
                        )
                        .bind(&org_id)
                        .bind(&status),
                    )
                    .await?
                    .try_get("total")?;

                // owned rows come back in full, everything else stripped
                let query = format!(
                    "SELECT (shipper_org_id = $1) AS owned, \
                     CASE WHEN shipper_org_id = $1 THEN data ELSE {} END AS data \
                     FROM bookings \
                     WHERE (shipper_org_id = $1 OR status IN ('open', 'in_bidding')) \
                     AND ($2::varchar IS NULL OR status = $2) \
                     ORDER BY id DESC LIMIT $3 OFFSET $4",
                    policy::CARRIER_DATA_EXPR
                );

                let rows = conn
                    .fetch_all(
                        sqlx::query(&query)
                            .bind(&org_id)
                            .bind(&status)
                            .bind(per_page)
                            .bind(offset),
                    )
                    .await?;

                let mut items = Vec::with_capacity(rows.len());
                for row in rows.iter() {
                    let owned: bool = row.try_get("owned")?;
                    let Json(value): Json<serde_json::Value> = row.try_get("data")?;

                    if owned {
                        items.push(BookingProjection::Shipper(serde_json::from_value(value)?));
                    } else {
                        items.push(BookingProjection::Carrier(serde_json::from_value(value)?));
                    }
                }

                Ok(Page {
                    items,
                    total,
                    page,
                    per_page,
                })
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn start_transit(
        &self,
        principal: Principal,
        uuid: Uuid,
    ) -> Result<BookingProjection, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut booking = fetch_booking_for_update(&mut tx, &uuid).await?;

        let bid_id = booking
            .selected_bid_id
            .ok_or_else(|| invalid_transition_error())?;
        let bid = fetch_bid_for_update(&mut tx, bid_id).await?;

        self.authorize(principal.clone(), "start_transit", bid.clone())?;

        booking.start_transit()?;

        update_booking(&mut tx, &booking).await?;

        tx.commit().await?;

        Ok(BookingProjection::Carrier(policy::project_for_carrier(
            &booking,
        )))
    }

    #[tracing::instrument(skip(self))]
    async fn mark_delivered(
        &self,
        principal: Principal,
        uuid: Uuid,
    ) -> Result<BookingProjection, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut booking = fetch_booking_for_update(&mut tx, &uuid).await?;

        let bid_id = booking
            .selected_bid_id
            .ok_or_else(|| invalid_transition_error())?;
        let bid = fetch_bid_for_update(&mut tx, bid_id).await?;

        self.authorize(principal.clone(), "mark_delivered", bid.clone())?;

        booking.mark_delivered()?;

        update_booking(&mut tx, &booking).await?;

        tx.commit().await?;

        Ok(BookingProjection::Carrier(policy::project_for_carrier(
            &booking,
        )))
    }

    #[tracing::instrument(skip(self))]
    async fn complete_booking(&self, principal: Principal, uuid: Uuid) -> Result<Booking, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut booking = fetch_booking_for_update(&mut tx, &uuid).await?;

        self.authorize(principal.clone(), "complete", booking.clone())?;

        booking.complete()?;

        update_booking(&mut tx, &booking).await?;

        tx.commit().await?;

        Ok(booking)
    }
}
