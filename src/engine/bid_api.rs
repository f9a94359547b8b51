use super::helpers::{
    bid_from_row, count_pending_bids, fetch_bid_for_update, fetch_booking_by_id_for_update,
    fetch_booking_for_update, insert_bid, next_bid_id, update_bid, update_booking,
};
use super::Engine;

use async_trait::async_trait;
use sqlx::{Acquire, Executor, Row};
use uuid::Uuid;

use crate::{
    api::{BidAPI, BidAction, BidOutcome, BidParams},
    auth::{Platform, Principal},
    entities::Bid,
    error::{
        booking_not_biddable_error, duplicate_bid_error, not_found_error, Error,
    },
    fees,
};

#[async_trait]
impl BidAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn submit_bid(
        &self,
        principal: Principal,
        booking_uuid: Uuid,
        params: BidParams,
    ) -> Result<Bid, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        // the booking row lock serializes every write that touches this
        // booking's status or its bid set
        let mut booking = fetch_booking_for_update(&mut tx, &booking_uuid).await?;

        self.authorize(principal.clone(), "submit_bid", booking.clone())?;

        if !booking.is_biddable() {
            return Err(booking_not_biddable_error());
        }

        let existing = tx
            .fetch_optional(
                sqlx::query(
                    "SELECT id FROM bids \
                     WHERE booking_id = $1 AND carrier_org_id = $2 AND status = 'pending'",
                )
                .bind(booking.id)
                .bind(&principal.org_id),
            )
            .await?;

        if existing.is_some() {
            return Err(duplicate_bid_error());
        }

        let breakdown = fees::compute_charge(params.amount)?;

        let id = next_bid_id(&mut tx).await?;
        let bid = Bid::new(
            id,
            booking.id,
            principal.user_id,
            principal.org_id,
            params.amount,
            breakdown,
            params.message,
            params.valid_until,
        );

        insert_bid(&mut tx, &bid).await?;

        // first bid flips the booking into bidding; later ones are a no-op
        booking.bid_received()?;
        update_booking(&mut tx, &booking).await?;

        tx.commit().await?;

        Ok(bid)
    }

    #[tracing::instrument(skip(self))]
    async fn list_bids(
        &self,
        principal: Principal,
        booking_uuid: Uuid,
    ) -> Result<Vec<Bid>, Error> {
        let mut conn = self.pool.acquire().await?;

        let row = conn
            .fetch_optional(
                sqlx::query("SELECT id, shipper_org_id FROM bookings WHERE uuid = $1")
                    .bind(&booking_uuid),
            )
            .await?
            .ok_or_else(|| not_found_error())?;

        let booking_id: i64 = row.try_get("id")?;
        let shipper_org_id: Uuid = row.try_get("shipper_org_id")?;

        let owner = principal.can_act_as_shipper() && principal.org_id == shipper_org_id;

        let rows = if owner {
            conn.fetch_all(
                sqlx::query("SELECT * FROM bids WHERE booking_id = $1 ORDER BY id")
                    .bind(booking_id),
            )
            .await?
        } else if principal.can_act_as_carrier() {
            // a carrier only ever sees their own organization's tenders
            conn.fetch_all(
                sqlx::query(
                    "SELECT * FROM bids \
                     WHERE booking_id = $1 AND carrier_org_id = $2 ORDER BY id",
                )
                .bind(booking_id)
                .bind(&principal.org_id),
            )
            .await?
        } else {
            return Err(not_found_error());
        };

        let mut bids = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            bids.push(bid_from_row(row)?);
        }

        Ok(bids)
    }

    #[tracing::instrument(skip(self))]
    async fn respond_to_bid(
        &self,
        principal: Principal,
        booking_uuid: Uuid,
        bid_id: i64,
        action: BidAction,
    ) -> Result<BidOutcome, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut booking = fetch_booking_for_update(&mut tx, &booking_uuid).await?;

        self.authorize(principal.clone(), "respond_to_bid", booking.clone())?;

        let mut bid = fetch_bid_for_update(&mut tx, bid_id).await?;

        if bid.booking_id != booking.id {
            return Err(not_found_error());
        }

        match action {
            BidAction::Accept => {
                bid.accept()?;
                booking.award(bid.id)?;

                // every competing pending tender dies in the same commit
                tx.execute(
                    sqlx::query(
                        "UPDATE bids SET status = 'rejected', responded_at = now(), updated_at = now() \
                         WHERE booking_id = $1 AND status = 'pending' AND id <> $2",
                    )
                    .bind(booking.id)
                    .bind(bid.id),
                )
                .await?;

                update_bid(&mut tx, &bid).await?;
                update_booking(&mut tx, &booking).await?;
            }
            BidAction::Reject => {
                bid.reject()?;

                update_bid(&mut tx, &bid).await?;

                if count_pending_bids(&mut tx, booking.id).await? == 0 {
                    booking.revert_to_open()?;
                    update_booking(&mut tx, &booking).await?;
                }
            }
        }

        tx.commit().await?;

        Ok(BidOutcome { booking, bid })
    }

    #[tracing::instrument(skip(self))]
    async fn withdraw_bid(
        &self,
        principal: Principal,
        booking_uuid: Uuid,
        bid_id: i64,
    ) -> Result<Bid, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut booking = fetch_booking_for_update(&mut tx, &booking_uuid).await?;

        let mut bid = fetch_bid_for_update(&mut tx, bid_id).await?;

        if bid.booking_id != booking.id {
            return Err(not_found_error());
        }

        self.authorize(principal.clone(), "withdraw", bid.clone())?;

        bid.withdraw()?;

        update_bid(&mut tx, &bid).await?;

        if booking.is_in_bidding() && count_pending_bids(&mut tx, booking.id).await? == 0 {
            booking.revert_to_open()?;
            update_booking(&mut tx, &booking).await?;
        }

        tx.commit().await?;

        Ok(bid)
    }

    #[tracing::instrument(skip(self))]
    async fn expire_stale_bids(&self, principal: Principal) -> Result<u64, Error> {
        self.authorize(principal.clone(), "expire_bids", Platform::default())?;

        let mut conn = self.pool.acquire().await?;

        let rows = conn
            .fetch_all(sqlx::query(
                "SELECT DISTINCT booking_id FROM bids \
                 WHERE status = 'pending' AND valid_until < now()",
            ))
            .await?;

        let mut expired = 0u64;

        // one transaction per booking, locking the booking row first so
        // the sweep never races a concurrent accept on the same booking
        for row in rows.iter() {
            let booking_id: i64 = row.try_get("booking_id")?;

            let mut tx = conn.begin().await?;

            let mut booking = fetch_booking_by_id_for_update(&mut tx, booking_id).await?;

            let result = tx
                .execute(
                    sqlx::query(
                        "UPDATE bids SET status = 'expired', responded_at = now(), updated_at = now() \
                         WHERE booking_id = $1 AND status = 'pending' AND valid_until < now()",
                    )
                    .bind(booking_id),
                )
                .await?;

            expired += result.rows_affected();

            if booking.is_in_bidding() && count_pending_bids(&mut tx, booking_id).await? == 0 {
                booking.revert_to_open()?;
                update_booking(&mut tx, &booking).await?;
            }

            tx.commit().await?;
        }

        if expired > 0 {
            tracing::info!(expired, "expired stale bids");
        }

        Ok(expired)
    }
}
