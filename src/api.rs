use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::Principal;
use crate::entities::{Bid, Booking, BookingDraft, BookingPatch};
use crate::error::Error;
use crate::policy::BookingProjection;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Clone, Debug, Deserialize)]
pub struct BookingFilters {
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for BookingFilters {
    fn default() -> Self {
        Self {
            status: None,
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

impl BookingFilters {
    pub fn per_page(&self) -> i64 {
        self.per_page.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.per_page()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BidParams {
    pub amount: Decimal,
    pub message: Option<String>,
    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidAction {
    Accept,
    Reject,
}

/// Result of a shipper's decision on a bid: the bid acted upon and the
/// booking as left by the transaction.
#[derive(Debug, Serialize)]
pub struct BidOutcome {
    pub booking: Booking,
    pub bid: Bid,
}

#[async_trait]
pub trait BookingAPI {
    async fn create_booking(
        &self,
        principal: Principal,
        draft: BookingDraft,
    ) -> Result<Booking, Error>;

    async fn update_booking(
        &self,
        principal: Principal,
        uuid: Uuid,
        patch: BookingPatch,
    ) -> Result<Booking, Error>;

    async fn publish_booking(&self, principal: Principal, uuid: Uuid) -> Result<Booking, Error>;

    async fn cancel_booking(
        &self,
        principal: Principal,
        uuid: Uuid,
        reason: Option<String>,
    ) -> Result<Booking, Error>;

    async fn find_booking(
        &self,
        principal: Principal,
        uuid: Uuid,
    ) -> Result<BookingProjection, Error>;

    async fn list_bookings(
        &self,
        principal: Principal,
        filters: BookingFilters,
    ) -> Result<Page<BookingProjection>, Error>;

    async fn start_transit(
        &self,
        principal: Principal,
        uuid: Uuid,
    ) -> Result<BookingProjection, Error>;

    async fn mark_delivered(
        &self,
        principal: Principal,
        uuid: Uuid,
    ) -> Result<BookingProjection, Error>;

    async fn complete_booking(&self, principal: Principal, uuid: Uuid) -> Result<Booking, Error>;
}

#[async_trait]
pub trait BidAPI {
    async fn submit_bid(
        &self,
        principal: Principal,
        booking_uuid: Uuid,
        params: BidParams,
    ) -> Result<Bid, Error>;

    async fn list_bids(&self, principal: Principal, booking_uuid: Uuid)
        -> Result<Vec<Bid>, Error>;

    async fn respond_to_bid(
        &self,
        principal: Principal,
        booking_uuid: Uuid,
        bid_id: i64,
        action: BidAction,
    ) -> Result<BidOutcome, Error>;

    async fn withdraw_bid(
        &self,
        principal: Principal,
        booking_uuid: Uuid,
        bid_id: i64,
    ) -> Result<Bid, Error>;

    async fn expire_stale_bids(&self, principal: Principal) -> Result<u64, Error>;
}

pub trait API: BookingAPI + BidAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
