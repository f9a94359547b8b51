use chrono::{DateTime, Duration, Utc};
use oso::PolarClass;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{bid_not_pending_error, Error};
use crate::fees::FeeBreakdown;

/// How long a bid stays open when the carrier does not supply an expiry.
pub const DEFAULT_VALIDITY_HOURS: i64 = 72;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bid {
    pub id: i64,
    pub booking_id: i64,
    pub carrier_user_id: Uuid,
    pub carrier_org_id: Uuid,
    pub total_price: Decimal,
    pub platform_charge: Decimal,
    pub carrier_net_amount: Decimal,
    pub platform_charge_percentage: Decimal,
    pub message: Option<String>,
    pub status: Status,
    pub valid_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
    Expired,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Pending => "pending".into(),
            Self::Accepted => "accepted".into(),
            Self::Rejected => "rejected".into(),
            Self::Withdrawn => "withdrawn".into(),
            Self::Expired => "expired".into(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "withdrawn" => Some(Self::Withdrawn),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

impl Bid {
    pub fn new(
        id: i64,
        booking_id: i64,
        carrier_user_id: Uuid,
        carrier_org_id: Uuid,
        total_price: Decimal,
        breakdown: FeeBreakdown,
        message: Option<String>,
        valid_until: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id,
            booking_id,
            carrier_user_id,
            carrier_org_id,
            total_price,
            platform_charge: breakdown.platform_charge,
            carrier_net_amount: breakdown.carrier_net_amount,
            platform_charge_percentage: breakdown.platform_charge_percentage,
            message,
            status: Status::Pending,
            valid_until: valid_until
                .unwrap_or_else(|| now + Duration::hours(DEFAULT_VALIDITY_HOURS)),
            created_at: now,
            updated_at: now,
            responded_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, Status::Pending)
    }

    #[tracing::instrument]
    pub fn accept(&mut self) -> Result<(), Error> {
        self.respond(Status::Accepted)
    }

    #[tracing::instrument]
    pub fn reject(&mut self) -> Result<(), Error> {
        self.respond(Status::Rejected)
    }

    #[tracing::instrument]
    pub fn withdraw(&mut self) -> Result<(), Error> {
        self.respond(Status::Withdrawn)
    }

    #[tracing::instrument]
    pub fn expire(&mut self) -> Result<(), Error> {
        self.respond(Status::Expired)
    }

    /// All four departures from `pending` are terminal; `responded_at` is
    /// set exactly once, here.
    fn respond(&mut self, status: Status) -> Result<(), Error> {
        match self.status {
            Status::Pending => {
                let now = Utc::now();
                self.status = status;
                self.responded_at = Some(now);
                self.updated_at = now;
                Ok(())
            }
            _ => Err(bid_not_pending_error()),
        }
    }
}

impl PolarClass for Bid {
    fn get_polar_class_builder() -> oso::ClassBuilder<Bid> {
        oso::Class::builder()
            .name("Bid")
            .add_attribute_getter("carrier_org_id", |recv: &Bid| recv.carrier_org_id.clone())
            .add_attribute_getter("status", |recv: &Bid| recv.status.name())
            .add_attribute_getter("pending", |recv: &Bid| recv.is_pending())
    }

    fn get_polar_class() -> oso::Class {
        let builder = Bid::get_polar_class_builder();
        builder.build()
    }
}
