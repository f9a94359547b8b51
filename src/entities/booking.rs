use chrono::{DateTime, Utc};
use oso::PolarClass;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{
    immutable_state_error, invalid_input_error, invalid_transition_error, Error,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stop {
    pub address: String,
    pub suburb: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cargo {
    pub description: String,
    pub weight_kg: Decimal,
    pub pallet_count: Option<i32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Window {
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Budget {
    pub minimum: Option<Decimal>,
    pub maximum: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub company: Option<String>,
}

/// Draft payload supplied by the shipper at creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookingDraft {
    pub pickup: Stop,
    pub delivery: Stop,
    pub cargo: Cargo,
    pub pickup_window: Window,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub budget: Budget,
    pub contact: Contact,
    #[serde(default)]
    pub share_contact_company: bool,
}

/// Partial update against a draft booking. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BookingPatch {
    pub pickup: Option<Stop>,
    pub delivery: Option<Stop>,
    pub cargo: Option<Cargo>,
    pub pickup_window: Option<Window>,
    pub requirements: Option<Vec<String>>,
    pub budget: Option<Budget>,
    pub contact: Option<Contact>,
    pub share_contact_company: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub uuid: Uuid,
    pub shipper_user_id: Uuid,
    pub shipper_org_id: Uuid,
    pub pickup: Stop,
    pub delivery: Stop,
    pub cargo: Cargo,
    pub pickup_window: Window,
    pub requirements: Vec<String>,
    pub budget: Budget,
    pub contact: Contact,
    pub share_contact_company: bool,
    pub status: Status,
    pub selected_bid_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Status {
    Draft,
    Open,
    InBidding,
    Awarded,
    InTransit,
    Delivered,
    Completed,
    Cancelled { reason: Option<String> },
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Draft => "draft".into(),
            Self::Open => "open".into(),
            Self::InBidding => "in_bidding".into(),
            Self::Awarded => "awarded".into(),
            Self::InTransit => "in_transit".into(),
            Self::Delivered => "delivered".into(),
            Self::Completed => "completed".into(),
            Self::Cancelled { reason: _ } => "cancelled".into(),
        }
    }
}

impl Booking {
    pub fn new(id: i64, shipper_user_id: Uuid, shipper_org_id: Uuid, draft: BookingDraft) -> Self {
        let now = Utc::now();

        Self {
            id,
            uuid: Uuid::new_v4(),
            shipper_user_id,
            shipper_org_id,
            pickup: draft.pickup,
            delivery: draft.delivery,
            cargo: draft.cargo,
            pickup_window: draft.pickup_window,
            requirements: draft.requirements,
            budget: draft.budget,
            contact: draft.contact,
            share_contact_company: draft.share_contact_company,
            status: Status::Draft,
            selected_bid_id: None,
            created_at: now,
            updated_at: now,
            published_at: None,
            closed_at: None,
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self.status, Status::Draft)
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, Status::Open)
    }

    pub fn is_in_bidding(&self) -> bool {
        matches!(self.status, Status::InBidding)
    }

    pub fn is_biddable(&self) -> bool {
        matches!(self.status, Status::Open | Status::InBidding)
    }

    /// Drafts are mutable by the owning shipper only; everything past
    /// `draft` is immutable except through the defined transitions.
    pub fn apply_patch(&mut self, patch: BookingPatch) -> Result<(), Error> {
        if !self.is_draft() {
            return Err(immutable_state_error());
        }

        if let Some(pickup) = patch.pickup {
            self.pickup = pickup;
        }
        if let Some(delivery) = patch.delivery {
            self.delivery = delivery;
        }
        if let Some(cargo) = patch.cargo {
            self.cargo = cargo;
        }
        if let Some(pickup_window) = patch.pickup_window {
            self.pickup_window = pickup_window;
        }
        if let Some(requirements) = patch.requirements {
            self.requirements = requirements;
        }
        if let Some(budget) = patch.budget {
            self.budget = budget;
        }
        if let Some(contact) = patch.contact {
            self.contact = contact;
        }
        if let Some(share) = patch.share_contact_company {
            self.share_contact_company = share;
        }

        self.updated_at = Utc::now();

        Ok(())
    }

    #[tracing::instrument]
    pub fn publish(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Draft => {
                self.validate_for_publish()?;

                let now = Utc::now();
                self.status = Status::Open;
                self.published_at = Some(now);
                self.updated_at = now;

                Ok(())
            }
            _ => Err(invalid_transition_error()),
        }
    }

    fn validate_for_publish(&self) -> Result<(), Error> {
        let required = [
            &self.pickup.address,
            &self.pickup.suburb,
            &self.delivery.address,
            &self.delivery.suburb,
            &self.cargo.description,
            &self.contact.name,
            &self.contact.phone,
            &self.contact.email,
        ];

        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(invalid_input_error());
        }

        if self.cargo.weight_kg <= Decimal::ZERO {
            return Err(invalid_input_error());
        }

        if self.pickup_window.earliest >= self.pickup_window.latest {
            return Err(invalid_input_error());
        }

        Ok(())
    }

    /// Side effect of bid submission, never a direct API call. Idempotent
    /// once the booking is already in bidding.
    #[tracing::instrument]
    pub fn bid_received(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Open => {
                self.status = Status::InBidding;
                self.updated_at = Utc::now();
                Ok(())
            }
            Status::InBidding => Ok(()),
            _ => Err(invalid_transition_error()),
        }
    }

    #[tracing::instrument]
    pub fn award(&mut self, bid_id: i64) -> Result<(), Error> {
        match self.status {
            Status::InBidding => {
                self.status = Status::Awarded;
                self.selected_bid_id = Some(bid_id);
                self.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(invalid_transition_error()),
        }
    }

    /// Reversion when the last pending bid leaves the table.
    #[tracing::instrument]
    pub fn revert_to_open(&mut self) -> Result<(), Error> {
        match self.status {
            Status::InBidding => {
                self.status = Status::Open;
                self.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(invalid_transition_error()),
        }
    }

    #[tracing::instrument]
    pub fn start_transit(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Awarded => {
                self.status = Status::InTransit;
                self.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(invalid_transition_error()),
        }
    }

    #[tracing::instrument]
    pub fn mark_delivered(&mut self) -> Result<(), Error> {
        match self.status {
            Status::InTransit => {
                self.status = Status::Delivered;
                self.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(invalid_transition_error()),
        }
    }

    #[tracing::instrument]
    pub fn complete(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Delivered => {
                let now = Utc::now();
                self.status = Status::Completed;
                self.closed_at = Some(now);
                self.updated_at = now;
                Ok(())
            }
            _ => Err(invalid_transition_error()),
        }
    }

    /// Cancellation is forbidden once a carrier has been awarded the job.
    #[tracing::instrument]
    pub fn cancel(&mut self, reason: Option<String>) -> Result<(), Error> {
        match self.status {
            Status::Draft | Status::Open | Status::InBidding => {
                let now = Utc::now();
                self.status = Status::Cancelled { reason };
                self.closed_at = Some(now);
                self.updated_at = now;
                Ok(())
            }
            _ => Err(invalid_transition_error()),
        }
    }
}

impl PolarClass for Booking {
    fn get_polar_class_builder() -> oso::ClassBuilder<Booking> {
        oso::Class::builder()
            .name("Booking")
            .add_attribute_getter("uuid", |recv: &Booking| recv.uuid.clone())
            .add_attribute_getter("shipper_org_id", |recv: &Booking| {
                recv.shipper_org_id.clone()
            })
            .add_attribute_getter("status", |recv: &Booking| recv.status.name())
            .add_attribute_getter("biddable", |recv: &Booking| recv.is_biddable())
    }

    fn get_polar_class() -> oso::Class {
        let builder = Booking::get_polar_class_builder();
        builder.build()
    }
}
