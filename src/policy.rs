use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{OrganizationType, Principal};
use crate::entities::{booking, Booking, Cargo, Stop, Window};

/// Statuses a carrier may browse on the open marketplace.
pub const MARKETPLACE_STATUSES: [&str; 2] = ["open", "in_bidding"];

/// SQL fragment selecting the carrier-facing projection of a booking
/// document. Budget figures and personal contact details are stripped
/// inside the query, before the row crosses the process boundary; the
/// shipper may opt in to exposing their company name, nothing more.
pub const CARRIER_DATA_EXPR: &str = "\
CASE WHEN (data->>'share_contact_company')::boolean \
THEN (data - 'budget') #- '{contact,name}' #- '{contact,phone}' #- '{contact,email}' \
ELSE data - 'budget' - 'contact' END";

/// Which rows a principal's listing query may range over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowScope {
    /// Shipper organizations see their own bookings in every status.
    OwnedByOrg { org_id: Uuid },
    /// Carrier organizations see the open marketplace, nothing else.
    Marketplace,
    /// "Both" organizations get the union; the marketplace half excludes
    /// their own rows, which the owned half already returns in full.
    MarketplaceAndOwned { org_id: Uuid },
}

pub fn row_scope(principal: &Principal) -> RowScope {
    match principal.org_type {
        OrganizationType::Shipper => RowScope::OwnedByOrg {
            org_id: principal.org_id.clone(),
        },
        OrganizationType::Carrier => RowScope::Marketplace,
        OrganizationType::Both => RowScope::MarketplaceAndOwned {
            org_id: principal.org_id.clone(),
        },
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Shipper,
    Carrier,
}

/// Resolves the view a principal gets on a single booking, or `None` when
/// the row is invisible to them. A carrier keeps (stripped) access to a
/// booking their organization has tendered on, so a bidder can observe the
/// outcome after award.
pub fn view_for(
    principal: &Principal,
    shipper_org_id: &Uuid,
    status_name: &str,
    org_has_bid: bool,
) -> Option<View> {
    if principal.can_act_as_shipper() && principal.org_id == *shipper_org_id {
        return Some(View::Shipper);
    }

    if principal.can_act_as_carrier()
        && (MARKETPLACE_STATUSES.contains(&status_name) || org_has_bid)
    {
        return Some(View::Carrier);
    }

    None
}

/// The carrier-facing shape of a booking. Budget and personal contact
/// fields do not exist on this type; the projection is enumerable here
/// rather than scattered through query code.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CarrierBooking {
    pub uuid: Uuid,
    pub status: booking::Status,
    pub pickup: Stop,
    pub delivery: Stop,
    pub cargo: Cargo,
    pub pickup_window: Window,
    pub requirements: Vec<String>,
    #[serde(default)]
    pub contact: Option<CarrierContact>,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CarrierContact {
    pub company: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum BookingProjection {
    Shipper(Booking),
    Carrier(CarrierBooking),
}

/// In-memory mirror of `CARRIER_DATA_EXPR`, used when a transaction
/// already holds the full document and must answer a carrier.
pub fn project_for_carrier(booking: &Booking) -> CarrierBooking {
    let contact = if booking.share_contact_company {
        Some(CarrierContact {
            company: booking.contact.company.clone(),
        })
    } else {
        None
    };

    CarrierBooking {
        uuid: booking.uuid.clone(),
        status: booking.status.clone(),
        pickup: booking.pickup.clone(),
        delivery: booking.delivery.clone(),
        cargo: booking.cargo.clone(),
        pickup_window: booking.pickup_window.clone(),
        requirements: booking.requirements.clone(),
        contact,
        created_at: booking.created_at,
        published_at: booking.published_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{BookingDraft, Budget, Contact};
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn principal(org_type: OrganizationType) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            org_type,
            roles: vec![],
        }
    }

    fn booking() -> Booking {
        let draft = BookingDraft {
            pickup: Stop {
                address: "3 Depot Pl".into(),
                suburb: "Wetherill Park".into(),
            },
            delivery: Stop {
                address: "19 Harbour Rd".into(),
                suburb: "Fremantle".into(),
            },
            cargo: Cargo {
                description: "refrigerated produce".into(),
                weight_kg: dec!(1800),
                pallet_count: Some(4),
            },
            pickup_window: Window {
                earliest: Utc::now() + Duration::days(1),
                latest: Utc::now() + Duration::days(2),
            },
            requirements: vec!["refrigerated".into()],
            budget: Budget {
                minimum: Some(dec!(1500)),
                maximum: Some(dec!(2400)),
                notes: Some("prefer single driver".into()),
            },
            contact: Contact {
                name: "Ari Chen".into(),
                phone: "0400 555 666".into(),
                email: "ari@example.com".into(),
                company: Some("Chen Produce".into()),
            },
            share_contact_company: true,
        };

        let mut booking = Booking::new(9, Uuid::new_v4(), Uuid::new_v4(), draft);
        booking.publish().unwrap();
        booking
    }

    #[test]
    fn row_scope_follows_organization_type() {
        let shipper = principal(OrganizationType::Shipper);
        assert_eq!(
            row_scope(&shipper),
            RowScope::OwnedByOrg {
                org_id: shipper.org_id.clone()
            }
        );

        let carrier = principal(OrganizationType::Carrier);
        assert_eq!(row_scope(&carrier), RowScope::Marketplace);

        let both = principal(OrganizationType::Both);
        assert_eq!(
            row_scope(&both),
            RowScope::MarketplaceAndOwned {
                org_id: both.org_id.clone()
            }
        );
    }

    #[test]
    fn owner_resolves_to_shipper_view_in_any_status() {
        let booking = booking();
        let mut owner = principal(OrganizationType::Shipper);
        owner.org_id = booking.shipper_org_id.clone();

        for status in ["draft", "open", "in_bidding", "awarded", "cancelled"] {
            assert_eq!(
                view_for(&owner, &booking.shipper_org_id, status, false),
                Some(View::Shipper)
            );
        }
    }

    #[test]
    fn carrier_sees_marketplace_statuses_only() {
        let booking = booking();
        let carrier = principal(OrganizationType::Carrier);

        assert_eq!(
            view_for(&carrier, &booking.shipper_org_id, "open", false),
            Some(View::Carrier)
        );
        assert_eq!(
            view_for(&carrier, &booking.shipper_org_id, "in_bidding", false),
            Some(View::Carrier)
        );
        assert_eq!(
            view_for(&carrier, &booking.shipper_org_id, "draft", false),
            None
        );
        assert_eq!(
            view_for(&carrier, &booking.shipper_org_id, "awarded", false),
            None
        );
    }

    #[test]
    fn bidder_keeps_stripped_access_after_award() {
        let booking = booking();
        let carrier = principal(OrganizationType::Carrier);

        assert_eq!(
            view_for(&carrier, &booking.shipper_org_id, "awarded", true),
            Some(View::Carrier)
        );
    }

    #[test]
    fn shipper_never_sees_foreign_bookings() {
        let booking = booking();
        let outsider = principal(OrganizationType::Shipper);

        for status in ["open", "in_bidding", "awarded"] {
            assert_eq!(
                view_for(&outsider, &booking.shipper_org_id, status, false),
                None
            );
        }
    }

    #[test]
    fn both_org_owner_gets_full_view() {
        let booking = booking();
        let mut both = principal(OrganizationType::Both);
        both.org_id = booking.shipper_org_id.clone();

        assert_eq!(
            view_for(&both, &booking.shipper_org_id, "in_bidding", false),
            Some(View::Shipper)
        );
    }

    #[test]
    fn carrier_projection_carries_no_budget_or_personal_contact() {
        let booking = booking();
        let projected = project_for_carrier(&booking);

        let value = serde_json::to_value(&projected).unwrap();
        assert!(value.get("budget").is_none());
        assert_eq!(value["contact"], json!({ "company": "Chen Produce" }));

        let shipper_value = serde_json::to_value(&booking).unwrap();
        assert!(shipper_value.get("budget").is_some());
    }

    #[test]
    fn contact_disappears_without_opt_in() {
        let mut booking = booking();
        booking.share_contact_company = false;

        let projected = project_for_carrier(&booking);

        assert!(projected.contact.is_none());
    }

    #[test]
    fn carrier_type_deserializes_from_stripped_document() {
        // mirror of what CARRIER_DATA_EXPR leaves behind
        let booking = booking();
        let mut value = serde_json::to_value(&booking).unwrap();

        let doc = value.as_object_mut().unwrap();
        doc.remove("budget");
        let contact = doc["contact"].as_object_mut().unwrap();
        contact.remove("name");
        contact.remove("phone");
        contact.remove("email");

        let projected: CarrierBooking = serde_json::from_value(value).unwrap();
        assert_eq!(
            projected.contact.unwrap().company,
            Some("Chen Produce".into())
        );

        // opt-out path drops the contact object entirely
        let mut value = serde_json::to_value(&booking).unwrap();
        let doc = value.as_object_mut().unwrap();
        doc.remove("budget");
        doc.remove("contact");

        let projected: CarrierBooking = serde_json::from_value(value).unwrap();
        assert!(projected.contact.is_none());
    }

    #[test]
    fn sql_projection_strips_every_sensitive_key() {
        for fragment in [
            "- 'budget'",
            "#- '{contact,name}'",
            "#- '{contact,phone}'",
            "#- '{contact,email}'",
            "- 'contact'",
        ] {
            assert!(
                CARRIER_DATA_EXPR.contains(fragment),
                "projection expression lost {}",
                fragment
            );
        }
    }
}
