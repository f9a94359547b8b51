use oso::{Oso, PolarClass};

use crate::auth::{Platform, Principal};
use crate::entities::{Bid, Booking};

pub fn new() -> Oso {
    let mut o = Oso::new();

    o.register_class(Platform::get_polar_class()).unwrap();
    o.register_class(Principal::get_polar_class()).unwrap();
    o.register_class(Booking::get_polar_class()).unwrap();
    o.register_class(Bid::get_polar_class()).unwrap();

    o.load_str(include_str!("rules.polar")).unwrap();

    o
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::OrganizationType;
    use crate::entities::{BookingDraft, Budget, Cargo, Contact, Stop, Window};
    use crate::fees;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn principal(org_type: OrganizationType) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            org_type,
            roles: vec![],
        }
    }

    fn draft() -> BookingDraft {
        BookingDraft {
            pickup: Stop {
                address: "1 Mill Ln".into(),
                suburb: "Albion".into(),
            },
            delivery: Stop {
                address: "88 Gateway Dr".into(),
                suburb: "Truganina".into(),
            },
            cargo: Cargo {
                description: "machinery crate".into(),
                weight_kg: dec!(950),
                pallet_count: Some(1),
            },
            pickup_window: Window {
                earliest: Utc::now() + Duration::days(1),
                latest: Utc::now() + Duration::days(3),
            },
            requirements: vec![],
            budget: Budget::default(),
            contact: Contact {
                name: "Lee Park".into(),
                phone: "0400 333 444".into(),
                email: "lee@example.com".into(),
                company: None,
            },
            share_contact_company: false,
        }
    }

    fn booking_owned_by(shipper: &Principal) -> Booking {
        Booking::new(1, shipper.user_id.clone(), shipper.org_id.clone(), draft())
    }

    fn bid_by(carrier: &Principal, booking: &Booking) -> Bid {
        let breakdown = fees::compute_charge(dec!(700)).unwrap();

        Bid::new(
            1,
            booking.id,
            carrier.user_id.clone(),
            carrier.org_id.clone(),
            dec!(700),
            breakdown,
            None,
            None,
        )
    }

    #[test]
    fn only_shippers_create_bookings() {
        let authorizor = new();

        let shipper = principal(OrganizationType::Shipper);
        let carrier = principal(OrganizationType::Carrier);
        let both = principal(OrganizationType::Both);

        let result = authorizor.is_allowed(shipper, "create_booking", Platform::default());
        assert_eq!(result.unwrap(), true);

        let result = authorizor.is_allowed(carrier, "create_booking", Platform::default());
        assert_eq!(result.unwrap(), false);

        let result = authorizor.is_allowed(both, "create_booking", Platform::default());
        assert_eq!(result.unwrap(), true);
    }

    #[test]
    fn booking_shipper_role_requires_owning_org() {
        let authorizor = new();

        let owner = principal(OrganizationType::Shipper);
        let other_shipper = principal(OrganizationType::Shipper);
        let booking = booking_owned_by(&owner);

        let result = authorizor.query_rule("has_role", (owner.clone(), "shipper", booking.clone()));
        assert!(result.unwrap().next().unwrap().is_ok());

        let result = authorizor.query_rule(
            "has_role",
            (other_shipper.clone(), "shipper", booking.clone()),
        );
        assert!(result.unwrap().next().is_none());

        for action in ["update", "publish", "cancel", "respond_to_bid", "complete"] {
            let result = authorizor.is_allowed(owner.clone(), action, booking.clone());
            assert_eq!(result.unwrap(), true);

            let result = authorizor.is_allowed(other_shipper.clone(), action, booking.clone());
            assert_eq!(result.unwrap(), false);
        }
    }

    #[test]
    fn carriers_never_hold_shipper_actions() {
        let authorizor = new();

        let owner = principal(OrganizationType::Shipper);
        let booking = booking_owned_by(&owner);

        // a carrier from the owning organization id but without shipper access
        let mut carrier = principal(OrganizationType::Carrier);
        carrier.org_id = owner.org_id.clone();

        for action in ["update", "publish", "cancel", "respond_to_bid", "complete"] {
            let result = authorizor.is_allowed(carrier.clone(), action, booking.clone());
            assert_eq!(result.unwrap(), false);
        }
    }

    #[test]
    fn carriers_submit_bids_and_shippers_do_not() {
        let authorizor = new();

        let owner = principal(OrganizationType::Shipper);
        let carrier = principal(OrganizationType::Carrier);
        let mut booking = booking_owned_by(&owner);
        booking.publish().unwrap();

        let result = authorizor.is_allowed(carrier, "submit_bid", booking.clone());
        assert_eq!(result.unwrap(), true);

        let result = authorizor.is_allowed(owner, "submit_bid", booking.clone());
        assert_eq!(result.unwrap(), false);
    }

    #[test]
    fn bid_actions_belong_to_the_tendering_org() {
        let authorizor = new();

        let owner = principal(OrganizationType::Shipper);
        let carrier = principal(OrganizationType::Carrier);
        let rival = principal(OrganizationType::Carrier);

        let mut booking = booking_owned_by(&owner);
        booking.publish().unwrap();
        let bid = bid_by(&carrier, &booking);

        let result = authorizor.query_rule("has_role", (carrier.clone(), "bidder", bid.clone()));
        assert!(result.unwrap().next().unwrap().is_ok());

        let result = authorizor.query_rule("has_role", (rival.clone(), "bidder", bid.clone()));
        assert!(result.unwrap().next().is_none());

        for action in ["withdraw", "start_transit", "mark_delivered"] {
            let result = authorizor.is_allowed(carrier.clone(), action, bid.clone());
            assert_eq!(result.unwrap(), true);

            let result = authorizor.is_allowed(rival.clone(), action, bid.clone());
            assert_eq!(result.unwrap(), false);

            let result = authorizor.is_allowed(owner.clone(), action, bid.clone());
            assert_eq!(result.unwrap(), false);
        }
    }

    #[test]
    fn expire_sweep_is_system_only() {
        let authorizor = new();

        let system = Principal::new_system();
        let carrier = principal(OrganizationType::Carrier);

        let result = authorizor.is_allowed(system, "expire_bids", Platform::default());
        assert_eq!(result.unwrap(), true);

        let result = authorizor.is_allowed(carrier, "expire_bids", Platform::default());
        assert_eq!(result.unwrap(), false);
    }
}
