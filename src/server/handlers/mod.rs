pub mod bids;
pub mod bookings;
