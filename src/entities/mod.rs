pub mod bid;
pub mod booking;

pub use bid::Bid;
pub use booking::{Booking, BookingDraft, BookingPatch, Budget, Cargo, Contact, Stop, Window};
