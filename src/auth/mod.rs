pub mod authorizor;
mod platform;
mod principal;

pub use platform::Platform;
pub use principal::{OrganizationType, Principal};
