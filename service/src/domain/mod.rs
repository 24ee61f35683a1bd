//! Domain definitions.

pub mod booking;
pub mod item;
pub mod user;

pub use self::{booking::Booking, item::Item, user::User};
