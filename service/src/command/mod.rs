//! [`Command`] definition.

pub mod authorize_comment;
pub mod create_booking;
pub mod decide_booking;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_comment::AuthorizeComment, create_booking::CreateBooking,
    decide_booking::DecideBooking,
};
