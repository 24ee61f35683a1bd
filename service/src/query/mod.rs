//! [`Query`] definition.

pub mod booking;
pub mod bookings;
pub mod comment_eligibility;
pub mod nearest_bookings;

/// [`Query`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Query;

pub use self::comment_eligibility::CommentEligibility;
