//! [`Booking`]-related definitions.

use std::num::NonZeroUsize;

use common::DateTime;
use serde::Serialize;
use service::{
    command::{self, CreateBooking, DecideBooking},
    domain::{self, booking, item, user},
    query,
    read::booking::list::Role,
    Command as _, Query as _,
};

use crate::{
    api::{self, NotFoundError},
    define_error, AsError, Error, Service,
};

/// Reservation of an item by a user.
#[derive(Clone, Debug, Serialize)]
pub struct Booking {
    /// ID of this [`Booking`].
    pub id: booking::Id,

    /// ID of the booked item.
    pub item_id: item::Id,

    /// ID of the user who booked the item.
    pub booker_id: user::Id,

    /// [`DateTime`] this [`Booking`] starts at.
    pub start: DateTime,

    /// [`DateTime`] this [`Booking`] ends at.
    pub end: DateTime,

    /// Status of this [`Booking`] (`WAITING`, `APPROVED` or `REJECTED`).
    pub status: String,
}

impl From<domain::Booking> for Booking {
    fn from(booking: domain::Booking) -> Self {
        let domain::Booking {
            id,
            item_id,
            booker_id,
            start,
            end,
            status,
        } = booking;
        Self {
            id,
            item_id,
            booker_id,
            start: start.coerce(),
            end: end.coerce(),
            status: status.to_string(),
        }
    }
}

/// Books an item on behalf of the `booker`.
///
/// # Errors
///
/// Possible error codes:
/// - `USER_NOT_FOUND` - the `booker` does not exist;
/// - `ITEM_NOT_FOUND` - the `item` does not exist;
/// - `ITEM_NOT_AVAILABLE` - the `item` cannot be booked at the moment;
/// - `SELF_BOOKING` - the `booker` owns the `item`.
#[tracing::instrument(skip_all, fields(cli.command = "create"))]
pub async fn create(
    service: &Service,
    booker: user::Id,
    item: item::Id,
    start: DateTime,
    end: DateTime,
) -> Result<Booking, Error> {
    service
        .execute(CreateBooking {
            booker_id: booker,
            item_id: item,
            start: start.coerce(),
            end: end.coerce(),
        })
        .await
        .map_err(AsError::into_error)
        .map(Into::into)
}

/// Applies the `owner`'s [`booking::Decision`] to the `booking`.
///
/// # Errors
///
/// Possible error codes:
/// - `BOOKING_NOT_FOUND` - the `booking` does not exist, or its item is not
///                         owned by the `owner`;
/// - `ALREADY_DECIDED` - the `booking` already carries the `decision`.
#[tracing::instrument(skip_all, fields(cli.command = "decide"))]
pub async fn decide(
    service: &Service,
    booking: booking::Id,
    owner: user::Id,
    decision: booking::Decision,
) -> Result<Booking, Error> {
    service
        .execute(DecideBooking {
            booking_id: booking,
            owner_id: owner,
            decision,
        })
        .await
        .map_err(AsError::into_error)
        .map(Into::into)
}

/// Returns the `booking` to its booker or to the owner of its item.
///
/// # Errors
///
/// Possible error codes:
/// - `BOOKING_NOT_FOUND` - the `booking` does not exist, or the `user`
///                         neither booked nor owns its item.
#[tracing::instrument(skip_all, fields(cli.command = "get"))]
pub async fn get(
    service: &Service,
    booking: booking::Id,
    user: user::Id,
) -> Result<Booking, Error> {
    service
        .execute(query::booking::ById {
            booking_id: booking,
            user_id: user,
        })
        .await
        .map_err(AsError::into_error)
        .map(Into::into)
}

/// Lists [`Booking`]s of the `user` in the provided [`Role`].
///
/// # Errors
///
/// Possible error codes:
/// - `USER_NOT_FOUND` - the `user` does not exist;
/// - `INVALID_STATE` - the `state` is not a known one.
#[tracing::instrument(skip_all, fields(cli.command = "list"))]
pub async fn list(
    service: &Service,
    user: user::Id,
    role: Role,
    state: Option<String>,
    from: Option<usize>,
    size: Option<NonZeroUsize>,
) -> Result<api::Page<Booking>, Error> {
    service
        .execute(query::bookings::List {
            user_id: user,
            role,
            state,
            from,
            size,
        })
        .await
        .map_err(AsError::into_error)
        .map(Into::into)
}

impl AsError for command::create_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ITEM_NOT_AVAILABLE"]
                #[exit = 65]
                #[message = "`Item` is not available for booking"]
                ItemNotAvailable,

                #[code = "SELF_BOOKING"]
                #[exit = 65]
                #[message = "`Item` cannot be booked by its owner"]
                SelfBooking,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ItemNotAvailable(_) => Some(Error::ItemNotAvailable.into()),
            Self::ItemNotExists(_) => Some(NotFoundError::Item.into()),
            Self::SelfBooking(_) => Some(Error::SelfBooking.into()),
            Self::UserNotExists(_) => Some(NotFoundError::User.into()),
        }
    }
}

impl AsError for command::decide_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ALREADY_DECIDED"]
                #[exit = 65]
                #[message = "`Booking` already carries this decision"]
                AlreadyDecided,
            }
        }

        match self {
            Self::AlreadyDecided(..) => Some(Error::AlreadyDecided.into()),
            Self::BookingNotExists(_) => Some(NotFoundError::Booking.into()),
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for query::booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::BookingNotExists(_) => Some(NotFoundError::Booking.into()),
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for query::bookings::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INVALID_STATE"]
                #[exit = 64]
                #[message = "Unknown `Booking` state"]
                InvalidState,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InvalidState(_) => Some(Error::InvalidState.into()),
            Self::UserNotExists(_) => Some(NotFoundError::User.into()),
        }
    }
}
