//! Item-related definitions.

use std::{collections::HashMap, num::NonZeroUsize};

use serde::Serialize;
use service::{
    command::{self, AuthorizeComment},
    domain::{self, item, user},
    query::{self, nearest_bookings, CommentEligibility},
    read::booking::{Nearest, Short},
    Command as _, Query as _,
};

use crate::{
    api::{self, NotFoundError},
    define_error, AsError, Error, Service,
};

/// Item along with its last and next bookings, as seen by its owner.
#[derive(Clone, Debug, Serialize)]
pub struct OwnedItem {
    /// ID of this [`OwnedItem`].
    pub id: item::Id,

    /// Name of this [`OwnedItem`].
    pub name: String,

    /// Description of this [`OwnedItem`].
    pub description: String,

    /// Indicator whether this [`OwnedItem`] may be booked.
    pub available: bool,

    /// ID of the request this [`OwnedItem`] was shared in response to, if any.
    pub request_id: Option<item::RequestId>,

    /// Booking that has already started, ending the latest.
    pub last_booking: Option<Short>,

    /// Upcoming booking starting the latest.
    pub next_booking: Option<Short>,
}

impl From<(domain::Item, Nearest)> for OwnedItem {
    fn from((item, nearest): (domain::Item, Nearest)) -> Self {
        let domain::Item {
            id,
            owner_id: _,
            name,
            description,
            available,
            request_id,
        } = item;
        let Nearest { last, next } = nearest;
        Self {
            id,
            name: name.to_string(),
            description: description.to_string(),
            available,
            request_id,
            last_booking: last,
            next_booking: next,
        }
    }
}

/// Returns the [`Nearest`] bookings of the `item`.
///
/// Anyone but the owner of the `item` gets no bookings.
///
/// # Errors
///
/// Possible error codes:
/// - `ITEM_NOT_FOUND` - the `item` does not exist.
#[tracing::instrument(skip_all, fields(cli.command = "nearest"))]
pub async fn nearest(
    service: &Service,
    item: item::Id,
    requester: user::Id,
) -> Result<Nearest, Error> {
    service
        .execute(nearest_bookings::ForItem {
            item_id: item,
            requester_id: requester,
        })
        .await
        .map_err(AsError::into_error)
}

/// Returns the [`Nearest`] bookings of each of the `items`.
///
/// Unknown `items`, and the ones not owned by the `requester`, get no
/// bookings.
///
/// # Errors
///
/// Only internal ones.
#[tracing::instrument(skip_all, fields(cli.command = "nearest"))]
pub async fn nearest_many(
    service: &Service,
    items: Vec<item::Id>,
    requester: user::Id,
) -> Result<HashMap<item::Id, Nearest>, Error> {
    service
        .execute(nearest_bookings::ForItems {
            item_ids: items,
            requester_id: requester,
        })
        .await
        .map_err(AsError::into_error)
}

/// Lists [`OwnedItem`]s of the `owner`.
///
/// # Errors
///
/// Possible error codes:
/// - `USER_NOT_FOUND` - the `owner` does not exist.
#[tracing::instrument(skip_all, fields(cli.command = "owner-items"))]
pub async fn owned(
    service: &Service,
    owner: user::Id,
    from: Option<usize>,
    size: Option<NonZeroUsize>,
) -> Result<api::Page<OwnedItem>, Error> {
    service
        .execute(nearest_bookings::ForOwner {
            owner_id: owner,
            from,
            size,
        })
        .await
        .map_err(AsError::into_error)
        .map(Into::into)
}

/// Checks whether the `user` may comment the `item`.
///
/// In `strict` mode fails instead of answering `false`.
///
/// # Errors
///
/// Possible error codes (`strict` mode only):
/// - `USER_NOT_FOUND` - the `user` does not exist;
/// - `ITEM_NOT_FOUND` - the `item` does not exist;
/// - `NO_PRIOR_BOOKING` - the `user` has never completed a booking of the
///                        `item`.
#[tracing::instrument(skip_all, fields(cli.command = "can-comment"))]
pub async fn can_comment(
    service: &Service,
    item: item::Id,
    user: user::Id,
    strict: bool,
) -> Result<bool, Error> {
    if strict {
        service
            .execute(AuthorizeComment {
                item_id: item,
                user_id: user,
            })
            .await
            .map_err(AsError::into_error)
            .map(|()| true)
    } else {
        service
            .execute(CommentEligibility {
                item_id: item,
                user_id: user,
            })
            .await
            .map_err(AsError::into_error)
    }
}

impl AsError for query::nearest_bookings::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ItemNotExists(_) => Some(NotFoundError::Item.into()),
            Self::UserNotExists(_) => Some(NotFoundError::User.into()),
        }
    }
}

impl AsError for command::authorize_comment::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "NO_PRIOR_BOOKING"]
                #[exit = 65]
                #[message = "`User` has never completed a `Booking` of the \
                             `Item`"]
                NoPriorBooking,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ItemNotExists(_) => Some(NotFoundError::Item.into()),
            Self::NoPriorBooking(..) => Some(Error::NoPriorBooking.into()),
            Self::UserNotExists(_) => Some(NotFoundError::User.into()),
        }
    }
}
