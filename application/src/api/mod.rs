//! Command line API definitions.

pub mod booking;
pub mod item;

use std::num::NonZeroUsize;

use common::pagination;
use serde::Serialize;
use service::domain::booking::Decision;

use crate::{args::Command, define_error, AsError as _, Error, Service};

pub use self::{booking::Booking, item::OwnedItem};

/// Executes the provided [`Command`] with the [`Service`], returning its
/// outcome ready to be printed.
///
/// # Errors
///
/// If the [`Command`] fails.
pub async fn execute(
    service: &Service,
    command: Command,
) -> Result<serde_json::Value, Error> {
    match command {
        Command::Create {
            booker,
            item,
            start,
            end,
        } => render(&booking::create(service, booker, item, start, end).await?),
        Command::Approve { booking, owner } => render(
            &booking::decide(service, booking, owner, Decision::Approve)
                .await?,
        ),
        Command::Reject { booking, owner } => render(
            &booking::decide(service, booking, owner, Decision::Reject)
                .await?,
        ),
        Command::Get { booking, user } => {
            render(&booking::get(service, booking, user).await?)
        }
        Command::List {
            user,
            role,
            state,
            from,
            size,
        } => render(
            &booking::list(service, user, role, state, from, size).await?,
        ),
        Command::Nearest { items, requester } => {
            if let [item] = items.as_slice() {
                render(&item::nearest(service, *item, requester).await?)
            } else {
                render(&item::nearest_many(service, items, requester).await?)
            }
        }
        Command::OwnerItems { owner, from, size } => {
            render(&item::owned(service, owner, from, size).await?)
        }
        Command::CanComment { item, user, strict } => {
            render(&item::can_comment(service, item, user, strict).await?)
        }
    }
}

/// Renders the provided `value` as JSON.
fn render(value: &impl Serialize) -> Result<serde_json::Value, Error> {
    serde_json::to_value(value).map_err(|e| e.into_error())
}

/// Page of `T`s.
#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    /// Elements of this [`Page`].
    pub nodes: Vec<T>,

    /// Zero-based number of this [`Page`].
    pub number: usize,

    /// Requested size of this [`Page`].
    pub size: NonZeroUsize,
}

impl<T, U: Into<T>> From<pagination::Page<U>> for Page<T> {
    fn from(page: pagination::Page<U>) -> Self {
        let pagination::Page {
            nodes,
            number,
            size,
        } = page;
        Self {
            nodes: nodes.into_iter().map(Into::into).collect(),
            number,
            size,
        }
    }
}

define_error! {
    enum NotFoundError {
        #[code = "USER_NOT_FOUND"]
        #[exit = 66]
        #[message = "`User` does not exist"]
        User,

        #[code = "ITEM_NOT_FOUND"]
        #[exit = 66]
        #[message = "`Item` does not exist"]
        Item,

        #[code = "BOOKING_NOT_FOUND"]
        #[exit = 66]
        #[message = "`Booking` does not exist"]
        Booking,
    }
}
