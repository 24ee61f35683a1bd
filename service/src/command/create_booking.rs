//! [`Command`] for creating a new [`Booking`].

use common::operations::{By, Insert, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{booking, item, user, Booking, Item, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Booking`].
#[derive(Clone, Copy, Debug)]
pub struct CreateBooking {
    /// ID of the [`User`] requesting the [`Booking`].
    pub booker_id: user::Id,

    /// ID of the [`Item`] to be booked.
    pub item_id: item::Id,

    /// [`DateTime`] the [`Booking`] starts at.
    ///
    /// [`DateTime`]: common::DateTime
    pub start: booking::StartDateTime,

    /// [`DateTime`] the [`Booking`] ends at.
    ///
    /// [`DateTime`]: common::DateTime
    pub end: booking::EndDateTime,
}

impl<Db, Clk> Command<CreateBooking> for Service<Db, Clk>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Item>, item::Id>>,
            Ok = Option<Item>,
            Err = Traced<database::Error>,
        > + Database<Insert<Booking>, Err = Traced<database::Error>>,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateBooking) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateBooking {
            booker_id,
            item_id,
            start,
            end,
        } = cmd;

        let booker = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(booker_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(booker_id))
            .map_err(tracerr::wrap!())?;

        let item = self
            .database()
            .execute(Select(By::<Option<Item>, _>::new(item_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ItemNotExists(item_id))
            .map_err(tracerr::wrap!())?;

        if !item.available {
            return Err(tracerr::new!(E::ItemNotAvailable(item.id)));
        }
        if item.owner_id == booker.id {
            return Err(tracerr::new!(E::SelfBooking(item.id)));
        }

        let booking = Booking::new(item.id, booker.id, start, end);
        self.database()
            .execute(Insert(booking.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Booking(id: {})` of `Item(id: {})` requested by `User(id: {})`",
            booking.id,
            item.id,
            booker.id,
        );

        Ok(booking)
    }
}

/// Error of [`CreateBooking`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Item`] is not available for booking.
    #[display("`Item(id: {_0})` is not available for booking")]
    ItemNotAvailable(#[error(not(source))] item::Id),

    /// [`Item`] with the provided ID does not exist.
    #[display("`Item(id: {_0})` does not exist")]
    ItemNotExists(#[error(not(source))] item::Id),

    /// [`User`] tries to book an [`Item`] owned by themselves.
    #[display("`Item(id: {_0})` cannot be booked by its owner")]
    SelfBooking(#[error(not(source))] item::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
