//! [`Command`] for deciding upon a [`Booking`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{booking, user, Booking},
    infra::{database, Database},
    read::booking::Owned,
    Service,
};
#[cfg(doc)]
use crate::domain::{Item, User};

use super::Command;

/// [`Command`] for approving or rejecting a [`Booking`] by the owner of the
/// booked [`Item`].
#[derive(Clone, Copy, Debug)]
pub struct DecideBooking {
    /// ID of the [`Booking`] to decide upon.
    pub booking_id: booking::Id,

    /// ID of the [`User`] owning the booked [`Item`].
    pub owner_id: user::Id,

    /// [`booking::Decision`] to apply.
    pub decision: booking::Decision,
}

impl<Db, Clk> Command<DecideBooking> for Service<Db, Clk>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Booking, booking::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Owned<Booking>>, (booking::Id, user::Id)>>,
            Ok = Option<Owned<Booking>>,
            Err = Traced<database::Error>,
        > + Database<Update<Booking>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DecideBooking) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DecideBooking {
            booking_id,
            owner_id,
            decision,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Concurrent decisions upon the same `Booking` are serialized, so the
        // one coming second observes the first one's result.
        tx.execute(Lock(By::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let Owned(mut booking) = tx
            .execute(Select(By::<Option<Owned<Booking>>, _>::new((
                booking_id, owner_id,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookingNotExists(booking_id))
            .map_err(tracerr::wrap!())?;

        booking
            .decide(decision)
            .map_err(|booking::AlreadyDecided(status)| {
                E::AlreadyDecided(booking_id, status)
            })
            .map_err(tracerr::wrap!())?;

        tx.execute(Update(booking.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Booking(id: {})` is {} by `User(id: {owner_id})`",
            booking.id,
            booking.status.to_string().to_lowercase(),
        );

        Ok(booking)
    }
}

/// Error of [`DecideBooking`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Booking`] already carries the requested [`booking::Decision`].
    #[display(
        "`Booking(id: {_0})` is already {}",
        _1.to_string().to_lowercase()
    )]
    AlreadyDecided(booking::Id, booking::Status),

    /// [`Booking`] with the provided ID does not exist, or the [`User`] does
    /// not own the booked [`Item`].
    #[display("`Booking(id: {_0})` does not exist")]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),
}
