//! [`Query`] collection related to a single [`Booking`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{booking, user, Booking},
    infra::{database, Database},
    read::booking::Participated,
    Query, Service,
};
#[cfg(doc)]
use crate::domain::{Item, User};

/// Queries a [`Booking`] by its [`booking::Id`] on behalf of a [`User`].
///
/// Only the booker and the owner of the booked [`Item`] may see the
/// [`Booking`], so for anyone else it doesn't exist.
#[derive(Clone, Copy, Debug)]
pub struct ById {
    /// ID of the [`Booking`] to query.
    pub booking_id: booking::Id,

    /// ID of the [`User`] querying the [`Booking`].
    pub user_id: user::Id,
}

impl<Db, Clk> Query<ById> for Service<Db, Clk>
where
    Db: Database<
        Select<By<Option<Participated<Booking>>, (booking::Id, user::Id)>>,
        Ok = Option<Participated<Booking>>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        ById {
            booking_id,
            user_id,
        }: ById,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        self.database()
            .execute(Select(By::<Option<Participated<Booking>>, _>::new((
                booking_id, user_id,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .map(|Participated(b)| b)
            .ok_or(E::BookingNotExists(booking_id))
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`ById`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Booking`] with the provided ID does not exist, or is not visible to
    /// the [`User`].
    #[display("`Booking(id: {_0})` does not exist")]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),
}
