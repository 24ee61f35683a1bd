//! [`Command`] for authorizing a comment upon an [`Item`].

use common::{
    operations::{By, Select},
    Clock,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{item, user, Booking, Item, User},
    infra::{database, Database},
    read::booking::{Completed, CompletedBy},
    Service,
};

use super::Command;

/// [`Command`] ensuring a [`User`] may leave a comment upon an [`Item`].
///
/// Only [`User`]s who have completed a [`Booking`] of the [`Item`] may
/// comment it.
#[derive(Clone, Copy, Debug)]
pub struct AuthorizeComment {
    /// ID of the [`Item`] to be commented.
    pub item_id: item::Id,

    /// ID of the [`User`] commenting the [`Item`].
    pub user_id: user::Id,
}

impl<Db, Clk> Command<AuthorizeComment> for Service<Db, Clk>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Item>, item::Id>>,
            Ok = Option<Item>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Completed<Booking>>, CompletedBy>>,
            Ok = Option<Completed<Booking>>,
            Err = Traced<database::Error>,
        >,
    Clk: Clock,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeComment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeComment { item_id, user_id } = cmd;

        let user = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        let item = self
            .database()
            .execute(Select(By::<Option<Item>, _>::new(item_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ItemNotExists(item_id))
            .map_err(tracerr::wrap!())?;

        self.database()
            .execute(Select(By::<Option<Completed<Booking>>, _>::new(
                CompletedBy {
                    item_id: item.id,
                    booker_id: user.id,
                    now: self.clock().now(),
                },
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::NoPriorBooking(user.id, item.id))
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

/// Error of [`AuthorizeComment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Item`] with the provided ID does not exist.
    #[display("`Item(id: {_0})` does not exist")]
    ItemNotExists(#[error(not(source))] item::Id),

    /// [`User`] has no completed [`Booking`] of the [`Item`].
    #[display("`User(id: {_0})` has no completed `Booking` of `Item(id: {_1})`")]
    NoPriorBooking(user::Id, item::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
