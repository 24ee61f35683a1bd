//! [`Query`] checking whether a [`User`] may comment an [`Item`].

use common::{
    operations::{By, Select},
    Clock,
};
use tracerr::Traced;

use crate::{
    domain::{item, user, Booking},
    infra::{database, Database},
    read::booking::{Completed, CompletedBy},
    Query, Service,
};
#[cfg(doc)]
use crate::{
    command::AuthorizeComment,
    domain::{Item, User},
};

/// Queries whether a [`User`] has completed any [`Booking`] of an [`Item`].
///
/// Unlike the [`AuthorizeComment`] command, doesn't check whether the
/// [`User`] and the [`Item`] exist, answering `false` for unknown ones.
#[derive(Clone, Copy, Debug)]
pub struct CommentEligibility {
    /// ID of the [`Item`] to be commented.
    pub item_id: item::Id,

    /// ID of the [`User`] commenting the [`Item`].
    pub user_id: user::Id,
}

impl<Db, Clk> Query<CommentEligibility> for Service<Db, Clk>
where
    Db: Database<
        Select<By<Option<Completed<Booking>>, CompletedBy>>,
        Ok = Option<Completed<Booking>>,
        Err = Traced<database::Error>,
    >,
    Clk: Clock,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        CommentEligibility { item_id, user_id }: CommentEligibility,
    ) -> Result<Self::Ok, Self::Err> {
        self.database()
            .execute(Select(By::<Option<Completed<Booking>>, _>::new(
                CompletedBy {
                    item_id,
                    booker_id: user_id,
                    now: self.clock().now(),
                },
            )))
            .await
            .map(|b| b.is_some())
            .map_err(tracerr::wrap!())
    }
}
