//! [`Query`] collection related to the multiple [`Booking`]s.

use std::num::NonZeroUsize;

use common::{
    operations::{By, Select},
    pagination, Clock,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{user, User},
    infra::{database, Database},
    read::booking::list::{self, Filter, Role, State},
    Query, Service,
};
#[cfg(doc)]
use crate::domain::{Booking, Item};

/// Queries a [`list::Page`] of [`Booking`]s related to a [`User`].
#[derive(Clone, Debug)]
pub struct List {
    /// ID of the [`User`] listing the [`Booking`]s.
    pub user_id: user::Id,

    /// [`Role`] the [`User`] lists the [`Booking`]s in.
    pub role: Role,

    /// Symbol of the [`State`] of the listed [`Booking`]s.
    ///
    /// [`State::All`] if [`None`].
    pub state: Option<String>,

    /// Offset of the first requested [`Booking`].
    ///
    /// Rounded down to the beginning of the page it falls in.
    pub from: Option<usize>,

    /// Number of [`Booking`]s in a page.
    ///
    /// [`Config::default_page_size`] if [`None`].
    ///
    /// [`Config::default_page_size`]: crate::Config::default_page_size
    pub size: Option<NonZeroUsize>,
}

impl<Db, Clk> Query<List> for Service<Db, Clk>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<list::Page, list::Selector>>,
            Ok = list::Page,
            Err = Traced<database::Error>,
        >,
    Clk: Clock,
{
    type Ok = list::Page;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, query: List) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let List {
            user_id,
            role,
            state,
            from,
            size,
        } = query;

        let user = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        let state = state
            .map(|s| s.parse::<State>().map_err(|_| E::InvalidState(s)))
            .transpose()
            .map_err(tracerr::wrap!())?
            .unwrap_or_default();

        let arguments = pagination::Arguments::new(
            from.unwrap_or_default(),
            size.unwrap_or(self.config().default_page_size),
        );
        let predicate =
            Filter { role, state }.predicate(user.id, self.clock().now());

        log::debug!(
            "listing `Booking`s of `User(id: {})` as {role} in {state} state, \
             page {} of size {}",
            user.id,
            arguments.page(),
            arguments.size,
        );

        self.database()
            .execute(Select(By::<list::Page, _>::new(list::Selector {
                arguments,
                filter: predicate,
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`List`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Provided symbol is not a known [`State`].
    #[display("Unknown state: {_0}")]
    InvalidState(#[error(not(source))] String),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
