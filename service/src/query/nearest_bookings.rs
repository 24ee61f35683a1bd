//! [`Query`] collection resolving [`Nearest`] [`Booking`]s of [`Item`]s.

use std::{collections::HashMap, num::NonZeroUsize};

use common::{
    operations::{By, Select},
    pagination, Clock,
};
use derive_more::{Display, Error, From};
use itertools::Itertools as _;
use tracerr::Traced;

use crate::{
    domain::{item, user, Booking, Item, User},
    infra::{database, Database},
    read::{booking::Nearest, item::list},
    Query, Service,
};

/// Queries [`Nearest`] [`Booking`]s of a single [`Item`].
///
/// Only the owner of the [`Item`] sees its [`Booking`]s, anyone else gets an
/// empty [`Nearest`].
#[derive(Clone, Copy, Debug)]
pub struct ForItem {
    /// ID of the [`Item`] to resolve [`Nearest`] [`Booking`]s of.
    pub item_id: item::Id,

    /// ID of the [`User`] requesting the [`Item`].
    pub requester_id: user::Id,
}

impl<Db, Clk> Query<ForItem> for Service<Db, Clk>
where
    Db: Database<
            Select<By<Option<Item>, item::Id>>,
            Ok = Option<Item>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Booking>, [item::Id; 1]>>,
            Ok = Vec<Booking>,
            Err = Traced<database::Error>,
        >,
    Clk: Clock,
{
    type Ok = Nearest;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        ForItem {
            item_id,
            requester_id,
        }: ForItem,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let item = self
            .database()
            .execute(Select(By::<Option<Item>, _>::new(item_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ItemNotExists(item_id))
            .map_err(tracerr::wrap!())?;
        if item.owner_id != requester_id {
            return Ok(Nearest::default());
        }

        let bookings = self
            .database()
            .execute(Select(By::<Vec<Booking>, _>::new([item.id])))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(Nearest::resolve(&bookings, &self.clock().now()))
    }
}

/// Queries [`Nearest`] [`Booking`]s of multiple [`Item`]s at once.
///
/// Every requested [`Item`] gets an entry in the result. Unknown [`Item`]s,
/// and the ones not owned by the requester, get an empty [`Nearest`].
#[derive(Clone, Debug)]
pub struct ForItems {
    /// IDs of the [`Item`]s to resolve [`Nearest`] [`Booking`]s of.
    pub item_ids: Vec<item::Id>,

    /// ID of the [`User`] requesting the [`Item`]s.
    pub requester_id: user::Id,
}

impl<Db, Clk> Query<ForItems> for Service<Db, Clk>
where
    Db: Database<
            Select<By<HashMap<item::Id, Item>, Vec<item::Id>>>,
            Ok = HashMap<item::Id, Item>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Booking>, Vec<item::Id>>>,
            Ok = Vec<Booking>,
            Err = Traced<database::Error>,
        >,
    Clk: Clock,
{
    type Ok = HashMap<item::Id, Nearest>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        ForItems {
            item_ids,
            requester_id,
        }: ForItems,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let items = self
            .database()
            .execute(Select(By::<HashMap<item::Id, Item>, _>::new(
                item_ids.clone(),
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let owned = items
            .values()
            .filter(|i| i.owner_id == requester_id)
            .map(|i| i.id)
            .collect::<Vec<_>>();

        let mut resolved = resolve_grouped(self, owned)
            .await
            .map_err(tracerr::wrap!())?;
        Ok(item_ids
            .into_iter()
            .map(|id| (id, resolved.remove(&id).unwrap_or_default()))
            .collect())
    }
}

/// Queries a [`Page`] of [`Item`]s owned by a [`User`] along with their
/// [`Nearest`] [`Booking`]s.
#[derive(Clone, Copy, Debug)]
pub struct ForOwner {
    /// ID of the [`User`] owning the [`Item`]s.
    pub owner_id: user::Id,

    /// Offset of the first requested [`Item`].
    pub from: Option<usize>,

    /// Number of [`Item`]s in a page.
    ///
    /// [`Config::default_page_size`] if [`None`].
    ///
    /// [`Config::default_page_size`]: crate::Config::default_page_size
    pub size: Option<NonZeroUsize>,
}

/// [`Page`] of [`Item`]s with their [`Nearest`] [`Booking`]s.
pub type Page = pagination::Page<(Item, Nearest)>;

impl<Db, Clk> Query<ForOwner> for Service<Db, Clk>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<list::Page, list::Selector>>,
            Ok = list::Page,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Booking>, Vec<item::Id>>>,
            Ok = Vec<Booking>,
            Err = Traced<database::Error>,
        >,
    Clk: Clock,
{
    type Ok = Page;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        ForOwner {
            owner_id,
            from,
            size,
        }: ForOwner,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let owner = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(owner_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(owner_id))
            .map_err(tracerr::wrap!())?;

        let items = self
            .database()
            .execute(Select(By::<list::Page, _>::new(list::Selector {
                arguments: pagination::Arguments::new(
                    from.unwrap_or_default(),
                    size.unwrap_or(self.config().default_page_size),
                ),
                filter: list::Filter { owner_id: owner.id },
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let ids = items.nodes.iter().map(|i| i.id).collect();
        let mut resolved = resolve_grouped(self, ids)
            .await
            .map_err(tracerr::wrap!())?;
        Ok(items.map(|i| {
            let nearest = resolved.remove(&i.id).unwrap_or_default();
            (i, nearest)
        }))
    }
}

/// Resolves [`Nearest`] [`Booking`]s of the [`Item`]s with the provided IDs,
/// selecting all their [`Booking`]s at once.
///
/// [`Item`]s without any [`Booking`] are omitted from the result.
async fn resolve_grouped<Db, Clk>(
    service: &Service<Db, Clk>,
    item_ids: Vec<item::Id>,
) -> Result<HashMap<item::Id, Nearest>, Traced<ExecutionError>>
where
    Db: Database<
        Select<By<Vec<Booking>, Vec<item::Id>>>,
        Ok = Vec<Booking>,
        Err = Traced<database::Error>,
    >,
    Clk: Clock,
{
    if item_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let now = service.clock().now();
    Ok(service
        .database()
        .execute(Select(By::<Vec<Booking>, _>::new(item_ids)))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> ExecutionError))?
        .into_iter()
        .into_group_map_by(|b| b.item_id)
        .into_iter()
        .map(|(id, bookings)| (id, Nearest::resolve(&bookings, &now)))
        .collect())
}

/// Error of [`ForItem`], [`ForItems`] or [`ForOwner`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Item`] with the provided ID does not exist.
    #[display("`Item(id: {_0})` does not exist")]
    ItemNotExists(#[error(not(source))] item::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    };

    use common::{
        clock,
        operations::{By, Select},
        DateTime,
    };
    use tracerr::Traced;

    use crate::{
        domain::{item, user, Booking, Item},
        infra::database::{self, Database},
        Config, Query as _, Service,
    };

    use super::{ForItem, ForItems};

    const HOUR: Duration = Duration::from_secs(60 * 60);

    /// [`Database`] remembering whether any [`Booking`]s were selected.
    #[derive(Debug, Default)]
    struct Spy {
        items: HashMap<item::Id, Item>,
        bookings: Vec<Booking>,
        bookings_selected: AtomicBool,
    }

    impl Database<Select<By<Option<Item>, item::Id>>> for Spy {
        type Ok = Option<Item>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<By<Option<Item>, item::Id>>,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(self.items.get(by.inner()).cloned())
        }
    }

    impl Database<Select<By<HashMap<item::Id, Item>, Vec<item::Id>>>> for Spy {
        type Ok = HashMap<item::Id, Item>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<By<HashMap<item::Id, Item>, Vec<item::Id>>>,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(by
                .inner()
                .iter()
                .filter_map(|id| self.items.get(id))
                .map(|i| (i.id, i.clone()))
                .collect())
        }
    }

    impl<IDs> Database<Select<By<Vec<Booking>, IDs>>> for Spy
    where
        IDs: AsRef<[item::Id]>,
    {
        type Ok = Vec<Booking>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<By<Vec<Booking>, IDs>>,
        ) -> Result<Self::Ok, Self::Err> {
            self.bookings_selected.store(true, Ordering::SeqCst);
            let ids = by.inner().as_ref();
            Ok(self
                .bookings
                .iter()
                .filter(|b| ids.contains(&b.item_id))
                .cloned()
                .collect())
        }
    }

    fn now() -> DateTime {
        DateTime::from_rfc3339("2024-05-01T12:00:00Z").unwrap()
    }

    fn item(owner_id: user::Id) -> Item {
        Item {
            id: item::Id::new(),
            owner_id,
            name: "Drill".parse().unwrap(),
            description: "Cordless, with two batteries".parse().unwrap(),
            available: true,
            request_id: None,
        }
    }

    fn past_booking(item_id: item::Id) -> Booking {
        Booking::new(
            item_id,
            user::Id::new(),
            (now() - HOUR * 3).coerce(),
            (now() - HOUR * 2).coerce(),
        )
    }

    fn service(spy: Spy) -> Service<Spy, clock::Fixed> {
        Service::with_clock(Config::default(), spy, clock::Fixed::at(now()))
    }

    #[tokio::test]
    async fn skips_bookings_for_non_owner() {
        let item = item(user::Id::new());
        let service = service(Spy {
            items: HashMap::from([(item.id, item.clone())]),
            bookings: vec![past_booking(item.id)],
            ..Spy::default()
        });

        let nearest = service
            .execute(ForItem {
                item_id: item.id,
                requester_id: user::Id::new(),
            })
            .await
            .unwrap();

        assert_eq!(nearest.last, None);
        assert_eq!(nearest.next, None);
        assert!(!service.database().bookings_selected.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn resolves_for_owner() {
        let owner = user::Id::new();
        let item = item(owner);
        let past = past_booking(item.id);
        let service = service(Spy {
            items: HashMap::from([(item.id, item.clone())]),
            bookings: vec![past.clone()],
            ..Spy::default()
        });

        let nearest = service
            .execute(ForItem {
                item_id: item.id,
                requester_id: owner,
            })
            .await
            .unwrap();

        assert_eq!(nearest.last.map(|s| s.id), Some(past.id));
        assert_eq!(nearest.next, None);
    }

    #[tokio::test]
    async fn batch_answers_every_requested_item() {
        let owner = user::Id::new();
        let (owned, foreign) = (item(owner), item(user::Id::new()));
        let past = past_booking(owned.id);
        let service = service(Spy {
            items: HashMap::from([
                (owned.id, owned.clone()),
                (foreign.id, foreign.clone()),
            ]),
            bookings: vec![past.clone(), past_booking(foreign.id)],
            ..Spy::default()
        });
        let unknown = item::Id::new();

        let resolved = service
            .execute(ForItems {
                item_ids: vec![owned.id, foreign.id, unknown],
                requester_id: owner,
            })
            .await
            .unwrap();

        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[&owned.id].last.map(|s| s.id), Some(past.id));
        assert_eq!(resolved[&foreign.id].last, None);
        assert_eq!(resolved[&unknown].last, None);
    }
}
