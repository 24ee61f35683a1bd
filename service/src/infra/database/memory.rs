//! In-memory [`Database`] implementation.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use common::operations::{By, Commit, Insert, Lock, Select, Transact, Update};
use derive_more::{Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracerr::Traced;

use crate::{
    domain::{booking, item, user, Booking, Item, User},
    infra::{database, Database},
    read::{
        self,
        booking::{Completed, CompletedBy, Owned, Participated},
    },
};

/// In-memory [`Database`] client.
///
/// Clones share the same storage. Writes made in a [`Tx`] are staged and
/// become visible to everyone (the [`Tx`] itself included) only once it's
/// [`Commit`]ted, all of them at once or none.
#[derive(Clone, Debug, Default)]
pub struct Memory<T = NonTx> {
    /// Shared [`Storage`] of this [`Memory`] client.
    storage: Arc<RwLock<Storage>>,

    /// Lock of [`Booking`] rows, held by a [`Tx`] until it's [`Commit`]ted.
    ///
    /// A single lock guards all the [`Booking`]s.
    bookings_lock: Arc<Mutex<()>>,

    /// Connection kind of this [`Memory`] client.
    conn: T,
}

impl Memory {
    /// Creates a new empty [`Memory`] client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Non-transactional [`Memory`] connection.
#[derive(Clone, Copy, Debug, Default)]
pub struct NonTx;

/// Transactional [`Memory`] connection.
#[derive(Clone, Debug, Default)]
pub struct Tx(Arc<Mutex<Staged>>);

/// State of a [`Tx`].
#[derive(Debug, Default)]
struct Staged {
    /// Guard of [`Memory::bookings_lock`], if acquired.
    lock: Option<OwnedMutexGuard<()>>,

    /// [`Write`]s to apply on [`Commit`].
    writes: Vec<Write>,

    /// Indicator whether the [`Tx`] is committed already.
    committed: bool,
}

/// Staged write of a [`Tx`].
#[derive(Clone, Debug)]
enum Write {
    /// [`Insert`] of a [`Booking`].
    Insert(Booking),

    /// [`Update`] of a [`Booking`].
    Update(Booking),
}

impl Staged {
    /// Ensures this [`Staged`] state is not [`Commit`]ted yet.
    fn ensure_active(&self) -> Result<(), Error> {
        if self.committed {
            return Err(Error::AlreadyCommitted);
        }
        Ok(())
    }
}

/// Data stored by a [`Memory`] client.
#[derive(Clone, Debug, Default)]
struct Storage {
    /// Stored [`User`]s.
    users: HashMap<user::Id, User>,

    /// Stored [`Item`]s.
    items: HashMap<item::Id, Item>,

    /// Stored [`Booking`]s, in their creation order.
    bookings: BTreeMap<booking::Id, Booking>,
}

impl Storage {
    /// Returns ID of the [`User`] owning the [`Item`] of the provided
    /// [`Booking`].
    fn owner_of(&self, booking: &Booking) -> Option<user::Id> {
        self.items.get(&booking.item_id).map(|i| i.owner_id)
    }

    /// Applies the provided [`Write`] to this [`Storage`].
    fn write(&mut self, write: Write) -> Result<(), Error> {
        let (booking, must_exist) = match write {
            Write::Insert(b) => (b, false),
            Write::Update(b) => (b, true),
        };

        if must_exist && !self.bookings.contains_key(&booking.id) {
            return Err(Error::BookingNotExists(booking.id));
        }
        if !self.users.contains_key(&booking.booker_id) {
            return Err(Error::UserNotExists(booking.booker_id));
        }
        if !self.items.contains_key(&booking.item_id) {
            return Err(Error::ItemNotExists(booking.item_id));
        }

        _ = self.bookings.insert(booking.id, booking);
        Ok(())
    }
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Referenced [`Booking`] does not exist.
    #[display("`Booking(id: {_0})` does not exist")]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// Referenced [`Item`] does not exist.
    #[display("`Item(id: {_0})` does not exist")]
    ItemNotExists(#[error(not(source))] item::Id),

    /// Referenced [`User`] does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// [`Tx`] is used after being [`Commit`]ted.
    #[display("`Tx` is already committed")]
    AlreadyCommitted,
}

impl Memory<Tx> {
    /// Stages the provided [`Write`] until [`Commit`].
    async fn stage(&self, write: Write) -> Result<(), Traced<database::Error>> {
        let mut staged = self.conn.0.lock().await;
        staged
            .ensure_active()
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;
        staged.writes.push(write);
        Ok(())
    }
}

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Memory {
            storage: Arc::clone(&self.storage),
            bookings_lock: Arc::clone(&self.bookings_lock),
            conn: Tx::default(),
        })
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        let mut staged = self.conn.0.lock().await;
        staged
            .ensure_active()
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;

        let mut storage = self.storage.write().await;
        let mut next = storage.clone();
        for write in staged.writes.drain(..) {
            next.write(write)
                .map_err(tracerr::from_and_wrap!(=> database::Error))?;
        }
        *storage = next;

        staged.committed = true;
        drop(staged.lock.take());
        Ok(())
    }
}

impl Database<Lock<By<Booking, booking::Id>>> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Booking, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut staged = self.conn.0.lock().await;
        staged
            .ensure_active()
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;
        if staged.lock.is_none() {
            staged.lock =
                Some(Arc::clone(&self.bookings_lock).lock_owned().await);
        }
        Ok(())
    }
}

impl Database<Insert<User>> for Memory<NonTx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        _ = self.storage.write().await.users.insert(user.id, user);
        Ok(())
    }
}

impl Database<Insert<Item>> for Memory<NonTx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(item): Insert<Item>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut storage = self.storage.write().await;
        if !storage.users.contains_key(&item.owner_id) {
            return Err(tracerr::new!(database::Error::from(
                Error::UserNotExists(item.owner_id)
            )));
        }
        _ = storage.items.insert(item.id, item);
        Ok(())
    }
}

impl Database<Insert<Booking>> for Memory<NonTx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(booking): Insert<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        self.storage
            .write()
            .await
            .write(Write::Insert(booking))
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl Database<Insert<Booking>> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(booking): Insert<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        self.stage(Write::Insert(booking))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl Database<Update<Booking>> for Memory<NonTx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(booking): Update<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        self.storage
            .write()
            .await
            .write(Write::Update(booking))
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl Database<Update<Booking>> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(booking): Update<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        self.stage(Write::Update(booking))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<T> Database<Select<By<Option<User>, user::Id>>> for Memory<T> {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.storage.read().await.users.get(by.inner()).cloned())
    }
}

impl<T> Database<Select<By<Option<Item>, item::Id>>> for Memory<T> {
    type Ok = Option<Item>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Item>, item::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.storage.read().await.items.get(by.inner()).cloned())
    }
}

impl<T, IDs> Database<Select<By<HashMap<item::Id, Item>, IDs>>> for Memory<T>
where
    IDs: AsRef<[item::Id]>,
{
    type Ok = HashMap<item::Id, Item>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<item::Id, Item>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let storage = self.storage.read().await;
        Ok(by
            .inner()
            .as_ref()
            .iter()
            .filter_map(|id| storage.items.get(id))
            .map(|i| (i.id, i.clone()))
            .collect())
    }
}

impl<T>
    Database<Select<By<read::item::list::Page, read::item::list::Selector>>>
    for Memory<T>
{
    type Ok = read::item::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::item::list::Page, read::item::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::item::list::Selector {
            arguments,
            filter: read::item::list::Filter { owner_id },
        } = by.into_inner();

        let mut items = self
            .storage
            .read()
            .await
            .items
            .values()
            .filter(|i| i.owner_id == owner_id)
            .cloned()
            .collect::<Vec<_>>();
        items.sort_by(read::item::list::compare);

        Ok(read::item::list::Page::new(&arguments, arguments.slice(items)))
    }
}

impl<T>
    Database<Select<By<Option<Owned<Booking>>, (booking::Id, user::Id)>>>
    for Memory<T>
{
    type Ok = Option<Owned<Booking>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Owned<Booking>>, (booking::Id, user::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (id, owner_id) = by.into_inner();

        let storage = self.storage.read().await;
        Ok(storage
            .bookings
            .get(&id)
            .filter(|b| storage.owner_of(b) == Some(owner_id))
            .cloned()
            .map(Owned))
    }
}

impl<T>
    Database<
        Select<By<Option<Participated<Booking>>, (booking::Id, user::Id)>>,
    > for Memory<T>
{
    type Ok = Option<Participated<Booking>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<Participated<Booking>>, (booking::Id, user::Id)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (id, user_id) = by.into_inner();

        let storage = self.storage.read().await;
        Ok(storage
            .bookings
            .get(&id)
            .filter(|b| {
                b.booker_id == user_id || storage.owner_of(b) == Some(user_id)
            })
            .cloned()
            .map(Participated))
    }
}

impl<T>
    Database<
        Select<By<read::booking::list::Page, read::booking::list::Selector>>,
    > for Memory<T>
{
    type Ok = read::booking::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::booking::list::Page, read::booking::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::booking::list::Selector {
            arguments,
            filter: predicate,
        } = by.into_inner();

        let storage = self.storage.read().await;
        let mut bookings = storage
            .bookings
            .values()
            .filter(|b| {
                storage
                    .owner_of(b)
                    .is_some_and(|owner_id| predicate.matches(b, owner_id))
            })
            .cloned()
            .collect::<Vec<_>>();
        bookings.sort_by(read::booking::list::compare);

        Ok(read::booking::list::Page::new(
            &arguments,
            arguments.slice(bookings),
        ))
    }
}

impl<T, IDs> Database<Select<By<Vec<Booking>, IDs>>> for Memory<T>
where
    IDs: AsRef<[item::Id]>,
{
    type Ok = Vec<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Booking>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.inner().as_ref();

        Ok(self
            .storage
            .read()
            .await
            .bookings
            .values()
            .filter(|b| ids.contains(&b.item_id))
            .cloned()
            .collect())
    }
}

impl<T> Database<Select<By<Option<Completed<Booking>>, CompletedBy>>>
    for Memory<T>
{
    type Ok = Option<Completed<Booking>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Completed<Booking>>, CompletedBy>>,
    ) -> Result<Self::Ok, Self::Err> {
        let CompletedBy {
            item_id,
            booker_id,
            now,
        } = by.into_inner();

        Ok(self
            .storage
            .read()
            .await
            .bookings
            .values()
            .find(|b| {
                b.item_id == item_id
                    && b.booker_id == booker_id
                    && b.is_finished_at(&now)
            })
            .cloned()
            .map(Completed))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common::{
        operations::{By, Commit, Insert, Lock, Select, Transact, Update},
        DateTime, Handler as _,
    };

    use crate::{
        domain::{booking, item, user, Booking, Item, User},
        read::booking::Participated,
    };

    use super::Memory;

    async fn seeded() -> (Memory, Item, User) {
        let db = Memory::new();
        let owner = User {
            id: user::Id::new(),
            name: user::Name::new("Owner").unwrap(),
            email: user::Email::new("owner@example.com").unwrap(),
        };
        let booker = User {
            id: user::Id::new(),
            name: user::Name::new("Booker").unwrap(),
            email: user::Email::new("booker@example.com").unwrap(),
        };
        let item = Item {
            id: item::Id::new(),
            owner_id: owner.id,
            name: item::Name::new("Drill").unwrap(),
            description: item::Description::new("Cordless").unwrap(),
            available: true,
            request_id: None,
        };
        db.execute(Insert(owner)).await.unwrap();
        db.execute(Insert(booker.clone())).await.unwrap();
        db.execute(Insert(item.clone())).await.unwrap();
        (db, item, booker)
    }

    fn booking(item: &Item, booker: &User) -> Booking {
        let start = DateTime::from_rfc3339("2024-05-01T12:00:00Z").unwrap();
        Booking::new(
            item.id,
            booker.id,
            start.coerce(),
            (start + Duration::from_secs(60)).coerce(),
        )
    }

    #[tokio::test]
    async fn rejects_dangling_references() {
        let (db, item, booker) = seeded().await;

        let mut b = booking(&item, &booker);
        b.booker_id = user::Id::new();
        assert!(db.execute(Insert(b)).await.is_err());

        let mut b = booking(&item, &booker);
        b.item_id = item::Id::new();
        assert!(db.execute(Insert(b)).await.is_err());

        assert!(db.execute(Update(booking(&item, &booker))).await.is_err());
    }

    #[tokio::test]
    async fn tx_writes_are_visible_after_commit_only() {
        let (db, item, booker) = seeded().await;
        let mut b = booking(&item, &booker);
        db.execute(Insert(b.clone())).await.unwrap();

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Lock(By::<Booking, _>::new(b.id))).await.unwrap();
        b.status = booking::Status::Approved;
        tx.execute(Update(b.clone())).await.unwrap();

        let stored = db
            .execute(Select(By::<Option<Participated<Booking>>, _>::new((
                b.id, booker.id,
            ))))
            .await
            .unwrap()
            .unwrap()
            .0;
        assert_eq!(stored.status, booking::Status::Waiting);

        tx.execute(Commit).await.unwrap();

        let stored = db
            .execute(Select(By::<Option<Participated<Booking>>, _>::new((
                b.id, booker.id,
            ))))
            .await
            .unwrap()
            .unwrap()
            .0;
        assert_eq!(stored.status, booking::Status::Approved);

        assert!(tx.execute(Commit).await.is_err());
    }

    #[tokio::test]
    async fn dropped_tx_discards_writes_and_releases_lock() {
        let (db, item, booker) = seeded().await;
        let mut b = booking(&item, &booker);
        db.execute(Insert(b.clone())).await.unwrap();

        {
            let tx = db.execute(Transact).await.unwrap();
            tx.execute(Lock(By::<Booking, _>::new(b.id))).await.unwrap();
            b.status = booking::Status::Rejected;
            tx.execute(Update(b.clone())).await.unwrap();
        }

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Lock(By::<Booking, _>::new(b.id))).await.unwrap();
        let stored = tx
            .execute(Select(By::<Option<Participated<Booking>>, _>::new((
                b.id, booker.id,
            ))))
            .await
            .unwrap()
            .unwrap()
            .0;
        assert_eq!(stored.status, booking::Status::Waiting);
    }
}
