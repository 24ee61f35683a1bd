//! [`Booking`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{booking, item, user, Booking},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::{
        self,
        booking::{
            list::{Refinement, Role},
            Completed, CompletedBy, Owned, Participated,
        },
    },
};

/// Columns of a [`Booking`] selected from the `bookings` table aliased as `b`.
const COLUMNS: &str = "\
    b.id, b.item_id, b.booker_id, b.start_at, b.end_at, b.status";

/// Builds a [`Booking`] out of the provided [`Row`] selected with [`COLUMNS`].
fn from_row(row: &Row) -> Booking {
    Booking {
        id: row.get("id"),
        item_id: row.get("item_id"),
        booker_id: row.get("booker_id"),
        start: row.get("start_at"),
        end: row.get("end_at"),
        status: row.get("status"),
    }
}

impl<C> Database<Insert<Booking>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Booking>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(booking): Insert<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(booking))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Booking>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(booking): Update<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        let Booking {
            id,
            item_id,
            booker_id,
            start,
            end,
            status,
        } = booking;

        const SQL: &str = "\
            INSERT INTO bookings (\
                id, item_id, booker_id, start_at, end_at, status\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::TIMESTAMPTZ, $5::TIMESTAMPTZ, \
                $6::INT2\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET start_at = EXCLUDED.start_at, \
                end_at = EXCLUDED.end_at, \
                status = EXCLUDED.status";
        self.exec(
            SQL,
            &[&id, &item_id, &booker_id, &start, &end, &status],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Booking, booking::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Booking, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: booking::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM bookings \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C>
    Database<Select<By<Option<Owned<Booking>>, (booking::Id, user::Id)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Owned<Booking>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Owned<Booking>>, (booking::Id, user::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (id, owner_id) = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM bookings AS b \
             INNER JOIN items AS i ON i.id = b.item_id \
             WHERE b.id = $1::UUID \
               AND i.owner_id = $2::UUID",
        );
        Ok(self
            .query_opt(&sql, &[&id, &owner_id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
            .map(Owned))
    }
}

impl<C>
    Database<
        Select<By<Option<Participated<Booking>>, (booking::Id, user::Id)>>,
    > for Postgres<C>
where
    C: Connection,
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

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM bookings AS b \
             INNER JOIN items AS i ON i.id = b.item_id \
             WHERE b.id = $1::UUID \
               AND (b.booker_id = $2::UUID OR i.owner_id = $2::UUID)",
        );
        Ok(self
            .query_opt(&sql, &[&id, &user_id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
            .map(Participated))
    }
}

impl<C>
    Database<
        Select<By<read::booking::list::Page, read::booking::list::Selector>>,
    > for Postgres<C>
where
    C: Connection,
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

        let offset = i64::try_from(arguments.offset()).unwrap_or(i64::MAX);
        let limit = i64::try_from(arguments.limit()).unwrap_or(i64::MAX);

        let mut ps: Vec<&(dyn ToSql + Sync)> =
            vec![&offset, &limit, &predicate.actor];

        let mut conditions = vec![match predicate.role {
            Role::Booker => "b.booker_id = $3::UUID".to_owned(),
            Role::Owner => "i.owner_id = $3::UUID".to_owned(),
        }];
        if let Some(refinement) = &predicate.refinement {
            conditions.push(match refinement {
                Refinement::Current(now) => {
                    ps.push(now);
                    let idx = ps.len();
                    format!(
                        "b.start_at < ${idx}::TIMESTAMPTZ \
                         AND b.end_at > ${idx}::TIMESTAMPTZ",
                    )
                }
                Refinement::Past(now) => {
                    ps.push(now);
                    format!("b.end_at < ${}::TIMESTAMPTZ", ps.len())
                }
                Refinement::Future(now) => {
                    ps.push(now);
                    format!("b.start_at > ${}::TIMESTAMPTZ", ps.len())
                }
                Refinement::Status(status) => {
                    ps.push(status);
                    format!("b.status = ${}::INT2", ps.len())
                }
            });
        }

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM bookings AS b \
             INNER JOIN items AS i ON i.id = b.item_id \
             WHERE {conditions} \
             ORDER BY b.start_at {order}, b.id {order} \
             OFFSET $1::INT8 \
             LIMIT $2::INT8",
            conditions = conditions.iter().format(" AND "),
            order = read::booking::list::ORDER.sql(),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        Ok(read::booking::list::Page::new(
            &arguments,
            rows.iter().map(from_row),
        ))
    }
}

impl<C, IDs> Database<Select<By<Vec<Booking>, IDs>>> for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[item::Id]>,
{
    type Ok = Vec<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Booking>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[item::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM bookings AS b \
             WHERE b.item_id = ANY($1::UUID[])",
        );
        Ok(self
            .query(&sql, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Select<By<Option<Completed<Booking>>, CompletedBy>>>
    for Postgres<C>
where
    C: Connection,
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

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM bookings AS b \
             WHERE b.item_id = $1::UUID \
               AND b.booker_id = $2::UUID \
               AND b.end_at < $3::TIMESTAMPTZ \
             LIMIT 1",
        );
        Ok(self
            .query_opt(&sql, &[&item_id, &booker_id, &now])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
            .map(Completed))
    }
}
