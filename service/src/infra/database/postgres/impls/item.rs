//! [`Item`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{item, Item},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Builds an [`Item`] out of the provided [`Row`].
fn from_row(row: &Row) -> Item {
    Item {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        description: row.get("description"),
        available: row.get("available"),
        request_id: row.get("request_id"),
    }
}

impl<C, IDs> Database<Select<By<HashMap<item::Id, Item>, IDs>>> for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[item::Id]>,
{
    type Ok = HashMap<item::Id, Item>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<item::Id, Item>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[item::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, owner_id, name, description, available, request_id \
            FROM items \
            WHERE id = ANY($1::UUID[])";
        Ok(self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .map(|item| (item.id, item))
            .collect())
    }
}

impl<C> Database<Select<By<Option<Item>, item::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<item::Id, Item>, [item::Id; 1]>>,
        Ok = HashMap<item::Id, Item>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Item>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Item>, item::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C>
    Database<Select<By<read::item::list::Page, read::item::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
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

        let offset = i64::try_from(arguments.offset()).unwrap_or(i64::MAX);
        let limit = i64::try_from(arguments.limit()).unwrap_or(i64::MAX);

        let sql = format!(
            "SELECT id, owner_id, name, description, available, request_id \
             FROM items \
             WHERE owner_id = $1::UUID \
             ORDER BY id {order} \
             OFFSET $2::INT8 \
             LIMIT $3::INT8",
            order = read::item::list::ORDER.sql(),
        );
        let rows = self
            .query(&sql, &[&owner_id, &offset, &limit])
            .await
            .map_err(tracerr::wrap!())?;

        Ok(read::item::list::Page::new(
            &arguments,
            rows.iter().map(from_row),
        ))
    }
}
