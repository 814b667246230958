//! Filtered reads.

use std::marker::PhantomData;

use sea_query::{Alias, Expr, SelectStatement, SimpleExpr, SqliteQueryBuilder};
use sqlx::Row;
use tracing::debug;

use super::BookContext;
use crate::entities::Entity;
use crate::error::Result;
use crate::model::EntityKind;

/// A read of `E` rows.
///
/// The standing filters of every kind in `filtered` (the queried kind plus
/// any kind joined for navigation) are added when the query runs, unless
/// [`ignore_query_filters`](Self::ignore_query_filters) was called.
pub struct EntityQuery<'a, E: Entity> {
    ctx: &'a BookContext,
    select: SelectStatement,
    filtered: Vec<EntityKind>,
    ignore_filters: bool,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, E: Entity> EntityQuery<'a, E> {
    pub(crate) fn new(
        ctx: &'a BookContext,
        select: SelectStatement,
        filtered: Vec<EntityKind>,
        ignore_filters: bool,
    ) -> Self {
        Self {
            ctx,
            select,
            filtered,
            ignore_filters,
            _entity: PhantomData,
        }
    }

    /// Run this query without standing filters.
    pub fn ignore_query_filters(mut self) -> Self {
        if !self.ignore_filters {
            debug!(entity = E::KIND.name(), "Standing query filters bypassed");
        }
        self.ignore_filters = true;
        self
    }

    pub(crate) fn and_where(mut self, condition: SimpleExpr) -> Self {
        self.select.and_where(condition);
        self
    }

    fn build(&self) -> SelectStatement {
        let mut select = self.select.clone();
        if !self.ignore_filters {
            self.ctx.apply_filters(&mut select, &self.filtered);
        }
        select
    }

    /// The SQL this query runs.
    pub fn to_sql(&self) -> String {
        self.build().to_string(SqliteQueryBuilder)
    }

    /// All visible rows.
    pub async fn to_list(self) -> Result<Vec<E>> {
        let sql = self.to_sql();
        let rows = sqlx::query(&sql).fetch_all(self.ctx.pool()).await?;
        rows.iter().map(E::from_row).collect()
    }

    /// The first visible row, if any.
    pub async fn first(self) -> Result<Option<E>> {
        let sql = self.build().limit(1).to_string(SqliteQueryBuilder);
        let row = sqlx::query(&sql).fetch_optional(self.ctx.pool()).await?;
        row.as_ref().map(E::from_row).transpose()
    }

    /// Number of visible rows.
    pub async fn count(self) -> Result<i64> {
        let sql = self
            .build()
            .clear_selects()
            .expr_as(Expr::cust("COUNT(*)"), Alias::new("row_count"))
            .to_string(SqliteQueryBuilder);
        let row = sqlx::query(&sql).fetch_one(self.ctx.pool()).await?;
        Ok(row.try_get("row_count")?)
    }
}
