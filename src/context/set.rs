//! Entity collections.

use std::marker::PhantomData;

use sea_query::{Expr, Query, SimpleExpr, SqliteQueryBuilder};
use tracing::debug;

use super::{BookContext, EntityQuery};
use crate::entities::{AuthorId, Book, BookId, Entity, LineItem, OrderId, PriceOffer};
use crate::error::{is_foreign_key_violation, is_unique_violation, ContextError, Result};
use crate::model::{EntityKind, QueryFilter};
use crate::storage::schema::{BookAuthors, Books, LineItems, Orders, PriceOffers};

/// The `E` rows reachable through a context.
///
/// Reads honour the standing filter of `E` unless the set was obtained with
/// [`ignore_query_filters`](Self::ignore_query_filters). Key-addressed writes
/// reach any row with that key, except that Order rows stay scoped to the
/// context's data key.
pub struct EntitySet<'a, E: Entity> {
    ctx: &'a BookContext,
    ignore_filters: bool,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, E: Entity> EntitySet<'a, E> {
    pub(crate) fn new(ctx: &'a BookContext) -> Self {
        Self {
            ctx,
            ignore_filters: false,
            _entity: PhantomData,
        }
    }

    /// Bypass standing filters for everything issued through this set.
    pub fn ignore_query_filters(mut self) -> Self {
        debug!(entity = E::KIND.name(), "Standing query filters bypassed");
        self.ignore_filters = true;
        self
    }

    /// All visible rows, ordered by key.
    pub fn query(&self) -> EntityQuery<'a, E> {
        let mut select = E::select();
        E::order_by_key(&mut select);
        EntityQuery::new(self.ctx, select, vec![E::KIND], self.ignore_filters)
    }

    pub async fn find(&self, key: E::Key) -> Result<Option<E>> {
        self.query().and_where(E::key_condition(key)).first().await
    }

    /// Insert `entity`, returning it with its store-assigned key.
    pub async fn add(&self, entity: E) -> Result<E> {
        let sql = entity.insert().to_string(SqliteQueryBuilder);
        let result = sqlx::query(&sql)
            .execute(self.ctx.pool())
            .await
            .map_err(|e| write_error::<E>(e, entity.key().to_string()))?;

        let entity = if self.ctx.model().entity(E::KIND).has_generated_key() {
            entity.with_generated_key(result.last_insert_rowid())
        } else {
            entity
        };

        debug!(entity = E::KIND.name(), key = %entity.key(), "Entity added");
        Ok(entity)
    }

    /// Write every non-key column of `entity` back to its row.
    pub async fn update(&self, entity: &E) -> Result<()> {
        let key = entity.key();
        let mut stmt = entity.update();
        stmt.and_where(E::key_condition(key));
        if let Some(condition) = self.write_scope(E::KIND) {
            stmt.and_where(condition);
        }

        let sql = stmt.to_string(SqliteQueryBuilder);
        let result = sqlx::query(&sql)
            .execute(self.ctx.pool())
            .await
            .map_err(|e| write_error::<E>(e, key.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(not_found::<E>(key));
        }
        Ok(())
    }

    /// Delete the row with `key`. Dependents with cascading references go
    /// with it; restricting references make the delete fail.
    pub async fn remove(&self, key: E::Key) -> Result<()> {
        let mut stmt = E::delete();
        stmt.and_where(E::key_condition(key));
        if let Some(condition) = self.write_scope(E::KIND) {
            stmt.and_where(condition);
        }

        let sql = stmt.to_string(SqliteQueryBuilder);
        let result = sqlx::query(&sql)
            .execute(self.ctx.pool())
            .await
            .map_err(|e| self.delete_error(e, key))?;

        if result.rows_affected() == 0 {
            return Err(not_found::<E>(key));
        }

        debug!(entity = E::KIND.name(), key = %key, "Entity removed");
        Ok(())
    }

    /// Ownership predicate for writes. A soft-delete flag only hides rows
    /// from reads, so it never narrows a write.
    fn write_scope(&self, kind: EntityKind) -> Option<SimpleExpr> {
        match self.ctx.model().query_filter(kind)? {
            QueryFilter::DataKey { .. } if !self.ignore_filters => self.ctx.filter_condition(kind),
            _ => None,
        }
    }

    fn delete_error(&self, err: sqlx::Error, key: E::Key) -> ContextError {
        if !is_foreign_key_violation(&err) {
            return ContextError::Database(err);
        }

        let dependents = self.ctx.model().restricting_dependents(E::KIND);
        if dependents.is_empty() {
            return ContextError::ForeignKey {
                entity: E::KIND.name(),
                message: err.to_string(),
            };
        }

        ContextError::RestrictedDelete {
            entity: E::KIND.name(),
            key: key.to_string(),
            referenced_by: dependents
                .iter()
                .map(|kind| kind.name())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

fn write_error<E: Entity>(err: sqlx::Error, key: String) -> ContextError {
    if is_unique_violation(&err) {
        ContextError::DuplicateKey {
            entity: E::KIND.name(),
            key,
        }
    } else if is_foreign_key_violation(&err) {
        ContextError::ForeignKey {
            entity: E::KIND.name(),
            message: err.to_string(),
        }
    } else {
        ContextError::Database(err)
    }
}

fn not_found<E: Entity>(key: E::Key) -> ContextError {
    ContextError::NotFound {
        entity: E::KIND.name(),
        key: key.to_string(),
    }
}

impl<'a> EntitySet<'a, Book> {
    /// Books written by `author_id`, in the author's listed order.
    pub fn by_author(&self, author_id: AuthorId) -> EntityQuery<'a, Book> {
        let mut select = Book::select();
        select
            .inner_join(
                BookAuthors::Table,
                Expr::col((BookAuthors::Table, BookAuthors::BookId))
                    .equals((Books::Table, Books::BookId)),
            )
            .and_where(Expr::col((BookAuthors::Table, BookAuthors::AuthorId)).eq(author_id))
            .order_by((BookAuthors::Table, BookAuthors::Order), sea_query::Order::Asc)
            .order_by((Books::Table, Books::BookId), sea_query::Order::Asc);

        EntityQuery::new(self.ctx, select, vec![EntityKind::Book], self.ignore_filters)
    }

    /// Flag a book as deleted. It stays in storage. Flagging an already
    /// flagged book succeeds.
    pub async fn soft_delete(&self, book_id: BookId) -> Result<()> {
        let mut stmt = Query::update();
        stmt.table(Books::Table)
            .value(Books::SoftDeleted, true)
            .and_where(Book::key_condition(book_id));

        let sql = stmt.to_string(SqliteQueryBuilder);
        let result = sqlx::query(&sql).execute(self.ctx.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(not_found::<Book>(book_id));
        }

        debug!(book_id, "Book soft-deleted");
        Ok(())
    }
}

impl<'a> EntitySet<'a, LineItem> {
    /// Line items of `order_id`. Hidden when the order is not visible.
    pub fn for_order(&self, order_id: OrderId) -> EntityQuery<'a, LineItem> {
        let mut select = LineItem::select();
        select
            .inner_join(
                Orders::Table,
                Expr::col((Orders::Table, Orders::OrderId))
                    .equals((LineItems::Table, LineItems::OrderId)),
            )
            .and_where(Expr::col((LineItems::Table, LineItems::OrderId)).eq(order_id))
            .order_by((LineItems::Table, LineItems::LineNum), sea_query::Order::Asc);

        EntityQuery::new(
            self.ctx,
            select,
            vec![EntityKind::LineItem, EntityKind::Order],
            self.ignore_filters,
        )
    }
}

impl<'a> EntitySet<'a, PriceOffer> {
    /// Offers on `book_id`. Hidden when the book is not visible.
    pub fn for_book(&self, book_id: BookId) -> EntityQuery<'a, PriceOffer> {
        let mut select = PriceOffer::select();
        select
            .inner_join(
                Books::Table,
                Expr::col((Books::Table, Books::BookId))
                    .equals((PriceOffers::Table, PriceOffers::BookId)),
            )
            .and_where(Expr::col((PriceOffers::Table, PriceOffers::BookId)).eq(book_id));
        PriceOffer::order_by_key(&mut select);

        EntityQuery::new(
            self.ctx,
            select,
            vec![EntityKind::PriceOffer, EntityKind::Book],
            self.ignore_filters,
        )
    }
}
