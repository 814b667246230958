//! Persisted entity shapes and their table mapping.
//!
//! Each entity knows how to read itself from a row and how to build the
//! statements that write it. Which rows a statement may touch (keys, standing
//! filters) is decided by the context, not here.

mod book;
mod order;

pub use book::{
    Author, AuthorId, Book, BookAuthor, BookAuthorKey, BookId, PriceOffer, PriceOfferId,
};
pub use order::{LineItem, LineItemId, Order, OrderId};

use std::fmt;

use sea_query::{
    ColumnDef, DeleteStatement, InsertStatement, SelectStatement, SimpleExpr, UpdateStatement,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::error::{ContextError, Result};
use crate::model::EntityKind;

/// A row type mapped to one table.
pub trait Entity: Sized + Send + Sync + Unpin + 'static {
    const KIND: EntityKind;

    type Key: Copy + fmt::Display + Send + Sync;

    fn key(&self) -> Self::Key;

    /// Predicate matching the row with `key`, table-qualified.
    fn key_condition(key: Self::Key) -> SimpleExpr;

    /// `SELECT <all columns> FROM <table>`, unordered and unfiltered.
    fn select() -> SelectStatement;

    fn order_by_key(select: &mut SelectStatement);

    /// `INSERT` of every column the store does not generate.
    fn insert(&self) -> InsertStatement;

    /// `UPDATE <table> SET <non-key columns>` without a `WHERE` clause.
    fn update(&self) -> UpdateStatement;

    /// `DELETE FROM <table>` without a `WHERE` clause.
    fn delete() -> DeleteStatement;

    /// Adopt the key the store assigned on insert.
    fn with_generated_key(self, _id: i64) -> Self {
        self
    }

    fn from_row(row: &SqliteRow) -> Result<Self>;

    /// Columns other than a store-generated key.
    fn column_defs() -> Vec<ColumnDef>;
}

/// Read an integer column into a narrower type.
fn int_column<T: TryFrom<i64>>(row: &SqliteRow, column: &'static str) -> Result<T> {
    let value: i64 = row.try_get(column)?;
    T::try_from(value).map_err(|_| ContextError::InvalidRow {
        column,
        message: format!("{value} out of range"),
    })
}
