//! Customer orders.

use chrono::{DateTime, Utc};
use sea_query::{
    ColumnDef, DeleteStatement, Expr, InsertStatement, Query, SelectStatement, SimpleExpr,
    UpdateStatement,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{int_column, BookId, Entity};
use crate::data_key::DataKey;
use crate::error::{ContextError, Result};
use crate::model::EntityKind;
use crate::storage::schema::{LineItems, Orders};

pub type OrderId = i64;
pub type LineItemId = i64;

/// An order owned by the customer identified by `customer_name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: OrderId,
    pub date_ordered_utc: DateTime<Utc>,
    pub customer_name: DataKey,
}

impl Order {
    /// An unsaved order placed now by `customer_name`.
    pub fn new(customer_name: DataKey) -> Self {
        Self {
            order_id: 0,
            date_ordered_utc: Utc::now(),
            customer_name,
        }
    }
}

impl Entity for Order {
    const KIND: EntityKind = EntityKind::Order;

    type Key = OrderId;

    fn key(&self) -> OrderId {
        self.order_id
    }

    fn key_condition(key: OrderId) -> SimpleExpr {
        Expr::col((Orders::Table, Orders::OrderId)).eq(key)
    }

    fn select() -> SelectStatement {
        Query::select()
            .columns([
                (Orders::Table, Orders::OrderId),
                (Orders::Table, Orders::DateOrderedUtc),
                (Orders::Table, Orders::CustomerName),
            ])
            .from(Orders::Table)
            .to_owned()
    }

    fn order_by_key(select: &mut SelectStatement) {
        select.order_by((Orders::Table, Orders::OrderId), sea_query::Order::Asc);
    }

    fn insert(&self) -> InsertStatement {
        Query::insert()
            .into_table(Orders::Table)
            .columns([Orders::DateOrderedUtc, Orders::CustomerName])
            .values_panic([
                self.date_ordered_utc.to_rfc3339().into(),
                self.customer_name.to_string().into(),
            ])
            .to_owned()
    }

    fn update(&self) -> UpdateStatement {
        Query::update()
            .table(Orders::Table)
            .values([
                (Orders::DateOrderedUtc, self.date_ordered_utc.to_rfc3339().into()),
                (Orders::CustomerName, self.customer_name.to_string().into()),
            ])
            .to_owned()
    }

    fn delete() -> DeleteStatement {
        Query::delete().from_table(Orders::Table).to_owned()
    }

    fn with_generated_key(mut self, id: i64) -> Self {
        self.order_id = id;
        self
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        let date_ordered_utc: String = row.try_get("date_ordered_utc")?;
        let date_ordered_utc = DateTime::parse_from_rfc3339(&date_ordered_utc)
            .map_err(|e| ContextError::InvalidRow {
                column: "date_ordered_utc",
                message: e.to_string(),
            })?
            .with_timezone(&Utc);

        let customer_name: String = row.try_get("customer_name")?;
        let customer_name = customer_name
            .parse()
            .map_err(|e: uuid::Error| ContextError::InvalidRow {
                column: "customer_name",
                message: e.to_string(),
            })?;

        Ok(Self {
            order_id: row.try_get("order_id")?,
            date_ordered_utc,
            customer_name,
        })
    }

    fn column_defs() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new(Orders::DateOrderedUtc)
                .text()
                .not_null()
                .to_owned(),
            ColumnDef::new(Orders::CustomerName)
                .text()
                .not_null()
                .to_owned(),
        ]
    }
}

/// One line of an order: a number of copies of the chosen book.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub line_item_id: LineItemId,
    pub line_num: u8,
    pub num_books: u16,
    pub book_price: f64,
    pub order_id: OrderId,
    pub book_id: BookId,
}

impl LineItem {
    pub fn new(
        order_id: OrderId,
        book_id: BookId,
        line_num: u8,
        num_books: u16,
        book_price: f64,
    ) -> Self {
        Self {
            line_item_id: 0,
            line_num,
            num_books,
            book_price,
            order_id,
            book_id,
        }
    }
}

impl Entity for LineItem {
    const KIND: EntityKind = EntityKind::LineItem;

    type Key = LineItemId;

    fn key(&self) -> LineItemId {
        self.line_item_id
    }

    fn key_condition(key: LineItemId) -> SimpleExpr {
        Expr::col((LineItems::Table, LineItems::LineItemId)).eq(key)
    }

    fn select() -> SelectStatement {
        Query::select()
            .columns([
                (LineItems::Table, LineItems::LineItemId),
                (LineItems::Table, LineItems::LineNum),
                (LineItems::Table, LineItems::NumBooks),
                (LineItems::Table, LineItems::BookPrice),
                (LineItems::Table, LineItems::OrderId),
                (LineItems::Table, LineItems::BookId),
            ])
            .from(LineItems::Table)
            .to_owned()
    }

    fn order_by_key(select: &mut SelectStatement) {
        select.order_by(
            (LineItems::Table, LineItems::LineItemId),
            sea_query::Order::Asc,
        );
    }

    fn insert(&self) -> InsertStatement {
        Query::insert()
            .into_table(LineItems::Table)
            .columns([
                LineItems::LineNum,
                LineItems::NumBooks,
                LineItems::BookPrice,
                LineItems::OrderId,
                LineItems::BookId,
            ])
            .values_panic([
                i64::from(self.line_num).into(),
                i64::from(self.num_books).into(),
                self.book_price.into(),
                self.order_id.into(),
                self.book_id.into(),
            ])
            .to_owned()
    }

    fn update(&self) -> UpdateStatement {
        Query::update()
            .table(LineItems::Table)
            .values([
                (LineItems::LineNum, i64::from(self.line_num).into()),
                (LineItems::NumBooks, i64::from(self.num_books).into()),
                (LineItems::BookPrice, self.book_price.into()),
                (LineItems::OrderId, self.order_id.into()),
                (LineItems::BookId, self.book_id.into()),
            ])
            .to_owned()
    }

    fn delete() -> DeleteStatement {
        Query::delete().from_table(LineItems::Table).to_owned()
    }

    fn with_generated_key(mut self, id: i64) -> Self {
        self.line_item_id = id;
        self
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            line_item_id: row.try_get("line_item_id")?,
            line_num: int_column(row, "line_num")?,
            num_books: int_column(row, "num_books")?,
            book_price: row.try_get("book_price")?,
            order_id: row.try_get("order_id")?,
            book_id: row.try_get("book_id")?,
        })
    }

    fn column_defs() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new(LineItems::LineNum)
                .integer()
                .not_null()
                .to_owned(),
            ColumnDef::new(LineItems::NumBooks)
                .integer()
                .not_null()
                .to_owned(),
            ColumnDef::new(LineItems::BookPrice)
                .double()
                .not_null()
                .to_owned(),
            ColumnDef::new(LineItems::OrderId)
                .integer()
                .not_null()
                .to_owned(),
            ColumnDef::new(LineItems::BookId)
                .integer()
                .not_null()
                .to_owned(),
        ]
    }
}
