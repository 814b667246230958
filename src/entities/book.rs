//! Book catalogue entities.

use std::fmt;

use chrono::NaiveDate;
use sea_query::{
    ColumnDef, DeleteStatement, Expr, InsertStatement, Query, SelectStatement, SimpleExpr,
    UpdateStatement,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{int_column, Entity};
use crate::error::{ContextError, Result};
use crate::model::EntityKind;
use crate::storage::schema::{Authors, BookAuthors, Books, PriceOffers};

pub type BookId = i64;
pub type AuthorId = i64;
pub type PriceOfferId = i64;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A book in the catalogue. Soft-deleted books stay in storage but are
/// hidden from default reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub book_id: BookId,
    pub title: String,
    pub description: Option<String>,
    pub published_on: NaiveDate,
    pub publisher: Option<String>,
    pub price: f64,
    pub image_url: Option<String>,
    pub soft_deleted: bool,
}

impl Book {
    /// An unsaved book; the key is assigned on insert.
    pub fn new(title: impl Into<String>, published_on: NaiveDate, price: f64) -> Self {
        Self {
            book_id: 0,
            title: title.into(),
            description: None,
            published_on,
            publisher: None,
            price,
            image_url: None,
            soft_deleted: false,
        }
    }
}

impl Entity for Book {
    const KIND: EntityKind = EntityKind::Book;

    type Key = BookId;

    fn key(&self) -> BookId {
        self.book_id
    }

    fn key_condition(key: BookId) -> SimpleExpr {
        Expr::col((Books::Table, Books::BookId)).eq(key)
    }

    fn select() -> SelectStatement {
        Query::select()
            .columns([
                (Books::Table, Books::BookId),
                (Books::Table, Books::Title),
                (Books::Table, Books::Description),
                (Books::Table, Books::PublishedOn),
                (Books::Table, Books::Publisher),
                (Books::Table, Books::Price),
                (Books::Table, Books::ImageUrl),
                (Books::Table, Books::SoftDeleted),
            ])
            .from(Books::Table)
            .to_owned()
    }

    fn order_by_key(select: &mut SelectStatement) {
        select.order_by((Books::Table, Books::BookId), sea_query::Order::Asc);
    }

    fn insert(&self) -> InsertStatement {
        Query::insert()
            .into_table(Books::Table)
            .columns([
                Books::Title,
                Books::Description,
                Books::PublishedOn,
                Books::Publisher,
                Books::Price,
                Books::ImageUrl,
                Books::SoftDeleted,
            ])
            .values_panic([
                self.title.clone().into(),
                self.description.clone().into(),
                self.published_on.format(DATE_FORMAT).to_string().into(),
                self.publisher.clone().into(),
                self.price.into(),
                self.image_url.clone().into(),
                self.soft_deleted.into(),
            ])
            .to_owned()
    }

    fn update(&self) -> UpdateStatement {
        Query::update()
            .table(Books::Table)
            .values([
                (Books::Title, self.title.clone().into()),
                (Books::Description, self.description.clone().into()),
                (
                    Books::PublishedOn,
                    self.published_on.format(DATE_FORMAT).to_string().into(),
                ),
                (Books::Publisher, self.publisher.clone().into()),
                (Books::Price, self.price.into()),
                (Books::ImageUrl, self.image_url.clone().into()),
                (Books::SoftDeleted, self.soft_deleted.into()),
            ])
            .to_owned()
    }

    fn delete() -> DeleteStatement {
        Query::delete().from_table(Books::Table).to_owned()
    }

    fn with_generated_key(mut self, id: i64) -> Self {
        self.book_id = id;
        self
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        let published_on: String = row.try_get("published_on")?;
        let published_on = NaiveDate::parse_from_str(&published_on, DATE_FORMAT).map_err(|e| {
            ContextError::InvalidRow {
                column: "published_on",
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            book_id: row.try_get("book_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            published_on,
            publisher: row.try_get("publisher")?,
            price: row.try_get("price")?,
            image_url: row.try_get("image_url")?,
            soft_deleted: row.try_get("soft_deleted")?,
        })
    }

    fn column_defs() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new(Books::Title).text().not_null().to_owned(),
            ColumnDef::new(Books::Description).text().to_owned(),
            ColumnDef::new(Books::PublishedOn).text().not_null().to_owned(),
            ColumnDef::new(Books::Publisher).text().to_owned(),
            ColumnDef::new(Books::Price).double().not_null().to_owned(),
            ColumnDef::new(Books::ImageUrl).text().to_owned(),
            ColumnDef::new(Books::SoftDeleted)
                .boolean()
                .not_null()
                .default(false)
                .to_owned(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub author_id: AuthorId,
    pub name: String,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            author_id: 0,
            name: name.into(),
        }
    }
}

impl Entity for Author {
    const KIND: EntityKind = EntityKind::Author;

    type Key = AuthorId;

    fn key(&self) -> AuthorId {
        self.author_id
    }

    fn key_condition(key: AuthorId) -> SimpleExpr {
        Expr::col((Authors::Table, Authors::AuthorId)).eq(key)
    }

    fn select() -> SelectStatement {
        Query::select()
            .columns([
                (Authors::Table, Authors::AuthorId),
                (Authors::Table, Authors::Name),
            ])
            .from(Authors::Table)
            .to_owned()
    }

    fn order_by_key(select: &mut SelectStatement) {
        select.order_by((Authors::Table, Authors::AuthorId), sea_query::Order::Asc);
    }

    fn insert(&self) -> InsertStatement {
        Query::insert()
            .into_table(Authors::Table)
            .columns([Authors::Name])
            .values_panic([self.name.clone().into()])
            .to_owned()
    }

    fn update(&self) -> UpdateStatement {
        Query::update()
            .table(Authors::Table)
            .values([(Authors::Name, self.name.clone().into())])
            .to_owned()
    }

    fn delete() -> DeleteStatement {
        Query::delete().from_table(Authors::Table).to_owned()
    }

    fn with_generated_key(mut self, id: i64) -> Self {
        self.author_id = id;
        self
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            author_id: row.try_get("author_id")?,
            name: row.try_get("name")?,
        })
    }

    fn column_defs() -> Vec<ColumnDef> {
        vec![ColumnDef::new(Authors::Name).text().not_null().to_owned()]
    }
}

/// Composite key of the book/author link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookAuthorKey {
    pub book_id: BookId,
    pub author_id: AuthorId,
}

impl fmt::Display for BookAuthorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(book_id={}, author_id={})", self.book_id, self.author_id)
    }
}

/// Links a book to one of its authors. `order` is the author's position in
/// the book's author list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookAuthor {
    pub book_id: BookId,
    pub author_id: AuthorId,
    pub order: u8,
}

impl BookAuthor {
    pub fn new(book_id: BookId, author_id: AuthorId, order: u8) -> Self {
        Self {
            book_id,
            author_id,
            order,
        }
    }
}

impl Entity for BookAuthor {
    const KIND: EntityKind = EntityKind::BookAuthor;

    type Key = BookAuthorKey;

    fn key(&self) -> BookAuthorKey {
        BookAuthorKey {
            book_id: self.book_id,
            author_id: self.author_id,
        }
    }

    fn key_condition(key: BookAuthorKey) -> SimpleExpr {
        Expr::col((BookAuthors::Table, BookAuthors::BookId))
            .eq(key.book_id)
            .and(Expr::col((BookAuthors::Table, BookAuthors::AuthorId)).eq(key.author_id))
    }

    fn select() -> SelectStatement {
        Query::select()
            .columns([
                (BookAuthors::Table, BookAuthors::BookId),
                (BookAuthors::Table, BookAuthors::AuthorId),
                (BookAuthors::Table, BookAuthors::Order),
            ])
            .from(BookAuthors::Table)
            .to_owned()
    }

    fn order_by_key(select: &mut SelectStatement) {
        select
            .order_by((BookAuthors::Table, BookAuthors::BookId), sea_query::Order::Asc)
            .order_by((BookAuthors::Table, BookAuthors::AuthorId), sea_query::Order::Asc);
    }

    fn insert(&self) -> InsertStatement {
        Query::insert()
            .into_table(BookAuthors::Table)
            .columns([
                BookAuthors::BookId,
                BookAuthors::AuthorId,
                BookAuthors::Order,
            ])
            .values_panic([
                self.book_id.into(),
                self.author_id.into(),
                i64::from(self.order).into(),
            ])
            .to_owned()
    }

    fn update(&self) -> UpdateStatement {
        Query::update()
            .table(BookAuthors::Table)
            .values([(BookAuthors::Order, i64::from(self.order).into())])
            .to_owned()
    }

    fn delete() -> DeleteStatement {
        Query::delete().from_table(BookAuthors::Table).to_owned()
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            book_id: row.try_get("book_id")?,
            author_id: row.try_get("author_id")?,
            order: int_column(row, "order")?,
        })
    }

    fn column_defs() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new(BookAuthors::BookId)
                .integer()
                .not_null()
                .to_owned(),
            ColumnDef::new(BookAuthors::AuthorId)
                .integer()
                .not_null()
                .to_owned(),
            ColumnDef::new(BookAuthors::Order)
                .integer()
                .not_null()
                .to_owned(),
        ]
    }
}

/// A time-limited price for a book.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceOffer {
    pub price_offer_id: PriceOfferId,
    pub new_price: f64,
    pub promotional_text: String,
    pub book_id: BookId,
}

impl PriceOffer {
    pub fn new(book_id: BookId, new_price: f64, promotional_text: impl Into<String>) -> Self {
        Self {
            price_offer_id: 0,
            new_price,
            promotional_text: promotional_text.into(),
            book_id,
        }
    }
}

impl Entity for PriceOffer {
    const KIND: EntityKind = EntityKind::PriceOffer;

    type Key = PriceOfferId;

    fn key(&self) -> PriceOfferId {
        self.price_offer_id
    }

    fn key_condition(key: PriceOfferId) -> SimpleExpr {
        Expr::col((PriceOffers::Table, PriceOffers::PriceOfferId)).eq(key)
    }

    fn select() -> SelectStatement {
        Query::select()
            .columns([
                (PriceOffers::Table, PriceOffers::PriceOfferId),
                (PriceOffers::Table, PriceOffers::NewPrice),
                (PriceOffers::Table, PriceOffers::PromotionalText),
                (PriceOffers::Table, PriceOffers::BookId),
            ])
            .from(PriceOffers::Table)
            .to_owned()
    }

    fn order_by_key(select: &mut SelectStatement) {
        select.order_by(
            (PriceOffers::Table, PriceOffers::PriceOfferId),
            sea_query::Order::Asc,
        );
    }

    fn insert(&self) -> InsertStatement {
        Query::insert()
            .into_table(PriceOffers::Table)
            .columns([
                PriceOffers::NewPrice,
                PriceOffers::PromotionalText,
                PriceOffers::BookId,
            ])
            .values_panic([
                self.new_price.into(),
                self.promotional_text.clone().into(),
                self.book_id.into(),
            ])
            .to_owned()
    }

    fn update(&self) -> UpdateStatement {
        Query::update()
            .table(PriceOffers::Table)
            .values([
                (PriceOffers::NewPrice, self.new_price.into()),
                (
                    PriceOffers::PromotionalText,
                    self.promotional_text.clone().into(),
                ),
                (PriceOffers::BookId, self.book_id.into()),
            ])
            .to_owned()
    }

    fn delete() -> DeleteStatement {
        Query::delete().from_table(PriceOffers::Table).to_owned()
    }

    fn with_generated_key(mut self, id: i64) -> Self {
        self.price_offer_id = id;
        self
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            price_offer_id: row.try_get("price_offer_id")?,
            new_price: row.try_get("new_price")?,
            promotional_text: row.try_get("promotional_text")?,
            book_id: row.try_get("book_id")?,
        })
    }

    fn column_defs() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new(PriceOffers::NewPrice)
                .double()
                .not_null()
                .to_owned(),
            ColumnDef::new(PriceOffers::PromotionalText)
                .text()
                .not_null()
                .to_owned(),
            ColumnDef::new(PriceOffers::BookId)
                .integer()
                .not_null()
                .to_owned(),
        ]
    }
}
