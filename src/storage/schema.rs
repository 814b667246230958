//! Database schema definitions using sea-query.
//!
//! The `Iden` enums name tables and columns for type-safe query building.
//! Table creation is derived from the registered [`Model`]: keys, foreign
//! keys and their `ON DELETE` actions all come from there.

use sea_query::{
    Alias, ColumnDef, ForeignKey, ForeignKeyAction, Iden, Index, SqliteQueryBuilder, Table,
    TableCreateStatement,
};

use crate::entities::{Author, Book, BookAuthor, Entity, LineItem, Order, PriceOffer};
use crate::model::{DeleteBehavior, EntityKind, Model};

/// Books table schema.
#[derive(Iden)]
pub enum Books {
    Table,
    BookId,
    Title,
    Description,
    PublishedOn,
    Publisher,
    Price,
    ImageUrl,
    SoftDeleted,
}

/// Authors table schema.
#[derive(Iden)]
pub enum Authors {
    Table,
    AuthorId,
    Name,
}

/// Book/author link table schema.
#[derive(Iden)]
pub enum BookAuthors {
    Table,
    BookId,
    AuthorId,
    #[iden = "order"]
    Order,
}

/// Price offers table schema.
#[derive(Iden)]
pub enum PriceOffers {
    Table,
    PriceOfferId,
    NewPrice,
    PromotionalText,
    BookId,
}

/// Orders table schema.
#[derive(Iden)]
pub enum Orders {
    Table,
    OrderId,
    DateOrderedUtc,
    CustomerName,
}

/// Line items table schema.
#[derive(Iden)]
pub enum LineItems {
    Table,
    LineItemId,
    LineNum,
    NumBooks,
    BookPrice,
    OrderId,
    BookId,
}

impl From<DeleteBehavior> for ForeignKeyAction {
    fn from(behavior: DeleteBehavior) -> Self {
        match behavior {
            DeleteBehavior::Cascade => ForeignKeyAction::Cascade,
            DeleteBehavior::Restrict => ForeignKeyAction::Restrict,
        }
    }
}

fn column_defs(kind: EntityKind) -> Vec<ColumnDef> {
    match kind {
        EntityKind::Book => Book::column_defs(),
        EntityKind::Author => Author::column_defs(),
        EntityKind::Order => Order::column_defs(),
        EntityKind::BookAuthor => BookAuthor::column_defs(),
        EntityKind::PriceOffer => PriceOffer::column_defs(),
        EntityKind::LineItem => LineItem::column_defs(),
    }
}

/// `CREATE TABLE` for one entity kind as registered in `model`.
pub fn create_table(model: &Model, kind: EntityKind) -> TableCreateStatement {
    let entity = model.entity(kind);
    let table = Alias::new(kind.table_name());

    let mut stmt = Table::create();
    stmt.table(table.clone()).if_not_exists();

    if entity.has_generated_key() {
        stmt.col(
            ColumnDef::new(Alias::new(entity.key[0]))
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        );
    }

    for mut col in column_defs(kind) {
        stmt.col(&mut col);
    }

    if !entity.has_generated_key() {
        let mut key = Index::create();
        for column in &entity.key {
            key.col(Alias::new(*column));
        }
        stmt.primary_key(&mut key);
    }

    for relationship in &entity.relationships {
        let principal = model.entity(relationship.principal);
        stmt.foreign_key(
            ForeignKey::create()
                .from(table.clone(), Alias::new(relationship.foreign_key))
                .to(
                    Alias::new(relationship.principal.table_name()),
                    Alias::new(principal.key[0]),
                )
                .on_delete(relationship.on_delete.into()),
        );
    }

    stmt
}

/// SQL for every table, parents first.
pub fn create_table_statements(model: &Model) -> Vec<String> {
    EntityKind::ALL
        .iter()
        .map(|&kind| create_table(model, kind).to_string(SqliteQueryBuilder))
        .collect()
}
