//! Model registration.
//!
//! Declares, once per process, how the entity kinds map onto storage: key
//! composition, relationship delete behavior and standing query filters.
//! Schema creation and every query issued through a context read from the
//! registered [`Model`].
//!
//! Registration is a pure function. [`Model::registered`] runs it the first
//! time it is called and hands out the same instance afterwards.

use std::sync::OnceLock;

use sea_query::{Alias, Expr, SimpleExpr};

use crate::data_key::DataKey;

static MODEL: OnceLock<Model> = OnceLock::new();

/// Persisted entity kinds, parent tables first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Book,
    Author,
    Order,
    BookAuthor,
    PriceOffer,
    LineItem,
}

impl EntityKind {
    /// All kinds in table creation order.
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Book,
        EntityKind::Author,
        EntityKind::Order,
        EntityKind::BookAuthor,
        EntityKind::PriceOffer,
        EntityKind::LineItem,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            EntityKind::Book => "Book",
            EntityKind::Author => "Author",
            EntityKind::Order => "Order",
            EntityKind::BookAuthor => "BookAuthor",
            EntityKind::PriceOffer => "PriceOffer",
            EntityKind::LineItem => "LineItem",
        }
    }

    pub const fn table_name(self) -> &'static str {
        match self {
            EntityKind::Book => "books",
            EntityKind::Author => "authors",
            EntityKind::Order => "orders",
            EntityKind::BookAuthor => "book_authors",
            EntityKind::PriceOffer => "price_offers",
            EntityKind::LineItem => "line_items",
        }
    }

    /// Key column picked by convention when the model declares none.
    const fn conventional_key(self) -> &'static str {
        match self {
            EntityKind::Book => "book_id",
            EntityKind::Author => "author_id",
            EntityKind::Order => "order_id",
            EntityKind::BookAuthor => "book_author_id",
            EntityKind::PriceOffer => "price_offer_id",
            EntityKind::LineItem => "line_item_id",
        }
    }
}

/// What happens to dependent rows when their principal row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteBehavior {
    /// Dependent rows are deleted with the principal.
    Cascade,
    /// The delete fails while dependent rows exist.
    Restrict,
}

/// A required reference from a dependent entity to its principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub dependent: EntityKind,
    pub foreign_key: &'static str,
    pub principal: EntityKind,
    pub on_delete: DeleteBehavior,
}

/// Predicate applied to every read of an entity kind unless bypassed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFilter {
    /// Only rows whose flag column is false.
    SoftDelete { column: &'static str },
    /// Only rows whose column equals the context's data key.
    DataKey { column: &'static str },
}

impl QueryFilter {
    /// Build the predicate for `table`.
    ///
    /// The data key is threaded in by the caller; filters hold no state of
    /// their own.
    pub fn condition(&self, table: &'static str, data_key: DataKey) -> SimpleExpr {
        match *self {
            QueryFilter::SoftDelete { column } => {
                Expr::col((Alias::new(table), Alias::new(column))).eq(false)
            }
            QueryFilter::DataKey { column } => {
                Expr::col((Alias::new(table), Alias::new(column))).eq(data_key.to_string())
            }
        }
    }
}

/// Storage mapping for a single entity kind.
#[derive(Debug, Clone)]
pub struct EntityModel {
    pub kind: EntityKind,
    pub key: Vec<&'static str>,
    pub relationships: Vec<Relationship>,
    pub query_filter: Option<QueryFilter>,
}

impl EntityModel {
    /// Single-column keys are assigned by the store on insert.
    pub fn has_generated_key(&self) -> bool {
        self.key.len() == 1
    }
}

/// The registered mapping for all entity kinds.
#[derive(Debug, Clone)]
pub struct Model {
    entities: Vec<EntityModel>,
}

impl Model {
    /// The process-wide model, registered on first use.
    pub fn registered() -> &'static Model {
        MODEL.get_or_init(register_model)
    }

    pub fn entity(&self, kind: EntityKind) -> &EntityModel {
        self.entities
            .iter()
            .find(|e| e.kind == kind)
            .unwrap_or_else(|| unreachable!("every entity kind is registered"))
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityModel> {
        self.entities.iter()
    }

    pub fn query_filter(&self, kind: EntityKind) -> Option<QueryFilter> {
        self.entity(kind).query_filter
    }

    /// Dependent kinds whose references block deletes of `principal`.
    pub fn restricting_dependents(&self, principal: EntityKind) -> Vec<EntityKind> {
        self.entities
            .iter()
            .flat_map(|e| e.relationships.iter())
            .filter(|r| r.principal == principal && r.on_delete == DeleteBehavior::Restrict)
            .map(|r| r.dependent)
            .collect()
    }
}

/// Required relationships discovered by convention, all cascading.
const CONVENTIONAL_RELATIONSHIPS: [(EntityKind, &str, EntityKind); 5] = [
    (EntityKind::BookAuthor, "book_id", EntityKind::Book),
    (EntityKind::BookAuthor, "author_id", EntityKind::Author),
    (EntityKind::PriceOffer, "book_id", EntityKind::Book),
    (EntityKind::LineItem, "order_id", EntityKind::Order),
    (EntityKind::LineItem, "book_id", EntityKind::Book),
];

/// Builds a [`Model`], starting from conventions.
pub struct ModelBuilder {
    entities: Vec<EntityModel>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        let mut entities: Vec<EntityModel> = EntityKind::ALL
            .iter()
            .map(|&kind| EntityModel {
                kind,
                key: vec![kind.conventional_key()],
                relationships: Vec::new(),
                query_filter: None,
            })
            .collect();

        for (dependent, foreign_key, principal) in CONVENTIONAL_RELATIONSHIPS {
            if let Some(entity) = entities.iter_mut().find(|e| e.kind == dependent) {
                entity.relationships.push(Relationship {
                    dependent,
                    foreign_key,
                    principal,
                    on_delete: DeleteBehavior::Cascade,
                });
            }
        }

        Self { entities }
    }

    pub fn entity(&mut self, kind: EntityKind) -> EntityTypeBuilder<'_> {
        let index = self
            .entities
            .iter()
            .position(|e| e.kind == kind)
            .unwrap_or_else(|| unreachable!("every entity kind is seeded"));
        EntityTypeBuilder {
            entity: &mut self.entities[index],
        }
    }

    pub fn build(self) -> Model {
        Model {
            entities: self.entities,
        }
    }
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Configures one entity kind.
pub struct EntityTypeBuilder<'a> {
    entity: &'a mut EntityModel,
}

impl EntityTypeBuilder<'_> {
    /// Replace the key with the given columns, in order.
    pub fn has_key(self, columns: &[&'static str]) -> Self {
        self.entity.key = columns.to_vec();
        self
    }

    /// Set the delete behavior of the reference through `foreign_key`,
    /// adding the relationship if conventions did not.
    pub fn has_one(
        self,
        principal: EntityKind,
        foreign_key: &'static str,
        on_delete: DeleteBehavior,
    ) -> Self {
        let dependent = self.entity.kind;
        match self
            .entity
            .relationships
            .iter_mut()
            .find(|r| r.foreign_key == foreign_key && r.principal == principal)
        {
            Some(existing) => existing.on_delete = on_delete,
            None => self.entity.relationships.push(Relationship {
                dependent,
                foreign_key,
                principal,
                on_delete,
            }),
        }
        self
    }

    pub fn has_query_filter(self, filter: QueryFilter) -> Self {
        self.entity.query_filter = Some(filter);
        self
    }
}

/// The bookstore's storage rules.
pub fn register_model() -> Model {
    let mut builder = ModelBuilder::new();

    builder
        .entity(EntityKind::BookAuthor)
        .has_key(&["book_id", "author_id"]);

    builder
        .entity(EntityKind::LineItem)
        .has_one(EntityKind::Book, "book_id", DeleteBehavior::Restrict);

    builder
        .entity(EntityKind::Book)
        .has_query_filter(QueryFilter::SoftDelete {
            column: "soft_deleted",
        });

    builder
        .entity(EntityKind::Order)
        .has_query_filter(QueryFilter::DataKey {
            column: "customer_name",
        });

    builder.build()
}
