//! The book context.
//!
//! A [`BookContext`] is created per unit of work. At construction it resolves
//! the data key that scopes Order rows; afterwards every read issued through
//! it carries the registered standing filters:
//!
//! - Book rows flagged `soft_deleted` are hidden
//! - Order rows whose `customer_name` differs from the data key are hidden
//!
//! Either filter can be bypassed per query or per entity set with
//! `ignore_query_filters()`.

mod query;
mod set;

pub use query::EntityQuery;
pub use set::EntitySet;

use std::time::Duration;

use sea_query::{SelectStatement, SimpleExpr};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::config::{StorageConfig, IN_MEMORY_PATH};
use crate::data_key::{DataKey, DataKeyService, ReplacementDataKeyService};
use crate::entities::{Author, Book, BookAuthor, LineItem, Order, PriceOffer};
use crate::error::Result;
use crate::model::{EntityKind, Model};
use crate::storage::schema::create_table_statements;

/// Storage options handed to a context unchanged.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pool: SqlitePool,
}

impl ContextOptions {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool as described by `config`. Foreign keys are enforced on
    /// every connection.
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        if config.is_in_memory() {
            return Self::in_memory().await;
        }

        if let Some(parent) = std::path::Path::new(&config.path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let opts = SqliteConnectOptions::new()
            .filename(&config.path)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .create_if_missing(config.create_if_missing)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(opts)
            .await?;

        info!(path = %config.path, "Storage connected");
        Ok(Self { pool })
    }

    /// A private in-memory database on a single long-lived connection.
    pub async fn in_memory() -> Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(IN_MEMORY_PATH)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(opts)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Per-unit-of-work data-access context.
pub struct BookContext {
    options: ContextOptions,
    data_key: DataKey,
    model: &'static Model,
}

impl BookContext {
    /// Create a context, resolving its data key.
    ///
    /// The service is asked once. Without one, a [`ReplacementDataKeyService`]
    /// supplies a fresh key, which is convenient for work that never touches
    /// orders.
    pub fn new(options: ContextOptions, data_key_service: Option<&dyn DataKeyService>) -> Self {
        let data_key = match data_key_service {
            Some(service) => service.get_data_key(),
            None => {
                debug!("No data key service supplied, using replacement key");
                ReplacementDataKeyService.get_data_key()
            }
        };

        debug!(data_key = %data_key, "Book context created");

        Self {
            options,
            data_key,
            model: Model::registered(),
        }
    }

    /// The key Order reads are scoped to.
    pub fn data_key(&self) -> DataKey {
        self.data_key
    }

    pub fn model(&self) -> &'static Model {
        self.model
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        self.options.pool()
    }

    /// Create any missing tables from the registered model.
    pub async fn ensure_created(&self) -> Result<()> {
        for sql in create_table_statements(self.model) {
            sqlx::query(&sql).execute(self.pool()).await?;
        }
        info!("Bookstore schema initialized");
        Ok(())
    }

    pub fn books(&self) -> EntitySet<'_, Book> {
        EntitySet::new(self)
    }

    pub fn authors(&self) -> EntitySet<'_, Author> {
        EntitySet::new(self)
    }

    pub fn book_authors(&self) -> EntitySet<'_, BookAuthor> {
        EntitySet::new(self)
    }

    pub fn price_offers(&self) -> EntitySet<'_, PriceOffer> {
        EntitySet::new(self)
    }

    pub fn orders(&self) -> EntitySet<'_, Order> {
        EntitySet::new(self)
    }

    pub fn line_items(&self) -> EntitySet<'_, LineItem> {
        EntitySet::new(self)
    }

    /// The standing filter of `kind` with this context's data key, if any.
    pub(crate) fn filter_condition(&self, kind: EntityKind) -> Option<SimpleExpr> {
        self.model
            .query_filter(kind)
            .map(|filter| filter.condition(kind.table_name(), self.data_key))
    }

    pub(crate) fn apply_filters(&self, select: &mut SelectStatement, kinds: &[EntityKind]) {
        for &kind in kinds {
            if let Some(condition) = self.filter_condition(kind) {
                select.and_where(condition);
            }
        }
    }
}
