//! Bookstore data access.
//!
//! Maps the bookstore's entities onto SQLite and installs the storage rules
//! every unit of work runs under:
//!
//! - a book/author link is keyed by the (book, author) pair
//! - a book cannot be deleted while an order line references it
//! - soft-deleted books are hidden from default reads
//! - orders are only visible to the context whose data key owns them

pub mod config;
pub mod context;
pub mod data_key;
pub mod entities;
pub mod error;
pub mod model;
pub mod storage;
pub mod utils;

pub use context::{BookContext, ContextOptions, EntityQuery, EntitySet};
pub use data_key::{DataKey, DataKeyService, FixedDataKeyService, ReplacementDataKeyService};
pub use error::{ContextError, Result};
pub use model::{DeleteBehavior, EntityKind, Model, QueryFilter};
