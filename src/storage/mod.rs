//! Storage layout.
//!
//! Table and column identifiers, and the DDL derived from the registered
//! model. Reads and writes go through [`BookContext`](crate::context::BookContext).

pub mod schema;

pub use schema::{create_table, create_table_statements};
