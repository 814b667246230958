//! bookstore-schema: create the bookstore tables
//!
//! Opens the configured database, creates any missing tables from the
//! registered model and reports how many books and orders are visible to the
//! configured data key.
//!
//! ## Configuration
//! - BOOKSTORE_CONFIG / first argument: YAML config file
//! - BOOKSTORE__STORAGE__PATH: database file, or `:memory:`
//! - BOOKSTORE__DATA_KEY__FIXED: data key to scope orders to
//! - BOOKSTORE_LOG: tracing filter (default `info`)

use tracing::{error, info};

use bookstore_data::config::Config;
use bookstore_data::utils::bootstrap::{init_tracing, parse_config_path};
use bookstore_data::{BookContext, ContextOptions, DataKey, DataKeyService, FixedDataKeyService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = parse_config_path();
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    let options = ContextOptions::connect(&config.storage).await?;

    let fixed = config
        .data_key
        .fixed
        .map(|key| FixedDataKeyService::new(DataKey::from(key)));
    let context = BookContext::new(
        options,
        fixed.as_ref().map(|service| service as &dyn DataKeyService),
    );

    context.ensure_created().await?;

    let books = context.books().query().count().await?;
    let orders = context.orders().query().count().await?;

    info!(
        data_key = %context.data_key(),
        books,
        orders,
        "Bookstore schema ready"
    );

    Ok(())
}
