//! Data key resolution.
//!
//! The data key scopes Order rows to the customer that owns them. A
//! [`BookContext`](crate::context::BookContext) asks a [`DataKeyService`] for
//! it once, at construction, and keeps it for the rest of its lifetime.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Opaque owner identifier stored in `orders.customer_name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataKey(Uuid);

impl DataKey {
    /// A fresh, effectively unique key.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for DataKey {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for DataKey {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Supplies the data key for the current unit of work.
///
/// Implementations:
/// - `ReplacementDataKeyService`: a new random key on every call
/// - `FixedDataKeyService`: always the same, preconfigured key
pub trait DataKeyService: Send + Sync {
    fn get_data_key(&self) -> DataKey;
}

/// Fallback used when a context is built without a data key service.
///
/// Every call returns a different key, so a context built this way never
/// sees Order rows written by another context.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplacementDataKeyService;

impl DataKeyService for ReplacementDataKeyService {
    fn get_data_key(&self) -> DataKey {
        DataKey::new_random()
    }
}

/// Returns the key it was built with.
#[derive(Debug, Clone, Copy)]
pub struct FixedDataKeyService {
    key: DataKey,
}

impl FixedDataKeyService {
    pub fn new(key: DataKey) -> Self {
        Self { key }
    }
}

impl DataKeyService for FixedDataKeyService {
    fn get_data_key(&self) -> DataKey {
        self.key
    }
}
