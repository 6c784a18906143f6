//! Account registry and credential storage.
//!
//! The registry is pure data plus validation. It is owned by the
//! orchestrator, which is the only component that mutates statuses.

mod registry;
mod store;
mod types;
mod writer;

pub use registry::{AccountRegistry, RegistryError};
pub use store::{AccountStore, JsonAccountStore, StoreError};
pub use types::{Account, AccountEntry, AccountStatus, AccountSummary};
pub use writer::{create_store_writer, StoreHandle, StoreWriter};
