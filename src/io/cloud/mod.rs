//! Remote backends: object storage and the managed query service.
//!
//! Both are consumed through traits. [`MemoryObjectStore`] and
//! [`MemoryQueryService`] are complete in-memory implementations; real
//! providers implement the same traits outside this crate.
//!
//! ```
//! use recordshift::io::cloud::{MemoryObjectStore, ObjectStore};
//!
//! let store = MemoryObjectStore::new();
//! store.put_object("bucket", "key", b"data", None).unwrap();
//! assert!(store.object_exists("bucket", "key").unwrap());
//! ```

pub mod cache;
pub mod memory;
pub mod query;
pub mod store;

pub use cache::{BackendCache, BackendKey};
pub use memory::MemoryObjectStore;
pub use query::{MemoryQueryService, QueryService};
pub use store::{ObjectMetadata, ObjectStore, StoreError, StoreErrorKind, StoreResult};
