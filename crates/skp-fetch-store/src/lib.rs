//! skp-fetch-store: Entry store for skp-fetch
//!
//! Owns every cache entry, the in-flight flight of each key and the waiters
//! attached to it. All operations are synchronous and never suspend.

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "memory")]
pub use memory::{
    BeginFetch, CancelOutcome, EntryStore, Flight, Outcome, Removal, StoreConfig, WaiterId,
};
