//! In-memory entry store

mod flight;
mod store;

pub use flight::{Flight, Outcome, Removal, WaiterId};
pub use store::{BeginFetch, CancelOutcome, EntryStore, StoreConfig};
