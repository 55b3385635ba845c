//! skp-fetch-core: Core traits and types for the skp-fetch library
//!
//! This crate provides the foundational types and traits used throughout
//! the skp-fetch ecosystem: request descriptors and their canonical keys,
//! per-call options, the staleness policy and the transport contract.

mod error;
mod key;
pub mod policy;
mod traits;
mod types;

pub use error::{CacheError, CancelReason, Result, TransportError};
pub use key::{CacheKey, KeyCodec};
pub use policy::decide;
pub use traits::*;
pub use types::*;

pub use tokio_util::sync::CancellationToken;
