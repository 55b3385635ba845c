//! Core types for fetch cache operations

mod decision;
mod descriptor;
mod entry;
mod options;
mod stats;

pub use decision::Decision;
pub use descriptor::{Body, RequestDescriptor};
pub use entry::{EntrySnapshot, EntryState};
pub use options::{duration_ms, CacheMode, ParseCacheModeError, RequestOptions, RequestOpts};
pub use stats::FetchStats;
