//! skp-fetch-http: bridges `http` types and skp-fetch requests
//!
//! Turns `http` request parts into [`RequestDescriptor`]s and maps
//! `Cache-Control` directives onto [`RequestOptions`].
//!
//! [`RequestDescriptor`]: skp_fetch_core::RequestDescriptor
//! [`RequestOptions`]: skp_fetch_core::RequestOptions

pub mod cache_control;
pub mod descriptor;
pub mod policy;

pub use cache_control::CacheControl;
pub use descriptor::{descriptor_from_parts, descriptor_from_request};
pub use policy::HttpFetchPolicy;
