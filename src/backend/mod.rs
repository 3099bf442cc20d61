//! Client for the hosted HR backend: REST plumbing, typed domain
//! operations and the cached wrapper the rest of the app talks to.

pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod client;
pub mod query;
pub mod types;
