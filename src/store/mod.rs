//! Session store implementations.
//!
//! - [`MemorySessionStore`]: process-lifetime store, nothing persisted
//! - [`JsonSessionStore`]: JSON file on disk (requires `json-store` feature)

#[cfg(feature = "json-store")]
mod json;
mod memory;

#[cfg(feature = "json-store")]
#[cfg_attr(docsrs, doc(cfg(feature = "json-store")))]
pub use json::JsonSessionStore;
pub use memory::MemorySessionStore;
