//! Application services built on top of the cache.

pub mod error;
pub mod soak;
