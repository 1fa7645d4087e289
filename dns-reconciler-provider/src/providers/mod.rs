//! DNS Provider implementations

/// Name helpers shared by provider implementations and callers.
pub mod common;

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "memory")]
pub use memory::MemoryProvider;
