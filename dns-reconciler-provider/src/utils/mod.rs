//! Utility modules.

/// `SubmittedAt` serde for change receipts.
pub mod timestamp;

/// Log sanitization utilities to keep long record values out of logs.
pub mod log_sanitizer;
