//! In-memory authoritative log store and index helpers.

/// Helper index aliases and the dupe lookup key.
pub mod indices;
/// Authoritative ordered QSO store.
pub mod store;
