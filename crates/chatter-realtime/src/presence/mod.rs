//! Presence tracking.

pub mod table;

pub use table::PresenceTable;
