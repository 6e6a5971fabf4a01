//! Output formatting for refresh outcomes, snapshots, and the catalog

pub mod json;
pub mod terminal;
