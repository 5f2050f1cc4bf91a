pub mod base;
pub mod mongodb_store;

// Re-export the primary Store items so code outside can do
// "use crate::store::{Store, connect_store};"
pub use base::{connect_store, Store};
