//! Tag ↔ user index for the tagger bot.
//!
//! [`mapping::TagMapping`] keeps the two-way index and its load/store cycle,
//! [`store`] abstracts the key-value storage it persists into, and
//! [`matcher`] scores tag similarity for typo suggestions.

pub mod mapping;
pub mod matcher;
pub mod store;

pub use mapping::{CaseFolding, Nearest, Selector, TagMapping};
pub use store::{JsonFile, Memory, Store, StoreExt};
