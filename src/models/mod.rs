//! Data models for todo-app.
//!
//! The item is the only entity. Everything else in the crate moves copies
//! of these types across the storage, service and transport layers.

mod item;
mod status;

pub use item::{Item, ItemId, ItemPatch, NewItem};
pub use status::ItemStatus;
