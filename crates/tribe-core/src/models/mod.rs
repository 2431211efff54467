//! Data models for tribe lists

mod ids;
mod item;
mod list;
mod menu;
mod sync_conflict;

pub use ids::{ConflictId, ItemId, ListId};
pub use item::{ListItem, Location, NewListItem};
pub use list::{List, ListType, NewList, Visibility};
pub use menu::{GeoFilter, Menu, MenuEntry, MenuFilters, MenuParams};
pub use sync_conflict::{is_empty_payload, NewConflict, SyncConflict};
