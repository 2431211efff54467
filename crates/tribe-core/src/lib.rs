//! tribe-core - Core library for tribe lists
//!
//! This crate contains the list models, the sync state machine, the menu
//! engine and the libSQL storage layer used by the tribe front ends.

pub mod config;
pub mod db;
pub mod deadline;
pub mod error;
pub mod menu;
pub mod models;
pub mod services;
pub mod store;
pub mod sync;
pub mod util;

pub use config::TribeConfig;
pub use deadline::Deadline;
pub use error::{Error, Result};
pub use models::{ConflictId, ItemId, List, ListId, ListItem};
pub use services::TribeService;
pub use store::{Catalog, MemoryStore, Storage};
