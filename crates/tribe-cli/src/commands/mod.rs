pub mod common;
pub mod completions;
pub mod config;
pub mod conflict;
pub mod item;
pub mod list;
pub mod menu;
pub mod sync;
