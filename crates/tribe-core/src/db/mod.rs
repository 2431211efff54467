//! Database layer for tribe lists

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::LibSqlStore;
